extern crate anyhow;
extern crate image;
extern crate reqwest;
extern crate serde_json;
extern crate std;

pub type BoardResult<T> = std::result::Result<T, BoardError>;

#[derive(Debug)]
pub enum BoardError {
    CaptureError(CaptureError),
    ConfigError(anyhow::Error),
    FetchError(FetchError),
    IoError(std::io::Error),
    OtherError(String),
}

pub fn make_error(msg: &str) -> BoardError {
    return BoardError::OtherError(msg.to_string());
}

impl std::fmt::Display for BoardError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            BoardError::CaptureError(ref err) => {
                return write!(f, "Capture Error: {}", err);
            },
            BoardError::ConfigError(ref err) => {
                return write!(f, "Config Error: {:#}", err);
            },
            BoardError::FetchError(ref err) => {
                return write!(f, "Fetch Error: {}", err);
            },
            BoardError::IoError(ref err) => {
                return write!(f, "IO Error: {}", err);
            },
            BoardError::OtherError(ref msg) => {
                return write!(f, "Error: {}", msg);
            },
        }
    }
}

impl std::error::Error for BoardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            BoardError::CaptureError(ref err) => Some(err),
            BoardError::FetchError(ref err) => Some(err),
            BoardError::IoError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for BoardError {
    fn from(err: anyhow::Error) -> BoardError {
        return BoardError::ConfigError(err);
    }
}

impl From<CaptureError> for BoardError {
    fn from(err: CaptureError) -> BoardError {
        return BoardError::CaptureError(err);
    }
}

impl From<FetchError> for BoardError {
    fn from(err: FetchError) -> BoardError {
        return BoardError::FetchError(err);
    }
}

impl From<std::io::Error> for BoardError {
    fn from(err: std::io::Error) -> BoardError {
        return BoardError::IoError(err);
    }
}

// Everything that can go wrong talking to the upstream rail feed.
#[derive(Debug)]
pub enum FetchError {
    Network(reqwest::Error),
    HttpStatus(reqwest::StatusCode),
    Decode(serde_json::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            FetchError::Network(ref err) => {
                return write!(f, "network: {}", err);
            },
            FetchError::HttpStatus(ref status) => {
                return write!(f, "upstream returned HTTP {}", status);
            },
            FetchError::Decode(ref err) => {
                return write!(f, "decoding body: {}", err);
            },
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            FetchError::Network(ref err) => Some(err),
            FetchError::Decode(ref err) => Some(err),
            FetchError::HttpStatus(_) => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> FetchError {
        return FetchError::Network(err);
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> FetchError {
        return FetchError::Decode(err);
    }
}

#[derive(Debug)]
pub enum CaptureError {
    NotReady(String),
    Launch(std::io::Error),
    Timeout(std::time::Duration),
    Browser(std::process::ExitStatus),
    Image(image::ImageError),
    Io(std::io::Error),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            CaptureError::NotReady(ref why) => {
                return write!(f, "board not ready: {}", why);
            },
            CaptureError::Launch(ref err) => {
                return write!(f, "launching browser: {}", err);
            },
            CaptureError::Timeout(ref budget) => {
                return write!(f, "browser still running after {:?}, killed", budget);
            },
            CaptureError::Browser(ref status) => {
                return write!(f, "browser exited with {}", status);
            },
            CaptureError::Image(ref err) => {
                return write!(f, "screenshot image: {}", err);
            },
            CaptureError::Io(ref err) => {
                return write!(f, "IO: {}", err);
            },
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            CaptureError::Launch(ref err) => Some(err),
            CaptureError::Image(ref err) => Some(err),
            CaptureError::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> CaptureError {
        return CaptureError::Image(err);
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> CaptureError {
        return CaptureError::Io(err);
    }
}
