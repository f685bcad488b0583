extern crate image;
extern crate reqwest;
extern crate std;

use crate::config;
use crate::result::CaptureError;

pub trait Capturer: Send + Sync {
    fn capture(&self, target_url: &str, output_path: &std::path::Path) -> Result<(), CaptureError>;
}

// Markers the board page renders once it has departures to show.
const BOARD_MARKER: &str = "class='departure-board'";
const SERVICE_MARKER: &str = "class='service-item'";

pub struct HeadlessBrowser {
    binary: String,
    leading_args: Vec<String>,
    budget: std::time::Duration,
    sequence: std::sync::atomic::AtomicU64,
}

impl HeadlessBrowser {
    // `command` is the binary optionally followed by its own arguments,
    // e.g. "flatpak run org.chromium.Chromium".
    pub fn new(command: &str) -> HeadlessBrowser {
        let mut words = command.split_whitespace().map(|w| w.to_string());
        let binary = words.next().unwrap_or("chromium".to_string());

        return HeadlessBrowser{
            binary: binary,
            leading_args: words.collect(),
            budget: config::BROWSER_BUDGET,
            sequence: std::sync::atomic::AtomicU64::new(0),
        };
    }

    fn temp_path(&self, output_path: &std::path::Path, tag: &str, extension: &str) -> std::path::PathBuf {
        let n = self.sequence.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let name = output_path.file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or("snapshot.png".to_string());
        return output_path.with_file_name(
            format!(".{}.{}.{}-{}.{}", name, tag, std::process::id(), n, extension));
    }

    fn run_browser(&self, page_url: &str, screenshot_path: &std::path::Path) -> Result<(), CaptureError> {
        let mut command = std::process::Command::new(&self.binary);
        command
            .args(&self.leading_args)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--hide-scrollbars")
            .arg("--allow-file-access-from-files")
            .arg(format!("--window-size={},{}", config::VIEWPORT_WIDTH, config::VIEWPORT_HEIGHT))
            .arg(format!("--screenshot={}", screenshot_path.display()))
            .arg(page_url)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        let mut session = BrowserSession::launch(&mut command)?;
        let status = session.wait(self.budget)?;
        if !status.success() {
            return Err(CaptureError::Browser(status));
        }
        return Ok(());
    }
}

impl Capturer for HeadlessBrowser {
    // Each board page load costs an upstream fetch, so the page fetched for
    // the readiness check is the one the browser renders, from a local copy.
    fn capture(&self, target_url: &str, output_path: &std::path::Path) -> Result<(), CaptureError> {
        let page = fetch_ready_page(target_url)?;

        let page_path = self.temp_path(output_path, "page", "html");
        let raw_path = self.temp_path(output_path, "raw", "png");
        let clipped_path = self.temp_path(output_path, "clipped", "png");

        let result = std::fs::write(&page_path, page).map_err(CaptureError::from)
            .and_then(|_| file_url(&page_path))
            .and_then(|page_url| self.run_browser(&page_url, &raw_path))
            .and_then(|_| clip_to_viewport(&raw_path, &clipped_path))
            .and_then(|_| std::fs::rename(&clipped_path, output_path).map_err(CaptureError::from));

        let _ = std::fs::remove_file(&page_path);
        let _ = std::fs::remove_file(&raw_path);
        if result.is_err() {
            let _ = std::fs::remove_file(&clipped_path);
        }
        return result;
    }
}

fn file_url(path: &std::path::Path) -> Result<String, CaptureError> {
    let absolute = std::fs::canonicalize(path)?;
    let url = reqwest::Url::from_file_path(&absolute).map_err(|_| {
        CaptureError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("no file url for {}", absolute.display())))
    })?;
    return Ok(url.to_string());
}

fn fetch_ready_page(target_url: &str) -> Result<String, CaptureError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(config::FETCH_TIMEOUT)
        .build()
        .map_err(|e| CaptureError::NotReady(e.to_string()))?;
    let response = client.get(target_url).send()
        .map_err(|e| CaptureError::NotReady(e.to_string()))?;
    if !response.status().is_success() {
        return Err(CaptureError::NotReady(format!("{} returned {}", target_url, response.status())));
    }
    let body = response.text().map_err(|e| CaptureError::NotReady(e.to_string()))?;

    page_ready(&body)?;
    return Ok(body);
}

fn page_ready(body: &str) -> Result<(), CaptureError> {
    if !body.contains(BOARD_MARKER) {
        return Err(CaptureError::NotReady("no departure board on page".to_string()));
    }
    if !body.contains(SERVICE_MARKER) {
        return Err(CaptureError::NotReady("no services listed yet".to_string()));
    }
    return Ok(());
}

// The browser may hand back a taller page or a HiDPI render; the panel wants
// exactly the top-left viewport.
fn clip_to_viewport(raw_path: &std::path::Path, clipped_path: &std::path::Path) -> Result<(), CaptureError> {
    let screenshot = image::open(raw_path)?;

    if screenshot.width() < config::VIEWPORT_WIDTH || screenshot.height() < config::VIEWPORT_HEIGHT {
        return Err(CaptureError::Image(image::ImageError::Parameter(
            image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch))));
    }

    let clipped = screenshot.crop_imm(0, 0, config::VIEWPORT_WIDTH, config::VIEWPORT_HEIGHT);
    clipped.save_with_format(clipped_path, image::ImageFormat::Png)?;
    return Ok(());
}

// Owns the browser process for the length of one capture. Dropping it kills
// and reaps the child, whatever path we leave by.
struct BrowserSession {
    child: std::process::Child,
    finished: bool,
}

impl BrowserSession {
    fn launch(command: &mut std::process::Command) -> Result<BrowserSession, CaptureError> {
        let child = command.spawn().map_err(CaptureError::Launch)?;
        debug!("Browser started, pid {}", child.id());
        return Ok(BrowserSession{
            child: child,
            finished: false,
        });
    }

    fn wait(&mut self, budget: std::time::Duration) -> Result<std::process::ExitStatus, CaptureError> {
        let deadline = std::time::Instant::now() + budget;
        loop {
            if let Some(status) = self.child.try_wait()? {
                self.finished = true;
                return Ok(status);
            }
            if std::time::Instant::now() >= deadline {
                return Err(CaptureError::Timeout(budget));
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Killing browser pid {}", self.child.id());
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
