extern crate anyhow;
extern crate getopts;
extern crate std;

use anyhow::Context;

pub const DEBOUNCE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(30);
pub const PLATFORM_CAP: usize = 5;
pub const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
pub const USER_AGENT: &str = "curl/7.64.1";
pub const DEFAULT_STATION: &str = "Hassocks";

pub const VIEWPORT_WIDTH: u32 = 800;
pub const VIEWPORT_HEIGHT: u32 = 480;
pub const BROWSER_BUDGET: std::time::Duration = std::time::Duration::from_secs(45);

const API_URL_VAR: &str = "RAIL_API_URL";
const API_KEY_VAR: &str = "RAIL_API_KEY";

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub workers: usize,
    pub image_path: std::path::PathBuf,
    pub capture_url: String,
    pub browser: String,
    pub log_dir: Option<String>,
    pub capture_once: bool,
}

pub fn options() -> getopts::Options {
    let mut opts = getopts::Options::new();
    opts.optopt("p", "port", "Port to serve the board on (default 5001)", "PORT");
    opts.optopt("b", "bind", "Address to bind (default 0.0.0.0)", "ADDR");
    opts.optopt("i", "image-path", "Where to put the snapshot png", "FILENAME");
    opts.optopt("u", "capture-url", "Page the browser should capture", "URL");
    opts.optopt("", "browser", "Headless browser command, binary plus any leading args (default chromium)", "COMMAND");
    opts.optopt("w", "workers", "Request handling threads (default 4)", "N");
    opts.optopt("l", "log-dir", "Also write logs into this directory", "DIR");
    opts.optflag("", "capture-once", "Take one snapshot and exit");
    opts.optflag("h", "help", "Print this help");
    return opts;
}

pub fn config_from_matches(matches: &getopts::Matches) -> anyhow::Result<Config> {
    let port: u16 = match matches.opt_str("port") {
        Some(p) => p.parse().with_context(|| format!("Invalid --port '{}'", p))?,
        None => 5001,
    };

    let workers: usize = match matches.opt_str("workers") {
        Some(w) => w.parse().with_context(|| format!("Invalid --workers '{}'", w))?,
        None => 4,
    };
    if workers == 0 {
        anyhow::bail!("--workers must be at least 1");
    }

    return Ok(Config{
        bind: matches.opt_str("bind").unwrap_or("0.0.0.0".to_string()),
        port: port,
        workers: workers,
        image_path: std::path::PathBuf::from(
            matches.opt_str("image-path").unwrap_or("static/image.png".to_string())),
        capture_url: matches.opt_str("capture-url")
            .unwrap_or(format!("http://localhost:{}/", port)),
        browser: matches.opt_str("browser").unwrap_or("chromium".to_string()),
        log_dir: matches.opt_str("log-dir"),
        capture_once: matches.opt_present("capture-once"),
    });
}

pub fn feed_config_from_env() -> anyhow::Result<FeedConfig> {
    return feed_config_from(|name| std::env::var(name).ok());
}

fn feed_config_from<F: Fn(&str) -> Option<String>>(lookup: F) -> anyhow::Result<FeedConfig> {
    let url = lookup(API_URL_VAR)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} must be set", API_URL_VAR))?;
    let api_key = lookup(API_KEY_VAR)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} must be set", API_KEY_VAR))?;

    return Ok(FeedConfig{
        url: url,
        api_key: api_key,
    });
}
