// Needs a headless Chromium on the PATH for snapshots: sudo apt-get install chromium
extern crate anyhow;
extern crate chrono;
extern crate chrono_tz;
extern crate flexi_logger;
extern crate getopts;
extern crate image;
#[macro_use]
extern crate log;
extern crate reqwest;
#[macro_use]
extern crate serde_derive;
extern crate tiny_http;

mod board;
mod capture;
mod config;
mod feed;
mod grouping;
mod page;
mod result;
mod server;
mod services;
mod snapshot;

use anyhow::Context;
use capture::Capturer;

fn init_logging(log_dir: Option<&str>) -> anyhow::Result<flexi_logger::LoggerHandle> {
    let logger = flexi_logger::Logger::try_with_env_or_str("info")
        .context("Setting up logger")?;

    let logger = match log_dir {
        Some(dir) => logger
            .log_to_file(flexi_logger::FileSpec::default().directory(dir))
            .duplicate_to_stderr(flexi_logger::Duplicate::Info),
        None => logger.log_to_stderr(),
    };

    return logger.start().context("Starting logger");
}

fn capture_once(config: &config::Config) -> result::BoardResult<()> {
    let browser = capture::HeadlessBrowser::new(&config.browser);
    browser.capture(&config.capture_url, &config.image_path)?;
    info!("Screenshot saved to {}", config.image_path.display());
    return Ok(());
}

fn serve(config: &config::Config) -> result::BoardResult<()> {
    let feed_config = config::feed_config_from_env()?;
    let feed_client = feed::FeedClient::new(feed_config)?;

    let capturer = std::sync::Arc::new(capture::HeadlessBrowser::new(&config.browser));
    let scheduler = snapshot::SnapshotScheduler::new(
        config::DEBOUNCE_INTERVAL, capturer, &config.capture_url, &config.image_path);
    let board = std::sync::Arc::new(board::Board::new(feed_client, scheduler));

    let addr = format!("{}:{}", config.bind, config.port);
    let http = tiny_http::Server::http(&addr)
        .map_err(|e| result::make_error(&format!("Binding {}: {}", addr, e)))?;

    info!("Serving departure board on http://{} with {} workers, snapshots of {} to {}",
          addr, config.workers, config.capture_url, config.image_path.display());
    server::run_server(std::sync::Arc::new(http), board, config.workers);
    return Ok(());
}

fn run(config: &config::Config) -> result::BoardResult<()> {
    if let Some(parent) = config.image_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    if config.capture_once {
        return capture_once(config);
    }
    return serve(config);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let opts = config::options();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("{}\n{}", err, opts.usage(&format!("Usage: {} [options]", args[0])));
            std::process::exit(2);
        }
    };
    if matches.opt_present("help") {
        println!("{}", opts.usage(&format!("Usage: {} [options]", args[0])));
        return;
    }

    let config = match config::config_from_matches(&matches) {
        Ok(c) => c,
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(2);
        }
    };

    let _logger = match init_logging(config.log_dir.as_deref()) {
        Ok(handle) => handle,
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(1);
        }
    };

    info!("Running. port={} capture-once={}", config.port, config.capture_once);

    if let Err(err) = run(&config) {
        error!("{}", err);
        std::process::exit(1);
    }
}
