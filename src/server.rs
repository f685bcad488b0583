extern crate pretty_bytes;
extern crate serde_json;
extern crate tiny_http;

use crate::board;
use crate::feed;
use crate::page;

use std::sync::Arc;

pub fn run_server<S>(server: Arc<tiny_http::Server>, board: Arc<board::Board<S>>, workers: usize)
where S: feed::DepartureSource + Send + Sync + 'static {
    let handles: Vec<std::thread::JoinHandle<()>> = (0..workers).filter_map(|i| {
        let server = server.clone();
        let board = board.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("http-{}", i))
            .spawn(move || {
                loop {
                    match server.recv() {
                        Ok(request) => handle_request(&*board, request),
                        Err(err) => {
                            error!("Error receiving request: {}", err);
                            break;
                        },
                    }
                }
            });
        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!("Could not start worker {}: {}", i, err);
                None
            },
        }
    }).collect();

    for handle in handles {
        let _ = handle.join();
    }
}

pub fn handle_request<S: feed::DepartureSource>(board: &board::Board<S>, request: tiny_http::Request) {
    debug!("{} {}", request.method(), request.url());

    let path = request.url().split('?').next().unwrap_or("/").to_string();
    let response = match (request.method(), path.as_str()) {
        (&tiny_http::Method::Get, "/") => main_page(board),
        (&tiny_http::Method::Get, "/api/departures") => departures_json(board),
        (&tiny_http::Method::Get, "/image.png") => current_image(board),
        (&tiny_http::Method::Get, "/status") => status_page(board),
        (&tiny_http::Method::Get, _) => {
            html_response(404, "<h1>404</h1><p>Not found!<p>".to_string())
        },
        (_, _) => html_response(405, "<h1>405</h1><p>Method not allowed<p>".to_string()),
    };

    if let Err(err) = request.respond(response) {
        warn!("Error writing response: {}", err);
    }
}

type BoxedResponse = tiny_http::ResponseBox;

fn header(name: &str, value: &str) -> tiny_http::Header {
    return tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes())
        .expect("static header is valid ascii");
}

fn html_response(status: u16, body: String) -> BoxedResponse {
    return tiny_http::Response::from_string(body)
        .with_status_code(status)
        .with_header(header("Content-Type", "text/html; charset=utf-8"))
        .boxed();
}

fn json_response(status: u16, body: &serde_json::Value) -> BoxedResponse {
    return tiny_http::Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(header("Content-Type", "application/json"))
        .boxed();
}

fn main_page<S: feed::DepartureSource>(board: &board::Board<S>) -> BoxedResponse {
    match board.departures() {
        Ok(data) => return html_response(200, page::render_board(&data)),
        Err(err) => {
            error!("Error fetching data: {}", err);
            return html_response(500, page::render_error("Unable to fetch data"));
        },
    }
}

fn departures_json<S: feed::DepartureSource>(board: &board::Board<S>) -> BoxedResponse {
    match board.departures() {
        Ok(data) => {
            match serde_json::to_value(&data) {
                Ok(json) => return json_response(200, &json),
                Err(err) => {
                    error!("Error encoding departures: {}", err);
                    return json_response(500, &serde_json::json!({"error": "Unable to fetch data"}));
                },
            }
        },
        Err(err) => {
            error!("Error fetching data: {}", err);
            return json_response(500, &serde_json::json!({"error": "Unable to fetch data"}));
        },
    }
}

fn current_image<S: feed::DepartureSource>(board: &board::Board<S>) -> BoxedResponse {
    match std::fs::File::open(board.scheduler().output_path()) {
        Ok(file) => {
            return tiny_http::Response::from_file(file)
                .with_header(header("Content-Type", "image/png"))
                .with_header(header("Cache-Control", "no-cache"))
                .boxed();
        },
        Err(err) => {
            debug!("No snapshot to serve: {}", err);
            return html_response(404, "<h1>404</h1><p>No snapshot yet<p>".to_string());
        },
    }
}

fn status_page<S: feed::DepartureSource>(board: &board::Board<S>) -> BoxedResponse {
    use std::sync::atomic::Ordering;

    let scheduler = board.scheduler();
    let stats = scheduler.stats();

    let image_size = std::fs::metadata(scheduler.output_path())
        .map(|m| pretty_bytes::converter::convert(m.len() as f64))
        .unwrap_or("[none]".to_string());
    let last_trigger = scheduler.since_last_trigger(std::time::Instant::now())
        .map(|d| format!("{}s ago", d.as_secs()))
        .unwrap_or("never".to_string());

    let body = format!(
        "<html><body><h1>Departure Board Status</h1>\
         <div>Snapshot: {} [{}]</div>\
         <div>Last trigger: {}</div>\
         <div>Captures: {} started, {} succeeded, {} failed</div>\
         <div><img style='border: 1px solid black;' src='/image.png' /></div>\
         </body></html>",
        page::escape(&scheduler.output_path().display().to_string()),
        image_size,
        last_trigger,
        stats.started.load(Ordering::Relaxed),
        stats.succeeded.load(Ordering::Relaxed),
        stats.failed.load(Ordering::Relaxed));

    return html_response(200, body);
}
