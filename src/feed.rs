extern crate reqwest;
extern crate serde;
extern crate serde_json;
extern crate serde_with;

use crate::config;
use crate::result::FetchError;
use serde_with::{DefaultOnNull, serde_as};

// The slice of the upstream departures document we care about.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawFeedResponse {
    pub location_name: Option<String>,
    pub train_services: Option<Vec<RawService>>,
}

#[serde_as]
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawService {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub destination: Vec<RawLocation>,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub std: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub etd: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub platform: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub operator: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub is_cancelled: bool,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub cancel_reason: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub delay_reason: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    #[serde(default)]
    pub location_name: Option<String>,
}

pub trait DepartureSource {
    fn fetch(&self) -> Result<RawFeedResponse, FetchError>;
}

pub struct FeedClient {
    config: config::FeedConfig,
    fetch_body_fn: fn(&reqwest::blocking::Client, &config::FeedConfig) -> Result<String, FetchError>,
    client: reqwest::blocking::Client,
}

impl FeedClient {
    pub fn new(config: config::FeedConfig) -> Result<FeedClient, FetchError> {
        return FeedClient::new_ext(config, real_fetch_body);
    }

    fn new_ext(config: config::FeedConfig,
               fetch_body_fn: fn(&reqwest::blocking::Client, &config::FeedConfig) -> Result<String, FetchError>) -> Result<FeedClient, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config::FETCH_TIMEOUT)
            .user_agent(config::USER_AGENT)
            .build()?;

        return Ok(FeedClient{
            config: config,
            fetch_body_fn: fetch_body_fn,
            client: client,
        });
    }
}

impl DepartureSource for FeedClient {
    fn fetch(&self) -> Result<RawFeedResponse, FetchError> {
        let body = (self.fetch_body_fn)(&self.client, &self.config)?;
        return parse_response(&body);
    }
}

fn real_fetch_body(client: &reqwest::blocking::Client, config: &config::FeedConfig) -> Result<String, FetchError> {
    debug!("Fetching departures from {}", config.url);
    let response = client.get(&config.url)
        .header("x-apikey", &config.api_key)
        .send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status));
    }

    return Ok(response.text()?);
}

// Only a body that isn't JSON at all is a decode failure. Anything else that
// doesn't look like a departures document degrades to "no services".
pub fn parse_response(body: &str) -> Result<RawFeedResponse, FetchError> {
    let document: serde_json::Value = serde_json::from_str(body)?;

    let object = match document.as_object() {
        Some(object) => object,
        None => {
            warn!("Feed body is not a JSON object, treating as empty");
            return Ok(RawFeedResponse::default());
        }
    };

    let location_name = object.get("locationName")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let train_services = match object.get("trainServices") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Array(entries)) => {
            Some(entries.iter().enumerate().filter_map(|(i, entry)| {
                match serde_json::from_value::<RawService>(entry.clone()) {
                    Ok(service) => Some(service),
                    Err(err) => {
                        warn!("Skipping malformed train service #{}: {}", i, err);
                        None
                    }
                }
            }).collect())
        },
        Some(other) => {
            warn!("trainServices is not a list ({}), treating as empty", type_name(other));
            None
        }
    };

    return Ok(RawFeedResponse{
        location_name: location_name,
        train_services: train_services,
    });
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::DepartureSource;
    use crate::config;
    use crate::result::FetchError;

    fn test_config(url: &str) -> config::FeedConfig {
        return config::FeedConfig{
            url: url.to_string(),
            api_key: "test-key".to_string(),
        };
    }

    #[test]
    fn json_parse() {
        let raw_json = std::fs::read_to_string("testdata/departures.json")
            .expect("Error reading departures.json");

        let response = super::parse_response(&raw_json).expect("parse_response");
        let services = response.train_services.expect("trainServices");

        assert_eq!(Some("Hassocks".to_string()), response.location_name);
        assert_eq!(6, services.len());
        assert_eq!(Some("Brighton"), services[0].destination[0].location_name.as_deref());
        assert_eq!("10:02", services[0].std);
        assert_eq!("", services[0].platform);
        assert!(services[3].is_cancelled);
    }

    #[test]
    fn nulls_become_defaults() {
        let response = super::parse_response(
            r#"{"trainServices":[{"destination":null,"std":"10:00","etd":null,"platform":null,"isCancelled":null}]}"#)
            .expect("parse_response");
        let service = &response.train_services.unwrap()[0];

        assert!(service.destination.is_empty());
        assert_eq!("", service.etd);
        assert_eq!("", service.platform);
        assert!(!service.is_cancelled);
    }

    #[test]
    fn missing_services_is_not_an_error() {
        let response = super::parse_response(r#"{"locationName":"Hassocks"}"#).expect("parse_response");

        assert_eq!(None, response.train_services);
        assert_eq!(Some("Hassocks".to_string()), response.location_name);
    }

    #[test]
    fn malformed_shapes_degrade() {
        assert_eq!(None, super::parse_response("[1, 2, 3]").unwrap().train_services);
        assert_eq!(None, super::parse_response(r#"{"trainServices":"soon"}"#).unwrap().train_services);

        let partial = super::parse_response(
            r#"{"trainServices":[{"std":"10:00"},{"std":42},{"std":"10:30"}]}"#).unwrap();
        let stds: Vec<String> = partial.train_services.unwrap().into_iter().map(|s| s.std).collect();
        assert_eq!(vec!["10:00".to_string(), "10:30".to_string()], stds);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        match super::parse_response("<html>gateway timeout</html>") {
            Err(FetchError::Decode(_)) => {},
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn fetch_uses_injected_body() {
        let fake_fetch_fn = |_client: &reqwest::blocking::Client, _config: &config::FeedConfig| -> Result<String, FetchError> {
            return Ok(std::fs::read_to_string("testdata/departures.json").expect("error reading departures.json"));
        };

        let client = super::FeedClient::new_ext(test_config("http://unused.invalid/"), fake_fetch_fn)
            .expect("client");
        let response = client.fetch().expect("fetch");

        assert_eq!(6, response.train_services.unwrap().len());
    }

    #[test]
    fn fetch_error_status_passes_through() {
        let fake_fetch_fn = |_client: &reqwest::blocking::Client, _config: &config::FeedConfig| -> Result<String, FetchError> {
            return Err(FetchError::HttpStatus(reqwest::StatusCode::UNAUTHORIZED));
        };

        let client = super::FeedClient::new_ext(test_config("http://unused.invalid/"), fake_fetch_fn)
            .expect("client");

        match client.fetch() {
            Err(FetchError::HttpStatus(status)) => assert_eq!(401, status.as_u16()),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    fn serve_once(status: u16, body: &'static str) -> (String, std::thread::JoinHandle<Vec<(String, String)>>) {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("test server");
        let addr = server.server_addr().to_ip().expect("ip listener");

        let handle = std::thread::spawn(move || {
            let request = server.recv().expect("request");
            let headers = request.headers().iter()
                .map(|h| (h.field.as_str().as_str().to_ascii_lowercase(), h.value.as_str().to_string()))
                .collect();
            request.respond(tiny_http::Response::from_string(body).with_status_code(status))
                .expect("respond");
            return headers;
        });

        return (format!("http://{}/departures", addr), handle);
    }

    #[test]
    fn real_fetch_sends_key_and_agent() {
        let (url, handle) = serve_once(200, r#"{"locationName":"Hassocks","trainServices":[]}"#);

        let client = super::FeedClient::new(test_config(&url)).expect("client");
        let response = client.fetch().expect("fetch");
        let headers = handle.join().expect("server thread");

        assert_eq!(Some(vec![]), response.train_services);
        assert!(headers.contains(&("x-apikey".to_string(), "test-key".to_string())));
        assert!(headers.contains(&("user-agent".to_string(), config::USER_AGENT.to_string())));
    }

    #[test]
    fn real_fetch_maps_server_errors() {
        let (url, handle) = serve_once(503, "busy");

        let client = super::FeedClient::new(test_config(&url)).expect("client");
        let result = client.fetch();
        handle.join().expect("server thread");

        match result {
            Err(FetchError::HttpStatus(status)) => assert_eq!(503, status.as_u16()),
            other => panic!("expected status error, got {:?}", other),
        }
    }
}
