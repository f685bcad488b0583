extern crate serde;

use crate::feed;

const UNKNOWN_DESTINATION: &str = "Unknown";

// Hassocks announces some trains late, so guess the platform from the
// destination. Checked in order, first match wins.
const PLATFORM_BY_DESTINATION: [(&str, &str); 3] = [
    ("Littlehampton", "2"),
    ("Brighton", "2"),
    ("London Victoria", "1"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusClass {
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "delayed")]
    Delayed,
    #[serde(rename = "on-time")]
    OnTime,
}

impl StatusClass {
    pub fn css_name(&self) -> &'static str {
        match *self {
            StatusClass::Cancelled => "cancelled",
            StatusClass::Delayed => "delayed",
            StatusClass::OnTime => "on-time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalService {
    #[serde(rename = "std")]
    pub scheduled_time: String,
    #[serde(rename = "etd")]
    pub estimated_time: String,
    pub platform: String,
    pub destination: String,
    pub operator: String,
    pub is_cancelled: bool,
    pub cancel_reason: String,
    pub delay_reason: String,
    pub status: String,
    pub status_class: StatusClass,
}

pub fn normalize(response: &feed::RawFeedResponse) -> Vec<CanonicalService> {
    let raw_services = match response.train_services {
        Some(ref services) => services,
        None => return vec![],
    };

    return raw_services.iter().map(normalize_service).collect();
}

fn normalize_service(raw: &feed::RawService) -> CanonicalService {
    let destination = raw.destination.first()
        .and_then(|d| d.location_name.clone())
        .unwrap_or(UNKNOWN_DESTINATION.to_string());

    let platform = if raw.platform.is_empty() {
        infer_platform(&destination).unwrap_or("").to_string()
    } else {
        raw.platform.clone()
    };

    let (status, status_class) = derive_status(raw.is_cancelled, &raw.etd, &raw.std);

    return CanonicalService{
        scheduled_time: raw.std.clone(),
        estimated_time: raw.etd.clone(),
        platform: platform,
        destination: destination,
        operator: raw.operator.clone(),
        is_cancelled: raw.is_cancelled,
        cancel_reason: raw.cancel_reason.clone(),
        delay_reason: raw.delay_reason.clone(),
        status: status,
        status_class: status_class,
    };
}

pub fn infer_platform(destination: &str) -> Option<&'static str> {
    return PLATFORM_BY_DESTINATION.iter()
        .find(|(needle, _)| destination.contains(needle))
        .map(|(_, platform)| *platform);
}

// Any etd that isn't "On time" and doesn't match the schedule is shown as-is,
// it's usually a revised departure time like "10:07".
pub fn derive_status(is_cancelled: bool, estimated: &str, scheduled: &str) -> (String, StatusClass) {
    if is_cancelled {
        return ("Cancelled".to_string(), StatusClass::Cancelled);
    }
    if estimated == "Delayed" {
        return ("Delayed".to_string(), StatusClass::Delayed);
    }
    if estimated != "On time" && estimated != scheduled {
        return (estimated.to_string(), StatusClass::Delayed);
    }
    return ("On time".to_string(), StatusClass::OnTime);
}
