use crate::config;
use crate::services::CanonicalService;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformGroups {
    pub platform_1: Vec<CanonicalService>,
    pub platform_2: Vec<CanonicalService>,
    pub no_platform: Vec<CanonicalService>,
}

pub fn group(services: Vec<CanonicalService>) -> PlatformGroups {
    let mut groups = PlatformGroups::default();

    for service in services {
        match service.platform.as_str() {
            "1" => groups.platform_1.push(service),
            "2" => groups.platform_2.push(service),
            _ => groups.no_platform.push(service),
        }
    }

    // "HH:MM" sorts correctly as a string. sort_by is stable, so services
    // sharing a time keep their feed order.
    groups.platform_1.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
    groups.platform_2.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
    groups.no_platform.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));

    groups.platform_1.truncate(config::PLATFORM_CAP);
    groups.platform_2.truncate(config::PLATFORM_CAP);

    return groups;
}
