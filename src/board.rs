extern crate chrono;
extern crate chrono_tz;

use crate::config;
use crate::feed;
use crate::grouping;
use crate::result::FetchError;
use crate::services;
use crate::snapshot;

pub const DISPLAY_TZ: chrono_tz::Tz = chrono_tz::Europe::London;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardData {
    #[serde(flatten)]
    pub groups: grouping::PlatformGroups,
    pub last_updated: String,
    pub station_name: String,
}

pub struct Board<S: feed::DepartureSource> {
    source: S,
    scheduler: snapshot::SnapshotScheduler,
}

impl<S: feed::DepartureSource> Board<S> {
    pub fn new(source: S, scheduler: snapshot::SnapshotScheduler) -> Board<S> {
        return Board{
            source: source,
            scheduler: scheduler,
        };
    }

    pub fn scheduler(&self) -> &snapshot::SnapshotScheduler {
        return &self.scheduler;
    }

    pub fn departures(&self) -> Result<BoardData, FetchError> {
        return self.departures_at(
            std::time::Instant::now(),
            &chrono::Utc::now().with_timezone(&DISPLAY_TZ));
    }

    // A failed fetch leaves the snapshot schedule alone.
    pub fn departures_at(&self,
                         now: std::time::Instant,
                         wall_clock: &chrono::DateTime<chrono_tz::Tz>) -> Result<BoardData, FetchError> {
        let raw = self.source.fetch()?;

        let canonical = services::normalize(&raw);
        let groups = grouping::group(canonical);

        self.scheduler.maybe_trigger(now);

        return Ok(BoardData{
            groups: groups,
            last_updated: wall_clock.format("%H:%M:%S").to_string(),
            station_name: raw.location_name.unwrap_or(config::DEFAULT_STATION.to_string()),
        });
    }
}
