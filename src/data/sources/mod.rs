//! Remote and local data sources

pub mod nflverse;
pub mod pfr;

use crate::data::events::PlayEvent;
use crate::data::season_table::SeasonTable;
use crate::{DataSource, GridironError, Result, SeasonRange, SourceConfig};
use reqwest::blocking::{Client, Response};

pub use nflverse::{LocalEvents, NextGenStats, NgsStatType, PlayByPlay};
pub use pfr::{parse_category, season_stats, ProFootballReference, SavedPages, StatCategory};

/// Anything that yields play-by-play events per season
pub trait EventSource {
    /// The data source this reader fetches from
    fn source(&self) -> DataSource;

    /// Fetch every play of one season
    fn fetch_season(&self, season: u16) -> Result<Vec<PlayEvent>>;

    /// Fetch and concatenate every season in `range`, in order.
    /// The first unavailable season aborts the whole fetch.
    fn fetch_range(&self, range: SeasonRange) -> Result<Vec<PlayEvent>> {
        let mut events = Vec::new();
        for season in range.seasons() {
            log::info!("Loading {} season {}", self.source(), season);
            let plays = self.fetch_season(season)?;
            log::debug!("  {} plays", plays.len());
            events.extend(plays);
        }
        Ok(events)
    }
}

/// Anything that yields per-category season tables
pub trait SeasonTableSource {
    fn source(&self) -> DataSource;

    fn fetch_table(&self, year: u16, category: StatCategory) -> Result<SeasonTable>;
}

pub fn http_client(config: &SourceConfig) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// GET `url`; transport failures and non-success statuses are `SourceUnavailable`
pub(crate) fn fetch(client: &Client, url: &str, data_source: DataSource) -> Result<Response> {
    log::debug!("GET {}", url);
    let response = client
        .get(url)
        .send()
        .map_err(|e| GridironError::SourceUnavailable {
            data_source,
            message: format!("{}: {}", url, e),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(GridironError::SourceUnavailable {
            data_source,
            message: format!("{} returned {}", url, status),
        });
    }
    Ok(response)
}
