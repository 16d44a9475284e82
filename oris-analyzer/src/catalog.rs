//! Event catalog: season listings, event context and category lookup

use crate::models::{Category, EventDetail};
use crate::services::ResultsSource;
use oris_common::time::{current_season, season_bounds};
use oris_common::{Error, Result};
use tracing::{debug, info};

/// Discipline ids of the event detail that can be analyzed
pub const SUPPORTED_DISCIPLINE_IDS: &[&str] = &["1", "2", "3", "9"];

/// Discipline short names kept in season listings
pub const SUPPORTED_DISCIPLINES: &[&str] = &["KL", "KT", "SP", "NOB"];

/// Event level choices ("id: label") offered to users
pub const EVENT_LEVELS: &[&str] = &[
    "1: MČR",
    "8: ČP + ŽA",
    "3: ŽB",
    "11: OM",
    "4: OŽ",
    "5: E",
    "14: OF",
    "6: OST ( + zobrazit neoficiální závody)",
];

/// Season listing query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventQuery {
    pub season: i32,
    /// Substring of the event name
    pub name_mask: Option<String>,
    /// Level ids; empty means all levels
    pub levels: Vec<u32>,
    /// All sports instead of foot orienteering only
    pub all_sports: bool,
    /// Include unofficial events
    pub all_events: bool,
}

impl EventQuery {
    /// Query of one whole season with the default filters
    pub fn season(season: i32) -> Self {
        Self {
            season,
            name_mask: None,
            levels: Vec::new(),
            all_sports: false,
            all_events: false,
        }
    }

    /// Season used by the runner timeline: every event, foot orienteering only
    pub fn runner_season(season: i32) -> Self {
        Self {
            all_events: true,
            ..Self::season(season)
        }
    }

    /// Query of the current season
    pub fn current() -> Self {
        Self::season(current_season())
    }

    /// Request parameters of the event listing method
    pub fn to_params(&self) -> Result<Vec<(&'static str, String)>> {
        let (from, to) = season_bounds(self.season)?;
        let mut params = vec![
            ("datefrom", from.to_string()),
            ("dateto", to.to_string()),
            ("all", if self.all_events { "1" } else { "0" }.to_string()),
        ];
        if !self.all_sports {
            params.push(("sport", "1".to_string()));
        }
        if let Some(mask) = self.name_mask.as_deref().filter(|m| !m.is_empty()) {
            params.push(("name", mask.to_string()));
        }
        if !self.levels.is_empty() {
            let levels: Vec<String> = self.levels.iter().map(u32::to_string).collect();
            params.push(("level", levels.join(",")));
        }
        Ok(params)
    }
}

/// Id of an "id: label" choice
fn choice_id(choice: &str) -> Option<u32> {
    choice.split(':').next().and_then(|id| id.trim().parse().ok())
}

/// Level id of an "id: label" choice; only ids of [`EVENT_LEVELS`] are accepted
pub fn parse_level_choice(choice: &str) -> Result<u32> {
    choice_id(choice)
        .filter(|id| EVENT_LEVELS.iter().any(|level| choice_id(level) == Some(*id)))
        .ok_or_else(|| Error::InvalidInput(format!("event level '{}'", choice)))
}

/// Whether a listed event should be shown
pub fn is_listed(discipline: &str, cancelled: bool) -> bool {
    !cancelled && SUPPORTED_DISCIPLINES.contains(&discipline)
}

/// Currently loaded event, passed explicitly through a request
#[derive(Debug, Clone)]
pub struct EventContext {
    pub detail: EventDetail,
}

impl EventContext {
    /// Load an event and check its discipline can be analyzed
    pub async fn load<S: ResultsSource + ?Sized>(source: &S, event_id: &str) -> Result<Self> {
        let detail = source.fetch_event_detail(event_id).await?;
        if !SUPPORTED_DISCIPLINE_IDS.contains(&detail.discipline.id.as_str()) {
            return Err(Error::UnsupportedDiscipline(detail.discipline.name.clone()));
        }
        info!(event_id = %event_id, name = %detail.name, "Loaded event");
        Ok(Self { detail })
    }

    pub fn categories(&self) -> &[Category] {
        &self.detail.categories
    }

    /// Category id for a category name (case-insensitive)
    pub fn resolve_category_id(&self, name: &str) -> Result<&str> {
        let wanted = name.trim().to_uppercase();
        let found = self
            .detail
            .categories
            .iter()
            .find(|c| c.name.to_uppercase() == wanted)
            .map(|c| c.id.as_str());
        debug!(category = %name, found = ?found, "Resolving category name");
        found.ok_or_else(|| {
            Error::NotFound(format!("kategorie {} v závodě {}", name, self.detail.id))
        })
    }
}
