//! Runner timeline merger
//!
//! Builds one competitor's season history from the results source: registered entries joined
//! with the season catalog, one placement lookup per entry, qualification heats of two-stage
//! championships replaced by the final, then deduplicated and sorted.

use crate::catalog::EventQuery;
use crate::models::{
    CatalogEvent, EntryRef, EventEntry, EventPlacement, PlacementLookup, RunnerTimeline,
};
use crate::services::ResultsSource;
use futures::stream::{self, StreamExt};
use oris_common::time::season_bounds;
use oris_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Level of national championships, the only level with qualification heats
pub const CHAMPIONSHIP_LEVEL: &str = "MČR";

/// Name fragment marking the final of a two-stage championship
pub const FINAL_MARKER: &str = "finále";

/// Default number of concurrent placement lookups
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Outcome of the search for a qualification's final
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalResolution {
    /// Entry rewritten to the final event and class
    Resolved(EventEntry),
    /// No candidate class yielded a placement
    Unresolved,
}

/// Outcome of one registered entry
enum EntryOutcome {
    Kept(EventEntry),
    /// No placement to show
    Skipped,
    /// A lookup failed; the entry may appear on a later attempt
    Failed,
}

/// Merges season histories, caching one timeline per (registration number, season)
pub struct TimelineMerger<S> {
    source: S,
    concurrency: usize,
    timelines: RwLock<HashMap<(String, i32), RunnerTimeline>>,
}

impl<S: ResultsSource> TimelineMerger<S> {
    pub fn new(source: S, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            timelines: RwLock::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Season timeline of one competitor
    ///
    /// An unknown registration number, a season without entries, or a season where no entry
    /// resolved to a placement is an error. A failed lookup for a single entry only drops that
    /// entry, and a timeline missing such an entry is not cached.
    pub async fn timeline(&self, reg_no: &str, season: i32) -> Result<RunnerTimeline> {
        let key = (reg_no.to_uppercase(), season);
        if let Some(timeline) = self.timelines.read().await.get(&key) {
            debug!(reg_no = %reg_no, season, "Timeline cache hit");
            return Ok(timeline.clone());
        }

        let (timeline, complete) = self.build(reg_no, season).await?;
        if complete {
            self.timelines.write().await.insert(key, timeline.clone());
        } else {
            debug!(reg_no = %reg_no, season, "Timeline has failed lookups, not cached");
        }
        Ok(timeline)
    }

    /// Timeline plus whether every lookup succeeded
    async fn build(&self, reg_no: &str, season: i32) -> Result<(RunnerTimeline, bool)> {
        let competitor = self.source.fetch_competitor(reg_no).await?;
        let (from, to) = season_bounds(season)?;
        let entries = self
            .source
            .fetch_event_entries(&competitor.user_id, from, to)
            .await?;
        let catalog = self
            .source
            .fetch_event_catalog(&EventQuery::runner_season(season))
            .await?;

        let joined: Vec<(EntryRef, &CatalogEvent)> = entries
            .into_iter()
            .filter_map(|entry| {
                let event = catalog.iter().find(|e| e.id == entry.event_id);
                if event.is_none() {
                    debug!(event_id = %entry.event_id, "Entry outside the season catalog");
                }
                event.map(|e| (entry, e))
            })
            .collect();

        let user_id = competitor.user_id.as_str();
        let catalog = catalog.as_slice();
        let outcomes: Vec<EntryOutcome> = stream::iter(joined)
            .map(|(entry, event)| self.resolve_entry(user_id, entry, event, catalog))
            .buffered(self.concurrency)
            .collect()
            .await;

        let complete = !outcomes.iter().any(|o| matches!(o, EntryOutcome::Failed));
        let entries = merge(outcomes.into_iter().filter_map(|o| match o {
            EntryOutcome::Kept(entry) => Some(entry),
            EntryOutcome::Skipped | EntryOutcome::Failed => None,
        }));
        if entries.is_empty() {
            return Err(Error::NoData(format!(
                "výsledky {} v sezóně {}",
                reg_no.to_uppercase(),
                season
            )));
        }
        info!(
            reg_no = %reg_no,
            season,
            entries = entries.len(),
            complete,
            "Built runner timeline"
        );

        let timeline = RunnerTimeline {
            reg_no: reg_no.to_string(),
            season,
            competitor_name: competitor.display_name(),
            entries,
        };
        Ok((timeline, complete))
    }

    /// Placement of one entry, following championship qualifications to their final
    async fn resolve_entry(
        &self,
        user_id: &str,
        entry: EntryRef,
        event: &CatalogEvent,
        catalog: &[CatalogEvent],
    ) -> EntryOutcome {
        let lookup = match self
            .source
            .fetch_placement(&entry.event_id, &entry.class_id, user_id)
            .await
        {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(
                    event_id = %entry.event_id,
                    error = %e,
                    "Placement lookup failed, dropping entry"
                );
                return EntryOutcome::Failed;
            }
        };

        if let Some(placement) = EventPlacement::from_lookup(lookup) {
            return EntryOutcome::Kept(timeline_entry(event, &entry.class_desc, placement));
        }

        if lookup == PlacementLookup::Absent && event.level == CHAMPIONSHIP_LEVEL {
            return match self
                .search_final(user_id, event, &entry.class_desc, catalog)
                .await
            {
                (FinalResolution::Resolved(entry), _) => EntryOutcome::Kept(entry),
                (FinalResolution::Unresolved, true) => EntryOutcome::Failed,
                (FinalResolution::Unresolved, false) => EntryOutcome::Skipped,
            };
        }

        debug!(event_id = %entry.event_id, "No placement recorded");
        EntryOutcome::Skipped
    }

    /// Find the placement in the final of a championship whose qualification had none
    ///
    /// Without a final in the catalog the qualification's own categories are searched.
    pub async fn resolve_final(
        &self,
        user_id: &str,
        qualification: &CatalogEvent,
        class_label: &str,
        catalog: &[CatalogEvent],
    ) -> FinalResolution {
        self.search_final(user_id, qualification, class_label, catalog)
            .await
            .0
    }

    /// Resolution plus whether any lookup on the way failed
    async fn search_final(
        &self,
        user_id: &str,
        qualification: &CatalogEvent,
        class_label: &str,
        catalog: &[CatalogEvent],
    ) -> (FinalResolution, bool) {
        let final_event = find_final(qualification, catalog).unwrap_or(qualification);

        let categories = match self.source.fetch_category_list(&final_event.id).await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(
                    event_id = %final_event.id,
                    error = %e,
                    "Cannot list categories of the final"
                );
                return (FinalResolution::Unresolved, true);
            }
        };

        let mut failed = false;

        for category in categories.iter().filter(|c| c.name.contains(class_label)) {
            match self
                .source
                .fetch_placement(&final_event.id, &category.id, user_id)
                .await
            {
                Ok(lookup) => {
                    if let Some(placement) = EventPlacement::from_lookup(lookup) {
                        debug!(
                            qualification = %qualification.id,
                            final_event = %final_event.id,
                            class = %category.name,
                            "Resolved championship final"
                        );
                        let entry = timeline_entry(final_event, &category.name, placement);
                        return (FinalResolution::Resolved(entry), failed);
                    }
                }
                Err(e) => {
                    failed = true;
                    warn!(
                        event_id = %final_event.id,
                        class_id = %category.id,
                        error = %e,
                        "Final placement lookup failed"
                    );
                }
            }
        }

        (FinalResolution::Unresolved, failed)
    }
}

/// Final of the same discipline in the season catalog; the marker match is case-sensitive
fn find_final<'a>(
    qualification: &CatalogEvent,
    catalog: &'a [CatalogEvent],
) -> Option<&'a CatalogEvent> {
    catalog
        .iter()
        .find(|e| e.discipline == qualification.discipline && e.name.contains(FINAL_MARKER))
}

fn timeline_entry(
    event: &CatalogEvent,
    class_name: &str,
    placement: EventPlacement,
) -> EventEntry {
    EventEntry {
        event_id: event.id.clone(),
        date: event.date,
        name: event.name.clone(),
        discipline: event.discipline.clone(),
        level: event.level.clone(),
        class_name: class_name.to_string(),
        placement,
    }
}

/// Keep the first entry per event id, ordered by date then name
fn merge(entries: impl IntoIterator<Item = EventEntry>) -> Vec<EventEntry> {
    let mut seen = HashSet::new();
    let mut merged: Vec<EventEntry> = entries
        .into_iter()
        .filter(|e| seen.insert(e.event_id.clone()))
        .collect();
    merged.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(id: &str, name: &str, day: u32, discipline: &str) -> CatalogEvent {
        CatalogEvent {
            id: id.into(),
            name: name.into(),
            date: NaiveDate::from_ymd_opt(2021, 9, day).unwrap(),
            discipline: discipline.into(),
            level: CHAMPIONSHIP_LEVEL.into(),
            region: "ČR".into(),
        }
    }

    #[test]
    fn test_find_final_same_discipline() {
        let catalog = vec![
            event("1", "MČR KT - kvalifikace", 18, "KT"),
            event("2", "MČR KL - finále", 19, "KL"),
            event("3", "MČR KT - finále", 19, "KT"),
        ];
        assert_eq!(find_final(&catalog[0], &catalog).unwrap().id, "3");
        assert!(find_final(&event("9", "MČR SP", 1, "SP"), &catalog).is_none());
    }

    #[test]
    fn test_find_final_marker_is_case_sensitive() {
        let catalog = vec![
            event("1", "MČR KT - kvalifikace", 18, "KT"),
            event("2", "MČR KT - Finále B", 19, "KT"),
            event("3", "MČR KT - finále", 19, "KT"),
        ];
        assert_eq!(find_final(&catalog[0], &catalog).unwrap().id, "3");
        assert!(find_final(&catalog[0], &catalog[..2]).is_none());
    }

    #[test]
    fn test_merge_dedups_and_sorts() {
        let entry = |id: &str, name: &str, day: u32| {
            timeline_entry(&event(id, name, day, "KL"), "H21", EventPlacement::Place(1))
        };
        let merged = merge(vec![
            entry("3", "Beta", 20),
            entry("1", "Zeta", 5),
            entry("2", "Alfa", 20),
            entry("1", "Zeta duplicate", 5),
        ]);

        let ids: Vec<&str> = merged.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(merged[0].name, "Zeta");
    }
}
