//! Scripted in-memory results source and table builders shared by integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use oris_analyzer::models::{
    CatalogEvent, Category, Checkpoint, Competitor, Discipline, EntryRef, EventDetail, Place,
    PlacementLookup, ResultRow, ResultTable, Split,
};
use oris_analyzer::{EventQuery, ResultsSource};
use oris_common::{Error, RaceTime, Result, TimeCell};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Source answering from fixed maps, counting every call
#[derive(Default)]
pub struct ScriptedSource {
    pub competitors: HashMap<String, Competitor>,
    pub entries: Vec<EntryRef>,
    pub catalog: Vec<CatalogEvent>,
    pub details: HashMap<String, EventDetail>,
    /// (event id, class id) → outcome; anything missing is absent
    pub placements: HashMap<(String, String), PlacementLookup>,
    /// Event ids whose placement lookups fail; switchable between calls
    pub failing_events: Mutex<HashSet<String>>,
    pub splits: HashMap<String, ResultTable>,
    pub calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn with_competitor(mut self, reg_no: &str, user_id: &str) -> Self {
        self.competitors.insert(
            reg_no.to_uppercase(),
            Competitor {
                user_id: user_id.to_string(),
                first_name: "Adam".to_string(),
                last_name: "Bílý".to_string(),
            },
        );
        self
    }

    pub fn with_event(mut self, event: CatalogEvent, categories: &[(&str, &str)]) -> Self {
        self.details.insert(
            event.id.clone(),
            EventDetail {
                id: event.id.clone(),
                name: event.name.clone(),
                date: event.date,
                place: "Jihlava".to_string(),
                map: "Les".to_string(),
                discipline: Discipline {
                    id: "2".to_string(),
                    short_name: event.discipline.clone(),
                    name: "Krátká trať".to_string(),
                },
                categories: categories
                    .iter()
                    .map(|(id, name)| Category {
                        id: id.to_string(),
                        name: name.to_string(),
                        distance: "5.0".to_string(),
                        climb: "120".to_string(),
                        controls: "15".to_string(),
                    })
                    .collect(),
            },
        );
        self.catalog.push(event);
        self
    }

    pub fn with_entry(mut self, event_id: &str, class_id: &str, class_desc: &str) -> Self {
        self.entries.push(EntryRef {
            event_id: event_id.to_string(),
            class_id: class_id.to_string(),
            class_desc: class_desc.to_string(),
        });
        self
    }

    pub fn with_placement(
        mut self,
        event_id: &str,
        class_id: &str,
        outcome: PlacementLookup,
    ) -> Self {
        self.placements
            .insert((event_id.to_string(), class_id.to_string()), outcome);
        self
    }

    pub fn fail_event(&self, event_id: &str) {
        self.failing_events.lock().unwrap().insert(event_id.to_string());
    }

    pub fn recover_event(&self, event_id: &str) {
        self.failing_events.lock().unwrap().remove(event_id);
    }
}

#[async_trait]
impl ResultsSource for ScriptedSource {
    async fn fetch_competitor(&self, reg_no: &str) -> Result<Competitor> {
        self.hit();
        self.competitors
            .get(&reg_no.to_uppercase())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("registrační číslo {}", reg_no)))
    }

    async fn fetch_event_entries(
        &self,
        user_id: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<EntryRef>> {
        self.hit();
        if self.entries.is_empty() {
            return Err(Error::NoData(format!("přihlášky uživatele {}", user_id)));
        }
        Ok(self.entries.clone())
    }

    async fn fetch_placement(
        &self,
        event_id: &str,
        class_id: &str,
        _user_id: &str,
    ) -> Result<PlacementLookup> {
        self.hit();
        if self.failing_events.lock().unwrap().contains(event_id) {
            return Err(Error::Fetch("request timed out".to_string()));
        }
        Ok(self
            .placements
            .get(&(event_id.to_string(), class_id.to_string()))
            .copied()
            .unwrap_or(PlacementLookup::Absent))
    }

    async fn fetch_event_catalog(&self, query: &EventQuery) -> Result<Vec<CatalogEvent>> {
        self.hit();
        let events: Vec<CatalogEvent> = self
            .catalog
            .iter()
            .filter(|e| chrono::Datelike::year(&e.date) == query.season)
            .cloned()
            .collect();
        if events.is_empty() {
            return Err(Error::NoData(format!("závody v sezóně {}", query.season)));
        }
        Ok(events)
    }

    async fn fetch_event_detail(&self, event_id: &str) -> Result<EventDetail> {
        self.hit();
        self.details
            .get(event_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("ID závodu {}", event_id)))
    }

    async fn fetch_splits(&self, class_id: &str) -> Result<ResultTable> {
        self.hit();
        self.splits
            .get(class_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("ID kategorie {}", class_id)))
    }
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, month, day).unwrap()
}

pub fn catalog_event(
    id: &str,
    name: &str,
    date: NaiveDate,
    discipline: &str,
    level: &str,
) -> CatalogEvent {
    CatalogEvent {
        id: id.to_string(),
        name: name.to_string(),
        date,
        discipline: discipline.to_string(),
        level: level.to_string(),
        region: "ČR".to_string(),
    }
}

/// Controls K1..Kn followed by the finish
pub fn checkpoints(controls: u32) -> Vec<Checkpoint> {
    (1..=controls)
        .map(Checkpoint::Control)
        .chain(std::iter::once(Checkpoint::Finish))
        .collect()
}

/// Result row from cumulative times; leg times are derived, places left empty
pub fn result_row(reg_no: &str, name: &str, place: Option<u32>, totals: &[&str]) -> ResultRow {
    let mut previous = RaceTime::ZERO;
    let mut total_cells = Vec::new();
    let mut split_cells = Vec::new();
    for text in totals {
        let time = TimeCell::parse(text).unwrap();
        let leg = match time.time() {
            Some(t) => {
                let leg = t.relative_to(previous).unwrap();
                previous = t;
                TimeCell::Time(leg)
            }
            None => time,
        };
        total_cells.push(Split { time, place: Place::Unplaced });
        split_cells.push(Split { time: leg, place: Place::Unplaced });
    }
    ResultRow {
        reg_no: reg_no.to_string(),
        name: name.to_string(),
        club: "Klub".to_string(),
        place: place.map(Place::Rank).unwrap_or_default(),
        time: total_cells.last().map(|s| s.time).unwrap_or_default(),
        loss: TimeCell::NoData,
        totals: total_cells,
        splits: split_cells,
    }
}
