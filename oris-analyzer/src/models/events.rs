//! Event, category and competitor records exchanged with the results source

use chrono::NaiveDate;
use oris_common::time::{format_date, DISQUALIFIED_MARK};
use serde::{Serialize, Serializer};
use std::fmt;

/// Competitor identity resolved from a registration number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Competitor {
    /// Internal user id of the results service
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl Competitor {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Registration of a competitor for one event class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryRef {
    pub event_id: String,
    pub class_id: String,
    /// Class label as registered ("H21", "D35")
    pub class_desc: String,
}

/// Outcome of a placement lookup for one (event, class, user)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementLookup {
    Place(u32),
    Disqualified,
    /// No placement recorded for the user in that class
    Absent,
}

/// Placement kept in a timeline (absent entries never get this far)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPlacement {
    Place(u32),
    Disqualified,
}

impl EventPlacement {
    pub fn from_lookup(lookup: PlacementLookup) -> Option<Self> {
        match lookup {
            PlacementLookup::Place(n) => Some(EventPlacement::Place(n)),
            PlacementLookup::Disqualified => Some(EventPlacement::Disqualified),
            PlacementLookup::Absent => None,
        }
    }
}

impl fmt::Display for EventPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPlacement::Place(n) => write!(f, "{}.", n),
            EventPlacement::Disqualified => f.write_str(DISQUALIFIED_MARK),
        }
    }
}

impl Serialize for EventPlacement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One event of the season calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEvent {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    /// Discipline short name ("KL", "KT", "SP", "NOB")
    pub discipline: String,
    /// Level short name ("MČR", "ŽA", "ŽB", ...)
    pub level: String,
    pub region: String,
}

/// Discipline of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discipline {
    pub id: String,
    pub short_name: String,
    /// Czech display name
    pub name: String,
}

/// Category (class) of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub distance: String,
    pub climb: String,
    pub controls: String,
}

/// Event with its category list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDetail {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub place: String,
    pub map: String,
    pub discipline: Discipline,
    pub categories: Vec<Category>,
}

impl EventDetail {
    /// Header lines for the event summary and the export cover page
    pub fn info_lines(&self) -> Vec<String> {
        vec![
            format!("Jméno: {}", self.name),
            format!("Datum: {}", format_date(self.date)),
            format!("Místo: {}", self.place),
            format!("Mapa: {}", self.map),
            format!("Disciplína: {}", self.discipline.name),
        ]
    }
}

/// One event in a runner's season
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventEntry {
    pub event_id: String,
    pub date: NaiveDate,
    pub name: String,
    pub discipline: String,
    pub level: String,
    /// Class label the placement belongs to
    pub class_name: String,
    pub placement: EventPlacement,
}

/// Chronological, deduplicated season history of one competitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunnerTimeline {
    pub reg_no: String,
    pub season: i32,
    pub competitor_name: String,
    pub entries: Vec<EventEntry>,
}

impl RunnerTimeline {
    pub fn info_lines(&self) -> Vec<String> {
        vec![
            format!("Jméno: {}", self.competitor_name),
            format!("Registrační číslo: {}", self.reg_no.to_uppercase()),
            format!("Sezóna: {}", self.season),
        ]
    }
}
