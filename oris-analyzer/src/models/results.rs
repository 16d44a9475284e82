//! Result table model: one row per competitor, one slot per checkpoint

use oris_common::{Error, Result, TimeCell};
use serde::{Serialize, Serializer};
use std::fmt;

/// Checkpoint number the results service uses for the finish
pub const FINISH_CODE: u32 = 999;

/// Place value the results service uses for "no place"
const UNPLACED_CODE: &str = "999";

/// Timing point along a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Checkpoint {
    /// Intermediate control, numbered from 1 in course order
    Control(u32),
    /// Terminal checkpoint
    Finish,
}

impl Checkpoint {
    pub fn from_code(code: u32) -> Self {
        if code == FINISH_CODE {
            Checkpoint::Finish
        } else {
            Checkpoint::Control(code)
        }
    }

    /// Compact header used on graphs and export pages ("K3", "F")
    pub fn short_label(&self) -> String {
        match self {
            Checkpoint::Control(n) => format!("K{}", n),
            Checkpoint::Finish => "F".to_string(),
        }
    }
}

impl Serialize for Checkpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.short_label())
    }
}

/// Placement at a checkpoint or overall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Place {
    Rank(u32),
    #[default]
    Unplaced,
}

impl Place {
    /// Parse "3", "3." or the "999" no-place marker
    pub fn parse(text: &str) -> Self {
        let text = text.trim().trim_end_matches('.');
        if text == UNPLACED_CODE {
            return Place::Unplaced;
        }
        text.parse().map(Place::Rank).unwrap_or(Place::Unplaced)
    }

    pub fn rank(&self) -> Option<u32> {
        match self {
            Place::Rank(n) => Some(*n),
            Place::Unplaced => None,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Rank(n) => write!(f, "{}", n),
            Place::Unplaced => f.write_str("---"),
        }
    }
}

impl Serialize for Place {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Time and place at one checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Split {
    pub time: TimeCell,
    pub place: Place,
}

/// One competitor's full record for one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// Registration number, the competitor identity used by filters
    pub reg_no: String,
    pub name: String,
    pub club: String,
    /// Overall placement
    pub place: Place,
    /// Overall time
    pub time: TimeCell,
    /// Overall loss to the winner, as reported by the service
    pub loss: TimeCell,
    /// Cumulative time from the start, one per checkpoint
    pub totals: Vec<Split>,
    /// Leg time from the previous checkpoint, one per checkpoint
    pub splits: Vec<Split>,
}

impl ResultRow {
    /// Disqualified competitors have no monotonic checkpoint series
    pub fn is_disqualified(&self) -> bool {
        self.time.is_disqualified()
            || self
                .totals
                .last()
                .map(|s| s.time.is_disqualified())
                .unwrap_or(false)
    }

    /// "1. Jan Novák" style key shown in tables
    pub fn display_key(&self) -> String {
        match self.place {
            Place::Rank(n) => format!("{}. {}", n, self.name),
            Place::Unplaced => self.name.clone(),
        }
    }
}

/// Rows of one category ordered by overall placement; row 0 is the leader
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    checkpoints: Vec<Checkpoint>,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    /// Build a table, checking that every row has one slot per checkpoint
    pub fn new(checkpoints: Vec<Checkpoint>, rows: Vec<ResultRow>) -> Result<Self> {
        if let Some(bad) = rows.iter().find(|r| {
            r.totals.len() != checkpoints.len() || r.splits.len() != checkpoints.len()
        }) {
            return Err(Error::InvalidInput(format!(
                "row {} has {} totals / {} splits for {} checkpoints",
                bad.reg_no,
                bad.totals.len(),
                bad.splits.len(),
                checkpoints.len()
            )));
        }
        if checkpoints.last() != Some(&Checkpoint::Finish) && !checkpoints.is_empty() {
            return Err(Error::InvalidInput(
                "checkpoint sequence must end with the finish".to_string(),
            ));
        }
        Ok(Self { checkpoints, rows })
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn leader(&self) -> Option<&ResultRow> {
        self.rows.first()
    }

    /// Sorted "RegNo: Name" choices for the runner filter, leader excluded
    /// (the leader is always compared anyway)
    pub fn runner_choices(&self) -> Vec<String> {
        let mut choices: Vec<String> = self
            .rows
            .iter()
            .skip(1)
            .map(|r| format!("{}: {}", r.reg_no, r.name))
            .collect();
        choices.sort();
        choices
    }
}

/// Registration number part of a "RegNo: Name" filter choice
pub fn parse_filter_choice(choice: &str) -> &str {
    choice.split(':').next().unwrap_or(choice).trim()
}
