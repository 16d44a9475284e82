//! Result table projections
//!
//! A [`ResultTable`] carries both time families for every checkpoint. Views only ever show
//! one of them, so [`project`] derives a narrower table with the chosen family, a merged
//! display key and semantic finish labels. [`shrink_for_export`] further cuts a projection
//! into the three column groups of a printed page.

use crate::models::{Checkpoint, ResultTable, Split};
use oris_common::TimeCell;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which time family a projection keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFamily {
    /// Cumulative time from the start
    Totals,
    /// Leg time from the previous checkpoint
    Splits,
}

impl TimeFamily {
    /// Header of the time column at `checkpoint`
    pub fn time_header(&self, checkpoint: Checkpoint) -> String {
        match (self, checkpoint) {
            (TimeFamily::Totals, Checkpoint::Control(n)) => format!("TotalTime{}", n),
            (TimeFamily::Totals, Checkpoint::Finish) => "FinishTime".to_string(),
            (TimeFamily::Splits, Checkpoint::Control(n)) => format!("SplitTime{}", n),
            (TimeFamily::Splits, Checkpoint::Finish) => "ToFinishTime".to_string(),
        }
    }

    /// Header of the place column at `checkpoint`
    pub fn place_header(&self, checkpoint: Checkpoint) -> String {
        match (self, checkpoint) {
            (TimeFamily::Totals, Checkpoint::Control(n)) => format!("TotalPlace{}", n),
            (TimeFamily::Totals, Checkpoint::Finish) => "FinishPlace".to_string(),
            (TimeFamily::Splits, Checkpoint::Control(n)) => format!("SplitPlace{}", n),
            (TimeFamily::Splits, Checkpoint::Finish) => "ToFinishPlace".to_string(),
        }
    }
}

impl fmt::Display for TimeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFamily::Totals => f.write_str("totals"),
            TimeFamily::Splits => f.write_str("splits"),
        }
    }
}

impl FromStr for TimeFamily {
    type Err = oris_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "totals" => Ok(TimeFamily::Totals),
            "splits" => Ok(TimeFamily::Splits),
            other => Err(oris_common::Error::InvalidInput(format!(
                "unknown time family '{}'",
                other
            ))),
        }
    }
}

/// Row of a projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRow {
    /// Placement and name merged ("1. Jan Novák")
    pub key: String,
    pub reg_no: String,
    pub name: String,
    pub club: String,
    pub time: TimeCell,
    pub loss: TimeCell,
    pub disqualified: bool,
    /// One cell per checkpoint of the projected family
    pub cells: Vec<Split>,
}

/// Table view holding exactly one time family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub family: TimeFamily,
    pub checkpoints: Vec<Checkpoint>,
    /// Same order and length as the source table rows
    pub rows: Vec<ProjectedRow>,
}

impl Projection {
    /// Identity headers followed by alternating time/place headers per checkpoint
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = ["Club", "RegNo", "Time", "Loss"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        for cp in &self.checkpoints {
            headers.push(self.family.time_header(*cp));
            headers.push(self.family.place_header(*cp));
        }
        headers
    }
}

/// Derive the single-family view of a table; disqualified rows are kept
pub fn project(table: &ResultTable, family: TimeFamily) -> Projection {
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let cells = match family {
                TimeFamily::Totals => row.totals.clone(),
                TimeFamily::Splits => row.splits.clone(),
            };
            ProjectedRow {
                key: row.display_key(),
                reg_no: row.reg_no.clone(),
                name: row.name.clone(),
                club: row.club.clone(),
                time: row.time,
                loss: row.loss,
                disqualified: row.is_disqualified(),
                cells,
            }
        })
        .collect();

    Projection {
        family,
        checkpoints: table.checkpoints().to_vec(),
        rows,
    }
}

/// Export row split into its column groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    /// Index column ("1. Jan Novák")
    pub key: String,
    pub reg_no: String,
    /// RegNo, Time, Loss
    pub front: Vec<String>,
    pub times: Vec<String>,
    pub places: Vec<String>,
}

/// Projection cut into front, time and place groups for printing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportTable {
    pub family: TimeFamily,
    pub front_headers: Vec<String>,
    /// "K1".."Kn", "F"
    pub time_headers: Vec<String>,
    pub place_headers: Vec<String>,
    pub rows: Vec<ExportRow>,
}

impl ExportTable {
    /// Number of time (and place) columns
    pub fn column_count(&self) -> usize {
        self.time_headers.len()
    }
}

/// Split a projection into the printable column groups
///
/// The club column is dropped and headers shrink to single-letter family prefixes.
pub fn shrink_for_export(projection: &Projection) -> ExportTable {
    let short: Vec<String> = projection
        .checkpoints
        .iter()
        .map(Checkpoint::short_label)
        .collect();

    let rows = projection
        .rows
        .iter()
        .map(|row| ExportRow {
            key: row.key.clone(),
            reg_no: row.reg_no.clone(),
            front: vec![row.reg_no.clone(), row.time.to_string(), row.loss.to_string()],
            times: row.cells.iter().map(|c| c.time.to_string()).collect(),
            places: row.cells.iter().map(|c| c.place.to_string()).collect(),
        })
        .collect();

    ExportTable {
        family: projection.family,
        front_headers: vec!["RegNo".into(), "Time".into(), "Loss".into()],
        time_headers: short.clone(),
        place_headers: short,
        rows,
    }
}
