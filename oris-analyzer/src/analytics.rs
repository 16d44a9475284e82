//! Analytics engine: graph series and styled tables
//!
//! The engine produces plain data. Plotting and table rendering belong to the consumer.

use crate::models::{EventPlacement, RunnerTimeline};
use crate::selector::RowSelection;
use crate::table::{ProjectedRow, Projection};
use chrono::NaiveDate;
use oris_common::{RaceTime, Result, TimeCell};
use serde::Serialize;
use tracing::debug;

/// Label of the synthetic start point
pub const START_LABEL: &str = "S";

/// One competitor's line on a graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorSeries {
    pub reg_no: String,
    pub name: String,
    /// One value per label of the owning [`SeriesSet`]
    pub points: Vec<RaceTime>,
}

/// Series of all plotted competitors sharing one x axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSet {
    /// "S", "K1".."Kn", "F"
    pub labels: Vec<String>,
    /// In placement order
    pub series: Vec<CompetitorSeries>,
}

impl SeriesSet {
    pub fn get(&self, reg_no: &str) -> Option<&CompetitorSeries> {
        self.series.iter().find(|s| s.reg_no == reg_no)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Times from the start for every selected competitor, starting at zero
///
/// Disqualified competitors and rows with a missing checkpoint time are left out.
pub fn absolute_series(projection: &Projection, selection: &RowSelection) -> SeriesSet {
    let labels = std::iter::once(START_LABEL.to_string())
        .chain(projection.checkpoints.iter().map(|cp| cp.short_label()))
        .collect();

    let series = selection
        .rows
        .iter()
        .filter_map(|&i| projection.rows.get(i))
        .filter_map(|row| {
            let points = series_points(row)?;
            Some(CompetitorSeries {
                reg_no: row.reg_no.clone(),
                name: row.name.clone(),
                points,
            })
        })
        .collect();

    SeriesSet { labels, series }
}

fn series_points(row: &ProjectedRow) -> Option<Vec<RaceTime>> {
    if row.disqualified {
        return None;
    }
    let mut points = Vec::with_capacity(row.cells.len() + 1);
    points.push(RaceTime::ZERO);
    for cell in &row.cells {
        match cell.time {
            TimeCell::Time(t) => points.push(t),
            _ => {
                debug!(reg_no = %row.reg_no, "Skipping incomplete series");
                return None;
            }
        }
    }
    Some(points)
}

/// Loss to whoever was fastest at each checkpoint among the selected competitors
///
/// The baseline is recomputed per checkpoint, so the value shows the instantaneous loss,
/// not the deficit to one fixed runner.
pub fn relative_series(projection: &Projection, selection: &RowSelection) -> Result<SeriesSet> {
    let mut set = absolute_series(projection, selection);

    for column in 0..set.labels.len() {
        let Some(minimum) = set.series.iter().map(|s| s.points[column]).min() else {
            break;
        };
        for series in &mut set.series {
            series.points[column] = series.points[column].relative_to(minimum)?;
        }
    }

    Ok(set)
}

/// Table row with its highlight flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledRow {
    #[serde(flatten)]
    pub row: ProjectedRow,
    pub highlighted: bool,
}

/// Selected rows of a projection ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledTable {
    pub headers: Vec<String>,
    pub rows: Vec<StyledRow>,
}

/// Keep the selected rows and mark the highlighted ones
pub fn styled_table(projection: &Projection, selection: &RowSelection) -> StyledTable {
    let rows = selection
        .rows
        .iter()
        .filter_map(|&i| projection.rows.get(i))
        .map(|row| StyledRow {
            highlighted: selection.is_highlighted(&row.reg_no),
            row: row.clone(),
        })
        .collect();

    StyledTable {
        headers: projection.headers(),
        rows,
    }
}

/// Event level groups of the runner graphs
pub const LEVEL_GROUPS: [&[&str]; 3] = [&["ČP", "MČR"], &["ŽB"], &["OŽ", "OM", "E", "OF"]];

/// Titles of the level groups
pub const LEVEL_GROUP_TITLES: [&str; 3] = [
    "MČR & Český Pohár & Žebříček A",
    "Žebříček B",
    "Oblastní závody & Etapové",
];

/// Disciplines plotted on the runner graphs, with their legend names
pub const RUNNER_DISCIPLINES: [(&str, &str); 3] =
    [("SP", "Sprint"), ("KT", "Krátká"), ("KL", "Klasika")];

/// Placement of one event on a runner graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementPoint {
    pub date: NaiveDate,
    pub place: u32,
    /// "Event name / class"
    pub hover: String,
}

/// Placements of one discipline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisciplineSeries {
    pub discipline: String,
    pub label: String,
    pub points: Vec<PlacementPoint>,
}

/// Placements per discipline for events of one level group
///
/// Returns `None` for an unknown group or when no placed event falls into it.
pub fn runner_level_series(
    timeline: &RunnerTimeline,
    group: usize,
) -> Option<Vec<DisciplineSeries>> {
    let levels = LEVEL_GROUPS.get(group)?;

    let placed: Vec<_> = timeline
        .entries
        .iter()
        .filter(|e| levels.contains(&e.level.as_str()))
        .filter_map(|e| match e.placement {
            EventPlacement::Place(n) => Some((e, n)),
            EventPlacement::Disqualified => None,
        })
        .collect();
    if placed.is_empty() {
        return None;
    }

    Some(
        RUNNER_DISCIPLINES
            .iter()
            .map(|(code, label)| DisciplineSeries {
                discipline: code.to_string(),
                label: label.to_string(),
                points: placed
                    .iter()
                    .filter(|(e, _)| e.discipline == *code)
                    .map(|(e, place)| PlacementPoint {
                        date: e.date,
                        place: *place,
                        hover: format!("{} / {}", e.name, e.class_name),
                    })
                    .collect(),
            })
            .collect(),
    )
}
