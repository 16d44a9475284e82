//! Comparative selector: which rows take part in a view and which are highlighted

use crate::models::ResultTable;
use oris_common::Error;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Maximum number of series a graph legend shows readably
pub const LEGEND_CAPACITY: usize = 22;

/// Row limit of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Limit {
    #[default]
    Unbounded,
    /// First N rows by placement
    Count(usize),
    /// First [`LEGEND_CAPACITY`] rows
    CropToLegend,
}

impl Limit {
    /// Limit used for graphs, where the legend must not overflow
    pub fn for_graph(self) -> Limit {
        match self {
            Limit::Unbounded => Limit::CropToLegend,
            Limit::Count(n) if n > LEGEND_CAPACITY => Limit::CropToLegend,
            other => other,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unbounded => f.write_str("none"),
            Limit::Count(n) => write!(f, "{}", n),
            Limit::CropToLegend => f.write_str("crop"),
        }
    }
}

impl FromStr for Limit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "" => Ok(Limit::Unbounded),
            "crop" => Ok(Limit::CropToLegend),
            n => match n.parse::<usize>() {
                Ok(0) | Err(_) => Err(Error::InvalidInput(format!("runner limit '{}'", s))),
                Ok(n) => Ok(Limit::Count(n)),
            },
        }
    }
}

/// Parameters of a view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub limit: Limit,
    /// Registration numbers explicitly picked by the user; overrides the limit
    pub filter: BTreeSet<String>,
}

impl Selection {
    pub fn new(limit: Limit, filter: impl IntoIterator<Item = String>) -> Self {
        Self {
            limit,
            filter: filter.into_iter().collect(),
        }
    }
}

/// Rows taking part in a view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowSelection {
    /// Row indices into the source table, in placement order
    pub rows: Vec<usize>,
    /// Registration numbers to highlight
    pub highlight: BTreeSet<String>,
}

impl RowSelection {
    pub fn is_highlighted(&self, reg_no: &str) -> bool {
        self.highlight.contains(reg_no)
    }
}

/// Decide the participating and highlighted rows
///
/// Policy, first match wins:
/// 1. non-empty filter: filtered rows plus the leader, highlight = filter
/// 2. crop to legend: first 22 rows, all highlighted
/// 3. count N: first N rows, all highlighted
/// 4. unbounded: every row, nothing highlighted
pub fn select_rows(table: &ResultTable, selection: &Selection) -> RowSelection {
    if !selection.filter.is_empty() {
        let rows = table
            .rows()
            .iter()
            .enumerate()
            .filter(|(i, r)| *i == 0 || selection.filter.contains(&r.reg_no))
            .map(|(i, _)| i)
            .collect();
        return RowSelection {
            rows,
            highlight: selection.filter.clone(),
        };
    }

    let take = match selection.limit {
        Limit::Unbounded => {
            return RowSelection {
                rows: (0..table.len()).collect(),
                highlight: BTreeSet::new(),
            }
        }
        Limit::CropToLegend => LEGEND_CAPACITY,
        Limit::Count(n) => n,
    };

    let rows: Vec<usize> = (0..table.len().min(take)).collect();
    let highlight = rows
        .iter()
        .map(|&i| table.rows()[i].reg_no.clone())
        .collect();
    RowSelection { rows, highlight }
}

/// Rows for graph series: [`select_rows`] without disqualified competitors
pub fn select_series_rows(table: &ResultTable, selection: &Selection) -> RowSelection {
    let mut selected = select_rows(table, selection);
    selected
        .rows
        .retain(|&i| !table.rows()[i].is_disqualified());
    selected
}

/// Rows plotted in a graph: series rows under the legend guard
///
/// A filter still picks the runners, but the plot never carries more than
/// [`LEGEND_CAPACITY`] series, leader first.
pub fn select_graph_rows(table: &ResultTable, selection: &Selection) -> RowSelection {
    let guarded = Selection {
        limit: selection.limit.for_graph(),
        filter: selection.filter.clone(),
    };
    let mut selected = select_series_rows(table, &guarded);
    selected.rows.truncate(LEGEND_CAPACITY);
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::results::fixtures::{checkpoints, row, sample_table};

    fn big_table(n: usize) -> ResultTable {
        let rows = (0..n)
            .map(|i| {
                let finish = format!("{}:{:02}", 60 + i / 60, i % 60);
                let totals = ["10:00", "20:00", finish.as_str()];
                row(&format!("R{:04}", i), "Runner", Some(i as u32 + 1), &totals)
            })
            .collect();
        ResultTable::new(checkpoints(2), rows).unwrap()
    }

    #[test]
    fn test_limit_parse() {
        assert_eq!("none".parse::<Limit>().unwrap(), Limit::Unbounded);
        assert_eq!("crop".parse::<Limit>().unwrap(), Limit::CropToLegend);
        assert_eq!("12".parse::<Limit>().unwrap(), Limit::Count(12));
        assert!("0".parse::<Limit>().is_err());
        assert!("many".parse::<Limit>().is_err());
        assert_eq!("30".parse::<Limit>().unwrap(), Limit::Count(30));
    }

    #[test]
    fn test_graph_limit_guard() {
        assert_eq!(Limit::Unbounded.for_graph(), Limit::CropToLegend);
        assert_eq!(Limit::Count(30).for_graph(), Limit::CropToLegend);
        assert_eq!(Limit::Count(10).for_graph(), Limit::Count(10));
        assert_eq!(Limit::Count(22).for_graph(), Limit::Count(22));
    }

    #[test]
    fn test_filter_overrides_limit_and_adds_leader() {
        let table = sample_table();
        for limit in [Limit::Unbounded, Limit::Count(1), Limit::CropToLegend] {
            let selection = Selection::new(limit, ["DKP9104".to_string(), "BRN9002".to_string()]);
            let selected = select_rows(&table, &selection);
            assert_eq!(selected.rows, vec![0, 1, 3]);
            assert!(!selected.is_highlighted("ABM8501"));
            assert!(selected.is_highlighted("DKP9104"));
        }
    }

    #[test]
    fn test_filtered_leader_is_highlighted() {
        let table = sample_table();
        let selection = Selection::new(Limit::Unbounded, ["ABM8501".to_string()]);
        let selected = select_rows(&table, &selection);
        assert_eq!(selected.rows, vec![0]);
        assert!(selected.is_highlighted("ABM8501"));
    }

    #[test]
    fn test_crop_to_legend_bound() {
        let table = big_table(500);
        let selected = select_rows(&table, &Selection::new(Limit::CropToLegend, []));
        assert_eq!(selected.rows.len(), LEGEND_CAPACITY);
        assert_eq!(selected.highlight.len(), LEGEND_CAPACITY);
    }

    #[test]
    fn test_count_limit() {
        let table = sample_table();
        let selected = select_rows(&table, &Selection::new(Limit::Count(3), []));
        assert_eq!(selected.rows, vec![0, 1, 2]);
        assert_eq!(selected.highlight.len(), 3);

        let selected = select_rows(&table, &Selection::new(Limit::Count(50), []));
        assert_eq!(selected.rows.len(), table.len());
    }

    #[test]
    fn test_unbounded_highlights_nothing() {
        let table = sample_table();
        let selected = select_rows(&table, &Selection::default());
        assert_eq!(selected.rows.len(), table.len());
        assert!(selected.highlight.is_empty());
    }

    #[test]
    fn test_series_rows_drop_disqualified_even_when_filtered() {
        let table = sample_table();
        let selection = Selection::new(Limit::Unbounded, ["FPR9006".to_string()]);
        let selected = select_series_rows(&table, &selection);
        assert_eq!(selected.rows, vec![0]);
    }

    #[test]
    fn test_graph_rows_cropped_when_filtered() {
        let table = big_table(30);
        let filter: Vec<String> = (1..30).map(|i| format!("R{:04}", i)).collect();
        let selection = Selection::new(Limit::Unbounded, filter);

        let graph = select_graph_rows(&table, &selection);
        assert_eq!(graph.rows.len(), LEGEND_CAPACITY);
        assert_eq!(graph.rows[0], 0);

        // the table view keeps every filtered runner
        assert_eq!(select_rows(&table, &selection).rows.len(), 30);
    }
}
