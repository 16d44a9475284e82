//! Print layout of split tables
//!
//! Produces page descriptors and cell metrics for a PDF renderer. Nothing here draws; the
//! renderer fills cells with the given text and sizes, and paints highlighted rows.
//!
//! Each competitor occupies one full-height row: the index cell and the front cells span it,
//! while times and places sit in two half-height sub-rows. When a course has more time columns
//! than fit on the page, time and place cells shrink by one shared coefficient.

use crate::analytics::{absolute_series, relative_series, SeriesSet};
use crate::catalog::EventContext;
use crate::models::ResultTable;
use crate::pagination::{page_ranges, ROWS_PER_PAGE};
use crate::selector::{select_graph_rows, select_rows, Selection};
use crate::table::{project, shrink_for_export, ExportTable, TimeFamily};
use chrono::{Local, NaiveDateTime};
use oris_common::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// Time columns fitting the page width at full size
pub const PAGE_CAPACITY_COLUMNS: usize = 16;

/// Height of one competitor row (mm)
pub const CELL_HEIGHT: f64 = 7.65;
pub const HEADER_CELL_HEIGHT: f64 = CELL_HEIGHT * 0.6;
/// Width of a time or place cell before shrinking (mm)
pub const CELL_WIDTH: f64 = 12.0;
pub const INDEX_CELL_WIDTH: f64 = 35.0;
pub const FRONT_CELL_WIDTH: f64 = 16.0;
pub const FONT_SIZE: f64 = 6.8;

pub const REPORT_TITLE: &str = "Split analysis";
pub const TOTALS_SECTION_TITLE: &str = "Total times and standings";
pub const SPLITS_SECTION_TITLE: &str = "Split times and standings";

const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// Shrink coefficient of time and place cells, in (0, 1]
pub fn shrink_coefficient(columns: usize, capacity: usize) -> f64 {
    if columns > capacity && capacity > 0 {
        capacity as f64 / columns as f64
    } else {
        1.0
    }
}

/// Sizes of every cell kind on a page
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellMetrics {
    pub coefficient: f64,
    pub index_width: f64,
    pub front_width: f64,
    pub front_font_size: f64,
    pub time_width: f64,
    pub time_font_size: f64,
    pub header_height: f64,
    pub row_height: f64,
    /// Height of the time sub-row and of the place sub-row
    pub sub_row_height: f64,
}

impl CellMetrics {
    pub fn for_columns(columns: usize, capacity: usize) -> Self {
        let coefficient = shrink_coefficient(columns, capacity);
        Self {
            coefficient,
            index_width: INDEX_CELL_WIDTH,
            front_width: FRONT_CELL_WIDTH,
            front_font_size: FONT_SIZE,
            time_width: CELL_WIDTH * coefficient,
            time_font_size: FONT_SIZE * coefficient,
            header_height: HEADER_CELL_HEIGHT,
            row_height: CELL_HEIGHT,
            sub_row_height: CELL_HEIGHT / 2.0,
        }
    }
}

/// One competitor on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutRow {
    pub key: String,
    pub front: Vec<String>,
    pub times: Vec<String>,
    pub places: Vec<String>,
    pub highlighted: bool,
}

/// Content and geometry of one printed page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDescriptor {
    /// 1-indexed
    pub page: usize,
    pub total_pages: usize,
    /// Index of the first row on this page within the table
    pub first_row: usize,
    pub front_headers: Vec<String>,
    pub time_headers: Vec<String>,
    pub metrics: CellMetrics,
    pub rows: Vec<LayoutRow>,
}

/// Cut an export table into pages; every page repeats the headers
pub fn paginate(
    table: &ExportTable,
    highlight: &BTreeSet<String>,
    capacity: usize,
) -> Vec<PageDescriptor> {
    let metrics = CellMetrics::for_columns(table.column_count(), capacity);
    let ranges = page_ranges(table.rows.len(), ROWS_PER_PAGE);
    let total_pages = ranges.len();

    ranges
        .into_iter()
        .enumerate()
        .map(|(i, range)| PageDescriptor {
            page: i + 1,
            total_pages,
            first_row: range.start,
            front_headers: table.front_headers.clone(),
            time_headers: table.time_headers.clone(),
            metrics,
            rows: table.rows[range]
                .iter()
                .map(|row| LayoutRow {
                    key: row.key.clone(),
                    front: row.front.clone(),
                    times: row.times.clone(),
                    places: row.places.clone(),
                    highlighted: highlight.contains(&row.reg_no),
                })
                .collect(),
        })
        .collect()
}

/// Cover page of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverPage {
    pub title: String,
    /// Event info lines and the category label; empty without a category
    pub lines: Vec<String>,
    pub exported_at: String,
}

/// Graph plus table pages of one time family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub title: String,
    pub family: TimeFamily,
    pub series: SeriesSet,
    pub pages: Vec<PageDescriptor>,
}

/// Full split analysis export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub cover: CoverPage,
    pub sections: Vec<ReportSection>,
}

/// Compose a report stamped with the current local time
pub fn build_report(
    table: &ResultTable,
    selection: &Selection,
    context: Option<&EventContext>,
    category_label: &str,
) -> Result<Report> {
    build_report_at(
        table,
        selection,
        context,
        category_label,
        Local::now().naive_local(),
    )
}

/// Compose a report: cover, then totals section, then splits section
///
/// Graphs are cropped to the legend capacity. Table pages list every competitor and highlight
/// the rows the graphs are built from.
pub fn build_report_at(
    table: &ResultTable,
    selection: &Selection,
    context: Option<&EventContext>,
    category_label: &str,
    exported_at: NaiveDateTime,
) -> Result<Report> {
    let graph_selection = Selection {
        limit: selection.limit.for_graph(),
        filter: selection.filter.clone(),
    };
    let highlight = select_rows(table, &graph_selection).highlight;
    let series_rows = select_graph_rows(table, selection);

    let totals = project(table, TimeFamily::Totals);
    let splits = project(table, TimeFamily::Splits);

    let sections = vec![
        ReportSection {
            title: TOTALS_SECTION_TITLE.to_string(),
            family: TimeFamily::Totals,
            series: absolute_series(&totals, &series_rows),
            pages: paginate(&shrink_for_export(&totals), &highlight, PAGE_CAPACITY_COLUMNS),
        },
        ReportSection {
            title: SPLITS_SECTION_TITLE.to_string(),
            family: TimeFamily::Splits,
            series: relative_series(&totals, &series_rows)?,
            pages: paginate(&shrink_for_export(&splits), &highlight, PAGE_CAPACITY_COLUMNS),
        },
    ];

    let mut lines = Vec::new();
    if !category_label.is_empty() {
        if let Some(context) = context {
            lines.extend(context.detail.info_lines());
        }
        lines.push(category_label.to_string());
    }

    info!(
        rows = table.len(),
        limit = %graph_selection.limit,
        highlighted = highlight.len(),
        "Composed split report"
    );

    Ok(Report {
        cover: CoverPage {
            title: REPORT_TITLE.to_string(),
            lines,
            exported_at: exported_at.format(TIMESTAMP_FORMAT).to_string(),
        },
        sections,
    })
}
