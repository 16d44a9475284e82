//! oris-analyzer library - split analysis of ORIS orienteering results
//!
//! Loads split tables, event calendars and runner histories from the ORIS results service and
//! turns them into plain data: standings projections, absolute and relative loss series,
//! highlighted tables, runner placement series and paginated print layouts.
//!
//! Rendering is left to the consumer. Every view is recomputed from an immutable
//! [`models::ResultTable`] and a [`selector::Selection`].

pub mod analytics;
pub mod catalog;
pub mod export;
pub mod models;
pub mod pagination;
pub mod selector;
pub mod services;
pub mod table;
pub mod timeline;

pub use catalog::{EventContext, EventQuery};
pub use selector::{Limit, Selection};
pub use services::{CachedSource, OrisClient, ResultsSource};
pub use timeline::TimelineMerger;
