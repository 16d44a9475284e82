//! Results source: the collaborator that fetches data from the results service
//!
//! The analysis pipelines only see the [`ResultsSource`] trait. [`OrisClient`] implements it
//! over HTTP; [`CachedSource`] wraps any source with process-lifetime memoization.

pub mod cache;
pub mod oris_client;

pub use cache::CachedSource;
pub use oris_client::OrisClient;

use crate::catalog::EventQuery;
use crate::models::{
    Category, CatalogEvent, Competitor, EntryRef, EventDetail, PlacementLookup, ResultTable,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use oris_common::Result;

/// Logical operations consumed from the results service
#[async_trait]
pub trait ResultsSource: Send + Sync {
    /// Resolve a registration number; `Error::NotFound` when unknown
    async fn fetch_competitor(&self, reg_no: &str) -> Result<Competitor>;

    /// Event classes the user registered for between the dates; `Error::NoData` when none
    async fn fetch_event_entries(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EntryRef>>;

    /// The user's placement in one event class
    async fn fetch_placement(
        &self,
        event_id: &str,
        class_id: &str,
        user_id: &str,
    ) -> Result<PlacementLookup>;

    /// Listed events matching the query; `Error::NoData` when none
    async fn fetch_event_catalog(&self, query: &EventQuery) -> Result<Vec<CatalogEvent>>;

    /// Event with its categories; `Error::NotFound` for an unknown id
    async fn fetch_event_detail(&self, event_id: &str) -> Result<EventDetail>;

    /// Split table of one category; `Error::NotFound` for an unknown id
    async fn fetch_splits(&self, class_id: &str) -> Result<ResultTable>;

    /// Categories of an event
    async fn fetch_category_list(&self, event_id: &str) -> Result<Vec<Category>> {
        Ok(self.fetch_event_detail(event_id).await?.categories)
    }
}
