//! Process-lifetime memoization of a results source
//!
//! Results of finished events do not change, so entries never expire. Failures are not
//! cached; the next call asks the inner source again.

use super::ResultsSource;
use crate::catalog::EventQuery;
use crate::models::{
    CatalogEvent, Competitor, EntryRef, EventDetail, PlacementLookup, ResultTable,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use oris_common::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::sync::RwLock;
use tracing::debug;

type Memo<K, V> = RwLock<HashMap<K, V>>;

/// Read-through cache in front of another source
pub struct CachedSource<S> {
    inner: S,
    competitors: Memo<String, Competitor>,
    entries: Memo<(String, NaiveDate, NaiveDate), Vec<EntryRef>>,
    placements: Memo<(String, String, String), PlacementLookup>,
    catalogs: Memo<EventQuery, Vec<CatalogEvent>>,
    details: Memo<String, EventDetail>,
    splits: Memo<String, ResultTable>,
}

impl<S: ResultsSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            competitors: RwLock::default(),
            entries: RwLock::default(),
            placements: RwLock::default(),
            catalogs: RwLock::default(),
            details: RwLock::default(),
            splits: RwLock::default(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Return the cached value for `key`, or load, store and return it
async fn memoized<K, V, F>(memo: &Memo<K, V>, key: K, load: F) -> Result<V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone,
    F: Future<Output = Result<V>>,
{
    if let Some(value) = memo.read().await.get(&key) {
        debug!(key = ?key, "Cache hit");
        return Ok(value.clone());
    }

    let value = load.await?;
    memo.write().await.insert(key, value.clone());
    Ok(value)
}

#[async_trait]
impl<S: ResultsSource> ResultsSource for CachedSource<S> {
    async fn fetch_competitor(&self, reg_no: &str) -> Result<Competitor> {
        memoized(
            &self.competitors,
            reg_no.to_uppercase(),
            self.inner.fetch_competitor(reg_no),
        )
        .await
    }

    async fn fetch_event_entries(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EntryRef>> {
        memoized(
            &self.entries,
            (user_id.to_string(), from, to),
            self.inner.fetch_event_entries(user_id, from, to),
        )
        .await
    }

    async fn fetch_placement(
        &self,
        event_id: &str,
        class_id: &str,
        user_id: &str,
    ) -> Result<PlacementLookup> {
        memoized(
            &self.placements,
            (event_id.to_string(), class_id.to_string(), user_id.to_string()),
            self.inner.fetch_placement(event_id, class_id, user_id),
        )
        .await
    }

    async fn fetch_event_catalog(&self, query: &EventQuery) -> Result<Vec<CatalogEvent>> {
        memoized(
            &self.catalogs,
            query.clone(),
            self.inner.fetch_event_catalog(query),
        )
        .await
    }

    async fn fetch_event_detail(&self, event_id: &str) -> Result<EventDetail> {
        memoized(
            &self.details,
            event_id.to_string(),
            self.inner.fetch_event_detail(event_id),
        )
        .await
    }

    async fn fetch_splits(&self, class_id: &str) -> Result<ResultTable> {
        memoized(
            &self.splits,
            class_id.to_string(),
            self.inner.fetch_splits(class_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::results::fixtures::sample_table;
    use oris_common::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source counting how often it is asked
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ResultsSource for CountingSource {
        async fn fetch_competitor(&self, reg_no: &str) -> Result<Competitor> {
            self.hit();
            Ok(Competitor {
                user_id: "1".into(),
                first_name: "Adam".into(),
                last_name: reg_no.into(),
            })
        }

        async fn fetch_event_entries(
            &self,
            _user_id: &str,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<EntryRef>> {
            self.hit();
            Err(Error::NoData("entries".into()))
        }

        async fn fetch_placement(&self, _: &str, _: &str, _: &str) -> Result<PlacementLookup> {
            self.hit();
            Ok(PlacementLookup::Place(1))
        }

        async fn fetch_event_catalog(&self, query: &EventQuery) -> Result<Vec<CatalogEvent>> {
            self.hit();
            Ok(vec![CatalogEvent {
                id: query.season.to_string(),
                name: "Závod".into(),
                date: NaiveDate::from_ymd_opt(query.season, 5, 1).unwrap(),
                discipline: "KL".into(),
                level: "ŽB".into(),
                region: "M".into(),
            }])
        }

        async fn fetch_event_detail(&self, event_id: &str) -> Result<EventDetail> {
            self.hit();
            Err(Error::NotFound(event_id.into()))
        }

        async fn fetch_splits(&self, _class_id: &str) -> Result<ResultTable> {
            self.hit();
            Ok(sample_table())
        }
    }

    #[tokio::test]
    async fn test_repeated_calls_hit_inner_once() {
        let cached = CachedSource::new(CountingSource::default());

        cached.fetch_splits("501").await.unwrap();
        cached.fetch_splits("501").await.unwrap();
        cached.fetch_placement("1", "2", "3").await.unwrap();
        cached.fetch_placement("1", "2", "3").await.unwrap();
        assert_eq!(cached.inner().calls(), 2);

        cached.fetch_splits("502").await.unwrap();
        assert_eq!(cached.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_catalog_keyed_by_season() {
        let cached = CachedSource::new(CountingSource::default());

        let a = cached.fetch_event_catalog(&EventQuery::season(2019)).await.unwrap();
        let b = cached.fetch_event_catalog(&EventQuery::season(2020)).await.unwrap();
        cached.fetch_event_catalog(&EventQuery::season(2019)).await.unwrap();

        assert_eq!(a[0].id, "2019");
        assert_eq!(b[0].id, "2020");
        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let cached = CachedSource::new(CountingSource::default());

        assert!(cached.fetch_event_detail("1").await.is_err());
        assert!(cached.fetch_event_detail("1").await.is_err());
        assert_eq!(cached.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_competitor_key_ignores_case() {
        let cached = CachedSource::new(CountingSource::default());

        cached.fetch_competitor("abm8501").await.unwrap();
        cached.fetch_competitor("ABM8501").await.unwrap();
        assert_eq!(cached.inner().calls(), 1);
    }
}
