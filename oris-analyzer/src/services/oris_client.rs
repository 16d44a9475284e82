//! ORIS JSON API client
//!
//! Every method is a GET on the API base URL with `format=json&method=...`. Responses are
//! wrapped in `{"Status": "OK", "Data": ...}`, where `Data` is an object keyed by record id
//! or an empty array when nothing matched.
//!
//! Requests are rate limited, carry an explicit timeout, and transient failures are retried
//! a bounded number of times before surfacing as `Error::Fetch`.

use super::ResultsSource;
use crate::catalog::{is_listed, EventQuery};
use crate::models::{
    CatalogEvent, Category, Checkpoint, Competitor, Discipline, EntryRef, EventDetail,
    PlacementLookup, Place, ResultRow, ResultTable, Split,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{Quota, RateLimiter};
use oris_common::config::{get_user_agent, OrisConfig};
use oris_common::time::{parse_date, DISQUALIFIED_MARK};
use oris_common::{Error, Result, TimeCell};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Base delay between retries, multiplied by the attempt number
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

const STATUS_OK: &str = "OK";

/// Transport-level failures, all surfaced as `Error::Fetch`
#[derive(Debug, thiserror::Error)]
enum OrisError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for OrisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            OrisError::Timeout
        } else if e.is_decode() {
            OrisError::Decode(e.to_string())
        } else {
            OrisError::Network(e.to_string())
        }
    }
}

impl From<OrisError> for Error {
    fn from(e: OrisError) -> Self {
        Error::Fetch(e.to_string())
    }
}

/// Response envelope shared by all methods
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Data", default)]
    data: Value,
}

impl Envelope {
    /// Data of a successful, non-empty response
    fn into_data(self) -> Option<Value> {
        if self.status != STATUS_OK || is_empty(&self.data) {
            None
        } else {
            Some(self.data)
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Records of a `Data` value keyed by id (or listed in an array)
fn records(value: &Value) -> Vec<&Value> {
    match value {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    }
}

/// Field as text; ids arrive both as strings and as numbers
fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// ORIS API client
pub struct OrisClient {
    http: Client,
    base_url: String,
    max_retries: u32,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl OrisClient {
    pub fn new(config: &OrisConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(get_user_agent())
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        info!(
            base_url = %config.base_url,
            timeout_secs = config.request_timeout_secs,
            max_retries = config.max_retries,
            "ORIS client ready"
        );

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            rate_limiter: RateLimiter::direct(Quota::per_second(rate)),
        })
    }

    /// Call an API method, retrying transient failures
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Envelope> {
        let mut attempt = 0;
        loop {
            match self.call_once(method, params).await {
                Ok(envelope) => return Ok(envelope),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(method = %method, attempt, error = %e, "Retrying ORIS request");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once(&self, method: &str, params: &[(&str, String)]) -> Result<Envelope> {
        self.rate_limiter.until_ready().await;
        debug!(method = %method, ?params, "Querying ORIS API");

        let response = self
            .http
            .get(&self.base_url)
            .query(&[("format", "json"), ("method", method)])
            .query(params)
            .send()
            .await
            .map_err(OrisError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(OrisError::Status(status.as_u16()).into());
        }

        let envelope = response
            .json::<Envelope>()
            .await
            .map_err(|e| OrisError::Decode(e.to_string()))?;
        Ok(envelope)
    }
}

#[async_trait]
impl ResultsSource for OrisClient {
    async fn fetch_competitor(&self, reg_no: &str) -> Result<Competitor> {
        let not_found = || Error::NotFound(format!("registrační číslo {}", reg_no.to_uppercase()));
        let data = self
            .call("getUser", &[("rgnum", reg_no.to_string())])
            .await?
            .into_data()
            .ok_or_else(not_found)?;
        parse_competitor(&data).ok_or_else(not_found)
    }

    async fn fetch_event_entries(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<EntryRef>> {
        let params = [
            ("userid", user_id.to_string()),
            ("datefrom", from.to_string()),
            ("dateto", to.to_string()),
        ];
        let entries = self
            .call("getUserEventEntries", &params)
            .await?
            .into_data()
            .map(|data| parse_entries(&data))
            .unwrap_or_default();
        if entries.is_empty() {
            return Err(Error::NoData(format!("přihlášky uživatele {}", user_id)));
        }
        Ok(entries)
    }

    async fn fetch_placement(
        &self,
        event_id: &str,
        class_id: &str,
        user_id: &str,
    ) -> Result<PlacementLookup> {
        let params = [
            ("eventid", event_id.to_string()),
            ("classid", class_id.to_string()),
        ];
        Ok(self
            .call("getEventResults", &params)
            .await?
            .into_data()
            .map(|data| parse_placement(&data, user_id))
            .unwrap_or(PlacementLookup::Absent))
    }

    async fn fetch_event_catalog(&self, query: &EventQuery) -> Result<Vec<CatalogEvent>> {
        let params = query.to_params()?;
        let envelope = self.call("getEventList", &params).await?;
        if envelope.status != STATUS_OK {
            return Err(Error::Fetch("event listing error".to_string()));
        }
        let events = envelope
            .into_data()
            .map(|data| parse_catalog(&data))
            .unwrap_or_default();
        if events.is_empty() {
            return Err(Error::NoData(format!("závody v sezóně {}", query.season)));
        }
        Ok(events)
    }

    async fn fetch_event_detail(&self, event_id: &str) -> Result<EventDetail> {
        let data = self
            .call("getEvent", &[("id", event_id.to_string())])
            .await?
            .into_data()
            .ok_or_else(|| Error::NotFound(format!("ID závodu {}", event_id)))?;
        parse_event_detail(&data, event_id)
    }

    async fn fetch_splits(&self, class_id: &str) -> Result<ResultTable> {
        let data = self
            .call("getSplits", &[("classid", class_id.to_string())])
            .await?
            .into_data()
            .ok_or_else(|| Error::NotFound(format!("ID kategorie {}", class_id)))?;
        let table = parse_splits(&data)?;
        if table.is_empty() {
            return Err(Error::NotFound(format!("ID kategorie {}", class_id)));
        }
        info!(class_id = %class_id, rows = table.len(), "Loaded split table");
        Ok(table)
    }
}

fn parse_competitor(data: &Value) -> Option<Competitor> {
    let user_id = text(data, "ID");
    if user_id.is_empty() {
        return None;
    }
    Some(Competitor {
        user_id,
        first_name: text(data, "FirstName"),
        last_name: text(data, "LastName"),
    })
}

fn parse_entries(data: &Value) -> Vec<EntryRef> {
    records(data)
        .into_iter()
        .map(|r| EntryRef {
            event_id: text(r, "EventID"),
            class_id: text(r, "ClassID"),
            class_desc: text(r, "ClassDesc"),
        })
        .filter(|e| !e.event_id.is_empty())
        .collect()
}

fn parse_placement(data: &Value, user_id: &str) -> PlacementLookup {
    let Some(record) = records(data)
        .into_iter()
        .find(|r| text(r, "UserID") == user_id)
    else {
        return PlacementLookup::Absent;
    };

    match Place::parse(&text(record, "Place")) {
        Place::Rank(n) => PlacementLookup::Place(n),
        Place::Unplaced if text(record, "Time") == DISQUALIFIED_MARK => {
            PlacementLookup::Disqualified
        }
        Place::Unplaced => PlacementLookup::Absent,
    }
}

fn parse_catalog(data: &Value) -> Vec<CatalogEvent> {
    records(data)
        .into_iter()
        .filter_map(|r| {
            let discipline = r
                .get("Discipline")
                .map(|d| text(d, "ShortName"))
                .unwrap_or_default();
            let cancelled = text(r, "Cancelled") == "1";
            if !is_listed(&discipline, cancelled) {
                return None;
            }
            let date = match parse_date(&text(r, "Date")) {
                Ok(date) => date,
                Err(e) => {
                    warn!(event_id = %text(r, "ID"), error = %e, "Skipping event without date");
                    return None;
                }
            };
            Some(CatalogEvent {
                id: text(r, "ID"),
                name: text(r, "Name"),
                date,
                discipline,
                level: r.get("Level").map(|l| text(l, "ShortName")).unwrap_or_default(),
                region: text(r, "Region"),
            })
        })
        .collect()
}

fn parse_event_detail(data: &Value, event_id: &str) -> Result<EventDetail> {
    let discipline = data
        .get("Discipline")
        .map(|d| Discipline {
            id: text(d, "ID"),
            short_name: text(d, "ShortName"),
            name: text(d, "NameCZ"),
        })
        .ok_or_else(|| Error::Fetch(format!("event {} has no discipline", event_id)))?;

    let categories = data
        .get("Classes")
        .map(records)
        .unwrap_or_default()
        .into_iter()
        .map(|c| Category {
            id: text(c, "ID"),
            name: text(c, "Name"),
            distance: text(c, "Distance"),
            climb: text(c, "Climbing"),
            controls: text(c, "Controls"),
        })
        .collect();

    Ok(EventDetail {
        id: event_id.to_string(),
        name: text(data, "Name"),
        date: parse_date(&text(data, "Date"))?,
        place: text(data, "Place"),
        map: text(data, "Map"),
        discipline,
        categories,
    })
}

/// Checkpoint codes present in a split record ("SplitTime3" → 3, "TotalTime999" → 999)
fn checkpoint_codes(record: &Map<String, Value>) -> impl Iterator<Item = u32> + '_ {
    record.keys().filter_map(|key| {
        key.strip_prefix("SplitTime")
            .or_else(|| key.strip_prefix("TotalTime"))
            .and_then(|n| n.parse().ok())
    })
}

fn time_cell(record: &Value, key: &str) -> TimeCell {
    let raw = text(record, key);
    TimeCell::parse(&raw).unwrap_or_else(|e| {
        debug!(key = %key, value = %raw, error = %e, "Unreadable time, treating as no data");
        TimeCell::NoData
    })
}

fn split(record: &Value, family: &str, code: u32) -> Split {
    Split {
        time: time_cell(record, &format!("{}Time{}", family, code)),
        place: Place::parse(&text(record, &format!("{}Place{}", family, code))),
    }
}

fn parse_splits(data: &Value) -> Result<ResultTable> {
    let rows_data = data
        .get("Splits")
        .map(records)
        .unwrap_or_default();

    let codes: BTreeSet<u32> = rows_data
        .iter()
        .filter_map(|r| r.as_object())
        .flat_map(checkpoint_codes)
        .collect();
    let checkpoints: Vec<Checkpoint> = codes.iter().map(|&c| Checkpoint::from_code(c)).collect();

    let mut rows: Vec<ResultRow> = rows_data
        .into_iter()
        .map(|r| ResultRow {
            reg_no: text(r, "RegNo"),
            name: text(r, "ResName"),
            club: text(r, "ResClub"),
            place: Place::parse(&text(r, "ResPlace")),
            time: time_cell(r, "ResTime"),
            loss: time_cell(r, "ResLoss"),
            totals: codes.iter().map(|&c| split(r, "Total", c)).collect(),
            splits: codes.iter().map(|&c| split(r, "Split", c)).collect(),
        })
        .collect();

    // placed competitors first, in placement order
    rows.sort_by_key(|r| r.place.rank().unwrap_or(u32::MAX));

    ResultTable::new(checkpoints, rows)
}
