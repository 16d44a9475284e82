//! Data model shared by the analysis pipelines

pub mod events;
pub mod results;

pub use events::{
    Category, CatalogEvent, Competitor, Discipline, EntryRef, EventDetail, EventEntry,
    EventPlacement, PlacementLookup, RunnerTimeline,
};
pub use results::{parse_filter_choice, Checkpoint, Place, ResultRow, ResultTable, Split};
