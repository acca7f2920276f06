//! Domain model: records, crawl requests and search parameters

mod record;
mod request;
mod save_mode;
mod search;

pub use record::{NoteKind, Record, UNTITLED};
pub use request::{CrawlRequest, CrawlSource};
pub use save_mode::{MediaSelection, SaveMode};
pub use search::{
    DistanceFilter, Geo, NoteTypeFilter, RangeFilter, SearchParams, SortOrder, TimeFilter,
};
