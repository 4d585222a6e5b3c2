//! Feed retrieval and the in-memory feed model.
//!
//! - **Model**: [`Feed`] is a metadata map plus ordered [`Entry`] maps
//! - **Parsing**: `feed-rs` documents are coerced into plain maps once, at ingestion
//! - **Normalizing**: every entry gets a naive `pubdate` timestamp
//! - **Fetching**: HTTP(S) or local files, size- and time-limited, never retried
//!
//! # Example
//!
//! ```ignore
//! use rssfilter::{config::Config, feed::Fetcher};
//!
//! let fetcher = Fetcher::new(&Config::default())?;
//! let feed = fetcher.fetch_and_prepare_feed("https://example.com/feed.xml").await?;
//! ```

mod fetcher;
mod model;
mod normalize;
mod parser;

pub use fetcher::{Document, FetchError, Fetcher};
pub use model::{
    Entry, Feed, Fields, LookupError, TimeParts, Value, DESCRIPTION, LINK, PUBDATE,
    PUBLISHED_PARSED, SUMMARY, TITLE,
};
pub use normalize::{derive_pubdate, normalize, normalize_parsed};
pub use parser::{from_parsed, parse_feed};
