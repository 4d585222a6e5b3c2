//! Regex-based filtering for RSS and Atom feeds.
//!
//! Fetch a feed, keep the entries whose link or title matches, and get a
//! valid, pretty-printed RSS 2.0 document back.
//!
//! ```ignore
//! use rssfilter::{config::Config, Pipeline};
//!
//! let pipeline = Pipeline::new(&Config::default())?;
//! let xml = pipeline
//!     .build_and_run("https://example.com/feed.xml", &["/rust/"], &["release"], "AND")
//!     .await?;
//! println!("{xml}");
//! ```

pub mod config;
mod error;
pub mod feed;
pub mod filter;
pub mod pipeline;
pub mod render;
pub mod util;

pub use error::Error;
pub use feed::{Feed, FetchError, LookupError};
pub use filter::{build_filter, Filter, FilterError, Operation, Transform};
pub use pipeline::{render_feed, Pipeline};
