//! Pubdate derivation for freshly parsed feeds.
//!
//! Every entry that leaves here carries a `pubdate` timestamp. Entries that
//! already have one are untouched, which makes [`normalize`] idempotent.

use crate::feed::model::{Entry, Feed, LookupError, Value, PUBDATE, PUBLISHED_PARSED};
use crate::feed::parser;

/// Gives every entry of `feed` a naive `pubdate` timestamp.
///
/// # Errors
///
/// Returns [`LookupError`] for `published_parsed` when an entry has neither a
/// `pubdate` timestamp nor a publish-time breakdown to derive one from.
pub fn normalize(mut feed: Feed) -> Result<Feed, LookupError> {
    for entry in &mut feed.entries {
        derive_pubdate(entry)?;
    }
    Ok(feed)
}

/// Coerces a `feed-rs` document and normalizes it in one pass.
pub fn normalize_parsed(parsed: feed_rs::model::Feed) -> Result<Feed, LookupError> {
    normalize(parser::from_parsed(parsed))
}

/// Sets `pubdate` from `published_parsed` unless it already holds a timestamp.
pub fn derive_pubdate(entry: &mut Entry) -> Result<(), LookupError> {
    if matches!(entry.get(PUBDATE), Some(Value::Timestamp(_))) {
        return Ok(());
    }

    let pubdate = match entry.require(PUBLISHED_PARSED)? {
        Value::Parts(parts) => parts.to_local_timestamp(),
        Value::Timestamp(ts) => Some(*ts),
        _ => None,
    }
    .ok_or_else(|| LookupError::new(PUBLISHED_PARSED))?;

    entry.insert(PUBDATE, pubdate);
    Ok(())
}
