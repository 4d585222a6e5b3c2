use super::Transform;
use crate::feed::{Entry, Feed, LookupError};
use regex::Regex;
use std::collections::hash_map::{Entry as Slot, HashMap};

/// Keeps the entries whose `key` field contains a match for `pattern`.
pub(super) fn retain_matching(
    mut feed: Feed,
    key: &str,
    pattern: &Regex,
) -> Result<Feed, LookupError> {
    let before = feed.entries.len();
    let mut kept = Vec::with_capacity(before);
    for entry in std::mem::take(&mut feed.entries) {
        if pattern.is_match(&entry.require(key)?.to_text()) {
            kept.push(entry);
        }
    }
    tracing::trace!(key, pattern = %pattern, before, after = kept.len(), "Applied field filter");
    feed.entries = kept;
    Ok(feed)
}

/// `first(second(feed))`. Both only narrow, so no copy is needed.
pub(super) fn and<A, B>(first: &A, second: &B, feed: Feed) -> Result<Feed, LookupError>
where
    A: Transform + ?Sized,
    B: Transform + ?Sized,
{
    first.apply(second.apply(feed)?)
}

/// Runs `first` on a deep copy and `second` on the original, then merges.
///
/// The merged entries replace the entries of `second`'s result, so metadata
/// comes from the original feed's path.
pub(super) fn or<A, B>(first: &A, second: &B, feed: Feed) -> Result<Feed, LookupError>
where
    A: Transform + ?Sized,
    B: Transform + ?Sized,
{
    let left = first.apply(feed.clone())?;
    let mut right = second.apply(feed)?;
    let right_entries = std::mem::take(&mut right.entries);
    right.entries = merge_entries(left.entries, right_entries)?;
    Ok(right)
}

/// Concatenates, keeps the first entry per link, and sorts by pubdate.
///
/// # Panics
///
/// When two entries with different identities share a link. Deduplication
/// would silently drop one of them, so the merge refuses to continue.
fn merge_entries(first: Vec<Entry>, second: Vec<Entry>) -> Result<Vec<Entry>, LookupError> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(first.len() + second.len());
    let mut merged = Vec::with_capacity(first.len() + second.len());

    for entry in first.into_iter().chain(second) {
        let link = entry.link()?.into_owned();
        match seen.entry(link) {
            Slot::Occupied(slot) => {
                if *slot.get() != entry.seq() {
                    panic!(
                        "OR merge is inconsistent: entries #{} and #{} share link '{}'",
                        slot.get(),
                        entry.seq(),
                        slot.key()
                    );
                }
            }
            Slot::Vacant(slot) => {
                slot.insert(entry.seq());
                merged.push(entry);
            }
        }
    }

    // Stable sort: entries with equal pubdates keep concatenation order
    merged.sort_by_key(Entry::pubdate);

    assert_eq!(
        merged.len(),
        seen.len(),
        "Error: counted {} links but have {} unique entries",
        seen.len(),
        merged.len()
    );
    Ok(merged)
}
