use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone,
    Timelike, Utc,
};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Entry field holding the feed-unique identifier used for OR deduplication.
pub const LINK: &str = "link";
/// Entry field tested by title filters.
pub const TITLE: &str = "title";
/// Entry field holding the naive publish timestamp.
pub const PUBDATE: &str = "pubdate";
/// Entry field holding the calendar breakdown the pubdate is derived from.
pub const PUBLISHED_PARSED: &str = "published_parsed";
pub const DESCRIPTION: &str = "description";
pub const SUMMARY: &str = "summary";

/// A plain key→value mapping. Keys are unique and all enumerable.
pub type Fields = BTreeMap<String, Value>;

/// A required field was absent from an entry.
///
/// Not a fetch or filter error: it means a filter assumed an entry shape the
/// feed does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("entry has no '{key}' field")]
pub struct LookupError {
    pub key: String,
}

impl LookupError {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Calendar breakdown of a publish time, as handed over by the parser.
///
/// The fields carry the wall-clock reading of the source timestamp in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeParts {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl TimeParts {
    pub fn from_utc(dt: &DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }

    /// The breakdown as a naive datetime, `None` if it names no real instant.
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?.and_hms_opt(
            self.hour,
            self.minute,
            self.second,
        )
    }

    /// Converts the breakdown to a naive timestamp by way of local time.
    ///
    /// The breakdown is read as a local wall-clock time, turned into an epoch
    /// timestamp, and that timestamp is rendered back as naive local time.
    /// Ambiguous readings (DST fall-back) resolve to the earlier instant.
    /// A reading inside a DST gap is taken at the offset in force before the
    /// gap, so it comes back moved forward by the gap's length (02:30 on a
    /// spring-forward night becomes 03:30), as C `mktime` does.
    pub fn to_local_timestamp(&self) -> Option<NaiveDateTime> {
        let naive = self.to_naive()?;
        let Some(resolved) = Local.from_local_datetime(&naive).earliest() else {
            return Some(local_offsets_around(naive).map_or(naive, |(before, after)| {
                skip_gap(naive, before, after)
            }));
        };
        Local
            .timestamp_opt(resolved.timestamp(), 0)
            .single()
            .map(|dt| dt.naive_local())
    }
}

/// Local UTC offsets a few hours either side of `naive`.
fn local_offsets_around(naive: NaiveDateTime) -> Option<(FixedOffset, FixedOffset)> {
    let offset_at = |at: NaiveDateTime| {
        Local
            .from_local_datetime(&at)
            .earliest()
            .map(|dt| dt.offset().fix())
    };
    let window = Duration::hours(3);
    Some((offset_at(naive - window)?, offset_at(naive + window)?))
}

/// Reads a wall-clock time that falls in a gap at the `before` offset and
/// renders the instant at the `after` offset.
fn skip_gap(naive: NaiveDateTime, before: FixedOffset, after: FixedOffset) -> NaiveDateTime {
    let shift = i64::from(after.local_minus_utc() - before.local_minus_utc());
    naive + Duration::seconds(shift)
}

impl fmt::Display for TimeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// A field value in feed metadata or an entry.
///
/// Nesting is one level deep in practice: `List` and `Map` hold text or
/// small maps such as an author's name and email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Timestamp(NaiveDateTime),
    Parts(TimeParts),
    List(Vec<Value>),
    Map(Fields),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Fields> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The string form regex filters search in. Text is borrowed as-is.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Empty text, lists, and maps count as absent when backfilling.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            Value::Timestamp(_) | Value::Parts(_) => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Parts(parts) => fmt::Display::fmt(parts, f),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt::Display::fmt(item, f)?;
                }
                Ok(())
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<TimeParts> for Value {
    fn from(parts: TimeParts) -> Self {
        Value::Parts(parts)
    }
}

impl From<Fields> for Value {
    fn from(map: Fields) -> Self {
        Value::Map(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// One feed item.
///
/// `seq` is the entry's position in the source document. Clones keep it, so
/// two copies of the same entry can be told apart from two distinct entries
/// that happen to share a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    seq: usize,
    fields: Fields,
}

impl Entry {
    pub fn new(seq: usize, fields: Fields) -> Self {
        Self { seq, fields }
    }

    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Looks up a field the caller requires to be present.
    pub fn require(&self, key: &str) -> Result<&Value, LookupError> {
        self.fields.get(key).ok_or_else(|| LookupError::new(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// The entry's link as text.
    pub fn link(&self) -> Result<Cow<'_, str>, LookupError> {
        self.require(LINK).map(Value::to_text)
    }

    pub fn pubdate(&self) -> Option<NaiveDateTime> {
        self.get(PUBDATE).and_then(Value::as_timestamp)
    }
}

/// A feed: channel-level metadata plus its ordered entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub metadata: Fields,
    pub entries: Vec<Entry>,
}

impl Feed {
    /// Builds a feed, numbering entries by their position.
    pub fn new(metadata: Fields, entries: impl IntoIterator<Item = Fields>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(seq, fields)| Entry::new(seq, fields))
            .collect();
        Self { metadata, entries }
    }

    /// Links of the current entries, in order. Entries without one are skipped.
    pub fn links(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| e.link().ok().map(Cow::into_owned))
            .collect()
    }
}
