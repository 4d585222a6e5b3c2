//! Entry filters and their boolean composition.
//!
//! A [`Filter`] is a tree: leaves test one entry field against a regex,
//! inner nodes combine two subtrees with AND or OR. Anything implementing
//! [`Transform`] (including plain closures) can be handed to the pipeline.
//!
//! # Example
//!
//! ```
//! use rssfilter::filter::Filter;
//!
//! let go_or_rust = Filter::by_title("Go")
//!     .unwrap()
//!     .or(Filter::by_link("/rust/").unwrap());
//! # let _ = go_or_rust;
//! ```

mod compose;

use crate::feed::{Feed, LookupError, LINK, TITLE};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Invalid filter configuration. Raised before anything is fetched.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("operation can only be AND or OR: '{0}'")]
    UnknownOperation(String),

    #[error("no filters provided.")]
    NoFilters,

    #[error("too many filters ({0}); combine alternatives into one regex instead")]
    TooManyFilters(usize),

    #[error("invalid regex '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// How two filters are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    And,
    #[default]
    Or,
}

impl FromStr for Operation {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(Operation::And),
            "OR" => Ok(Operation::Or),
            other => Err(FilterError::UnknownOperation(other.to_owned())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::And => "AND",
            Operation::Or => "OR",
        })
    }
}

/// A feed-to-feed transformation.
///
/// Implementations take the feed by value and may rewrite it in place. A
/// caller that still needs the input afterwards must pass a clone.
pub trait Transform {
    fn apply(&self, feed: Feed) -> Result<Feed, LookupError>;
}

impl<F> Transform for F
where
    F: Fn(Feed) -> Result<Feed, LookupError>,
{
    fn apply(&self, feed: Feed) -> Result<Feed, LookupError> {
        self(feed)
    }
}

#[derive(Debug, Clone)]
pub enum Filter {
    /// Keeps entries whose `key` field contains a match for `pattern`.
    FieldRegex { key: String, pattern: Regex },
    /// `first(second(feed))`.
    And(Box<Filter>, Box<Filter>),
    /// Union of both results, deduplicated by link and sorted by pubdate.
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    /// Compiles `pattern` once and tests it against the `key` field of each entry.
    ///
    /// Matching is a substring search, not a full match. An entry without
    /// `key` makes [`Transform::apply`] fail with a [`LookupError`].
    pub fn field_regex(pattern: &str, key: impl Into<String>) -> Result<Self, FilterError> {
        let compiled = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self::field_matching(compiled, key))
    }

    /// Same as [`Filter::field_regex`] with an already compiled pattern.
    pub fn field_matching(pattern: Regex, key: impl Into<String>) -> Self {
        Filter::FieldRegex {
            key: key.into(),
            pattern,
        }
    }

    pub fn by_link(pattern: &str) -> Result<Self, FilterError> {
        Self::field_regex(pattern, LINK)
    }

    pub fn by_title(pattern: &str) -> Result<Self, FilterError> {
        Self::field_regex(pattern, TITLE)
    }

    /// Entries must pass both; `other` runs first.
    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    /// Entries may pass either; `self`'s copy wins when both keep an entry.
    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    pub fn compose(operation: Operation, first: Filter, second: Filter) -> Self {
        match operation {
            Operation::And => first.and(second),
            Operation::Or => first.or(second),
        }
    }
}

impl Transform for Filter {
    fn apply(&self, feed: Feed) -> Result<Feed, LookupError> {
        match self {
            Filter::FieldRegex { key, pattern } => compose::retain_matching(feed, key, pattern),
            Filter::And(first, second) => compose::and(&**first, &**second, feed),
            Filter::Or(first, second) => compose::or(&**first, &**second, feed),
        }
    }
}

/// Builds the single filter described by command-line style arguments.
///
/// Title filters come first, then URL filters. One filter is used as-is,
/// two are combined with `operation`. The operation is checked before
/// anything else, then the filter count, then each regex.
///
/// # Errors
///
/// - [`FilterError::UnknownOperation`] - `operation` is not `AND` or `OR`
/// - [`FilterError::NoFilters`] - both lists are empty
/// - [`FilterError::TooManyFilters`] - more than two patterns in total
/// - [`FilterError::InvalidPattern`] - a pattern does not compile
pub fn build_filter<U, T>(
    url_filters: &[U],
    title_filters: &[T],
    operation: &str,
) -> Result<Filter, FilterError>
where
    U: AsRef<str>,
    T: AsRef<str>,
{
    let operation: Operation = operation.parse()?;

    let total = url_filters.len() + title_filters.len();
    match total {
        0 => return Err(FilterError::NoFilters),
        1 | 2 => {}
        n => return Err(FilterError::TooManyFilters(n)),
    }

    let mut filters = title_filters
        .iter()
        .map(|p| Filter::by_title(p.as_ref()))
        .chain(url_filters.iter().map(|p| Filter::by_link(p.as_ref())))
        .collect::<Result<Vec<_>, _>>()?;

    let filter = match (filters.pop(), filters.pop()) {
        (Some(only), None) => only,
        (Some(second), Some(first)) => Filter::compose(operation, first, second),
        _ => return Err(FilterError::NoFilters),
    };

    tracing::debug!(
        url_filters = url_filters.len(),
        title_filters = title_filters.len(),
        operation = %operation,
        "Built feed filter"
    );
    Ok(filter)
}
