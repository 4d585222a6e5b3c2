//! Fetch → normalize → filter → render.

use crate::config::Config;
use crate::error::Error;
use crate::feed::{
    Entry, FetchError, Feed, Fetcher, Fields, Value, DESCRIPTION, LINK, SUMMARY, TITLE,
};
use crate::filter::{build_filter, Transform};
use crate::render::{prettify, RenderError, RssWriter};

/// Channel description used when the feed has no description, title, or link.
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Runs feeds through filters and renders the result.
#[derive(Debug, Clone)]
pub struct Pipeline {
    fetcher: Fetcher,
    indent: usize,
}

impl Pipeline {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Ok(Self::with_fetcher(Fetcher::new(config)?, config))
    }

    pub fn with_fetcher(fetcher: Fetcher, config: &Config) -> Self {
        Self {
            fetcher,
            indent: config.indent,
        }
    }

    /// Fetches `source`, applies `transform`, and returns the pretty-printed RSS document.
    ///
    /// # Errors
    ///
    /// - [`Error::Fetch`] - retrieval failed or the document is not a usable feed
    /// - [`Error::Lookup`] - an entry lacks a field the transform (or normalizer) needs
    /// - [`Error::Render`] - the output document could not be produced
    pub async fn filter_feed<T>(&self, source: &str, transform: &T) -> Result<String, Error>
    where
        T: Transform + ?Sized,
    {
        let feed = self.fetcher.fetch_and_prepare_feed(source).await?;
        let before = feed.entries.len();
        let feed = transform.apply(feed)?;
        tracing::info!(
            source = %source,
            before,
            after = feed.entries.len(),
            "Filtered feed"
        );
        Ok(render_feed(feed, self.indent)?)
    }

    /// Builds one filter from regex arguments, then runs [`Pipeline::filter_feed`].
    ///
    /// Filter configuration errors surface as [`Error::Filter`] before any
    /// network or file access.
    pub async fn build_and_run<U, T>(
        &self,
        source: &str,
        url_filters: &[U],
        title_filters: &[T],
        operation: &str,
    ) -> Result<String, Error>
    where
        U: AsRef<str>,
        T: AsRef<str>,
    {
        let filter = build_filter(url_filters, title_filters, operation)?;
        self.filter_feed(source, &filter).await
    }
}

/// Fills in required fields and serializes a filtered feed.
///
/// The channel description falls back to the title, then the link, then
/// [`UNKNOWN_TITLE`]. Entries without a description borrow their summary;
/// entries with neither are written without one.
pub fn render_feed(mut feed: Feed, indent: usize) -> Result<String, RenderError> {
    backfill_description(&mut feed.metadata);

    let title = take_text(&mut feed.metadata, TITLE);
    let link = take_text(&mut feed.metadata, LINK);
    let description = take_text(&mut feed.metadata, DESCRIPTION);

    let mut writer = RssWriter::new(title, link, description, feed.metadata);
    for mut entry in feed.entries {
        backfill_entry_description(&mut entry);
        writer.add_item(entry.into_fields());
    }

    let raw = writer.write_string()?;
    tracing::debug!(items = writer.item_count(), bytes = raw.len(), "Serialized feed");
    prettify(&raw, indent)
}

/// Ensures the channel has a non-empty description.
pub fn backfill_description(metadata: &mut Fields) {
    if present(metadata.get(DESCRIPTION)) {
        return;
    }
    let fallback = [TITLE, LINK]
        .iter()
        .filter_map(|key| metadata.get(*key))
        .find(|v| !v.is_empty())
        .map(|v| v.to_text().into_owned())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_owned());
    metadata.insert(DESCRIPTION.to_owned(), Value::Text(fallback));
}

fn backfill_entry_description(entry: &mut Entry) {
    if entry.contains(DESCRIPTION) {
        return;
    }
    if let Some(summary) = entry.get(SUMMARY).cloned() {
        entry.insert(DESCRIPTION, summary);
    }
}

fn present(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

fn take_text(metadata: &mut Fields, key: &str) -> String {
    metadata
        .remove(key)
        .map(|v| v.to_text().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn meta(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_backfill_keeps_existing_description() {
        let mut m = meta(&[("title", "T"), ("description", "D")]);
        backfill_description(&mut m);
        assert_eq!(m.get("description"), Some(&Value::from("D")));
    }

    #[test]
    fn test_backfill_prefers_title_then_link() {
        let mut m = meta(&[("title", "T"), ("link", "L")]);
        backfill_description(&mut m);
        assert_eq!(m.get("description"), Some(&Value::from("T")));

        let mut m = meta(&[("title", ""), ("link", "L"), ("description", "")]);
        backfill_description(&mut m);
        assert_eq!(m.get("description"), Some(&Value::from("L")));
    }

    #[test]
    fn test_backfill_unknown_title() {
        let mut m = Fields::new();
        backfill_description(&mut m);
        assert_eq!(m.get("description"), Some(&Value::from(UNKNOWN_TITLE)));
    }

    #[test]
    fn test_entry_description_from_summary() {
        let mut entry = Entry::new(0, meta(&[("summary", "S")]));
        backfill_entry_description(&mut entry);
        assert_eq!(entry.get("description"), Some(&Value::from("S")));

        let mut entry = Entry::new(1, meta(&[("description", "D"), ("summary", "S")]));
        backfill_entry_description(&mut entry);
        assert_eq!(entry.get("description"), Some(&Value::from("D")));

        let mut bare = Entry::new(2, meta(&[("title", "T")]));
        backfill_entry_description(&mut bare);
        assert!(!bare.contains("description"));
    }

    #[test]
    fn test_render_feed_moves_required_fields_out_of_extras() {
        let pubdate = NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap();
        let mut item = meta(&[("title", "Post"), ("link", "https://ex.com/p"), ("summary", "Sum")]);
        item.insert("pubdate".to_owned(), Value::Timestamp(pubdate));
        let feed = Feed::new(
            meta(&[("title", "Blog"), ("link", "https://ex.com/"), ("language", "en")]),
            vec![item],
        );

        let out = render_feed(feed, 1).unwrap();
        assert!(out.contains("<title>Blog</title>"));
        assert!(out.contains("<description>Blog</description>"));
        assert!(out.contains("<language>en</language>"));
        assert!(out.contains("<description>Sum</description>"));
        assert!(out.contains("<pubDate>Mon, 01 Apr 2024 06:30:00 -0000</pubDate>"));
        assert_eq!(out.matches("<title>Blog</title>").count(), 1);
        assert!(out.contains("\n <channel>"));
    }
}
