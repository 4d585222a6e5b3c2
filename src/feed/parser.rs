//! Coercion of `feed-rs` documents into plain [`Feed`] maps.
//!
//! `feed-rs` hands back a typed model whose shape differs between RSS and
//! Atom. Everything downstream works on [`Fields`] maps, so this is the one
//! place that knows the parser's types; nested people, links, and images
//! become one level of [`Value::Map`]/[`Value::List`].

use crate::feed::model::{
    Feed, Fields, TimeParts, Value, DESCRIPTION, LINK, PUBLISHED_PARSED, SUMMARY, TITLE,
};
use feed_rs::model::{self as parsed, Person};
use feed_rs::parser::{self, ParseFeedError};

/// Parses raw feed bytes and coerces the result into a [`Feed`].
///
/// Entries keep `published_parsed` as a [`TimeParts`] breakdown; turning it
/// into a `pubdate` is the normalizer's job.
///
/// Documents without their own feed or item ids keep them empty instead of
/// getting the parser's generated hashes, so no `<guid>` is ever invented.
pub fn parse_feed(bytes: &[u8]) -> Result<Feed, ParseFeedError> {
    let parsed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)?;
    Ok(from_parsed(parsed))
}

/// Coerces an already-parsed `feed-rs` document.
pub fn from_parsed(feed: parsed::Feed) -> Feed {
    let metadata = feed_metadata(&feed);
    let entries: Vec<Fields> = feed.entries.into_iter().map(entry_fields).collect();
    Feed::new(metadata, entries)
}

fn feed_metadata(feed: &parsed::Feed) -> Fields {
    let mut meta = Fields::new();

    put_text(&mut meta, "id", Some(feed.id.as_str()));
    put_text(&mut meta, TITLE, feed.title.as_ref().map(|t| t.content.as_str()));
    put_text(&mut meta, LINK, alternate_link(&feed.links));
    put_text(
        &mut meta,
        "feed_url",
        feed.links
            .iter()
            .find(|l| l.rel.as_deref() == Some("self"))
            .map(|l| l.href.as_str()),
    );
    put_text(
        &mut meta,
        DESCRIPTION,
        feed.description.as_ref().map(|t| t.content.as_str()),
    );
    put_text(&mut meta, "language", feed.language.as_deref());
    put_text(
        &mut meta,
        "copyright",
        feed.rights.as_ref().map(|t| t.content.as_str()),
    );
    put_text(
        &mut meta,
        "generator",
        feed.generator.as_ref().map(|g| g.content.as_str()),
    );
    if let Some(ttl) = feed.ttl {
        meta.insert("ttl".to_owned(), Value::Text(ttl.to_string()));
    }
    if let Some(updated) = feed.updated {
        meta.insert("updated".to_owned(), Value::Timestamp(updated.naive_utc()));
    }
    if let Some(author) = feed.authors.first() {
        meta.insert("author".to_owned(), person(author));
    }
    if !feed.categories.is_empty() {
        meta.insert("categories".to_owned(), categories(&feed.categories));
    }
    if let Some(image) = feed.logo.as_ref().or(feed.icon.as_ref()) {
        let mut map = Fields::new();
        map.insert("url".to_owned(), Value::Text(image.uri.clone()));
        put_text(&mut map, TITLE, image.title.as_deref());
        put_text(&mut map, LINK, image.link.as_ref().map(|l| l.href.as_str()));
        meta.insert("image".to_owned(), Value::Map(map));
    }

    meta
}

fn entry_fields(entry: parsed::Entry) -> Fields {
    let mut fields = Fields::new();

    if !entry.id.trim().is_empty() {
        fields.insert("id".to_owned(), Value::Text(entry.id.trim().to_owned()));
    }
    put_text(&mut fields, TITLE, entry.title.as_ref().map(|t| t.content.as_str()));
    put_text(&mut fields, LINK, alternate_link(&entry.links));
    if !entry.links.is_empty() {
        let links = entry
            .links
            .iter()
            .map(|l| {
                let mut map = Fields::new();
                map.insert("href".to_owned(), Value::Text(l.href.clone()));
                put_text(&mut map, "rel", l.rel.as_deref());
                Value::Map(map)
            })
            .collect();
        fields.insert("links".to_owned(), Value::List(links));
    }
    put_text(
        &mut fields,
        SUMMARY,
        entry.summary.as_ref().map(|t| t.content.as_str()),
    );
    put_text(
        &mut fields,
        "content",
        entry.content.as_ref().and_then(|c| c.body.as_deref()),
    );
    if let Some(author) = entry.authors.first() {
        fields.insert("author".to_owned(), person(author));
    }
    if !entry.categories.is_empty() {
        fields.insert("categories".to_owned(), categories(&entry.categories));
    }
    if let Some(published) = entry.published.or(entry.updated) {
        fields.insert(
            PUBLISHED_PARSED.to_owned(),
            Value::Parts(TimeParts::from_utc(&published)),
        );
    }
    if let Some(updated) = entry.updated {
        fields.insert(
            "updated_parsed".to_owned(),
            Value::Parts(TimeParts::from_utc(&updated)),
        );
    }

    fields
}

/// First link without a `rel`, or with `rel="alternate"`, falling back to the first link.
fn alternate_link(links: &[parsed::Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.as_str())
}

fn person(p: &Person) -> Value {
    let mut map = Fields::new();
    put_text(&mut map, "name", Some(p.name.as_str()));
    put_text(&mut map, "email", p.email.as_deref());
    put_text(&mut map, "uri", p.uri.as_deref());
    Value::Map(map)
}

fn categories(cats: &[parsed::Category]) -> Value {
    Value::List(
        cats.iter()
            .map(|c| Value::Text(c.label.clone().unwrap_or_else(|| c.term.clone())))
            .collect(),
    )
}

fn put_text(map: &mut Fields, key: &str, value: Option<&str>) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        map.insert(key.to_owned(), Value::Text(v.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <link>https://example.com/</link>
    <description>An example blog</description>
    <language>en-us</language>
    <item>
      <guid>post-1</guid>
      <title>Go release</title>
      <link>https://example.com/post/1</link>
      <description>Short summary</description>
      <category>golang</category>
      <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Untimed</title>
      <link>https://example.com/post/2</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <link href="https://example.org/feed.xml" rel="self"/>
  <link href="https://example.org/" rel="alternate"/>
  <updated>2024-03-01T00:00:00Z</updated>
  <author><name>Jo</name><email>jo@example.org</email></author>
  <entry>
    <id>urn:entry:1</id>
    <title>Atom entry</title>
    <link href="https://example.org/1"/>
    <updated>2024-03-01T09:15:00Z</updated>
    <summary>Atom summary</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_rss_metadata_is_plain_text() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.metadata.get("title"), Some(&Value::from("Example Blog")));
        assert_eq!(
            feed.metadata.get("description"),
            Some(&Value::from("An example blog"))
        );
        assert_eq!(feed.metadata.get("language"), Some(&Value::from("en-us")));
        assert!(feed
            .metadata
            .get("link")
            .and_then(Value::as_str)
            .unwrap()
            .starts_with("https://example.com"));
    }

    #[test]
    fn test_rss_entries_keep_order_and_fields() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(first.seq(), 0);
        assert_eq!(first.get("title"), Some(&Value::from("Go release")));
        assert_eq!(first.get("summary"), Some(&Value::from("Short summary")));
        assert_eq!(
            first.get("categories"),
            Some(&Value::List(vec![Value::from("golang")]))
        );
        assert_eq!(
            first.get(PUBLISHED_PARSED),
            Some(&Value::Parts(TimeParts {
                year: 2024,
                month: 1,
                day: 1,
                hour: 10,
                minute: 0,
                second: 0,
            }))
        );

        let second = &feed.entries[1];
        assert_eq!(second.seq(), 1);
        assert!(!second.contains(PUBLISHED_PARSED));
    }

    #[test]
    fn test_item_without_guid_gets_no_id() {
        let feed = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(feed.entries[0].get("id"), Some(&Value::from("post-1")));
        assert!(!feed.entries[1].contains("id"));
        assert!(!feed.metadata.contains_key("id"));

        let mut entry = feed.entries[1].clone();
        entry.insert("pubdate", Value::Timestamp(chrono::NaiveDateTime::default()));
        let mut writer = crate::render::RssWriter::new("t", "l", "d", Fields::new());
        writer.add_item(entry.into_fields());
        assert!(!writer.write_string().unwrap().contains("<guid"));
    }

    #[test]
    fn test_atom_links_and_author_are_coerced() {
        let feed = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(
            feed.metadata.get("link"),
            Some(&Value::from("https://example.org/"))
        );
        assert_eq!(
            feed.metadata.get("feed_url"),
            Some(&Value::from("https://example.org/feed.xml"))
        );
        let author = feed.metadata.get("author").and_then(Value::as_map).unwrap();
        assert_eq!(author.get("name"), Some(&Value::from("Jo")));
        assert_eq!(author.get("email"), Some(&Value::from("jo@example.org")));

        let entry = &feed.entries[0];
        assert_eq!(entry.get("id"), Some(&Value::from("urn:entry:1")));
        assert_eq!(entry.link().unwrap(), "https://example.org/1");
        // Atom entries without <published> fall back to <updated>
        assert!(entry.contains(PUBLISHED_PARSED));
    }

    #[test]
    fn test_empty_channel_has_empty_metadata() {
        let empty = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        let feed = parse_feed(empty.as_bytes()).unwrap();
        assert!(feed.metadata.is_empty());
        assert!(feed.entries.is_empty());
    }

    #[test]
    fn test_not_a_feed_is_parse_error() {
        assert!(parse_feed(b"<html><body>Hello</body></html>").is_err());
    }
}
