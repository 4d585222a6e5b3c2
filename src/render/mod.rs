//! RSS 2.0 output for filtered feeds.
//!
//! [`RssWriter`] takes the three required channel fields plus whatever
//! metadata is left, collects items, and renders a compact UTF-8 document.
//! [`prettify`] re-indents any XML document without changing its content.

mod pretty;

pub use pretty::prettify;

use crate::feed::{Fields, Value, DESCRIPTION, LINK, PUBDATE, TITLE};
use crate::util::strip_invalid_xml_chars;
use chrono::NaiveDateTime;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use thiserror::Error;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// Errors while writing or re-indenting a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to write XML: {0}")]
    Write(String),

    #[error("Failed to read XML for formatting: {0}")]
    Read(String),

    #[error("Generated document contains invalid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn write_err(e: impl std::fmt::Display) -> RenderError {
    RenderError::Write(e.to_string())
}

/// Builds an RSS 2.0 document.
///
/// Recognized channel extras: `feed_url` (as `<atom:link rel="self">`),
/// `language`, `copyright`, `categories`, `ttl`. Recognized item fields:
/// `title`, `link`, `description`, `author`, `pubdate`, `comments`, `id`,
/// `categories`. Everything else is ignored.
#[derive(Debug, Clone)]
pub struct RssWriter {
    title: String,
    link: String,
    description: String,
    extras: Fields,
    items: Vec<Fields>,
}

impl RssWriter {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
        extras: Fields,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: description.into(),
            extras,
            items: Vec::new(),
        }
    }

    pub fn add_item(&mut self, item: Fields) {
        self.items.push(item);
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Renders the document as a single-line UTF-8 string.
    pub fn write_string(&self) -> Result<String, RenderError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(write_err)?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        rss.push_attribute(("xmlns:atom", ATOM_NS));
        rss.push_attribute(("xmlns:dc", DC_NS));
        writer.write_event(Event::Start(rss)).map_err(write_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("channel")))
            .map_err(write_err)?;

        text_element(&mut writer, "title", &self.title)?;
        text_element(&mut writer, "link", &self.link)?;
        text_element(&mut writer, "description", &self.description)?;

        if let Some(feed_url) = self.extras.get("feed_url") {
            let href = feed_url.to_text();
            let href = strip_invalid_xml_chars(&href);
            let mut atom_link = BytesStart::new("atom:link");
            atom_link.push_attribute(("href", &*href));
            atom_link.push_attribute(("rel", "self"));
            writer
                .write_event(Event::Empty(atom_link))
                .map_err(write_err)?;
        }
        optional_element(&mut writer, "language", self.extras.get("language"))?;
        optional_element(&mut writer, "copyright", self.extras.get("copyright"))?;
        category_elements(&mut writer, self.extras.get("categories"))?;
        optional_element(&mut writer, "ttl", self.extras.get("ttl"))?;

        let latest = self
            .items
            .iter()
            .filter_map(|item| item.get(PUBDATE).and_then(Value::as_timestamp))
            .max();
        if let Some(latest) = latest {
            text_element(&mut writer, "lastBuildDate", &rfc2822(latest))?;
        }

        for item in &self.items {
            write_item(&mut writer, item)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("channel")))
            .map_err(write_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("rss")))
            .map_err(write_err)?;

        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }
}

fn write_item<W: Write>(writer: &mut Writer<W>, item: &Fields) -> Result<(), RenderError> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .map_err(write_err)?;

    for key in [TITLE, LINK, DESCRIPTION] {
        optional_element(writer, key, item.get(key))?;
    }
    if let Some(author) = item.get("author") {
        author_element(writer, author)?;
    }
    if let Some(pubdate) = item.get(PUBDATE).and_then(Value::as_timestamp) {
        text_element(writer, "pubDate", &rfc2822(pubdate))?;
    }
    optional_element(writer, "comments", item.get("comments"))?;

    if let Some(id) = item.get("id") {
        let id = id.to_text();
        let link = item.get(LINK).map(Value::to_text);
        let mut guid = BytesStart::new("guid");
        if link.as_deref() != Some(&*id) {
            guid.push_attribute(("isPermaLink", "false"));
        }
        writer.write_event(Event::Start(guid)).map_err(write_err)?;
        writer
            .write_event(Event::Text(BytesText::new(&strip_invalid_xml_chars(&id))))
            .map_err(write_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("guid")))
            .map_err(write_err)?;
    }

    category_elements(writer, item.get("categories"))?;

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .map_err(write_err)?;
    Ok(())
}

/// `<author>email (name)</author>`, `<author>email</author>`, or `<dc:creator>name</dc:creator>`.
fn author_element<W: Write>(writer: &mut Writer<W>, author: &Value) -> Result<(), RenderError> {
    let (name, email) = match author {
        Value::Map(map) => (
            map.get("name").map(Value::to_text),
            map.get("email").map(Value::to_text),
        ),
        other => (Some(other.to_text()), None),
    };
    match (name, email) {
        (Some(name), Some(email)) => text_element(writer, "author", &format!("{email} ({name})")),
        (None, Some(email)) => text_element(writer, "author", &email),
        (Some(name), None) => text_element(writer, "dc:creator", &name),
        (None, None) => Ok(()),
    }
}

fn category_elements<W: Write>(
    writer: &mut Writer<W>,
    categories: Option<&Value>,
) -> Result<(), RenderError> {
    match categories {
        Some(Value::List(items)) => {
            for item in items {
                text_element(writer, "category", &item.to_text())?;
            }
            Ok(())
        }
        Some(other) => text_element(writer, "category", &other.to_text()),
        None => Ok(()),
    }
}

fn optional_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: Option<&Value>,
) -> Result<(), RenderError> {
    match value {
        Some(value) => text_element(writer, name, &value.to_text()),
        None => Ok(()),
    }
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<(), RenderError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Text(BytesText::new(&strip_invalid_xml_chars(text))))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_err)?;
    Ok(())
}

/// RFC 2822 date for a naive timestamp. The zone is unknown, hence `-0000`.
fn rfc2822(ts: NaiveDateTime) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S -0000").to_string()
}
