use super::RenderError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

/// Re-indents an XML document, `indent` spaces per nesting level.
///
/// Whitespace-only text between elements is dropped and replaced by the new
/// layout; every element, attribute, and non-blank text node is kept.
/// An element with no content at all is written in its self-closing form.
///
/// # Errors
///
/// [`RenderError::Read`] if `raw` is not well-formed XML.
pub fn prettify(raw: &str, indent: usize) -> Result<String, RenderError> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', indent);
    // A start tag is held back until we know whether the element is empty.
    let mut pending: Option<BytesStart<'static>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| RenderError::Read(format!("at byte {}: {e}", reader.buffer_position())))?;

        match event {
            Event::Eof => break,
            Event::End(ref end)
                if pending.as_ref().is_some_and(|start| start.name() == end.name()) =>
            {
                if let Some(start) = pending.take() {
                    writer
                        .write_event(Event::Empty(start))
                        .map_err(super::write_err)?;
                }
            }
            other => {
                if let Some(start) = pending.take() {
                    writer
                        .write_event(Event::Start(start))
                        .map_err(super::write_err)?;
                }
                match other {
                    Event::Start(start) => pending = Some(start.into_owned()),
                    other => writer.write_event(other).map_err(super::write_err)?,
                }
            }
        }
    }

    if pending.is_some() {
        return Err(RenderError::Read("document ends inside an open element".to_owned()));
    }

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}
