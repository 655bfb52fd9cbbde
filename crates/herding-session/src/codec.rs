//! Minimal XML element tree and NUL-byte framing.
//!
//! The simulator exchanges small XML documents, each terminated by a single
//! `0x00` byte. Only elements and attributes carry meaning; text content is
//! ignored.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::SessionError;

/// Byte that terminates every frame on the wire.
pub const FRAME_TERMINATOR: u8 = 0;

/// Declaration written in front of every outbound document.
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#;

/// An XML element with its attributes and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes by name.
    pub attributes: BTreeMap<String, String>,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder: add an attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder: append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Attribute value by name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Children whose tag matches `name`, ignoring ASCII case.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children
            .iter()
            .filter(move |child| child.name.eq_ignore_ascii_case(name))
    }

    /// Parse the root element of an XML document.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Malformed`] for anything that is not a
    /// well-formed document with a root element.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);
        let mut open: Vec<Self> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                SessionError::Malformed(format!(
                    "xml error at byte {}: {e}",
                    reader.buffer_position()
                ))
            })?;
            let finished = match event {
                Event::Start(start) => {
                    open.push(element_from(&start)?);
                    None
                }
                Event::Empty(start) => Some(element_from(&start)?),
                Event::End(_) => Some(open.pop().ok_or_else(|| {
                    SessionError::Malformed("closing tag without opening tag".to_owned())
                })?),
                Event::Eof => {
                    return Err(SessionError::Malformed(
                        "document ended before the root element closed".to_owned(),
                    ));
                }
                _ => None,
            };
            if let Some(element) = finished {
                match open.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
        }
    }

    /// Serialize as an XML document (declaration included).
    pub fn to_document(&self) -> String {
        let mut out = String::from(XML_DECLARATION);
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, SessionError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| {
            SessionError::Malformed(format!("bad attribute in <{}>: {e}", element.name))
        })?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| {
                SessionError::Malformed(format!("bad value for {key} in <{}>: {e}", element.name))
            })?
            .into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

/// Read one NUL-terminated frame.
///
/// Returns `Ok(None)` once the peer has closed the channel. A trailing
/// fragment without a terminator is discarded as a closed channel.
///
/// # Errors
///
/// Returns [`SessionError::Connection`] on I/O failure.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, SessionError>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut buf = Vec::new();
    let read = reader
        .read_until(FRAME_TERMINATOR, &mut buf)
        .await
        .map_err(|e| SessionError::Connection(format!("read failed: {e}")))?;
    if read == 0 || buf.last() != Some(&FRAME_TERMINATOR) {
        return Ok(None);
    }
    buf.pop();
    Ok(Some(buf))
}

/// Write one frame followed by its terminator, then flush.
///
/// # Errors
///
/// Returns [`SessionError::Connection`] on I/O failure.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), SessionError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let io = |e: std::io::Error| SessionError::Connection(format!("write failed: {e}"));
    writer.write_all(payload).await.map_err(io)?;
    writer.write_all(&[FRAME_TERMINATOR]).await.map_err(io)?;
    writer.flush().await.map_err(io)
}
