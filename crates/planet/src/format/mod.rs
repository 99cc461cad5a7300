// planet/src/format/mod.rs
//! Feed 格式识别与解析
//!
//! The content type selects a parser from `CONTENT_TYPES`. Generic XML types
//! are resolved by looking at the document's root element.

mod atom;
mod rss;

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::entry::ParsedFeed;
use crate::error::FeedParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// RSS 0.9x and 2.0
    Rss,
    /// RSS 1.0
    Rdf,
    Atom,
}

type FeedParser = fn(&str) -> Result<ParsedFeed, FeedParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detection {
    Known(FeedFormat),
    /// Plain XML; the root element decides
    Sniff,
}

const CONTENT_TYPES: &[(&str, Detection)] = &[
    ("application/rss+xml", Detection::Known(FeedFormat::Rss)),
    ("application/x-rss+xml", Detection::Known(FeedFormat::Rss)),
    ("application/rdf+xml", Detection::Known(FeedFormat::Rdf)),
    ("application/atom+xml", Detection::Known(FeedFormat::Atom)),
    ("application/xml", Detection::Sniff),
    ("text/xml", Detection::Sniff),
];

const ROOT_ELEMENTS: &[(&str, FeedFormat)] = &[
    ("rss", FeedFormat::Rss),
    ("rdf:RDF", FeedFormat::Rdf),
    ("feed", FeedFormat::Atom),
];

impl FeedFormat {
    /// Format for a content type. A missing content type is sniffed.
    pub fn detect(content_type: Option<&str>, body: &str) -> Result<FeedFormat, FeedParseError> {
        let detection = match content_type.map(media_type) {
            None => Detection::Sniff,
            Some(media) => CONTENT_TYPES
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(&media))
                .map(|(_, detection)| *detection)
                .ok_or_else(|| FeedParseError::UnsupportedContentType(media.clone()))?,
        };
        match detection {
            Detection::Known(format) => Ok(format),
            Detection::Sniff => sniff(body),
        }
    }

    fn parser(self) -> FeedParser {
        match self {
            FeedFormat::Rss | FeedFormat::Rdf => rss::parse,
            FeedFormat::Atom => atom::parse,
        }
    }

    pub fn parse(self, body: &str) -> Result<ParsedFeed, FeedParseError> {
        (self.parser())(body)
    }
}

/// Detect the format and parse in one step
pub fn parse_feed(content_type: Option<&str>, body: &str) -> Result<ParsedFeed, FeedParseError> {
    FeedFormat::detect(content_type, body)?.parse(body)
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn sniff(body: &str) -> Result<FeedFormat, FeedParseError> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return ROOT_ELEMENTS
                    .iter()
                    .find(|(root, _)| *root == name)
                    .map(|(_, format)| *format)
                    .ok_or_else(|| {
                        FeedParseError::Malformed(format!("<{name}> is not a feed root element"))
                    });
            }
            Ok(Event::Eof) => return Err(FeedParseError::Malformed("document is empty".into())),
            Ok(_) => {}
            Err(e) => return Err(malformed(&reader, e)),
        }
    }
}

fn malformed(reader: &Reader<&[u8]>, error: quick_xml::Error) -> FeedParseError {
    FeedParseError::Malformed(format!("at byte {}: {error}", reader.buffer_position()))
}

/// Element events with qualified names, ancestors first in `path`
pub(crate) enum XmlEvent<'a> {
    Open {
        path: &'a [String],
        name: &'a str,
    },
    Close {
        path: &'a [String],
        name: &'a str,
        attrs: &'a [(String, String)],
        /// Text of the element and all of its descendants, trimmed
        text: &'a str,
    },
}

struct Frame {
    attrs: Vec<(String, String)>,
    text: String,
}

/// Walk a document, returning the root element's name
pub(crate) fn walk<F>(xml: &str, mut visit: F) -> Result<String, FeedParseError>
where
    F: FnMut(XmlEvent<'_>),
{
    let mut reader = Reader::from_str(xml);
    reader.expand_empty_elements(true);

    let mut path: Vec<String> = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();
    let mut root: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = e
                    .attributes()
                    .filter_map(Result::ok)
                    .map(|attr| {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let value = attr
                            .unescape_value()
                            .map(Cow::into_owned)
                            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
                        (key, value)
                    })
                    .collect();
                visit(XmlEvent::Open { path: &path, name: &name });
                if root.is_none() {
                    root = Some(name.clone());
                }
                path.push(name);
                frames.push(Frame { attrs, text: String::new() });
            }
            Ok(Event::End(_)) => {
                let (Some(name), Some(frame)) = (path.pop(), frames.pop()) else {
                    return Err(FeedParseError::Malformed("unbalanced end tag".into()));
                };
                visit(XmlEvent::Close {
                    path: &path,
                    name: &name,
                    attrs: &frame.attrs,
                    text: frame.text.trim(),
                });
                if let Some(parent) = frames.last_mut() {
                    parent.text.push_str(&frame.text);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(frame) = frames.last_mut() {
                    // Unknown HTML entities are kept as written
                    match t.unescape() {
                        Ok(text) => frame.text.push_str(&text),
                        Err(_) => frame.text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(frame) = frames.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(&reader, e)),
        }
    }

    if !path.is_empty() {
        return Err(FeedParseError::Malformed(format!(
            "document ended inside <{}>",
            path.join("/")
        )));
    }
    root.ok_or_else(|| FeedParseError::Malformed("document has no elements".into()))
}

/// RFC 3339 first (Atom, Dublin Core), then RFC 2822 (RSS)
pub(crate) fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

pub(crate) fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
