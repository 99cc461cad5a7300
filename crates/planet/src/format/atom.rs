// planet/src/format/atom.rs
//! Atom 1.0

use crate::entry::{FeedEntry, ParsedFeed};
use crate::error::FeedParseError;
use crate::format::{XmlEvent, non_empty, parse_date, walk};

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

pub(super) fn parse(xml: &str) -> Result<ParsedFeed, FeedParseError> {
    let mut feed = ParsedFeed::default();
    let mut current: Option<FeedEntry> = None;
    let mut has_content = false;

    let root = walk(xml, |event| match event {
        XmlEvent::Open { name: "entry", .. } => {
            current = Some(FeedEntry::default());
            has_content = false;
        }
        XmlEvent::Close { name: "entry", .. } => {
            if let Some(entry) = current.take() {
                feed.entries.push(entry);
            }
        }
        XmlEvent::Close { path, name, attrs, text } => {
            let parent = path.last().map(String::as_str);
            let Some(entry) = current.as_mut() else {
                if parent == Some("feed") && name == "title" {
                    feed.title = non_empty(text);
                }
                return;
            };
            match (parent, name) {
                (Some("entry"), "title") => entry.title = text.to_string(),
                (Some("entry"), "id") => entry.guid = non_empty(text),
                (Some("entry"), "link") => {
                    let alternate = attr(attrs, "rel").is_none_or(|rel| rel == "alternate");
                    if alternate && entry.permalink.is_none() {
                        entry.permalink = attr(attrs, "href").and_then(non_empty);
                    }
                }
                (Some("entry"), "content") => {
                    entry.content = text.to_string();
                    has_content = true;
                }
                (Some("entry"), "summary") if !has_content => entry.content = text.to_string(),
                (Some("author"), "name") if entry.author.is_empty() => {
                    entry.author = text.to_string()
                }
                (Some("entry"), "category") => {
                    if let Some(term) = attr(attrs, "term").and_then(non_empty) {
                        entry.categories.push(term);
                    }
                }
                (Some("entry"), "published") => entry.published = parse_date(text),
                (Some("entry"), "updated") if entry.published.is_none() => {
                    entry.published = parse_date(text)
                }
                (Some("entry"), "thr:total") => entry.comment_count = text.parse().ok(),
                _ => {}
            }
        }
        _ => {}
    })?;

    if root != "feed" {
        return Err(FeedParseError::Malformed(format!(
            "expected an Atom document, found <{root}>"
        )));
    }
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:thr="http://purl.org/syndication/thread/1.0">
  <title type="text">Example Weblog</title>
  <author><name>Feed Owner</name></author>
  <entry>
    <title>Atom entry</title>
    <id>tag:example.org,2024:entry-1</id>
    <link rel="replies" href="https://example.org/1#comments"/>
    <link rel="alternate" type="text/html" href="https://example.org/1"/>
    <updated>2024-05-02T10:00:00Z</updated>
    <published>2024-05-01T10:00:00Z</published>
    <author><name>Alice</name></author>
    <category term="rust"/>
    <category term="search" label="Search"/>
    <summary>Short</summary>
    <content type="html">&lt;p&gt;Long &amp;amp; detailed&lt;/p&gt;</content>
    <thr:total>2</thr:total>
  </entry>
  <entry>
    <title>Xhtml entry</title>
    <id>tag:example.org,2024:entry-2</id>
    <link href="https://example.org/2"/>
    <updated>2024-05-03T10:00:00Z</updated>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml">Inline <b>markup</b></div></content>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom() {
        let feed = parse(ATOM).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Example Weblog"));
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(first.title, "Atom entry");
        assert_eq!(first.permalink.as_deref(), Some("https://example.org/1"));
        assert_eq!(first.guid.as_deref(), Some("tag:example.org,2024:entry-1"));
        assert_eq!(first.author, "Alice");
        assert_eq!(first.categories, vec!["rust", "search"]);
        assert_eq!(first.content, "<p>Long &amp; detailed</p>");
        assert_eq!(first.comment_count, Some(2));
        assert_eq!(
            first.published.map(|p| p.to_rfc3339()),
            Some("2024-05-01T10:00:00+00:00".to_string())
        );

        let second = &feed.entries[1];
        assert_eq!(second.permalink.as_deref(), Some("https://example.org/2"));
        assert_eq!(second.content, "Inline markup");
        assert!(second.published.is_some());
    }

    #[test]
    fn test_rss_document_is_rejected() {
        assert!(matches!(
            parse("<rss><channel/></rss>"),
            Err(FeedParseError::Malformed(_))
        ));
    }
}
