// planet/src/format/rss.rs
//! RSS 0.9x, 2.0 and 1.0 (RDF)

use crate::entry::{FeedEntry, ParsedFeed};
use crate::error::FeedParseError;
use crate::format::{XmlEvent, non_empty, parse_date, walk};

pub(super) fn parse(xml: &str) -> Result<ParsedFeed, FeedParseError> {
    let mut feed = ParsedFeed::default();
    let mut current: Option<FeedEntry> = None;
    // content:encoded beats description regardless of order
    let mut has_full_content = false;

    let root = walk(xml, |event| match event {
        XmlEvent::Open { name: "item", .. } => {
            current = Some(FeedEntry::default());
            has_full_content = false;
        }
        XmlEvent::Close { name: "item", .. } => {
            if let Some(entry) = current.take() {
                feed.entries.push(entry);
            }
        }
        XmlEvent::Close { path, name, text, .. } => {
            let parent = path.last().map(String::as_str);
            match (current.as_mut(), parent) {
                (Some(entry), Some("item")) => match name {
                    "title" => entry.title = text.to_string(),
                    "link" => entry.permalink = non_empty(text),
                    "guid" => entry.guid = non_empty(text),
                    "description" if !has_full_content => entry.content = text.to_string(),
                    "content:encoded" => {
                        entry.content = text.to_string();
                        has_full_content = true;
                    }
                    "author" | "dc:creator" if entry.author.is_empty() => {
                        entry.author = text.to_string()
                    }
                    "category" | "dc:subject" => {
                        if let Some(category) = non_empty(text) {
                            entry.categories.push(category);
                        }
                    }
                    "pubDate" | "dc:date" if entry.published.is_none() => {
                        entry.published = parse_date(text)
                    }
                    "slash:comments" | "thr:total" => entry.comment_count = text.parse().ok(),
                    _ => {}
                },
                (None, Some("channel")) if name == "title" => feed.title = non_empty(text),
                _ => {}
            }
        }
        _ => {}
    })?;

    if root != "rss" && root != "rdf:RDF" {
        return Err(FeedParseError::Malformed(format!(
            "expected an RSS document, found <{root}>"
        )));
    }
    Ok(feed)
}
