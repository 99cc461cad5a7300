// search-core/src/mapper.rs
//! 文档映射 - ContentItem → SearchDocument

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::MappingError;
use crate::models::ContentItem;
use crate::schema::*;

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
});
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Map a content item to its search document.
///
/// Pure: the same item always yields the same document.
pub fn map_to_document(item: &ContentItem) -> Result<SearchDocument, MappingError> {
    let id = validate_identity(&item.id)?;
    let site = validate_site(&item.site_id)?;

    let mut doc = SearchDocument::new();
    doc.push_text(FIELD_ID, id);
    doc.push_text(FIELD_KIND, item.kind.as_str());
    doc.push_text(FIELD_SITE, site);
    doc.push_text(FIELD_TITLE, strip_markup(&item.title));
    doc.push_text(FIELD_CONTENT, strip_markup(&item.body));
    if !item.author.is_empty() {
        doc.push_text(FIELD_AUTHOR, item.author.as_str());
    }
    for category in item.categories.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        doc.push_text(FIELD_CATEGORY, category);
    }
    for tag in item.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        doc.push_text(FIELD_TAGS, tag);
    }
    if let Some(permalink) = &item.permalink {
        doc.push_text(FIELD_PERMALINK, permalink.as_str());
    }
    if let Some(published) = item.published {
        doc.push_date(FIELD_PUBLISHED, published);
    }

    Ok(doc)
}

fn validate_identity(id: &str) -> Result<&str, MappingError> {
    if id.trim().is_empty() {
        return Err(MappingError::MissingIdentity);
    }
    if id.chars().any(char::is_control) || id.trim() != id {
        return Err(MappingError::InvalidIdentity(id.to_string()));
    }
    Ok(id)
}

fn validate_site(site_id: &str) -> Result<&str, MappingError> {
    if site_id.is_empty() || site_id.trim() != site_id || site_id.chars().any(char::is_control) {
        return Err(MappingError::InvalidSite(site_id.to_string()));
    }
    Ok(site_id)
}

/// Reduce HTML to its visible text
pub fn strip_markup(html: &str) -> String {
    let text = SCRIPT_OR_STYLE.replace_all(html, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, PublishStatus};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn sample() -> ContentItem {
        ContentItem::new("entry-42", ContentKind::Post, "main")
            .with_title("Release <em>notes</em>")
            .with_body("<p>Roller 6 &amp; <b>Planet</b></p><script>track()</script>")
            .with_author("Dave")
            .with_categories(["java", " ", "dev"])
            .with_tags(["release"])
            .with_permalink("https://blogs.example.org/main/entry/42")
            .with_published(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let item = sample();
        assert_eq!(map_to_document(&item).unwrap(), map_to_document(&item).unwrap());
    }

    #[test]
    fn test_maps_all_fields() {
        let doc = map_to_document(&sample()).unwrap();
        assert_eq!(doc.identity(), Some("entry-42"));
        assert_eq!(doc.text(FIELD_KIND), Some("post"));
        assert_eq!(doc.text(FIELD_SITE), Some("main"));
        assert_eq!(doc.text(FIELD_TITLE), Some("Release notes"));
        assert_eq!(doc.text(FIELD_CONTENT), Some("Roller 6 & Planet"));
        assert_eq!(doc.text(FIELD_AUTHOR), Some("Dave"));

        let categories: Vec<_> = doc
            .fields()
            .iter()
            .filter(|f| f.name == FIELD_CATEGORY)
            .collect();
        assert_eq!(categories.len(), 2);
        assert!(doc.fields().iter().any(|f| f.name == FIELD_PUBLISHED));
    }

    #[test]
    fn test_status_does_not_affect_mapping() {
        let draft = sample().with_status(PublishStatus::Draft);
        assert!(map_to_document(&draft).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_missing_identity(#[case] id: &str) {
        let item = ContentItem::new(id, ContentKind::Comment, "main");
        assert_eq!(map_to_document(&item), Err(MappingError::MissingIdentity));
    }

    #[rstest]
    #[case("bad\u{0}id")]
    #[case(" padded")]
    #[case("padded\t")]
    fn test_invalid_identity_rejected(#[case] id: &str) {
        let item = ContentItem::new(id, ContentKind::Comment, "main");
        assert!(matches!(
            map_to_document(&item),
            Err(MappingError::InvalidIdentity(_))
        ));
    }

    #[rstest]
    #[case("")]
    #[case(" main")]
    #[case("main ")]
    fn test_invalid_site_rejected(#[case] site: &str) {
        let item = ContentItem::new("entry-1", ContentKind::Post, site);
        assert_eq!(
            map_to_document(&item),
            Err(MappingError::InvalidSite(site.to_string()))
        );
    }

    #[rstest]
    #[case("<p>a</p><p>b</p>", "a b")]
    #[case("x<!-- hidden -->y", "x y")]
    #[case("<style>p { color: red }</style>visible", "visible")]
    #[case("caf&#233; &#x41;", "café A")]
    #[case("&amp;lt;kept&amp;gt;", "&lt;kept&gt;")]
    #[case("plain text", "plain text")]
    fn test_strip_markup(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_markup(input), expected);
    }
}
