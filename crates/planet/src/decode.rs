// planet/src/decode.rs
//! 字符集解码
//!
//! Order: byte order mark, `charset=` of the content type, the XML
//! declaration, then UTF-8 if the bytes are valid, then detection.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::{debug, warn};

static CHARSET_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*"?([A-Za-z0-9._:\-]+)"?"#).expect("valid regex"));
static XML_DECL_ENCODING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?encoding\s*=\s*["']([A-Za-z0-9._:\-]+)["']"#).expect("valid regex")
});

/// Only the head of the document is searched for a declaration
const DECL_SCAN_LIMIT: usize = 1024;

pub fn decode_feed(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| content_type.and_then(|ct| declared_in(&CHARSET_PARAM, ct.as_bytes())))
        .or_else(|| declared_in(&XML_DECL_ENCODING, &bytes[..bytes.len().min(DECL_SCAN_LIMIT)]));

    let encoding = match encoding {
        Some(encoding) => encoding,
        None if std::str::from_utf8(bytes).is_ok() => UTF_8,
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            let guessed = detector.guess(None, true);
            debug!(encoding = guessed.name(), "Detected feed encoding");
            guessed
        }
    };

    let (decoded, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(encoding = used.name(), "Feed body contained undecodable bytes");
    }
    decoded.into_owned()
}

fn declared_in(pattern: &Regex, haystack: &[u8]) -> Option<&'static Encoding> {
    let label = pattern.captures(haystack)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}
