//! Streaming `<head>` scan for page metadata.
//!
//! Bytes are pushed through an `html5ever` tokenizer with a custom sink; no
//! tree is built, so memory stays flat regardless of document size. The scan
//! stops at the first `<body>` start tag because title and meta tags live in
//! the head. Truncated or malformed markup is not an error: whatever was seen
//! before the input ran out is returned.
//!
//! ```
//! use pagemeta_web::extract_from_str;
//!
//! let record = extract_from_str(
//!     r#"<html><head>
//!          <title>Launch day - The Blog</title>
//!          <meta name="description" content="We shipped.">
//!        </head><body></body></html>"#,
//! );
//! assert_eq!(record.title, "Launch day - The Blog");
//! assert_eq!(record.description, "We shipped.");
//! assert_eq!(record.site_name, "TheBlog");
//! ```

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use pagemeta_common::MetadataRecord;

use crate::title::parse_site_name_from_title;

/// Whether the scanner wants more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Continue,
    /// `<body>` was reached; further input is ignored.
    Done,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Description,
    Image,
    SiteName,
}

/// Recognized meta keys, applied to a single tag in this order.
const META_KEYS: [(&str, Field); 5] = [
    ("description", Field::Description),
    ("og:title", Field::Title),
    ("og:description", Field::Description),
    ("og:image", Field::Image),
    ("og:site_name", Field::SiteName),
];

fn slot(record: &mut MetadataRecord, field: Field) -> &mut String {
    match field {
        Field::Title => &mut record.title,
        Field::Description => &mut record.description,
        Field::Image => &mut record.image,
        Field::SiteName => &mut record.site_name,
    }
}

#[derive(Default)]
struct HeadSink {
    record: MetadataRecord,
    // armed by <title>, text following it becomes the title
    title_pending: bool,
    title_started: bool,
    reached_body: bool,
    meta_matches: usize,
}

impl HeadSink {
    fn on_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        if self.title_started {
            self.title_pending = false;
            self.title_started = false;
        }

        match tag.kind {
            TagKind::StartTag => match &*tag.name {
                "body" => self.reached_body = true,
                "title" => {
                    self.title_pending = true;
                    if !tag.self_closing {
                        return TokenSinkResult::RawData(RawKind::Rcdata);
                    }
                }
                "meta" => self.on_meta(&tag),
                _ => {}
            },
            TagKind::EndTag => {
                if &*tag.name == "title" {
                    self.title_pending = false;
                }
            }
        }
        TokenSinkResult::Continue
    }

    fn on_meta(&mut self, tag: &Tag) {
        let mut property = None;
        let mut name = None;
        let mut content = None;
        for attr in &tag.attrs {
            match &*attr.name.local {
                "property" => property = Some(&*attr.value),
                "name" => name = Some(attr.value.to_lowercase()),
                "content" => content = Some(&*attr.value),
                _ => {}
            }
        }

        for (key, field) in META_KEYS {
            if property == Some(key) || name.as_deref() == Some(key) {
                *slot(&mut self.record, field) = content.unwrap_or_default().to_string();
                self.meta_matches += 1;
                tracing::trace!(key, "pagemeta.extract.meta");
            }
        }
    }

    fn on_text(&mut self, text: &str) {
        if !self.title_pending {
            return;
        }
        if !self.title_started {
            self.record.title.clear();
            self.title_started = true;
        }
        self.record.title.push_str(text);
    }
}

impl TokenSink for HeadSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if self.reached_body {
            return TokenSinkResult::Continue;
        }
        match token {
            Token::TagToken(tag) => self.on_tag(tag),
            Token::CharacterTokens(text) => {
                self.on_text(&text);
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

/// Incremental UTF-8 decoding across chunk boundaries.
///
/// A multi-byte sequence cut by a chunk boundary is held back until the
/// next chunk; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // incomplete sequence at the end, wait for more bytes
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let leftover = rest.to_vec();
        self.pending = leftover;
        out
    }

    fn flush(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Push-based metadata scanner.
///
/// Feed body chunks as they arrive and stop feeding once [`Scan::Done`] is
/// returned; call [`MetaScanner::finish`] on every path to get the record.
pub struct MetaScanner {
    tokenizer: Tokenizer<HeadSink>,
    input: BufferQueue,
    decoder: Utf8Stream,
    bytes_seen: usize,
}

impl Default for MetaScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaScanner {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(HeadSink::default(), TokenizerOpts::default()),
            input: BufferQueue::new(),
            decoder: Utf8Stream::default(),
            bytes_seen: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.tokenizer.sink.reached_body
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Scan {
        if self.is_done() {
            return Scan::Done;
        }
        self.bytes_seen += bytes.len();
        let text = self.decoder.decode(bytes);
        self.push_text(&text);
        if self.is_done() {
            tracing::debug!(bytes_seen = self.bytes_seen, "pagemeta.extract.body_reached");
            Scan::Done
        } else {
            Scan::Continue
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.input.push_back(StrTendril::from_slice(text));
        let _ = self.tokenizer.feed(&mut self.input);
    }

    /// Flush the tokenizer and return what was collected. A missing site
    /// name is derived from the final title.
    pub fn finish(mut self) -> MetadataRecord {
        if !self.is_done() {
            let tail = self.decoder.flush();
            self.push_text(&tail);
            self.tokenizer.end();
        }

        let sink = &mut self.tokenizer.sink;
        let mut record = std::mem::take(&mut sink.record);
        if record.site_name.is_empty() {
            record.site_name = parse_site_name_from_title(&record.title);
        }

        tracing::debug!(
            bytes_seen = self.bytes_seen,
            reached_body = sink.reached_body,
            meta_matches = sink.meta_matches,
            has_title = !record.title.is_empty(),
            has_image = !record.image.is_empty(),
            "pagemeta.extract.finished"
        );
        record
    }
}

/// Scan a complete document held in memory.
pub fn extract_from_str(html: &str) -> MetadataRecord {
    let mut scanner = MetaScanner::new();
    scanner.feed(html.as_bytes());
    scanner.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_open_graph_fields() {
        let record = extract_from_str(
            r#"<html><head>
                <meta property="og:title" content="T"/>
                <meta property="og:description" content="D"/>
                <meta property="og:image" content="https://example.com/img.png"/>
                <meta property="og:site_name" content="S"/>
            </head></html>"#,
        );
        assert_eq!(record.title, "T");
        assert_eq!(record.description, "D");
        assert_eq!(record.image, "https://example.com/img.png");
        assert_eq!(record.site_name, "S");
    }

    #[test]
    fn later_tags_overwrite_earlier_ones() {
        let record = extract_from_str(
            r#"<head>
                <meta property="og:title" content="A">
                <meta property="og:title" content="B">
            </head>"#,
        );
        assert_eq!(record.title, "B");
    }

    #[test]
    fn og_description_overrides_plain_description() {
        let record = extract_from_str(
            r#"<head>
                <meta name="description" content="plain">
                <meta property="og:description" content="graph">
            </head>"#,
        );
        assert_eq!(record.description, "graph");
    }

    #[test]
    fn title_tag_after_og_title_wins() {
        let record = extract_from_str(
            r#"<head>
                <meta property="og:title" content="OG Title">
                <title>Tag Title</title>
            </head>"#,
        );
        assert_eq!(record.title, "Tag Title");
    }

    #[test]
    fn description_name_is_case_insensitive() {
        let record = extract_from_str(r#"<meta NAME="Description" content="Mixed case">"#);
        assert_eq!(record.description, "Mixed case");
    }

    #[test]
    fn property_match_is_case_sensitive() {
        let record = extract_from_str(r#"<meta property="OG:TITLE" content="shouting">"#);
        assert_eq!(record.title, "");
    }

    #[test]
    fn meta_without_content_clears_the_field() {
        let record = extract_from_str(
            r#"<meta property="og:image" content="/a.png"><meta property="og:image">"#,
        );
        assert_eq!(record.image, "");
    }

    #[test]
    fn title_entities_are_decoded() {
        let record = extract_from_str("<title>Fish &amp; Chips - Menu</title>");
        assert_eq!(record.title, "Fish & Chips - Menu");
        assert_eq!(record.site_name, "Menu");
    }

    #[test]
    fn markup_inside_title_is_text() {
        let record = extract_from_str("<title>a <b>bold</b> claim</title>");
        assert_eq!(record.title, "a <b>bold</b> claim");
    }

    #[test]
    fn body_before_meta_yields_empty_record() {
        let record = extract_from_str(
            r#"<html><body>
                <title>Ignored</title>
                <meta property="og:title" content="Ignored">
            </body></html>"#,
        );
        assert_eq!(record, MetadataRecord::default());
    }

    #[test]
    fn truncated_document_returns_partial_record() {
        let record =
            extract_from_str(r#"<html><head><title>Half a page</title><meta property="og:ima"#);
        assert_eq!(record.title, "Half a page");
        assert_eq!(record.image, "");
        assert_eq!(record.site_name, "Halfapage");
    }

    #[test]
    fn unterminated_title_keeps_text() {
        let record = extract_from_str("<title>Never closed");
        assert_eq!(record.title, "Never closed");
    }

    #[test]
    fn explicit_site_name_beats_title_heuristic() {
        let record = extract_from_str(
            r#"<title>Story - Paper</title><meta property="og:site_name" content="The Daily">"#,
        );
        assert_eq!(record.site_name, "The Daily");
    }

    #[test]
    fn site_name_is_derived_from_final_title() {
        let record = extract_from_str(
            r#"<title>Draft - Old</title><meta property="og:title" content="Final - New Site">"#,
        );
        assert_eq!(record.title, "Final - New Site");
        assert_eq!(record.site_name, "NewSite");
    }

    #[test]
    fn empty_title_tag_leaves_title_empty() {
        let record = extract_from_str("<head><title></title>\n<meta charset=\"utf-8\"></head>");
        assert_eq!(record.title, "");
        assert_eq!(record.site_name, "");
    }

    #[test]
    fn chunked_feed_matches_single_feed() {
        let html = "<html><head><title>Caf\u{e9} \u{2014} Men\u{fc} - Bistro</title>\
                    <meta property=\"og:description\" content=\"Sm\u{f8}rrebr\u{f8}d\"></head>\
                    <body>ignored</body></html>";
        let expected = extract_from_str(html);

        // one byte at a time splits every multi-byte character
        let mut scanner = MetaScanner::new();
        let mut state = Scan::Continue;
        for byte in html.as_bytes() {
            state = scanner.feed(std::slice::from_ref(byte));
            if state == Scan::Done {
                break;
            }
        }
        assert_eq!(state, Scan::Done);
        let record = scanner.finish();

        assert_eq!(record, expected);
        assert_eq!(record.title, "Caf\u{e9} \u{2014} Men\u{fc} - Bistro");
        assert_eq!(record.description, "Sm\u{f8}rrebr\u{f8}d");
    }

    #[test]
    fn feed_after_body_is_ignored() {
        let mut scanner = MetaScanner::new();
        assert_eq!(scanner.feed(b"<head><title>Kept</title></head><body>"), Scan::Done);
        assert_eq!(scanner.feed(b"<title>Dropped</title>"), Scan::Done);
        assert_eq!(scanner.finish().title, "Kept");
    }

    #[test]
    fn utf8_stream_replaces_invalid_bytes() {
        let mut stream = Utf8Stream::default();
        assert_eq!(stream.decode(b"ok\xffok"), "ok\u{fffd}ok");
        // first two bytes of a three-byte sequence
        assert_eq!(stream.decode(b"a\xe2\x82"), "a");
        assert_eq!(stream.decode(b"\xac"), "\u{20ac}");
        assert_eq!(stream.decode(b"\xe2"), "");
        assert_eq!(stream.flush(), "\u{fffd}");
    }
}
