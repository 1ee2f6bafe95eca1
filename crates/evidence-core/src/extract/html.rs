//! Structural document-link rules for HTML payloads
//!
//! Each [`HtmlRule`] is an independent pattern plus URL check. Rules run in
//! [`HtmlRule::ORDERED`] order and the first plausible link wins; no rule
//! looks at another rule's result.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

lazy_static! {
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap();
    static ref HTML_COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();

    static ref OBJECT_TAG: Regex =
        Regex::new(r#"(?is)<object\b[^>]*?\bdata\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref ANCHOR_TAG: Regex =
        Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref EMBED_TAG: Regex =
        Regex::new(r#"(?is)<embed\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref IFRAME_TAG: Regex =
        Regex::new(r#"(?is)<iframe\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref CITATION_META: Regex = Regex::new(
        r#"(?is)<meta\b[^>]*?\bname\s*=\s*["']citation_pdf_url["'][^>]*?\bcontent\s*=\s*["']([^"']+)["']"#
    ).unwrap();
}

/// One structural extraction rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtmlRule {
    /// `<object data="...pdf">`
    ObjectTag,
    /// `<a href="...pdf">Download</a>`
    AnchorDownloadLink,
    /// `<embed src="...pdf">`
    EmbedTag,
    /// `<iframe src="...pdf">`
    IframeEmbed,
    /// `<meta name="citation_pdf_url" content="...">`
    CitationMeta,
}

impl HtmlRule {
    /// Evaluation priority
    pub const ORDERED: [HtmlRule; 5] = [
        HtmlRule::ObjectTag,
        HtmlRule::AnchorDownloadLink,
        HtmlRule::EmbedTag,
        HtmlRule::IframeEmbed,
        HtmlRule::CitationMeta,
    ];

    fn pattern(&self) -> &'static Regex {
        match self {
            HtmlRule::ObjectTag => &OBJECT_TAG,
            HtmlRule::AnchorDownloadLink => &ANCHOR_TAG,
            HtmlRule::EmbedTag => &EMBED_TAG,
            HtmlRule::IframeEmbed => &IFRAME_TAG,
            HtmlRule::CitationMeta => &CITATION_META,
        }
    }

    /// First link matched by this rule that resolves to a plausible document
    pub fn apply(&self, html: &str, base: &Url) -> Option<Url> {
        self.pattern()
            .captures_iter(html)
            .filter_map(|cap| cap.get(1))
            .filter_map(|m| resolve_link(m.as_str(), base))
            .find(looks_like_document)
    }
}

/// Remove script bodies and comments so no embedded code is ever considered
pub fn sanitize_html(html: &str) -> String {
    let without_scripts = SCRIPT_BLOCK.replace_all(html, "");
    HTML_COMMENT.replace_all(&without_scripts, "").into_owned()
}

/// Run the ordered rules and return the winning link with its rule
pub fn extract_document_link(html: &str, base: &Url) -> Option<(HtmlRule, Url)> {
    let sanitized = sanitize_html(html);
    HtmlRule::ORDERED
        .iter()
        .find_map(|rule| rule.apply(&sanitized, base).map(|url| (*rule, url)))
}

/// Resolve a raw attribute value against the page URL (http/https only)
fn resolve_link(raw: &str, base: &Url) -> Option<Url> {
    let decoded = raw.trim().replace("&amp;", "&");
    if decoded.is_empty() || decoded.starts_with('#') {
        return None;
    }

    let mut url = base.join(&decoded).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Whether a URL plausibly points at a document rather than a page
pub fn looks_like_document(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    let query = url.query().unwrap_or("").to_ascii_lowercase();

    path.ends_with(".pdf")
        || path
            .split('/')
            .any(|segment| matches!(segment, "pdf" | "download" | "downloads"))
        || query.contains("pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base() -> Url {
        Url::parse("https://mirror.example").unwrap()
    }

    #[rstest]
    #[case(
        r#"<object id="pdf" data="https://twin.mirror.example/12345/article.pdf" type="application/pdf"></object>"#,
        HtmlRule::ObjectTag,
        "https://twin.mirror.example/12345/article.pdf"
    )]
    #[case(
        r#"<a href="//mirror.example/downloads/2023-01-15/abc/article.pdf">Download PDF</a>"#,
        HtmlRule::AnchorDownloadLink,
        "https://mirror.example/downloads/2023-01-15/abc/article.pdf"
    )]
    #[case(
        r#"<embed src="/downloads/article.pdf" type="application/pdf">"#,
        HtmlRule::EmbedTag,
        "https://mirror.example/downloads/article.pdf"
    )]
    #[case(
        r#"<iframe src="https://other.example/pdf/article.pdf#view=FitH"></iframe>"#,
        HtmlRule::IframeEmbed,
        "https://other.example/pdf/article.pdf"
    )]
    #[case(
        r#"<meta name="citation_pdf_url" content="https://journal.example/content/1/2.pdf">"#,
        HtmlRule::CitationMeta,
        "https://journal.example/content/1/2.pdf"
    )]
    fn test_each_rule(#[case] html: &str, #[case] rule: HtmlRule, #[case] expected: &str) {
        let page = format!("<html><body>{}</body></html>", html);
        let (matched, url) = extract_document_link(&page, &base()).unwrap();
        assert_eq!(matched, rule);
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn test_priority_order() {
        let page = r#"<html><body>
            <iframe src="/frame/late.pdf"></iframe>
            <a href="/downloads/anchor.pdf">Download</a>
            <object data="/obj/first.pdf"></object>
        </body></html>"#;
        let (rule, url) = extract_document_link(page, &base()).unwrap();
        assert_eq!(rule, HtmlRule::ObjectTag);
        assert_eq!(url.path(), "/obj/first.pdf");
    }

    #[test]
    fn test_implausible_links_are_skipped() {
        let page = r#"<a href="/about">About</a><a href="/contact">Contact</a>
            <a href="/files/paper.pdf">Full text</a>"#;
        let (rule, url) = extract_document_link(page, &base()).unwrap();
        assert_eq!(rule, HtmlRule::AnchorDownloadLink);
        assert_eq!(url.path(), "/files/paper.pdf");
    }

    #[test]
    fn test_script_links_are_ignored() {
        let page = r#"<script>var x = '<embed src="/evil/payload.pdf">';</script>
            <p>No document here</p>"#;
        assert!(extract_document_link(page, &base()).is_none());
    }

    #[test]
    fn test_non_http_schemes_rejected() {
        let page = r#"<a href="javascript:open('a.pdf')">x</a><a href="data:application/pdf;base64,AAA">y</a>"#;
        assert!(extract_document_link(page, &base()).is_none());
    }

    #[test]
    fn test_entity_decoding_in_href() {
        let page = r#"<a href="/file?id=10.1371&amp;type=printable&amp;format=pdf">PDF</a>"#;
        let (_, url) = extract_document_link(page, &base()).unwrap();
        assert_eq!(url.query(), Some("id=10.1371&type=printable&format=pdf"));
    }

    #[rstest]
    #[case("https://journal.example/articles/10.1234/x/pdf", true)]
    #[case("https://journal.example/pdf/10.1234/x", true)]
    #[case("https://journal.example/download/42", true)]
    #[case("https://journal.example/files/paper.PDF", true)]
    #[case("https://journal.example/pdf-guidelines", false)]
    #[case("https://journal.example/pdfs-about/authors", false)]
    #[case("https://journal.example/downloader-app", false)]
    fn test_looks_like_document(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(looks_like_document(&Url::parse(url).unwrap()), expected);
    }

    #[test]
    fn test_guideline_anchor_does_not_win() {
        let page = r#"<a href="/pdf-guidelines">Author guidelines</a>
            <a href="/articles/10.1234/x/pdf">Download article</a>"#;
        let (rule, url) = extract_document_link(page, &base()).unwrap();
        assert_eq!(rule, HtmlRule::AnchorDownloadLink);
        assert_eq!(url.path(), "/articles/10.1234/x/pdf");
    }

    #[test]
    fn test_plain_page_has_no_link() {
        let page = "<html><body><h1>Subscribe to read</h1></body></html>";
        assert!(extract_document_link(page, &base()).is_none());
    }
}
