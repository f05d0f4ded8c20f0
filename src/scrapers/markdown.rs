//! Deterministic HTML→markdown conversion.
//!
//! Every converter rule is pinned; converter defaults are never relied on.
//! Link and image URLs are dropped from the output: they are noisy for
//! checksums and nothing downstream needs them (the canonical HTML retains
//! absolute URLs for debugging).

use anyhow::{anyhow, Result};
use htmd::options::{
    BulletListMarker, CodeBlockStyle, HeadingStyle, HrStyle, LinkReferenceStyle, LinkStyle,
    Options,
};
use htmd::{Element, HtmlToMarkdown};
use unicode_normalization::UnicodeNormalization;

fn attr_value(element: &Element, name: &str) -> Option<String> {
    element
        .attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

fn is_buttonish(element: &Element) -> bool {
    let role = attr_value(element, "role").unwrap_or_default().to_lowercase();
    let class = attr_value(element, "class").unwrap_or_default().to_lowercase();
    role.contains("button") || class.contains("button") || class.contains("btn")
}

fn build_converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            hr_style: HrStyle::Dashes,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            link_style: LinkStyle::Inlined,
            link_reference_style: LinkReferenceStyle::Full,
            ..Default::default()
        })
        // Images carry no text and their URLs churn; drop them entirely.
        .add_handler(vec!["img"], |_: Element| Some(String::new()))
        .add_handler(vec!["a"], |element: Element| {
            let content = element.content.trim();
            if content.is_empty() {
                return Some(String::new());
            }
            let marker = if is_buttonish(&element) { "[button]" } else { "[link]" };
            Some(format!("{content} {marker}"))
        })
        .add_handler(vec!["button"], |element: Element| {
            let content = element.content.trim();
            if content.is_empty() {
                return Some(String::new());
            }
            Some(format!("{content} [button]"))
        })
        .add_handler(vec!["em", "i"], |element: Element| {
            let content = element.content.trim();
            if content.is_empty() {
                return Some(String::new());
            }
            Some(format!("*{content}*"))
        })
        .add_handler(vec!["strong", "b"], |element: Element| {
            let content = element.content.trim();
            if content.is_empty() {
                return Some(String::new());
            }
            Some(format!("**{content}**"))
        })
        .build()
}

/// Convert canonical HTML to the normalized markdown artifact.
///
/// The returned form (NFC, LF line endings, trimmed) is exactly what the
/// content checksum is computed over.
pub fn convert_to_markdown(html: &str) -> Result<String> {
    let converter = build_converter();
    let markdown = converter
        .convert(html)
        .map_err(|e| anyhow!("markdown conversion failed: {}", e))?;
    Ok(postprocess(&markdown))
}

/// NFC-normalize, convert CRLF to LF, and trim.
pub fn postprocess(markdown: &str) -> String {
    let normalized: String = markdown.nfc().collect();
    normalized.replace("\r\n", "\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_are_atx() {
        let md = convert_to_markdown("<h2>Amenities</h2><p>Pool and spa.</p>").unwrap();
        assert!(md.starts_with("## Amenities"));
        assert!(md.contains("Pool and spa."));
    }

    #[test]
    fn test_links_drop_urls() {
        let md = convert_to_markdown(r#"<a href="https://example.com/rooms">Our rooms</a>"#).unwrap();
        assert_eq!(md, "Our rooms [link]");
    }

    #[test]
    fn test_button_classed_anchor() {
        let md =
            convert_to_markdown(r#"<a class="btn btn-primary" href="/book">Book now</a>"#).unwrap();
        assert_eq!(md, "Book now [button]");
        let md = convert_to_markdown(r#"<a role="button" href="/book">Reserve</a>"#).unwrap();
        assert_eq!(md, "Reserve [button]");
    }

    #[test]
    fn test_button_element() {
        assert_eq!(
            convert_to_markdown("<button>Check availability</button>").unwrap(),
            "Check availability [button]"
        );
        assert_eq!(convert_to_markdown("<button></button>").unwrap(), "");
    }

    #[test]
    fn test_images_dropped() {
        let md = convert_to_markdown(r#"<p>Lobby <img src="lobby.jpg" alt="our lobby"> view</p>"#)
            .unwrap();
        assert!(!md.contains("lobby.jpg"));
        assert!(!md.contains("!["));
        assert!(md.contains("Lobby"));
    }

    #[test]
    fn test_emphasis_delimiters_pinned() {
        let md = convert_to_markdown("<p><em>quiet</em> and <strong>grand</strong></p>").unwrap();
        assert!(md.contains("*quiet*"));
        assert!(md.contains("**grand**"));
    }

    #[test]
    fn test_bullets_are_dashes() {
        let md = convert_to_markdown("<ul><li>Pool</li><li>Spa</li></ul>").unwrap();
        assert!(md.contains("- Pool"));
        assert!(md.contains("- Spa"));
    }

    #[test]
    fn test_postprocess_normalizes() {
        assert_eq!(postprocess("  line\r\ntwo  "), "line\ntwo");
        // NFC: decomposed é collapses to the composed form.
        assert_eq!(postprocess("Cafe\u{0301}"), "Caf\u{00e9}");
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let html = "<h1>Hotel</h1><ul><li>Pool</li></ul><a href='/x'>More</a>";
        let a = convert_to_markdown(html).unwrap();
        let b = convert_to_markdown(html).unwrap();
        assert_eq!(a, b);
    }
}
