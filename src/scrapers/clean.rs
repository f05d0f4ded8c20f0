//! In-page DOM canonicalization.
//!
//! Runs inside the browser on the loaded document and returns a cleaned,
//! checksum-stable HTML serialization. Volatile chrome is only stripped on
//! sub-pages: entry pages often keep hero content inside header-classed
//! wrappers.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use regex::Regex;

/// Cleanup function evaluated as `(CLEANUP_JS)(depth)`.
///
/// Order matters: node removal, chrome removal (depth > 0), style
/// stripping, URL absolutization, empty-node pruning, text-node merging.
const CLEANUP_JS: &str = r#"
(function (depth) {
    const AD_TOKENS = ['ad', 'ads', 'advertisement'];

    const tokens = (value) =>
        String(value || '').toLowerCase().split(/[^a-z0-9]+/).filter(Boolean);

    const isAdScoped = (el) => {
        const parts = tokens(el.id)
            .concat(tokens(typeof el.className === 'string' ? el.className : ''))
            .concat(tokens(el.getAttribute && el.getAttribute('role')));
        return parts.some((t) => AD_TOKENS.includes(t));
    };

    // 1. Remove non-content nodes, ad containers, reCAPTCHA, map residue.
    document
        .querySelectorAll('script, style, noscript, iframe, frame, svg, figure')
        .forEach((el) => el.remove());
    Array.from(document.querySelectorAll('*')).forEach((el) => {
        if (isAdScoped(el)) el.remove();
    });
    document
        .querySelectorAll('.g-recaptcha, #recaptcha, [class*="grecaptcha"], [id*="recaptcha"]')
        .forEach((el) => el.remove());
    document
        .querySelectorAll('[class^="H_"], [class*=" H_"]')
        .forEach((el) => el.remove());

    // 2. Navigational chrome survives only on the entry page.
    if (depth > 0) {
        const CHROME = /(nav|header|footer|breadcrumb)/i;
        Array.from(document.querySelectorAll('*')).forEach((el) => {
            const cls = typeof el.className === 'string' ? el.className : '';
            const role = (el.getAttribute && el.getAttribute('role')) || '';
            if (
                CHROME.test(el.tagName) ||
                CHROME.test(cls) ||
                CHROME.test(el.id) ||
                CHROME.test(role)
            ) {
                el.remove();
            }
        });
    }

    // 3. Inline styles are volatile across renders.
    document.querySelectorAll('[style]').forEach((el) => el.removeAttribute('style'));

    // 4. Absolutize href/src against the document URL.
    const absolutize = (el, name) => {
        const value = el.getAttribute(name);
        if (!value) return;
        try {
            el.setAttribute(name, new URL(value, document.baseURI).href);
        } catch (e) {
            // leave unparseable values alone
        }
    };
    document.querySelectorAll('[href]').forEach((el) => absolutize(el, 'href'));
    document.querySelectorAll('[src]').forEach((el) => absolutize(el, 'src'));

    // 5. Drop structurally empty p/div/span until a fixpoint.
    let removed = true;
    while (removed) {
        removed = false;
        document.querySelectorAll('p, div, span').forEach((el) => {
            if (el.childElementCount === 0 && !(el.textContent || '').trim()) {
                el.remove();
                removed = true;
            }
        });
    }

    // 6. Merge adjacent text nodes so equivalent DOMs serialize identically.
    const mergeText = (node) => {
        const name = node.nodeName;
        if (name === 'PRE' || name === 'CODE') return;
        let child = node.firstChild;
        while (child) {
            if (child.nodeType === Node.TEXT_NODE) {
                while (child.nextSibling && child.nextSibling.nodeType === Node.TEXT_NODE) {
                    child.textContent += child.nextSibling.textContent;
                    node.removeChild(child.nextSibling);
                }
            } else if (child.nodeType === Node.ELEMENT_NODE) {
                mergeText(child);
            }
            child = child.nextSibling;
        }
    };
    mergeText(document.documentElement);

    return document.documentElement.outerHTML;
})
"#;

/// Run the canonicalization script and collapse inter-tag whitespace.
pub async fn clean_dom(page: &Page, depth: u32) -> Result<String> {
    let script = format!("({})({})", CLEANUP_JS.trim(), depth);
    let html: String = page
        .evaluate(script)
        .await
        .context("DOM cleanup script failed")?
        .into_value()
        .context("DOM cleanup returned non-string")?;
    Ok(collapse_intertag_whitespace(&html))
}

/// Collapse `>\s+<` runs so formatting-only differences cannot perturb the
/// canonical HTML.
pub fn collapse_intertag_whitespace(html: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r">\s+<").unwrap());
    re.replace_all(html, "><").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_intertag_whitespace() {
        assert_eq!(
            collapse_intertag_whitespace("<div>\n  <p>hi</p>\n</div>"),
            "<div><p>hi</p></div>"
        );
        // Whitespace inside text content is untouched.
        assert_eq!(
            collapse_intertag_whitespace("<p>two  words</p>"),
            "<p>two  words</p>"
        );
        assert_eq!(collapse_intertag_whitespace(""), "");
    }
}
