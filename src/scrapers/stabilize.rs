//! DOM stabilization: wait for a dynamically-rendered page to go quiet.
//!
//! Many hotel sites inflate hero sections, carousels, and booking widgets
//! asynchronously; `networkidle` is insufficient and a fixed sleep is
//! wasteful. Instead the page's DOM signature is polled until it has been
//! unchanged for a quiet window, bounded by a hard timeout. Timeout is
//! success, not failure.

use std::time::{Duration, Instant};

use chromiumoxide::Page;
use tracing::{debug, trace};

/// In-page signature: `elementCount|textLength|djb2(normalizedText)`.
///
/// The djb2 hash is local to the browser and used only for equality
/// comparison; it is deliberately distinct from the markdown content
/// checksum.
const SIGNATURE_JS: &str = r#"
(() => {
    const count = document.getElementsByTagName('*').length;
    const text = ((document.body && document.body.innerText) || '').replace(/\s+/g, ' ');
    let hash = 5381;
    for (let i = 0; i < text.length; i++) {
        hash = (((hash << 5) + hash) + text.charCodeAt(i)) >>> 0;
    }
    return count + '|' + text.length + '|' + hash;
})()
"#;

/// Stabilization tuning for one page.
#[derive(Debug, Clone, Copy)]
pub struct StabilizeParams {
    /// Signature must be unchanged for this long.
    pub quiet_ms: u64,
    /// Hard ceiling on the whole wait.
    pub timeout_ms: u64,
    /// Minimum interval between signature recomputations.
    pub min_signature_interval_ms: u64,
}

impl StabilizeParams {
    /// Depth-tuned defaults: entry pages get a longer window because they
    /// carry the heaviest dynamic content.
    pub fn for_depth(depth: u32) -> Self {
        if depth == 0 {
            Self {
                quiet_ms: 6000,
                timeout_ms: 12000,
                min_signature_interval_ms: 400,
            }
        } else {
            Self {
                quiet_ms: 4000,
                timeout_ms: 8000,
                min_signature_interval_ms: 400,
            }
        }
    }
}

/// Block until the DOM signature has been stable for `quiet_ms`, or
/// `timeout_ms` has elapsed. Returns silently in both cases; signature
/// evaluation errors end the wait early (best effort).
pub async fn wait_for_stable_dom(page: &Page, params: StabilizeParams) {
    let start = Instant::now();
    let timeout = Duration::from_millis(params.timeout_ms);
    let quiet = Duration::from_millis(params.quiet_ms);
    let interval = Duration::from_millis(params.min_signature_interval_ms.max(50));

    // Signature state lives here, in the polling loop.
    let mut last_signature: Option<String> = None;
    let mut quiet_since = Instant::now();

    loop {
        if start.elapsed() >= timeout {
            debug!(elapsed_ms = start.elapsed().as_millis() as u64, "stabilization timeout");
            return;
        }

        let signature = match page.evaluate(SIGNATURE_JS.to_string()).await {
            Ok(result) => result.into_value::<String>().ok(),
            Err(e) => {
                debug!("signature evaluation failed: {}", e);
                return;
            }
        };
        let Some(signature) = signature else {
            return;
        };
        trace!(signature = %signature, "dom signature");

        if last_signature.as_deref() != Some(signature.as_str()) {
            last_signature = Some(signature);
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= quiet {
            debug!(
                waited_ms = start.elapsed().as_millis() as u64,
                "dom signature stable"
            );
            return;
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        tokio::time::sleep(interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_tuned_parameters() {
        let entry = StabilizeParams::for_depth(0);
        assert_eq!(entry.quiet_ms, 6000);
        assert_eq!(entry.timeout_ms, 12000);

        let deep = StabilizeParams::for_depth(3);
        assert_eq!(deep.quiet_ms, 4000);
        assert_eq!(deep.timeout_ms, 8000);
        assert_eq!(deep.min_signature_interval_ms, 400);
    }
}
