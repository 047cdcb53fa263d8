//! Page-side probe scripts
//!
//! Each probe resolves a CSS selector and, only when exactly one element
//! matches, computes a value from it. The result always comes back as a JSON
//! string `{"count": n, "value": ...}` so the caller can tell missing,
//! ambiguous and resolved locators apart in a single round trip.

use serde::Deserialize;

/// What to compute from the resolved element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// `{displayed, enabled}`
    State,
    /// Trimmed visible text
    Text,
    /// Scroll into view, then the bounding rect
    Rect,
    /// Focus, caret at end; true when the element took focus
    Focus,
}

impl Probe {
    fn body(&self) -> &'static str {
        match self {
            Probe::State => {
                "(() => { \
                    const s = window.getComputedStyle(el); \
                    const displayed = el.getClientRects().length > 0 \
                        && s.visibility !== 'hidden' && s.display !== 'none' && s.opacity !== '0'; \
                    return { displayed, enabled: !el.disabled }; \
                })()"
            }
            Probe::Text => "((el.innerText ?? el.textContent) || '').trim()",
            Probe::Rect => {
                "(() => { \
                    el.scrollIntoView({ block: 'center', inline: 'center' }); \
                    const r = el.getBoundingClientRect(); \
                    return { x: r.left, y: r.top, width: r.width, height: r.height }; \
                })()"
            }
            Probe::Focus => {
                "(() => { \
                    el.focus(); \
                    if (typeof el.value === 'string' && typeof el.setSelectionRange === 'function') { \
                        try { el.setSelectionRange(el.value.length, el.value.length); } catch (e) {} \
                    } \
                    return document.activeElement === el; \
                })()"
            }
        }
    }
}

/// Decoded probe result
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeResult<T> {
    pub count: usize,
    #[serde(default = "Option::default")]
    pub value: Option<T>,
}

/// Element rectangle in CSS pixels, relative to the viewport
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Centre point
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Zero-area rects cannot receive clicks
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Quote a string as a JavaScript string literal
pub fn js_string(s: &str) -> String {
    // JSON string literals are valid JavaScript string literals
    serde_json::Value::String(s.to_string()).to_string()
}

/// Expression counting the selector's matches
pub fn count_script(selector: &str) -> String {
    format!("document.querySelectorAll({}).length", js_string(selector))
}

/// Expression running `probe` on the selector's single match
pub fn probe_script(selector: &str, probe: Probe) -> String {
    format!(
        "(() => {{ \
            const nodes = document.querySelectorAll({}); \
            if (nodes.length !== 1) return JSON.stringify({{ count: nodes.length }}); \
            const el = nodes[0]; \
            return JSON.stringify({{ count: 1, value: {} }}); \
        }})()",
        js_string(selector),
        probe.body()
    )
}
