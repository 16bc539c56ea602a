// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Markup stripping for user supplied text.
//!
//! Submitted fields end up inside an HTML email body, so everything that looks
//! like a tag is removed before the text leaves the handler. Script and style
//! elements lose their content as well. Line breaks and paragraph ends become
//! newlines so the remaining words do not run together.

use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    script: Regex,
    style: Regex,
    line_break: Regex,
    tag: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        script: build(r"(?is)<script\b[^>]*>.*?(</script\s*>|$)"),
        style: build(r"(?is)<style\b[^>]*>.*?(</style\s*>|$)"),
        line_break: build(r"(?i)<br\s*/?>|</br\s*>|</p\s*>"),
        tag: build(r"(?s)<[^>]*>"),
    })
}

fn build(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

/// Strip markup from `input`, leaving plain text.
pub fn strip_html(input: &str) -> String {
    let text = if input.contains(['<', '>']) {
        let p = patterns();
        let without_script = p.script.replace_all(input, "");
        let without_style = p.style.replace_all(&without_script, "");
        let with_breaks = p.line_break.replace_all(&without_style, "\n");
        p.tag.replace_all(&with_breaks, "").into_owned()
    } else {
        input.to_string()
    };

    // Single pass, so `&amp;lt;` stays a literal `&lt;`.
    let mut text = html_escape::decode_html_entities(&text).into_owned();

    // Decoded entities must not smuggle markup back in.
    text.retain(|c| c != '<' && c != '>');
    text
}
