// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of `s` in terminal columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Hard-wraps `s` so no line exceeds `width` display columns.
///
/// Breaks fall between characters regardless of word boundaries. Existing
/// newlines are kept and restart the column count. A character wider than
/// `width` still gets a line of its own.
pub fn wrap(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut current = 0;
    for c in s.chars() {
        if c == '\n' {
            out.push(c);
            current = 0;
            continue;
        }
        let cw = c.width().unwrap_or(0);
        if current > 0 && current + cw > width {
            out.push('\n');
            current = 0;
        }
        out.push(c);
        current += cw;
    }
    out
}
