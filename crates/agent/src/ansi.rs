// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ANSI escape handling for detector input.
//!
//! Detectors never see raw terminal bytes. Before classification the tail
//! window is normalized here: cursor-forward sequences become literal
//! spaces (TUIs use them for alignment, and the spacing is often what a
//! pattern anchors on), every other escape sequence is dropped.

/// Convert a raw byte window into the stripped text detectors consume.
///
/// Cursor-forward (`CSI n C`) becomes `n` spaces; all other CSI, OSC, and
/// two-byte escapes are removed. Invalid UTF-8 is replaced, carriage
/// returns are dropped, and other C0 controls except `\n` and `\t` are
/// discarded.
pub fn strip_for_detection(raw: &[u8]) -> String {
    strip_ansi(&cursor_forward_to_spaces(&String::from_utf8_lossy(raw)))
}

/// Replace `ESC [ n C` (cursor forward) with `n` spaces.
///
/// The count defaults to 1 and is clamped so a garbled parameter cannot
/// balloon the output.
pub fn cursor_forward_to_spaces(input: &str) -> String {
    const MAX_FORWARD: usize = 512;

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        if chars.peek() != Some(&'[') {
            out.push(c);
            continue;
        }
        // Lookahead for a digits-then-'C' sequence; anything else is
        // re-emitted untouched for strip_ansi to deal with.
        let mut params = String::new();
        let mut probe = chars.clone();
        probe.next(); // consume '['
        let mut matched = false;
        for p in probe.by_ref() {
            match p {
                '0'..='9' => params.push(p),
                'C' => {
                    matched = true;
                    break;
                }
                _ => break,
            }
        }
        if matched {
            let n = params.parse::<usize>().unwrap_or(1).clamp(1, MAX_FORWARD);
            for _ in 0..n {
                out.push(' ');
            }
            chars = probe;
        } else {
            out.push(c);
        }
    }

    out
}

/// Strip ANSI escape sequences and non-printing controls from text.
///
/// Handles CSI (`ESC [ … final`), OSC (`ESC ] … BEL` or `ESC ] … ST`),
/// and single-character escapes. `\n` and `\t` survive; `\r` and other C0
/// controls do not.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => match chars.next() {
                // CSI: parameters and intermediates until a final byte @..~
                Some('[') => {
                    for f in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&f) {
                            break;
                        }
                    }
                }
                // OSC: consume until BEL or ESC \ (ST)
                Some(']') => {
                    let mut prev_esc = false;
                    for f in chars.by_ref() {
                        if f == '\u{7}' || (prev_esc && f == '\\') {
                            break;
                        }
                        prev_esc = f == '\u{1b}';
                    }
                }
                // Two-character escapes (charset selection, keypad modes)
                Some('(') | Some(')') => {
                    let _ = chars.next();
                }
                Some(_) | None => {}
            },
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
#[path = "ansi_tests.rs"]
mod tests;
