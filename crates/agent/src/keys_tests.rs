// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use yare::parameterized;

use super::*;

#[parameterized(
    enter = { Key::Enter, b"\r" },
    tab = { Key::Tab, b"\t" },
    esc = { Key::Esc, b"\x1b" },
    space = { Key::Space, b" " },
    ctrl_c = { Key::CtrlC, b"\x03" },
)]
fn single_byte_encodings(key: Key, expected: &[u8]) {
    assert_eq!(key.encode(), expected);
}

#[parameterized(
    up = { Key::Up, b"\x1b[A" },
    down = { Key::Down, b"\x1b[B" },
    right = { Key::Right, b"\x1b[C" },
    left = { Key::Left, b"\x1b[D" },
)]
fn arrow_encodings(key: Key, expected: &[u8]) {
    assert_eq!(key.encode(), expected);
}

#[test]
fn sequence_concatenates_in_order() {
    assert_eq!(encode_sequence(&[Key::Down, Key::Down, Key::Enter]), b"\x1b[B\x1b[B\r");
}

#[test]
fn parse_round_trips_every_key() {
    for key in [
        Key::Enter,
        Key::Tab,
        Key::Esc,
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::Space,
        Key::CtrlC,
    ] {
        assert_eq!(Key::parse(key.as_str()), Some(key));
    }
    assert_eq!(Key::parse("f1"), None);
}
