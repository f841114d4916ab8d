#![allow(dead_code)]

use proptest::prelude::*;

/// Reason names: letters only, so they never parse as an id
pub fn reason_name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z ]{0,23}"
}

pub fn reason_id_strategy() -> impl Strategy<Value = i32> {
    1i32..10_000
}

/// `name` with the case of each character flipped where `flips` says so
pub fn recase(name: &str, flips: &[bool]) -> String {
    name.chars()
        .zip(flips.iter().cycle())
        .map(|(c, flip)| {
            if *flip {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}
