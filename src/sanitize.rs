//! Identifier Sanitizer - Turns arbitrary header text into a column identifier
//!
//! Rules:
//! - lower-case and trim
//! - common separators become `_`
//! - brackets, quotes and a few symbols are dropped
//! - an empty result gets a generated `_col<N>` name
//! - a leading digit gets a `_` prefix
//!
//! Uniqueness across a column set is not enforced.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Characters replaced by an underscore
pub const REPLACED_CHARS: &[char] = &[' ', '/', '.', ':', ';', '|', '-', ',', '#'];

/// Characters removed without replacement
pub const STRIPPED_CHARS: &[char] = &['[', ']', '{', '}', '(', ')', '?', '!', '$', '%', '*', '"'];

/// Upper bound (exclusive) of the numeric suffix on placeholder names
const PLACEHOLDER_RANGE: u32 = 10_000;

/// Source of names for columns whose label sanitizes to nothing
pub trait PlaceholderGenerator {
    fn next_placeholder(&mut self) -> String;
}

/// `_col<N>` with a random `N`; collisions are possible and accepted
pub struct RandomPlaceholders {
    rng: StdRng,
}

impl RandomPlaceholders {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPlaceholders {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderGenerator for RandomPlaceholders {
    fn next_placeholder(&mut self) -> String {
        format!("_col{}", self.rng.gen_range(0..PLACEHOLDER_RANGE))
    }
}

/// `_col0`, `_col1`, ... in order
#[derive(Debug, Default)]
pub struct SequentialPlaceholders {
    next: u32,
}

impl PlaceholderGenerator for SequentialPlaceholders {
    fn next_placeholder(&mut self) -> String {
        let name = format!("_col{}", self.next);
        self.next = (self.next + 1) % PLACEHOLDER_RANGE;
        name
    }
}

/// Make sure a label is usable as an unquoted column identifier
pub fn sanitize_identifier(label: &str, placeholders: &mut dyn PlaceholderGenerator) -> String {
    let lowered = label.to_lowercase();

    let mut ident = String::with_capacity(lowered.len());
    for c in lowered.trim().chars() {
        if REPLACED_CHARS.contains(&c) {
            ident.push('_');
        } else if !STRIPPED_CHARS.contains(&c) {
            ident.push(c);
        }
    }

    if ident.is_empty() {
        return placeholders.next_placeholder();
    }

    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }

    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(label: &str) -> String {
        sanitize_identifier(label, &mut SequentialPlaceholders::default())
    }

    #[test]
    fn test_replaces_separators() {
        assert_eq!(sanitize("A B"), "a_b");
        assert_eq!(sanitize("C/D"), "c_d");
        assert_eq!(sanitize("first.name:last;x|y-z,w#1"), "first_name_last_x_y_z_w_1");
    }

    #[test]
    fn test_strips_brackets_and_symbols() {
        assert_eq!(sanitize("amount ($)"), "amount_");
        assert_eq!(sanitize("[weird]{col}(x)?!%*\"q\""), "weirdcolxq");
    }

    #[test]
    fn test_trims_before_replacing() {
        assert_eq!(sanitize("  Customer Id  "), "customer_id");
    }

    #[test]
    fn test_leading_digit_gets_prefix() {
        assert_eq!(sanitize("2024 total"), "_2024_total");
        assert_eq!(sanitize("(1)"), "_1");
    }

    #[test]
    fn test_empty_label_uses_placeholder() {
        let mut placeholders = SequentialPlaceholders::default();
        assert_eq!(sanitize_identifier("", &mut placeholders), "_col0");
        assert_eq!(sanitize_identifier("  ()  ", &mut placeholders), "_col1");
    }

    #[test]
    fn test_random_placeholder_is_seeded() {
        let a = RandomPlaceholders::with_seed(7).next_placeholder();
        let b = RandomPlaceholders::with_seed(7).next_placeholder();
        assert_eq!(a, b);
        let suffix: u32 = a.trim_start_matches("_col").parse().unwrap();
        assert!(suffix < PLACEHOLDER_RANGE);
    }

    #[test]
    fn test_output_never_has_forbidden_chars_or_leading_digit() {
        let labels = [
            "9 lives", "#", "a.b.c", "  ", "Ünïcode Name", "x[1]", "\"quoted\"", "50% off!", "$$$",
            "0", "-1", "col:1/2",
        ];
        let mut placeholders = RandomPlaceholders::with_seed(1);
        for label in labels {
            let ident = sanitize_identifier(label, &mut placeholders);
            assert!(!ident.is_empty(), "{label:?}");
            assert!(!ident.starts_with(|c: char| c.is_ascii_digit()), "{label:?} -> {ident}");
            assert!(
                !ident.contains(|c: char| REPLACED_CHARS.contains(&c) || STRIPPED_CHARS.contains(&c)),
                "{label:?} -> {ident}"
            );
        }
    }
}
