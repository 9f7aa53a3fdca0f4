//! # Participants
//!
//! A participant is declared by a header line. The header carries the name,
//! an optional share weight and an optional exclusion marker:
//!
//! ```text
//! John            → John, weight 1
//! Bob (3)         → Bob, weight 3
//! Jane 2          → Jane, weight 2
//! Restaurant!     → Restaurant!, weight 1, excluded from default splits
//! ```
//!
//! The raw trimmed header line is the participant's key. Two headers with
//! the same key or the same case-insensitive base name are duplicates.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::ParseOptions;
use crate::number::AMOUNT_PREFIX;

/// A person (or pseudo-person such as a restaurant) that takes part in costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Participant {
    /// Raw trimmed header line; the identity used everywhere else.
    pub key: String,

    /// Base name plus the exclusion marker when excluded.
    pub display_name: String,

    /// Letters and single spaces only; used for duplicate detection.
    pub base_name: String,

    /// Relative weight in proportional splits, at least 1.
    pub share_weight: u32,

    /// Excluded participants are left out of splits with no explicit list.
    pub is_excluded: bool,
}

impl Participant {
    /// Parses a header line.
    ///
    /// Never fails; lines that are not headers should be filtered with
    /// [`is_header`] first.
    ///
    /// ## Example
    /// ```rust
    /// use splitwiser_core::config::ParseOptions;
    /// use splitwiser_core::person::Participant;
    ///
    /// let bob = Participant::parse("Bob (3)", &ParseOptions::default());
    /// assert_eq!(bob.base_name, "Bob");
    /// assert_eq!(bob.share_weight, 3);
    ///
    /// let place = Participant::parse("Restaurant!", &ParseOptions::default());
    /// assert!(place.is_excluded);
    /// assert_eq!(place.display_name, "Restaurant!");
    /// ```
    pub fn parse(line: &str, options: &ParseOptions) -> Participant {
        let key = line.trim();
        let marker = options.exclusion_marker;

        let is_excluded = key.contains(marker);
        let cleaned: String = key.chars().filter(|c| *c != marker).collect();

        let share_weight = first_integer(&cleaned)
            .filter(|w| *w > 0)
            .unwrap_or(1);

        let mut base_name = collapse_whitespace(
            &cleaned
                .chars()
                .filter(|c| c.is_alphabetic() || c.is_whitespace())
                .collect::<String>(),
        );
        if base_name.is_empty() {
            base_name = cleaned
                .chars()
                .filter(|c| !c.is_ascii_digit())
                .collect::<String>()
                .trim()
                .to_string();
        }

        let display_name = if is_excluded {
            format!("{}{}", base_name, marker)
        } else {
            base_name.clone()
        };

        Participant {
            key: key.to_string(),
            display_name,
            base_name,
            share_weight,
            is_excluded,
        }
    }

    /// Display name with the weight appended when it is above 1: `Bob (3)`.
    pub fn label(&self) -> String {
        if self.share_weight > 1 {
            format!("{} ({})", self.display_name, self.share_weight)
        } else {
            self.display_name.clone()
        }
    }

    /// Display name without a trailing exclusion marker, as used in
    /// settlement lines.
    pub fn settlement_name(&self, options: &ParseOptions) -> &str {
        self.display_name
            .strip_suffix(options.exclusion_marker)
            .unwrap_or(&self.display_name)
    }

    /// Lowercased base name used for duplicate detection.
    pub fn duplicate_key(&self) -> String {
        self.base_name.to_lowercase()
    }
}

/// Returns `true` when a trimmed line declares a participant.
///
/// A header starts with a letter and does not start with an amount.
pub fn is_header(line: &str) -> bool {
    let line = line.trim();
    !AMOUNT_PREFIX.is_match(line) && line.chars().next().map_or(false, char::is_alphabetic)
}

fn first_integer(s: &str) -> Option<u32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
