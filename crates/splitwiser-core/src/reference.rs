//! # Reference Resolution
//!
//! Expense lists and settlement targets name people by any case-insensitive
//! prefix of their header line or display name, so `Jo` can stand for
//! `John Smith (2)`. A prefix that fits more than one person is ambiguous.

use crate::person::Participant;

/// Outcome of resolving one non-blank reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'p> {
    Unique(&'p Participant),
    /// Every matching participant, in declaration order.
    Ambiguous(Vec<&'p Participant>),
    NotFound,
}

impl<'p> Resolution<'p> {
    /// The participant, when exactly one matched.
    pub fn unique(&self) -> Option<&'p Participant> {
        match self {
            Resolution::Unique(p) => Some(p),
            _ => None,
        }
    }
}

/// Resolves `reference` against `candidates`.
///
/// Returns `None` for a blank reference; blank references are optional
/// fields, not errors.
///
/// ## Example
/// ```rust
/// use splitwiser_core::config::ParseOptions;
/// use splitwiser_core::person::Participant;
/// use splitwiser_core::reference::{resolve, Resolution};
///
/// let options = ParseOptions::default();
/// let people = vec![
///     Participant::parse("John Smith", &options),
///     Participant::parse("Jane Smith", &options),
/// ];
///
/// assert!(matches!(resolve("jo", &people), Some(Resolution::Unique(p)) if p.key == "John Smith"));
/// assert!(matches!(resolve("J", &people), Some(Resolution::Ambiguous(v)) if v.len() == 2));
/// assert_eq!(resolve("Bob", &people), Some(Resolution::NotFound));
/// assert_eq!(resolve("  ", &people), None);
/// ```
pub fn resolve<'p, I>(reference: &str, candidates: I) -> Option<Resolution<'p>>
where
    I: IntoIterator<Item = &'p Participant>,
{
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    let needle = reference.to_lowercase();

    let mut matches: Vec<&'p Participant> = Vec::new();
    for candidate in candidates {
        let hit = candidate.key == reference
            || candidate.key.to_lowercase().starts_with(&needle)
            || candidate.display_name.to_lowercase().starts_with(&needle);
        if hit && !matches.iter().any(|m| m.key == candidate.key) {
            matches.push(candidate);
        }
    }

    Some(match matches.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Unique(matches[0]),
        _ => Resolution::Ambiguous(matches),
    })
}
