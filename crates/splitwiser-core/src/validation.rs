//! # Validation Module
//!
//! Whole-document checks that run before anything is allocated.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Passes                                  │
//! │                                                                         │
//! │  Pass 1: Headers                                                        │
//! │  ├── Parse every person header                                          │
//! │  └── Same base name (case-insensitive) → DuplicateName                  │
//! │      The duplicate is dropped so it cannot cause ambiguity later        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Pass 2: References                                                     │
//! │  ├── Expense / fee participant lists                                    │
//! │  └── Settlement targets                                                 │
//! │      Ambiguous → AmbiguousReference, no match → PersonNotFound          │
//! │                                                                         │
//! │  Malformed lines are not reported; the parser skips them.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use splitwiser_core::config::ParseOptions;
//! use splitwiser_core::validation::validate_document;
//!
//! let warnings = validate_document("John\nJane\n50 Dinner - J", &ParseOptions::default());
//! assert_eq!(warnings.len(), 1);
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::config::ParseOptions;
use crate::error::{ValidationError, ValidationWarning};
use crate::person::Participant;
use crate::reference::{resolve, Resolution};
use crate::transaction::{classify_line, LineShape};

/// Runs both validation passes and returns every warning in line order
/// (duplicate names first, then references).
pub fn validate_document(text: &str, options: &ParseOptions) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let active = collect_participants(text, options, Some(&mut warnings));

    for line in text.lines().map(str::trim) {
        match classify_line(line) {
            LineShape::Fee { body, .. } | LineShape::Expense { body, .. } => {
                for reference in body.references {
                    check_reference(line, reference, &active, &mut warnings);
                }
            }
            LineShape::Settlement { target, .. } => {
                check_reference(line, target, &active, &mut warnings);
            }
            LineShape::Blank | LineShape::Header | LineShape::Unrecognized => {}
        }
    }

    debug!(warnings = warnings.len(), "document validated");
    warnings
}

/// Collects header participants in declaration order, skipping duplicates.
///
/// When `warnings` is given, each skipped duplicate is reported there.
pub(crate) fn collect_participants(
    text: &str,
    options: &ParseOptions,
    mut warnings: Option<&mut Vec<ValidationWarning>>,
) -> Vec<Participant> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut participants: Vec<Participant> = Vec::new();

    for line in text.lines().map(str::trim) {
        if classify_line(line) != LineShape::Header {
            continue;
        }

        let participant = Participant::parse(line, options);
        if let Some(existing) = seen.get(&participant.duplicate_key()) {
            debug!(line, existing = %existing, "duplicate participant skipped");
            if let Some(warnings) = warnings.as_deref_mut() {
                warnings.push(ValidationWarning::new(
                    line,
                    ValidationError::DuplicateName {
                        name: participant.display_name.clone(),
                        existing: existing.clone(),
                    },
                ));
            }
            continue;
        }

        seen.insert(participant.duplicate_key(), participant.display_name.clone());
        participants.push(participant);
    }

    participants
}

fn check_reference(
    line: &str,
    reference: &str,
    active: &[Participant],
    warnings: &mut Vec<ValidationWarning>,
) {
    let error = match resolve(reference, active) {
        None | Some(Resolution::Unique(_)) => return,
        Some(Resolution::Ambiguous(candidates)) => ValidationError::AmbiguousReference {
            reference: reference.trim().to_string(),
            candidates: candidates
                .iter()
                .map(|p| p.display_name.clone())
                .collect(),
        },
        Some(Resolution::NotFound) => ValidationError::PersonNotFound {
            reference: reference.trim().to_string(),
        },
    };
    warnings.push(ValidationWarning::new(line, error));
}

// =============================================================================
// Unit Tests
// =============================================================================
