//! # Configuration
//!
//! Knobs that change how a document is read and how amounts are printed.
//!
//! Every field carries a serde default, so a partial TOML table such as
//! ```toml
//! [parsing]
//! exclusion_marker = "*"
//! ```
//! deserializes into a complete [`SplitConfig`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Top-level configuration for the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitConfig {
    #[serde(default)]
    pub parsing: ParseOptions,

    #[serde(default)]
    pub format: NumberFormat,
}

impl SplitConfig {
    /// Checks that the options are consistent with each other.
    pub fn validate(&self) -> CoreResult<()> {
        self.parsing.validate()?;
        self.format.validate()?;

        if self.format.decimal_separator == self.parsing.exclusion_marker
            || self.format.thousands_separator == Some(self.parsing.exclusion_marker)
        {
            return Err(CoreError::InvalidConfig(format!(
                "exclusion marker '{}' collides with a number separator",
                self.parsing.exclusion_marker
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Parse Options
// =============================================================================

/// How input text is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParseOptions {
    /// Character that marks a participant as excluded from default splits.
    #[serde(default = "default_exclusion_marker")]
    pub exclusion_marker: char,

    /// Forget the current payer when a blank line is read.
    ///
    /// Off by default: amount lines after a blank line keep belonging to the
    /// last header.
    #[serde(default)]
    pub reset_payer_on_blank_line: bool,
}

fn default_exclusion_marker() -> char {
    '!'
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            exclusion_marker: default_exclusion_marker(),
            reset_payer_on_blank_line: false,
        }
    }
}

impl ParseOptions {
    pub fn validate(&self) -> CoreResult<()> {
        let marker = self.exclusion_marker;
        // Markers that could be part of a name, an amount or the grammar would
        // change how lines classify.
        if marker.is_alphanumeric()
            || marker.is_whitespace()
            || matches!(marker, '%' | '>' | '-' | ',' | '.')
        {
            return Err(CoreError::InvalidConfig(format!(
                "'{}' cannot be used as the exclusion marker",
                marker
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Number Format
// =============================================================================

/// How amounts are rendered in reports and formatted documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NumberFormat {
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,

    /// `None` disables digit grouping.
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: Option<char>,
}

fn default_decimal_separator() -> char {
    '.'
}

fn default_thousands_separator() -> Option<char> {
    Some(',')
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            decimal_separator: default_decimal_separator(),
            thousands_separator: default_thousands_separator(),
        }
    }
}

impl NumberFormat {
    /// `1.234,56` style.
    pub fn european() -> Self {
        NumberFormat {
            decimal_separator: ',',
            thousands_separator: Some('.'),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !matches!(self.decimal_separator, '.' | ',') {
            return Err(CoreError::InvalidConfig(format!(
                "decimal separator must be '.' or ',', got '{}'",
                self.decimal_separator
            )));
        }

        match self.thousands_separator {
            Some(sep) if sep == self.decimal_separator => Err(CoreError::InvalidConfig(
                "thousands separator must differ from the decimal separator".to_string(),
            )),
            Some(sep) if sep.is_ascii_digit() => Err(CoreError::InvalidConfig(format!(
                "'{}' cannot be used as a thousands separator",
                sep
            ))),
            _ => Ok(()),
        }
    }
}
