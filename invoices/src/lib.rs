//! Invoice snapshot model and delimited-text codec.
//!
//! This crate owns the plain-data shape of an invoice (`DocumentSnapshot`)
//! shared by draft storage, auto-save and file import/export. Every value is
//! kept as the display string the user typed, never as a parsed number, so a
//! snapshot written and read back reproduces the form exactly.

mod text;

pub use text::{CodecError, FIELD_HEADER, ITEMS_HEADER, decode_document, encode_document, export_file_name};

use std::fmt;

use serde::{Deserialize, Serialize};

/// One row of the invoice items table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItem {
    pub quantity: String,
    pub unit: String,
    pub description: String,
    pub price: String,
    /// Rendered row total, e.g. `"$62.50"`.
    pub total: String,
}

impl LineItem {
    /// True when any user-entered column has content. `total` is derived and
    /// does not count.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !(self.quantity.is_empty() && self.unit.is_empty() && self.description.is_empty() && self.price.is_empty())
    }
}

/// Serializable representation of the invoice header fields and line items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentSnapshot {
    pub invoice_date: String,
    pub invoice_number: String,
    pub sold_to: String,
    pub consigned_to: String,
    pub items: Vec<LineItem>,
    pub grand_total: String,
}

impl DocumentSnapshot {
    /// Canonical JSON text used for content-equality checks between saves.
    ///
    /// # Errors
    ///
    /// Propagates the serializer error; string-only structs do not fail in
    /// practice.
    pub fn canonical_encoding(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Check the snapshot against the minimum a sendable invoice needs.
    #[must_use]
    pub fn validate(&self) -> Validation {
        let mut issues = Vec::new();
        if self.invoice_number.is_empty() {
            issues.push(ValidationIssue::MissingInvoiceNumber);
        }
        if self.items.is_empty() {
            issues.push(ValidationIssue::NoItems);
        }
        Validation { issues }
    }
}

/// A single reason a snapshot is not yet a complete invoice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingInvoiceNumber,
    NoItems,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInvoiceNumber => f.write_str("Invoice number is required"),
            Self::NoItems => f.write_str("At least one invoice item is required"),
        }
    }
}

/// Result of [`DocumentSnapshot::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validation {
    pub issues: Vec<ValidationIssue>,
}

impl Validation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Parse the leading numeric part of a display amount.
///
/// Accepts an optional `$` prefix and ignores trailing text, so `"$12.50"`
/// and `"12.5 kg"` both read as `12.5`. Anything without a numeric prefix
/// reads as `0.0`.
#[must_use]
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed);

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '-' | '+' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }

    if !seen_digit {
        return 0.0;
    }
    trimmed[..end].trim_end_matches('.').parse::<f64>().unwrap_or(0.0)
}

/// Render an amount the way the totals column displays it: `$1234.50`.
#[must_use]
pub fn format_amount(value: f64) -> String {
    format!("${value:.2}")
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
