//! Two-section delimited text format for invoice import/export.
//!
//! FORMAT
//! ======
//! A `Field,Value` header block, one blank line, then a fixed five-column
//! items table. Values are always written quoted with embedded quotes
//! doubled. Reading is quote-aware across line breaks so multi-line
//! addresses survive a round trip.

use crate::{DocumentSnapshot, LineItem};

pub const FIELD_HEADER: [&str; 2] = ["Field", "Value"];
pub const ITEMS_HEADER: [&str; 5] = ["Quantity", "Unit", "Description", "Price", "Total"];

const INVOICE_DATE: &str = "Invoice Date";
const INVOICE_NUMBER: &str = "Invoice Number";
const SOLD_TO: &str = "Sold To";
const CONSIGNED_TO: &str = "Consigned To";

/// Error returned by [`decode_document`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A quoted field was still open at end of input.
    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },
}

/// Encode a snapshot into the delimited text format.
#[must_use]
pub fn encode_document(doc: &DocumentSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&FIELD_HEADER.join(","));
    out.push('\n');

    for (label, value) in [
        (INVOICE_DATE, &doc.invoice_date),
        (INVOICE_NUMBER, &doc.invoice_number),
        (SOLD_TO, &doc.sold_to),
        (CONSIGNED_TO, &doc.consigned_to),
    ] {
        out.push_str(label);
        out.push(',');
        push_quoted(&mut out, value);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&ITEMS_HEADER.join(","));
    out.push('\n');

    for item in &doc.items {
        let columns = [&item.quantity, &item.unit, &item.description, &item.price, &item.total];
        for (idx, value) in columns.into_iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            push_quoted(&mut out, value);
        }
        out.push('\n');
    }

    out
}

/// Decode delimited text into a snapshot.
///
/// Unknown header fields are ignored and item rows with no user-entered
/// column are skipped. Row totals are taken as written; callers that need
/// recomputed totals do that on the live document. `grand_total` is left
/// empty since the format does not carry it.
///
/// # Errors
///
/// Returns [`CodecError::UnterminatedQuote`] when a quoted field never
/// closes.
pub fn decode_document(text: &str) -> Result<DocumentSnapshot, CodecError> {
    let mut doc = DocumentSnapshot::default();
    let mut in_items = false;

    for record in split_records(text)? {
        if record.is_empty() {
            in_items = true;
            continue;
        }
        if matches_header(&record, &ITEMS_HEADER) {
            in_items = true;
            continue;
        }

        if !in_items {
            if matches_header(&record, &FIELD_HEADER) {
                continue;
            }
            apply_header_field(&mut doc, record);
            continue;
        }

        let mut columns = record.into_iter();
        let item = LineItem {
            quantity: columns.next().unwrap_or_default(),
            unit: columns.next().unwrap_or_default(),
            description: columns.next().unwrap_or_default(),
            price: columns.next().unwrap_or_default(),
            total: columns.next().unwrap_or_default(),
        };
        if item.has_content() {
            doc.items.push(item);
        }
    }

    Ok(doc)
}

/// Download file name for an exported snapshot: `<invoice number>.csv`.
#[must_use]
pub fn export_file_name(doc: &DocumentSnapshot) -> String {
    let number = doc.invoice_number.trim();
    if number.is_empty() {
        return "invoice.csv".to_owned();
    }
    let safe: String = number
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!("{safe}.csv")
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

fn matches_header(record: &[String], header: &[&str]) -> bool {
    record.len() == header.len() && record.iter().zip(header).all(|(field, want)| field.trim() == *want)
}

fn apply_header_field(doc: &mut DocumentSnapshot, record: Vec<String>) {
    let mut columns = record.into_iter();
    let Some(label) = columns.next() else {
        return;
    };
    let value = columns.next().unwrap_or_default();

    match label.trim() {
        INVOICE_DATE => doc.invoice_date = value,
        INVOICE_NUMBER => doc.invoice_number = value,
        SOLD_TO => doc.sold_to = value,
        CONSIGNED_TO => doc.consigned_to = value,
        _ => {}
    }
}

/// Split text into records of fields. A blank line yields an empty record.
fn split_records(text: &str) -> Result<Vec<Vec<String>>, CodecError> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    // Set once the record has a separator or quote, so `""` is not blank.
    let mut structured = false;
    let mut line = 1;
    let mut quote_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => in_quotes = false,
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    line += 1;
                    current.push('\n');
                }
                _ => current.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                structured = true;
                quote_line = line;
            }
            ',' => {
                fields.push(std::mem::take(&mut current));
                structured = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                line += 1;
                finish_record(&mut records, &mut fields, &mut current, structured);
                structured = false;
            }
            _ => current.push(ch),
        }
    }

    if in_quotes {
        return Err(CodecError::UnterminatedQuote { line: quote_line });
    }
    if structured || !current.is_empty() {
        finish_record(&mut records, &mut fields, &mut current, structured);
    }

    Ok(records)
}

fn finish_record(records: &mut Vec<Vec<String>>, fields: &mut Vec<String>, current: &mut String, structured: bool) {
    if !structured && current.trim().is_empty() {
        current.clear();
        records.push(Vec::new());
        return;
    }
    fields.push(std::mem::take(current));
    records.push(std::mem::take(fields));
}

#[cfg(test)]
#[path = "text_test.rs"]
mod tests;
