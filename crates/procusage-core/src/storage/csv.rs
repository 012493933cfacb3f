//! Minimal CSV row encoding.
//!
//! Fields are comma separated; a field is wrapped in double quotes when it
//! contains a delimiter, a quote, a backslash or whitespace, and embedded
//! quotes are doubled.

use std::borrow::Cow;

const DELIMITER: char = ',';
const QUOTE: char = '"';

fn needs_quoting(field: &str) -> bool {
    field
        .chars()
        .any(|c| matches!(c, DELIMITER | QUOTE | '\\' | ' ' | '\t' | '\r' | '\n'))
}

/// Encodes a single field.
pub fn encode_field(field: &str) -> Cow<'_, str> {
    if !needs_quoting(field) {
        return Cow::Borrowed(field);
    }

    let mut out = String::with_capacity(field.len() + 2);
    out.push(QUOTE);
    for c in field.chars() {
        if c == QUOTE {
            out.push(QUOTE);
        }
        out.push(c);
    }
    out.push(QUOTE);
    Cow::Owned(out)
}

/// Appends one encoded row, terminated by `\n`, to `out`.
pub fn write_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            out.push(DELIMITER);
        }
        out.push_str(&encode_field(field.as_ref()));
    }
    out.push('\n');
}

/// Splits one encoded row back into fields.
///
/// Only used to read back what [`write_row`] produced.
pub fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\n').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes => {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            QUOTE if current.is_empty() => in_quotes = true,
            DELIMITER if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
