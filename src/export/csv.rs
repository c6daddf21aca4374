//! CSV encoding for exported result sets.
//!
//! Records end with CRLF. A field is quoted when it contains a comma, a
//! double quote, CR or LF; embedded quotes are doubled. NULL becomes an
//! empty field.

use std::borrow::Cow;
use std::path::Path;

use crate::db::QueryResult;
use crate::error::{Result, SqlRunError};

/// Record terminator.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Escapes a single field.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Appends one record, terminator included.
fn push_record<'a>(out: &mut String, fields: impl IntoIterator<Item = Cow<'a, str>>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        out.push_str(&field);
        first = false;
    }
    out.push_str(LINE_TERMINATOR);
}

/// Renders a result set: header of column names, then rows in database order.
pub fn render(result: &QueryResult) -> String {
    let mut out = String::new();

    push_record(&mut out, result.columns.iter().map(|c| escape_field(&c.name)));

    for row in &result.rows {
        push_record(
            &mut out,
            row.iter().map(|value| match value.to_text() {
                Some(text) => Cow::Owned(escape_field(&text).into_owned()),
                None => Cow::Borrowed(""),
            }),
        );
    }

    out
}

/// Writes a result set to `path`, replacing any existing file.
pub async fn write_csv(path: &Path, result: &QueryResult) -> Result<()> {
    tokio::fs::write(path, render(result))
        .await
        .map_err(|e| SqlRunError::io(path, e))
}
