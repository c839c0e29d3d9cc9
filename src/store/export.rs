//! CSV export of token records.
//!
//! Columns: `User ID,User,API KEY Name,Created At,Expires At`. The secret
//! itself is never exported.

use std::borrow::Cow;
use std::path::Path;

use chrono::SecondsFormat;

use crate::models::token::TokenRecord;
use crate::store::StoreError;

pub const HEADER: [&str; 5] = ["User ID", "User", "API KEY Name", "Created At", "Expires At"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No records existed; only the header row was written.
    Empty,
    /// Number of data rows written (header excluded).
    Written(usize),
}

impl ExportOutcome {
    pub fn rows(&self) -> usize {
        match self {
            ExportOutcome::Empty => 0,
            ExportOutcome::Written(n) => *n,
        }
    }
}

pub async fn write_csv(dest: &Path, records: &[TokenRecord]) -> Result<ExportOutcome, StoreError> {
    tokio::fs::write(dest, render(records)).await?;

    tracing::info!(rows = records.len(), path = %dest.display(), "exported token records");

    Ok(if records.is_empty() {
        ExportOutcome::Empty
    } else {
        ExportOutcome::Written(records.len())
    })
}

pub fn render(records: &[TokenRecord]) -> String {
    let mut out = String::new();
    push_row(&mut out, HEADER);
    for r in records {
        let created = r.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let expires = r
            .expires_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
            .unwrap_or_default();
        push_row(
            &mut out,
            [
                r.user_id.as_str(),
                r.user.as_str(),
                r.api_name.as_str(),
                created.as_str(),
                expires.as_str(),
            ],
        );
    }
    out
}

fn push_row<const N: usize>(out: &mut String, fields: [&str; N]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(field));
    }
    out.push_str("\r\n");
}

/// RFC 4180 quoting: wrap in quotes when needed, double embedded quotes.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
