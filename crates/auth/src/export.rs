//! Audit log export formats.

use core::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::audit::AuditEntry;

/// Header row of the CSV export.
pub const CSV_HEADER: &str = "Timestamp,Event,User ID,User Role,Path,Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl core::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export format '{0}' (expected json or csv)")]
    UnsupportedFormat(String),

    #[error("export serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Render `entries` in `format`.
pub fn render(entries: &[AuditEntry], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        ExportFormat::Csv => render_csv(entries),
    }
}

fn render_csv(entries: &[AuditEntry]) -> Result<String, ExportError> {
    let mut out = String::from(CSV_HEADER);

    for entry in entries {
        let data = serde_json::to_string(&entry.data)?;
        let timestamp = entry.timestamp.to_rfc3339();
        let fields = [
            timestamp.as_str(),
            entry.event.as_str(),
            entry.user_id.as_str(),
            entry.user_role.as_str(),
            entry.path.as_str(),
            data.as_str(),
        ];

        out.push('\n');
        for (idx, field) in fields.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            push_csv_field(&mut out, field);
        }
    }

    Ok(out)
}

/// Append `field`, quoting it when it holds a delimiter, quote or line break.
fn push_csv_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}
