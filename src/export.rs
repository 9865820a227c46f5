//! Export of extraction results to flat files.
//!
//! Two formats are supported: plain text with one code per line, and a
//! comma-separated file with a `Code` header. Neither format escapes anything:
//! codes are assumed to contain no newlines or commas.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Header line of the delimited format.
pub const DELIMITED_HEADER: &str = "Code";

/// Base name shared by both export files.
pub const DEFAULT_FILE_STEM: &str = "extracted_codes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One code per line
    Plain,
    /// `Code` header, then one code per line
    Delimited,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Plain, ExportFormat::Delimited];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Plain => "txt",
            ExportFormat::Delimited => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Plain => "text/plain",
            ExportFormat::Delimited => "text/csv",
        }
    }

    /// `extracted_codes.txt` or `extracted_codes.csv`.
    pub fn default_file_name(&self) -> String {
        format!("{}.{}", DEFAULT_FILE_STEM, self.extension())
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Plain => write!(f, "plain"),
            ExportFormat::Delimited => write!(f, "delimited"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "txt" => Ok(ExportFormat::Plain),
            "delimited" | "csv" => Ok(ExportFormat::Delimited),
            _ => Err(format!("Invalid export format: {}", s)),
        }
    }
}

/// Serialized export, ready to hand to whatever performs the download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn file_name(&self) -> String {
        self.format.default_file_name()
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Write the artifact into `dir` under its default file name.
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        tokio::fs::write(&path, &self.bytes).await?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), format = %self.format, "Wrote export");
        Ok(path)
    }
}

/// Serialize `codes` in `format`.
///
/// Returns `None` for an empty list: there is nothing to download. Output is a
/// pure function of the inputs. Lines are joined with `\n` and there is no
/// trailing newline.
pub fn export_as<S: AsRef<str>>(codes: &[S], format: ExportFormat) -> Option<ExportArtifact> {
    if codes.is_empty() {
        return None;
    }

    let body = join_lines(codes);
    let text = match format {
        ExportFormat::Plain => body,
        ExportFormat::Delimited => format!("{}\n{}", DELIMITED_HEADER, body),
    };

    Some(ExportArtifact {
        format,
        bytes: text.into_bytes(),
    })
}

fn join_lines<S: AsRef<str>>(codes: &[S]) -> String {
    codes
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}
