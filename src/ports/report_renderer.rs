//! Report renderer port: turns a report record into a downloadable document.

use std::path::PathBuf;

use crate::domain::ReportRecord;

/// Errors raised while rendering a report.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("report record is empty")]
    EmptyRecord,
}

/// A rendered report artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    /// Where the document was written
    pub path: PathBuf,
    /// Document size in bytes
    pub size_bytes: usize,
}

/// Trait for report rendering.
pub trait ReportRenderer: Send + Sync {
    /// Render one record and return where it was written.
    ///
    /// # Errors
    /// Returns `RenderError` if the document cannot be produced.
    fn render(&self, record: &ReportRecord) -> Result<RenderedReport, RenderError>;
}
