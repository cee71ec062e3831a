//! Minimal PDF writer for screening reports.
//!
//! Produces a PDF 1.4 document: A4 pages, the base-14 Helvetica fonts with
//! WinAnsi encoding, one text line per report entry. Characters outside
//! Latin-1 (emoji in the risk labels, for instance) cannot be shown by the
//! base fonts and are omitted.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{ReportRecord, REPORT_FILENAME, REPORT_TITLE};
use crate::ports::{RenderError, RenderedReport, ReportRenderer};

const PAGE_WIDTH: f64 = 595.28;
const PAGE_HEIGHT: f64 = 841.89;
const MARGIN: f64 = 56.69;
/// 10 mm
const LINE_HEIGHT: f64 = 28.35;
const TITLE_SIZE: u32 = 16;
const BODY_SIZE: u32 = 12;
const WRAP_COLUMNS: usize = 90;

/// Keep the characters the WinAnsi base fonts can show.
fn latin1(text: &str) -> String {
    text.chars()
        .filter(|&c| (' '..='~').contains(&c) || ('\u{a0}'..='\u{ff}').contains(&c))
        .collect()
}

/// Escape a Latin-1 string as a PDF literal string body.
fn pdf_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            c if u32::from(c) > 0x7e => {
                let _ = write!(out, "\\{:03o}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out
}

fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Body lines of the report, wrapped and reduced to Latin-1.
fn body_lines(record: &ReportRecord) -> Vec<String> {
    record
        .entries()
        .iter()
        .flat_map(|(label, value)| {
            let line = format!("{}: {}", latin1(label).trim(), latin1(value).trim());
            wrap(&line, WRAP_COLUMNS)
        })
        .collect()
}

fn page_stream(title: Option<&str>, lines: &[String]) -> String {
    let mut s = String::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    if let Some(title) = title {
        let _ = writeln!(
            s,
            "BT /F2 {TITLE_SIZE} Tf {MARGIN:.2} {y:.2} Td ({}) Tj ET",
            pdf_literal(title)
        );
        y -= LINE_HEIGHT;
    }
    for line in lines {
        let _ = writeln!(
            s,
            "BT /F1 {BODY_SIZE} Tf {MARGIN:.2} {y:.2} Td ({}) Tj ET",
            pdf_literal(line)
        );
        y -= LINE_HEIGHT;
    }
    s
}

/// Render `record` as a complete PDF document.
#[must_use]
pub fn render_pdf_bytes(record: &ReportRecord) -> Vec<u8> {
    let lines = body_lines(record);

    // The title takes one line on the first page.
    let per_page = ((PAGE_HEIGHT - 2.0 * MARGIN) / LINE_HEIGHT) as usize;
    let mut pages: Vec<String> = Vec::new();
    let first = lines.len().min(per_page - 1);
    pages.push(page_stream(Some(REPORT_TITLE), &lines[..first]));
    for chunk in lines[first..].chunks(per_page) {
        pages.push(page_stream(None, chunk));
    }

    // Objects: 1 catalog, 2 page tree, 3-4 fonts, then (page, content) pairs.
    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 5 + 2 * i).collect();
    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            page_ids
                .iter()
                .map(|id| format!("{id} 0 R"))
                .collect::<Vec<_>>()
                .join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (stream, page_id) in pages.iter().zip(&page_ids) {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
            page_id + 1
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}endstream",
            stream.len()
        ));
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = write!(xref, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

/// Writes `VisionCare_Report.pdf` into a fixed directory.
#[derive(Debug, Clone)]
pub struct PdfReportRenderer {
    output_dir: PathBuf,
}

impl PdfReportRenderer {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the report this renderer writes.
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILENAME)
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, record: &ReportRecord) -> Result<RenderedReport, RenderError> {
        if record.is_empty() {
            return Err(RenderError::EmptyRecord);
        }

        let bytes = render_pdf_bytes(record);
        fs::create_dir_all(&self.output_dir)?;

        // Replace the previous report in one step.
        let path = self.report_path();
        let tmp = self.output_dir.join(format!(".{REPORT_FILENAME}.tmp"));
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &path)?;

        tracing::info!("Report written to {:?} ({} bytes)", path, bytes.len());
        Ok(RenderedReport {
            path,
            size_bytes: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{build_report_record, PatientInput, HIGH_RISK_LABEL, HIGH_RISK_RECOMMENDATION};
    use tempfile::tempdir;

    fn sample_record() -> ReportRecord {
        build_report_record(
            &PatientInput::default(),
            HIGH_RISK_LABEL,
            0.8364,
            HIGH_RISK_RECOMMENDATION,
        )
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn test_document_structure() {
        let bytes = render_pdf_bytes(&sample_record());
        let doc = text(&bytes);

        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(doc.trim_end().ends_with("%%EOF"));
        assert!(doc.contains("(VisionCare AI Report) Tj"));
        assert!(doc.contains("(Age: 35) Tj"));
        assert!(doc.contains("(Confidence: 83.64%) Tj"));
        assert!(doc.contains("/Count 1"));
    }

    #[test]
    fn test_startxref_points_at_xref_table() {
        let bytes = render_pdf_bytes(&sample_record());
        let doc = text(&bytes);

        let tail = doc.rsplit("startxref\n").next().expect("startxref");
        let offset: usize = tail.lines().next().expect("offset").parse().expect("number");
        assert!(bytes[offset..].starts_with(b"xref\n"));
    }

    #[test]
    fn test_emoji_dropped_from_labels() {
        let doc = text(&render_pdf_bytes(&sample_record()));
        assert!(doc.contains("(Prediction: High Risk of Vision Issue) Tj"));
        assert!(doc.contains("(Recommendation: Immediate consultation"));
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(pdf_literal("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(pdf_literal("caf\u{e9}"), "caf\\351");
        assert_eq!(latin1("✅ Low Risk"), " Low Risk");
    }

    #[test]
    fn test_wrap_long_lines() {
        let line = "word ".repeat(40);
        let wrapped = wrap(&line, 20);
        assert!(wrapped.len() > 1);
        assert!(wrapped.iter().all(|l| l.chars().count() <= 20));
        assert_eq!(wrapped.join(" "), line.trim_end());
    }

    #[test]
    fn test_long_record_spills_onto_second_page() {
        let mut record = sample_record();
        for _ in 0..3 {
            let extra = build_report_record(&PatientInput::default(), "x", 0.1, "y");
            record = ReportRecord::from_entries(
                record.entries().iter().chain(extra.entries()).cloned(),
            );
        }
        let doc = text(&render_pdf_bytes(&record));
        assert!(doc.contains("/Count 4"));
    }

    #[test]
    fn test_renderer_writes_file() {
        let temp = tempdir().expect("tempdir");
        let renderer = PdfReportRenderer::new(temp.path().join("reports"));

        let rendered = renderer.render(&sample_record()).expect("render");
        assert_eq!(rendered.path, temp.path().join("reports").join(REPORT_FILENAME));
        let on_disk = std::fs::read(&rendered.path).expect("read");
        assert_eq!(on_disk.len(), rendered.size_bytes);

        // Second render overwrites.
        renderer.render(&sample_record()).expect("render again");
        assert_eq!(std::fs::read_dir(temp.path().join("reports")).expect("dir").count(), 1);
    }

    #[test]
    fn test_empty_record_rejected() {
        let temp = tempdir().expect("tempdir");
        let renderer = PdfReportRenderer::new(temp.path());
        assert!(matches!(
            renderer.render(&ReportRecord::default()),
            Err(RenderError::EmptyRecord)
        ));
    }
}
