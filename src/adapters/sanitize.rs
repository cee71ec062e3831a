//! Redaction of patient data and secrets from log output.
//!
//! Log lines pass through [`SanitizingMakeWriter`] before they reach the log
//! file or stdout. It rewrites:
//! - screening identifiers (UUIDs)
//! - e-mail addresses
//! - clinical measurements written as `name=value` / `name: value`
//! - signing material (contextual base64/hex secrets, long hex runs)
//!
//! Call sites should still avoid formatting patient fields into messages;
//! this is the fallback for the ones that slip through.
//!
//! Input beyond the writer's byte limit (default 16 KiB, configurable via
//! `AppConfig::sanitize_max_bytes`) is cut off and marked `[TRUNCATED]`.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

/// Default per-line input cap.
pub const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Rules {
    any: RegexSet,
    ordered: Vec<Rule>,
}

static RULES: OnceLock<Rules> = OnceLock::new();

fn rules() -> &'static Rules {
    RULES.get_or_init(|| {
        // Order matters: contextual secrets before the bare hex catch-all.
        let table: [(&str, &str); 5] = [
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-ID]",
            ),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r"(?i)\b(age|blood[_ ]?pressure|bp|screen[_ ]?time|cholesterol|hba1c)\s*[:=]\s*\d+(?:\.\d+)?",
                "$1=[REDACTED]",
            ),
            (
                r"(?i)\b(?:secret|seed|private[_-]?key|signing[_-]?key|signature|sig|token|key)\b\s*[:=]\s*(?:[A-Za-z0-9+/]{32,}={0,2}|[0-9a-fA-F]{16,})",
                "[REDACTED-SECRET]",
            ),
            (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-HEX]"),
        ];

        let any = RegexSet::new(table.iter().map(|(p, _)| *p)).expect("valid regex set");
        let ordered = table
            .iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(pattern).expect("valid regex"),
                replacement,
            })
            .collect();

        Rules { any, ordered }
    })
}

fn clip(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Redact sensitive substrings from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, DEFAULT_SANITIZE_MAX_BYTES)
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let rules = rules();
    let (text, truncated) = clip(input, max_bytes);

    let mut out = text.to_string();
    if rules.any.is_match(text) {
        for idx in rules.any.matches(text).into_iter() {
            let rule = &rules.ordered[idx];
            out = rule.regex.replace_all(&out, rule.replacement).into_owned();
        }
    }
    if truncated {
        out.push_str(" [TRUNCATED]");
    }
    out
}

/// Whether `input` contains anything [`sanitize`] would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (text, _) = clip(input, DEFAULT_SANITIZE_MAX_BYTES);
    rules().any.is_match(text)
}

/// `MakeWriter` wrapper that sanitizes each formatted log line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
    max_bytes: usize,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            max_bytes: DEFAULT_SANITIZE_MAX_BYTES,
        }
    }

    /// Cap each sanitized line at `max_bytes`; zero keeps the default.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        if max_bytes > 0 {
            self.max_bytes = max_bytes;
        }
        self
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W> {
    inner: W,
    pending: Vec<u8>,
    max_bytes: usize,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let clean = sanitize_with_limit(&String::from_utf8_lossy(bytes), self.max_bytes);
        self.inner.write_all(clean.as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);

        // A formatter that never writes a newline must not grow the buffer forever.
        if self.pending.len() > self.max_bytes.saturating_mul(2) {
            let all = std::mem::take(&mut self.pending);
            self.emit(&all)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.drain_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for SanitizingMakeWriter<M> {
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
            max_bytes: self.max_bytes,
        }
    }
}
