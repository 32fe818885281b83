//! Log redaction for identifiers and secrets.
//!
//! Patient attribute values are never passed to logging calls. This layer
//! catches what slips through anyway: contact details, record numbers,
//! bundle signing material. It sits between the `tracing` formatter and the
//! sink and rewrites each completed line.
//!
//! Input is capped at `ENROLLWISE_SANITIZE_MAX_BYTES` (default 16 KiB) per
//! call; anything beyond the cap is dropped and marked `[TRUNCATED]`.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

pub const SANITIZE_MAX_BYTES_ENV: &str = "ENROLLWISE_SANITIZE_MAX_BYTES";

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const TRUNCATED_MARKER: &str = " [TRUNCATED]";

/// Pattern and replacement pairs, applied in order.
const RULES: &[(&str, &str)] = &[
    // xxx-xx-xxxx
    (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
    (r"(?i)\bMRN[:#\s]?\s*\d{6,10}\b", "[REDACTED-MRN]"),
    (
        r"(?i)\b(?:dob|date[_\s-]?of[_\s-]?birth)\b\s*[:=]?\s*\d{4}-\d{2}-\d{2}\b",
        "[REDACTED-DOB]",
    ),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s][0-9]{3}[-.\s][0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r"\beyJ[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\b",
        "[REDACTED-JWT]",
    ),
    // Signing seeds and tokens next to a telling key name.
    (
        r"(?i)\b(?:signing[_-]?key|private[_-]?key|seed|secret|token|password)\b\s*[:=]\s*[A-Za-z0-9+/_-]{32,}={0,2}",
        "[REDACTED-SECRET]",
    ),
    (r"\b[0-9a-fA-F]{64,}\b", "[REDACTED-KEY]"),
];

const PEM_TRIGGER: &str = "-----BEGIN ";

const PEM_PRIVATE_KEY: &str = r"(?s)-----BEGIN [A-Z0-9 ]{0,40}PRIVATE KEY-----.{0,8192}?-----END [A-Z0-9 ]{0,40}PRIVATE KEY-----";

struct Redactor {
    /// One pass to decide which rules can match at all
    any: RegexSet,
    rules: Vec<(Regex, &'static str)>,
    /// Kept out of the set: the bounded dot-all body bloats the combined program
    pem: Regex,
}

impl Redactor {
    fn compile() -> Result<Self, regex::Error> {
        let any = RegexSet::new(RULES.iter().map(|(pattern, _)| *pattern))?;
        let rules = RULES
            .iter()
            .map(|(pattern, replacement)| {
                Regex::new(pattern).map(|regex| (regex, *replacement))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let pem = Regex::new(PEM_PRIVATE_KEY)?;
        Ok(Self { any, rules, pem })
    }

    fn matches(&self, text: &str) -> bool {
        self.any.is_match(text) || (text.contains(PEM_TRIGGER) && self.pem.is_match(text))
    }

    fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for idx in self.any.matches(text).iter() {
            let (regex, replacement) = &self.rules[idx];
            out = regex.replace_all(&out, *replacement).into_owned();
        }
        if out.contains(PEM_TRIGGER) {
            out = self
                .pem
                .replace_all(&out, "[REDACTED-PEM-PRIVATE-KEY]")
                .into_owned();
        }
        out
    }
}

static REDACTOR: OnceLock<Option<Redactor>> = OnceLock::new();

fn redactor() -> Option<&'static Redactor> {
    REDACTOR.get_or_init(|| Redactor::compile().ok()).as_ref()
}

fn max_sanitize_bytes() -> usize {
    std::env::var(SANITIZE_MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
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

/// Redact identifiers and secrets from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let (head, truncated) = clip(input, max_bytes);
    let mut out = match redactor() {
        Some(r) if r.matches(head) => r.redact(head),
        Some(_) => head.to_string(),
        // Rules failed to compile: emit nothing rather than unfiltered text.
        None => "[REDACTION-UNAVAILABLE]".to_string(),
    };
    if truncated {
        out.push_str(TRUNCATED_MARKER);
    }
    out
}

/// Whether `input` contains anything [`sanitize`] would rewrite.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (head, _) = clip(input, max_sanitize_bytes());
    redactor().map_or(true, |r| r.matches(head))
}

/// `MakeWriter` wrapper that redacts each formatted log line before it
/// reaches the inner sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
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

        // A single unterminated line may not grow without bound.
        if self.pending.len() > max_sanitize_bytes().saturating_mul(2) {
            let pending = std::mem::take(&mut self.pending);
            self.emit(&pending)?;
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
