//! VCF filtering against interval lists.
//!
//! Two strategies produce the same selection of records:
//!
//! - [`StreamingIntersector`]: a merge-join over a plain VCF stream and the
//!   interval list. Both inputs MUST be sorted by chromosome then position
//!   (see [`crate::coords`] for the chromosome order); unsorted input gives
//!   wrong results, not just slow ones. Enable `check_sorted` to fail fast.
//! - [`IndexedIntersector`]: one region query per interval against a
//!   tabix-indexed BGZF VCF, gathered back into interval order.
//!
//! [`filter_input`] picks the strategy for a [`VariantInput`].

mod indexed;
mod streaming;

pub use indexed::{CancelHandle, CancelSignal, IndexedIntersector, RegionFragment, cancel_pair};
pub use streaming::StreamingIntersector;

use crate::coords::Locus;
use crate::formats::TabixVcfSource;
use crate::input::VariantInput;
use crate::intervals::IntervalList;
use crate::sink::ResultSink;
use crate::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::sync::Arc;
use std::time::Duration;

/// What to do when a malformed interval or variant line is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Skip the line, record a warning and keep going.
    #[default]
    Skip,
    /// Stop at the line and fail with its line number.
    Halt,
}

/// Region queries allowed in flight at once on the indexed path. Each query
/// holds its own file handle.
pub const DEFAULT_QUERY_CONCURRENCY: usize = 64;

#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub on_malformed: MalformedPolicy,
    /// Validate sort order of both inputs while filtering.
    pub check_sorted: bool,
    /// Upper bound on the whole indexed gather; `None` waits forever.
    pub region_timeout: Option<Duration>,
    /// Cap on concurrent region queries (values below 1 act as 1).
    pub query_concurrency: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            on_malformed: MalformedPolicy::default(),
            check_sorted: false,
            region_timeout: None,
            query_concurrency: DEFAULT_QUERY_CONCURRENCY,
        }
    }
}

/// Non-fatal problems collected under [`MalformedPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    SkippedInterval { line_number: usize, reason: String },
    SkippedVariant { line_number: usize, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::SkippedInterval {
                line_number,
                reason,
            } => write!(f, "skipped interval at line {}: {}", line_number, reason),
            Warning::SkippedVariant {
                line_number,
                reason,
            } => write!(f, "skipped variant at line {}: {}", line_number, reason),
        }
    }
}

/// How a streaming pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Termination {
    /// The variant source ran out of lines.
    #[default]
    Exhausted,
    /// A blank variant line was read and treated as end of input.
    BlankLine { line_number: usize },
}

/// Summary of one filtering run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub headers: usize,
    pub emitted: usize,
    pub dropped: usize,
    pub warnings: Vec<Warning>,
    pub termination: Termination,
}

/// A classified variant file line.
///
/// Lines are kept as bytes: only the chromosome and position fields of data
/// lines must be text, everything else is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantLine<'a> {
    Blank,
    Header(&'a [u8]),
    Record { locus: Locus, raw: &'a [u8] },
    Malformed { reason: String },
}

impl<'a> VariantLine<'a> {
    /// Route one line (without its terminator). Only fields 0 and 1 of data
    /// lines are inspected.
    pub fn classify(line: &'a [u8]) -> Self {
        if line.iter().all(u8::is_ascii_whitespace) {
            return VariantLine::Blank;
        }
        if line.first() == Some(&b'#') {
            return VariantLine::Header(line);
        }
        let mut fields = line.split(|&b| b == b'\t');
        let chrom = fields.next().unwrap_or_default();
        let Some(pos) = fields.next() else {
            return VariantLine::Malformed {
                reason: "expected at least 2 fields".to_string(),
            };
        };
        let parsed = std::str::from_utf8(pos)
            .ok()
            .and_then(|p| p.trim().parse::<u64>().ok());
        match parsed {
            Some(pos) => VariantLine::Record {
                locus: Locus::new(&String::from_utf8_lossy(chrom), pos),
                raw: line,
            },
            None => VariantLine::Malformed {
                reason: format!("invalid position '{}'", String::from_utf8_lossy(pos)),
            },
        }
    }
}

/// Strip a trailing `\n` or `\r\n`.
pub(crate) fn trim_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Filter `input` against `intervals`, writing kept lines to `sink`.
///
/// The plain path runs on the blocking pool; the indexed path fans out region
/// queries on the runtime. Both stop with [`Error::Cancelled`] once `cancel`
/// fires. The sink is handed back so callers can flush it or take its buffer.
pub async fn filter_input<W>(
    input: &VariantInput,
    intervals: Arc<IntervalList>,
    options: &FilterOptions,
    cancel: Option<CancelSignal>,
    mut sink: ResultSink<W>,
) -> Result<(FilterReport, ResultSink<W>)>
where
    W: Write + Send + 'static,
{
    match input {
        VariantInput::Plain { path } => {
            let path = path.clone();
            let options = options.clone();
            tokio::task::spawn_blocking(move || -> Result<(FilterReport, ResultSink<W>)> {
                let file = File::open(&path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
                    _ => Error::Io(e),
                })?;
                let reader = BufReader::with_capacity(256 * 1024, file);
                let mut intersector = StreamingIntersector::new(&intervals, options);
                if let Some(cancel) = cancel {
                    intersector = intersector.with_cancel(cancel);
                }
                let report = intersector.run(reader, &mut sink)?;
                Ok((report, sink))
            })
            .await
            .map_err(|e| Error::Internal(format!("filter task failed: {}", e)))?
        }
        VariantInput::Indexed { data, index } => {
            let source = Arc::new(TabixVcfSource::open(data, index).await?);
            let mut intersector = IndexedIntersector::new(options.clone());
            if let Some(cancel) = cancel {
                intersector = intersector.with_cancel(cancel);
            }
            let report = intersector.run(source, &intervals, &mut sink).await?;
            Ok((report, sink))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ChromKey;

    #[test]
    fn test_classify() {
        assert_eq!(VariantLine::classify(b""), VariantLine::Blank);
        assert_eq!(VariantLine::classify(b"  \t "), VariantLine::Blank);
        assert_eq!(
            VariantLine::classify(b"##fileformat=VCFv4.2"),
            VariantLine::Header(b"##fileformat=VCFv4.2")
        );
        match VariantLine::classify(b"chr2\t150\t.\tA\tT") {
            VariantLine::Record { locus, raw } => {
                assert_eq!(locus.chrom, ChromKey::Numeric(2));
                assert_eq!(locus.pos, 150);
                assert_eq!(raw, b"chr2\t150\t.\tA\tT");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            VariantLine::classify(b"chr2"),
            VariantLine::Malformed { .. }
        ));
        assert!(matches!(
            VariantLine::classify(b"chr2\tabc"),
            VariantLine::Malformed { .. }
        ));
    }

    #[test]
    fn test_classify_non_utf8_content() {
        assert_eq!(
            VariantLine::classify(b"##source=caf\xE9"),
            VariantLine::Header(b"##source=caf\xE9")
        );
        match VariantLine::classify(b"1\t150\t.\tA\tG\t.\tPASS\tNOTE=\xE9") {
            VariantLine::Record { locus, .. } => assert_eq!(locus.pos, 150),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            VariantLine::classify(b"1\t1\xE90"),
            VariantLine::Malformed { .. }
        ));
    }

    #[test]
    fn test_trim_terminator() {
        assert_eq!(trim_terminator(b"1\t150\r\n"), b"1\t150");
        assert_eq!(trim_terminator(b"1\t150\n"), b"1\t150");
        assert_eq!(trim_terminator(b"1\t150"), b"1\t150");
    }

    #[tokio::test]
    async fn test_filter_input_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.vcf");
        std::fs::write(&path, "#CHROM\tPOS\n1\t50\n1\t150\n1\t200\n2\t150\n").unwrap();

        let input = VariantInput::Plain { path };
        let intervals = Arc::new(IntervalList::parse("1\t100\t200\n"));
        let (report, sink) = filter_input(
            &input,
            intervals,
            &FilterOptions::default(),
            None,
            ResultSink::new(Vec::new()),
        )
        .await
        .unwrap();

        assert_eq!(report.headers, 1);
        assert_eq!(report.emitted, 1);
        assert_eq!(report.dropped, 3);
        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        assert_eq!(out, "#CHROM\tPOS\n1\t150\n");
    }

    #[tokio::test]
    async fn test_filter_input_missing_file() {
        let input = VariantInput::Plain {
            path: "/nonexistent/calls.vcf".into(),
        };
        let err = filter_input(
            &input,
            Arc::new(IntervalList::default()),
            &FilterOptions::default(),
            None,
            ResultSink::new(Vec::new()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_filter_input_plain_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.vcf");
        std::fs::write(&path, "#CHROM\tPOS\n1\t150\n").unwrap();

        let (handle, signal) = cancel_pair();
        handle.cancel();
        let result = filter_input(
            &VariantInput::Plain { path },
            Arc::new(IntervalList::parse("1\t100\t200\n")),
            &FilterOptions::default(),
            Some(signal),
            ResultSink::new(Vec::new()),
        )
        .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
