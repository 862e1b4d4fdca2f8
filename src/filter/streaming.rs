//! Streaming merge-join of a sorted VCF against a sorted interval list.
//!
//! # Algorithm
//!
//! Two cursors walk the inputs once. For each data line:
//! 1. variant before the current interval: drop the variant
//! 2. variant at/after the interval end (or on a later chromosome): advance
//!    the interval and try again
//! 3. otherwise the variant is inside `[start, end)`: emit it
//!
//! Each decision moves exactly one cursor, so the pass is O(n + m) and no
//! variant is emitted twice even when intervals overlap. Header lines are
//! written as they are read and never move the interval cursor.
//!
//! # Requirements
//!
//! Both inputs MUST be sorted by chromosome, then position. Set
//! [`FilterOptions::check_sorted`] to fail on the first out-of-order record.

use super::{
    CancelSignal, FilterOptions, FilterReport, MalformedPolicy, Termination, VariantLine,
    Warning, trim_terminator,
};
use crate::coords::{Locus, Placement};
use crate::intervals::{IntervalEntry, IntervalList};
use crate::sink::ResultSink;
use crate::{Error, Result};
use std::io::{BufRead, Write};

/// Lines read between cancellation checks.
const CANCEL_CHECK_LINES: usize = 4096;

pub struct StreamingIntersector<'a> {
    intervals: &'a IntervalList,
    options: FilterOptions,
    cancel: Option<CancelSignal>,
}

/// Running state of one pass.
struct Pass {
    interval_index: usize,
    report: FilterReport,
    last_locus: Option<(Locus, usize)>,
}

impl<'a> StreamingIntersector<'a> {
    pub fn new(intervals: &'a IntervalList, options: FilterOptions) -> Self {
        Self {
            intervals,
            options,
            cancel: None,
        }
    }

    /// Stop with [`Error::Cancelled`] once `cancel` fires. The signal is
    /// polled every few thousand lines.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Filter `variants` into `sink`.
    ///
    /// Under [`MalformedPolicy::Halt`] the error is returned as soon as the
    /// interval cursor reaches a malformed interval (or a malformed data line
    /// is read); lines emitted before that point are already in the sink.
    pub fn run<R: BufRead, W: Write>(
        &self,
        mut variants: R,
        sink: &mut ResultSink<W>,
    ) -> Result<FilterReport> {
        if self.options.check_sorted {
            self.intervals.verify_sorted()?;
        }

        let mut pass = Pass {
            interval_index: 0,
            report: FilterReport::default(),
            last_locus: None,
        };
        let mut buffer = Vec::with_capacity(1024);
        let mut line_number = 0usize;

        loop {
            if line_number % CANCEL_CHECK_LINES == 0 && self.is_cancelled() {
                tracing::info!(line_number, "streaming pass cancelled");
                return Err(Error::Cancelled);
            }

            buffer.clear();
            if variants.read_until(b'\n', &mut buffer)? == 0 {
                pass.report.termination = Termination::Exhausted;
                break;
            }
            line_number += 1;
            let line = trim_terminator(&buffer);

            let classified = VariantLine::classify(line);
            if classified == VariantLine::Blank {
                tracing::debug!(line_number, "blank variant line, ending pass");
                pass.report.termination = Termination::BlankLine { line_number };
                break;
            }

            self.settle_malformed(&mut pass)?;

            match classified {
                VariantLine::Header(header) => {
                    sink.push_bytes(header)?;
                    pass.report.headers += 1;
                }
                VariantLine::Record { locus, raw } => {
                    if self.options.check_sorted {
                        check_order(&mut pass, &locus, line_number)?;
                    }
                    if self.place(&locus, &mut pass)? {
                        sink.push_bytes(raw)?;
                        pass.report.emitted += 1;
                    } else {
                        pass.report.dropped += 1;
                    }
                }
                VariantLine::Malformed { reason } => match self.options.on_malformed {
                    MalformedPolicy::Halt => {
                        return Err(Error::MalformedVariant {
                            line_number,
                            reason,
                        });
                    }
                    MalformedPolicy::Skip => {
                        tracing::warn!(line_number, %reason, "skipping malformed variant line");
                        pass.report.warnings.push(Warning::SkippedVariant {
                            line_number,
                            reason,
                        });
                    }
                },
                VariantLine::Blank => unreachable!("blank lines end the pass above"),
            }
        }

        tracing::debug!(
            headers = pass.report.headers,
            emitted = pass.report.emitted,
            dropped = pass.report.dropped,
            intervals_consumed = pass.interval_index,
            "streaming pass finished"
        );
        Ok(pass.report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }

    /// Move the interval cursor past malformed entries, or fail under `Halt`.
    fn settle_malformed(&self, pass: &mut Pass) -> Result<()> {
        while let Some(IntervalEntry::Malformed {
            line_number,
            content,
            reason,
        }) = self.intervals.entries().get(pass.interval_index)
        {
            match self.options.on_malformed {
                MalformedPolicy::Halt => {
                    return Err(Error::MalformedInterval {
                        line_number: *line_number,
                        content: content.clone(),
                    });
                }
                MalformedPolicy::Skip => {
                    tracing::warn!(line_number, %reason, "skipping malformed interval");
                    pass.report.warnings.push(Warning::SkippedInterval {
                        line_number: *line_number,
                        reason: reason.clone(),
                    });
                    pass.interval_index += 1;
                }
            }
        }
        Ok(())
    }

    /// Advance the interval cursor until the locus is placed. Returns whether
    /// the variant should be emitted.
    fn place(&self, locus: &Locus, pass: &mut Pass) -> Result<bool> {
        loop {
            self.settle_malformed(pass)?;
            let Some(IntervalEntry::Valid(interval)) =
                self.intervals.entries().get(pass.interval_index)
            else {
                // Intervals exhausted: only headers can still be emitted.
                return Ok(false);
            };
            match interval.locate(locus) {
                Placement::Before => return Ok(false),
                Placement::Within => return Ok(true),
                Placement::After => pass.interval_index += 1,
            }
        }
    }
}

fn check_order(pass: &mut Pass, locus: &Locus, line_number: usize) -> Result<()> {
    if let Some((prev, prev_line)) = &pass.last_locus {
        if locus < prev {
            return Err(Error::Unsorted(format!(
                "variant {}:{} at line {} comes after {}:{} at line {}",
                locus.chrom, locus.pos, line_number, prev.chrom, prev.pos, prev_line
            )));
        }
    }
    pass.last_locus = Some((locus.clone(), line_number));
    Ok(())
}
