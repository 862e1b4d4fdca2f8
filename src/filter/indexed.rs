//! Scatter/gather filtering over an indexed variant source.
//!
//! The header fetch and one region query per interval run concurrently on a
//! [`JoinSet`]. The gather loop is the only owner of the result table: slot 0
//! holds the header, slot `i + 1` the records for interval `i`. Each task
//! returns its slot number with its result and the loop stores it exactly once.
//! Output order is table order, whatever order the tasks finish in.
//!
//! A semaphore bounds how many queries run at once, since every query opens
//! its own file handle. Queued tasks still own their slot, so the cap never
//! changes the output.

use super::{FilterOptions, FilterReport, MalformedPolicy, Warning};
use crate::coords::GenomicInterval;
use crate::formats::RegionSource;
use crate::intervals::{IntervalEntry, IntervalList};
use crate::sink::ResultSink;
use crate::{Error, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Records produced for one slot of the result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFragment {
    /// 0 for the header, `i + 1` for interval `i`.
    pub slot: usize,
    pub records: Vec<Vec<u8>>,
}

/// Requests cancellation of an in-flight gather.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observed by the gather loop; cloning shares the same signal.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

pub struct IndexedIntersector {
    options: FilterOptions,
    cancel: Option<CancelSignal>,
}

impl IndexedIntersector {
    pub fn new(options: FilterOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Gather and write the header and every region's records into `sink`.
    pub async fn run<W: Write>(
        &self,
        source: Arc<dyn RegionSource>,
        intervals: &IntervalList,
        sink: &mut ResultSink<W>,
    ) -> Result<FilterReport> {
        let (fragments, warnings) = self.gather(source, intervals).await?;

        let mut report = FilterReport {
            warnings,
            ..Default::default()
        };
        for fragment in &fragments {
            sink.extend(&fragment.records)?;
            if fragment.slot == 0 {
                report.headers += fragment.records.len();
            } else {
                report.emitted += fragment.records.len();
            }
        }

        tracing::debug!(
            regions = fragments.len().saturating_sub(1),
            headers = report.headers,
            emitted = report.emitted,
            "indexed gather finished"
        );
        Ok(report)
    }

    /// Run all queries and return the fragments in slot order.
    ///
    /// Waits for every slot to settle, then returns the first failed slot's
    /// error (lowest slot number). Timeout and cancellation abort whatever is
    /// still running.
    pub async fn gather(
        &self,
        source: Arc<dyn RegionSource>,
        intervals: &IntervalList,
    ) -> Result<(Vec<RegionFragment>, Vec<Warning>)> {
        if self.options.check_sorted {
            intervals.verify_sorted()?;
        }
        let (regions, warnings) = self.usable_intervals(intervals)?;
        let total = regions.len() + 1;

        let limit = self.options.query_concurrency.max(1);
        let permits = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        {
            let source = Arc::clone(&source);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // The semaphore is never closed; acquiring only waits.
                let _permit = permits.acquire_owned().await;
                (0, source.header().await)
            });
        }
        for (i, region) in regions.into_iter().enumerate() {
            let source = Arc::clone(&source);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (i + 1, source.query(&region).await)
            });
        }
        tracing::debug!(queries = total - 1, limit, "dispatched region queries");

        let mut slots: Vec<Option<Result<Vec<Vec<u8>>>>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let mut settled = 0usize;
        let deadline = self.options.region_timeout.map(|t| Instant::now() + t);
        let mut cancel = self.cancel.clone();

        while settled < total {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok((slot, result))) => {
                        debug_assert!(slots[slot].is_none(), "slot {} settled twice", slot);
                        tracing::trace!(slot, ok = result.is_ok(), "slot settled");
                        slots[slot] = Some(result);
                        settled += 1;
                    }
                    Some(Err(e)) => {
                        tasks.abort_all();
                        return Err(Error::Internal(format!("region task failed: {}", e)));
                    }
                    None => break,
                },
                _ = expire(deadline) => {
                    tasks.abort_all();
                    tracing::warn!(pending = total - settled, total, "region queries timed out");
                    return Err(Error::RegionTimeout { pending: total - settled, total });
                }
                _ = cancelled(cancel.as_mut()) => {
                    tasks.abort_all();
                    tracing::info!(pending = total - settled, "region queries cancelled");
                    return Err(Error::Cancelled);
                }
            }
        }

        let mut fragments = Vec::with_capacity(total);
        for (slot, entry) in slots.into_iter().enumerate() {
            match entry {
                Some(Ok(records)) => fragments.push(RegionFragment { slot, records }),
                Some(Err(e)) => {
                    return Err(Error::RegionQuery {
                        slot,
                        message: e.to_string(),
                    });
                }
                None => return Err(Error::Internal(format!("slot {} never settled", slot))),
            }
        }
        Ok((fragments, warnings))
    }

    /// Valid intervals to query, applying the malformed policy up front.
    fn usable_intervals(
        &self,
        intervals: &IntervalList,
    ) -> Result<(Vec<GenomicInterval>, Vec<Warning>)> {
        let mut regions = Vec::with_capacity(intervals.len());
        let mut warnings = Vec::new();
        for entry in intervals.entries() {
            match entry {
                IntervalEntry::Valid(iv) => regions.push(iv.clone()),
                IntervalEntry::Malformed {
                    line_number,
                    content,
                    reason,
                } => match self.options.on_malformed {
                    MalformedPolicy::Halt => {
                        return Err(Error::MalformedInterval {
                            line_number: *line_number,
                            content: content.clone(),
                        });
                    }
                    MalformedPolicy::Skip => {
                        tracing::warn!(line_number, %reason, "skipping malformed interval");
                        warnings.push(Warning::SkippedInterval {
                            line_number: *line_number,
                            reason: reason.clone(),
                        });
                    }
                },
            }
        }
        Ok((regions, warnings))
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn cancelled(signal: Option<&mut CancelSignal>) {
    match signal {
        Some(signal) => signal.cancelled().await,
        None => std::future::pending().await,
    }
}
