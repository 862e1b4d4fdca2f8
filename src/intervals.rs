//! Interval list parsing.
//!
//! An interval list is tab-separated text with one interval per line:
//! `chromosome, start, end, ...` (extra columns are ignored). Lines with fewer
//! than three fields, non-integer coordinates or `start > end` are kept in the
//! list as [`IntervalEntry::Malformed`] so the filter can apply its
//! [`MalformedPolicy`](crate::filter::MalformedPolicy) at the exact point the
//! merge reaches them.

use crate::coords::{ChromKey, GenomicInterval, compare};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::path::Path;

/// One line of an interval list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalEntry {
    Valid(GenomicInterval),
    Malformed {
        line_number: usize,
        content: String,
        reason: String,
    },
}

impl IntervalEntry {
    pub fn line_number(&self) -> usize {
        match self {
            IntervalEntry::Valid(iv) => iv.line_number,
            IntervalEntry::Malformed { line_number, .. } => *line_number,
        }
    }
}

/// Ordered, fully materialized interval list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalList {
    entries: Vec<IntervalEntry>,
}

impl IntervalList {
    /// Parse interval list text. Blank lines and BED annotation lines
    /// (`#`, `track`, `browser`) are ignored.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| parse_line(idx + 1, line))
            .collect();
        Self { entries }
    }

    /// Load an interval list from a local path or an `http(s)` URL.
    pub async fn load(location: &str, max_bytes: Option<u64>) -> Result<Self> {
        let text = match url::Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                crate::remote::fetch_text(url, max_bytes).await?
            }
            _ => read_local(Path::new(location), max_bytes).await?,
        };
        let list = Self::parse(&text);
        tracing::debug!(
            location,
            intervals = list.valid().count(),
            malformed = list.malformed_count(),
            "loaded interval list"
        );
        Ok(list)
    }

    pub fn entries(&self) -> &[IntervalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Valid intervals in list order.
    pub fn valid(&self) -> impl Iterator<Item = &GenomicInterval> {
        self.entries.iter().filter_map(|e| match e {
            IntervalEntry::Valid(iv) => Some(iv),
            IntervalEntry::Malformed { .. } => None,
        })
    }

    pub fn malformed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, IntervalEntry::Malformed { .. }))
            .count()
    }

    /// Check that valid intervals are sorted by chromosome, then start.
    pub fn verify_sorted(&self) -> Result<()> {
        let mut prev: Option<&GenomicInterval> = None;
        for iv in self.valid() {
            if let Some(p) = prev {
                if compare(&iv.chrom, iv.start, &p.chrom, p.start) == Ordering::Less {
                    return Err(Error::Unsorted(format!(
                        "interval {} at line {} comes after {} at line {}",
                        iv, iv.line_number, p, p.line_number
                    )));
                }
            }
            prev = Some(iv);
        }
        Ok(())
    }
}

fn parse_line(line_number: usize, line: &str) -> Option<IntervalEntry> {
    if line.trim().is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
    {
        return None;
    }

    let malformed = |reason: String| IntervalEntry::Malformed {
        line_number,
        content: line.to_string(),
        reason,
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Some(malformed(format!(
            "expected at least 3 fields, got {}",
            fields.len()
        )));
    }

    let start = match fields[1].trim().parse::<u64>() {
        Ok(v) => v,
        Err(_) => return Some(malformed(format!("invalid start '{}'", fields[1]))),
    };
    let end = match fields[2].trim().parse::<u64>() {
        Ok(v) => v,
        Err(_) => return Some(malformed(format!("invalid end '{}'", fields[2]))),
    };
    if start > end {
        return Some(malformed(format!("start ({}) > end ({})", start, end)));
    }

    let chrom_name = fields[0].trim().to_string();
    Some(IntervalEntry::Valid(GenomicInterval {
        chrom: ChromKey::normalize(&chrom_name),
        chrom_name,
        start,
        end,
        line_number,
    }))
}

async fn read_local(path: &Path, max_bytes: Option<u64>) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| Error::NotFound(path.display().to_string()))?;
    if let Some(limit) = max_bytes {
        if metadata.len() > limit {
            return Err(Error::FileTooLarge { limit });
        }
    }
    Ok(tokio::fs::read_to_string(path).await?)
}
