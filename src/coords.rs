//! Coordinate model shared by both filtering paths.
//!
//! Chromosome tokens are compared through a normalized [`ChromKey`]:
//! lower-cased, with a leading `chr` stripped, then parsed as an integer.
//! Tokens that are not integers (`X`, `Y`, `M`, `Un_...`) become named keys.
//!
//! # Ordering
//!
//! Numeric chromosomes sort numerically and all of them sort before any
//! named chromosome. Named chromosomes sort lexically on the normalized
//! token, so `1 < 2 < 10 < 22 < m < x < y`. Inputs to the streaming filter
//! must be sorted under this order.

use std::cmp::Ordering;
use std::fmt;

/// Normalized chromosome key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChromKey {
    Numeric(u32),
    Named(String),
}

impl ChromKey {
    /// Normalize a raw chromosome token (`chr1`, `Chr1`, `CHR1` and `1` are equal).
    pub fn normalize(token: &str) -> Self {
        let lowered = token.trim().to_ascii_lowercase();
        let stripped = lowered.strip_prefix("chr").unwrap_or(&lowered);
        match stripped.parse::<u32>() {
            Ok(n) => ChromKey::Numeric(n),
            Err(_) => ChromKey::Named(stripped.to_string()),
        }
    }
}

impl Ord for ChromKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ChromKey::Numeric(a), ChromKey::Numeric(b)) => a.cmp(b),
            (ChromKey::Numeric(_), ChromKey::Named(_)) => Ordering::Less,
            (ChromKey::Named(_), ChromKey::Numeric(_)) => Ordering::Greater,
            (ChromKey::Named(a), ChromKey::Named(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for ChromKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ChromKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChromKey::Numeric(n) => write!(f, "{}", n),
            ChromKey::Named(s) => f.write_str(s),
        }
    }
}

/// Compare two `(chromosome, position)` pairs, chromosome first.
#[inline]
pub fn compare(a_chrom: &ChromKey, a_pos: u64, b_chrom: &ChromKey, b_pos: u64) -> Ordering {
    a_chrom.cmp(b_chrom).then(a_pos.cmp(&b_pos))
}

/// A variant position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub chrom: ChromKey,
    pub pos: u64,
}

impl Locus {
    pub fn new(chrom: &str, pos: u64) -> Self {
        Self {
            chrom: ChromKey::normalize(chrom),
            pos,
        }
    }
}

impl Ord for Locus {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.chrom, self.pos, &other.chrom, other.pos)
    }
}

impl PartialOrd for Locus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Where a variant falls relative to an interval during the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Variant sorts before the interval start: drop the variant.
    Before,
    /// Variant lies inside `[start, end)`: emit it.
    Within,
    /// Variant is at or past the interval end: move to the next interval.
    After,
}

/// A half-open genomic interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicInterval {
    pub chrom: ChromKey,
    /// Chromosome token as written in the interval list.
    pub chrom_name: String,
    pub start: u64,
    pub end: u64,
    /// 1-based line number in the interval list.
    pub line_number: usize,
}

impl GenomicInterval {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        let chrom_name = chrom.into();
        Self {
            chrom: ChromKey::normalize(&chrom_name),
            chrom_name,
            start,
            end,
            line_number: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True iff the locus is on this chromosome and `start <= pos < end`.
    #[inline]
    pub fn overlaps(&self, locus: &Locus) -> bool {
        self.chrom == locus.chrom && self.start <= locus.pos && locus.pos < self.end
    }

    /// Merge decision for a variant against this interval.
    pub fn locate(&self, locus: &Locus) -> Placement {
        if compare(&locus.chrom, locus.pos, &self.chrom, self.start) == Ordering::Less {
            return Placement::Before;
        }
        match locus.chrom.cmp(&self.chrom) {
            Ordering::Greater => Placement::After,
            _ if locus.pos >= self.end => Placement::After,
            _ => Placement::Within,
        }
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom_name, self.start, self.end)
    }
}

/// Free-function form of [`GenomicInterval::overlaps`].
#[inline]
pub fn overlaps(variant_chrom: &ChromKey, variant_pos: u64, interval: &GenomicInterval) -> bool {
    interval.chrom == *variant_chrom && interval.start <= variant_pos && variant_pos < interval.end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix_and_case() {
        let expected = ChromKey::Numeric(1);
        for token in ["chr1", "Chr1", "CHR1", "1", " chr1 "] {
            assert_eq!(ChromKey::normalize(token), expected, "token {token:?}");
        }
    }

    #[test]
    fn test_normalize_named() {
        assert_eq!(ChromKey::normalize("chrX"), ChromKey::normalize("chrx"));
        assert_eq!(ChromKey::normalize("chrX"), ChromKey::Named("x".to_string()));
        assert_eq!(ChromKey::normalize("MT"), ChromKey::Named("mt".to_string()));
    }

    #[test]
    fn test_named_sorts_after_numeric() {
        let mut keys: Vec<ChromKey> = ["chrY", "chr10", "chrX", "chr2", "chrM", "chr1"]
            .iter()
            .map(|t| ChromKey::normalize(t))
            .collect();
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, vec!["1", "2", "10", "m", "x", "y"]);
    }

    #[test]
    fn test_compare_chrom_then_position() {
        let c1 = ChromKey::Numeric(1);
        let c2 = ChromKey::Numeric(2);
        assert_eq!(compare(&c1, 500, &c2, 10), Ordering::Less);
        assert_eq!(compare(&c2, 10, &c2, 10), Ordering::Equal);
        assert_eq!(compare(&c2, 11, &c2, 10), Ordering::Greater);
    }

    #[test]
    fn test_overlaps_half_open() {
        let iv = GenomicInterval::new("chr1", 100, 200);
        assert!(iv.overlaps(&Locus::new("1", 100)));
        assert!(iv.overlaps(&Locus::new("1", 199)));
        assert!(!iv.overlaps(&Locus::new("1", 200)));
        assert!(!iv.overlaps(&Locus::new("1", 99)));
        assert!(!iv.overlaps(&Locus::new("2", 150)));
        assert!(overlaps(&ChromKey::Numeric(1), 150, &iv));
    }

    #[test]
    fn test_locate() {
        let iv = GenomicInterval::new("2", 100, 200);
        assert_eq!(iv.locate(&Locus::new("1", 150)), Placement::Before);
        assert_eq!(iv.locate(&Locus::new("2", 50)), Placement::Before);
        assert_eq!(iv.locate(&Locus::new("2", 100)), Placement::Within);
        assert_eq!(iv.locate(&Locus::new("2", 200)), Placement::After);
        assert_eq!(iv.locate(&Locus::new("3", 10)), Placement::After);
        assert_eq!(iv.locate(&Locus::new("chrX", 10)), Placement::After);
    }

    #[test]
    fn test_empty_interval_never_contains() {
        let iv = GenomicInterval::new("1", 100, 100);
        assert!(iv.is_empty());
        assert_eq!(iv.len(), 0);
        assert!(!iv.overlaps(&Locus::new("1", 100)));
        assert_eq!(iv.locate(&Locus::new("1", 100)), Placement::After);
    }
}
