//! Indexed variant sources.
//!
//! A [`RegionSource`] answers the two questions the indexed filter asks: the
//! header lines of the file, and the records overlapping one interval. The
//! [`TabixVcfSource`] implementation reads BGZF-compressed VCF through its
//! tabix index using noodles.

mod vcf;

pub use vcf::TabixVcfSource;

use crate::Result;
use crate::coords::GenomicInterval;
use async_trait::async_trait;

/// Random-access variant source queried one region at a time.
#[async_trait]
pub trait RegionSource: Send + Sync {
    /// Header lines (starting with `#`) in file order, without terminators.
    async fn header(&self) -> Result<Vec<Vec<u8>>>;

    /// Data lines overlapping `interval` (`start <= pos < end`) in file order.
    async fn query(&self, interval: &GenomicInterval) -> Result<Vec<Vec<u8>>>;
}
