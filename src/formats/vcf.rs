use super::RegionSource;
use crate::coords::{ChromKey, GenomicInterval};
use crate::filter::{VariantLine, trim_terminator};
use crate::{Error, Result};
use async_trait::async_trait;
use noodles::bgzf;
use noodles::core::Position;
use noodles::core::region::Interval;
use noodles::csi::binning_index::BinningIndex;
use noodles::tabix;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncBufReadExt;

/// BGZF-compressed VCF read through its tabix index.
///
/// Every query opens its own file handle, so concurrent queries never share
/// reader state.
pub struct TabixVcfSource {
    vcf_path: PathBuf,
    index: tabix::Index,
    /// Normalized keys of the index's reference sequences, in index order.
    references: Vec<ChromKey>,
}

impl TabixVcfSource {
    pub async fn open(vcf_path: &Path, index_path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(vcf_path).await.unwrap_or(false) {
            return Err(Error::NotFound(vcf_path.display().to_string()));
        }

        let index = tabix::r#async::read(index_path)
            .await
            .map_err(|e| Error::Internal(format!("failed to read tabix index: {}", e)))?;

        let references = match index.header() {
            Some(header) => header
                .reference_sequence_names()
                .iter()
                .map(|name| {
                    let name: &[u8] = name.as_ref();
                    ChromKey::normalize(&String::from_utf8_lossy(name))
                })
                .collect(),
            None => Vec::new(),
        };

        tracing::debug!(
            vcf = %vcf_path.display(),
            index = %index_path.display(),
            references = references.len(),
            "opened tabix-indexed VCF"
        );

        Ok(Self {
            vcf_path: vcf_path.to_path_buf(),
            index,
            references,
        })
    }

    async fn open_reader(&self) -> Result<bgzf::r#async::Reader<File>> {
        let file = File::open(&self.vcf_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(self.vcf_path.display().to_string()),
            _ => Error::Io(e),
        })?;
        Ok(bgzf::r#async::Reader::new(file))
    }
}

/// Index of the reference whose normalized name matches `chrom`, so `chr1`
/// in an interval list finds `1` in the index and vice versa.
fn resolve_reference(references: &[ChromKey], chrom: &ChromKey) -> Option<usize> {
    references.iter().position(|r| r == chrom)
}

/// 1-based closed query bounds covering `[start, end)` for VCF positions.
fn query_bounds(interval: &GenomicInterval) -> Result<Option<(Position, Position)>> {
    let first = interval.start.max(1);
    let Some(last) = interval.end.checked_sub(1) else {
        return Ok(None);
    };
    if last < first {
        return Ok(None);
    }

    let to_position = |value: u64| -> Result<Position> {
        let value = usize::try_from(value)
            .map_err(|e| Error::InvalidInput(format!("position out of range: {}", e)))?;
        Position::try_from(value)
            .map_err(|e| Error::InvalidInput(format!("invalid position: {}", e)))
    };

    Ok(Some((to_position(first)?, to_position(last)?)))
}

#[async_trait]
impl RegionSource for TabixVcfSource {
    async fn header(&self) -> Result<Vec<Vec<u8>>> {
        let mut reader = self.open_reader().await?;
        let mut lines = Vec::new();
        let mut line = Vec::new();

        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            let text = trim_terminator(&line);
            if text.first() != Some(&b'#') {
                break;
            }
            lines.push(text.to_vec());
        }

        Ok(lines)
    }

    async fn query(&self, interval: &GenomicInterval) -> Result<Vec<Vec<u8>>> {
        let Some(reference_id) = resolve_reference(&self.references, &interval.chrom) else {
            tracing::debug!(%interval, "reference not in index");
            return Ok(Vec::new());
        };
        let Some((start, end)) = query_bounds(interval)? else {
            return Ok(Vec::new());
        };

        let chunks = self
            .index
            .query(reference_id, Interval::from(start..=end))
            .map_err(|e| Error::Internal(format!("index query failed: {}", e)))?;

        let mut reader = self.open_reader().await?;
        let mut records = Vec::new();
        let mut line = Vec::new();

        for chunk in chunks {
            reader.seek(chunk.start()).await?;

            while reader.virtual_position() < chunk.end() {
                line.clear();
                if reader.read_until(b'\n', &mut line).await? == 0 {
                    break;
                }
                let classified = VariantLine::classify(trim_terminator(&line));
                if let VariantLine::Record { locus, raw } = classified {
                    if interval.overlaps(&locus) {
                        records.push(raw.to_vec());
                    }
                }
            }
        }

        tracing::trace!(%interval, records = records.len(), "region query finished");
        Ok(records)
    }
}
