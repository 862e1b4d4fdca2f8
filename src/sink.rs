//! Output assembly for filtered variant files.

use crate::{Error, Result};
use std::io::Write;

/// Suffix appended to the input file name to name the filtered artifact.
pub const OUTPUT_SUFFIX: &str = "filtered.vcf";

/// Derive the artifact name from the original input file name.
pub fn output_name(input_name: &str) -> String {
    format!("{}.{}", input_name, OUTPUT_SUFFIX)
}

/// Writes emitted lines in order, each terminated by `\n`.
///
/// Lines are written as raw bytes, so non-UTF-8 header or INFO content
/// passes through unchanged. With a byte limit set, a write that would exceed
/// it fails with [`Error::FileTooLarge`] and nothing further is written.
#[derive(Debug)]
pub struct ResultSink<W: Write> {
    writer: W,
    bytes: u64,
    limit: Option<u64>,
}

impl<W: Write> ResultSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            bytes: 0,
            limit: None,
        }
    }

    pub fn with_limit(writer: W, limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(writer)
        }
    }

    /// Write one line given without its terminator.
    pub fn push_bytes(&mut self, line: &[u8]) -> Result<()> {
        let len = line.len() as u64 + 1;
        if let Some(limit) = self.limit {
            if self.bytes + len > limit {
                return Err(Error::FileTooLarge { limit });
            }
        }
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")?;
        self.bytes += len;
        Ok(())
    }

    pub fn extend<I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        for line in lines {
            self.push_bytes(line.as_ref())?;
        }
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
