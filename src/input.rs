//! Variant input selection.
//!
//! The filtering path is chosen from file names alone:
//!
//! | Selection                      | Path    |
//! |--------------------------------|---------|
//! | one `*.vcf`                    | plain   |
//! | one `*.gz` + one `*.tbi`       | indexed |
//! | anything else                  | rejected before any processing |

use crate::{Error, Result};
use std::path::{Path, PathBuf};

pub const PLAIN_EXTENSION: &str = ".vcf";
pub const COMPRESSED_EXTENSION: &str = ".gz";
pub const INDEX_EXTENSION: &str = ".tbi";

const SELECT_ONE_OR_PAIR: &str = "please select a single uncompressed VCF file, or a pair of files: BGZipped VCF and its tabix index";

/// A validated variant input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantInput {
    /// Uncompressed VCF, streamed line by line.
    Plain { path: PathBuf },
    /// BGZF-compressed VCF with its tabix index.
    Indexed { data: PathBuf, index: PathBuf },
}

impl VariantInput {
    /// Validate a user selection of one or two files.
    pub fn from_selection(paths: &[PathBuf]) -> Result<Self> {
        match paths {
            [single] => Self::single(single),
            [a, b] => Self::pair(a, b),
            _ => Err(Error::InvalidSelection(SELECT_ONE_OR_PAIR.to_string())),
        }
    }

    fn single(path: &Path) -> Result<Self> {
        let name = file_name(path);
        if name.ends_with(COMPRESSED_EXTENSION) {
            Err(Error::InvalidSelection(
                "GZipped VCF selected - please select also its tabix index file (.tbi)"
                    .to_string(),
            ))
        } else if !name.ends_with(PLAIN_EXTENSION) {
            Err(Error::InvalidSelection(format!(
                "selected file '{}' does not have a .vcf extension; if it is a VCF file, please rename it",
                name
            )))
        } else {
            Ok(VariantInput::Plain {
                path: path.to_path_buf(),
            })
        }
    }

    fn pair(a: &Path, b: &Path) -> Result<Self> {
        let is_index = |p: &Path| file_name(p).ends_with(INDEX_EXTENSION);
        let (index, data) = match (is_index(a), is_index(b)) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => return Err(Error::InvalidSelection(SELECT_ONE_OR_PAIR.to_string())),
        };
        if !file_name(data).ends_with(COMPRESSED_EXTENSION) {
            return Err(Error::InvalidSelection(SELECT_ONE_OR_PAIR.to_string()));
        }
        Ok(VariantInput::Indexed {
            data: data.to_path_buf(),
            index: index.to_path_buf(),
        })
    }

    /// Path of the variant data file.
    pub fn data_path(&self) -> &Path {
        match self {
            VariantInput::Plain { path } => path,
            VariantInput::Indexed { data, .. } => data,
        }
    }

    /// File name of the variant data, used to name the output artifact.
    pub fn display_name(&self) -> String {
        file_name(self.data_path())
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, VariantInput::Indexed { .. })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
