use super::Storage;
use crate::input::{INDEX_EXTENSION, VariantInput};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct LocalStorage {
    data_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn plain_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.vcf", id))
    }

    fn compressed_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.vcf.gz", id))
    }

    /// Index path, trying the appended (`x.vcf.gz.tbi`) then the replaced
    /// (`x.tbi`) convention.
    async fn index_path(&self, id: &str) -> Option<PathBuf> {
        let appended = PathBuf::from(format!(
            "{}{}",
            self.compressed_path(id).display(),
            INDEX_EXTENSION
        ));
        if is_file(&appended).await {
            return Some(appended);
        }

        let replaced = self.data_dir.join(format!("{}{}", id, INDEX_EXTENSION));
        if is_file(&replaced).await {
            return Some(replaced);
        }
        None
    }

    fn validate_id(id: &str) -> Result<()> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(Error::InvalidInput(format!("invalid dataset id: {:?}", id)));
        }
        Ok(())
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[async_trait]
impl Storage for LocalStorage {
    async fn resolve(&self, id: &str) -> Result<VariantInput> {
        Self::validate_id(id)?;

        // Prefer the indexed layout when both are present.
        let compressed = self.compressed_path(id);
        if is_file(&compressed).await {
            let selection = match self.index_path(id).await {
                Some(index) => vec![compressed, index],
                None => vec![compressed],
            };
            return VariantInput::from_selection(&selection);
        }

        let plain = self.plain_path(id);
        if is_file(&plain).await {
            return VariantInput::from_selection(&[plain]);
        }

        Err(Error::NotFound(id.to_string()))
    }
}
