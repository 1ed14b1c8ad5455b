use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use super::{LedgerReader, LedgerWriter, SubmitError, validate};
use crate::{Record, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LedgerDocument {
    #[serde(default)]
    deposits: Vec<Record>,
}

/// A ledger stored as a JSON document on disk.
///
/// Opening the ledger reads the whole document; every accepted submission
/// rewrites it.
#[derive(Debug)]
pub struct FileLedger {
    path: PathBuf,
    document: LedgerDocument,
}

impl FileLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open ledger: {}", path.display()))?;
        let document: LedgerDocument = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse ledger: {}", path.display()))?;

        tracing::debug!(
            "opened ledger {} with {} deposits",
            path.display(),
            document.deposits.len()
        );
        Ok(FileLedger {
            path: path.to_owned(),
            document,
        })
    }

    /// Create an empty ledger. Fails if the file already exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("Ledger already exists: {}", path.display());
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let ledger = FileLedger {
            path: path.to_owned(),
            document: LedgerDocument::default(),
        };
        ledger
            .persist()
            .with_context(|| format!("Failed to create ledger: {}", path.display()))?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), SubmitError> {
        let contents = serde_json::to_string_pretty(&self.document)?;
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        let written = std::fs::write(&temp, contents)
            .and_then(|()| std::fs::rename(&temp, &self.path));
        if let Err(error) = written {
            let _ = std::fs::remove_file(&temp);
            return Err(error.into());
        }
        Ok(())
    }
}

impl LedgerReader for FileLedger {
    fn list_all(&mut self) -> Result<Vec<Record>> {
        Ok(self.document.deposits.clone())
    }
}

impl LedgerWriter for FileLedger {
    fn submit(&mut self, record: &Record) -> Result<String, SubmitError> {
        validate(record)?;

        let txn_id = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        let mut stored = record.clone();
        stored.txn_id = Some(txn_id.clone());
        self.document.deposits.push(stored);

        if let Err(error) = self.persist() {
            self.document.deposits.pop();
            return Err(error);
        }
        Ok(txn_id)
    }
}
