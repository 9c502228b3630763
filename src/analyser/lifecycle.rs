//! Versioned dataset store
//!
//! Every uploaded dataset starts a [`Lineage`]: the original snapshot plus
//! the versions derived from it by commands and cleaning runs.
//!
//! ## Key Principles
//!
//! - **Immutability**: versions are never modified; every operation stores a new one
//! - **Naming**: derived versions are prefixed with the upload's base name
//! - **Protection**: the original version and the last remaining version cannot be removed
//! - **Selection**: one upload and one of its versions are active at any time
//!
//! ## Example Usage
//!
//! ```no_run
//! use datajanitor::analyser::lifecycle::VersionStore;
//! use polars::prelude::*;
//!
//! # fn example(df: DataFrame, filtered: DataFrame) -> anyhow::Result<()> {
//! let mut store = VersionStore::default();
//! store.add_upload("sales.csv", df);
//!
//! // Stored as "sales_big_orders.csv" and selected
//! let name = store.add_version("big_orders.csv", filtered, "amount > 100")?;
//! assert_eq!(store.selected_version()?.name, name);
//!
//! let archive = store.export_lineage()?;
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod history;
pub mod version;

pub use history::{Operation, OperationHistory};
pub use version::{Lineage, Version, VersionMetadata};

use crate::error::{Result, StoreError};
use polars::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    lineages: Vec<Lineage>,
    active_upload: Option<String>,
    selected_version: Option<String>,
}

impl VersionStore {
    /// Register an uploaded dataset and make its original version the selection.
    ///
    /// Uploading a name that already exists starts that lineage over.
    pub fn add_upload(&mut self, name: impl Into<String>, frame: DataFrame) {
        let lineage = Lineage::new(name, frame);
        let upload = lineage.upload_name().to_owned();

        match self.lineages.iter_mut().find(|l| l.upload_name() == upload) {
            Some(slot) => {
                tracing::info!("Replacing existing upload {upload}");
                *slot = lineage;
            }
            None => self.lineages.push(lineage),
        }

        self.selected_version = Some(upload.clone());
        self.active_upload = Some(upload);
    }

    pub fn uploads(&self) -> Vec<&str> {
        self.lineages.iter().map(Lineage::upload_name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }

    pub fn lineage(&self, upload: &str) -> Result<&Lineage, StoreError> {
        self.lineages
            .iter()
            .find(|l| l.upload_name() == upload)
            .ok_or_else(|| StoreError::UnknownUpload(upload.to_owned()))
    }

    pub fn active_upload(&self) -> Option<&str> {
        self.active_upload.as_deref()
    }

    pub fn active_lineage(&self) -> Result<&Lineage, StoreError> {
        let upload = self.active_upload.as_deref().ok_or(StoreError::NoActiveUpload)?;
        self.lineage(upload)
    }

    pub fn active_lineage_mut(&mut self) -> Result<&mut Lineage, StoreError> {
        let upload = self.active_upload.as_deref().ok_or(StoreError::NoActiveUpload)?;
        self.lineages
            .iter_mut()
            .find(|l| l.upload_name() == upload)
            .ok_or_else(|| StoreError::UnknownUpload(upload.to_owned()))
    }

    /// Switch uploads; the switched-to lineage's latest version becomes the selection.
    pub fn select_upload(&mut self, upload: &str) -> Result<(), StoreError> {
        let latest = self.lineage(upload)?.latest().name.clone();
        self.active_upload = Some(upload.to_owned());
        self.selected_version = Some(latest);
        Ok(())
    }

    pub fn select_version(&mut self, name: &str) -> Result<(), StoreError> {
        if self.active_lineage()?.get(name).is_none() {
            return Err(StoreError::UnknownVersion(name.to_owned()));
        }
        self.selected_version = Some(name.to_owned());
        Ok(())
    }

    pub fn selected_version_name(&self) -> Option<&str> {
        self.selected_version.as_deref()
    }

    pub fn selected_version(&self) -> Result<&Version, StoreError> {
        let lineage = self.active_lineage()?;
        match self.selected_version.as_deref() {
            Some(name) => lineage
                .get(name)
                .ok_or_else(|| StoreError::UnknownVersion(name.to_owned())),
            None => Ok(lineage.latest()),
        }
    }

    pub fn version(&self, name: &str) -> Result<&Version, StoreError> {
        self.active_lineage()?
            .get(name)
            .ok_or_else(|| StoreError::UnknownVersion(name.to_owned()))
    }

    /// Store a derived version of the active upload and select it.
    ///
    /// Returns the stored name, prefixed with the upload's base name.
    pub fn add_version(
        &mut self,
        name: &str,
        frame: DataFrame,
        description: impl Into<String>,
    ) -> Result<String, StoreError> {
        let lineage = self.active_lineage_mut()?;
        let qualified = lineage.qualify_name(name);
        let version = lineage.insert(Version::new(qualified, frame, description))?;

        tracing::debug!(
            "Stored version {} ({} rows x {} columns)",
            version.name,
            version.metadata.row_count,
            version.metadata.column_count
        );
        let stored = version.name.clone();
        self.selected_version = Some(stored.clone());
        Ok(stored)
    }

    /// Remove versions of the active upload.
    ///
    /// If the selected version is among them, the first remaining version is selected.
    pub fn remove_versions(&mut self, names: &[&str]) -> Result<(), StoreError> {
        let lineage = self.active_lineage_mut()?;
        lineage.remove(names)?;
        let first = lineage.original().name.clone();

        if self
            .selected_version
            .as_deref()
            .is_some_and(|selected| names.contains(&selected))
        {
            self.selected_version = Some(first);
        }
        Ok(())
    }

    pub fn remove_version(&mut self, name: &str) -> Result<(), StoreError> {
        self.remove_versions(&[name])
    }

    /// Drop every derived version and the history of the active upload.
    pub fn reset_lineage(&mut self) -> Result<(), StoreError> {
        let lineage = self.active_lineage_mut()?;
        lineage.reset();
        let first = lineage.original().name.clone();
        self.selected_version = Some(first);
        Ok(())
    }

    /// Swap in a rebuilt lineage for the active upload.
    ///
    /// `selected` names the version to select, falling back to the original
    /// when it is `None` or not part of the rebuilt lineage.
    pub fn replace_active_lineage(
        &mut self,
        rebuilt: Lineage,
        selected: Option<&str>,
    ) -> Result<(), StoreError> {
        let lineage = self.active_lineage_mut()?;
        *lineage = rebuilt;
        let name = match selected {
            Some(name) if lineage.get(name).is_some() => name.to_owned(),
            _ => lineage.original().name.clone(),
        };
        self.selected_version = Some(name);
        Ok(())
    }

    pub fn record(&mut self, operation: Operation) -> Result<(), StoreError> {
        self.active_lineage_mut()?.history_mut().push(operation);
        Ok(())
    }

    /// CSV bytes of one version of the active upload.
    pub fn export_version(&self, name: &str) -> Result<Vec<u8>> {
        export::version_csv(self.version(name)?)
    }

    /// Zip archive of every version of the active upload.
    pub fn export_lineage(&self) -> Result<Vec<u8>> {
        export::lineage_zip(self.active_lineage()?)
    }
}
