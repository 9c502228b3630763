//! Versions and the lineage of one upload

use super::history::OperationHistory;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Metadata associated with a dataset version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionMetadata {
    pub description: String,
    pub row_count: usize,
    pub column_count: usize,
    pub created_by: String,
}

/// A named, immutable snapshot of a dataset.
#[derive(Debug, Clone)]
pub struct Version {
    pub id: Uuid,
    pub name: String,
    pub frame: Arc<DataFrame>,
    pub metadata: VersionMetadata,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(name: impl Into<String>, frame: DataFrame, description: impl Into<String>) -> Self {
        let (row_count, column_count) = frame.shape();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            frame: Arc::new(frame),
            metadata: VersionMetadata {
                description: description.into(),
                row_count,
                column_count,
                created_by: "system".to_owned(),
            },
            created_at: Utc::now(),
        }
    }

    pub fn data(&self) -> &DataFrame {
        &self.frame
    }
}

/// The versions derived from one uploaded dataset, plus the history that produced them.
///
/// The original snapshot is held apart from the derived versions, so a
/// lineage always has at least one version and the original cannot be
/// replaced or removed.
#[derive(Debug, Clone)]
pub struct Lineage {
    base_name: String,
    original: Version,
    derived: Vec<Version>,
    history: OperationHistory,
}

/// `sales.csv` -> `sales`
pub fn base_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_owned(),
        _ => file_name.to_owned(),
    }
}

impl Lineage {
    pub fn new(upload_name: impl Into<String>, frame: DataFrame) -> Self {
        let upload_name = upload_name.into();
        Self {
            base_name: base_name(&upload_name),
            original: Version::new(upload_name, frame, "Original upload"),
            derived: Vec::new(),
            history: OperationHistory::default(),
        }
    }

    /// A lineage holding only this one's original version.
    pub fn restart(&self) -> Self {
        Self {
            base_name: self.base_name.clone(),
            original: self.original.clone(),
            derived: Vec::new(),
            history: OperationHistory::default(),
        }
    }

    pub fn upload_name(&self) -> &str {
        &self.original.name
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn original(&self) -> &Version {
        &self.original
    }

    /// Versions in creation order, original first.
    pub fn versions(&self) -> impl Iterator<Item = &Version> {
        std::iter::once(&self.original).chain(self.derived.iter())
    }

    pub fn version_names(&self) -> Vec<&str> {
        self.versions().map(|v| v.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.derived.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, name: &str) -> Option<&Version> {
        self.versions().find(|v| v.name == name)
    }

    pub fn latest(&self) -> &Version {
        self.derived.last().unwrap_or(&self.original)
    }

    pub fn history(&self) -> &OperationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut OperationHistory {
        &mut self.history
    }

    /// Prefix a version name with the upload's base name unless it already starts with it.
    pub fn qualify_name(&self, name: &str) -> String {
        if name.starts_with(&self.base_name) {
            name.to_owned()
        } else {
            format!("{}_{name}", self.base_name)
        }
    }

    /// Store a derived version. An existing version of the same name is replaced in place.
    ///
    /// # Errors
    ///
    /// `ReservedName` when the name is the original's.
    pub fn insert(&mut self, version: Version) -> Result<&Version, StoreError> {
        if version.name == self.original.name {
            return Err(StoreError::ReservedName(version.name));
        }
        let index = match self.derived.iter().position(|v| v.name == version.name) {
            Some(index) => {
                if let Some(slot) = self.derived.get_mut(index) {
                    *slot = version;
                }
                index
            }
            None => {
                self.derived.push(version);
                self.derived.len() - 1
            }
        };
        self.derived
            .get(index)
            .ok_or_else(|| StoreError::UnknownVersion(self.original.name.clone()))
    }

    /// Remove derived versions by name. Nothing is removed if any name is refused.
    pub fn remove(&mut self, names: &[&str]) -> Result<(), StoreError> {
        if let Some(unknown) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(StoreError::UnknownVersion((*unknown).to_owned()));
        }
        if self.derived.is_empty() {
            return Err(StoreError::CannotRemoveLastVersion {
                upload: self.upload_name().to_owned(),
            });
        }
        if names.contains(&self.original.name.as_str()) {
            return Err(StoreError::CannotRemoveOriginal {
                version: self.original.name.clone(),
            });
        }

        self.derived.retain(|v| !names.contains(&v.name.as_str()));
        Ok(())
    }

    /// Drop every derived version and the history.
    pub fn reset(&mut self) {
        self.derived.clear();
        self.history.clear();
    }
}
