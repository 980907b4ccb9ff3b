use anyhow::{ensure, Result};
use serde::Deserialize;

use crate::dynamodb::Capacity;

/// Capacity the destination is created with before a deep copy.
pub const DEFAULT_STAGING_CAPACITY: Capacity = Capacity::new(5, 1000);
/// Capacity the destination ends up with.
pub const DEFAULT_ULTIMATE_CAPACITY: Capacity = Capacity::new(5, 5);

/// Whether the data is copied along with the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Schema only, the destination starts empty at the ultimate capacity.
    #[default]
    Shallow,
    /// Schema at staging capacity, then every item, then ultimate capacity.
    Deep,
}

/// Everything one run needs to know, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPolicy {
    pub source_table: String,
    pub destination_table: String,
    pub source_profile: Option<String>,
    pub destination_profile: Option<String>,
    pub staging: Capacity,
    pub ultimate: Capacity,
    pub mode: CopyMode,
}

impl CopyPolicy {
    /// Policy for a shallow copy with the default capacities.
    #[cfg(test)]
    pub fn new(source_table: impl Into<String>, destination_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            destination_table: destination_table.into(),
            source_profile: None,
            destination_profile: None,
            staging: DEFAULT_STAGING_CAPACITY,
            ultimate: DEFAULT_ULTIMATE_CAPACITY,
            mode: CopyMode::default(),
        }
    }

    /// Capacity the destination table is created with.
    ///
    /// A shallow copy has no bulk load to throttle, so it goes straight to
    /// the ultimate capacity.
    pub fn creation_capacity(&self) -> Capacity {
        match self.mode {
            CopyMode::Shallow => self.ultimate,
            CopyMode::Deep => self.staging,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.source_table.is_empty(),
            "source table name must not be empty"
        );
        ensure!(
            !self.destination_table.is_empty(),
            "destination table name must not be empty"
        );
        for (label, capacity) in [("staging", self.staging), ("ultimate", self.ultimate)] {
            ensure!(
                capacity.read_units > 0 && capacity.write_units > 0,
                "{label} capacity must be positive, got {capacity}"
            );
        }
        Ok(())
    }
}
