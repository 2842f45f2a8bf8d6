//! Engine configuration and validation.
//!
//! [`EngineConfig`] is plain data: build it in code or deserialize it
//! with `serde` (every field has a default, so partial documents work).
//! [`validate()`](EngineConfig::validate) checks it against the number
//! of processes before any storage is allocated.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessel_core::IntRect;
use tessel_grid::FieldKind;
use tessel_partition::{Partition, PartitionConfig, ProcessGrid};
use tessel_registry::RegistryConfig;

use crate::error::ConfigError;

/// Everything a [`ProcessWorld`](crate::ProcessWorld) needs besides its
/// communicator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cells per axis of the global field, anchored at the origin.
    pub extent: Vec<u32>,
    /// Processes per axis. `None` factors the process count into a
    /// near-cubic grid.
    pub process_grid: Option<Vec<u32>>,
    /// Halo margin in cells.
    pub halo: u32,
    /// Whether the field wraps around on every axis.
    pub toroidal: bool,
    /// Bound on every wait of a halo round or rebalance, in
    /// milliseconds. Default: 10 000.
    pub sync_timeout_ms: u64,
    /// Kind of value each cell holds.
    pub field: FieldKind,
    /// Start a distributed registry when set.
    pub registry: Option<RegistryConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extent: vec![64, 64],
            process_grid: None,
            halo: 1,
            toroidal: false,
            sync_timeout_ms: 10_000,
            field: FieldKind::Scalar,
            registry: None,
        }
    }
}

impl EngineConfig {
    /// [`sync_timeout_ms`](Self::sync_timeout_ms) as a `Duration`.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Check the config for a run of `process_count` processes.
    ///
    /// Succeeds exactly when [`partition`](Self::partition) would.
    pub fn validate(&self, process_count: usize) -> Result<(), ConfigError> {
        self.partition(process_count).map(|_| ())
    }

    /// Validate, then compute the initial partition.
    pub fn partition(&self, process_count: usize) -> Result<Partition, ConfigError> {
        let config = self.partition_config(process_count)?;
        Ok(Partition::compute(&config)?)
    }

    /// The global field bounds.
    pub fn global(&self) -> Result<IntRect, ConfigError> {
        if self.extent.is_empty() {
            return Err(ConfigError::EmptyExtent);
        }
        for (axis, &extent) in self.extent.iter().enumerate() {
            if extent == 0 {
                return Err(ConfigError::ZeroExtent { axis });
            }
            if i32::try_from(extent).is_err() {
                return Err(ConfigError::ExtentOverflow { axis, extent });
            }
        }
        IntRect::with_extent(&self.extent)
            .map_err(|e| ConfigError::Partition(e.into()))
    }

    fn partition_config(&self, process_count: usize) -> Result<PartitionConfig, ConfigError> {
        let global = self.global()?;
        if process_count == 0 {
            return Err(ConfigError::NoProcesses);
        }
        if self.sync_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if let FieldKind::Composite { resources } = &self.field {
            if resources.is_empty() {
                return Err(ConfigError::EmptyComposite);
            }
            for (i, name) in resources.iter().enumerate() {
                if resources[..i].contains(name) {
                    return Err(ConfigError::DuplicateResource { name: name.clone() });
                }
            }
        }
        if let Some(registry) = &self.registry {
            if registry.timeout_ms == 0 {
                return Err(ConfigError::InvalidRegistry {
                    reason: "timeout_ms must be at least 1".into(),
                });
            }
        }
        let shape = match &self.process_grid {
            Some(dims) => ProcessGrid::new(dims)?,
            None => ProcessGrid::balanced(process_count, global.ndim())?,
        };
        Ok(PartitionConfig {
            global,
            process_count,
            shape,
            halo: self.halo,
            toroidal: self.toroidal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_partition::PartitionError;

    #[test]
    fn default_config_is_valid() {
        let cfg = EngineConfig::default();
        cfg.validate(1).unwrap();
        cfg.validate(4).unwrap();
        assert_eq!(cfg.sync_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn balanced_shape_when_unpinned() {
        let p = EngineConfig::default().partition(6).unwrap();
        assert_eq!(p.shape().dims(), &[3, 2]);
    }

    #[test]
    fn rejects_bad_extents() {
        let mut cfg = EngineConfig {
            extent: vec![],
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(1), Err(ConfigError::EmptyExtent));
        cfg.extent = vec![4, 0];
        assert_eq!(cfg.validate(1), Err(ConfigError::ZeroExtent { axis: 1 }));
        cfg.extent = vec![u32::MAX];
        assert!(matches!(
            cfg.validate(1),
            Err(ConfigError::ExtentOverflow { axis: 0, .. })
        ));
    }

    #[test]
    fn rejects_zero_timeout_and_empty_composite() {
        let cfg = EngineConfig {
            sync_timeout_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(1), Err(ConfigError::ZeroTimeout));
        let cfg = EngineConfig {
            field: FieldKind::Composite { resources: vec![] },
            ..EngineConfig::default()
        };
        assert_eq!(cfg.validate(1), Err(ConfigError::EmptyComposite));
        let cfg = EngineConfig {
            field: FieldKind::Composite {
                resources: vec!["food".into(), "water".into(), "food".into()],
            },
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.validate(1),
            Err(ConfigError::DuplicateResource {
                name: "food".into()
            })
        );
    }

    #[test]
    fn shape_must_match_process_count() {
        let cfg = EngineConfig {
            extent: vec![4, 4],
            process_grid: Some(vec![2, 2]),
            ..EngineConfig::default()
        };
        cfg.validate(4).unwrap();
        assert!(matches!(
            cfg.validate(3),
            Err(ConfigError::Partition(
                PartitionError::ProcessCountMismatch { .. }
            ))
        ));
        assert_eq!(cfg.validate(0), Err(ConfigError::NoProcesses));
    }

    #[test]
    fn too_many_processes_for_extent() {
        let cfg = EngineConfig {
            extent: vec![2],
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(3),
            Err(ConfigError::Partition(PartitionError::EmptySlab { .. }))
        ));
    }

    #[test]
    fn deserializes_partial_json() {
        let cfg: EngineConfig = serde_json::from_str(
            r#"{
                "extent": [8, 8],
                "toroidal": true,
                "field": { "kind": "composite", "resources": ["water", "food"] },
                "registry": { "timeout_ms": 500 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.halo, 1);
        assert!(cfg.toroidal);
        assert_eq!(cfg.field.name(), "composite");
        assert_eq!(cfg.registry.unwrap().directory_addr, "127.0.0.1:0");
        let back = serde_json::to_string(&EngineConfig::default()).unwrap();
        assert_eq!(
            serde_json::from_str::<EngineConfig>(&back).unwrap(),
            EngineConfig::default()
        );
    }
}
