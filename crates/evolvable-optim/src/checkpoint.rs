//! Saving and restoring optimizer state alongside its network bindings.

use crate::optimizers::OptimizerKind;
use crate::topology::{OptimizerSpec, Topology};
use crate::wrapper::{OptimizerWrapper, StateDict};
use crate::{OptimError, OptimResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Compression method for checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckpointCompression {
    /// No compression (plain JSON).
    #[default]
    None,
    /// Gzip compression (good balance of speed and ratio).
    Gzip,
    /// Fast gzip compression (faster but lower ratio).
    GzipFast,
    /// Best gzip compression (slower but better ratio).
    GzipBest,
}

impl CheckpointCompression {
    fn level(self) -> Option<Compression> {
        match self {
            CheckpointCompression::None => None,
            CheckpointCompression::Gzip => Some(Compression::default()),
            CheckpointCompression::GzipFast => Some(Compression::fast()),
            CheckpointCompression::GzipBest => Some(Compression::best()),
        }
    }
}

/// Optimizer state of one individual together with the bindings it was taken from.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OptimizerCheckpoint {
    pub network_names: Vec<String>,
    pub topology: Topology,
    pub optimizer: OptimizerSpec<OptimizerKind>,
    pub state: StateDict,
}

impl OptimizerCheckpoint {
    /// Capture the current state of `wrapper`.
    pub fn capture(wrapper: &OptimizerWrapper) -> Self {
        Self {
            network_names: wrapper.network_names().to_vec(),
            topology: wrapper.topology(),
            optimizer: wrapper.optimizer_class().clone(),
            state: wrapper.state_dict(),
        }
    }

    /// Load this checkpoint into a wrapper bound the same way.
    pub fn restore_into(&self, wrapper: &mut OptimizerWrapper) -> OptimResult<()> {
        if wrapper.network_names() != self.network_names.as_slice() {
            return Err(OptimError::ConfigurationError(format!(
                "Checkpoint was taken for networks {:?}, wrapper binds {:?}",
                self.network_names,
                wrapper.network_names()
            )));
        }
        if wrapper.topology() != self.topology {
            return Err(OptimError::ConfigurationError(format!(
                "Checkpoint topology is {}, wrapper topology is {}",
                self.topology,
                wrapper.topology()
            )));
        }
        wrapper.load_state_dict(self.state.clone())
    }

    /// Save checkpoint to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> OptimResult<()> {
        self.save_with_compression(path, CheckpointCompression::None)
    }

    /// Save checkpoint to a file with compression.
    ///
    /// # Example
    /// ```no_run
    /// use evolvable_optim::{CheckpointCompression, OptimizerCheckpoint};
    ///
    /// # let checkpoint: OptimizerCheckpoint = unimplemented!();
    /// checkpoint
    ///     .save_with_compression("/tmp/agent_0_optimizer.json.gz", CheckpointCompression::Gzip)
    ///     .unwrap();
    /// ```
    pub fn save_with_compression(
        &self,
        path: impl AsRef<Path>,
        compression: CheckpointCompression,
    ) -> OptimResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            OptimError::CheckpointError(format!("Failed to serialize checkpoint: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                OptimError::CheckpointError(format!("Failed to create checkpoint directory: {}", e))
            })?;
        }

        match compression.level() {
            None => {
                std::fs::write(path, json).map_err(|e| {
                    OptimError::CheckpointError(format!("Failed to write checkpoint: {}", e))
                })?;
            }
            Some(level) => {
                let file = File::create(path).map_err(|e| {
                    OptimError::CheckpointError(format!("Failed to create checkpoint file: {}", e))
                })?;
                let mut encoder = GzEncoder::new(file, level);
                encoder.write_all(json.as_bytes()).map_err(|e| {
                    OptimError::CheckpointError(format!("Failed to compress checkpoint: {}", e))
                })?;
                encoder.finish().map_err(|e| {
                    OptimError::CheckpointError(format!("Failed to finish compression: {}", e))
                })?;
            }
        }

        tracing::debug!(path = %path.display(), "Saved optimizer checkpoint");
        Ok(())
    }

    /// Load checkpoint from a file, gunzipping paths ending in `.gz`.
    pub fn load(path: impl AsRef<Path>) -> OptimResult<Self> {
        let path = path.as_ref();
        let json = if path.to_string_lossy().ends_with(".gz") {
            let file = File::open(path).map_err(|e| {
                OptimError::CheckpointError(format!("Failed to open checkpoint file: {}", e))
            })?;
            let mut decoder = GzDecoder::new(file);
            let mut json = String::new();
            decoder.read_to_string(&mut json).map_err(|e| {
                OptimError::CheckpointError(format!("Failed to decompress checkpoint: {}", e))
            })?;
            json
        } else {
            std::fs::read_to_string(path).map_err(|e| {
                OptimError::CheckpointError(format!("Failed to read checkpoint: {}", e))
            })?
        };

        serde_json::from_str(&json).map_err(|e| {
            OptimError::CheckpointError(format!("Failed to deserialize checkpoint: {}", e))
        })
    }
}
