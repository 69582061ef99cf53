//! Serializable wrapper configuration.
//!
//! ```
//! use evolvable_optim::{OptimizerKind, OptimizerSpec, WrapperConfig};
//!
//! let config = WrapperConfig::from_json_str(
//!     r#"{ "optimizer": "adam", "kwargs": { "lr": 0.001 }, "network_names": ["actor"] }"#,
//! )
//! .unwrap();
//! assert_eq!(config.optimizer, OptimizerSpec::Shared(OptimizerKind::Adam));
//! ```

use crate::optimizers::{OptimizerKind, OptimizerKwargs};
use crate::resolver::{NetworkContainer, Networks};
use crate::topology::{OptimizerSpec, Topology};
use crate::wrapper::OptimizerWrapper;
use crate::{OptimError, OptimResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything needed to construct an [`OptimizerWrapper`] except the networks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperConfig {
    /// Optimizer class, shared or per network.
    pub optimizer: OptimizerSpec<OptimizerKind>,
    /// Keyword configuration, shared or per network.
    #[serde(default = "default_kwargs")]
    pub kwargs: OptimizerSpec<OptimizerKwargs>,
    /// Explicit owner field names. Resolved from the container when absent.
    #[serde(default)]
    pub network_names: Option<Vec<String>>,
    #[serde(default)]
    pub multiagent: bool,
    /// Requested topology. Inferred from the inputs when absent.
    #[serde(default)]
    pub topology: Option<Topology>,
}

fn default_kwargs() -> OptimizerSpec<OptimizerKwargs> {
    OptimizerSpec::Shared(OptimizerKwargs::default())
}

impl WrapperConfig {
    /// Configuration with default kwargs, resolved names and inferred topology.
    pub fn new(optimizer: impl Into<OptimizerSpec<OptimizerKind>>) -> Self {
        Self {
            optimizer: optimizer.into(),
            kwargs: default_kwargs(),
            network_names: None,
            multiagent: false,
            topology: None,
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> OptimResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            OptimError::ConfigurationError(format!("Failed to parse wrapper config: {}", e))
        })
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> OptimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            OptimError::ConfigurationError(format!(
                "Failed to read wrapper config {:?}: {}",
                path, e
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_string(&self) -> OptimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            OptimError::ConfigurationError(format!("Failed to serialize wrapper config: {}", e))
        })
    }

    /// Build a wrapper over `networks`, resolving names from `container` unless
    /// this configuration lists them.
    pub fn build(
        &self,
        networks: impl Into<Networks>,
        container: Option<&dyn NetworkContainer>,
    ) -> OptimResult<OptimizerWrapper> {
        let mut builder = OptimizerWrapper::builder(self.optimizer.clone(), networks)
            .kwargs(self.kwargs.clone())
            .multiagent(self.multiagent);
        if let Some(names) = &self.network_names {
            builder = builder.network_names(names.clone());
        }
        if let Some(container) = container {
            builder = builder.container(container);
        }
        if let Some(topology) = self.topology {
            builder = builder.topology(topology);
        }
        builder.build()
    }
}
