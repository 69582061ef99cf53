//! Optimizers that update the parameters of shared modules.
//!
//! # Available Optimizers
//! - [`SgdOptimizer`]: Stochastic Gradient Descent with momentum
//! - [`AdamOptimizer`]: Adaptive Moment Estimation
//! - [`AdamWOptimizer`]: Adam with decoupled weight decay
//!
//! # Common Types
//! - [`Optimizer`]: Core trait that all optimizers implement
//! - [`OptimizerKind`]: The optimizer "class", a factory over parameter groups
//! - [`OptimizerConfig`] / [`OptimizerKwargs`]: Full and partial hyper-parameter sets
//! - [`OptimizerState`]: Serialized optimizer state

pub mod adam;
pub mod adamw;
pub mod common;
pub mod sgd;

pub use common::{
    compute_gradient_norm, AttrValue, GradClipMode, Optimizer, OptimizerConfig, OptimizerKwargs,
    OptimizerState, ParamGroup, ParamGroupState,
};

pub use adam::AdamOptimizer;
pub use adamw::AdamWOptimizer;
pub use sgd::SgdOptimizer;

use crate::{OptimError, OptimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which optimization algorithm to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
    AdamW,
}

impl OptimizerKind {
    /// Construct an optimizer instance over `groups`.
    pub fn build(self, groups: Vec<ParamGroup>) -> OptimResult<Box<dyn Optimizer>> {
        Ok(match self {
            OptimizerKind::Sgd => Box::new(SgdOptimizer::new(groups)?),
            OptimizerKind::Adam => Box::new(AdamOptimizer::new(groups)?),
            OptimizerKind::AdamW => Box::new(AdamWOptimizer::new(groups)?),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerKind::Sgd => "sgd",
            OptimizerKind::Adam => "adam",
            OptimizerKind::AdamW => "adamw",
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizerKind {
    type Err = OptimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sgd" => Ok(OptimizerKind::Sgd),
            "adam" => Ok(OptimizerKind::Adam),
            "adamw" => Ok(OptimizerKind::AdamW),
            other => Err(OptimError::ConfigurationError(format!(
                "Unknown optimizer '{}'",
                other
            ))),
        }
    }
}
