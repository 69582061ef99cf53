//! Optimizer binding for evolvable individuals.
//!
//! **Version**: 0.1.0-alpha.2
//!
//! An individual in an evolutionary hyperparameter search owns one or more
//! trainable networks that are periodically cloned, mutated and re-evaluated.
//! This crate attaches optimizers to those networks and remembers which of the
//! individual's fields they came from, so optimizers can be rebuilt the same way
//! after every clone or mutation:
//! - Trainable module interface and identity-compared shared handles
//! - SGD, Adam and AdamW over per-module parameter groups
//! - Field-name resolution against an explicitly registered owner
//! - Three optimizer topologies: per network, pooled, single
//! - A uniform facade: step, zero_grad, state_dict, load_state_dict, indexing
//! - JSON configuration and (optionally gzipped) checkpoints
//!
//! # Example
//!
//! ```
//! use evolvable_optim::{
//!     share, FieldRegistry, LinearModule, OptimizerKind, OptimizerKwargs, OptimizerWrapper,
//!     SharedModule, Topology,
//! };
//!
//! let actor: SharedModule = share(LinearModule::new(4, 2));
//! let critic: SharedModule = share(LinearModule::new(4, 1));
//! let owner = FieldRegistry::new()
//!     .module("actor", &actor)
//!     .module("critic", &critic);
//!
//! let mut optimizer = OptimizerWrapper::builder(OptimizerKind::Adam, vec![actor, critic])
//!     .kwargs(OptimizerKwargs::new().with_lr(1e-3))
//!     .container(&owner)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(optimizer.topology(), Topology::Pooled);
//! assert_eq!(optimizer.network_names(), ["actor".to_string(), "critic".to_string()]);
//! optimizer.zero_grad().unwrap();
//! optimizer.step().unwrap();
//! ```

mod checkpoint;
mod config;
mod error;
mod module;
mod optimizers;
mod resolver;
mod topology;
mod wrapper;

#[cfg(feature = "structured-logging")]
pub mod structured_logging;

pub use checkpoint::{CheckpointCompression, OptimizerCheckpoint};
pub use config::WrapperConfig;
pub use error::{OptimError, OptimResult};
pub use module::{
    as_shared, module_id, same_module, same_module_list, share, LinearModule, SharedModule,
    SharedModuleList, TrainableModule,
};
pub use optimizers::{
    compute_gradient_norm, AdamOptimizer, AdamWOptimizer, AttrValue, GradClipMode, Optimizer,
    OptimizerConfig, OptimizerKind, OptimizerKwargs, OptimizerState, ParamGroup, ParamGroupState,
    SgdOptimizer,
};
pub use resolver::{resolve_network_names, FieldRegistry, FieldValue, NetworkContainer, Networks};
pub use topology::{BoundOptimizers, OptimizerSpec, Topology};
pub use wrapper::{OptimizerWrapper, OptimizerWrapperBuilder, StateDict};
