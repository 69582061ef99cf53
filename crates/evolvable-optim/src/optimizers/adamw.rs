//! AdamW optimizer (Adam with decoupled weight decay).
//!
//! Reference: Loshchilov & Hutter, "Decoupled Weight Decay Regularization", ICLR 2019

use super::adam::{adam_step, HYPERPARAMS, SLOTS};
use super::common::{AttrValue, GroupCore, Optimizer, OptimizerState, ParamGroup};
use crate::OptimResult;

/// AdamW optimizer.
#[derive(Debug, Clone)]
pub struct AdamWOptimizer {
    core: GroupCore,
}

impl AdamWOptimizer {
    /// Create a new AdamW optimizer over the given parameter groups.
    pub fn new(groups: Vec<ParamGroup>) -> OptimResult<Self> {
        Ok(Self {
            core: GroupCore::new(groups)?,
        })
    }
}

impl Optimizer for AdamWOptimizer {
    fn name(&self) -> &'static str {
        "adamw"
    }

    fn param_groups(&self) -> &[ParamGroup] {
        &self.core.groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.core.groups
    }

    fn step(&mut self) -> OptimResult<()> {
        adam_step(&mut self.core, true)
    }

    fn check_step(&self) -> OptimResult<()> {
        self.core.prepare_gradients().map(|_| ())
    }

    fn zero_grad(&mut self) -> OptimResult<()> {
        self.core.zero_grad()
    }

    fn state_dict(&self) -> OptimizerState {
        self.core.state_dict(self.name())
    }

    fn validate_state(&self, state: &OptimizerState) -> OptimResult<()> {
        self.core.validate_state(self.name(), SLOTS, state)
    }

    fn load_state_dict(&mut self, state: OptimizerState) -> OptimResult<()> {
        self.validate_state(&state)?;
        self.core.load_validated(state)
    }

    fn attribute(&self, name: &str) -> Option<AttrValue> {
        self.core.attribute(name, HYPERPARAMS)
    }
}
