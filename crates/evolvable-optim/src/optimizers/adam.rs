//! Adam optimizer (Adaptive Moment Estimation).
//!
//! Adam combines the benefits of AdaGrad and RMSProp by maintaining both
//! first-order (momentum) and second-order moment estimates of gradients.
//!
//! Reference: Kingma & Ba, "Adam: A Method for Stochastic Optimization", ICLR 2015

use super::common::{borrow_module, AttrValue, GroupCore, Optimizer, OptimizerState, ParamGroup};
use crate::OptimResult;

pub(crate) const SLOTS: &[&str] = &["exp_avg", "exp_avg_sq"];
pub(crate) const HYPERPARAMS: &[&str] = &["lr", "betas", "eps", "weight_decay"];

/// Adam optimizer.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    core: GroupCore,
}

impl AdamOptimizer {
    /// Create a new Adam optimizer over the given parameter groups.
    pub fn new(groups: Vec<ParamGroup>) -> OptimResult<Self> {
        Ok(Self {
            core: GroupCore::new(groups)?,
        })
    }
}

/// One Adam update over every group of `core`.
///
/// With `decoupled` set, weight decay shrinks parameters directly (AdamW) instead
/// of being folded into the gradient. Gradients of every group are gathered
/// before anything is updated.
pub(crate) fn adam_step(core: &mut GroupCore, decoupled: bool) -> OptimResult<()> {
    let all_gradients = core.prepare_gradients()?;
    core.t = core.t.saturating_add(1);
    let t = core.t as f64;

    for (i, ((group, buffers), gradients)) in core
        .groups
        .iter()
        .zip(core.buffers.iter_mut())
        .zip(all_gradients)
        .enumerate()
    {
        let config = &group.config;
        let (beta1, beta2, eps) = (config.beta1, config.beta2, config.epsilon);
        let lr_t = config.learning_rate * (1.0 - beta2.powf(t)).sqrt() / (1.0 - beta1.powf(t));

        let mut module = borrow_module(group, i)?;

        for (name, param) in module.parameters_mut().iter_mut() {
            let mut grad = gradients[name].clone();
            if config.weight_decay != 0.0 {
                if decoupled {
                    param.mapv_inplace(|p| p * (1.0 - config.learning_rate * config.weight_decay));
                } else {
                    grad = grad + &(&*param * config.weight_decay);
                }
            }

            let m = buffers.entry("exp_avg", name, param);
            *m = &*m * beta1 + &(&grad * (1.0 - beta1));
            let m = m.clone();

            let v = buffers.entry("exp_avg_sq", name, param);
            *v = &*v * beta2 + &(grad.mapv(|g| g * g) * (1.0 - beta2));

            let update = m.mapv(|m_val| m_val * lr_t) / &v.mapv(|v_val| v_val.sqrt() + eps);
            *param = &*param - &update;
        }
    }

    Ok(())
}

impl Optimizer for AdamOptimizer {
    fn name(&self) -> &'static str {
        "adam"
    }

    fn param_groups(&self) -> &[ParamGroup] {
        &self.core.groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.core.groups
    }

    fn step(&mut self) -> OptimResult<()> {
        adam_step(&mut self.core, false)
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
