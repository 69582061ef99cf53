//! SGD optimizer with momentum.

use super::common::{borrow_module, AttrValue, GroupCore, Optimizer, OptimizerState, ParamGroup};
use crate::OptimResult;

const SLOTS: &[&str] = &["velocity"];
const HYPERPARAMS: &[&str] = &["lr", "momentum", "weight_decay"];

/// SGD optimizer with momentum.
#[derive(Debug, Clone)]
pub struct SgdOptimizer {
    core: GroupCore,
}

impl SgdOptimizer {
    /// Create a new SGD optimizer over the given parameter groups.
    pub fn new(groups: Vec<ParamGroup>) -> OptimResult<Self> {
        Ok(Self {
            core: GroupCore::new(groups)?,
        })
    }
}

impl Optimizer for SgdOptimizer {
    fn name(&self) -> &'static str {
        "sgd"
    }

    fn param_groups(&self) -> &[ParamGroup] {
        &self.core.groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.core.groups
    }

    fn step(&mut self) -> OptimResult<()> {
        let all_gradients = self.core.prepare_gradients()?;
        self.core.t = self.core.t.saturating_add(1);

        for (i, ((group, buffers), gradients)) in self
            .core
            .groups
            .iter()
            .zip(self.core.buffers.iter_mut())
            .zip(all_gradients)
            .enumerate()
        {
            let config = &group.config;
            let mut module = borrow_module(group, i)?;

            for (name, param) in module.parameters_mut().iter_mut() {
                let mut grad = gradients[name].clone();
                if config.weight_decay != 0.0 {
                    grad = grad + &(&*param * config.weight_decay);
                }

                // v = momentum * v + lr * grad
                let velocity = buffers.entry("velocity", name, param);
                velocity.mapv_inplace(|v| config.momentum * v);
                *velocity = &*velocity + &(grad * config.learning_rate);

                *param = &*param - &*velocity;
            }
        }

        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{share, LinearModule, SharedModule, TrainableModule};
    use crate::optimizers::common::{GradClipMode, OptimizerConfig};

    fn group(module: &SharedModule, config: OptimizerConfig) -> ParamGroup {
        ParamGroup::new(module.clone(), config)
    }

    #[test]
    fn test_sgd_optimizer() {
        let linear = share(LinearModule::filled(1, 2, 1.0));
        linear.borrow_mut().fill_gradients(0.1);
        let module: SharedModule = linear.clone();

        let config = OptimizerConfig {
            learning_rate: 0.1,
            momentum: 0.9,
            ..Default::default()
        };
        let mut optimizer = SgdOptimizer::new(vec![group(&module, config)]).unwrap();
        optimizer.step().unwrap();

        let w = linear.borrow().parameters()["weight"].clone();
        assert!(w[[0, 0]] < 1.0);
        assert!(w[[0, 1]] < 1.0);

        let state = optimizer.state_dict();
        assert_eq!(state.step, 1);
        assert!(state.param_groups[0].slots["velocity"].contains_key("weight"));
    }

    #[test]
    fn test_gradient_clipping() {
        let linear = share(LinearModule::filled(1, 1, 1.0));
        linear.borrow_mut().fill_gradients(1.0);
        let module: SharedModule = linear.clone();

        let config = OptimizerConfig {
            learning_rate: 0.1,
            grad_clip: Some(0.05),
            grad_clip_mode: GradClipMode::Value,
            ..Default::default()
        };
        let mut optimizer = SgdOptimizer::new(vec![group(&module, config)]).unwrap();
        optimizer.step().unwrap();

        let w = linear.borrow().parameters()["weight"][[0, 0]];
        assert!((w - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_missing_gradient() {
        let linear = share(LinearModule::new(1, 1));
        linear.borrow_mut().gradients_mut().remove("bias");
        let module: SharedModule = linear;

        let mut optimizer =
            SgdOptimizer::new(vec![group(&module, OptimizerConfig::default())]).unwrap();
        assert!(optimizer.step().is_err());
        assert_eq!(optimizer.state_dict().step, 0);
    }

    #[test]
    fn test_borrowed_module_fails_step_before_any_update() {
        let a = share(LinearModule::filled(1, 1, 1.0));
        let b = share(LinearModule::filled(1, 1, 1.0));
        a.borrow_mut().fill_gradients(1.0);
        b.borrow_mut().fill_gradients(1.0);
        let (a_shared, b_shared): (SharedModule, SharedModule) = (a.clone(), b.clone());
        let mut optimizer = SgdOptimizer::new(vec![
            group(&a_shared, OptimizerConfig::default()),
            group(&b_shared, OptimizerConfig::default()),
        ])
        .unwrap();

        let held = b.borrow();
        assert!(optimizer.step().is_err());
        drop(held);

        assert_eq!(a.borrow().parameters()["weight"][[0, 0]], 1.0);
        assert!(optimizer.state_dict().param_groups[0].slots.is_empty());
        optimizer.step().unwrap();
        assert!(a.borrow().parameters()["weight"][[0, 0]] < 1.0);
    }

    #[test]
    fn test_attributes() {
        let module: SharedModule = share(LinearModule::new(1, 1));
        let optimizer =
            SgdOptimizer::new(vec![group(&module, OptimizerConfig::default())]).unwrap();
        assert_eq!(optimizer.attribute("momentum"), Some(AttrValue::Float(0.9)));
        assert_eq!(optimizer.attribute("betas"), None);
        assert_eq!(optimizer.attribute("step"), Some(AttrValue::Int(0)));
    }
}
