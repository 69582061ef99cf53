//! Common optimizer utilities and traits.

use crate::module::{SharedModule, TrainableModule};
use crate::{OptimError, OptimResult};
use scirs2_core::ndarray::{Array, Ix2};
use serde::{Deserialize, Serialize};
use std::cell::RefMut;
use std::collections::{BTreeMap, HashMap};

/// Compute the global L2 norm of all gradients.
///
/// # Arguments
/// * `gradients` - Gradients for all parameters
///
/// # Returns
/// The L2 norm of all gradients combined
pub fn compute_gradient_norm(gradients: &HashMap<String, Array<f64, Ix2>>) -> f64 {
    let mut total_norm_sq = 0.0;

    for grad in gradients.values() {
        for &g in grad.iter() {
            total_norm_sq += g * g;
        }
    }

    total_norm_sq.sqrt()
}

/// Gradient clipping mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradClipMode {
    /// Clip by value (element-wise).
    Value,
    /// Clip by global L2 norm.
    Norm,
}

/// Complete hyper-parameter set of one parameter group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Learning rate.
    pub learning_rate: f64,
    /// Momentum (for SGD).
    pub momentum: f64,
    /// Beta1 (for Adam/AdamW).
    pub beta1: f64,
    /// Beta2 (for Adam/AdamW).
    pub beta2: f64,
    /// Epsilon for numerical stability.
    pub epsilon: f64,
    /// Weight decay. Coupled L2 for SGD and Adam, decoupled for AdamW.
    pub weight_decay: f64,
    /// Gradient clipping threshold (None = no clipping).
    pub grad_clip: Option<f64>,
    /// Gradient clipping mode.
    pub grad_clip_mode: GradClipMode,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            momentum: 0.9,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            weight_decay: 0.0,
            grad_clip: None,
            grad_clip_mode: GradClipMode::Value,
        }
    }
}

/// Keyword configuration for an optimizer: a partial override of [`OptimizerConfig`].
///
/// Unset fields fall back to the group default when merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerKwargs {
    #[serde(skip_serializing_if = "Option::is_none", alias = "learning_rate")]
    pub lr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub betas: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "epsilon")]
    pub eps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_decay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grad_clip: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grad_clip_mode: Option<GradClipMode>,
}

impl OptimizerKwargs {
    /// Empty kwargs: every hyper-parameter takes its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the learning rate.
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = Some(lr);
        self
    }

    /// Set SGD momentum.
    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = Some(momentum);
        self
    }

    /// Set Adam betas.
    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.betas = Some((beta1, beta2));
        self
    }

    /// Set epsilon.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = Some(eps);
        self
    }

    /// Set weight decay.
    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = Some(weight_decay);
        self
    }

    /// Enable gradient clipping.
    pub fn with_grad_clip(mut self, threshold: f64, mode: GradClipMode) -> Self {
        self.grad_clip = Some(threshold);
        self.grad_clip_mode = Some(mode);
        self
    }

    /// Overlay these kwargs onto `base`.
    pub fn merge_onto(&self, base: &OptimizerConfig) -> OptimizerConfig {
        let mut config = base.clone();
        if let Some(lr) = self.lr {
            config.learning_rate = lr;
        }
        if let Some(momentum) = self.momentum {
            config.momentum = momentum;
        }
        if let Some((beta1, beta2)) = self.betas {
            config.beta1 = beta1;
            config.beta2 = beta2;
        }
        if let Some(eps) = self.eps {
            config.epsilon = eps;
        }
        if let Some(weight_decay) = self.weight_decay {
            config.weight_decay = weight_decay;
        }
        if self.grad_clip.is_some() {
            config.grad_clip = self.grad_clip;
        }
        if let Some(mode) = self.grad_clip_mode {
            config.grad_clip_mode = mode;
        }
        config
    }

    /// Merge onto [`OptimizerConfig::default`].
    pub fn to_config(&self) -> OptimizerConfig {
        self.merge_onto(&OptimizerConfig::default())
    }
}

/// Value of an optimizer-native attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Float(f64),
    Int(i64),
    Pair(f64, f64),
}

/// The parameters of one module plus that group's hyper-parameters.
#[derive(Clone)]
pub struct ParamGroup {
    pub module: SharedModule,
    pub config: OptimizerConfig,
}

impl ParamGroup {
    pub fn new(module: SharedModule, config: OptimizerConfig) -> Self {
        Self { module, config }
    }
}

impl std::fmt::Debug for ParamGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamGroup")
            .field("module", &crate::module::module_id(&self.module))
            .field("config", &self.config)
            .finish()
    }
}

/// Serialized state of one parameter group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGroupState {
    pub config: OptimizerConfig,
    /// Slot name (e.g. `exp_avg`) -> parameter name -> flattened buffer.
    pub slots: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
}

/// Serialized optimizer state, the optimizer-native state mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    /// Name of the optimizer that produced this state.
    pub optimizer: String,
    /// Number of steps taken.
    pub step: u64,
    pub param_groups: Vec<ParamGroupState>,
}

/// Trait for optimizers bound to parameter groups.
pub trait Optimizer {
    /// Short name of the algorithm, e.g. `"adam"`.
    fn name(&self) -> &'static str;

    /// The parameter groups this optimizer updates.
    fn param_groups(&self) -> &[ParamGroup];

    /// Mutable access to the parameter groups' hyper-parameters.
    fn param_groups_mut(&mut self) -> &mut [ParamGroup];

    /// Update every bound parameter from its gradient buffer.
    ///
    /// Either every group is updated or, on error, nothing changes.
    fn step(&mut self) -> OptimResult<()>;

    /// Check that [`step`](Self::step) would succeed, without updating anything.
    fn check_step(&self) -> OptimResult<()>;

    /// Zero the gradient buffers of every bound module.
    ///
    /// Fails with `OptimizerError` if a module is borrowed elsewhere, in which
    /// case no gradients are zeroed.
    fn zero_grad(&mut self) -> OptimResult<()>;

    /// Get current learning rate (of the first group).
    fn get_lr(&self) -> f64 {
        self.param_groups()
            .first()
            .map(|g| g.config.learning_rate)
            .unwrap_or_default()
    }

    /// Set learning rate of every group.
    fn set_lr(&mut self, lr: f64) {
        for group in self.param_groups_mut() {
            group.config.learning_rate = lr;
        }
    }

    /// Get optimizer state for checkpointing.
    fn state_dict(&self) -> OptimizerState;

    /// Check that `state` can be loaded without mutating anything.
    fn validate_state(&self, state: &OptimizerState) -> OptimResult<()>;

    /// Load optimizer state from checkpoint. Nothing changes on error.
    fn load_state_dict(&mut self, state: OptimizerState) -> OptimResult<()>;

    /// Look up an optimizer-native attribute by name.
    fn attribute(&self, name: &str) -> Option<AttrValue>;
}

/// Per-group moment buffers, keyed by slot then parameter name.
#[derive(Debug, Clone, Default)]
pub(crate) struct SlotBuffers {
    slots: BTreeMap<String, HashMap<String, Array<f64, Ix2>>>,
}

impl SlotBuffers {
    /// Get a buffer, creating it with zeros in the parameter's shape.
    pub(crate) fn entry(
        &mut self,
        slot: &str,
        name: &str,
        like: &Array<f64, Ix2>,
    ) -> &mut Array<f64, Ix2> {
        self.slots
            .entry(slot.to_string())
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| Array::zeros(like.raw_dim()))
    }

    fn to_state(&self) -> BTreeMap<String, BTreeMap<String, Vec<f64>>> {
        self.slots
            .iter()
            .map(|(slot, buffers)| {
                let flat = buffers
                    .iter()
                    .map(|(name, buf)| (name.clone(), buf.iter().copied().collect()))
                    .collect();
                (slot.clone(), flat)
            })
            .collect()
    }
}

/// State shared by every grouped optimizer: groups, their buffers and the step count.
#[derive(Debug, Clone)]
pub(crate) struct GroupCore {
    pub(crate) groups: Vec<ParamGroup>,
    pub(crate) buffers: Vec<SlotBuffers>,
    pub(crate) t: u64,
}

impl GroupCore {
    pub(crate) fn new(groups: Vec<ParamGroup>) -> OptimResult<Self> {
        if groups.is_empty() {
            return Err(OptimError::ConfigurationError(
                "Optimizer got an empty list of parameter groups".to_string(),
            ));
        }
        let buffers = vec![SlotBuffers::default(); groups.len()];
        Ok(Self {
            groups,
            buffers,
            t: 0,
        })
    }

    pub(crate) fn zero_grad(&mut self) -> OptimResult<()> {
        for (i, group) in self.groups.iter().enumerate() {
            drop(borrow_module(group, i)?);
        }
        for (i, group) in self.groups.iter().enumerate() {
            borrow_module(group, i)?.zero_grad();
        }
        Ok(())
    }

    /// Borrow every group's module and collect its clipped gradients.
    ///
    /// Mutates nothing, so an error here leaves parameters, buffers and the
    /// step count as they were.
    pub(crate) fn prepare_gradients(&self) -> OptimResult<Vec<HashMap<String, Array<f64, Ix2>>>> {
        self.groups
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let module = borrow_module(group, i)?;
                let mut gradients = collect_gradients(&*module)?;
                clip_gradients(&group.config, &mut gradients);
                Ok(gradients)
            })
            .collect()
    }

    pub(crate) fn state_dict(&self, optimizer: &str) -> OptimizerState {
        let param_groups = self
            .groups
            .iter()
            .zip(&self.buffers)
            .map(|(group, buffers)| ParamGroupState {
                config: group.config.clone(),
                slots: buffers.to_state(),
            })
            .collect();

        OptimizerState {
            optimizer: optimizer.to_string(),
            step: self.t,
            param_groups,
        }
    }

    pub(crate) fn validate_state(
        &self,
        optimizer: &str,
        slots: &[&str],
        state: &OptimizerState,
    ) -> OptimResult<()> {
        if state.optimizer != optimizer {
            return Err(OptimError::ConfigurationError(format!(
                "State was produced by '{}' but this optimizer is '{}'",
                state.optimizer, optimizer
            )));
        }
        if state.param_groups.len() != self.groups.len() {
            return Err(OptimError::ConfigurationError(format!(
                "State has {} parameter groups, optimizer has {}",
                state.param_groups.len(),
                self.groups.len()
            )));
        }

        for (i, (group, group_state)) in self.groups.iter().zip(&state.param_groups).enumerate() {
            let module = group.module.try_borrow().map_err(|_| {
                OptimError::OptimizerError(format!("Module of group {} is mutably borrowed", i))
            })?;
            let params = module.parameters();
            for (slot, buffers) in &group_state.slots {
                if !slots.contains(&slot.as_str()) {
                    return Err(OptimError::ConfigurationError(format!(
                        "Unknown state slot '{}' for optimizer '{}'",
                        slot, optimizer
                    )));
                }
                for (name, values) in buffers {
                    let param = params.get(name).ok_or_else(|| {
                        OptimError::ConfigurationError(format!(
                            "State references unknown parameter '{}' in group {}",
                            name, i
                        ))
                    })?;
                    if param.len() != values.len() {
                        return Err(OptimError::ConfigurationError(format!(
                            "State buffer '{}/{}' size mismatch: expected {}, got {}",
                            slot,
                            name,
                            param.len(),
                            values.len()
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Replace configs, buffers and step count. Call `validate_state` first.
    pub(crate) fn load_validated(&mut self, state: OptimizerState) -> OptimResult<()> {
        let mut buffers = Vec::with_capacity(self.groups.len());
        for (group, group_state) in self.groups.iter().zip(&state.param_groups) {
            let module = group.module.borrow();
            let params = module.parameters();
            let mut slot_buffers = SlotBuffers::default();
            for (slot, flat) in &group_state.slots {
                for (name, values) in flat {
                    let shape = params
                        .get(name)
                        .ok_or_else(|| {
                            OptimError::ConfigurationError(format!(
                                "State references unknown parameter '{}'",
                                name
                            ))
                        })?
                        .raw_dim();
                    let arr = Array::from_shape_vec(shape, values.clone()).map_err(|e| {
                        OptimError::OptimizerError(format!(
                            "Failed to restore buffer '{}/{}': {}",
                            slot, name, e
                        ))
                    })?;
                    slot_buffers
                        .slots
                        .entry(slot.clone())
                        .or_default()
                        .insert(name.clone(), arr);
                }
            }
            buffers.push(slot_buffers);
        }

        for (group, group_state) in self.groups.iter_mut().zip(state.param_groups) {
            group.config = group_state.config;
        }
        self.buffers = buffers;
        self.t = state.step;
        Ok(())
    }

    /// Resolve an attribute among the hyper-parameters this optimizer uses.
    pub(crate) fn attribute(&self, name: &str, hyperparams: &[&str]) -> Option<AttrValue> {
        match name {
            "step" => return Some(AttrValue::Int(self.t as i64)),
            "num_param_groups" => return Some(AttrValue::Int(self.groups.len() as i64)),
            _ => {}
        }
        let key = match name {
            "beta1" | "beta2" => "betas",
            other => other,
        };
        if !hyperparams.contains(&key) {
            return None;
        }
        let config = &self.groups.first()?.config;
        match name {
            "lr" => Some(AttrValue::Float(config.learning_rate)),
            "momentum" => Some(AttrValue::Float(config.momentum)),
            "betas" => Some(AttrValue::Pair(config.beta1, config.beta2)),
            "beta1" => Some(AttrValue::Float(config.beta1)),
            "beta2" => Some(AttrValue::Float(config.beta2)),
            "eps" => Some(AttrValue::Float(config.epsilon)),
            "weight_decay" => Some(AttrValue::Float(config.weight_decay)),
            _ => None,
        }
    }
}

/// Mutably borrow a group's module, reporting an error instead of panicking.
pub(crate) fn borrow_module<'a>(
    group: &'a ParamGroup,
    index: usize,
) -> OptimResult<RefMut<'a, dyn TrainableModule + 'static>> {
    group.module.try_borrow_mut().map_err(|_| {
        OptimError::OptimizerError(format!("Module of group {} is already borrowed", index))
    })
}

/// Copy the gradient of every parameter, failing on a parameter without one
/// or with one of the wrong shape.
pub(crate) fn collect_gradients(
    module: &dyn TrainableModule,
) -> OptimResult<HashMap<String, Array<f64, Ix2>>> {
    let gradients = module.gradients();
    module
        .parameters()
        .iter()
        .map(|(name, param)| {
            let grad = gradients.get(name).ok_or_else(|| {
                OptimError::OptimizerError(format!("Missing gradient for parameter: {}", name))
            })?;
            if grad.raw_dim() != param.raw_dim() {
                return Err(OptimError::OptimizerError(format!(
                    "Gradient shape {:?} does not match parameter '{}' shape {:?}",
                    grad.shape(),
                    name,
                    param.shape()
                )));
            }
            Ok((name.clone(), grad.clone()))
        })
        .collect()
}

/// Apply gradient clipping if configured.
pub(crate) fn clip_gradients(
    config: &OptimizerConfig,
    gradients: &mut HashMap<String, Array<f64, Ix2>>,
) {
    if let Some(clip_value) = config.grad_clip {
        match config.grad_clip_mode {
            GradClipMode::Value => {
                for grad in gradients.values_mut() {
                    grad.mapv_inplace(|g| g.max(-clip_value).min(clip_value));
                }
            }
            GradClipMode::Norm => {
                let total_norm = compute_gradient_norm(gradients);
                if total_norm > clip_value {
                    let scale = clip_value / total_norm;
                    for grad in gradients.values_mut() {
                        grad.mapv_inplace(|g| g * scale);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{as_shared, share, LinearModule};
    use scirs2_core::ndarray::array;

    #[test]
    fn test_kwargs_merge_onto_defaults() {
        let kwargs = OptimizerKwargs::new().with_lr(0.1).with_betas(0.8, 0.9);
        let config = kwargs.to_config();
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.beta1, 0.8);
        assert_eq!(config.beta2, 0.9);
        assert_eq!(config.epsilon, OptimizerConfig::default().epsilon);
    }

    #[test]
    fn test_kwargs_from_json() {
        let kwargs: OptimizerKwargs =
            serde_json::from_str(r#"{"lr": 0.01, "weight_decay": 0.1}"#).unwrap();
        assert_eq!(kwargs, OptimizerKwargs::new().with_lr(0.01).with_weight_decay(0.1));
        assert!(serde_json::from_str::<OptimizerKwargs>(r#"{"lrr": 0.01}"#).is_err());
    }

    #[test]
    fn test_collect_gradients_rejects_bad_shape() {
        let mut module = LinearModule::new(2, 2);
        module
            .gradients_mut()
            .insert("bias".to_string(), array![[1.0, 2.0, 3.0]]);
        let err = collect_gradients(&module).unwrap_err();
        assert!(matches!(err, OptimError::OptimizerError(msg) if msg.contains("bias")));
    }

    #[test]
    fn test_zero_grad_is_all_or_nothing() {
        let a = share(LinearModule::new(1, 1));
        let b = share(LinearModule::new(1, 1));
        a.borrow_mut().fill_gradients(1.0);
        b.borrow_mut().fill_gradients(1.0);
        let config = OptimizerConfig::default();
        let mut core = GroupCore::new(vec![
            ParamGroup::new(as_shared(&a), config.clone()),
            ParamGroup::new(as_shared(&b), config),
        ])
        .unwrap();

        {
            let _held = b.borrow();
            assert!(matches!(core.zero_grad(), Err(OptimError::OptimizerError(_))));
        }
        assert!(a.borrow().gradients()["weight"].iter().all(|&g| g == 1.0));

        core.zero_grad().unwrap();
        assert!(a.borrow().gradients()["weight"].iter().all(|&g| g == 0.0));
        assert!(b.borrow().gradients()["weight"].iter().all(|&g| g == 0.0));
    }

    #[test]
    fn test_clip_by_norm() {
        let config = OptimizerConfig {
            grad_clip: Some(1.0),
            grad_clip_mode: GradClipMode::Norm,
            ..Default::default()
        };
        let mut grads = HashMap::new();
        grads.insert("w".to_string(), array![[3.0, 4.0]]);
        clip_gradients(&config, &mut grads);
        assert!((compute_gradient_norm(&grads) - 1.0).abs() < 1e-12);
    }
}
