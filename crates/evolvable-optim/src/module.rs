//! Trainable module interface and shared module handles.
//!
//! Modules are owned by the individual that evolves them. Optimizers and the
//! [`OptimizerWrapper`](crate::OptimizerWrapper) only hold [`SharedModule`]
//! handles, and two handles are considered the same binding only when they point
//! at the same allocation.

use crate::{OptimError, OptimResult};
use scirs2_core::ndarray::{Array, ArrayView, Ix2};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared, non-owning handle to a trainable module.
pub type SharedModule = Rc<RefCell<dyn TrainableModule>>;

/// A list of modules whose own identity matters (multi-agent owners keep the whole
/// list under a single field).
pub type SharedModuleList = Rc<Vec<SharedModule>>;

/// Trait for modules exposing trainable parameters.
///
/// Parameters and gradients are keyed by name. The parameter map may be empty.
pub trait TrainableModule {
    /// Get a reference to the module's parameters.
    fn parameters(&self) -> &HashMap<String, Array<f64, Ix2>>;

    /// Get a mutable reference to the module's parameters.
    fn parameters_mut(&mut self) -> &mut HashMap<String, Array<f64, Ix2>>;

    /// Get a reference to the accumulated gradients.
    fn gradients(&self) -> &HashMap<String, Array<f64, Ix2>>;

    /// Get a mutable reference to the accumulated gradients.
    fn gradients_mut(&mut self) -> &mut HashMap<String, Array<f64, Ix2>>;

    /// Get the number of scalar parameters in the module.
    fn num_parameters(&self) -> usize {
        self.parameters().values().map(|p| p.len()).sum()
    }

    /// Reset every gradient buffer to zero.
    fn zero_grad(&mut self) {
        for grad in self.gradients_mut().values_mut() {
            grad.fill(0.0);
        }
    }

    /// Save parameters to a dictionary.
    fn state_dict(&self) -> HashMap<String, Vec<f64>> {
        self.parameters()
            .iter()
            .map(|(name, param)| (name.clone(), param.iter().copied().collect()))
            .collect()
    }

    /// Load parameters from a dictionary.
    fn load_state_dict(&mut self, state: HashMap<String, Vec<f64>>) -> OptimResult<()> {
        let parameters = self.parameters_mut();

        for (name, values) in state {
            let param = parameters.get_mut(&name).ok_or_else(|| {
                OptimError::ConfigurationError(format!("Parameter '{}' not found in module", name))
            })?;
            if param.len() != values.len() {
                return Err(OptimError::ConfigurationError(format!(
                    "Parameter '{}' size mismatch: expected {}, got {}",
                    name,
                    param.len(),
                    values.len()
                )));
            }
            for (p, v) in param.iter_mut().zip(values.iter()) {
                *p = *v;
            }
        }

        Ok(())
    }
}

/// Wrap a module into a shared handle.
pub fn share<M: TrainableModule + 'static>(module: M) -> Rc<RefCell<M>> {
    Rc::new(RefCell::new(module))
}

/// Coerce a concrete module handle into a [`SharedModule`] with the same identity.
pub fn as_shared<M: TrainableModule + 'static>(module: &Rc<RefCell<M>>) -> SharedModule {
    module.clone()
}

/// Identity of a shared module: the address of its allocation.
///
/// Vtable metadata is discarded so that handles coerced from different concrete
/// types still compare by allocation only.
pub fn module_id(module: &SharedModule) -> usize {
    Rc::as_ptr(module) as *const () as usize
}

/// Whether two handles point at the same module.
pub fn same_module(a: &SharedModule, b: &SharedModule) -> bool {
    module_id(a) == module_id(b)
}

/// Whether two list handles are the same list object.
pub fn same_module_list(a: &SharedModuleList, b: &SharedModuleList) -> bool {
    Rc::ptr_eq(a, b)
}

/// A dense linear layer, `Y = X @ W + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModule {
    parameters: HashMap<String, Array<f64, Ix2>>,
    gradients: HashMap<String, Array<f64, Ix2>>,
    input_dim: usize,
    output_dim: usize,
}

impl LinearModule {
    /// Create a new linear module with zero-initialised weights.
    ///
    /// # Arguments
    /// * `input_dim` - Input dimension
    /// * `output_dim` - Output dimension
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        let mut parameters = HashMap::new();
        parameters.insert("weight".to_string(), Array::zeros((input_dim, output_dim)));
        parameters.insert("bias".to_string(), Array::zeros((1, output_dim)));

        let gradients = parameters
            .iter()
            .map(|(name, p)| (name.clone(), Array::zeros(p.raw_dim())))
            .collect();

        Self {
            parameters,
            gradients,
            input_dim,
            output_dim,
        }
    }

    /// Create a linear module with every parameter entry set to `value`.
    pub fn filled(input_dim: usize, output_dim: usize, value: f64) -> Self {
        let mut module = Self::new(input_dim, output_dim);
        for param in module.parameters.values_mut() {
            param.fill(value);
        }
        module
    }

    /// Get input dimension.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Get output dimension.
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Overwrite the gradient buffer of one parameter.
    pub fn set_gradient(&mut self, name: &str, grad: Array<f64, Ix2>) -> OptimResult<()> {
        let param = self.parameters.get(name).ok_or_else(|| {
            OptimError::ConfigurationError(format!("Parameter '{}' not found in module", name))
        })?;
        if param.raw_dim() != grad.raw_dim() {
            return Err(OptimError::ConfigurationError(format!(
                "Gradient shape {:?} does not match parameter '{}' shape {:?}",
                grad.shape(),
                name,
                param.shape()
            )));
        }
        self.gradients.insert(name.to_string(), grad);
        Ok(())
    }

    /// Set every gradient entry of every parameter to `value`.
    pub fn fill_gradients(&mut self, value: f64) {
        for grad in self.gradients.values_mut() {
            grad.fill(value);
        }
    }

    /// Forward pass.
    pub fn forward(&self, input: &ArrayView<f64, Ix2>) -> OptimResult<Array<f64, Ix2>> {
        let weights = self
            .parameters
            .get("weight")
            .ok_or_else(|| OptimError::ConfigurationError("weight not found".to_string()))?;
        let biases = self
            .parameters
            .get("bias")
            .ok_or_else(|| OptimError::ConfigurationError("bias not found".to_string()))?;

        Ok(input.dot(weights) + biases)
    }
}

impl TrainableModule for LinearModule {
    fn parameters(&self) -> &HashMap<String, Array<f64, Ix2>> {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut HashMap<String, Array<f64, Ix2>> {
        &mut self.parameters
    }

    fn gradients(&self) -> &HashMap<String, Array<f64, Ix2>> {
        &self.gradients
    }

    fn gradients_mut(&mut self) -> &mut HashMap<String, Array<f64, Ix2>> {
        &mut self.gradients
    }
}
