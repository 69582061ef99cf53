//! Selection and construction of the optimizer topology.
//!
//! A wrapper binds its networks in one of three shapes:
//! - [`Topology::PerNetwork`]: one optimizer per network (multi-agent).
//! - [`Topology::Pooled`]: one optimizer over one parameter group per network.
//! - [`Topology::Single`]: one optimizer over one network.
//!
//! All validation happens before any optimizer is constructed.

use crate::module::SharedModule;
use crate::optimizers::{Optimizer, OptimizerConfig, OptimizerKind, OptimizerKwargs, ParamGroup};
use crate::{OptimError, OptimResult};
use serde::{Deserialize, Serialize};

/// A value given once for every network, or once per network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptimizerSpec<T> {
    Shared(T),
    PerNetwork(Vec<T>),
}

impl<T> OptimizerSpec<T> {
    /// One value per network, in network order.
    pub fn per_network(values: Vec<T>) -> Self {
        OptimizerSpec::PerNetwork(values)
    }

    /// The value for network `index`.
    pub fn for_network(&self, index: usize) -> Option<&T> {
        match self {
            OptimizerSpec::Shared(value) => Some(value),
            OptimizerSpec::PerNetwork(values) => values.get(index),
        }
    }

    /// The shared value, or `TypeMismatch` naming `what` for a per-network list.
    pub fn shared(&self, what: &str, topology: Topology) -> OptimResult<&T> {
        match self {
            OptimizerSpec::Shared(value) => Ok(value),
            OptimizerSpec::PerNetwork(_) => Err(OptimError::TypeMismatch(format!(
                "Expected a single {} for the {} topology, got a per-network list",
                what, topology
            ))),
        }
    }

    fn check_len(&self, what: &str, expected: usize) -> OptimResult<()> {
        match self {
            OptimizerSpec::PerNetwork(values) if values.len() != expected => {
                Err(OptimError::ConfigurationError(format!(
                    "Got {} {} entries for {} networks",
                    values.len(),
                    what,
                    expected
                )))
            }
            _ => Ok(()),
        }
    }
}

impl<T> From<T> for OptimizerSpec<T> {
    fn from(value: T) -> Self {
        OptimizerSpec::Shared(value)
    }
}

/// Binding shape between networks and optimizer instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    PerNetwork,
    Pooled,
    Single,
}

impl Topology {
    /// Pick the topology from the shape of the inputs.
    ///
    /// Multi-agent always means one optimizer per network. Otherwise several
    /// networks under several names are pooled, and anything else is single.
    pub fn infer(multiagent: bool, num_networks: usize, num_names: usize) -> Self {
        if multiagent {
            Topology::PerNetwork
        } else if num_networks > 1 && num_names > 1 {
            Topology::Pooled
        } else {
            Topology::Single
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::PerNetwork => "per_network",
            Topology::Pooled => "pooled",
            Topology::Single => "single",
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The optimizer(s) held by a wrapper.
pub enum BoundOptimizers {
    One(Box<dyn Optimizer>),
    PerNetwork(Vec<Box<dyn Optimizer>>),
}

impl BoundOptimizers {
    /// Number of optimizer instances.
    pub fn len(&self) -> usize {
        match self {
            BoundOptimizers::One(_) => 1,
            BoundOptimizers::PerNetwork(optimizers) => optimizers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every instance in order, whatever the topology.
    pub fn all(&self) -> Vec<&dyn Optimizer> {
        match self {
            BoundOptimizers::One(optimizer) => vec![optimizer.as_ref()],
            BoundOptimizers::PerNetwork(optimizers) => {
                optimizers.iter().map(|o| o.as_ref()).collect()
            }
        }
    }
}

/// Check that `topology` can be built from these inputs.
pub fn validate(
    topology: Topology,
    class: &OptimizerSpec<OptimizerKind>,
    kwargs: &OptimizerSpec<OptimizerKwargs>,
    num_networks: usize,
    num_names: usize,
) -> OptimResult<()> {
    if num_networks == 0 {
        return Err(OptimError::ConfigurationError(
            "Expected at least one network".to_string(),
        ));
    }

    match topology {
        Topology::PerNetwork => {
            class.check_len("optimizer class", num_networks)?;
            kwargs.check_len("optimizer kwargs", num_networks)?;
        }
        Topology::Pooled => {
            if num_networks != num_names {
                return Err(OptimError::ConfigurationError(format!(
                    "Number of networks ({}) and network attribute names ({}) do not match",
                    num_networks, num_names
                )));
            }
            class.shared("optimizer class", topology)?;
            kwargs.check_len("optimizer kwargs", num_networks)?;
        }
        Topology::Single => {
            class.shared("optimizer class", topology)?;
            kwargs.shared("optimizer kwargs mapping", topology)?;
            if num_networks != 1 {
                return Err(OptimError::ConfigurationError(format!(
                    "The single topology binds exactly one network, got {}",
                    num_networks
                )));
            }
        }
    }

    Ok(())
}

/// Construct the optimizer(s) for a validated topology.
pub fn build(
    topology: Topology,
    class: &OptimizerSpec<OptimizerKind>,
    kwargs: &OptimizerSpec<OptimizerKwargs>,
    networks: &[SharedModule],
    num_names: usize,
) -> OptimResult<BoundOptimizers> {
    validate(topology, class, kwargs, networks.len(), num_names)?;
    let defaults = OptimizerConfig::default();

    let bound = match topology {
        Topology::PerNetwork => {
            let mut optimizers = Vec::with_capacity(networks.len());
            for (i, net) in networks.iter().enumerate() {
                let kind = spec_at(class, i)?;
                let config = spec_at(kwargs, i)?.merge_onto(&defaults);
                optimizers.push(kind.build(vec![ParamGroup::new(net.clone(), config)])?);
            }
            BoundOptimizers::PerNetwork(optimizers)
        }
        Topology::Pooled => {
            let kind = class.shared("optimizer class", topology)?;
            let mut groups = Vec::with_capacity(networks.len());
            for (i, net) in networks.iter().enumerate() {
                let config = spec_at(kwargs, i)?.merge_onto(&defaults);
                groups.push(ParamGroup::new(net.clone(), config));
            }
            BoundOptimizers::One(kind.build(groups)?)
        }
        Topology::Single => {
            let kind = class.shared("optimizer class", topology)?;
            let config = kwargs
                .shared("optimizer kwargs mapping", topology)?
                .merge_onto(&defaults);
            BoundOptimizers::One(kind.build(vec![ParamGroup::new(networks[0].clone(), config)])?)
        }
    };

    tracing::debug!(
        topology = %topology,
        networks = networks.len(),
        optimizers = bound.len(),
        "Built optimizer topology"
    );

    Ok(bound)
}

fn spec_at<T>(spec: &OptimizerSpec<T>, index: usize) -> OptimResult<&T> {
    spec.for_network(index).ok_or_else(|| {
        OptimError::ConfigurationError(format!("No optimizer spec for network {}", index))
    })
}
