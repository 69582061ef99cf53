//! The optimizer wrapper owned by an evolvable individual.
//!
//! [`OptimizerWrapper`] binds one or more optimizers to the networks of an
//! individual and records which owner fields those networks live in, so the
//! optimizer can be rebuilt consistently after the individual is cloned or
//! mutated. Every call after construction is plain delegation.

use crate::module::{SharedModule, SharedModuleList};
use crate::optimizers::{AttrValue, Optimizer, OptimizerKind, OptimizerKwargs, OptimizerState};
use crate::resolver::{resolve_network_names, NetworkContainer, Networks};
use crate::topology::{self, BoundOptimizers, OptimizerSpec, Topology};
use crate::{OptimError, OptimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Serialized wrapper state: one optimizer mapping, or one per network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateDict {
    Single(OptimizerState),
    PerNetwork(Vec<OptimizerState>),
}

impl StateDict {
    fn shape(&self) -> &'static str {
        match self {
            StateDict::Single(_) => "a single optimizer state",
            StateDict::PerNetwork(_) => "a list of optimizer states",
        }
    }
}

/// Optimizer(s) bound to an individual's networks.
pub struct OptimizerWrapper {
    networks: Vec<SharedModule>,
    network_names: Vec<String>,
    topology: Topology,
    multiagent: bool,
    optimizer_class: OptimizerSpec<OptimizerKind>,
    optimizer_kwargs: OptimizerSpec<OptimizerKwargs>,
    optimizer: BoundOptimizers,
}

/// Builder for [`OptimizerWrapper`].
pub struct OptimizerWrapperBuilder<'a> {
    class: OptimizerSpec<OptimizerKind>,
    networks: Networks,
    kwargs: OptimizerSpec<OptimizerKwargs>,
    network_names: Option<Vec<String>>,
    container: Option<&'a dyn NetworkContainer>,
    multiagent: bool,
    topology: Option<Topology>,
}

impl<'a> OptimizerWrapperBuilder<'a> {
    /// Keyword configuration, shared or per network. Defaults to empty kwargs.
    pub fn kwargs(mut self, kwargs: impl Into<OptimizerSpec<OptimizerKwargs>>) -> Self {
        self.kwargs = kwargs.into();
        self
    }

    /// Explicit owner field names; skips resolution entirely.
    pub fn network_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.network_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Owner whose registered fields are searched for the networks.
    pub fn container(mut self, container: &'a dyn NetworkContainer) -> Self {
        self.container = Some(container);
        self
    }

    /// One optimizer per network.
    pub fn multiagent(mut self, multiagent: bool) -> Self {
        self.multiagent = multiagent;
        self
    }

    /// Request a topology instead of inferring it from the input shapes.
    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = Some(topology);
        self
    }

    /// Resolve names, pick the topology and construct the optimizer(s).
    pub fn build(self) -> OptimResult<OptimizerWrapper> {
        let network_names = match (self.network_names, self.container) {
            (Some(names), _) => names,
            (None, Some(container)) => {
                resolve_network_names(container, &self.networks, self.multiagent)
            }
            (None, None) => {
                return Err(OptimError::ConfigurationError(
                    "Network names were not given and there is no container to resolve them from"
                        .to_string(),
                ))
            }
        };

        if network_names.is_empty() {
            return Err(OptimError::ConfigurationError(
                "No networks found in the parent container".to_string(),
            ));
        }

        let networks = self.networks.to_vec();
        let topology = match self.topology {
            Some(requested) => {
                if self.multiagent && requested != Topology::PerNetwork {
                    return Err(OptimError::ConfigurationError(format!(
                        "Multi-agent optimizers use the per_network topology, not {}",
                        requested
                    )));
                }
                requested
            }
            None => Topology::infer(self.multiagent, networks.len(), network_names.len()),
        };

        let optimizer = topology::build(
            topology,
            &self.class,
            &self.kwargs,
            &networks,
            network_names.len(),
        )?;

        tracing::debug!(
            topology = %topology,
            names = ?network_names,
            "Initialized optimizer wrapper"
        );

        Ok(OptimizerWrapper {
            networks,
            network_names,
            topology,
            multiagent: self.multiagent,
            optimizer_class: self.class,
            optimizer_kwargs: self.kwargs,
            optimizer,
        })
    }
}

impl OptimizerWrapper {
    /// Start building a wrapper over `networks`.
    pub fn builder<'a>(
        class: impl Into<OptimizerSpec<OptimizerKind>>,
        networks: impl Into<Networks>,
    ) -> OptimizerWrapperBuilder<'a> {
        OptimizerWrapperBuilder {
            class: class.into(),
            networks: networks.into(),
            kwargs: OptimizerSpec::Shared(OptimizerKwargs::default()),
            network_names: None,
            container: None,
            multiagent: false,
            topology: None,
        }
    }

    /// One optimizer over one network.
    pub fn single(
        kind: OptimizerKind,
        network: SharedModule,
        kwargs: OptimizerKwargs,
        container: &dyn NetworkContainer,
    ) -> OptimResult<Self> {
        Self::builder(kind, network)
            .kwargs(kwargs)
            .container(container)
            .topology(Topology::Single)
            .build()
    }

    /// One optimizer over a parameter group per network.
    pub fn pooled(
        kind: OptimizerKind,
        networks: Vec<SharedModule>,
        kwargs: impl Into<OptimizerSpec<OptimizerKwargs>>,
        container: &dyn NetworkContainer,
    ) -> OptimResult<Self> {
        Self::builder(kind, networks)
            .kwargs(kwargs)
            .container(container)
            .topology(Topology::Pooled)
            .build()
    }

    /// One optimizer per network of a multi-agent list.
    pub fn per_network(
        class: impl Into<OptimizerSpec<OptimizerKind>>,
        networks: SharedModuleList,
        kwargs: impl Into<OptimizerSpec<OptimizerKwargs>>,
        container: &dyn NetworkContainer,
    ) -> OptimResult<Self> {
        Self::builder(class, networks)
            .kwargs(kwargs)
            .container(container)
            .multiagent(true)
            .build()
    }

    /// Build a fresh wrapper over replacement networks, reusing this wrapper's
    /// classes, kwargs, topology and field names. Names are not re-resolved.
    pub fn reinit(&self, networks: impl Into<Networks>) -> OptimResult<Self> {
        let wrapper = Self::builder(self.optimizer_class.clone(), networks)
            .kwargs(self.optimizer_kwargs.clone())
            .network_names(self.network_names.clone())
            .multiagent(self.multiagent)
            .topology(self.topology)
            .build()?;
        tracing::debug!(names = ?wrapper.network_names, "Reinitialized optimizer wrapper");
        Ok(wrapper)
    }

    /// The bound networks, in binding order.
    pub fn networks(&self) -> &[SharedModule] {
        &self.networks
    }

    /// Owner field names the networks were resolved from.
    pub fn network_names(&self) -> &[String] {
        &self.network_names
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Whether the wrapper was built for a multi-agent network list.
    pub fn is_multiagent(&self) -> bool {
        self.multiagent
    }

    /// Optimizer class the wrapper was built with.
    pub fn optimizer_class(&self) -> &OptimizerSpec<OptimizerKind> {
        &self.optimizer_class
    }

    /// Keyword configuration the wrapper was built with.
    pub fn optimizer_kwargs(&self) -> &OptimizerSpec<OptimizerKwargs> {
        &self.optimizer_kwargs
    }

    /// Number of optimizer instances held.
    pub fn len(&self) -> usize {
        self.optimizer.len()
    }

    /// Always false once built; kept alongside [`len`](Self::len).
    pub fn is_empty(&self) -> bool {
        self.optimizer.is_empty()
    }

    /// Perform a single optimization step on every optimizer.
    ///
    /// Every optimizer is checked first, so on error no parameter, buffer or
    /// step count has changed.
    pub fn step(&mut self) -> OptimResult<()> {
        tracing::trace!(topology = %self.topology, "Optimizer step");
        match &mut self.optimizer {
            BoundOptimizers::One(optimizer) => optimizer.step(),
            BoundOptimizers::PerNetwork(optimizers) => {
                for optimizer in optimizers.iter() {
                    optimizer.check_step()?;
                }
                for optimizer in optimizers.iter_mut() {
                    optimizer.step()?;
                }
                Ok(())
            }
        }
    }

    /// Zero the gradients of every bound network.
    ///
    /// Fails without zeroing anything if a network is borrowed elsewhere.
    pub fn zero_grad(&mut self) -> OptimResult<()> {
        for (i, network) in self.networks.iter().enumerate() {
            if network.try_borrow_mut().is_err() {
                return Err(OptimError::OptimizerError(format!(
                    "Network {} is borrowed elsewhere, gradients not zeroed",
                    i
                )));
            }
        }
        match &mut self.optimizer {
            BoundOptimizers::One(optimizer) => optimizer.zero_grad(),
            BoundOptimizers::PerNetwork(optimizers) => {
                for optimizer in optimizers.iter_mut() {
                    optimizer.zero_grad()?;
                }
                Ok(())
            }
        }
    }

    /// Serialized optimizer state, index-aligned with the networks when per network.
    pub fn state_dict(&self) -> StateDict {
        match &self.optimizer {
            BoundOptimizers::One(optimizer) => StateDict::Single(optimizer.state_dict()),
            BoundOptimizers::PerNetwork(optimizers) => {
                StateDict::PerNetwork(optimizers.iter().map(|o| o.state_dict()).collect())
            }
        }
    }

    /// Load state produced by [`state_dict`](Self::state_dict).
    ///
    /// Every payload is validated before any optimizer is touched, so a failed
    /// load leaves the existing state unchanged.
    pub fn load_state_dict(&mut self, state: StateDict) -> OptimResult<()> {
        match (&mut self.optimizer, state) {
            (BoundOptimizers::One(optimizer), StateDict::Single(state)) => {
                optimizer.load_state_dict(state)?;
            }
            (BoundOptimizers::PerNetwork(optimizers), StateDict::PerNetwork(states)) => {
                if states.len() != optimizers.len() {
                    return Err(OptimError::ConfigurationError(format!(
                        "Expected {} optimizer states for multi-agent optimizers, got {}",
                        optimizers.len(),
                        states.len()
                    )));
                }
                for (optimizer, state) in optimizers.iter().zip(&states) {
                    optimizer.validate_state(state)?;
                }
                for (optimizer, state) in optimizers.iter_mut().zip(states) {
                    optimizer.load_state_dict(state)?;
                }
            }
            (_, state) => {
                return Err(OptimError::TypeMismatch(format!(
                    "The {} topology expects {}, got {}",
                    self.topology,
                    match self.topology {
                        Topology::PerNetwork => "a list of optimizer states",
                        _ => "a single optimizer state",
                    },
                    state.shape()
                )))
            }
        }

        tracing::debug!(topology = %self.topology, "Loaded optimizer state");
        Ok(())
    }

    /// The optimizer at `index` of a per-network wrapper.
    pub fn get(&self, index: usize) -> OptimResult<&dyn Optimizer> {
        match &self.optimizer {
            BoundOptimizers::PerNetwork(optimizers) => optimizers
                .get(index)
                .map(|o| o.as_ref())
                .ok_or_else(|| out_of_range(index, optimizers.len())),
            BoundOptimizers::One(optimizer) => Err(not_indexable(optimizer.name())),
        }
    }

    /// Mutable access to the optimizer at `index` of a per-network wrapper.
    pub fn get_mut(&mut self, index: usize) -> OptimResult<&mut (dyn Optimizer + 'static)> {
        match &mut self.optimizer {
            BoundOptimizers::PerNetwork(optimizers) => {
                let len = optimizers.len();
                optimizers
                    .get_mut(index)
                    .map(|o| o.as_mut())
                    .ok_or_else(|| out_of_range(index, len))
            }
            BoundOptimizers::One(optimizer) => Err(not_indexable(optimizer.name())),
        }
    }

    /// Iterate the optimizers of a per-network wrapper in network order.
    pub fn iter(&self) -> OptimResult<impl Iterator<Item = &dyn Optimizer> + '_> {
        match &self.optimizer {
            BoundOptimizers::PerNetwork(optimizers) => {
                Ok(optimizers.iter().map(|o| o.as_ref() as &dyn Optimizer))
            }
            BoundOptimizers::One(optimizer) => Err(OptimError::UnsupportedOperation(format!(
                "Can't iterate a single {} optimizer",
                optimizer.name()
            ))),
        }
    }

    /// The single underlying optimizer of a pooled or single wrapper.
    pub fn optimizer(&self) -> OptimResult<&dyn Optimizer> {
        match &self.optimizer {
            BoundOptimizers::One(optimizer) => Ok(optimizer.as_ref()),
            BoundOptimizers::PerNetwork(optimizers) => Err(OptimError::AttributeLookup(format!(
                "A per-network wrapper holds a list of {} optimizers, not one",
                optimizers.len()
            ))),
        }
    }

    /// Mutable access to the single underlying optimizer.
    pub fn optimizer_mut(&mut self) -> OptimResult<&mut (dyn Optimizer + 'static)> {
        match &mut self.optimizer {
            BoundOptimizers::One(optimizer) => Ok(optimizer.as_mut()),
            BoundOptimizers::PerNetwork(optimizers) => Err(OptimError::AttributeLookup(format!(
                "A per-network wrapper holds a list of {} optimizers, not one",
                optimizers.len()
            ))),
        }
    }

    /// Forward an attribute lookup to the underlying optimizer.
    pub fn attribute(&self, name: &str) -> OptimResult<AttrValue> {
        match &self.optimizer {
            BoundOptimizers::One(optimizer) => optimizer.attribute(name).ok_or_else(|| {
                OptimError::AttributeLookup(format!(
                    "'{}' optimizer has no attribute '{}'",
                    optimizer.name(),
                    name
                ))
            }),
            BoundOptimizers::PerNetwork(optimizers) => Err(OptimError::AttributeLookup(format!(
                "List of {} optimizers has no attribute '{}'",
                optimizers.len(),
                name
            ))),
        }
    }

    /// Learning rate of the single underlying optimizer.
    pub fn lr(&self) -> OptimResult<f64> {
        Ok(self.optimizer()?.get_lr())
    }

    /// Set the learning rate of every group of every optimizer.
    pub fn set_lr(&mut self, lr: f64) {
        match &mut self.optimizer {
            BoundOptimizers::One(optimizer) => optimizer.set_lr(lr),
            BoundOptimizers::PerNetwork(optimizers) => {
                for optimizer in optimizers.iter_mut() {
                    optimizer.set_lr(lr);
                }
            }
        }
    }
}

fn not_indexable(name: &str) -> OptimError {
    OptimError::UnsupportedOperation(format!("Can't access item of a single {} optimizer", name))
}

fn out_of_range(index: usize, len: usize) -> OptimError {
    OptimError::ConfigurationError(format!(
        "Optimizer index {} out of range for {} optimizers",
        index, len
    ))
}

impl Index<usize> for OptimizerWrapper {
    type Output = dyn Optimizer;

    fn index(&self, index: usize) -> &Self::Output {
        match &self.optimizer {
            BoundOptimizers::PerNetwork(optimizers) => optimizers[index].as_ref(),
            BoundOptimizers::One(optimizer) => panic!("{}", not_indexable(optimizer.name())),
        }
    }
}

impl IndexMut<usize> for OptimizerWrapper {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match &mut self.optimizer {
            BoundOptimizers::PerNetwork(optimizers) => optimizers[index].as_mut(),
            BoundOptimizers::One(optimizer) => panic!("{}", not_indexable(optimizer.name())),
        }
    }
}

impl fmt::Debug for OptimizerWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizerWrapper")
            .field("network_names", &self.network_names)
            .field("topology", &self.topology)
            .field("multiagent", &self.multiagent)
            .field("optimizer_class", &self.optimizer_class)
            .field("optimizers", &self.optimizer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{share, LinearModule, TrainableModule};
    use crate::resolver::FieldRegistry;
    use std::rc::Rc;

    fn net() -> SharedModule {
        share(LinearModule::filled(2, 2, 1.0))
    }

    #[test]
    fn test_resolves_actor_name() {
        let actor = net();
        let owner = FieldRegistry::new().module("actor", &actor);
        let wrapper = OptimizerWrapper::builder(OptimizerKind::Adam, actor)
            .container(&owner)
            .build()
            .unwrap();
        assert_eq!(wrapper.network_names(), ["actor".to_string()]);
        assert_eq!(wrapper.topology(), Topology::Single);
        assert_eq!(wrapper.len(), 1);
    }

    #[test]
    fn test_no_names_fails() {
        let a = net();
        let b = net();
        let owner = FieldRegistry::new().module("x", &a);
        let err = OptimizerWrapper::builder(OptimizerKind::Adam, b)
            .container(&owner)
            .build()
            .unwrap_err();
        assert!(matches!(err, OptimError::ConfigurationError(_)));
    }

    #[test]
    fn test_no_container_and_no_names_fails() {
        let err = OptimizerWrapper::builder(OptimizerKind::Sgd, net())
            .build()
            .unwrap_err();
        assert!(matches!(err, OptimError::ConfigurationError(_)));
    }

    #[test]
    fn test_single_is_not_indexable_or_iterable() {
        let actor = net();
        let owner = FieldRegistry::new().module("actor", &actor);
        let mut wrapper =
            OptimizerWrapper::single(OptimizerKind::Sgd, actor, OptimizerKwargs::new(), &owner)
                .unwrap();
        assert!(matches!(
            wrapper.get(0),
            Err(OptimError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            wrapper.get_mut(0),
            Err(OptimError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            wrapper.iter().map(|it| it.count()),
            Err(OptimError::UnsupportedOperation(_))
        ));
    }

    #[test]
    #[should_panic(expected = "Can't access item")]
    fn test_index_panics_on_single() {
        let actor = net();
        let owner = FieldRegistry::new().module("actor", &actor);
        let wrapper =
            OptimizerWrapper::single(OptimizerKind::Sgd, actor, OptimizerKwargs::new(), &owner)
                .unwrap();
        let _ = wrapper[0].name();
    }

    #[test]
    fn test_per_network_indexing_and_iteration() {
        let agents: SharedModuleList = Rc::new(vec![net(), net()]);
        let owner = FieldRegistry::new().module_list("actors", &agents);
        let kwargs = OptimizerSpec::per_network(vec![
            OptimizerKwargs::new().with_lr(0.1),
            OptimizerKwargs::new().with_lr(0.2),
        ]);
        let mut wrapper =
            OptimizerWrapper::per_network(OptimizerKind::Adam, agents, kwargs, &owner).unwrap();

        assert_eq!(wrapper.topology(), Topology::PerNetwork);
        assert_eq!(wrapper.network_names(), ["actors".to_string()]);
        assert_eq!(wrapper.len(), 2);
        assert_eq!(wrapper[1].get_lr(), 0.2);
        assert_eq!(wrapper.iter().unwrap().count(), 2);
        assert!(matches!(wrapper.get(2), Err(OptimError::ConfigurationError(_))));

        wrapper[0].set_lr(0.05);
        assert_eq!(wrapper.get(0).unwrap().get_lr(), 0.05);

        let err = wrapper.attribute("betas").unwrap_err();
        assert!(matches!(err, OptimError::AttributeLookup(msg) if msg.contains("betas")));
    }

    #[test]
    fn test_attribute_forwarding() {
        let actor = net();
        let owner = FieldRegistry::new().module("actor", &actor);
        let wrapper = OptimizerWrapper::single(
            OptimizerKind::Adam,
            actor,
            OptimizerKwargs::new().with_lr(0.02),
            &owner,
        )
        .unwrap();

        let direct = wrapper.optimizer().unwrap().attribute("lr");
        assert_eq!(wrapper.attribute("lr").ok(), direct);
        assert_eq!(wrapper.lr().unwrap(), 0.02);
        let err = wrapper.attribute("momentum").unwrap_err();
        assert!(matches!(err, OptimError::AttributeLookup(msg) if msg.contains("momentum")));
    }

    #[test]
    fn test_load_shape_mismatch() {
        let actor = net();
        let owner = FieldRegistry::new().module("actor", &actor);
        let mut wrapper =
            OptimizerWrapper::single(OptimizerKind::Adam, actor, OptimizerKwargs::new(), &owner)
                .unwrap();
        let err = wrapper
            .load_state_dict(StateDict::PerNetwork(vec![]))
            .unwrap_err();
        assert!(matches!(err, OptimError::TypeMismatch(_)));
    }

    #[test]
    fn test_zero_grad_reaches_modules() {
        let actor = share(LinearModule::filled(2, 2, 1.0));
        actor.borrow_mut().fill_gradients(0.3);
        let shared: SharedModule = actor.clone();
        let owner = FieldRegistry::new().module("actor", &shared);
        let mut wrapper =
            OptimizerWrapper::single(OptimizerKind::Sgd, shared, OptimizerKwargs::new(), &owner)
                .unwrap();
        wrapper.zero_grad().unwrap();
        assert!(actor
            .borrow()
            .gradients()
            .values()
            .all(|g| g.iter().all(|&v| v == 0.0)));
    }

    #[test]
    fn test_zero_grad_fails_on_borrowed_network() {
        let a = share(LinearModule::filled(1, 1, 1.0));
        let b = share(LinearModule::filled(1, 1, 1.0));
        a.borrow_mut().fill_gradients(0.3);
        let agents: SharedModuleList = Rc::new(vec![a.clone() as SharedModule, b.clone()]);
        let owner = FieldRegistry::new().module_list("agents", &agents);
        let mut wrapper =
            OptimizerWrapper::per_network(OptimizerKind::Sgd, agents, OptimizerKwargs::new(), &owner)
                .unwrap();

        let held = b.borrow();
        let err = wrapper.zero_grad().unwrap_err();
        drop(held);
        assert!(matches!(err, OptimError::OptimizerError(_)));
        assert!(a
            .borrow()
            .gradients()
            .values()
            .all(|g| g.iter().all(|&v| v == 0.3)));
    }

    #[test]
    fn test_per_network_step_is_all_or_nothing() {
        let a = share(LinearModule::filled(1, 1, 1.0));
        let b = share(LinearModule::filled(1, 1, 1.0));
        a.borrow_mut().fill_gradients(1.0);
        b.borrow_mut().gradients_mut().remove("weight");
        let agents: SharedModuleList = Rc::new(vec![a.clone() as SharedModule, b.clone()]);
        let owner = FieldRegistry::new().module_list("agents", &agents);
        let mut wrapper =
            OptimizerWrapper::per_network(OptimizerKind::Adam, agents, OptimizerKwargs::new(), &owner)
                .unwrap();
        let before = wrapper.state_dict();

        assert!(matches!(wrapper.step(), Err(OptimError::OptimizerError(_))));
        assert_eq!(wrapper.state_dict(), before);
        assert_eq!(a.borrow().parameters()["weight"][[0, 0]], 1.0);
    }

    #[test]
    fn test_optimizer_mut_reaches_single_instance() {
        let actor = net();
        let owner = FieldRegistry::new().module("actor", &actor);
        let mut wrapper =
            OptimizerWrapper::single(OptimizerKind::Sgd, actor, OptimizerKwargs::new(), &owner)
                .unwrap();
        wrapper.optimizer_mut().unwrap().param_groups_mut()[0]
            .config
            .momentum = 0.5;
        assert_eq!(wrapper.attribute("momentum").unwrap(), AttrValue::Float(0.5));

        let agents: SharedModuleList = Rc::new(vec![net()]);
        let owner = FieldRegistry::new().module_list("agents", &agents);
        let mut per_network =
            OptimizerWrapper::per_network(OptimizerKind::Sgd, agents, OptimizerKwargs::new(), &owner)
                .unwrap();
        assert!(matches!(
            per_network.optimizer_mut(),
            Err(OptimError::AttributeLookup(_))
        ));
    }

    #[test]
    fn test_reinit_keeps_names_and_topology() {
        let actor = net();
        let critic = net();
        let owner = FieldRegistry::new()
            .module("actor", &actor)
            .module("critic", &critic);
        let wrapper = OptimizerWrapper::pooled(
            OptimizerKind::AdamW,
            vec![actor, critic],
            OptimizerKwargs::new().with_lr(0.003),
            &owner,
        )
        .unwrap();

        let rebuilt = wrapper.reinit(vec![net(), net()]).unwrap();
        assert_eq!(rebuilt.network_names(), wrapper.network_names());
        assert_eq!(rebuilt.topology(), Topology::Pooled);
        assert_eq!(rebuilt.lr().unwrap(), 0.003);
    }

    #[test]
    fn test_multiagent_rejects_other_topology() {
        let agents: SharedModuleList = Rc::new(vec![net()]);
        let err = OptimizerWrapper::builder(OptimizerKind::Adam, agents)
            .network_names(["actors"])
            .multiagent(true)
            .topology(Topology::Single)
            .build()
            .unwrap_err();
        assert!(matches!(err, OptimError::ConfigurationError(_)));
    }
}
