//! Discovery of the owner fields that hold the networks an optimizer is bound to.
//!
//! Owners declare their module fields through [`NetworkContainer`]. Matching is by
//! identity only: two value-equal modules stored in different allocations never
//! resolve to each other's field.

use crate::module::{same_module, same_module_list, SharedModule, SharedModuleList};
use std::rc::Rc;

/// Value stored in a registered owner field.
#[derive(Clone)]
pub enum FieldValue {
    Module(SharedModule),
    ModuleList(SharedModuleList),
}

impl std::fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Module(m) => f
                .debug_tuple("Module")
                .field(&crate::module::module_id(m))
                .finish(),
            FieldValue::ModuleList(list) => f
                .debug_tuple("ModuleList")
                .field(&Rc::as_ptr(list))
                .finish(),
        }
    }
}

/// The networks handed to an optimizer: one module, or an ordered list of them.
#[derive(Clone)]
pub enum Networks {
    Single(SharedModule),
    List(SharedModuleList),
}

impl Networks {
    /// Build a list from loose modules. The list gets a fresh identity.
    pub fn list(modules: Vec<SharedModule>) -> Self {
        Networks::List(Rc::new(modules))
    }

    /// The modules in order.
    pub fn to_vec(&self) -> Vec<SharedModule> {
        match self {
            Networks::Single(m) => vec![m.clone()],
            Networks::List(list) => list.as_ref().clone(),
        }
    }

    /// Number of networks.
    pub fn len(&self) -> usize {
        match self {
            Networks::Single(_) => 1,
            Networks::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<SharedModule> for Networks {
    fn from(module: SharedModule) -> Self {
        Networks::Single(module)
    }
}

impl From<SharedModuleList> for Networks {
    fn from(list: SharedModuleList) -> Self {
        Networks::List(list)
    }
}

impl From<Vec<SharedModule>> for Networks {
    fn from(modules: Vec<SharedModule>) -> Self {
        Networks::list(modules)
    }
}

/// An owner that registers which of its fields hold trainable modules.
pub trait NetworkContainer {
    /// Registered `(field name, value)` pairs in declaration order.
    fn network_fields(&self) -> Vec<(String, FieldValue)>;
}

/// Declarative list of `(name, module)` bindings.
///
/// ```
/// use evolvable_optim::{share, FieldRegistry, LinearModule, SharedModule};
///
/// let actor: SharedModule = share(LinearModule::new(4, 2));
/// let registry = FieldRegistry::new().module("actor", &actor);
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<(String, FieldValue)>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field holding one module.
    pub fn module(mut self, name: impl Into<String>, module: &SharedModule) -> Self {
        self.fields
            .push((name.into(), FieldValue::Module(module.clone())));
        self
    }

    /// Register a field holding a whole module list.
    pub fn module_list(mut self, name: impl Into<String>, list: &SharedModuleList) -> Self {
        self.fields
            .push((name.into(), FieldValue::ModuleList(list.clone())));
        self
    }

    /// Rebind an existing field, or append it if absent.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl NetworkContainer for FieldRegistry {
    fn network_fields(&self) -> Vec<(String, FieldValue)> {
        self.fields.clone()
    }
}

/// Names of the owner fields bound to `networks`.
///
/// Without `multiagent`, a field matches when it holds a module identical to any
/// of the target modules. With `multiagent`, a field matches only when it holds
/// the target list object itself; its elements are not inspected.
pub fn resolve_network_names(
    container: &dyn NetworkContainer,
    networks: &Networks,
    multiagent: bool,
) -> Vec<String> {
    let targets = networks.to_vec();

    container
        .network_fields()
        .into_iter()
        .filter(|(_, value)| match (multiagent, value, networks) {
            (false, FieldValue::Module(m), _) => targets.iter().any(|t| same_module(m, t)),
            (true, FieldValue::ModuleList(list), Networks::List(target)) => {
                same_module_list(list, target)
            }
            _ => false,
        })
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{share, LinearModule};

    fn module() -> SharedModule {
        share(LinearModule::new(2, 2))
    }

    #[test]
    fn test_resolves_single_field() {
        let actor = module();
        let registry = FieldRegistry::new().module("actor", &actor);
        let names = resolve_network_names(&registry, &Networks::Single(actor), false);
        assert_eq!(names, vec!["actor".to_string()]);
    }

    #[test]
    fn test_value_equal_modules_do_not_collide() {
        let a = module();
        let b = module();
        let registry = FieldRegistry::new().module("x", &a);
        let names = resolve_network_names(&registry, &Networks::Single(b), false);
        assert!(names.is_empty());
    }

    #[test]
    fn test_resolves_in_declaration_order() {
        let actor = module();
        let critic = module();
        let target = module();
        let registry = FieldRegistry::new()
            .module("critic", &critic)
            .module("actor_target", &target)
            .module("actor", &actor);
        let networks = Networks::list(vec![actor, critic]);
        let names = resolve_network_names(&registry, &networks, false);
        assert_eq!(names, vec!["critic".to_string(), "actor".to_string()]);
    }

    #[test]
    fn test_multiagent_matches_whole_list_only() {
        let agents: SharedModuleList = Rc::new(vec![module(), module()]);
        let registry = FieldRegistry::new()
            .module("agent_0", &agents[0])
            .module_list("actors", &agents);

        let names = resolve_network_names(&registry, &Networks::List(agents.clone()), true);
        assert_eq!(names, vec!["actors".to_string()]);

        // An equal list with a different identity does not match.
        let copy = Networks::list(agents.as_ref().clone());
        assert!(resolve_network_names(&registry, &copy, true).is_empty());
    }

    #[test]
    fn test_set_rebinds_field() {
        let old = module();
        let new = module();
        let mut registry = FieldRegistry::new().module("actor", &old);
        registry.set("actor", FieldValue::Module(new.clone()));
        assert_eq!(registry.len(), 1);
        assert!(resolve_network_names(&registry, &Networks::Single(old), false).is_empty());
        assert_eq!(
            resolve_network_names(&registry, &Networks::Single(new), false),
            vec!["actor".to_string()]
        );
    }
}
