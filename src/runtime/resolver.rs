//! Component graph resolution.
//!
//! Registrations are built in passes: each pass walks the pending list in
//! registration order and builds every component whose dependencies already
//! exist. A pass that builds nothing ends resolution with an error, so
//! resolution terminates and the same registrations always produce the same
//! instantiation order.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::component::{Component, ComponentId, Declare};
use super::dispatch::DispatchTable;
use crate::commands::CommandTable;
use crate::error::ResolveError;

/// A built component, kept both typed (for dependency handoff) and erased
/// (for dispatch).
#[derive(Clone)]
pub(crate) struct Built {
    pub(crate) id: ComponentId,
    deps: Vec<ComponentId>,
    typed: Arc<dyn Any + Send + Sync>,
    pub(crate) component: Arc<dyn Component>,
}

impl Built {
    pub(crate) fn new<T: Component>(id: ComponentId, deps: Vec<ComponentId>, value: Arc<T>) -> Self {
        Self {
            id,
            deps,
            typed: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
            component: value,
        }
    }
}

type BuildFn = for<'a> fn(&Dependencies<'a>) -> Result<Built, ResolveError>;

/// A component type waiting to be built.
pub(crate) struct Registration {
    id: ComponentId,
    deps: Vec<ComponentId>,
    build: BuildFn,
}

impl Registration {
    pub(crate) fn of<T: Declare>() -> Self {
        Self {
            id: ComponentId::of::<T>(),
            deps: T::dependencies(),
            build: build_erased::<T>,
        }
    }

    pub(crate) fn id(&self) -> ComponentId {
        self.id
    }
}

fn build_erased<T: Declare>(deps: &Dependencies<'_>) -> Result<Built, ResolveError> {
    let value = Arc::new(T::build(deps)?);
    Ok(Built::new(ComponentId::of::<T>(), T::dependencies(), value))
}

/// Dependency handles available to a component while it is built.
///
/// Reachable: the root component, declared dependencies, and everything they
/// depend on in turn.
pub struct Dependencies<'a> {
    requester: &'static str,
    reachable: HashSet<TypeId>,
    built: &'a HashMap<TypeId, Built>,
}

impl<'a> Dependencies<'a> {
    fn new(
        requester: ComponentId,
        declared: &[ComponentId],
        root: TypeId,
        built: &'a HashMap<TypeId, Built>,
    ) -> Self {
        let mut reachable = HashSet::from([root]);
        let mut stack: Vec<TypeId> = declared.iter().map(|id| id.type_id).collect();
        while let Some(next) = stack.pop() {
            if reachable.insert(next)
                && let Some(dep) = built.get(&next)
            {
                stack.extend(dep.deps.iter().map(|id| id.type_id));
            }
        }

        Self {
            requester: requester.name,
            reachable,
            built,
        }
    }

    /// Typed handle to a reachable dependency.
    pub fn get<T: Component>(&self) -> Result<Arc<T>, ResolveError> {
        let type_id = TypeId::of::<T>();
        let undeclared = || ResolveError::UndeclaredDependency {
            component: self.requester,
            requested: std::any::type_name::<T>(),
        };

        if !self.reachable.contains(&type_id) {
            return Err(undeclared());
        }
        let built = self.built.get(&type_id).ok_or_else(undeclared)?;
        Arc::clone(&built.typed)
            .downcast::<T>()
            .map_err(|_| undeclared())
    }
}

/// Output of a successful resolution.
pub(crate) struct Resolved {
    /// Instantiation order, root first.
    pub(crate) components: Vec<Arc<dyn Component>>,
    /// Typed handles by component type.
    pub(crate) typed: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    pub(crate) dispatch: DispatchTable,
}

#[cfg(test)]
impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}

/// Build every registration after the already-built root, merge their
/// commands into `commands`, and derive the dispatch table.
pub(crate) fn resolve_graph(
    root: Built,
    registrations: Vec<Registration>,
    commands: &CommandTable,
) -> Result<Resolved, ResolveError> {
    let mut seen = HashSet::from([root.id.type_id]);
    for reg in &registrations {
        if !seen.insert(reg.id.type_id) {
            return Err(ResolveError::Duplicate(reg.id.name));
        }
    }

    let root_type = root.id.type_id;
    let mut order = vec![root.clone()];
    let mut built = HashMap::from([(root_type, root)]);
    let mut pending = registrations;

    let mut pass = 0;
    while !pending.is_empty() {
        pass += 1;
        let mut deferred = Vec::new();
        let mut progressed = false;

        for reg in pending {
            let ready = reg
                .deps
                .iter()
                .all(|dep| built.contains_key(&dep.type_id));
            if !ready {
                deferred.push(reg);
                continue;
            }

            let deps = Dependencies::new(reg.id, &reg.deps, root_type, &built);
            let component = (reg.build)(&deps)?;
            debug!(component = reg.id.name, pass, "Built component");
            built.insert(reg.id.type_id, component.clone());
            order.push(component);
            progressed = true;
        }

        if !progressed {
            return Err(stuck(&deferred, &seen));
        }
        pending = deferred;
    }

    for entry in &order {
        commands.merge(
            entry.component.commands(),
            Arc::downgrade(&entry.component),
            entry.id.name,
        )?;
    }

    let typed = built
        .into_iter()
        .map(|(type_id, entry)| (type_id, entry.typed))
        .collect();
    let components: Vec<Arc<dyn Component>> =
        order.into_iter().map(|entry| entry.component).collect();
    let dispatch = DispatchTable::build(&components);
    Ok(Resolved {
        components,
        typed,
        dispatch,
    })
}

/// Explain why the remaining registrations can never be built.
fn stuck(pending: &[Registration], registered: &HashSet<TypeId>) -> ResolveError {
    for reg in pending {
        if let Some(dep) = reg
            .deps
            .iter()
            .find(|dep| !registered.contains(&dep.type_id))
        {
            return ResolveError::MissingDependency {
                component: reg.id.name,
                dependency: dep.name,
            };
        }
    }
    ResolveError::Cycle {
        components: pending.iter().map(|reg| reg.id.name).collect(),
    }
}
