//! Component registration types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::descriptors::{ComponentDescriptor, TypeDescriptor};
use crate::error::DiResult;
use crate::factory::ComponentRegistry;
use crate::lifetime::Lifetime;

/// Type-erased shared instance, as handed out by a [`ComponentFactory`](crate::ComponentFactory).
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn Fn(&ComponentRegistry) -> DiResult<AnyArc> + Send + Sync>;

/// Component registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Declared type, `None` when the registration can only be typed by creating it
    pub(crate) target_type: Option<TypeDescriptor>,
    /// Singleton cache, present only for singleton registrations
    pub(crate) single_runtime: Option<OnceCell<AnyArc>>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: Ctor, target_type: Option<TypeDescriptor>) -> Self {
        let single_runtime = match lifetime {
            Lifetime::Singleton => Some(OnceCell::new()),
            Lifetime::Prototype => None,
        };

        Self {
            lifetime,
            ctor,
            target_type,
            single_runtime,
        }
    }
}

/// Registry holding all registrations by name
#[derive(Default)]
pub(crate) struct Registry {
    by_name: HashMap<String, Registration>,
}

impl Registry {
    /// Inserts a registration, replacing any previous one with the same name
    pub(crate) fn insert(&mut self, name: String, registration: Registration) {
        self.by_name.insert(name, registration);
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Registration> {
        self.by_name.get(name)
    }

    pub(crate) fn descriptors(&self) -> Vec<ComponentDescriptor> {
        let mut out: Vec<_> = self
            .by_name
            .iter()
            .map(|(name, r)| ComponentDescriptor {
                name: name.clone(),
                lifetime: r.lifetime,
                target_type: r.target_type,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub(crate) fn len(&self) -> usize {
        self.by_name.len()
    }
}
