//! Type-indexed service registry.
//!
//! Replaces a global service-locator singleton with an owned value that is
//! passed explicitly to the components that need it. Services are registered
//! once per concrete type and looked up by that type.

use std::any::{self, Any, TypeId};

use dashmap::DashMap;
use tracing::debug;

use crate::error::CoreError;

struct Entry {
    type_name: &'static str,
    service: Box<dyn Any + Send + Sync>,
}

/// Registry holding at most one service per type.
///
/// Services are expected to be cheap-to-clone handles, typically
/// `Arc<dyn Trait>`; lookup clones the stored handle out.
///
/// # Usage
///
/// ```
/// use std::sync::Arc;
/// use keel_core::{ApplicationAccess, ServiceRegistry, SharedApplicationAccess};
///
/// let registry = ServiceRegistry::new();
/// let access: Arc<dyn ApplicationAccess> = Arc::new(SharedApplicationAccess::new());
/// registry.register(access).unwrap();
/// assert!(registry.contains::<Arc<dyn ApplicationAccess>>());
/// ```
pub struct ServiceRegistry {
    entries: DashMap<TypeId, Entry>,
}

impl ServiceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register a service under its concrete type.
    ///
    /// Returns an error if a service of the same type is already registered.
    pub fn register<S>(&self, service: S) -> Result<(), CoreError>
    where
        S: Clone + Send + Sync + 'static,
    {
        let key = TypeId::of::<S>();

        if self.entries.contains_key(&key) {
            return Err(CoreError::AlreadyRegistered {
                kind: any::type_name::<S>(),
            });
        }

        self.entries.insert(
            key,
            Entry {
                type_name: any::type_name::<S>(),
                service: Box::new(service),
            },
        );
        debug!("Service registered: {}", any::type_name::<S>());
        Ok(())
    }

    /// Look up a service by type, cloning the stored handle out.
    ///
    /// Absence is `None`; whether that is an error is the caller's call.
    pub fn lookup<S>(&self) -> Option<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.entries
            .get(&TypeId::of::<S>())
            .and_then(|entry| entry.service.downcast_ref::<S>().cloned())
    }

    /// Check whether a service of the given type is registered.
    pub fn contains<S: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<S>())
    }

    /// List the type names of all registered services, for diagnostics.
    pub fn list_kinds(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.type_name).collect()
    }

    /// Get the number of registered services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
