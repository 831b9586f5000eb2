//! Reference-counted service locator for the external modules the engine drives.
//!
//! Modules (the overlay engine, the mesh reader, the window writer) are
//! registered as factories under a logical module name. [`ModuleRegistry::acquire`]
//! loads one *instance* of a module under an instance name, or shares the
//! already-loaded instance, and hands back a [`ModuleLease`]. The instance is
//! unloaded when its last lease is dropped.
//!
//! Each module kind is a typed trait object (`dyn OverlayEngine`, ...), so
//! callers resolve their interface once at acquisition time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};

use crate::algs::communicator::Communicator;
use crate::exchange_error::ExchangeError;
use crate::store::{DataStore, ItemHandle, WindowScope};

/// Least-squares transfer controls.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LsqOptions {
    /// Convergence tolerance.
    pub tolerance: f64,
    /// Iteration cap.
    pub max_iterations: u32,
}

impl Default for LsqOptions {
    fn default() -> Self {
        Self {
            tolerance: 1.0e-6,
            max_iterations: 100,
        }
    }
}

/// Common-refinement overlay and the transfers built on it.
pub trait OverlayEngine: Send {
    /// Diagnostic verbosity of the engine.
    fn set_verbosity(&mut self, level: u32);

    /// Build the overlay of two meshes.
    fn overlay(
        &mut self,
        store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
    ) -> Result<(), ExchangeError>;

    /// Persist the current overlay as an artifact pair named by the two prefixes.
    fn write_overlay(
        &mut self,
        store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
        prefix_a: &str,
        prefix_b: &str,
        format: &str,
    ) -> Result<(), ExchangeError>;

    /// Collectively read an overlay artifact pair onto partitioned meshes.
    #[allow(clippy::too_many_arguments)]
    fn read_overlay(
        &mut self,
        store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
        comm: &dyn Communicator,
        prefix_a: &str,
        prefix_b: &str,
        format: &str,
    ) -> Result<(), ExchangeError>;

    /// Drop the overlay built for two meshes.
    fn clear_overlay(
        &mut self,
        store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
    ) -> Result<(), ExchangeError>;

    /// Conservative least-squares transfer of a field.
    fn least_squares_transfer(
        &mut self,
        store: &dyn DataStore,
        source: &ItemHandle,
        target: &ItemHandle,
        options: &LsqOptions,
    ) -> Result<(), ExchangeError>;

    /// Pointwise interpolation of a field.
    fn interpolate(
        &mut self,
        store: &dyn DataStore,
        source: &ItemHandle,
        target: &ItemHandle,
    ) -> Result<(), ExchangeError>;

    /// Load (traction) transfer of a field.
    fn load_transfer(
        &mut self,
        store: &dyn DataStore,
        source: &ItemHandle,
        target: &ItemHandle,
    ) -> Result<(), ExchangeError>;
}

/// Reads a canonical mesh file into a window.
pub trait MeshReader: Send {
    /// Create `window` under `scope` and fill it from `path`.
    fn read_mesh(
        &mut self,
        store: &dyn DataStore,
        path: &str,
        window: &str,
        scope: WindowScope,
    ) -> Result<(), ExchangeError>;
}

/// Writes window items to persistent output.
pub trait WindowWriter: Send {
    /// Set a named output option.
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ExchangeError>;

    /// Write `item` under the file prefix `prefix`, tagged with `window` and `time`.
    fn write_items(
        &mut self,
        store: &dyn DataStore,
        prefix: &str,
        item: &ItemHandle,
        window: &str,
        time: &str,
    ) -> Result<(), ExchangeError>;
}

/// Builds a module instance given its instance name.
pub type ModuleFactory<M> = Arc<dyn Fn(&str) -> Result<Box<M>, ExchangeError> + Send + Sync>;

type Shared<M> = Arc<Mutex<Box<M>>>;

struct Loaded {
    module: String,
    refs: usize,
    instance: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct RegistryInner {
    factories: DashMap<String, Arc<dyn Any + Send + Sync>>,
    loaded: DashMap<String, Loaded>,
}

/// Cheaply clonable handle to a module registry.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    inner: Arc<RegistryInner>,
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.inner.factories.len())
            .field("loaded", &self.inner.loaded.len())
            .finish()
    }
}

impl ModuleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for a logical module name.
    pub fn register<M, F>(&self, module: &str, factory: F)
    where
        M: ?Sized + Send + 'static,
        F: Fn(&str) -> Result<Box<M>, ExchangeError> + Send + Sync + 'static,
    {
        let factory: ModuleFactory<M> = Arc::new(factory);
        self.inner
            .factories
            .insert(module.to_string(), Arc::new(factory));
    }

    /// `true` if a factory is registered for `module`.
    pub fn is_registered(&self, module: &str) -> bool {
        self.inner.factories.contains_key(module)
    }

    /// Load (or share) the instance `instance` of `module`.
    pub fn acquire<M>(&self, module: &str, instance: &str) -> Result<ModuleLease<M>, ExchangeError>
    where
        M: ?Sized + Send + 'static,
    {
        let shared = match self.inner.loaded.entry(instance.to_string()) {
            Entry::Occupied(mut slot) => {
                let loaded = slot.get_mut();
                let shared = loaded
                    .instance
                    .downcast_ref::<Shared<M>>()
                    .cloned()
                    .ok_or_else(|| ExchangeError::ModuleKindMismatch(instance.to_string()))?;
                loaded.refs += 1;
                shared
            }
            Entry::Vacant(slot) => {
                let factory = self
                    .inner
                    .factories
                    .get(module)
                    .map(|f| Arc::clone(f.value()))
                    .ok_or_else(|| ExchangeError::ModuleNotRegistered(module.to_string()))?;
                let factory = factory
                    .downcast_ref::<ModuleFactory<M>>()
                    .ok_or_else(|| ExchangeError::ModuleKindMismatch(instance.to_string()))?;
                let shared: Shared<M> = Arc::new(Mutex::new((**factory)(instance)?));
                slot.insert(Loaded {
                    module: module.to_string(),
                    refs: 1,
                    instance: Arc::new(Arc::clone(&shared)),
                });
                log::debug!("loaded module {module} as `{instance}`");
                shared
            }
        };
        Ok(ModuleLease {
            registry: self.clone(),
            instance: instance.to_string(),
            module: shared,
        })
    }

    /// Number of live leases on an instance (0 when unloaded).
    pub fn refcount(&self, instance: &str) -> usize {
        self.inner
            .loaded
            .get(instance)
            .map(|l| l.refs)
            .unwrap_or(0)
    }

    /// `true` while an instance is loaded.
    pub fn is_loaded(&self, instance: &str) -> bool {
        self.inner.loaded.contains_key(instance)
    }

    fn release(&self, instance: &str) {
        let unload = match self.inner.loaded.get_mut(instance) {
            Some(mut loaded) => {
                loaded.refs = loaded.refs.saturating_sub(1);
                loaded.refs == 0
            }
            None => false,
        };
        if unload {
            if let Some((_, loaded)) = self.inner.loaded.remove_if(instance, |_, l| l.refs == 0) {
                log::debug!("unloaded module {} instance `{instance}`", loaded.module);
            }
        }
    }
}

/// Scoped acquisition of a loaded module instance.
///
/// Dropping the lease releases it exactly once.
pub struct ModuleLease<M: ?Sized + 'static> {
    registry: ModuleRegistry,
    instance: String,
    module: Shared<M>,
}

impl<M: ?Sized + 'static> ModuleLease<M> {
    /// Instance name the module was loaded under.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Exclusive access to the module for one call sequence.
    pub fn lock(&self) -> MutexGuard<'_, Box<M>> {
        self.module.lock()
    }
}

impl<M: ?Sized + 'static> fmt::Debug for ModuleLease<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLease")
            .field("instance", &self.instance)
            .finish()
    }
}

impl<M: ?Sized + 'static> Drop for ModuleLease<M> {
    fn drop(&mut self) {
        self.registry.release(&self.instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<String>);

    impl WindowWriter for Recorder {
        fn set_option(&mut self, key: &str, value: &str) -> Result<(), ExchangeError> {
            self.0.push(format!("{key}={value}"));
            Ok(())
        }
        fn write_items(
            &mut self,
            _store: &dyn DataStore,
            prefix: &str,
            _item: &ItemHandle,
            _window: &str,
            _time: &str,
        ) -> Result<(), ExchangeError> {
            self.0.push(prefix.to_string());
            Ok(())
        }
    }

    fn registry() -> ModuleRegistry {
        let reg = ModuleRegistry::new();
        reg.register::<dyn WindowWriter, _>("SimOUT", |_| {
            Ok(Box::new(Recorder(Vec::new())) as Box<dyn WindowWriter>)
        });
        reg
    }

    #[test]
    fn leases_share_one_instance_and_unload_once() {
        let reg = registry();
        let a = reg.acquire::<dyn WindowWriter>("SimOUT", "out").unwrap();
        let b = reg.acquire::<dyn WindowWriter>("SimOUT", "out").unwrap();
        a.lock().set_option("rankwidth", "0").unwrap();
        assert_eq!(reg.refcount("out"), 2);
        drop(a);
        assert!(reg.is_loaded("out"));
        drop(b);
        assert!(!reg.is_loaded("out"));
        assert_eq!(reg.refcount("out"), 0);
    }

    #[test]
    fn unknown_module_and_wrong_interface_are_rejected() {
        let reg = registry();
        assert!(matches!(
            reg.acquire::<dyn WindowWriter>("Nope", "x"),
            Err(ExchangeError::ModuleNotRegistered(_))
        ));
        assert!(matches!(
            reg.acquire::<dyn MeshReader>("SimOUT", "y"),
            Err(ExchangeError::ModuleKindMismatch(_))
        ));
        assert!(!reg.is_loaded("y"));
    }
}
