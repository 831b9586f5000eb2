//! Overlay-bound transfer session between two mesh windows.
//!
//! A session starts *unbound*. [`TransferSession::overlay`] resolves both
//! windows' meshes, builds their overlay and binds the pair. Field operations
//! then resolve `source.item` / `target.item` handles on the bound pair, in
//! either direction. Resolution failures leave the session as it was.

use std::sync::Arc;

use crate::algs::center_interpolation::{interpolate_to_centers, RuleTable};
use crate::config::ExchangeConfig;
use crate::exchange_error::ExchangeError;
use crate::store::modules::{LsqOptions, ModuleLease, ModuleRegistry, OverlayEngine};
use crate::store::{DataStore, ItemHandle, MESH_ITEM};

/// Which bound window acts as the source.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TransferDirection {
    /// First bound window → second.
    #[default]
    Forward,
    /// Second bound window → first.
    Reverse,
}

impl TransferDirection {
    /// Direction from a `reverse` flag.
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            TransferDirection::Reverse
        } else {
            TransferDirection::Forward
        }
    }
}

/// The two windows an overlay was built for.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct WindowPair {
    pub first: String,
    pub second: String,
}

impl WindowPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// `(source, target)` windows for a direction.
    pub fn oriented(&self, direction: TransferDirection) -> (&str, &str) {
        match direction {
            TransferDirection::Forward => (&self.first, &self.second),
            TransferDirection::Reverse => (&self.second, &self.first),
        }
    }
}

/// Sequential transfer session.
pub struct TransferSession {
    name: String,
    store: Arc<dyn DataStore>,
    engine: ModuleLease<dyn OverlayEngine>,
    binding: Option<WindowPair>,
    lsq: LsqOptions,
    rules: RuleTable,
}

impl std::fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSession")
            .field("name", &self.name)
            .field("binding", &self.binding)
            .field("lsq", &self.lsq)
            .finish()
    }
}

impl TransferSession {
    /// Load the overlay engine as instance `name` and apply the configured verbosity.
    pub fn new(
        name: &str,
        store: Arc<dyn DataStore>,
        modules: &ModuleRegistry,
        config: &ExchangeConfig,
    ) -> Result<Self, ExchangeError> {
        let engine = modules.acquire::<dyn OverlayEngine>(&config.overlay_module, name)?;
        engine.lock().set_verbosity(config.verbosity);
        Ok(Self {
            name: name.to_string(),
            store,
            engine,
            binding: None,
            lsq: config.lsq_options(),
            rules: RuleTable::standard(),
        })
    }

    /// Instance name of the session's engine.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store the session operates on.
    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Window pair bound by the last successful overlay.
    pub fn binding(&self) -> Option<&WindowPair> {
        self.binding.as_ref()
    }

    /// `true` once an overlay has bound the session.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Forward a verbosity level to the engine.
    pub fn set_verbosity(&self, level: u32) {
        self.engine.lock().set_verbosity(level);
    }

    /// Least-squares options used by [`TransferSession::transfer`].
    pub fn lsq_options(&self) -> LsqOptions {
        self.lsq
    }

    pub fn set_lsq_options(&mut self, options: LsqOptions) {
        self.lsq = options;
    }

    /// Center-interpolation rules; register extra element shapes here.
    pub fn rules_mut(&mut self) -> &mut RuleTable {
        &mut self.rules
    }

    pub(crate) fn engine(&self) -> &ModuleLease<dyn OverlayEngine> {
        &self.engine
    }

    pub(crate) fn bind(&mut self, pair: WindowPair) {
        log::debug!("session `{}` bound to {} <-> {}", self.name, pair.first, pair.second);
        self.binding = Some(pair);
    }

    /// Resolve the `mesh` handles of two windows.
    pub(crate) fn mesh_handles(
        &self,
        first: &str,
        second: &str,
    ) -> Result<(ItemHandle, ItemHandle), ExchangeError> {
        let a = self.store.item_handle(first, MESH_ITEM);
        let b = self.store.item_handle(second, MESH_ITEM);
        match (a, b) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => {
                let err = ExchangeError::FieldResolution {
                    source_item: format!("{first}.{MESH_ITEM}"),
                    target_item: format!("{second}.{MESH_ITEM}"),
                };
                log::warn!("session `{}`: {err}", self.name);
                Err(err)
            }
        }
    }

    /// Build the overlay of `first` and `second` and bind the session to them.
    pub fn overlay(&mut self, first: &str, second: &str) -> Result<(), ExchangeError> {
        let (a, b) = self.mesh_handles(first, second)?;
        self.engine.lock().overlay(self.store.as_ref(), &a, &b)?;
        self.bind(WindowPair::new(first, second));
        Ok(())
    }

    fn resolve(
        &self,
        source_item: &str,
        target_item: &str,
        direction: TransferDirection,
    ) -> Result<(ItemHandle, ItemHandle), ExchangeError> {
        let Some(pair) = &self.binding else {
            let err = ExchangeError::Unbound(self.name.clone());
            log::warn!("{err}");
            return Err(err);
        };
        let (src_win, trg_win) = pair.oriented(direction);
        match (
            self.store.item_handle(src_win, source_item),
            self.store.item_handle(trg_win, target_item),
        ) {
            (Some(s), Some(t)) => Ok((s, t)),
            _ => {
                let err = ExchangeError::FieldResolution {
                    source_item: format!("{src_win}.{source_item}"),
                    target_item: format!("{trg_win}.{target_item}"),
                };
                log::warn!("session `{}`: {err}", self.name);
                Err(err)
            }
        }
    }

    /// Least-squares transfer of `source_item` onto `target_item`.
    pub fn transfer(
        &self,
        source_item: &str,
        target_item: &str,
        direction: TransferDirection,
    ) -> Result<(), ExchangeError> {
        let (s, t) = self.resolve(source_item, target_item, direction)?;
        self.engine
            .lock()
            .least_squares_transfer(self.store.as_ref(), &s, &t, &self.lsq)
    }

    /// Interpolate `source_item` onto `target_item`.
    pub fn interpolate(
        &self,
        source_item: &str,
        target_item: &str,
        direction: TransferDirection,
    ) -> Result<(), ExchangeError> {
        let (s, t) = self.resolve(source_item, target_item, direction)?;
        self.engine.lock().interpolate(self.store.as_ref(), &s, &t)
    }

    /// Load transfer of `source_item` onto `target_item`.
    pub fn transfer_load(
        &self,
        source_item: &str,
        target_item: &str,
        direction: TransferDirection,
    ) -> Result<(), ExchangeError> {
        let (s, t) = self.resolve(source_item, target_item, direction)?;
        self.engine.lock().load_transfer(self.store.as_ref(), &s, &t)
    }

    /// Average a node item of `window` onto an element item of the same window.
    pub fn interpolate_to_centers(
        &self,
        window: &str,
        node_item: &str,
        center_item: &str,
    ) -> Result<(), ExchangeError> {
        let resolve = |item: &str| {
            self.store.item_handle(window, item).ok_or_else(|| {
                let err = ExchangeError::FieldResolution {
                    source_item: format!("{window}.{node_item}"),
                    target_item: format!("{window}.{center_item}"),
                };
                log::warn!("session `{}`: {err}", self.name);
                err
            })
        };
        let x = resolve(node_item)?;
        let z = resolve(center_item)?;
        interpolate_to_centers(self.store.as_ref(), &x, &z, &self.rules)
    }
}
