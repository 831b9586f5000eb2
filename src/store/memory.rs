//! In-process [`DataStore`] implementation.
//!
//! Windows live in one lock-protected map. Every window carries the `nc`
//! coordinate item; connectivity tables (`:q4:` and friends) are declared
//! implicitly on first use, with their arity read from the name.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::data::buffer;
use crate::exchange_error::ExchangeError;
use crate::store::{
    is_connectivity_table, table_arity, ArrayHandle, DataStore, ItemHandle, ItemSpec, PaneId,
    StoreLocation, StoreType, WindowScope, ALL_ITEM, COORDINATES_ITEM, GLOBAL_PANE, MESH_ITEM,
};

#[derive(Clone, Debug, Default)]
struct PaneArray {
    count: usize,
    array: Option<ArrayHandle>,
}

#[derive(Debug)]
struct Window {
    scope: WindowScope,
    finalized: bool,
    specs: HashMap<String, ItemSpec>,
    order: Vec<String>,
    panes: BTreeMap<PaneId, BTreeMap<String, PaneArray>>,
}

impl Window {
    fn new(scope: WindowScope) -> Self {
        let mut window = Self {
            scope,
            finalized: false,
            specs: HashMap::new(),
            order: Vec::new(),
            panes: BTreeMap::new(),
        };
        window.declare(
            COORDINATES_ITEM,
            ItemSpec::new(StoreLocation::Node, StoreType::Double, 3, "m"),
        );
        window
    }

    fn declare(&mut self, item: &str, spec: ItemSpec) {
        if self.specs.insert(item.to_string(), spec).is_none() {
            self.order.push(item.to_string());
        }
    }

    /// Spec for `item`, declaring connectivity tables on first use.
    fn spec_or_declare(&mut self, window: &str, item: &str) -> Result<ItemSpec, ExchangeError> {
        if let Some(spec) = self.specs.get(item) {
            return Ok(spec.clone());
        }
        if is_connectivity_table(item) {
            let arity = table_arity(item).ok_or_else(|| {
                ExchangeError::Precondition(format!("connectivity table `{item}` has no arity"))
            })?;
            let spec = ItemSpec::new(StoreLocation::Element, StoreType::Int, arity, "");
            self.declare(item, spec.clone());
            return Ok(spec);
        }
        Err(ExchangeError::MissingItem {
            window: window.to_string(),
            item: item.to_string(),
        })
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    windows: RwLock<HashMap<String, Window>>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once [`DataStore::init_done`] was called on the window.
    pub fn is_finalized(&self, window: &str) -> bool {
        self.windows
            .read()
            .get(window)
            .map(|w| w.finalized)
            .unwrap_or(false)
    }

    /// Number of windows currently held.
    pub fn window_count(&self) -> usize {
        self.windows.read().len()
    }

    fn missing(window: &str) -> ExchangeError {
        ExchangeError::MissingWindow(window.to_string())
    }
}

impl DataStore for InMemoryStore {
    fn create_window(&self, window: &str, scope: WindowScope) -> Result<(), ExchangeError> {
        let mut windows = self.windows.write();
        if windows.contains_key(window) {
            return Err(ExchangeError::Precondition(format!(
                "window `{window}` already exists"
            )));
        }
        windows.insert(window.to_string(), Window::new(scope));
        log::debug!("created window `{window}` ({scope:?})");
        Ok(())
    }

    fn delete_window(&self, window: &str) -> Result<(), ExchangeError> {
        self.windows
            .write()
            .remove(window)
            .map(|_| log::debug!("deleted window `{window}`"))
            .ok_or_else(|| Self::missing(window))
    }

    fn has_window(&self, window: &str) -> bool {
        self.windows.read().contains_key(window)
    }

    fn window_scope(&self, window: &str) -> Option<WindowScope> {
        self.windows.read().get(window).map(|w| w.scope)
    }

    fn init_done(&self, window: &str) -> Result<(), ExchangeError> {
        let mut windows = self.windows.write();
        let w = windows.get_mut(window).ok_or_else(|| Self::missing(window))?;
        w.finalized = true;
        Ok(())
    }

    fn new_item(&self, window: &str, item: &str, spec: ItemSpec) -> Result<(), ExchangeError> {
        let mut windows = self.windows.write();
        let w = windows.get_mut(window).ok_or_else(|| Self::missing(window))?;
        match w.specs.get(item) {
            Some(existing) if *existing != spec => Err(ExchangeError::Precondition(format!(
                "item `{window}.{item}` already declared as {existing:?}"
            ))),
            Some(_) => Ok(()),
            None => {
                w.declare(item, spec);
                Ok(())
            }
        }
    }

    fn item_spec(&self, window: &str, item: &str) -> Option<ItemSpec> {
        self.windows.read().get(window)?.specs.get(item).cloned()
    }

    fn list_items(&self, window: &str) -> Result<Vec<String>, ExchangeError> {
        let windows = self.windows.read();
        let w = windows.get(window).ok_or_else(|| Self::missing(window))?;
        Ok(w.order
            .iter()
            .filter(|name| name.as_str() != COORDINATES_ITEM && !is_connectivity_table(name))
            .cloned()
            .collect())
    }

    fn panes(&self, window: &str) -> Result<Vec<PaneId>, ExchangeError> {
        let windows = self.windows.read();
        let w = windows.get(window).ok_or_else(|| Self::missing(window))?;
        Ok(w.panes
            .keys()
            .copied()
            .filter(|&p| p != GLOBAL_PANE)
            .collect())
    }

    fn set_size(
        &self,
        window: &str,
        item: &str,
        pane: PaneId,
        count: usize,
    ) -> Result<(), ExchangeError> {
        let mut windows = self.windows.write();
        let w = windows.get_mut(window).ok_or_else(|| Self::missing(window))?;
        w.spec_or_declare(window, item)?;
        w.panes
            .entry(pane)
            .or_default()
            .entry(item.to_string())
            .or_default()
            .count = count;
        Ok(())
    }

    fn resize_array(
        &self,
        window: &str,
        item: &str,
        pane: PaneId,
    ) -> Result<ArrayHandle, ExchangeError> {
        let mut windows = self.windows.write();
        let w = windows.get_mut(window).ok_or_else(|| Self::missing(window))?;
        let spec = w.spec_or_declare(window, item)?;
        let slot = w
            .panes
            .entry(pane)
            .or_default()
            .entry(item.to_string())
            .or_default();
        let handle = ArrayHandle::zeroed(slot.count, spec.ncomp, spec.data_type);
        slot.array = Some(handle.clone());
        Ok(handle)
    }

    fn get_array(&self, window: &str, item: &str, pane: PaneId) -> Option<ArrayHandle> {
        self.windows
            .read()
            .get(window)?
            .panes
            .get(&pane)?
            .get(item)?
            .array
            .clone()
    }

    fn set_array(
        &self,
        window: &str,
        item: &str,
        pane: PaneId,
        array: ArrayHandle,
    ) -> Result<(), ExchangeError> {
        let mut windows = self.windows.write();
        let w = windows.get_mut(window).ok_or_else(|| Self::missing(window))?;
        let spec = w.spec_or_declare(window, item)?;
        let slot = w
            .panes
            .entry(pane)
            .or_default()
            .entry(item.to_string())
            .or_default();
        if slot.count == 0 {
            slot.count = array.items(spec.ncomp);
        }
        slot.array = Some(array);
        Ok(())
    }

    fn list_connectivity_tables(
        &self,
        window: &str,
        pane: PaneId,
    ) -> Result<Vec<String>, ExchangeError> {
        let windows = self.windows.read();
        let w = windows.get(window).ok_or_else(|| Self::missing(window))?;
        Ok(w.panes
            .get(&pane)
            .map(|arrays| {
                arrays
                    .keys()
                    .filter(|name| is_connectivity_table(name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn item_handle(&self, window: &str, item: &str) -> Option<ItemHandle> {
        let windows = self.windows.read();
        let w = windows.get(window)?;
        if item == MESH_ITEM || item == ALL_ITEM || w.specs.contains_key(item) {
            Some(ItemHandle::new(window, item))
        } else {
            None
        }
    }
}

/// Convenience constructor for a store-owned array holding `values`.
pub fn array_from_values<T: bytemuck::Pod>(values: &[T], ncomp: usize) -> ArrayHandle {
    let ncomp = ncomp.max(1);
    ArrayHandle::interleaved(buffer::shared(buffer::to_bytes(values)), ncomp, values.len() / ncomp)
}
