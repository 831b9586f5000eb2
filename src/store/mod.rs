//! Narrow interface to the external distributed data store.
//!
//! The store holds named *windows*; each window declares typed *items* and
//! is split into *panes* (rank-local partitions) that carry one array per
//! item. Everything the crate does to a store goes through [`DataStore`], so
//! the engine can be retargeted to any store that can implement it.
//! [`memory::InMemoryStore`] is the in-process implementation.

pub mod memory;
pub mod modules;

use std::fmt;
use std::sync::Arc;

use crate::data::buffer::{self, SharedBuffer};
use crate::exchange_error::ExchangeError;

/// Pane (partition) identifier. Pane 0 carries window-global arrays.
pub type PaneId = i32;

/// Pane used for window-located (solver-global) arrays.
pub const GLOBAL_PANE: PaneId = 0;

/// Name of the node-coordinate item every window carries.
pub const COORDINATES_ITEM: &str = "nc";

/// Aggregate item naming a window's whole mesh.
pub const MESH_ITEM: &str = "mesh";

/// Aggregate item naming every item of a window.
pub const ALL_ITEM: &str = "all";

/// Store-side location code of an item.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StoreLocation {
    /// `'w'`: one array for the window.
    Window,
    /// `'p'`: one value set per pane.
    Pane,
    /// `'e'`: one value set per element.
    Element,
    /// `'n'`: one value set per node.
    Node,
}

/// Store-side datatype code of an item.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StoreType {
    Char,
    Int,
    Float,
    Double,
    /// Fortran `CHARACTER`.
    Character,
    /// Fortran `INTEGER`.
    Integer,
    /// Fortran `REAL`, promoted to 8 bytes.
    Real,
    /// Fortran `DOUBLE PRECISION`.
    DoublePrecision,
    /// Opaque bytes.
    RawData,
}

impl StoreType {
    /// Size of one scalar in bytes.
    pub fn size_of(self) -> usize {
        match self {
            StoreType::Char | StoreType::Character | StoreType::RawData => 1,
            StoreType::Int | StoreType::Integer | StoreType::Float => 4,
            StoreType::Double | StoreType::Real | StoreType::DoublePrecision => 8,
        }
    }

    /// `true` for the double-precision codes.
    pub fn is_double(self) -> bool {
        matches!(self, StoreType::Double | StoreType::DoublePrecision)
    }
}

/// Declared type of a store item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemSpec {
    pub location: StoreLocation,
    pub data_type: StoreType,
    pub ncomp: usize,
    pub unit: String,
}

impl ItemSpec {
    /// New item declaration.
    pub fn new(location: StoreLocation, data_type: StoreType, ncomp: usize, unit: &str) -> Self {
        Self {
            location,
            data_type,
            ncomp,
            unit: unit.to_string(),
        }
    }
}

/// How a multi-component array is laid out.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ArrayLayout {
    /// Component `j` of item `i` at `i * stride + j` (element-major).
    #[default]
    Interleaved,
    /// Component `j` of item `i` at `i + j * stride` (slot-major).
    SlotMajor,
}

/// A pane array as the store exposes it.
#[derive(Clone, Debug)]
pub struct ArrayHandle {
    /// Raw bytes, shared with the store.
    pub buffer: SharedBuffer,
    /// Distance, in scalars, used by the layout's addressing rule.
    pub stride: usize,
    /// Allocated extent paired with `stride`.
    pub capacity: usize,
    /// Addressing rule.
    pub layout: ArrayLayout,
    /// Buffer item holding each store item, when the two orders differ.
    pub order: Option<Arc<[usize]>>,
}

impl ArrayHandle {
    /// Element-major handle over `buffer`.
    pub fn interleaved(buffer: SharedBuffer, stride: usize, capacity: usize) -> Self {
        Self {
            buffer,
            stride,
            capacity,
            layout: ArrayLayout::Interleaved,
            order: None,
        }
    }

    /// Slot-major handle over `buffer`.
    pub fn slot_major(buffer: SharedBuffer, stride: usize, capacity: usize) -> Self {
        Self {
            buffer,
            stride,
            capacity,
            layout: ArrayLayout::SlotMajor,
            order: None,
        }
    }

    /// Number of items holding `ncomp` components each.
    #[inline]
    pub fn items(&self, ncomp: usize) -> usize {
        if ncomp == 0 {
            0
        } else {
            self.stride * self.capacity / ncomp
        }
    }

    /// Address store item `i` through buffer item `order[i]`.
    ///
    /// An identity permutation is dropped.
    pub fn with_order(mut self, order: Vec<usize>) -> Self {
        let identity = order.iter().enumerate().all(|(i, &at)| i == at);
        self.order = if identity { None } else { Some(order.into()) };
        self
    }

    /// `true` if store items are not laid out in buffer order.
    pub fn is_permuted(&self) -> bool {
        self.order.is_some()
    }

    /// Scalar index of component `comp` of store item `item`.
    ///
    /// Items past the end of the permutation address as themselves.
    #[inline]
    pub fn index(&self, item: usize, comp: usize) -> usize {
        let item = match &self.order {
            Some(order) => order.get(item).copied().unwrap_or(item),
            None => item,
        };
        self.slot(item, comp)
    }

    #[inline]
    fn slot(&self, item: usize, comp: usize) -> usize {
        match self.layout {
            ArrayLayout::Interleaved => item * self.stride + comp,
            ArrayLayout::SlotMajor => item + comp * self.stride,
        }
    }

    /// Current byte length of the backing buffer.
    pub fn byte_len(&self) -> usize {
        self.buffer.read().len()
    }

    /// Copy of the bytes, with items in store order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let bytes = self.buffer.read();
        let scalars = self.stride * self.capacity;
        let order = match &self.order {
            Some(order) if scalars > 0 && !order.is_empty() && bytes.len() % scalars == 0 => order,
            _ => return bytes.clone(),
        };
        let width = bytes.len() / scalars;
        let ncomp = scalars / order.len();
        let mut out = bytes.clone();
        for item in 0..order.len() {
            for comp in 0..ncomp {
                let src = self.index(item, comp) * width;
                let dst = self.slot(item, comp) * width;
                if src + width <= bytes.len() && dst + width <= out.len() {
                    out[dst..dst + width].copy_from_slice(&bytes[src..src + width]);
                }
            }
        }
        out
    }

    /// `true` if both handles share one buffer.
    pub fn aliases(&self, buffer: &SharedBuffer) -> bool {
        Arc::ptr_eq(&self.buffer, buffer)
    }

    /// Fresh zeroed element-major array of `count` items with `ncomp` components.
    pub fn zeroed(count: usize, ncomp: usize, data_type: StoreType) -> Self {
        let bytes = vec![0u8; count * ncomp * data_type.size_of()];
        Self::interleaved(buffer::shared(bytes), ncomp.max(1), count)
    }
}

/// Communication scope a window is created under.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum WindowScope {
    /// Shared by every rank of the process group.
    #[default]
    Group,
    /// Private to the calling rank.
    SelfOnly,
}

/// Resolved reference to a window item.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ItemHandle {
    pub window: String,
    pub item: String,
}

impl ItemHandle {
    /// Build a handle from its parts.
    pub fn new(window: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            window: window.into(),
            item: item.into(),
        }
    }
}

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.window, self.item)
    }
}

/// Keyed, partitioned array store.
///
/// Implementations are single-writer per pane; methods take `&self` and
/// synchronize internally.
pub trait DataStore: Send + Sync {
    /// Create an empty window.
    fn create_window(&self, window: &str, scope: WindowScope) -> Result<(), ExchangeError>;

    /// Delete a window and every array it owns.
    fn delete_window(&self, window: &str) -> Result<(), ExchangeError>;

    /// `true` if the window exists.
    fn has_window(&self, window: &str) -> bool;

    /// Scope the window was created under.
    fn window_scope(&self, window: &str) -> Option<WindowScope>;

    /// Mark a window's registration as complete.
    fn init_done(&self, window: &str) -> Result<(), ExchangeError>;

    /// Declare an item on a window.
    fn new_item(&self, window: &str, item: &str, spec: ItemSpec) -> Result<(), ExchangeError>;

    /// Declared type of an item.
    fn item_spec(&self, window: &str, item: &str) -> Option<ItemSpec>;

    /// Names of the window's data items, excluding mesh items.
    fn list_items(&self, window: &str) -> Result<Vec<String>, ExchangeError>;

    /// Panes registered on the window, excluding the global pane.
    fn panes(&self, window: &str) -> Result<Vec<PaneId>, ExchangeError>;

    /// Set the number of value sets an item holds on a pane.
    fn set_size(
        &self,
        window: &str,
        item: &str,
        pane: PaneId,
        count: usize,
    ) -> Result<(), ExchangeError>;

    /// Allocate store-owned storage for an item on a pane, sized by `set_size`.
    fn resize_array(
        &self,
        window: &str,
        item: &str,
        pane: PaneId,
    ) -> Result<ArrayHandle, ExchangeError>;

    /// Fetch an item's array on a pane.
    fn get_array(&self, window: &str, item: &str, pane: PaneId) -> Option<ArrayHandle>;

    /// Alias a caller-owned array for an item on a pane.
    fn set_array(
        &self,
        window: &str,
        item: &str,
        pane: PaneId,
        array: ArrayHandle,
    ) -> Result<(), ExchangeError>;

    /// Connectivity table names registered on a pane.
    fn list_connectivity_tables(
        &self,
        window: &str,
        pane: PaneId,
    ) -> Result<Vec<String>, ExchangeError>;

    /// Resolve an item (or the `mesh`/`all` aggregates) to a handle.
    fn item_handle(&self, window: &str, item: &str) -> Option<ItemHandle>;
}

/// `true` for connectivity-table item names (`:t3:` and friends).
#[inline]
pub fn is_connectivity_table(item: &str) -> bool {
    item.starts_with(':')
}

/// Arity encoded in a connectivity table name, e.g. 4 for `:q4:`.
pub fn table_arity(item: &str) -> Option<usize> {
    let digits: String = item
        .trim_matches(':')
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_address_differently() {
        let buf = buffer::shared(vec![0; 8 * 4]);
        let inter = ArrayHandle::interleaved(buf.clone(), 4, 2);
        let slot = ArrayHandle::slot_major(buf, 2, 4);
        assert_eq!(inter.items(4), 2);
        assert_eq!(slot.items(4), 2);
        assert_eq!(inter.index(1, 2), 6);
        assert_eq!(slot.index(1, 2), 5);
    }

    #[test]
    fn permuted_handles_read_in_store_order() {
        let buf = buffer::shared(buffer::to_bytes(&[10i32, 11, 20, 21, 30, 31]));
        let plain = ArrayHandle::interleaved(buf.clone(), 2, 3);
        assert!(!plain.clone().with_order(vec![0, 1, 2]).is_permuted());

        let permuted = plain.with_order(vec![2, 0, 1]);
        assert!(permuted.is_permuted());
        assert!(permuted.aliases(&buf));
        assert_eq!(permuted.index(0, 1), 5);
        assert_eq!(
            buffer::from_bytes::<i32>(&permuted.to_bytes()),
            vec![30, 31, 10, 11, 20, 21]
        );
        // The shared bytes themselves stay in producer order.
        assert_eq!(buffer::from_bytes::<i32>(&buf.read()), vec![10, 11, 20, 21, 30, 31]);
    }

    #[test]
    fn table_arity_parses_digits() {
        assert_eq!(table_arity(":q4:"), Some(4));
        assert_eq!(table_arity(":H8:"), Some(8));
        assert_eq!(table_arity(":x7:"), Some(7));
        assert_eq!(table_arity(":bad:"), None);
    }
}
