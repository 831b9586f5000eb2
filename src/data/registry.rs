//! Typed, location-tagged registry of solution fields.
//!
//! A [`FieldRegistry`] keeps one [`FieldMeta`] and one raw byte buffer per
//! field and marshals those buffers to and from a [`DataStore`]. Buffers are
//! either owned by the registry or *aliased* to a foreign producer's buffer
//! ("use mode"); aliased buffers are read-only from the registry's side.

use std::collections::HashMap;

use crate::data::buffer::{self, SharedBuffer};
use crate::data::field_meta::{FieldLocation, FieldMeta, ScalarWidth};
use crate::exchange_error::ExchangeError;
use crate::store::{ArrayHandle, DataStore, ItemSpec, PaneId, GLOBAL_PANE};

/// Whether data crosses the registry/store boundary by copy or by aliasing.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CopyMode {
    /// Duplicate the bytes; the two sides evolve independently afterwards.
    Copy,
    /// Share one buffer; writes on either side are visible to the other.
    Use,
}

impl CopyMode {
    /// `true` for [`CopyMode::Copy`].
    pub fn is_copy(self) -> bool {
        matches!(self, CopyMode::Copy)
    }
}

#[derive(Debug)]
struct FieldBuffer {
    bytes: SharedBuffer,
    aliased: bool,
}

// Owned bytes are duplicated; an aliased buffer still belongs to its producer.
impl Clone for FieldBuffer {
    fn clone(&self) -> Self {
        if self.aliased {
            return Self {
                bytes: self.bytes.clone(),
                aliased: true,
            };
        }
        Self::owned(self.bytes.read().clone())
    }
}

impl FieldBuffer {
    fn owned(bytes: Vec<u8>) -> Self {
        Self {
            bytes: buffer::shared(bytes),
            aliased: false,
        }
    }

    fn len(&self) -> usize {
        self.bytes.read().len()
    }
}

/// Field metadata and data for one solver.
#[derive(Clone, Debug, Default)]
pub struct FieldRegistry {
    metas: Vec<FieldMeta>,
    buffers: Vec<FieldBuffer>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// `true` if no field is registered.
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Metadata of every field, in registration order.
    pub fn metas(&self) -> &[FieldMeta] {
        &self.metas
    }

    /// Metadata of one field.
    pub fn meta(&self, name: &str) -> Option<&FieldMeta> {
        self.index.get(name).map(|&i| &self.metas[i])
    }

    /// Field names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.metas.iter().map(|m| m.name.as_str())
    }

    /// Register a field with an empty owned buffer.
    pub fn add_field(&mut self, meta: FieldMeta) -> Result<(), ExchangeError> {
        if self.index.contains_key(&meta.name) {
            return Err(ExchangeError::Precondition(format!(
                "field `{}` registered twice",
                meta.name
            )));
        }
        self.index.insert(meta.name.clone(), self.metas.len());
        self.metas.push(meta);
        self.buffers.push(FieldBuffer::owned(Vec::new()));
        Ok(())
    }

    fn slot(&self, name: &str) -> Result<usize, ExchangeError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ExchangeError::MissingField(name.to_string()))
    }

    fn owned_slot(&self, name: &str) -> Result<usize, ExchangeError> {
        let i = self.slot(name)?;
        if self.buffers[i].aliased {
            return Err(ExchangeError::AliasedBuffer(name.to_string()));
        }
        Ok(i)
    }

    /// Import field metadata for the store items named in `names`.
    ///
    /// `lookup` yields the declared type of an item. Items without a
    /// declaration, with a non-field datatype, or already registered are
    /// skipped. Returns how many fields were added.
    pub fn import_metadata<S, F>(&mut self, names: &[S], lookup: F) -> usize
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<ItemSpec>,
    {
        let mut added = 0;
        for name in names.iter().map(AsRef::as_ref) {
            let Some(spec) = lookup(name) else {
                log::warn!("mesh_exchange::data::registry: no declaration for item `{name}`, skipped");
                continue;
            };
            let Some(width) = ScalarWidth::from_store(spec.data_type) else {
                log::warn!(
                    "mesh_exchange::data::registry: item `{name}` has non-field type {:?}, skipped",
                    spec.data_type
                );
                continue;
            };
            if self.index.contains_key(name) {
                continue;
            }
            let meta = FieldMeta::new(
                name,
                FieldLocation::from_store(spec.location),
                width,
                spec.ncomp,
                spec.unit,
            );
            if self.add_field(meta).is_ok() {
                added += 1;
            }
        }
        added
    }

    /// Size every owned buffer for a mesh with the given node and element counts.
    ///
    /// String (byte-width 1) fields keep their current length. Aliased
    /// buffers must already have the right size.
    pub fn allocate(&mut self, num_nodes: usize, num_elements: usize) -> Result<(), ExchangeError> {
        for (meta, buf) in self.metas.iter().zip(self.buffers.iter_mut()) {
            let Some(wanted) = meta.expected_bytes(num_nodes, num_elements) else {
                continue;
            };
            if buf.aliased {
                let found = buf.len();
                if found != wanted {
                    return Err(ExchangeError::AliasedBuffer(meta.name.clone()));
                }
                continue;
            }
            buf.bytes.write().resize(wanted, 0);
        }
        Ok(())
    }

    /// `true` if the field's buffer belongs to a foreign producer.
    pub fn is_aliased(&self, name: &str) -> Result<bool, ExchangeError> {
        Ok(self.buffers[self.slot(name)?].aliased)
    }

    /// The field's shared buffer.
    pub fn buffer(&self, name: &str) -> Result<SharedBuffer, ExchangeError> {
        Ok(self.buffers[self.slot(name)?].bytes.clone())
    }

    /// Copy of the field's raw bytes.
    pub fn bytes(&self, name: &str) -> Result<Vec<u8>, ExchangeError> {
        Ok(self.buffers[self.slot(name)?].bytes.read().clone())
    }

    /// Byte length of the field's buffer.
    pub fn byte_len(&self, name: &str) -> Result<usize, ExchangeError> {
        Ok(self.buffers[self.slot(name)?].len())
    }

    /// Alias the field to a foreign buffer.
    ///
    /// The producer must keep the buffer alive and must not resize it while
    /// the registry refers to it.
    pub fn set_field_buffer(&mut self, name: &str, bytes: SharedBuffer) -> Result<(), ExchangeError> {
        let i = self.slot(name)?;
        self.buffers[i] = FieldBuffer {
            bytes,
            aliased: true,
        };
        Ok(())
    }

    /// Overwrite an owned field's bytes; sizes must match except for string fields.
    pub fn set_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), ExchangeError> {
        let i = self.owned_slot(name)?;
        let meta = &self.metas[i];
        let mut current = self.buffers[i].bytes.write();
        if meta.width == ScalarWidth::Char {
            current.clear();
            current.extend_from_slice(bytes);
            return Ok(());
        }
        if current.len() != bytes.len() {
            return Err(ExchangeError::BufferSizeMismatch {
                name: name.to_string(),
                expected: current.len(),
                found: bytes.len(),
            });
        }
        current.copy_from_slice(bytes);
        Ok(())
    }

    fn expect_width(&self, name: &str, width: ScalarWidth) -> Result<usize, ExchangeError> {
        let i = self.slot(name)?;
        if self.metas[i].width != width {
            return Err(ExchangeError::Precondition(format!(
                "field `{name}` holds {:?} data, not {width:?}",
                self.metas[i].width
            )));
        }
        Ok(i)
    }

    /// Field values as doubles.
    pub fn f64s(&self, name: &str) -> Result<Vec<f64>, ExchangeError> {
        let i = self.expect_width(name, ScalarWidth::Double)?;
        Ok(buffer::from_bytes(&self.buffers[i].bytes.read()))
    }

    /// Overwrite a double field.
    pub fn set_f64s(&mut self, name: &str, values: &[f64]) -> Result<(), ExchangeError> {
        self.expect_width(name, ScalarWidth::Double)?;
        self.set_bytes(name, &buffer::to_bytes(values))
    }

    /// Field values as 32-bit integers.
    pub fn i32s(&self, name: &str) -> Result<Vec<i32>, ExchangeError> {
        let i = self.expect_width(name, ScalarWidth::Int)?;
        Ok(buffer::from_bytes(&self.buffers[i].bytes.read()))
    }

    /// Overwrite an integer field.
    pub fn set_i32s(&mut self, name: &str, values: &[i32]) -> Result<(), ExchangeError> {
        self.expect_width(name, ScalarWidth::Int)?;
        self.set_bytes(name, &buffer::to_bytes(values))
    }

    /// A string field's contents (lossy UTF-8).
    pub fn string(&self, name: &str) -> Result<String, ExchangeError> {
        let i = self.expect_width(name, ScalarWidth::Char)?;
        Ok(String::from_utf8_lossy(&self.buffers[i].bytes.read()).into_owned())
    }

    /// Replace a string field's contents.
    pub fn set_string(&mut self, name: &str, value: &str) -> Result<(), ExchangeError> {
        self.expect_width(name, ScalarWidth::Char)?;
        self.set_bytes(name, value.as_bytes())
    }

    /// Declare every field on `window` and push solver-global data to the global pane.
    ///
    /// Solver-global fields are sized 1, except string fields which are sized
    /// to their byte length. Their buffers are aliased by the store.
    pub fn declare_items(&self, store: &dyn DataStore, window: &str) -> Result<(), ExchangeError> {
        for (meta, buf) in self.metas.iter().zip(&self.buffers) {
            store.new_item(window, &meta.name, item_spec(meta))?;
            if meta.location != FieldLocation::SolverGlobal {
                continue;
            }
            let len = buf.len();
            let count = if meta.width == ScalarWidth::Char {
                len
            } else {
                if len != meta.value_bytes() {
                    return Err(ExchangeError::BufferSizeMismatch {
                        name: meta.name.clone(),
                        expected: meta.value_bytes(),
                        found: len,
                    });
                }
                1
            };
            store.set_size(window, &meta.name, GLOBAL_PANE, count)?;
            store.set_array(
                window,
                &meta.name,
                GLOBAL_PANE,
                ArrayHandle::interleaved(buf.bytes.clone(), meta.ncomp.max(1), count),
            )?;
        }
        Ok(())
    }

    /// Push every pane-resident field to `pane` of `window`.
    ///
    /// Items are declared first if the window does not know them yet.
    /// Solver-global fields are left to [`FieldRegistry::declare_items`].
    pub fn export(
        &self,
        store: &dyn DataStore,
        window: &str,
        pane: PaneId,
        mode: CopyMode,
        num_nodes: usize,
        num_elements: usize,
    ) -> Result<(), ExchangeError> {
        let identity: Vec<usize> = (0..num_elements).collect();
        self.export_ordered(store, window, pane, mode, num_nodes, &identity)
    }

    /// [`FieldRegistry::export`] for a pane whose elements are stored in a
    /// different order than the registry's.
    ///
    /// `element_order[i]` is the registry element stored at position `i`.
    /// Cell fields are gathered into that order in copy mode and aliased
    /// through it in use mode.
    pub fn export_ordered(
        &self,
        store: &dyn DataStore,
        window: &str,
        pane: PaneId,
        mode: CopyMode,
        num_nodes: usize,
        element_order: &[usize],
    ) -> Result<(), ExchangeError> {
        let num_elements = element_order.len();
        let mut seen = vec![false; num_elements];
        for &e in element_order {
            if e >= num_elements || std::mem::replace(&mut seen[e], true) {
                return Err(ExchangeError::Precondition(format!(
                    "element order is not a permutation of {num_elements} elements"
                )));
            }
        }
        for (meta, buf) in self.metas.iter().zip(&self.buffers) {
            if store.item_spec(window, &meta.name).is_none() {
                store.new_item(window, &meta.name, item_spec(meta))?;
            }
            if meta.location == FieldLocation::SolverGlobal {
                continue;
            }
            let len = buf.len();
            let count = match meta.expected_bytes(num_nodes, num_elements) {
                Some(wanted) if wanted != len => {
                    return Err(ExchangeError::BufferSizeMismatch {
                        name: meta.name.clone(),
                        expected: wanted,
                        found: len,
                    });
                }
                Some(_) => meta.extent(num_nodes, num_elements),
                None => len,
            };
            let order = (meta.location == FieldLocation::Cell && meta.width != ScalarWidth::Char)
                .then_some(element_order);
            store.set_size(window, &meta.name, pane, count)?;
            match mode {
                CopyMode::Copy => {
                    let target = store.resize_array(window, &meta.name, pane)?;
                    let mut dst = target.buffer.write();
                    if dst.len() != len {
                        return Err(ExchangeError::BufferSizeMismatch {
                            name: meta.name.clone(),
                            expected: len,
                            found: dst.len(),
                        });
                    }
                    let src = buf.bytes.read();
                    match order {
                        Some(order) if len > 0 => {
                            let chunk = len / num_elements;
                            for (at, &element) in order.iter().enumerate() {
                                dst[at * chunk..(at + 1) * chunk]
                                    .copy_from_slice(&src[element * chunk..(element + 1) * chunk]);
                            }
                        }
                        _ => dst.copy_from_slice(&src),
                    }
                }
                CopyMode::Use => {
                    let mut handle =
                        ArrayHandle::interleaved(buf.bytes.clone(), meta.ncomp.max(1), count);
                    if let Some(order) = order {
                        handle = handle.with_order(order.to_vec());
                    }
                    store.set_array(window, &meta.name, pane, handle)?;
                }
            }
        }
        Ok(())
    }

    /// Fill field data from `pane` of `window`.
    ///
    /// Solver-global fields are read from the global pane. A field with no
    /// store array is left untouched. In copy mode the store array must match
    /// the allocated buffer byte for byte (string fields adopt the store length).
    pub fn populate(
        &mut self,
        store: &dyn DataStore,
        window: &str,
        pane: PaneId,
        mode: CopyMode,
    ) -> Result<(), ExchangeError> {
        for i in 0..self.metas.len() {
            let meta = &self.metas[i];
            let source_pane = if meta.location == FieldLocation::SolverGlobal {
                GLOBAL_PANE
            } else {
                pane
            };
            let Some(array) = store.get_array(window, &meta.name, source_pane) else {
                log::warn!(
                    "mesh_exchange::data::registry: `{window}.{}` has no array on pane {source_pane}",
                    meta.name
                );
                continue;
            };
            let mode = if mode == CopyMode::Use && array.is_permuted() {
                log::warn!(
                    "mesh_exchange::data::registry: `{window}.{}` is not in mesh element order, copying",
                    meta.name
                );
                CopyMode::Copy
            } else {
                mode
            };
            match mode {
                CopyMode::Copy => {
                    let bytes = array.to_bytes();
                    if meta.width == ScalarWidth::Char {
                        let name = meta.name.clone();
                        self.set_bytes(&name, &bytes)?;
                        continue;
                    }
                    let buf = &self.buffers[i];
                    if buf.aliased {
                        return Err(ExchangeError::AliasedBuffer(meta.name.clone()));
                    }
                    let mut dst = buf.bytes.write();
                    if dst.len() != bytes.len() {
                        return Err(ExchangeError::BufferSizeMismatch {
                            name: meta.name.clone(),
                            expected: dst.len(),
                            found: bytes.len(),
                        });
                    }
                    dst.copy_from_slice(&bytes);
                }
                CopyMode::Use => {
                    self.buffers[i] = FieldBuffer {
                        bytes: array.buffer,
                        aliased: true,
                    };
                }
            }
        }
        Ok(())
    }
}

/// Store declaration for a field.
pub fn item_spec(meta: &FieldMeta) -> ItemSpec {
    ItemSpec::new(
        meta.location.to_store(),
        meta.width.to_store(),
        meta.ncomp,
        &meta.unit,
    )
}
