//! Raw byte buffers shared between a producer and the store.
//!
//! Buffers are untyped bytes, like the store's arrays; typed access goes
//! through the unaligned readers here so a `Vec<u8>` never has to be
//! reinterpreted in place.

use std::sync::Arc;

use bytemuck::Pod;
use parking_lot::RwLock;

/// A reference-counted, lockable byte buffer.
///
/// Cloning shares the same bytes; that is how "use mode" aliasing works.
pub type SharedBuffer = Arc<RwLock<Vec<u8>>>;

/// Wrap owned bytes in a fresh [`SharedBuffer`].
pub fn shared(bytes: Vec<u8>) -> SharedBuffer {
    Arc::new(RwLock::new(bytes))
}

/// Encode a slice of plain values as bytes.
pub fn to_bytes<T: Pod>(values: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// Decode every complete `T` in `bytes`.
pub fn from_bytes<T: Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

/// Read the `index`-th `T` of a byte buffer.
///
/// # Panics
/// Panics if the value lies outside `bytes`.
#[inline]
pub fn read_at<T: Pod>(bytes: &[u8], index: usize) -> T {
    let width = std::mem::size_of::<T>();
    bytemuck::pod_read_unaligned(&bytes[index * width..(index + 1) * width])
}

/// Overwrite the `index`-th `T` of a byte buffer.
///
/// # Panics
/// Panics if the value lies outside `bytes`.
#[inline]
pub fn write_at<T: Pod>(bytes: &mut [u8], index: usize, value: T) {
    let width = std::mem::size_of::<T>();
    bytes[index * width..(index + 1) * width].copy_from_slice(bytemuck::bytes_of(&value));
}
