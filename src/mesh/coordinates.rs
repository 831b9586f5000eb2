//! Node coordinate storage.
//!
//! Coordinates are kept as one contiguous buffer of `3 * len` doubles so the
//! buffer itself can be handed to the store in use mode.

use crate::data::buffer::{self, SharedBuffer};
use crate::debug_invariants::DebugInvariants;
use crate::exchange_error::ExchangeError;

const POINT_BYTES: usize = 3 * std::mem::size_of::<f64>();

/// Contiguous xyz coordinates of a mesh's nodes, indexed from 0.
#[derive(Debug)]
pub struct NodeCoordinates {
    data: SharedBuffer,
}

// Clones own their bytes; sharing only happens through `shared_buffer`.
impl Clone for NodeCoordinates {
    fn clone(&self) -> Self {
        Self {
            data: buffer::shared(self.data.read().clone()),
        }
    }
}

impl Default for NodeCoordinates {
    fn default() -> Self {
        Self {
            data: buffer::shared(Vec::new()),
        }
    }
}

impl NodeCoordinates {
    /// Build from a flat interleaved `[x0,y0,z0,x1,...]` slice.
    pub fn from_flat(xyz: &[f64]) -> Result<Self, ExchangeError> {
        let mut nc = Self::default();
        nc.init_from_flat(xyz.len() / 3, xyz, 3)?;
        Ok(nc)
    }

    /// Replace the contents with `count` points read every `stride` values.
    ///
    /// Point `i` is read from `src[i * stride .. i * stride + 3]`.
    pub fn init_from_flat(
        &mut self,
        count: usize,
        src: &[f64],
        stride: usize,
    ) -> Result<(), ExchangeError> {
        if stride < 3 {
            return Err(ExchangeError::Precondition(format!(
                "coordinate stride {stride} is smaller than 3"
            )));
        }
        if count > 0 && (count - 1) * stride + 3 > src.len() {
            return Err(ExchangeError::BufferSizeMismatch {
                name: "nc".into(),
                expected: ((count - 1) * stride + 3) * std::mem::size_of::<f64>(),
                found: src.len() * std::mem::size_of::<f64>(),
            });
        }
        let mut packed = Vec::with_capacity(count * 3);
        for i in 0..count {
            packed.extend_from_slice(&src[i * stride..i * stride + 3]);
        }
        *self.data.write() = buffer::to_bytes(&packed);
        Ok(())
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.read().len() / POINT_BYTES
    }

    /// `true` when there are no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of node `i`, or `None` past the end.
    pub fn point(&self, i: usize) -> Option<[f64; 3]> {
        let bytes = self.data.read();
        if (i + 1) * POINT_BYTES > bytes.len() {
            return None;
        }
        Some([
            buffer::read_at(&bytes, 3 * i),
            buffer::read_at(&bytes, 3 * i + 1),
            buffer::read_at(&bytes, 3 * i + 2),
        ])
    }

    /// Overwrite node `i`.
    pub fn set_point(&mut self, i: usize, xyz: [f64; 3]) -> Result<(), ExchangeError> {
        let mut bytes = self.data.write();
        if (i + 1) * POINT_BYTES > bytes.len() {
            return Err(ExchangeError::Precondition(format!(
                "node index {i} out of range"
            )));
        }
        for (k, value) in xyz.into_iter().enumerate() {
            buffer::write_at(&mut bytes, 3 * i + k, value);
        }
        Ok(())
    }

    /// Append one node; returns its 0-based index.
    pub fn push(&mut self, xyz: [f64; 3]) -> usize {
        let mut bytes = self.data.write();
        bytes.extend_from_slice(bytemuck::cast_slice::<f64, u8>(&xyz[..]));
        bytes.len() / POINT_BYTES - 1
    }

    /// Flat copy of all coordinates.
    pub fn to_vec(&self) -> Vec<f64> {
        buffer::from_bytes(&self.data.read())
    }

    /// The underlying buffer, shared rather than copied.
    pub fn shared_buffer(&self) -> SharedBuffer {
        self.data.clone()
    }

    /// Release spare capacity left by incremental growth.
    pub fn compact(&mut self) {
        self.data.write().shrink_to_fit();
    }
}

impl DebugInvariants for NodeCoordinates {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "NodeCoordinates");
    }

    fn validate_invariants(&self) -> Result<(), ExchangeError> {
        let len = self.data.read().len();
        if len % POINT_BYTES != 0 {
            return Err(ExchangeError::BufferSizeMismatch {
                name: "nc".into(),
                expected: (len / POINT_BYTES) * POINT_BYTES,
                found: len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_init_skips_padding() {
        let src = [0.0, 1.0, 2.0, -1.0, 3.0, 4.0, 5.0, -1.0];
        let mut nc = NodeCoordinates::default();
        nc.init_from_flat(2, &src, 4).unwrap();
        assert_eq!(nc.len(), 2);
        assert_eq!(nc.point(1), Some([3.0, 4.0, 5.0]));
        assert_eq!(nc.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        nc.validate_invariants().unwrap();
    }

    #[test]
    fn short_source_is_rejected() {
        let mut nc = NodeCoordinates::default();
        let err = nc.init_from_flat(2, &[0.0; 5], 3).unwrap_err();
        assert!(matches!(err, ExchangeError::BufferSizeMismatch { .. }));
        assert!(nc.init_from_flat(1, &[0.0; 3], 2).is_err());
    }

    #[test]
    fn push_then_compact() {
        let mut nc = NodeCoordinates::default();
        assert_eq!(nc.push([1.0, 2.0, 3.0]), 0);
        assert_eq!(nc.push([4.0, 5.0, 6.0]), 1);
        nc.compact();
        assert_eq!(nc.len(), 2);
        assert_eq!(nc.point(2), None);
    }
}
