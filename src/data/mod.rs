//! Field metadata, raw buffers and the per-agent field registry.

pub mod buffer;
pub mod field_meta;
pub mod registry;

pub use buffer::SharedBuffer;
pub use field_meta::{FieldLocation, FieldMeta, ScalarWidth};
pub use registry::{CopyMode, FieldRegistry};
