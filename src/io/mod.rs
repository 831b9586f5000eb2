//! Output paths: legacy VTK streams and whole-window snapshots.

pub mod time_string;
pub mod vtk;
pub mod window_writer;

pub use time_string::{decode_time, encode_time};
pub use vtk::{write_mesh_vtk, write_vtk_to_stream};
pub use window_writer::{snapshot_prefix, write_window};
