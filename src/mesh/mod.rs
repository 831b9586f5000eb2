//! In-memory mesh model.

pub mod cell_type;
pub mod connectivity;
pub mod coordinates;
pub mod unstructured;

pub use cell_type::{ElementShape, MeshVariant};
pub use connectivity::Connectivity;
pub use coordinates::NodeCoordinates;
pub use unstructured::UnstructuredMesh;
