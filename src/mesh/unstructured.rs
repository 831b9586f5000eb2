//! In-memory unstructured mesh: node coordinates plus mixed connectivity.

use crate::debug_invariants::DebugInvariants;
use crate::exchange_error::ExchangeError;
use crate::mesh::cell_type::{ElementShape, MeshVariant};
use crate::mesh::connectivity::Connectivity;
use crate::mesh::coordinates::NodeCoordinates;

/// A mesh owned by one solver.
#[derive(Clone, Debug, Default)]
pub struct UnstructuredMesh {
    /// Node coordinates.
    pub nc: NodeCoordinates,
    /// Element connectivity (0-based node indices).
    pub con: Connectivity,
    /// Shape family used to resolve ambiguous arities.
    pub variant: MeshVariant,
}

impl UnstructuredMesh {
    /// Empty surface mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a mesh from parts.
    pub fn from_parts(nc: NodeCoordinates, con: Connectivity, variant: MeshVariant) -> Self {
        Self { nc, con, variant }
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nc.len()
    }

    /// Number of elements.
    pub fn num_elements(&self) -> usize {
        self.con.len()
    }

    /// Shape of element `i` under this mesh's variant.
    ///
    /// Two-node elements resolve to bars in either variant.
    pub fn shape(&self, i: usize) -> Option<ElementShape> {
        let arity = self.con.element(i)?.len();
        if arity == 2 {
            return Some(ElementShape::Bar);
        }
        ElementShape::classify(arity, self.variant)
    }

    /// Compact both coordinate and connectivity storage.
    pub fn compact(&mut self) {
        self.nc.compact();
        self.con.compact();
    }
}

impl DebugInvariants for UnstructuredMesh {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "UnstructuredMesh");
    }

    fn validate_invariants(&self) -> Result<(), ExchangeError> {
        self.nc.validate_invariants()?;
        self.con.validate_nodes(self.nc.len())
    }
}
