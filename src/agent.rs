//! A solver's exchange-side state: its mesh and its solution fields.

use crate::data::registry::FieldRegistry;
use crate::debug_invariants::DebugInvariants;
use crate::exchange_error::ExchangeError;
use crate::mesh::UnstructuredMesh;

/// One solver's mesh plus the fields defined on it.
#[derive(Clone, Debug, Default)]
pub struct SolverAgent {
    pub mesh: UnstructuredMesh,
    pub solution: FieldRegistry,
}

impl SolverAgent {
    /// Empty agent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Agent over an existing mesh with no fields yet.
    pub fn with_mesh(mesh: UnstructuredMesh) -> Self {
        Self {
            mesh,
            solution: FieldRegistry::new(),
        }
    }

    /// Size every field buffer for the current mesh.
    pub fn allocate_solution(&mut self) -> Result<(), ExchangeError> {
        let (nn, ne) = (self.mesh.num_nodes(), self.mesh.num_elements());
        self.solution.allocate(nn, ne)
    }
}

impl DebugInvariants for SolverAgent {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "SolverAgent");
    }

    fn validate_invariants(&self) -> Result<(), ExchangeError> {
        self.mesh.validate_invariants()?;
        let (nn, ne) = (self.mesh.num_nodes(), self.mesh.num_elements());
        for meta in self.solution.metas() {
            if let Some(expected) = meta.expected_bytes(nn, ne) {
                let found = self.solution.byte_len(&meta.name)?;
                if found != expected {
                    return Err(ExchangeError::BufferSizeMismatch {
                        name: meta.name.clone(),
                        expected,
                        found,
                    });
                }
            }
        }
        Ok(())
    }
}
