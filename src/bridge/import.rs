//! Store pane → in-memory mesh.

use crate::agent::SolverAgent;
use crate::data::buffer;
use crate::exchange_error::ExchangeError;
use crate::mesh::{Connectivity, ElementShape, MeshVariant, NodeCoordinates, UnstructuredMesh};
use crate::store::{ArrayHandle, DataStore, PaneId, COORDINATES_ITEM};

/// Read the node coordinates of a pane.
///
/// The node count is `stride * capacity / 3`.
pub fn read_coordinates(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
) -> Result<NodeCoordinates, ExchangeError> {
    let array = store
        .get_array(window, COORDINATES_ITEM, pane)
        .ok_or_else(|| ExchangeError::MissingCoordinates {
            window: window.to_string(),
            pane,
        })?;
    let count = array.items(3);
    let bytes = array.buffer.read();
    let scalars = bytes.len() / std::mem::size_of::<f64>();
    let mut flat = Vec::with_capacity(count * 3);
    for i in 0..count {
        for j in 0..3 {
            let at = array.index(i, j);
            if at >= scalars {
                return Err(ExchangeError::BufferSizeMismatch {
                    name: format!("{window}.{COORDINATES_ITEM}"),
                    expected: (at + 1) * std::mem::size_of::<f64>(),
                    found: bytes.len(),
                });
            }
            flat.push(buffer::read_at::<f64>(&bytes, at));
        }
    }
    NodeCoordinates::from_flat(&flat)
}

/// Element-major, 0-based node indices of a connectivity table.
///
/// The store numbers nodes from 1; any index outside `1..=num_nodes` is rejected.
pub fn read_table(
    table: &str,
    array: &ArrayHandle,
    arity: usize,
    num_nodes: usize,
) -> Result<Vec<usize>, ExchangeError> {
    let count = array.items(arity);
    let bytes = array.buffer.read();
    let scalars = bytes.len() / std::mem::size_of::<i32>();
    let mut nodes = Vec::with_capacity(count * arity);
    for e in 0..count {
        for j in 0..arity {
            let at = array.index(e, j);
            if at >= scalars {
                return Err(ExchangeError::BufferSizeMismatch {
                    name: table.to_string(),
                    expected: (at + 1) * std::mem::size_of::<i32>(),
                    found: bytes.len(),
                });
            }
            let id = buffer::read_at::<i32>(&bytes, at);
            if id < 1 || id as usize > num_nodes {
                return Err(ExchangeError::Precondition(format!(
                    "table `{table}` element {e} references node {id} of {num_nodes}"
                )));
            }
            nodes.push(id as usize - 1);
        }
    }
    Ok(nodes)
}

/// Rebuild the mesh held on one pane of a window.
///
/// Every connectivity table must carry a recognized topology suffix;
/// anything else aborts the import with [`ExchangeError::UnknownTopology`].
/// Elements come out grouped by table, in table-name order.
pub fn pane_to_mesh(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
) -> Result<UnstructuredMesh, ExchangeError> {
    let nc = read_coordinates(store, window, pane)?;
    let num_nodes = nc.len();
    let mut con = Connectivity::new();
    let mut variant = MeshVariant::Surface;
    for table in store.list_connectivity_tables(window, pane)? {
        let shape = ElementShape::from_table_name(&table)
            .ok_or_else(|| ExchangeError::UnknownTopology { table: table.clone() })?;
        if shape.dimension() == 3 {
            variant = MeshVariant::Volume;
        }
        let Some(array) = store.get_array(window, &table, pane) else {
            log::debug!("table `{window}.{table}` on pane {pane} has no array");
            continue;
        };
        let arity = shape.arity();
        let nodes = read_table(&table, &array, arity, num_nodes)?;
        for element in nodes.chunks_exact(arity) {
            con.add_element(element)?;
        }
        log::debug!(
            "imported {} {shape:?} elements from `{window}.{table}`",
            nodes.len() / arity
        );
    }
    let mut mesh = UnstructuredMesh::from_parts(nc, con, variant);
    mesh.compact();
    Ok(mesh)
}

/// Replace an agent's node coordinates with those of a pane.
pub fn update_agent_coordinates_from_pane(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    agent: &mut SolverAgent,
) -> Result<(), ExchangeError> {
    agent.mesh.nc = read_coordinates(store, window, pane)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{array_from_values, InMemoryStore};
    use crate::store::WindowScope;

    fn store_with_nodes(n: usize) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.create_window("w", WindowScope::Group).unwrap();
        let xyz: Vec<f64> = (0..3 * n).map(|v| v as f64).collect();
        store.set_array("w", "nc", 1, array_from_values(&xyz, 3)).unwrap();
        store
    }

    #[test]
    fn missing_coordinates_are_reported() {
        let store = InMemoryStore::new();
        store.create_window("w", WindowScope::Group).unwrap();
        assert!(matches!(
            pane_to_mesh(&store, "w", 1),
            Err(ExchangeError::MissingCoordinates { pane: 1, .. })
        ));
    }

    #[test]
    fn out_of_range_node_is_rejected() {
        let store = store_with_nodes(3);
        store.set_array("w", ":t3:", 1, array_from_values(&[1i32, 2, 4], 3)).unwrap();
        assert!(matches!(
            pane_to_mesh(&store, "w", 1),
            Err(ExchangeError::Precondition(_))
        ));
    }

    #[test]
    fn volume_tables_select_volume_variant() {
        let store = store_with_nodes(4);
        store.set_array("w", ":T4:", 1, array_from_values(&[1i32, 2, 3, 4], 4)).unwrap();
        let mesh = pane_to_mesh(&store, "w", 1).unwrap();
        assert_eq!(mesh.variant, MeshVariant::Volume);
        assert_eq!(mesh.shape(0), Some(ElementShape::Tetrahedron));
        assert_eq!(mesh.con.element(0), Some(&[0, 1, 2, 3][..]));
    }
}
