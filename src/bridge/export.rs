//! In-memory mesh → store pane.

use crate::data::buffer;
use crate::data::registry::CopyMode;
use crate::exchange_error::ExchangeError;
use crate::mesh::{ElementShape, MeshVariant, UnstructuredMesh};
use crate::store::{ArrayHandle, DataStore, PaneId, COORDINATES_ITEM};

/// Write a triangle/quadrilateral mesh to a pane.
pub fn mesh_to_surface_pane(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    mesh: &UnstructuredMesh,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    mesh_to_pane(store, window, pane, mesh, mode, MeshVariant::Surface)
}

/// Write a tetrahedron/pyramid/prism/hexahedron mesh to a pane.
pub fn mesh_to_volume_pane(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    mesh: &UnstructuredMesh,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    mesh_to_pane(store, window, pane, mesh, mode, MeshVariant::Volume)
}

/// Elements grouped by connectivity table, tables in name order.
///
/// This is the order element-located store arrays use. Fails if `variant`
/// does not accept some element's arity.
pub fn element_tables(
    mesh: &UnstructuredMesh,
    variant: MeshVariant,
) -> Result<Vec<(ElementShape, Vec<usize>)>, ExchangeError> {
    let mut tables = Vec::new();
    for (arity, elements) in mesh.con.bucket_by_arity() {
        let shape = ElementShape::classify(arity, variant)
            .ok_or(ExchangeError::ElementNotAccepted { arity, variant })?;
        tables.push((shape, elements));
    }
    tables.sort_by_key(|(shape, _)| shape.table_name());
    Ok(tables)
}

/// Mesh element stored at each store element position.
pub fn store_element_order(
    mesh: &UnstructuredMesh,
    variant: MeshVariant,
) -> Result<Vec<usize>, ExchangeError> {
    Ok(element_tables(mesh, variant)?
        .into_iter()
        .flat_map(|(_, elements)| elements)
        .collect())
}

/// Write a mesh to a pane, accepting only the shapes of `variant`.
///
/// Nodes are aliased in use mode when there are any; connectivity is always
/// copied, one element-major table per shape, with 1-based node numbers.
pub fn mesh_to_pane(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    mesh: &UnstructuredMesh,
    mode: CopyMode,
    variant: MeshVariant,
) -> Result<(), ExchangeError> {
    // Validate every element before touching the store.
    let tables = element_tables(mesh, variant)?;

    write_nodes(store, window, pane, mesh, mode)?;

    for (shape, elements) in tables {
        let table = shape.table_name();
        let arity = shape.arity();
        store.set_size(window, table, pane, elements.len())?;
        let target = store.resize_array(window, table, pane)?;
        let mut bytes = target.buffer.write();
        for (e, &element) in elements.iter().enumerate() {
            let nodes = mesh.con.element(element).ok_or_else(|| {
                ExchangeError::Precondition(format!("element {element} out of range"))
            })?;
            for (j, &node) in nodes.iter().enumerate() {
                let id = i32::try_from(node + 1).map_err(|_| {
                    ExchangeError::Precondition(format!("node index {node} exceeds i32"))
                })?;
                buffer::write_at(&mut bytes, target.index(e, j), id);
            }
        }
        log::debug!(
            "exported {} {shape:?} elements to `{window}.{table}` pane {pane}",
            elements.len()
        );
        debug_assert_eq!(bytes.len(), elements.len() * arity * std::mem::size_of::<i32>());
    }
    Ok(())
}

fn write_nodes(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    mesh: &UnstructuredMesh,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    let count = mesh.num_nodes();
    store.set_size(window, COORDINATES_ITEM, pane, count)?;
    if mode == CopyMode::Use && count > 0 {
        let handle = ArrayHandle::interleaved(mesh.nc.shared_buffer(), 3, count);
        return store.set_array(window, COORDINATES_ITEM, pane, handle);
    }
    let target = store.resize_array(window, COORDINATES_ITEM, pane)?;
    let source = buffer::to_bytes(&mesh.nc.to_vec());
    let mut bytes = target.buffer.write();
    if bytes.len() != source.len() {
        return Err(ExchangeError::BufferSizeMismatch {
            name: format!("{window}.{COORDINATES_ITEM}"),
            expected: source.len(),
            found: bytes.len(),
        });
    }
    bytes.copy_from_slice(&source);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Connectivity, NodeCoordinates};
    use crate::store::memory::InMemoryStore;
    use crate::store::WindowScope;

    fn mixed_surface() -> UnstructuredMesh {
        let nc = NodeCoordinates::from_flat(&[0.0; 15]).unwrap();
        let con = Connectivity::from_elements([vec![0, 1, 2, 3], vec![1, 4, 2]]).unwrap();
        UnstructuredMesh::from_parts(nc, con, MeshVariant::Surface)
    }

    #[test]
    fn surface_export_writes_one_table_per_shape() {
        let store = InMemoryStore::new();
        store.create_window("s", WindowScope::Group).unwrap();
        mesh_to_surface_pane(&store, "s", 2, &mixed_surface(), CopyMode::Copy).unwrap();
        assert_eq!(
            store.list_connectivity_tables("s", 2).unwrap(),
            vec![":q4:".to_string(), ":t3:".to_string()]
        );
        let tri = store.get_array("s", ":t3:", 2).unwrap();
        assert_eq!(buffer::from_bytes::<i32>(&tri.to_bytes()), vec![2, 5, 3]);
    }

    #[test]
    fn store_order_follows_table_names() {
        let nc = NodeCoordinates::from_flat(&[0.0; 15]).unwrap();
        let con =
            Connectivity::from_elements([vec![0, 1, 2], vec![0, 1, 2, 3], vec![1, 4, 2]]).unwrap();
        let mesh = UnstructuredMesh::from_parts(nc, con, MeshVariant::Surface);
        assert_eq!(store_element_order(&mesh, MeshVariant::Surface).unwrap(), vec![1, 0, 2]);

        let nc = NodeCoordinates::from_flat(&[0.0; 24]).unwrap();
        let con = Connectivity::from_elements([
            vec![0, 1, 2, 3],
            vec![0, 1, 2, 3, 4, 5, 6, 7],
            vec![0, 1, 2, 3, 4],
        ])
        .unwrap();
        let mesh = UnstructuredMesh::from_parts(nc, con, MeshVariant::Volume);
        // :H8: < :P5: < :T4:
        assert_eq!(store_element_order(&mesh, MeshVariant::Volume).unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn volume_export_rejects_triangles() {
        let store = InMemoryStore::new();
        store.create_window("v", WindowScope::Group).unwrap();
        let err = mesh_to_volume_pane(&store, "v", 1, &mixed_surface(), CopyMode::Copy).unwrap_err();
        assert_eq!(
            err,
            ExchangeError::ElementNotAccepted {
                arity: 3,
                variant: MeshVariant::Volume
            }
        );
        assert!(store.get_array("v", "nc", 1).is_none());
    }
}
