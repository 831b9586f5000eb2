mod util;

use mesh_exchange::agent::SolverAgent;
use mesh_exchange::bridge::{pane_to_mesh, populate_agent_from_window};
use mesh_exchange::data::buffer;
use mesh_exchange::data::registry::CopyMode;
use mesh_exchange::exchange_error::{ErrorClass, ExchangeError};
use mesh_exchange::store::memory::{array_from_values, InMemoryStore};
use mesh_exchange::store::{ArrayHandle, DataStore, WindowScope, COORDINATES_ITEM};

fn two_quad_nodes(store: &InMemoryStore, window: &str) {
    let nodes = [
        0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 2.0, 1.0, 0.0f64,
    ];
    store
        .set_array(window, COORDINATES_ITEM, 1, array_from_values(&nodes, 3))
        .unwrap();
}

#[test]
fn slot_major_tables_are_transposed_on_import() {
    let store = InMemoryStore::new();
    store.create_window("grid", WindowScope::Group).unwrap();
    two_quad_nodes(&store, "grid");
    // Quads (1,2,5,4) and (2,3,6,5) stored component by component.
    let slots: [i32; 8] = [1, 2, 2, 3, 5, 6, 4, 5];
    let table = ArrayHandle::slot_major(buffer::shared(buffer::to_bytes(&slots)), 2, 4);
    store.set_array("grid", ":q4:", 1, table).unwrap();

    let mesh = pane_to_mesh(&store, "grid", 1).unwrap();
    assert_eq!(mesh.num_elements(), 2);
    assert_eq!(mesh.con.element(0), Some(&[0, 1, 4, 3][..]));
    assert_eq!(mesh.con.element(1), Some(&[1, 2, 5, 4][..]));
}

#[test]
fn slot_major_coordinates_are_read_by_component() {
    let store = InMemoryStore::new();
    store.create_window("pts", WindowScope::Group).unwrap();
    // x of both nodes, then y, then z.
    let xyz = [1.0, 2.0, 10.0, 20.0, 100.0, 200.0f64];
    let nc = ArrayHandle::slot_major(buffer::shared(buffer::to_bytes(&xyz)), 2, 3);
    store.set_array("pts", COORDINATES_ITEM, 1, nc).unwrap();
    let mesh = pane_to_mesh(&store, "pts", 1).unwrap();
    assert_eq!(mesh.nc.point(1), Some([2.0, 20.0, 200.0]));
}

#[test]
fn unknown_table_suffix_is_fatal() {
    let store = InMemoryStore::new();
    store.create_window("odd", WindowScope::Group).unwrap();
    two_quad_nodes(&store, "odd");
    store
        .set_array("odd", ":x7:", 1, array_from_values(&[1i32, 2, 3, 4, 5, 6, 1], 7))
        .unwrap();

    let err = pane_to_mesh(&store, "odd", 1).unwrap_err();
    assert_eq!(err.class(), ErrorClass::FatalFormat);
    assert_eq!(
        err,
        ExchangeError::UnknownTopology {
            table: ":x7:".to_string()
        }
    );

    let mut agent = SolverAgent::new();
    let err = populate_agent_from_window(&store, "odd", &mut agent, CopyMode::Copy).unwrap_err();
    assert_eq!(err.status_code(), 3);
    assert_eq!(err.class(), ErrorClass::FatalFormat);
}

#[test]
fn tables_without_arrays_are_skipped() {
    let store = InMemoryStore::new();
    store.create_window("lazy", WindowScope::Group).unwrap();
    two_quad_nodes(&store, "lazy");
    store.set_size("lazy", ":t3:", 1, 0).unwrap();
    let mesh = pane_to_mesh(&store, "lazy", 1).unwrap();
    assert_eq!(mesh.num_nodes(), 6);
    assert!(mesh.con.is_empty());
}
