mod util;

use mesh_exchange::bridge::register_solver;
use mesh_exchange::config::ExchangeConfig;
use mesh_exchange::data::field_meta::{FieldLocation, FieldMeta, ScalarWidth};
use mesh_exchange::exchange_error::{ErrorClass, ExchangeError};
use mesh_exchange::io::{decode_time, write_vtk_to_stream, write_window};
use mesh_exchange::store::memory::InMemoryStore;
use util::*;

#[test]
fn vtk_stream_carries_mesh_and_fields() {
    let mut agent = square_agent();
    agent
        .solution
        .add_field(FieldMeta::new("vel", FieldLocation::Node, ScalarWidth::Double, 3, "m/s"))
        .unwrap();
    agent
        .solution
        .add_field(FieldMeta::new("name", FieldLocation::Node, ScalarWidth::Char, 1, ""))
        .unwrap();
    agent.allocate_solution().unwrap();
    let vel: Vec<f64> = (0..12).map(f64::from).collect();
    agent.solution.set_f64s("vel", &vel).unwrap();
    agent.solution.set_f64s("pc", &[0.5]).unwrap();

    let mut out = Vec::new();
    write_vtk_to_stream("square", &agent, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "# vtk DataFile Version 3.0");
    assert_eq!(lines[1], "square");
    assert_eq!(lines[3], "DATASET UNSTRUCTURED_GRID");
    assert_eq!(lines[4], "POINTS 4 double");
    assert!(text.contains("CELLS 1 5\n4 0 1 2 3\n"));
    assert!(text.contains("CELL_TYPES 1\n9\n"));
    assert!(text.contains("POINT_DATA 4\nSCALARS temp double 1\nLOOKUP_TABLE default\n1\n2\n3\n4\n"));
    assert!(text.contains("VECTORS vel double\n0 1 2\n3 4 5\n6 7 8\n9 10 11\n"));
    assert!(text.contains("CELL_DATA 1\nSCALARS pc double 1\nLOOKUP_TABLE default\n0.5\n"));
    // Global and string fields have no VTK counterpart.
    assert!(!text.contains("step"));
    assert!(!text.contains("SCALARS name"));
}

#[test]
fn window_snapshots_are_named_by_time() {
    let store = InMemoryStore::new();
    register_solver(&store, "fluid", &square_agent(), 101).unwrap();
    let log = call_log();
    let modules = registry_with_fakes(&log, &scratch_dir("snapshot"));
    let config = ExchangeConfig::default();

    let prefix = write_window(&store, &modules, &config, "fluid", 2.5e-3).unwrap();
    assert_eq!(prefix, "fluid_07.250000_00000");
    let stamp = prefix.split('_').nth(1).unwrap();
    assert!((decode_time(stamp).unwrap() - 2.5e-3).abs() < 1e-12);

    let entries = log.lock().clone();
    assert_eq!(
        entries,
        vec![
            "option rankwidth=0".to_string(),
            "write fluid_07.250000_00000 fluid.all fluid 07.250000".to_string(),
        ]
    );
    assert!(!modules.is_loaded(&config.writer_instance));
}

#[test]
fn snapshot_of_missing_window_fails_before_loading_the_writer() {
    let store = InMemoryStore::new();
    let log = call_log();
    let modules = registry_with_fakes(&log, &scratch_dir("snapshot-missing"));
    let err = write_window(&store, &modules, &ExchangeConfig::default(), "ghost", 1.0).unwrap_err();
    assert_eq!(err, ExchangeError::MissingWindow("ghost".to_string()));
    assert!(log.lock().is_empty());

    let err = write_window(&store, &modules, &ExchangeConfig::default(), "ghost", -1.0).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Precondition);
}
