#![allow(dead_code)]
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mesh_exchange::algs::communicator::Communicator;
use mesh_exchange::agent::SolverAgent;
use mesh_exchange::data::field_meta::{FieldLocation, FieldMeta, ScalarWidth};
use mesh_exchange::exchange_error::ExchangeError;
use mesh_exchange::mesh::{Connectivity, MeshVariant, NodeCoordinates, UnstructuredMesh};
use mesh_exchange::store::memory::array_from_values;
use mesh_exchange::store::modules::{
    LsqOptions, MeshReader, ModuleRegistry, OverlayEngine, WindowWriter,
};
use mesh_exchange::store::{DataStore, ItemHandle, WindowScope, COORDINATES_ITEM};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Shared, ordered record of module calls.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mesh-exchange-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Overlay engine that records every call and persists overlays as JSON.
pub struct FakeOverlayEngine {
    pub name: String,
    pub log: CallLog,
    pub dir: PathBuf,
    pub fail_overlay: bool,
}

impl FakeOverlayEngine {
    fn record(&self, entry: String) {
        self.log.lock().push(format!("{}:{entry}", self.name));
    }

    fn artifact(&self, prefix: &str) -> PathBuf {
        self.dir.join(format!("{prefix}.json"))
    }
}

impl OverlayEngine for FakeOverlayEngine {
    fn set_verbosity(&mut self, level: u32) {
        self.record(format!("verbosity {level}"));
    }

    fn overlay(
        &mut self,
        store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
    ) -> Result<(), ExchangeError> {
        self.record(format!("overlay {mesh_a} {mesh_b}"));
        if self.fail_overlay {
            return Err(ExchangeError::Module {
                module: "SurfX".into(),
                message: "overlay refused".into(),
            });
        }
        for h in [mesh_a, mesh_b] {
            if !store.has_window(&h.window) {
                return Err(ExchangeError::MissingWindow(h.window.clone()));
            }
        }
        Ok(())
    }

    fn write_overlay(
        &mut self,
        store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
        prefix_a: &str,
        prefix_b: &str,
        format: &str,
    ) -> Result<(), ExchangeError> {
        self.record(format!("write {prefix_a} {prefix_b} {format}"));
        for (prefix, h) in [(prefix_a, mesh_a), (prefix_b, mesh_b)] {
            let panes = store.panes(&h.window)?;
            let doc = json!({ "mesh": h.to_string(), "panes": panes, "format": format });
            std::fs::write(self.artifact(prefix), serde_json::to_string(&doc)?)?;
        }
        Ok(())
    }

    fn read_overlay(
        &mut self,
        _store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
        comm: &dyn Communicator,
        prefix_a: &str,
        prefix_b: &str,
        format: &str,
    ) -> Result<(), ExchangeError> {
        self.record(format!(
            "read {mesh_a} {mesh_b} {prefix_a} {prefix_b} {format} rank {}",
            comm.rank()
        ));
        for prefix in [prefix_a, prefix_b] {
            let text = std::fs::read_to_string(self.artifact(prefix))?;
            let doc: Value = serde_json::from_str(&text)?;
            if doc["format"] != format {
                return Err(ExchangeError::Module {
                    module: "SurfX".into(),
                    message: format!("artifact `{prefix}` has the wrong format"),
                });
            }
        }
        Ok(())
    }

    fn clear_overlay(
        &mut self,
        _store: &dyn DataStore,
        mesh_a: &ItemHandle,
        mesh_b: &ItemHandle,
    ) -> Result<(), ExchangeError> {
        self.record(format!("clear {mesh_a} {mesh_b}"));
        Ok(())
    }

    fn least_squares_transfer(
        &mut self,
        _store: &dyn DataStore,
        source: &ItemHandle,
        target: &ItemHandle,
        options: &LsqOptions,
    ) -> Result<(), ExchangeError> {
        self.record(format!(
            "lsq {source} {target} tol {} iter {}",
            options.tolerance, options.max_iterations
        ));
        Ok(())
    }

    fn interpolate(
        &mut self,
        _store: &dyn DataStore,
        source: &ItemHandle,
        target: &ItemHandle,
    ) -> Result<(), ExchangeError> {
        self.record(format!("interpolate {source} {target}"));
        Ok(())
    }

    fn load_transfer(
        &mut self,
        _store: &dyn DataStore,
        source: &ItemHandle,
        target: &ItemHandle,
    ) -> Result<(), ExchangeError> {
        self.record(format!("load {source} {target}"));
        Ok(())
    }
}

/// Mesh reader over JSON documents `{"nodes": [..], "tables": {":t3:": [..]}}`.
pub struct FakeMeshReader {
    pub log: CallLog,
}

impl MeshReader for FakeMeshReader {
    fn read_mesh(
        &mut self,
        store: &dyn DataStore,
        path: &str,
        window: &str,
        scope: WindowScope,
    ) -> Result<(), ExchangeError> {
        self.log.lock().push(format!("read_mesh {path} {window} {scope:?}"));
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        store.create_window(window, scope)?;
        let nodes: Vec<f64> = serde_json::from_value(doc["nodes"].clone())?;
        store.set_array(window, COORDINATES_ITEM, 1, array_from_values(&nodes, 3))?;
        if let Some(tables) = doc["tables"].as_object() {
            for (table, ids) in tables {
                let ids: Vec<i32> = serde_json::from_value(ids.clone())?;
                let arity = mesh_exchange::store::table_arity(table).unwrap_or(1);
                store.set_array(window, table, 1, array_from_values(&ids, arity))?;
            }
        }
        Ok(())
    }
}

/// Writer that records options and writes.
pub struct FakeWriter {
    pub log: CallLog,
}

impl WindowWriter for FakeWriter {
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), ExchangeError> {
        self.log.lock().push(format!("option {key}={value}"));
        Ok(())
    }

    fn write_items(
        &mut self,
        _store: &dyn DataStore,
        prefix: &str,
        item: &ItemHandle,
        window: &str,
        time: &str,
    ) -> Result<(), ExchangeError> {
        self.log.lock().push(format!("write {prefix} {item} {window} {time}"));
        Ok(())
    }
}

/// Registry with the fakes registered under the default module names.
pub fn registry_with_fakes(log: &CallLog, dir: &Path) -> ModuleRegistry {
    registry_with_engine(log, dir, false)
}

/// Like [`registry_with_fakes`], optionally making every overlay fail.
pub fn registry_with_engine(log: &CallLog, dir: &Path, fail_overlay: bool) -> ModuleRegistry {
    let modules = ModuleRegistry::new();
    let (l, d) = (log.clone(), dir.to_path_buf());
    modules.register::<dyn OverlayEngine, _>("SurfX", move |name| {
        Ok(Box::new(FakeOverlayEngine {
            name: name.to_string(),
            log: l.clone(),
            dir: d.clone(),
            fail_overlay,
        }) as Box<dyn OverlayEngine>)
    });
    let l = log.clone();
    modules.register::<dyn MeshReader, _>("SimIN", move |_| {
        Ok(Box::new(FakeMeshReader { log: l.clone() }) as Box<dyn MeshReader>)
    });
    let l = log.clone();
    modules.register::<dyn WindowWriter, _>("SimOUT", move |_| {
        Ok(Box::new(FakeWriter { log: l.clone() }) as Box<dyn WindowWriter>)
    });
    modules
}

/// Write a reader document for `mesh` (1-based tables) and return its path.
pub fn write_mesh_file(dir: &Path, file: &str, nodes: &[f64], tables: &[(&str, Vec<i32>)]) -> String {
    let tables: serde_json::Map<String, Value> = tables
        .iter()
        .map(|(name, ids)| (name.to_string(), json!(ids)))
        .collect();
    let path = dir.join(file);
    std::fs::write(&path, json!({ "nodes": nodes, "tables": tables }).to_string()).unwrap();
    path.to_string_lossy().into_owned()
}

/// Unit square split into one quadrilateral.
pub fn unit_square() -> UnstructuredMesh {
    let nc = NodeCoordinates::from_flat(&[
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0,
    ])
    .unwrap();
    let con = Connectivity::from_elements([vec![0, 1, 2, 3]]).unwrap();
    UnstructuredMesh::from_parts(nc, con, MeshVariant::Surface)
}

/// Two triangles and one quadrilateral over five nodes.
pub fn mixed_surface() -> UnstructuredMesh {
    let nc = NodeCoordinates::from_flat(&[
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0, //
        2.0, 0.5, 0.0,
    ])
    .unwrap();
    let con = Connectivity::from_elements([vec![0, 1, 2], vec![1, 4, 2], vec![0, 1, 2, 3]]).unwrap();
    UnstructuredMesh::from_parts(nc, con, MeshVariant::Surface)
}

/// Agent on the unit square with a node temperature, a cell pressure and a global step.
pub fn square_agent() -> SolverAgent {
    let mut agent = SolverAgent::with_mesh(unit_square());
    let fields = [
        FieldMeta::new("temp", FieldLocation::Node, ScalarWidth::Double, 1, "K"),
        FieldMeta::new("pc", FieldLocation::Cell, ScalarWidth::Double, 1, "Pa"),
        FieldMeta::new("step", FieldLocation::SolverGlobal, ScalarWidth::Int, 1, ""),
    ];
    for meta in fields {
        agent.solution.add_field(meta).unwrap();
    }
    agent.allocate_solution().unwrap();
    agent.solution.set_f64s("temp", &[1.0, 2.0, 3.0, 4.0]).unwrap();
    agent.solution.set_f64s("pc", &[0.0]).unwrap();
    agent.solution.set_i32s("step", &[7]).unwrap();
    agent
}

/// Sorted element lists, for order-insensitive comparisons.
pub fn sorted_elements(mesh: &UnstructuredMesh) -> Vec<Vec<usize>> {
    let mut elements: Vec<Vec<usize>> = mesh.con.iter().map(<[usize]>::to_vec).collect();
    elements.sort();
    elements
}
