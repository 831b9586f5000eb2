#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-exchange
//!
//! mesh-exchange moves solver state between in-memory unstructured meshes and
//! a windowed distributed data store, and drives overlay-based field
//! transfer between two mesh windows.
//!
//! ## Features
//! - Bidirectional mesh bridge: node coordinates and mixed-element
//!   connectivity tables in and out of store panes
//! - Field registry with copy/alias semantics for solver fields
//! - Sequential and process-group transfer sessions over a pluggable overlay engine
//! - Node-to-center interpolation with per-shape weighting rules
//! - Legacy VTK streaming and time-stamped window snapshots
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-exchange = "0.3"
//! # Optional features:
//! # features = ["mpi-support"]
//! ```
//!
//! The store and every external module (overlay engine, mesh reader, window
//! writer) are reached through traits in [`store`]; [`store::memory::InMemoryStore`]
//! and [`store::modules::ModuleRegistry`] are the in-process implementations.

pub mod agent;
pub mod algs;
pub mod bridge;
pub mod config;
pub mod data;
pub mod debug_invariants;
pub mod exchange_error;
pub mod io;
pub mod mesh;
pub mod store;
pub mod transfer;

pub use debug_invariants::DebugInvariants;
pub use exchange_error::{ErrorClass, ExchangeError};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::agent::SolverAgent;
    pub use crate::algs::center_interpolation::{CenterRule, RuleTable, WeightedRule};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm};
    pub use crate::bridge::{
        pane_to_agent, populate_agent_from_window, register_solver, unregister_solver,
    };
    pub use crate::config::ExchangeConfig;
    pub use crate::data::{CopyMode, FieldLocation, FieldMeta, FieldRegistry, ScalarWidth};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::exchange_error::{ErrorClass, ExchangeError};
    pub use crate::mesh::{
        Connectivity, ElementShape, MeshVariant, NodeCoordinates, UnstructuredMesh,
    };
    pub use crate::store::memory::InMemoryStore;
    pub use crate::store::modules::{
        LsqOptions, MeshReader, ModuleLease, ModuleRegistry, OverlayEngine, WindowWriter,
    };
    pub use crate::store::{DataStore, ItemHandle, PaneId, WindowScope};
    pub use crate::transfer::{ParallelTransferSession, TransferDirection, TransferSession};
}
