//! Conversion between in-memory solver state and store windows.
//!
//! Node and element numbering is 0-based everywhere in the crate except on
//! the store side of this boundary, where it is 1-based.

pub mod export;
pub mod import;
pub mod solver;

pub use export::{
    element_tables, mesh_to_surface_pane, mesh_to_volume_pane, store_element_order,
};
pub use import::{pane_to_mesh, update_agent_coordinates_from_pane};
pub use solver::{
    agent_to_pane, create_items_from_solution, create_solution_from_pane, destroy_solver,
    item_names, pane_to_agent, populate_agent_from_window, populate_metadata_from_pane,
    populate_solution_data_from_pane, register_solver, register_solver_into, unregister_solver,
};
