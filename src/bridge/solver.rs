//! Solver-level registration and import built on the mesh and field bridges.
//!
//! Composite imports report which phase failed through the error's status
//! code: a missing window is 1, a window with other than one pane is 2, a
//! mesh import failure is 3, a metadata failure is 5 and a data population
//! failure is 6 (see [`ExchangeError::status_code`]).

use crate::agent::SolverAgent;
use crate::bridge::export::{mesh_to_pane, store_element_order};
use crate::bridge::import::pane_to_mesh;
use crate::data::registry::{CopyMode, FieldRegistry};
use crate::exchange_error::ExchangeError;
use crate::store::{DataStore, PaneId, WindowScope};

/// Phase offset of solution import inside [`pane_to_agent`].
const SOLUTION_PHASE: i32 = 2;
/// Phase offset of data population inside [`create_solution_from_pane`].
const DATA_PHASE: i32 = 1;
/// Phase offset of pane import inside [`populate_agent_from_window`].
const PANE_PHASE: i32 = 2;

/// Create `window`, publish the agent's fields and mesh on `pane`, and finalize.
///
/// Pane arrays alias the agent's buffers.
pub fn register_solver(
    store: &dyn DataStore,
    window: &str,
    agent: &SolverAgent,
    pane: PaneId,
) -> Result<(), ExchangeError> {
    store.create_window(window, WindowScope::Group)?;
    register_solver_into(store, window, agent, pane)
}

/// Like [`register_solver`] for a window that already exists.
pub fn register_solver_into(
    store: &dyn DataStore,
    window: &str,
    agent: &SolverAgent,
    pane: PaneId,
) -> Result<(), ExchangeError> {
    create_items_from_solution(store, window, &agent.solution)?;
    agent_to_pane(store, window, pane, agent, CopyMode::Use)?;
    store.init_done(window)?;
    log::info!(
        "registered solver window `{window}` ({} fields, pane {pane})",
        agent.solution.len()
    );
    Ok(())
}

/// Declare every field of `solution` on `window`; solver-global data goes to pane 0.
pub fn create_items_from_solution(
    store: &dyn DataStore,
    window: &str,
    solution: &FieldRegistry,
) -> Result<(), ExchangeError> {
    solution.declare_items(store, window)
}

/// Publish an agent's mesh and pane-resident fields on `pane`.
///
/// The pane lists elements table by table, so cell fields are exported in
/// that order rather than the agent's.
pub fn agent_to_pane(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    agent: &SolverAgent,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    let mesh = &agent.mesh;
    mesh_to_pane(store, window, pane, mesh, mode, mesh.variant)?;
    let order = store_element_order(mesh, mesh.variant)?;
    agent
        .solution
        .export_ordered(store, window, pane, mode, mesh.num_nodes(), &order)
}

/// Data item names of a window (mesh items excluded).
pub fn item_names(store: &dyn DataStore, window: &str) -> Result<Vec<String>, ExchangeError> {
    store.list_items(window)
}

/// Add metadata for every field-typed item of `window` to `solution`.
pub fn populate_metadata_from_pane(
    store: &dyn DataStore,
    window: &str,
    _pane: PaneId,
    solution: &mut FieldRegistry,
) -> Result<usize, ExchangeError> {
    let names = item_names(store, window)?;
    Ok(solution.import_metadata(&names, |name| store.item_spec(window, name)))
}

/// Fill `solution`'s data from `pane`.
pub fn populate_solution_data_from_pane(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    solution: &mut FieldRegistry,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    solution.populate(store, window, pane, mode)
}

/// Import metadata, size buffers for the agent's mesh, then import data.
pub fn create_solution_from_pane(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    agent: &mut SolverAgent,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    populate_metadata_from_pane(store, window, pane, &mut agent.solution)?;
    agent
        .allocate_solution()
        .and_then(|()| {
            populate_solution_data_from_pane(store, window, pane, &mut agent.solution, mode)
        })
        .map_err(|e| e.in_phase(DATA_PHASE))
}

/// Import a pane's mesh and fields into an agent.
pub fn pane_to_agent(
    store: &dyn DataStore,
    window: &str,
    pane: PaneId,
    agent: &mut SolverAgent,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    agent.mesh = pane_to_mesh(store, window, pane)?;
    create_solution_from_pane(store, window, pane, agent, mode)
        .map_err(|e| e.in_phase(SOLUTION_PHASE))
}

/// Import a single-pane window into an agent.
pub fn populate_agent_from_window(
    store: &dyn DataStore,
    window: &str,
    agent: &mut SolverAgent,
    mode: CopyMode,
) -> Result<(), ExchangeError> {
    if !store.has_window(window) {
        return Err(ExchangeError::MissingWindow(window.to_string()));
    }
    let panes = store.panes(window)?;
    let &[pane] = panes.as_slice() else {
        return Err(ExchangeError::MultiplePanes {
            window: window.to_string(),
            count: panes.len(),
        });
    };
    pane_to_agent(store, window, pane, agent, mode).map_err(|e| e.in_phase(PANE_PHASE))
}

/// Remove a solver's window and everything registered on it.
pub fn destroy_solver(store: &dyn DataStore, window: &str) -> Result<(), ExchangeError> {
    store.delete_window(window)?;
    log::info!("destroyed solver window `{window}`");
    Ok(())
}

/// Alias of [`destroy_solver`].
pub fn unregister_solver(store: &dyn DataStore, window: &str) -> Result<(), ExchangeError> {
    destroy_solver(store, window)
}
