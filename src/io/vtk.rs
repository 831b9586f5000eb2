//! Legacy VTK (`.vtk`) stream export of a solver agent.
//!
//! Writes an ASCII legacy VTK `UNSTRUCTURED_GRID` with the agent's mesh,
//! then one `POINT_DATA` block holding every node field and one `CELL_DATA`
//! block holding every cell field. Only integer and double fields are
//! written; global and string fields have no VTK counterpart.

use std::io::Write;

use crate::agent::SolverAgent;
use crate::data::field_meta::{FieldLocation, FieldMeta, ScalarWidth};
use crate::exchange_error::ExchangeError;
use crate::mesh::{ElementShape, UnstructuredMesh};

fn vtk_cell_type(shape: ElementShape) -> i32 {
    match shape {
        ElementShape::Bar => 3,
        ElementShape::Triangle => 5,
        ElementShape::Quadrilateral => 9,
        ElementShape::Tetrahedron => 10,
        ElementShape::Hexahedron => 12,
        ElementShape::Prism => 13,
        ElementShape::Pyramid => 14,
    }
}

/// Write only the mesh part (header, points, cells, cell types).
pub fn write_mesh_vtk<W: Write>(
    name: &str,
    mesh: &UnstructuredMesh,
    writer: &mut W,
) -> Result<(), ExchangeError> {
    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "{name}")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;
    writeln!(writer, "POINTS {} double", mesh.num_nodes())?;
    for i in 0..mesh.num_nodes() {
        if let Some([x, y, z]) = mesh.nc.point(i) {
            writeln!(writer, "{x} {y} {z}")?;
        }
    }

    let mut types = Vec::with_capacity(mesh.num_elements());
    for i in 0..mesh.num_elements() {
        let shape = mesh.shape(i).ok_or_else(|| ExchangeError::UnknownArity {
            arity: mesh.con.element(i).map_or(0, <[usize]>::len),
        })?;
        types.push(vtk_cell_type(shape));
    }
    let total = mesh.con.total_len() + mesh.num_elements();
    writeln!(writer, "CELLS {} {total}", mesh.num_elements())?;
    for element in mesh.con.iter() {
        write!(writer, "{}", element.len())?;
        for node in element {
            write!(writer, " {node}")?;
        }
        writeln!(writer)?;
    }
    writeln!(writer, "CELL_TYPES {}", types.len())?;
    for ty in types {
        writeln!(writer, "{ty}")?;
    }
    Ok(())
}

fn write_field<W: Write>(
    agent: &SolverAgent,
    meta: &FieldMeta,
    count: usize,
    writer: &mut W,
) -> Result<(), ExchangeError> {
    let type_name = match meta.width {
        ScalarWidth::Int => "int",
        _ => "double",
    };
    if meta.ncomp == 1 {
        writeln!(writer, "SCALARS {} {type_name} 1", meta.name)?;
        writeln!(writer, "LOOKUP_TABLE default")?;
    } else {
        writeln!(writer, "VECTORS {} {type_name}", meta.name)?;
    }
    let values: Vec<String> = match meta.width {
        ScalarWidth::Int => agent.solution.i32s(&meta.name)?.iter().map(i32::to_string).collect(),
        _ => agent.solution.f64s(&meta.name)?.iter().map(f64::to_string).collect(),
    };
    let ncomp = meta.ncomp.max(1);
    if values.len() < count * ncomp {
        return Err(ExchangeError::BufferSizeMismatch {
            name: meta.name.clone(),
            expected: count * meta.value_bytes(),
            found: values.len() * meta.width.bytes(),
        });
    }
    for row in values.chunks(ncomp).take(count) {
        writeln!(writer, "{}", row.join(" "))?;
    }
    Ok(())
}

fn write_block<W: Write>(
    agent: &SolverAgent,
    location: FieldLocation,
    header: &str,
    count: usize,
    writer: &mut W,
) -> Result<(), ExchangeError> {
    let mut started = false;
    for meta in agent.solution.metas() {
        if meta.location != location || meta.width == ScalarWidth::Char {
            continue;
        }
        if !started {
            writeln!(writer, "{header} {count}")?;
            started = true;
        }
        write_field(agent, meta, count, writer)?;
    }
    Ok(())
}

/// Write an agent's mesh and node/cell fields as legacy VTK.
pub fn write_vtk_to_stream<W: Write>(
    name: &str,
    agent: &SolverAgent,
    writer: &mut W,
) -> Result<(), ExchangeError> {
    let mesh = &agent.mesh;
    write_mesh_vtk(name, mesh, writer)?;
    write_block(agent, FieldLocation::Node, "POINT_DATA", mesh.num_nodes(), writer)?;
    write_block(agent, FieldLocation::Cell, "CELL_DATA", mesh.num_elements(), writer)?;
    Ok(())
}
