//! Field metadata: name, location, scalar width, components and unit.
//!
//! The conversions between solver-side tags and store-side codes live here
//! as explicit tables so an unknown code is rejected in exactly one place.

use serde::{Deserialize, Serialize};

use crate::exchange_error::ExchangeError;
use crate::store::{StoreLocation, StoreType};

/// Where a field lives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum FieldLocation {
    /// One value set for the whole solver (`'s'`).
    SolverGlobal,
    /// One value set per mesh/pane (`'m'`).
    MeshGlobal,
    /// One value set per element (`'c'`).
    Cell,
    /// One value set per node (`'n'`).
    Node,
}

impl FieldLocation {
    /// Parse a solver-side location tag.
    pub fn from_tag(tag: char) -> Result<Self, ExchangeError> {
        match tag {
            's' => Ok(FieldLocation::SolverGlobal),
            'm' => Ok(FieldLocation::MeshGlobal),
            'c' => Ok(FieldLocation::Cell),
            'n' => Ok(FieldLocation::Node),
            other => Err(ExchangeError::UnknownLocation(other)),
        }
    }

    /// Solver-side location tag.
    pub fn tag(self) -> char {
        match self {
            FieldLocation::SolverGlobal => 's',
            FieldLocation::MeshGlobal => 'm',
            FieldLocation::Cell => 'c',
            FieldLocation::Node => 'n',
        }
    }

    /// Store-side location for this field.
    pub fn to_store(self) -> StoreLocation {
        match self {
            FieldLocation::SolverGlobal => StoreLocation::Window,
            FieldLocation::MeshGlobal => StoreLocation::Pane,
            FieldLocation::Cell => StoreLocation::Element,
            FieldLocation::Node => StoreLocation::Node,
        }
    }

    /// Solver-side location of a store item.
    pub fn from_store(loc: StoreLocation) -> Self {
        match loc {
            StoreLocation::Window => FieldLocation::SolverGlobal,
            StoreLocation::Pane => FieldLocation::MeshGlobal,
            StoreLocation::Element => FieldLocation::Cell,
            StoreLocation::Node => FieldLocation::Node,
        }
    }

    /// `true` for solver- and mesh-global fields.
    pub fn is_global(self) -> bool {
        matches!(self, FieldLocation::SolverGlobal | FieldLocation::MeshGlobal)
    }
}

/// Element byte width, doubling as a coarse scalar type tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ScalarWidth {
    /// 1 byte: character/string data.
    Char,
    /// 4 bytes: integer data.
    Int,
    /// 8 bytes: double precision data.
    Double,
}

impl ScalarWidth {
    /// Parse a byte width.
    pub fn from_bytes(width: usize) -> Result<Self, ExchangeError> {
        match width {
            1 => Ok(ScalarWidth::Char),
            4 => Ok(ScalarWidth::Int),
            8 => Ok(ScalarWidth::Double),
            other => Err(ExchangeError::UnknownByteWidth(other)),
        }
    }

    /// Size of one scalar in bytes.
    pub fn bytes(self) -> usize {
        match self {
            ScalarWidth::Char => 1,
            ScalarWidth::Int => 4,
            ScalarWidth::Double => 8,
        }
    }

    /// Store type written for fields of this width.
    pub fn to_store(self) -> StoreType {
        match self {
            ScalarWidth::Char => StoreType::Char,
            ScalarWidth::Int => StoreType::Int,
            ScalarWidth::Double => StoreType::Double,
        }
    }

    /// Width of a store type; `None` for types that are not simulation data.
    pub fn from_store(ty: StoreType) -> Option<Self> {
        match ty {
            StoreType::Char | StoreType::Character => Some(ScalarWidth::Char),
            StoreType::Int | StoreType::Integer => Some(ScalarWidth::Int),
            StoreType::Double | StoreType::Real | StoreType::DoublePrecision => {
                Some(ScalarWidth::Double)
            }
            StoreType::Float | StoreType::RawData => None,
        }
    }
}

/// Metadata for one solution field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Field name, unique within a registry.
    pub name: String,
    /// Where the field lives.
    pub location: FieldLocation,
    /// Scalar width.
    pub width: ScalarWidth,
    /// Components per value set.
    pub ncomp: usize,
    /// Unit string.
    pub unit: String,
}

impl FieldMeta {
    /// New metadata record.
    pub fn new(
        name: impl Into<String>,
        location: FieldLocation,
        width: ScalarWidth,
        ncomp: usize,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            width,
            ncomp,
            unit: unit.into(),
        }
    }

    /// Bytes per value set (`width * ncomp`).
    pub fn value_bytes(&self) -> usize {
        self.width.bytes() * self.ncomp
    }

    /// Number of value sets the field needs for a mesh of the given size.
    pub fn extent(&self, num_nodes: usize, num_elements: usize) -> usize {
        match self.location {
            FieldLocation::SolverGlobal | FieldLocation::MeshGlobal => 1,
            FieldLocation::Cell => num_elements,
            FieldLocation::Node => num_nodes,
        }
    }

    /// Expected buffer size in bytes; `None` for string fields, which size themselves.
    pub fn expected_bytes(&self, num_nodes: usize, num_elements: usize) -> Option<usize> {
        match self.width {
            ScalarWidth::Char => None,
            _ => Some(self.value_bytes() * self.extent(num_nodes, num_elements)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_tags_round_trip_through_store_codes() {
        for tag in ['s', 'm', 'c', 'n'] {
            let loc = FieldLocation::from_tag(tag).unwrap();
            assert_eq!(loc.tag(), tag);
            assert_eq!(FieldLocation::from_store(loc.to_store()), loc);
        }
        assert_eq!(
            FieldLocation::from_tag('x'),
            Err(ExchangeError::UnknownLocation('x'))
        );
    }

    #[test]
    fn widths_map_fortran_types() {
        assert_eq!(ScalarWidth::from_store(StoreType::DoublePrecision), Some(ScalarWidth::Double));
        assert_eq!(ScalarWidth::from_store(StoreType::Integer), Some(ScalarWidth::Int));
        assert_eq!(ScalarWidth::from_store(StoreType::RawData), None);
        assert!(ScalarWidth::from_bytes(2).is_err());
    }

    #[test]
    fn expected_sizes_follow_location() {
        let disp = FieldMeta::new("disp", FieldLocation::Node, ScalarWidth::Double, 3, "m");
        assert_eq!(disp.expected_bytes(10, 4), Some(240));
        let id = FieldMeta::new("id", FieldLocation::MeshGlobal, ScalarWidth::Int, 1, "");
        assert_eq!(id.expected_bytes(10, 4), Some(4));
        let name = FieldMeta::new("name", FieldLocation::SolverGlobal, ScalarWidth::Char, 1, "");
        assert_eq!(name.expected_bytes(10, 4), None);
    }
}
