//! Element topology metadata.
//!
//! Elements are stored by arity only; the shape is resolved against a
//! [`MeshVariant`] (surface or volume) because arity 4 is a quadrilateral on
//! a surface and a tetrahedron in a volume.

/// Arities the connectivity table accepts.
pub const KNOWN_ARITIES: [usize; 6] = [2, 3, 4, 5, 6, 8];

/// Returns `true` if `arity` belongs to one of the recognized element classes.
#[inline]
pub fn is_known_arity(arity: usize) -> bool {
    KNOWN_ARITIES.contains(&arity)
}

/// Element shapes exchanged with the store.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum ElementShape {
    /// 2-node line segment.
    Bar,
    /// 3-node triangle.
    Triangle,
    /// 4-node quadrilateral.
    Quadrilateral,
    /// 4-node tetrahedron.
    Tetrahedron,
    /// 5-node pyramid.
    Pyramid,
    /// 6-node prism (wedge).
    Prism,
    /// 8-node hexahedron.
    Hexahedron,
}

/// Which family of shapes a pane holds.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum MeshVariant {
    /// Triangles and quadrilaterals.
    #[default]
    Surface,
    /// Tetrahedra, pyramids, prisms and hexahedra.
    Volume,
}

impl MeshVariant {
    /// Shapes a pane of this variant may hold, in export order.
    pub fn accepted(self) -> &'static [ElementShape] {
        match self {
            MeshVariant::Surface => &[ElementShape::Triangle, ElementShape::Quadrilateral],
            MeshVariant::Volume => &[
                ElementShape::Tetrahedron,
                ElementShape::Pyramid,
                ElementShape::Prism,
                ElementShape::Hexahedron,
            ],
        }
    }
}

/// Suffix vocabulary used to recognize connectivity tables, in match order.
///
/// `:B8` is the legacy spelling some producers use for hexahedra.
const TABLE_SUFFIXES: [(&str, ElementShape); 8] = [
    (":b2", ElementShape::Bar),
    (":t3", ElementShape::Triangle),
    (":q4", ElementShape::Quadrilateral),
    (":T4", ElementShape::Tetrahedron),
    (":H8", ElementShape::Hexahedron),
    (":B8", ElementShape::Hexahedron),
    (":P5", ElementShape::Pyramid),
    (":P6", ElementShape::Prism),
];

impl ElementShape {
    /// All shapes, lowest dimension first.
    pub const ALL: [ElementShape; 7] = [
        ElementShape::Bar,
        ElementShape::Triangle,
        ElementShape::Quadrilateral,
        ElementShape::Tetrahedron,
        ElementShape::Pyramid,
        ElementShape::Prism,
        ElementShape::Hexahedron,
    ];

    /// Number of nodes per element.
    pub fn arity(self) -> usize {
        match self {
            ElementShape::Bar => 2,
            ElementShape::Triangle => 3,
            ElementShape::Quadrilateral | ElementShape::Tetrahedron => 4,
            ElementShape::Pyramid => 5,
            ElementShape::Prism => 6,
            ElementShape::Hexahedron => 8,
        }
    }

    /// Number of edges per element.
    pub fn edges(self) -> usize {
        match self {
            ElementShape::Bar => 1,
            ElementShape::Triangle => 3,
            ElementShape::Quadrilateral => 4,
            ElementShape::Tetrahedron => 6,
            ElementShape::Pyramid => 8,
            ElementShape::Prism => 9,
            ElementShape::Hexahedron => 12,
        }
    }

    /// Topological dimension.
    pub fn dimension(self) -> u8 {
        match self {
            ElementShape::Bar => 1,
            ElementShape::Triangle | ElementShape::Quadrilateral => 2,
            _ => 3,
        }
    }

    /// Store-side connectivity table name written on export.
    pub fn table_name(self) -> &'static str {
        match self {
            ElementShape::Bar => ":b2:",
            ElementShape::Triangle => ":t3:",
            ElementShape::Quadrilateral => ":q4:",
            ElementShape::Tetrahedron => ":T4:",
            ElementShape::Pyramid => ":P5:",
            ElementShape::Prism => ":P6:",
            ElementShape::Hexahedron => ":H8:",
        }
    }

    /// Recognize a connectivity table by its suffix.
    pub fn from_table_name(name: &str) -> Option<Self> {
        TABLE_SUFFIXES
            .iter()
            .find(|(suffix, _)| name.contains(suffix))
            .map(|(_, shape)| *shape)
    }

    /// Shape of a table family letter (`t`, `q`, `T`, ...) with `nodes` nodes.
    ///
    /// Higher-order tables such as `:t6:` share the family of their linear shape;
    /// `P` is a pyramid with 5 nodes and a prism with 6.
    pub fn from_family(family: char, nodes: usize) -> Option<Self> {
        match (family, nodes) {
            ('b', _) => Some(ElementShape::Bar),
            ('t', _) => Some(ElementShape::Triangle),
            ('q', _) => Some(ElementShape::Quadrilateral),
            ('T', _) => Some(ElementShape::Tetrahedron),
            ('P', 5) => Some(ElementShape::Pyramid),
            ('P', 6) => Some(ElementShape::Prism),
            ('H' | 'B', _) => Some(ElementShape::Hexahedron),
            _ => None,
        }
    }

    /// Resolve an arity inside a variant; `None` if the variant rejects it.
    pub fn classify(arity: usize, variant: MeshVariant) -> Option<Self> {
        variant
            .accepted()
            .iter()
            .copied()
            .find(|shape| shape.arity() == arity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_table_recognizes_every_shape() {
        for shape in ElementShape::ALL {
            assert_eq!(ElementShape::from_table_name(shape.table_name()), Some(shape));
        }
        assert_eq!(ElementShape::from_table_name(":B8:"), Some(ElementShape::Hexahedron));
        assert_eq!(ElementShape::from_table_name(":x7:"), None);
    }

    #[test]
    fn families_cover_higher_order_tables() {
        assert_eq!(ElementShape::from_family('t', 6), Some(ElementShape::Triangle));
        assert_eq!(ElementShape::from_family('P', 5), Some(ElementShape::Pyramid));
        assert_eq!(ElementShape::from_family('P', 6), Some(ElementShape::Prism));
        assert_eq!(ElementShape::from_family('P', 7), None);
        for shape in ElementShape::ALL {
            let family = shape.table_name().chars().nth(1).unwrap();
            assert_eq!(ElementShape::from_family(family, shape.arity()), Some(shape));
        }
    }

    #[test]
    fn arity_four_depends_on_variant() {
        assert_eq!(
            ElementShape::classify(4, MeshVariant::Surface),
            Some(ElementShape::Quadrilateral)
        );
        assert_eq!(
            ElementShape::classify(4, MeshVariant::Volume),
            Some(ElementShape::Tetrahedron)
        );
        assert_eq!(ElementShape::classify(3, MeshVariant::Volume), None);
        assert_eq!(ElementShape::classify(8, MeshVariant::Surface), None);
    }
}
