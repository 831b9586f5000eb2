//! Node-centered → element-centered interpolation over arbitrary element shapes.
//!
//! Every element is evaluated through a [`CenterRule`] looked up by its
//! `(edge count, node count)` key in a [`RuleTable`]. The table ships rules
//! for the usual linear and quadratic shapes; callers can register more.
//! Keys with no rule fall back to the arithmetic mean of the element's nodes.

use std::collections::HashMap;
use std::fmt;

use crate::bridge::import::read_table;
use crate::data::buffer;
use crate::exchange_error::ExchangeError;
use crate::mesh::ElementShape;
use crate::store::{table_arity, DataStore, ItemHandle, StoreLocation};

/// Rule lookup key: `(edges, nodes)`.
pub type RuleKey = (usize, usize);

/// Center value of one element from its node values.
pub trait CenterRule: Send + Sync {
    /// `values[i]` belongs to the element's `i`-th node.
    fn center(&self, values: &[f64]) -> f64;
}

/// Fixed shape-function weights evaluated at the element center.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedRule {
    weights: Vec<f64>,
}

impl WeightedRule {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    /// Equal weights over `n` nodes.
    pub fn uniform(n: usize) -> Self {
        Self::new(vec![1.0 / n as f64; n])
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl CenterRule for WeightedRule {
    fn center(&self, values: &[f64]) -> f64 {
        self.weights.iter().zip(values).map(|(w, v)| w * v).sum()
    }
}

/// Arithmetic mean of whatever nodes the element has.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanRule;

impl CenterRule for MeanRule {
    fn center(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Topology-indexed rule dispatch.
pub struct RuleTable {
    rules: HashMap<RuleKey, Box<dyn CenterRule>>,
    fallback: MeanRule,
}

impl fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.rules.keys().copied().collect();
        keys.sort_unstable();
        f.debug_struct("RuleTable").field("keys", &keys).finish()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleTable {
    /// Table with no rules; every element uses the mean.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: MeanRule,
        }
    }

    /// Rules for the shapes the exchange handles, plus quadratic surface shapes.
    ///
    /// Quadratic elements list corner nodes first, then mid-side nodes, then
    /// (for the 9-node quad) the center node.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        // linear triangle, bilinear quad
        table.register((3, 3), WeightedRule::uniform(3));
        table.register((4, 4), WeightedRule::uniform(4));
        // quadratic triangle
        let mut tri6 = vec![-1.0 / 9.0; 3];
        tri6.extend([4.0 / 9.0; 3]);
        table.register((3, 6), WeightedRule::new(tri6));
        // serendipity quad
        let mut quad8 = vec![-0.25; 4];
        quad8.extend([0.5; 4]);
        table.register((4, 8), WeightedRule::new(quad8));
        // biquadratic quad
        let mut quad9 = vec![0.0; 8];
        quad9.push(1.0);
        table.register((4, 9), WeightedRule::new(quad9));
        // tetrahedron, pyramid (apex last), prism, hexahedron
        table.register((6, 4), WeightedRule::uniform(4));
        let mut pyramid = vec![3.0 / 16.0; 4];
        pyramid.push(0.25);
        table.register((8, 5), WeightedRule::new(pyramid));
        table.register((9, 6), WeightedRule::uniform(6));
        table.register((12, 8), WeightedRule::uniform(8));
        table
    }

    /// Add or replace the rule for `key`.
    pub fn register<R: CenterRule + 'static>(&mut self, key: RuleKey, rule: R) {
        self.rules.insert(key, Box::new(rule));
    }

    /// `true` if `key` has its own rule.
    pub fn contains(&self, key: RuleKey) -> bool {
        self.rules.contains_key(&key)
    }

    /// Rule for `key`, or the mean.
    pub fn rule(&self, key: RuleKey) -> &dyn CenterRule {
        match self.rules.get(&key) {
            Some(rule) => rule.as_ref(),
            None => &self.fallback,
        }
    }
}

/// `(edges, nodes)` key of a connectivity table, from its family letter and arity.
pub fn table_key(table: &str) -> Option<RuleKey> {
    let nodes = table_arity(table)?;
    let family = table.trim_start_matches(':').chars().next()?;
    let shape = ElementShape::from_family(family, nodes)?;
    Some((shape.edges(), nodes))
}

fn read_f64(bytes: &[u8], at: usize, item: &ItemHandle) -> Result<f64, ExchangeError> {
    let width = std::mem::size_of::<f64>();
    if (at + 1) * width > bytes.len() {
        return Err(ExchangeError::BufferSizeMismatch {
            name: item.to_string(),
            expected: (at + 1) * width,
            found: bytes.len(),
        });
    }
    Ok(buffer::read_at(bytes, at))
}

/// Interpolate the node item `x` onto the element item `z`, pane by pane.
///
/// Elements are taken from `x`'s window, table by table in name order, which
/// is the order element-located arrays use; an array aliased through an
/// element permutation is written through it. Both items must be declared
/// double precision with equal component counts; strides come from the
/// store arrays.
pub fn interpolate_to_centers(
    store: &dyn DataStore,
    x: &ItemHandle,
    z: &ItemHandle,
    rules: &RuleTable,
) -> Result<(), ExchangeError> {
    let missing = |h: &ItemHandle| ExchangeError::MissingItem {
        window: h.window.clone(),
        item: h.item.clone(),
    };
    let xs = store.item_spec(&x.window, &x.item).ok_or_else(|| missing(x))?;
    let zs = store.item_spec(&z.window, &z.item).ok_or_else(|| missing(z))?;
    if xs.location != StoreLocation::Node || zs.location != StoreLocation::Element {
        return Err(ExchangeError::Precondition(format!(
            "`{x}` must be node-located and `{z}` element-located"
        )));
    }
    if !xs.data_type.is_double() || !zs.data_type.is_double() {
        return Err(ExchangeError::Precondition(format!(
            "center interpolation needs double data, found {:?} -> {:?}",
            xs.data_type, zs.data_type
        )));
    }
    if xs.ncomp != zs.ncomp {
        return Err(ExchangeError::Precondition(format!(
            "component counts differ: `{x}` has {}, `{z}` has {}",
            xs.ncomp, zs.ncomp
        )));
    }
    let ncomp = xs.ncomp;

    for pane in store.panes(&z.window)? {
        let xa = store.get_array(&x.window, &x.item, pane).ok_or_else(|| missing(x))?;
        let za = store.get_array(&z.window, &z.item, pane).ok_or_else(|| missing(z))?;
        let num_nodes = xa.items(ncomp);

        let mut elements: Vec<(RuleKey, Vec<usize>)> = Vec::new();
        for table in store.list_connectivity_tables(&x.window, pane)? {
            let key = table_key(&table)
                .ok_or_else(|| ExchangeError::UnknownTopology { table: table.clone() })?;
            let Some(array) = store.get_array(&x.window, &table, pane) else {
                continue;
            };
            let nodes = read_table(&table, &array, key.1, num_nodes)?;
            elements.extend(nodes.chunks_exact(key.1).map(|e| (key, e.to_vec())));
        }
        crate::check_precondition!(
            za.items(ncomp) >= elements.len(),
            "`{z}` holds {} elements on pane {pane}, mesh has {}",
            za.items(ncomp),
            elements.len()
        );

        let xbytes = xa.buffer.read();
        let mut values = Vec::new();
        let mut centers = Vec::with_capacity(elements.len() * ncomp);
        for comp in 0..ncomp {
            for (e, (key, nodes)) in elements.iter().enumerate() {
                values.clear();
                for &n in nodes {
                    values.push(read_f64(&xbytes, xa.index(n, comp), x)?);
                }
                centers.push((za.index(e, comp), rules.rule(*key).center(&values)));
            }
        }
        drop(xbytes);

        let mut zbytes = za.buffer.write();
        for (at, value) in centers {
            if (at + 1) * std::mem::size_of::<f64>() > zbytes.len() {
                return Err(ExchangeError::BufferSizeMismatch {
                    name: z.to_string(),
                    expected: (at + 1) * std::mem::size_of::<f64>(),
                    found: zbytes.len(),
                });
            }
            buffer::write_at(&mut zbytes, at, value);
        }
        log::debug!("interpolated `{x}` to `{z}` on pane {pane}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_rules_reproduce_constants() {
        let table = RuleTable::standard();
        for key in [(3, 3), (4, 4), (3, 6), (4, 8), (4, 9), (6, 4), (8, 5), (9, 6), (12, 8)] {
            assert!(table.contains(key));
            let ones = vec![1.0; key.1];
            assert!((table.rule(key).center(&ones) - 1.0).abs() < 1e-14, "{key:?}");
        }
    }

    #[test]
    fn unknown_keys_use_the_mean() {
        let table = RuleTable::standard();
        assert!(!table.contains((5, 5)));
        assert_eq!(table.rule((5, 5)).center(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0);
    }

    #[test]
    fn table_keys_follow_family_and_arity() {
        assert_eq!(table_key(":t3:"), Some((3, 3)));
        assert_eq!(table_key(":t6:"), Some((3, 6)));
        assert_eq!(table_key(":q9:"), Some((4, 9)));
        assert_eq!(table_key(":P5:"), Some((8, 5)));
        assert_eq!(table_key(":B8:"), Some((12, 8)));
        assert_eq!(table_key(":x7:"), None);
    }

    #[test]
    fn linear_field_on_triangle_hits_centroid() {
        let rule = RuleTable::standard();
        // f(x, y) = x + 2y at (0,0), (3,0), (0,3): centroid (1,1) -> 3.
        assert!((rule.rule((3, 3)).center(&[0.0, 3.0, 6.0]) - 3.0).abs() < 1e-12);
    }
}
