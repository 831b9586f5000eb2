//! Mixed-topology element connectivity.
//!
//! Elements are stored back to back in one node-index array with an offset
//! table, CSR style. Node indices are 0-based; the bridge translates to and
//! from the store's 1-based numbering.

use std::collections::BTreeMap;

use crate::exchange_error::ExchangeError;
use crate::mesh::cell_type::is_known_arity;

/// Element → node connectivity for elements of differing arity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connectivity {
    offsets: Vec<usize>,
    nodes: Vec<usize>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            nodes: Vec::new(),
        }
    }
}

impl Connectivity {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of elements, rejecting unknown arities.
    pub fn from_elements<I, E>(elements: I) -> Result<Self, ExchangeError>
    where
        I: IntoIterator<Item = E>,
        E: AsRef<[usize]>,
    {
        let mut con = Self::new();
        for element in elements {
            con.add_element(element.as_ref())?;
        }
        con.compact();
        Ok(con)
    }

    /// Append one element; its arity selects its class.
    ///
    /// Returns the new element's 0-based index. Arities outside
    /// {2,3,4,5,6,8} are rejected with [`ExchangeError::UnknownArity`].
    pub fn add_element(&mut self, nodes: &[usize]) -> Result<usize, ExchangeError> {
        if !is_known_arity(nodes.len()) {
            return Err(ExchangeError::UnknownArity { arity: nodes.len() });
        }
        self.nodes.extend_from_slice(nodes);
        self.offsets.push(self.nodes.len());
        Ok(self.offsets.len() - 2)
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// `true` when there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node indices of element `i`.
    pub fn element(&self, i: usize) -> Option<&[usize]> {
        let start = *self.offsets.get(i)?;
        let end = *self.offsets.get(i + 1)?;
        Some(&self.nodes[start..end])
    }

    /// Iterate elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.nodes[w[0]..w[1]])
    }

    /// Total number of node references across all elements.
    pub fn total_len(&self) -> usize {
        self.nodes.len()
    }

    /// Largest node index referenced, if any.
    pub fn max_node(&self) -> Option<usize> {
        self.nodes.iter().copied().max()
    }

    /// Group element indices by arity, preserving order within each group.
    pub fn bucket_by_arity(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut buckets: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, element) in self.iter().enumerate() {
            buckets.entry(element.len()).or_default().push(idx);
        }
        buckets
    }

    /// Check that every node index lies in `0..nnodes`.
    pub fn validate_nodes(&self, nnodes: usize) -> Result<(), ExchangeError> {
        match self.nodes.iter().find(|&&n| n >= nnodes) {
            Some(bad) => Err(ExchangeError::Precondition(format!(
                "node index {bad} out of range for {nnodes} nodes"
            ))),
            None => Ok(()),
        }
    }

    /// Release spare capacity left by incremental growth.
    pub fn compact(&mut self) {
        self.offsets.shrink_to_fit();
        self.nodes.shrink_to_fit();
    }

    /// Allocated capacity, in node slots.
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_arity_is_accepted() {
        let mut con = Connectivity::new();
        for arity in [2usize, 3, 4, 5, 6, 8] {
            let nodes: Vec<usize> = (0..arity).collect();
            let idx = con.add_element(&nodes).unwrap();
            assert_eq!(con.element(idx).unwrap().len(), arity);
        }
        assert_eq!(con.len(), 6);
        let buckets = con.bucket_by_arity();
        assert_eq!(buckets.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5, 6, 8]);
    }

    #[test]
    fn unknown_arity_is_rejected() {
        let mut con = Connectivity::new();
        for arity in [0usize, 1, 7, 9] {
            let nodes: Vec<usize> = (0..arity).collect();
            assert_eq!(
                con.add_element(&nodes),
                Err(ExchangeError::UnknownArity { arity })
            );
        }
        assert!(con.is_empty());
    }

    #[test]
    fn compact_trims_to_exact_size() {
        let mut con = Connectivity::new();
        for i in 0..100 {
            con.add_element(&[i, i + 1, i + 2]).unwrap();
        }
        con.compact();
        assert_eq!(con.capacity(), con.total_len());
        assert_eq!(con.max_node(), Some(101));
        assert!(con.validate_nodes(102).is_ok());
        assert!(con.validate_nodes(101).is_err());
    }
}
