//! Degree-of-freedom numbering.
use itertools::Itertools;
use log::debug;
use std::collections::BTreeMap;

/// Maps nodes to the global degrees of freedom of a single field.
///
/// Every node owns either exactly `dofs_per_node` global indices or none at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DofMap {
    dofs_per_node: usize,
    indices: Vec<usize>,
}

impl DofMap {
    /// Marks an entry that has not been assigned a global index.
    pub const UNASSIGNED: usize = usize::MAX;

    pub fn new(num_nodes: usize, dofs_per_node: usize) -> Self {
        Self {
            dofs_per_node,
            indices: vec![Self::UNASSIGNED; num_nodes * dofs_per_node],
        }
    }

    pub fn dofs_per_node(&self) -> usize {
        self.dofs_per_node
    }

    pub fn num_nodes(&self) -> usize {
        self.indices.len() / self.dofs_per_node.max(1)
    }

    fn node_range(&self, node: usize) -> std::ops::Range<usize> {
        self.dofs_per_node * node..self.dofs_per_node * (node + 1)
    }

    /// Returns the global indices of the given node, or `None` if the node is unassigned or out of
    /// bounds.
    pub fn node_dofs(&self, node: usize) -> Option<&[usize]> {
        let dofs = self.indices.get(self.node_range(node))?;
        (dofs.first() != Some(&Self::UNASSIGNED)).then_some(dofs)
    }

    pub fn is_assigned(&self, node: usize) -> bool {
        self.node_dofs(node).is_some()
    }

    /// Nodes with assigned degrees of freedom, in ascending order.
    pub fn assigned_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_nodes()).filter(move |&node| self.is_assigned(node))
    }

    /// All assigned global indices, ordered by node.
    pub fn assigned_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices
            .iter()
            .copied()
            .filter(|&idx| idx != Self::UNASSIGNED)
    }

    pub fn num_assigned_dofs(&self) -> usize {
        self.assigned_dofs().count()
    }

    /// Raw node-major index array, containing [`DofMap::UNASSIGNED`] for unassigned nodes.
    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }
}

/// Allocates global degrees of freedom for a set of fields.
///
/// A single running counter is shared by all fields, so the degrees of freedom of all fields
/// together form the contiguous range `0 .. num_dofs()`.
#[derive(Clone, Debug, Default)]
pub struct DofAllocator {
    counter: usize,
    maps: BTreeMap<String, DofMap>,
}

impl DofAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a field. Re-declaring an existing field leaves its map untouched.
    pub fn declare_field(&mut self, field: &str, num_nodes: usize, dofs_per_node: usize) {
        self.maps
            .entry(field.to_string())
            .or_insert_with(|| DofMap::new(num_nodes, dofs_per_node));
    }

    /// Assigns global indices to every node in `nodes` that does not have any yet.
    ///
    /// The nodes are deduplicated and visited in ascending order, so the resulting numbering does
    /// not depend on the order in which elements list their nodes. Returns the number of newly
    /// numbered nodes.
    ///
    /// # Panics
    ///
    /// Panics if the field has not been declared or a node is out of bounds.
    pub fn allocate_nodes(&mut self, field: &str, nodes: &[usize]) -> usize {
        let map = self
            .maps
            .get_mut(field)
            .unwrap_or_else(|| panic!("field '{}' must be declared before allocation", field));
        let width = map.dofs_per_node;
        let mut newly_assigned = 0;
        for node in nodes.iter().copied().sorted_unstable().dedup() {
            let range = map.node_range(node);
            assert!(range.end <= map.indices.len(), "node {} is out of bounds", node);
            if map.indices[range.start] == DofMap::UNASSIGNED {
                for (offset, idx) in map.indices[range].iter_mut().enumerate() {
                    *idx = self.counter + offset;
                }
                self.counter += width;
                newly_assigned += 1;
            }
        }
        debug!(
            "assigned degrees of freedom to {} new nodes of field '{}' ({} dofs in total)",
            newly_assigned, field, self.counter
        );
        newly_assigned
    }

    /// Total number of allocated degrees of freedom.
    pub fn num_dofs(&self) -> usize {
        self.counter
    }

    pub fn dof_map(&self, field: &str) -> Option<&DofMap> {
        self.maps.get(field)
    }

    /// Freezes the numbering.
    pub fn into_dof_maps(self) -> (BTreeMap<String, DofMap>, usize) {
        (self.maps, self.counter)
    }
}
