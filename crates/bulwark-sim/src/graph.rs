//! Arena view of a diagram for traversal.
//!
//! Components keep their position in the diagram's node list as a dense
//! index. Edges become per-source adjacency lists in insertion order, built
//! in one pass over nodes and one over edges.

use std::collections::HashMap;

use bulwark_core::{Component, Connection, Diagram};

/// One outgoing edge in the adjacency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link<'a> {
    pub edge_id: &'a str,
    pub target_id: &'a str,
    /// Dense index of the target, `None` when it names no component.
    /// Traversing such a link is a no-op.
    pub target: Option<usize>,
}

/// Borrowed adjacency graph over a diagram's components.
#[derive(Debug)]
pub struct ComponentGraph<'a> {
    pub nodes: &'a [Component],
    /// Node id → dense index. On duplicate ids the first occurrence wins.
    pub node_index: HashMap<&'a str, usize>,
    /// `adjacency[i]` = outgoing links from node `i`, duplicates kept.
    pub adjacency: Vec<Vec<Link<'a>>>,
    edge_count: usize,
    dangling_edges: usize,
}

impl<'a> ComponentGraph<'a> {
    pub fn from_diagram(diagram: &'a Diagram) -> Self {
        Self::build(&diagram.nodes, &diagram.edges)
    }

    pub fn build(nodes: &'a [Component], edges: &'a [Connection]) -> Self {
        let mut node_index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            node_index.entry(node.id.as_str()).or_insert(i);
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        let mut dangling_edges = 0;

        for edge in edges {
            let Some(&src) = node_index.get(edge.source.as_str()) else {
                dangling_edges += 1;
                continue;
            };
            let target = node_index.get(edge.target.as_str()).copied();
            if target.is_none() {
                dangling_edges += 1;
            }
            adjacency[src].push(Link {
                edge_id: &edge.id,
                target_id: &edge.target,
                target,
            });
        }

        Self {
            nodes,
            node_index,
            adjacency,
            edge_count: edges.len(),
            dangling_edges,
        }
    }

    /// Indices of all entry points, in node order.
    pub fn entry_points(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| is_entry_point(n))
            .map(|(i, _)| i)
            .collect()
    }

    /// Outgoing links of node `index`.
    pub fn links(&self, index: usize) -> &[Link<'a>] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dense index of the component with `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges in the diagram, dangling ones included.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Edges whose source or target names no component.
    pub fn dangling_edge_count(&self) -> usize {
        self.dangling_edges
    }
}

/// Publicly exposed components and the internet itself are where an attacker starts.
pub fn is_entry_point(component: &Component) -> bool {
    component.configuration.is_public() || component.configuration.is_internet()
}
