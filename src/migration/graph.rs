//! Version graph for one lineage
//!
//! Versions are nodes, migration edges are directed edges weighted by their
//! position in the lineage's edge list. Search explores outgoing edges in
//! registration order, so among equally short paths the one built from the
//! earliest registered edges wins.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::MigrationEdge;

#[derive(Debug, Default)]
pub struct VersionGraph {
    graph: DiGraph<u32, usize>,
    nodes: HashMap<u32, NodeIndex>,
}

impl VersionGraph {
    pub fn from_edges(edges: &[MigrationEdge]) -> Self {
        let mut result = Self::default();
        for (position, edge) in edges.iter().enumerate() {
            let from = result.node(edge.from_version);
            let to = result.node(edge.to_version);
            result.graph.add_edge(from, to, position);
        }
        result
    }

    fn node(&mut self, version: u32) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&version) {
            return idx;
        }
        let idx = self.graph.add_node(version);
        self.nodes.insert(version, idx);
        idx
    }

    pub fn version_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Breadth-first shortest path from `from` to `to`.
    ///
    /// Returns the positions of the edges to apply, in order. `from == to`
    /// yields an empty path; an unknown version or unreachable target yields
    /// `None`. Cycles terminate through the visited set.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<usize>> {
        if from == to {
            return Some(Vec::new());
        }
        let start = *self.nodes.get(&from)?;
        let goal = *self.nodes.get(&to)?;

        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut came_from: HashMap<NodeIndex, (NodeIndex, usize)> = HashMap::new();
        let mut queue = VecDeque::new();

        visited.insert(start);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if current == goal {
                break;
            }

            let mut outgoing: Vec<(usize, NodeIndex)> = self
                .graph
                .edges_directed(current, Direction::Outgoing)
                .map(|edge| (*edge.weight(), edge.target()))
                .collect();
            outgoing.sort_by_key(|(position, _)| *position);

            for (position, next) in outgoing {
                if visited.insert(next) {
                    came_from.insert(next, (current, position));
                    queue.push_back(next);
                }
            }
        }

        if !visited.contains(&goal) {
            return None;
        }

        let mut path = Vec::new();
        let mut cursor = goal;
        while let Some(&(previous, position)) = came_from.get(&cursor) {
            path.push(position);
            cursor = previous;
        }
        path.reverse();
        Some(path)
    }

    /// Export as DOT for visualization
    pub fn to_dot(&self, name: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("digraph \"{}\" {{\n", name.replace('"', "\\\"")));
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=circle, fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        let mut versions: Vec<u32> = self.nodes.keys().copied().collect();
        versions.sort_unstable();
        for version in versions {
            output.push_str(&format!("  v{} [label=\"v{}\"];\n", version, version));
        }

        output.push('\n');
        let mut edges: Vec<(usize, u32, u32)> = self
            .graph
            .edge_references()
            .map(|edge| (*edge.weight(), self.graph[edge.source()], self.graph[edge.target()]))
            .collect();
        edges.sort_unstable();
        for (position, from, to) in edges {
            output.push_str(&format!("  v{} -> v{} [label=\"#{}\"];\n", from, to, position));
        }

        output.push_str("}\n");
        output
    }
}
