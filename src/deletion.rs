//! Node removal, with and without the descendants reached through "child" edges.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::graph::Graph;

impl Graph {
    /// Removes a node and every edge touching it. Returns the removed edge ids.
    pub fn delete_node(&mut self, id: &str) -> Result<Vec<String>> {
        let incident: Vec<String> = self
            .require_node(id)?
            .incident_edges()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut removed = Vec::with_capacity(incident.len());
        for edge_id in incident {
            if self.contains_edge(&edge_id) {
                self.remove_edge(&edge_id)?;
                removed.push(edge_id);
            }
        }

        self.nodes.remove(id);
        debug!(node = %id, edges = removed.len(), "node deleted");
        Ok(removed)
    }

    /// Removes `id` and everything below it along "child" edges, deepest first.
    ///
    /// Returns the removed node ids in deletion order. Each node is visited once per
    /// call, so cycles and shared descendants terminate.
    pub fn delete_subtree(&mut self, id: &str) -> Result<Vec<String>> {
        self.require_node(id)?;
        let mut visited = HashSet::new();
        let mut removed = Vec::new();
        self.delete_subtree_from(id, &mut visited, &mut removed)?;
        debug!(root = %id, nodes = removed.len(), "subtree deleted");
        Ok(removed)
    }

    /// Removes every descendant of `id` but keeps `id` itself.
    pub fn delete_descendants(&mut self, id: &str) -> Result<Vec<String>> {
        self.require_node(id)?;
        let mut visited = HashSet::from([id.to_string()]);
        let mut removed = Vec::new();
        for child in self.child_targets(id) {
            self.delete_subtree_from(&child, &mut visited, &mut removed)?;
        }
        debug!(root = %id, nodes = removed.len(), "descendants deleted");
        Ok(removed)
    }

    /// Node ids reachable from `id` through one or more "child" edges, in
    /// depth-first pre-order.
    pub fn descendants(&self, id: &str) -> Result<Vec<String>> {
        self.require_node(id)?;
        let mut visited = HashSet::from([id.to_string()]);
        let mut order = Vec::new();
        let mut stack: Vec<String> = self.child_targets(id).into_iter().rev().collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for next in self.child_targets(&current).into_iter().rev() {
                if !visited.contains(&next) {
                    stack.push(next);
                }
            }
            order.push(current);
        }

        Ok(order)
    }

    fn delete_subtree_from(
        &mut self,
        id: &str,
        visited: &mut HashSet<String>,
        removed: &mut Vec<String>,
    ) -> Result<()> {
        if !visited.insert(id.to_string()) || !self.contains_node(id) {
            return Ok(());
        }

        for child in self.child_targets(id) {
            self.delete_subtree_from(&child, visited, removed)?;
        }

        self.delete_node(id)?;
        removed.push(id.to_string());
        Ok(())
    }

    /// Targets of the node's outgoing "child" edges, in edge id order.
    fn child_targets(&self, id: &str) -> Vec<String> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };

        node.children()
            .iter()
            .filter_map(|edge_id| self.edge(edge_id))
            .map(|edge| edge.target().to_string())
            .collect()
    }
}
