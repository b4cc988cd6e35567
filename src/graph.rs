use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::{GraphError, Result};
use crate::geometry::{BoundingBox, Line, Size, Vec2, is_valid_length, non_negative};
use crate::relationship::Relationship;
use crate::style::{EdgeStyle, NodeStyle, StylePolicy};

pub const DEFAULT_INNER_WIDTH: f64 = 50.0;
pub const DEFAULT_INNER_HEIGHT: f64 = 50.0;
pub const DEFAULT_PADDING: f64 = 10.0;

/// A person on the canvas.
///
/// The three adjacency sets hold edge ids only; the edges themselves live in the
/// owning [`Graph`].
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: String,
    pub(crate) position: Vec2,
    pub(crate) inner_size: Size,
    pub(crate) content_size: Size,
    pub(crate) padding: f64,
    pub(crate) style: NodeStyle,
    pub(crate) children: BTreeSet<String>,
    pub(crate) parents: BTreeSet<String>,
    pub(crate) undirected: BTreeSet<String>,
}

impl Node {
    pub(crate) fn new(id: String, inner_size: Size, padding: f64, style: NodeStyle) -> Self {
        Self {
            id,
            position: Vec2::ZERO,
            inner_size,
            content_size: Size::ZERO,
            padding: non_negative(padding),
            style,
            children: BTreeSet::new(),
            parents: BTreeSet::new(),
            undirected: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Top-left corner.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn inner_size(&self) -> Size {
        self.inner_size
    }

    pub fn content_size(&self) -> Size {
        self.content_size
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    pub fn style(&self) -> &NodeStyle {
        &self.style
    }

    /// Space given to the inner content: the requested size, grown to fit the content.
    pub fn effective_inner_size(&self) -> Size {
        self.inner_size.max(self.content_size)
    }

    /// Outer size including padding on every side.
    pub fn size(&self) -> Size {
        self.effective_inner_size().pad(self.padding)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.position, self.size())
    }

    pub fn center(&self) -> Vec2 {
        self.bounding_box().center()
    }

    /// Outgoing "child" edges.
    pub fn children(&self) -> &BTreeSet<String> {
        &self.children
    }

    /// Incoming "child" edges.
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    pub fn undirected(&self) -> &BTreeSet<String> {
        &self.undirected
    }

    /// Every incident edge id, each listed once.
    pub fn incident_edges(&self) -> BTreeSet<&str> {
        self.children
            .iter()
            .chain(&self.parents)
            .chain(&self.undirected)
            .map(String::as_str)
            .collect()
    }

    fn forget_edge(&mut self, edge_id: &str) {
        self.children.remove(edge_id);
        self.parents.remove(edge_id);
        self.undirected.remove(edge_id);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub(crate) id: String,
    pub(crate) origin: String,
    pub(crate) target: String,
    pub(crate) relationship: Relationship,
    pub(crate) directed: bool,
    pub(crate) style: EdgeStyle,
}

impl Edge {
    pub(crate) fn new(
        id: String,
        relationship: Relationship,
        origin: String,
        target: String,
        style: EdgeStyle,
    ) -> Self {
        Self {
            directed: relationship.is_directed(),
            id,
            origin,
            target,
            relationship,
            style,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn relationship(&self) -> &Relationship {
        &self.relationship
    }

    pub fn directed(&self) -> bool {
        self.directed
    }

    pub fn style(&self) -> &EdgeStyle {
        &self.style
    }

    /// The endpoint opposite `node_id`, if `node_id` is one of the endpoints.
    pub fn other_end(&self, node_id: &str) -> Option<&str> {
        if self.origin == node_id {
            Some(&self.target)
        } else if self.target == node_id {
            Some(&self.origin)
        } else {
            None
        }
    }
}

/// Owns every node and edge. Entities refer to each other by id only.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub(crate) nodes: HashMap<String, Node>,
    pub(crate) edges: HashMap<String, Edge>,
    policy: StylePolicy,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: StylePolicy) -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &StylePolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: StylePolicy) {
        self.policy = policy;
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub(crate) fn require_node(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    fn require_node_mut(&mut self, id: &str) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))
    }

    pub(crate) fn require_edge(&self, id: &str) -> Result<&Edge> {
        self.edges
            .get(id)
            .ok_or_else(|| GraphError::UnknownEdge(id.to_string()))
    }

    /// Adds a node with the default inner size, padding and theme-derived style.
    pub fn add_node(&mut self, id: impl Into<String>) -> Result<&Node> {
        let style = self.policy.node_style();
        self.create_node(
            id,
            Size::new(DEFAULT_INNER_WIDTH, DEFAULT_INNER_HEIGHT),
            DEFAULT_PADDING,
            style,
        )
    }

    pub fn create_node(
        &mut self,
        id: impl Into<String>,
        inner_size: Size,
        padding: f64,
        style: NodeStyle,
    ) -> Result<&Node> {
        let id = id.into();
        self.insert_node(Node::new(id, inner_size, padding, style))
    }

    pub(crate) fn insert_node(&mut self, node: Node) -> Result<&Node> {
        if self.nodes.contains_key(&node.id) {
            warn!(node = %node.id, "rejected duplicate node id");
            return Err(GraphError::duplicate_node(&node.id));
        }
        check_position(&node.id, node.position)?;
        check_size(&node.id, "inner size", node.inner_size)?;
        check_size(&node.id, "content size", node.content_size)?;
        check_node_style(&node.id, &node.style)?;

        debug!(node = %node.id, "node created");
        let id = node.id.clone();
        Ok(&*self.nodes.entry(id).or_insert(node))
    }

    /// Connects two existing nodes. `child` edges run from parent (origin) to child
    /// (target); every other relationship is recorded as undirected on both ends.
    pub fn create_edge(
        &mut self,
        id: impl Into<String>,
        relationship: impl Into<Relationship>,
        origin: &str,
        target: &str,
    ) -> Result<&Edge> {
        let relationship = relationship.into();
        let style = self.policy.edge_style(&relationship);
        let edge = Edge::new(
            id.into(),
            relationship,
            origin.to_string(),
            target.to_string(),
            style,
        );
        self.insert_edge(edge)
    }

    pub(crate) fn insert_edge(&mut self, edge: Edge) -> Result<&Edge> {
        for endpoint in [&edge.origin, &edge.target] {
            if !self.nodes.contains_key(endpoint) {
                warn!(edge = %edge.id, node = %endpoint, "edge references unknown node");
                return Err(GraphError::UnknownNode(endpoint.clone()));
            }
        }
        if self.edges.contains_key(&edge.id) {
            warn!(edge = %edge.id, "rejected duplicate edge id");
            return Err(GraphError::duplicate_edge(&edge.id));
        }
        if !is_valid_length(edge.style.width) {
            return Err(GraphError::invalid_geometry(
                &edge.id,
                format!("edge width {} is not a finite, non-negative length", edge.style.width),
            ));
        }

        let id = edge.id.clone();
        if edge.directed {
            if let Some(origin) = self.nodes.get_mut(&edge.origin) {
                origin.children.insert(id.clone());
            }
            if let Some(target) = self.nodes.get_mut(&edge.target) {
                target.parents.insert(id.clone());
            }
        } else {
            if let Some(origin) = self.nodes.get_mut(&edge.origin) {
                origin.undirected.insert(id.clone());
            }
            if let Some(target) = self.nodes.get_mut(&edge.target) {
                target.undirected.insert(id.clone());
            }
        }

        debug!(
            edge = %id,
            relationship = %edge.relationship,
            origin = %edge.origin,
            target_node = %edge.target,
            "edge created"
        );
        Ok(&*self.edges.entry(id).or_insert(edge))
    }

    /// Removes a single edge and its ids from both endpoints.
    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        let edge = self
            .edges
            .remove(id)
            .ok_or_else(|| GraphError::UnknownEdge(id.to_string()))?;

        for endpoint in [&edge.origin, &edge.target] {
            if let Some(node) = self.nodes.get_mut(endpoint) {
                node.forget_edge(id);
            }
        }

        debug!(edge = %id, "edge removed");
        Ok(edge)
    }

    /// Every edge touching `node_id`, resolved through the node's adjacency sets.
    pub fn edges_of(&self, node_id: &str) -> Result<Vec<&Edge>> {
        let node = self.require_node(node_id)?;
        Ok(node
            .incident_edges()
            .into_iter()
            .filter_map(|id| self.edges.get(id))
            .collect())
    }

    /// Moves a node's top-left corner. Edge geometry is derived on read.
    ///
    /// Non-finite coordinates are rejected and leave the node where it was.
    pub fn move_node(&mut self, id: &str, position: Vec2) -> Result<()> {
        let node = self.require_node_mut(id)?;
        check_position(id, position)?;
        node.position = position;
        Ok(())
    }

    pub fn displace_node(&mut self, id: &str, delta: Vec2) -> Result<()> {
        let node = self.require_node_mut(id)?;
        let position = node.position + delta;
        check_position(id, position)?;
        node.position = position;
        Ok(())
    }

    /// Shifts every node by `delta`, which is how a canvas drag pans the view.
    ///
    /// Either every node moves or none does.
    pub fn pan(&mut self, delta: Vec2) -> Result<()> {
        for node in self.nodes.values() {
            check_position(&node.id, node.position + delta)?;
        }
        for node in self.nodes.values_mut() {
            node.position += delta;
        }
        Ok(())
    }

    /// Records the minimum size the UI needs for a node's inner content.
    pub fn set_content_size(&mut self, id: &str, size: Size) -> Result<()> {
        let node = self.require_node_mut(id)?;
        check_size(id, "content size", size)?;
        node.content_size = size;
        Ok(())
    }

    pub fn set_node_style(&mut self, id: &str, style: NodeStyle) -> Result<()> {
        let node = self.require_node_mut(id)?;
        check_node_style(id, &style)?;
        node.style = style;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    pub fn node_style(&self, id: &str) -> Result<&NodeStyle> {
        Ok(&self.require_node(id)?.style)
    }

    pub fn edge_style(&self, id: &str) -> Result<&EdgeStyle> {
        Ok(&self.require_edge(id)?.style)
    }

    pub fn bounding_box_of(&self, id: &str) -> Result<BoundingBox> {
        Ok(self.require_node(id)?.bounding_box())
    }

    /// Center to center line of an edge.
    pub fn center_line(&self, edge_id: &str) -> Result<Line> {
        let edge = self.require_edge(edge_id)?;
        let origin = self.require_node(&edge.origin)?;
        let target = self.require_node(&edge.target)?;
        Ok(Line::from_endpoints(origin.center(), target.center()))
    }

    /// Where the edge's line should meet the origin and target borders.
    ///
    /// Overlapping boxes degrade to the box centers.
    pub fn anchor_points(&self, edge_id: &str) -> Result<(Vec2, Vec2)> {
        let edge = self.require_edge(edge_id)?;
        let line = self.center_line(edge_id)?;
        let (start, _) = self.require_node(&edge.origin)?.bounding_box().intersect(&line);
        let (end, _) = self.require_node(&edge.target)?.bounding_box().intersect(&line);
        Ok((start, end))
    }

    /// Checks the adjacency invariants, reporting the first violation found.
    pub fn validate(&self) -> Result<()> {
        for (key, node) in &self.nodes {
            if key != &node.id {
                return Err(inconsistent(format!(
                    "node stored under '{key}' carries id '{}'",
                    node.id
                )));
            }
            for edge_id in node.incident_edges() {
                if !self.edges.contains_key(edge_id) {
                    return Err(inconsistent(format!(
                        "node '{key}' lists missing edge '{edge_id}'"
                    )));
                }
            }
        }

        for (key, edge) in &self.edges {
            if key != &edge.id {
                return Err(inconsistent(format!(
                    "edge stored under '{key}' carries id '{}'",
                    edge.id
                )));
            }
            if edge.directed != edge.relationship.is_directed() {
                return Err(inconsistent(format!(
                    "edge '{key}' directedness disagrees with '{}'",
                    edge.relationship
                )));
            }
            let origin = self.nodes.get(&edge.origin).ok_or_else(|| {
                inconsistent(format!("edge '{key}' has missing origin '{}'", edge.origin))
            })?;
            let target = self.nodes.get(&edge.target).ok_or_else(|| {
                inconsistent(format!("edge '{key}' has missing target '{}'", edge.target))
            })?;

            let expected = |node: &Node| -> (bool, bool, bool) {
                let is_origin = node.id == edge.origin;
                let is_target = node.id == edge.target;
                if edge.directed {
                    (is_origin, is_target, false)
                } else {
                    (false, false, true)
                }
            };

            for node in [origin, target] {
                let actual = (
                    node.children.contains(key),
                    node.parents.contains(key),
                    node.undirected.contains(key),
                );
                if actual != expected(node) {
                    return Err(inconsistent(format!(
                        "edge '{key}' is filed incorrectly on node '{}'",
                        node.id
                    )));
                }
            }
        }

        for node in self.nodes.values() {
            for edge_id in node.incident_edges() {
                if let Some(edge) = self.edges.get(edge_id) {
                    if edge.origin != node.id && edge.target != node.id {
                        return Err(inconsistent(format!(
                            "node '{}' lists unrelated edge '{edge_id}'",
                            node.id
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn check_position(id: &str, position: Vec2) -> Result<()> {
    if position.is_finite() {
        Ok(())
    } else {
        warn!(node = %id, x = position.x, y = position.y, "rejected non-finite position");
        Err(GraphError::invalid_geometry(
            id,
            format!("position ({}, {}) is not finite", position.x, position.y),
        ))
    }
}

fn check_size(id: &str, what: &str, size: Size) -> Result<()> {
    if size.is_valid() {
        Ok(())
    } else {
        Err(GraphError::invalid_geometry(
            id,
            format!("{what} {}x{} must be finite and non-negative", size.width, size.height),
        ))
    }
}

fn check_node_style(id: &str, style: &NodeStyle) -> Result<()> {
    if is_valid_length(style.stroke_width) && is_valid_length(style.handle_stroke_width) {
        Ok(())
    } else {
        Err(GraphError::invalid_geometry(
            id,
            "stroke widths must be finite and non-negative",
        ))
    }
}

fn inconsistent(detail: String) -> GraphError {
    GraphError::Inconsistent(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntityKind;

    fn two_people() -> Graph {
        let mut graph = Graph::new();
        graph.add_node("A").unwrap();
        graph.add_node("B").unwrap();
        graph.move_node("B", Vec2::new(200.0, 0.0)).unwrap();
        graph
    }

    #[test]
    fn child_edges_are_directed() {
        let mut graph = two_people();
        let edge = graph.create_edge("A->B", "child", "A", "B").unwrap();
        assert!(edge.directed());

        let a = graph.node("A").unwrap();
        let b = graph.node("B").unwrap();
        assert!(a.children().contains("A->B"));
        assert!(!a.children().contains("B"));
        assert!(b.parents().contains("A->B"));
        assert!(a.undirected().is_empty());
        graph.validate().unwrap();
    }

    #[test]
    fn other_relationships_are_undirected_on_both_ends() {
        let mut graph = two_people();
        let edge = graph.create_edge("x", "married", "A", "B").unwrap();
        assert!(!edge.directed());
        assert!(graph.node("A").unwrap().undirected().contains("x"));
        assert!(graph.node("B").unwrap().undirected().contains("x"));
        assert!(graph.node("B").unwrap().parents().is_empty());
        graph.validate().unwrap();
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut graph = two_people();
        let err = graph.add_node("A").unwrap_err();
        assert!(matches!(
            err,
            GraphError::DuplicateId {
                kind: EntityKind::Node,
                ..
            }
        ));

        graph.create_edge("x", "friend", "A", "B").unwrap();
        let err = graph.create_edge("x", "hostile", "B", "A").unwrap_err();
        assert!(matches!(
            err,
            GraphError::DuplicateId {
                kind: EntityKind::Edge,
                ..
            }
        ));
        assert_eq!(graph.edge("x").unwrap().relationship(), &Relationship::Friend);
    }

    #[test]
    fn unknown_endpoints_leave_graph_untouched() {
        let mut graph = two_people();
        let err = graph.create_edge("x", "friend", "A", "Z").unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(ref id) if id == "Z"));
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node("A").unwrap().undirected().is_empty());
    }

    #[test]
    fn unrecognized_relationships_get_fallback_color() {
        let mut graph = two_people();
        let edge = graph.create_edge("x", "godparent", "A", "B").unwrap();
        let (directed, color) = (edge.directed(), edge.style().color);
        assert!(!directed);
        assert_eq!(color, graph.policy().fallback_color());
    }

    #[test]
    fn edges_of_covers_all_categories() {
        let mut graph = two_people();
        graph.add_node("C").unwrap();
        graph.create_edge("A->B", "child", "A", "B").unwrap();
        graph.create_edge("C->A", "child", "C", "A").unwrap();
        graph.create_edge("m", "married", "A", "C").unwrap();

        let mut ids: Vec<&str> = graph
            .edges_of("A")
            .unwrap()
            .into_iter()
            .map(Edge::id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["A->B", "C->A", "m"]);
        assert_eq!(graph.edges_of("B").unwrap().len(), 1);
    }

    #[test]
    fn self_loops_are_listed_once() {
        let mut graph = two_people();
        graph.create_edge("loop", "child", "A", "A").unwrap();
        assert_eq!(graph.edges_of("A").unwrap().len(), 1);
        graph.validate().unwrap();
    }

    #[test]
    fn move_keeps_adjacency() {
        let mut graph = two_people();
        graph.create_edge("x", "friend", "A", "B").unwrap();
        graph.move_node("A", Vec2::new(5.0, 6.0)).unwrap();
        assert_eq!(graph.node("A").unwrap().position(), Vec2::new(5.0, 6.0));
        assert!(graph.node("A").unwrap().undirected().contains("x"));
        assert!(matches!(
            graph.move_node("nobody", Vec2::ZERO),
            Err(GraphError::UnknownNode(_))
        ));
    }

    #[test]
    fn size_grows_with_content() {
        let mut graph = two_people();
        assert_eq!(graph.node("A").unwrap().size(), Size::new(70.0, 70.0));
        graph.set_content_size("A", Size::new(120.0, 20.0)).unwrap();
        assert_eq!(graph.node("A").unwrap().size(), Size::new(140.0, 70.0));
    }

    #[test]
    fn anchors_sit_on_facing_borders() {
        let mut graph = two_people();
        graph.create_edge("A->B", "child", "A", "B").unwrap();
        let (start, end) = graph.anchor_points("A->B").unwrap();
        assert_eq!(start, Vec2::new(70.0, 35.0));
        assert_eq!(end, Vec2::new(200.0, 35.0));
    }

    #[test]
    fn remove_edge_clears_both_ends() {
        let mut graph = two_people();
        graph.create_edge("A->B", "child", "A", "B").unwrap();
        graph.remove_edge("A->B").unwrap();
        assert!(graph.node("A").unwrap().children().is_empty());
        assert!(graph.node("B").unwrap().parents().is_empty());
        assert!(matches!(
            graph.remove_edge("A->B"),
            Err(GraphError::UnknownEdge(_))
        ));
    }

    #[test]
    fn validate_spots_misfiled_edges() {
        let mut graph = two_people();
        graph.create_edge("A->B", "child", "A", "B").unwrap();
        graph
            .nodes
            .get_mut("B")
            .unwrap()
            .undirected
            .insert("A->B".to_string());
        assert!(matches!(
            graph.validate(),
            Err(GraphError::Inconsistent(_))
        ));
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        let mut graph = two_people();
        assert!(matches!(
            graph.move_node("A", Vec2::new(f64::NAN, 0.0)),
            Err(GraphError::InvalidGeometry { ref id, .. }) if id == "A"
        ));
        assert!(matches!(
            graph.displace_node("B", Vec2::new(0.0, f64::INFINITY)),
            Err(GraphError::InvalidGeometry { .. })
        ));
        assert_eq!(graph.node("A").unwrap().position(), Vec2::ZERO);
        assert_eq!(graph.node("B").unwrap().position(), Vec2::new(200.0, 0.0));
    }

    #[test]
    fn pan_is_all_or_nothing() {
        let mut graph = two_people();
        graph.move_node("A", Vec2::new(f64::MAX, 0.0)).unwrap();
        assert!(matches!(
            graph.pan(Vec2::new(f64::MAX, 0.0)),
            Err(GraphError::InvalidGeometry { ref id, .. }) if id == "A"
        ));
        assert_eq!(graph.node("B").unwrap().position(), Vec2::new(200.0, 0.0));
        assert!(graph.pan(Vec2::new(f64::NAN, 1.0)).is_err());
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let mut graph = two_people();
        let negative = Size {
            width: -5.0,
            height: 10.0,
        };
        assert!(matches!(
            graph.set_content_size("A", negative),
            Err(GraphError::InvalidGeometry { .. })
        ));
        assert!(graph.set_content_size("A", Size { width: f64::INFINITY, height: 1.0 }).is_err());
        assert_eq!(graph.node("A").unwrap().content_size(), Size::ZERO);

        let style = graph.policy().node_style();
        assert!(matches!(
            graph.create_node("C", negative, 10.0, style),
            Err(GraphError::InvalidGeometry { .. })
        ));
        assert!(!graph.contains_node("C"));

        let mut bad_style = style;
        bad_style.stroke_width = -1.0;
        assert!(graph.set_node_style("A", bad_style).is_err());
        assert_eq!(graph.node_style("A").unwrap(), &style);
    }

    #[test]
    fn pan_moves_everyone() {
        let mut graph = two_people();
        graph.pan(Vec2::new(10.0, -5.0)).unwrap();
        assert_eq!(graph.node("A").unwrap().position(), Vec2::new(10.0, -5.0));
        assert_eq!(graph.node("B").unwrap().position(), Vec2::new(210.0, -5.0));
    }
}
