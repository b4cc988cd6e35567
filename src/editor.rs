//! Editing session driven by the UI layer.
//!
//! The editor owns the graph together with the transient interaction state (pending
//! link, pointer position, where the last context menu was opened) and exposes the
//! commands the canvas and its menus trigger.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::geometry::{Size, Vec2};
use crate::graph::{DEFAULT_INNER_HEIGHT, DEFAULT_INNER_WIDTH, DEFAULT_PADDING, Graph, Node};
use crate::linking::{Linker, PendingLink, link_id};
use crate::relationship::Relationship;
use crate::snapshot::Snapshot;
use crate::style::{NodeStyle, StylePolicy};

/// Placement constants for the quick actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Vertical space between a parent and a child created from its menu.
    pub child_gap: f64,
    /// Horizontal space between the two people added by "Add Parents".
    pub parent_spacing: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            child_gap: 50.0,
            parent_spacing: 270.0,
        }
    }
}

/// Ids produced by "Add Parents".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentPair {
    pub first: String,
    pub second: String,
    pub marriage: String,
}

/// Ids produced by "Create Child".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChild {
    pub node: String,
    pub edge: String,
}

/// Fresh node id in the `<random>:<role>` shape.
pub fn generate_node_id(role: &str) -> String {
    format!("{}:{role}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, Default)]
pub struct Editor {
    graph: Graph,
    linker: Linker,
    config: EditorConfig,
    pointer: Vec2,
    context_point: Vec2,
    hovered: Option<String>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: StylePolicy, config: EditorConfig) -> Self {
        Self {
            graph: Graph::with_policy(policy),
            config,
            ..Self::default()
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn linker(&self) -> &Linker {
        &self.linker
    }

    /// Rubber-band line to draw while a link is pending.
    pub fn pending_link(&self) -> Option<&PendingLink> {
        self.linker.pending()
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        self.pointer = position;
        self.linker.pointer_moved(position);
    }

    /// The pointer entered a node's handle.
    pub fn hover_node(&mut self, id: &str) -> Result<()> {
        self.graph.require_node(id)?;
        self.hovered = Some(id.to_string());
        Ok(())
    }

    /// The pointer left whatever handle it was over.
    pub fn unhover(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Style to draw a node with; the hovered node's handle takes the theme focus color.
    pub fn node_style(&self, id: &str) -> Result<NodeStyle> {
        let style = *self.graph.node_style(id)?;
        if self.hovered.as_deref() == Some(id) {
            Ok(self.graph.policy().focused_handle(style))
        } else {
            Ok(style)
        }
    }

    /// Remembers where the canvas context menu was opened; new people land there.
    pub fn context_click(&mut self, position: Vec2) {
        self.context_point = position;
    }

    pub fn context_point(&self) -> Vec2 {
        self.context_point
    }

    /// A primary click on empty canvas abandons any pending link.
    pub fn primary_click_background(&mut self) {
        if self.linker.cancel() {
            debug!("pending link cancelled by background click");
        }
    }

    pub fn create_node(&mut self, id: &str, position: Vec2) -> Result<()> {
        self.create_sized_node(
            id,
            position,
            Size::new(DEFAULT_INNER_WIDTH, DEFAULT_INNER_HEIGHT),
            DEFAULT_PADDING,
        )
    }

    /// Like [`Editor::create_node`] with an explicit inner size and padding.
    ///
    /// Nothing is added when the position is rejected.
    pub fn create_sized_node(
        &mut self,
        id: &str,
        position: Vec2,
        inner_size: Size,
        padding: f64,
    ) -> Result<()> {
        let style = self.graph.policy().node_style();
        let mut node = Node::new(id.to_string(), inner_size, padding, style);
        node.position = position;
        self.graph.insert_node(node)?;
        Ok(())
    }

    pub fn create_edge(
        &mut self,
        id: &str,
        relationship: Relationship,
        origin: &str,
        target: &str,
    ) -> Result<()> {
        self.graph.create_edge(id, relationship, origin, target)?;
        Ok(())
    }

    /// "New" from the canvas menu: one person at the context menu position.
    pub fn add_person(&mut self) -> Result<String> {
        let id = generate_node_id("random");
        self.create_node(&id, self.context_point)?;
        info!(node = %id, "person added");
        Ok(id)
    }

    /// "Add Parents": two married people side by side at the context menu position.
    pub fn add_parents(&mut self) -> Result<ParentPair> {
        let first = generate_node_id("parent");
        let second = generate_node_id("parent");

        let origin = self.context_point;
        self.create_node(&first, origin)?;
        let width = self.graph.bounding_box_of(&first)?.size.width;
        let offset = Vec2::new(width + self.config.parent_spacing, 0.0);
        if let Err(err) = self.create_node(&second, origin + offset) {
            self.graph.delete_node(&first)?;
            return Err(err);
        }

        let marriage = link_id(&first, &second);
        self.graph
            .create_edge(marriage.clone(), Relationship::Married, &first, &second)?;

        info!(first = %first, second = %second, "parents added");
        Ok(ParentPair {
            first,
            second,
            marriage,
        })
    }

    /// "Create Child": a new person below `parent`, joined by a child edge.
    pub fn create_child(&mut self, parent: &str) -> Result<NewChild> {
        let bounds = self.graph.bounding_box_of(parent)?;
        let node = generate_node_id("random");
        let position = bounds.origin + Vec2::new(0.0, bounds.size.height + self.config.child_gap);

        self.create_node(&node, position)?;
        let edge = link_id(parent, &node);
        self.graph
            .create_edge(edge.clone(), Relationship::Child, parent, &node)?;

        info!(parent = %parent, child = %node, "child created");
        Ok(NewChild { node, edge })
    }

    pub fn start_linking(&mut self, origin: &str, relationship: Relationship) -> Result<()> {
        if !relationship.is_known() {
            warn!(%relationship, "unrecognized relationship, using the fallback color");
        }
        self.linker
            .start(&self.graph, origin, relationship, self.pointer)
    }

    /// Pointer released over `target`. Returns the id of the edge created, if any.
    pub fn complete_linking(&mut self, target: &str) -> Result<Option<String>> {
        let created = self.linker.complete(&mut self.graph, target);
        if let Err(err) = &created {
            warn!(node = %target, error = %err, "link rejected");
        }
        created
    }

    pub fn cancel_linking(&mut self) -> bool {
        self.linker.cancel()
    }

    pub fn move_node(&mut self, id: &str, position: Vec2) -> Result<()> {
        self.graph.move_node(id, position)
    }

    /// Dragging a node by its handle.
    pub fn drag_node(&mut self, id: &str, delta: Vec2) -> Result<()> {
        self.graph.displace_node(id, delta)
    }

    /// Dragging the empty canvas.
    pub fn pan(&mut self, delta: Vec2) -> Result<()> {
        self.graph.pan(delta)
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<()> {
        self.graph.remove_edge(id)?;
        Ok(())
    }

    /// "Remove (single)".
    pub fn delete_node(&mut self, id: &str) -> Result<Vec<String>> {
        let removed = self.graph.delete_node(id)?;
        self.forget_node(id);
        Ok(removed)
    }

    /// "Remove (children)".
    pub fn delete_descendants(&mut self, id: &str) -> Result<Vec<String>> {
        let removed = self.graph.delete_descendants(id)?;
        for node in &removed {
            self.forget_node(node);
        }
        Ok(removed)
    }

    /// "Remove (person + all children)".
    pub fn delete_subtree(&mut self, id: &str) -> Result<Vec<String>> {
        let removed = self.graph.delete_subtree(id)?;
        for node in &removed {
            self.forget_node(node);
        }
        Ok(removed)
    }

    /// "New document".
    pub fn clear(&mut self) {
        self.linker.cancel();
        self.hovered = None;
        self.graph.clear();
        info!("graph cleared");
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::encode(&self.graph)
    }

    /// Replaces the whole graph. On error the current graph is left exactly as it was.
    pub fn load_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let graph = snapshot.decode_with_policy(self.graph.policy().clone())?;
        self.linker.cancel();
        self.hovered = None;
        self.graph = graph;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.snapshot().save(path)
    }

    pub fn open(&mut self, path: &Path) -> Result<()> {
        let snapshot = Snapshot::load(path)?;
        self.load_snapshot(&snapshot)
    }

    fn forget_node(&mut self, id: &str) {
        self.linker.forget_node(id);
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn add_person_uses_context_point() {
        let mut editor = Editor::new();
        editor.context_click(Vec2::new(40.0, 60.0));
        let id = editor.add_person().unwrap();
        assert!(id.ends_with(":random"));
        assert_eq!(
            editor.graph().node(&id).unwrap().position(),
            Vec2::new(40.0, 60.0)
        );
    }

    #[test]
    fn add_parents_places_a_married_pair() {
        let mut editor = Editor::new();
        editor.context_click(Vec2::new(10.0, 10.0));
        let pair = editor.add_parents().unwrap();

        let graph = editor.graph();
        assert_eq!(
            graph.node(&pair.second).unwrap().position(),
            Vec2::new(10.0 + 70.0 + 270.0, 10.0)
        );
        let marriage = graph.edge(&pair.marriage).unwrap();
        assert_eq!(marriage.relationship(), &Relationship::Married);
        assert_eq!(marriage.origin(), pair.first);
        graph.validate().unwrap();
    }

    #[test]
    fn create_child_goes_below_parent() {
        let mut editor = Editor::new();
        editor.create_node("p", Vec2::new(100.0, 0.0)).unwrap();
        let child = editor.create_child("p").unwrap();

        let graph = editor.graph();
        assert_eq!(
            graph.node(&child.node).unwrap().position(),
            Vec2::new(100.0, 120.0)
        );
        assert!(graph.node("p").unwrap().children().contains(&child.edge));
        assert!(graph.node(&child.node).unwrap().parents().contains(&child.edge));
    }

    #[test]
    fn linking_uses_current_pointer() {
        let mut editor = Editor::new();
        editor.create_node("a", Vec2::ZERO).unwrap();
        editor.create_node("b", Vec2::new(200.0, 0.0)).unwrap();

        editor.pointer_moved(Vec2::new(90.0, 90.0));
        editor.start_linking("a", Relationship::Distant).unwrap();
        assert_eq!(editor.pending_link().unwrap().line.b, Vec2::new(90.0, 90.0));

        editor.primary_click_background();
        assert!(editor.pending_link().is_none());

        editor.start_linking("a", Relationship::Distant).unwrap();
        assert_eq!(editor.complete_linking("b").unwrap().as_deref(), Some("a->b"));
    }

    #[test]
    fn deleting_the_link_origin_cancels_the_link() {
        let mut editor = Editor::new();
        editor.create_node("a", Vec2::ZERO).unwrap();
        editor.create_node("b", Vec2::new(200.0, 0.0)).unwrap();
        editor.start_linking("a", Relationship::Child).unwrap();
        editor.delete_node("a").unwrap();
        assert!(!editor.linker().is_linking());
        assert_eq!(editor.complete_linking("b").unwrap(), None);
    }

    #[test]
    fn failed_load_keeps_current_graph() {
        let mut editor = Editor::new();
        editor.create_node("a", Vec2::ZERO).unwrap();
        editor.create_node("b", Vec2::new(200.0, 0.0)).unwrap();
        editor
            .create_edge("a->b", Relationship::Child, "a", "b")
            .unwrap();
        let before = editor.snapshot();

        let mut broken = before.clone();
        broken.nodes.remove("b");
        let err = editor.load_snapshot(&broken).unwrap_err();
        assert!(matches!(err, GraphError::DanglingReference { .. }));
        assert_eq!(editor.snapshot(), before);
    }

    #[test]
    fn rejected_positions_add_nobody() {
        let mut editor = Editor::new();
        let err = editor
            .create_node("a", Vec2::new(f64::NAN, 0.0))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidGeometry { .. }));
        assert!(editor.graph().is_empty());

        editor.context_click(Vec2::new(f64::INFINITY, 0.0));
        assert!(editor.add_person().is_err());
        assert!(editor.graph().is_empty());

        let config = EditorConfig {
            parent_spacing: f64::MAX,
            ..EditorConfig::default()
        };
        let mut editor = Editor::with_policy(StylePolicy::default(), config);
        editor.context_click(Vec2::new(f64::MAX, 0.0));
        assert!(editor.add_parents().is_err());
        assert!(editor.graph().is_empty());
    }

    #[test]
    fn hovered_handle_takes_focus_color() {
        let mut editor = Editor::new();
        editor.create_node("a", Vec2::ZERO).unwrap();
        editor.create_node("b", Vec2::new(200.0, 0.0)).unwrap();
        let plain = editor.node_style("a").unwrap();

        editor.hover_node("a").unwrap();
        let focus = editor.graph().policy().theme.focus;
        assert_eq!(editor.node_style("a").unwrap().handle_color, focus);
        assert_eq!(editor.node_style("b").unwrap(), plain);

        editor.unhover();
        assert_eq!(editor.node_style("a").unwrap(), plain);

        assert!(matches!(
            editor.hover_node("ghost"),
            Err(GraphError::UnknownNode(_))
        ));
        editor.hover_node("b").unwrap();
        editor.delete_node("b").unwrap();
        assert_eq!(editor.hovered(), None);
    }

    #[test]
    fn clear_empties_everything() {
        let mut editor = Editor::new();
        editor.create_node("a", Vec2::ZERO).unwrap();
        editor.start_linking("a", Relationship::Child).unwrap();
        editor.clear();
        assert!(editor.graph().is_empty());
        assert!(!editor.linker().is_linking());
    }
}
