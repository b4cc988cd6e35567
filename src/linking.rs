//! Two-click edge creation: pick an origin, then a target.

use std::mem;

use tracing::debug;

use crate::error::Result;
use crate::geometry::{Line, Vec2};
use crate::graph::Graph;
use crate::relationship::Relationship;
use crate::style::Color;

/// Id given to an edge created by linking `origin` to `target`.
pub fn link_id(origin: &str, target: &str) -> String {
    format!("{origin}->{target}")
}

/// The rubber-band line shown while a link is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLink {
    pub origin: String,
    pub relationship: Relationship,
    /// `a` is pinned at the origin's center, `b` follows the pointer.
    pub line: Line,
    pub color: Color,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LinkState {
    #[default]
    Idle,
    Linking(PendingLink),
}

#[derive(Debug, Clone, Default)]
pub struct Linker {
    state: LinkState,
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn is_linking(&self) -> bool {
        matches!(self.state, LinkState::Linking(_))
    }

    pub fn pending(&self) -> Option<&PendingLink> {
        match &self.state {
            LinkState::Linking(pending) => Some(pending),
            LinkState::Idle => None,
        }
    }

    /// Begins a link from `origin`. An in-flight link is replaced without complaint.
    pub fn start(
        &mut self,
        graph: &Graph,
        origin: &str,
        relationship: Relationship,
        pointer: Vec2,
    ) -> Result<()> {
        let center = graph.require_node(origin)?.center();
        let color = graph.policy().edge_color(&relationship);

        if let LinkState::Linking(previous) = &self.state {
            debug!(previous = %previous.origin, "replacing pending link");
        }
        debug!(origin = %origin, relationship = %relationship, "linking started");

        self.state = LinkState::Linking(PendingLink {
            origin: origin.to_string(),
            relationship,
            line: Line::from_endpoints(center, pointer),
            color,
        });
        Ok(())
    }

    /// Moves the free end of the pending line. Does nothing while idle.
    pub fn pointer_moved(&mut self, pointer: Vec2) {
        if let LinkState::Linking(pending) = &mut self.state {
            pending.line.b = pointer;
        }
    }

    /// Finishes the link on `target` and returns the new edge id.
    ///
    /// Releasing on the origin itself, or completing while idle, creates nothing. The
    /// machine is idle afterwards whatever the outcome, including errors from the graph.
    pub fn complete(&mut self, graph: &mut Graph, target: &str) -> Result<Option<String>> {
        let LinkState::Linking(pending) = mem::take(&mut self.state) else {
            return Ok(None);
        };

        if pending.origin == target {
            debug!(origin = %target, "link released on its origin");
            return Ok(None);
        }

        let id = link_id(&pending.origin, target);
        graph.create_edge(id.clone(), pending.relationship, &pending.origin, target)?;
        Ok(Some(id))
    }

    /// Drops the pending link. Returns whether one was in flight.
    pub fn cancel(&mut self) -> bool {
        let was_linking = self.is_linking();
        self.state = LinkState::Idle;
        was_linking
    }

    /// Cancels the pending link if it starts at `node_id`.
    pub fn forget_node(&mut self, node_id: &str) {
        if self.pending().is_some_and(|pending| pending.origin == node_id) {
            self.cancel();
        }
    }
}
