//! Lossless exchange format for a whole graph.
//!
//! The node records repeat their adjacency lists for anyone inspecting a saved file,
//! but decoding rebuilds adjacency from the edge records alone.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::geometry::{Size, Vec2, is_valid_length};
use crate::graph::{Edge, Graph, Node};
use crate::relationship::Relationship;
use crate::style::{Color, EdgeStyle, NodeStyle, StylePolicy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeRecord>,
    #[serde(default)]
    pub edges: BTreeMap<String, EdgeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default)]
    pub id: String,
    pub position: Vec2,
    /// Outer size at save time. Informational: recomputed on load.
    #[serde(default)]
    pub size: Size,
    pub inner_size: Size,
    #[serde(default)]
    pub content_size: Size,
    pub padding: f64,
    pub box_stroke_width: f64,
    pub box_fill_color: Color,
    pub box_stroke_color: Color,
    pub handle_color: Color,
    pub handle_stroke_width: f64,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub undirected: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(default)]
    pub id: String,
    pub origin: String,
    pub target: String,
    pub relationship: Relationship,
    pub directed: bool,
    pub color: Color,
    pub width: f64,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        let style = node.style();
        Self {
            id: node.id().to_string(),
            position: node.position(),
            size: node.size(),
            inner_size: node.inner_size(),
            content_size: node.content_size(),
            padding: node.padding(),
            box_stroke_width: style.stroke_width,
            box_fill_color: style.fill_color,
            box_stroke_color: style.stroke_color,
            handle_color: style.handle_color,
            handle_stroke_width: style.handle_stroke_width,
            children: node.children().iter().cloned().collect(),
            undirected: node.undirected().iter().cloned().collect(),
            parents: node.parents().iter().cloned().collect(),
        }
    }
}

impl From<&Edge> for EdgeRecord {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id().to_string(),
            origin: edge.origin().to_string(),
            target: edge.target().to_string(),
            relationship: edge.relationship().clone(),
            directed: edge.directed(),
            color: edge.style().color,
            width: edge.style().width,
        }
    }
}

impl Snapshot {
    pub fn encode(graph: &Graph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| (node.id().to_string(), NodeRecord::from(node)))
            .collect();
        let edges = graph
            .edges()
            .map(|edge| (edge.id().to_string(), EdgeRecord::from(edge)))
            .collect();
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Decodes with the default style policy.
    pub fn decode(&self) -> Result<Graph> {
        self.decode_with_policy(StylePolicy::default())
    }

    /// Builds a fresh graph from the snapshot. Nodes are materialised first, then
    /// edges are resolved by id and filed exactly as `Graph::create_edge` files them.
    pub fn decode_with_policy(&self, policy: StylePolicy) -> Result<Graph> {
        let mut graph = Graph::with_policy(policy);

        for (key, record) in &self.nodes {
            let id = record_id(key, &record.id, "node")?;
            graph.insert_node(decode_node(id, record)?)?;
        }

        for (key, record) in &self.edges {
            let id = record_id(key, &record.id, "edge")?;
            let edge = decode_edge(&graph, id, record)?;
            graph.insert_edge(edge)?;
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "snapshot decoded"
        );
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| GraphError::MalformedSnapshot(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| GraphError::MalformedSnapshot(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_json(&contents)?;
        info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Writes the snapshot next to `path` and renames it into place, so a reader sees
    /// either the previous file or the complete new one.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let io_error = |source: std::io::Error| GraphError::Io {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
        file.write_all(json.as_bytes()).map_err(io_error)?;
        file.write_all(b"\n").map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(path).map_err(|err| io_error(err.error))?;

        info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

fn record_id(key: &str, id: &str, kind: &str) -> Result<String> {
    if id.is_empty() || id == key {
        Ok(key.to_string())
    } else {
        Err(GraphError::MalformedSnapshot(format!(
            "{kind} stored under '{key}' carries id '{id}'"
        )))
    }
}

fn decode_node(id: String, record: &NodeRecord) -> Result<Node> {
    if !record.position.is_finite() {
        return Err(malformed(&id, "position is not finite"));
    }
    if !record.inner_size.is_valid() || !record.content_size.is_valid() {
        return Err(malformed(&id, "sizes must be finite and non-negative"));
    }
    if !is_valid_length(record.padding) {
        return Err(malformed(&id, "padding must be finite and non-negative"));
    }
    if !is_valid_length(record.box_stroke_width) || !is_valid_length(record.handle_stroke_width) {
        return Err(malformed(&id, "stroke widths must be finite and non-negative"));
    }

    let style = NodeStyle {
        fill_color: record.box_fill_color,
        stroke_color: record.box_stroke_color,
        stroke_width: record.box_stroke_width,
        handle_color: record.handle_color,
        handle_stroke_width: record.handle_stroke_width,
    };

    let mut node = Node::new(id, record.inner_size, record.padding, style);
    node.position = record.position;
    node.content_size = record.content_size;
    Ok(node)
}

fn decode_edge(graph: &Graph, id: String, record: &EdgeRecord) -> Result<Edge> {
    for endpoint in [&record.origin, &record.target] {
        if !graph.contains_node(endpoint) {
            return Err(GraphError::DanglingReference {
                edge: id,
                node: endpoint.clone(),
            });
        }
    }
    if record.directed != record.relationship.is_directed() {
        return Err(malformed(
            &id,
            &format!(
                "'directed' is {} for relationship '{}'",
                record.directed, record.relationship
            ),
        ));
    }
    if !is_valid_length(record.width) {
        return Err(malformed(&id, "width must be finite and non-negative"));
    }

    let style = EdgeStyle {
        color: record.color,
        width: record.width,
    };
    Ok(Edge::new(
        id,
        record.relationship.clone(),
        record.origin.clone(),
        record.target.clone(),
        style,
    ))
}

fn malformed(id: &str, reason: &str) -> GraphError {
    GraphError::MalformedSnapshot(format!("record '{id}': {reason}"))
}
