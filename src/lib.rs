//! Relationship graph engine behind a genogram editor.
//!
//! People are nodes, typed relationships are edges. The [`Graph`] owns both tables
//! and keeps each node's `children`, `parents` and `undirected` adjacency sets in step
//! with its edges. [`Editor`] layers the interactive state (pending links, pointer,
//! quick actions) on top, and [`Snapshot`] is the JSON save format.

pub mod deletion;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod linking;
pub mod relationship;
pub mod snapshot;
pub mod style;

pub use editor::{Editor, EditorConfig, NewChild, ParentPair, generate_node_id};
pub use error::{EntityKind, GraphError, Result};
pub use geometry::{BoundingBox, Line, Size, Vec2};
pub use graph::{Edge, Graph, Node};
pub use linking::{LinkState, Linker, PendingLink, link_id};
pub use relationship::Relationship;
pub use snapshot::{EdgeRecord, NodeRecord, Snapshot};
pub use style::{Color, EdgeStyle, NodeStyle, StylePolicy, Theme};
