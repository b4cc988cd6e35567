use std::path::PathBuf;

/// Which table an id collided in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Edge,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Node => f.write_str("node"),
            EntityKind::Edge => f.write_str("edge"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("{kind} id '{id}' is already in use")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("node '{0}' does not exist")]
    UnknownNode(String),

    #[error("edge '{0}' does not exist")]
    UnknownEdge(String),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("snapshot edge '{edge}' references missing node '{node}'")]
    DanglingReference { edge: String, node: String },

    #[error("invalid geometry for '{id}': {reason}")]
    InvalidGeometry { id: String, reason: String },

    #[error("graph invariant violated: {0}")]
    Inconsistent(String),

    #[error("failed to access snapshot file '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GraphError {
    pub(crate) fn duplicate_node(id: &str) -> Self {
        GraphError::DuplicateId {
            kind: EntityKind::Node,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid_geometry(id: &str, reason: impl Into<String>) -> Self {
        GraphError::InvalidGeometry {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn duplicate_edge(id: &str) -> Self {
        GraphError::DuplicateId {
            kind: EntityKind::Edge,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
