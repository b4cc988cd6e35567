use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::Level;

use genogram::{Editor, EditorConfig, Relationship, Size, StylePolicy, Theme, Vec2};

const DEFAULT_SNAPSHOT_NAME: &str = "saved.json";

#[derive(Debug, Parser)]
#[command(
    name = "genogram",
    about = "Edit genogram snapshots: people, relationships and family trees."
)]
pub struct Cli {
    /// Snapshot file to operate on.
    #[arg(
        short = 'f',
        long = "file",
        env = "GENOGRAM_FILE",
        default_value = DEFAULT_SNAPSHOT_NAME,
        global = true
    )]
    file: PathBuf,

    /// JSON file with foreground/background/focus colors used for new people and links.
    #[arg(long = "theme", global = true)]
    theme: Option<PathBuf>,

    /// Print more diagnostics on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress informational output.
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new, empty snapshot.
    New {
        /// Overwrite an existing snapshot.
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },

    /// Add one person.
    AddPerson {
        /// Id for the person; generated when omitted.
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,
        #[arg(long, default_value_t = genogram::graph::DEFAULT_INNER_WIDTH)]
        width: f64,
        #[arg(long, default_value_t = genogram::graph::DEFAULT_INNER_HEIGHT)]
        height: f64,
        #[arg(long, default_value_t = genogram::graph::DEFAULT_PADDING)]
        padding: f64,
    },

    /// Add two married people side by side.
    AddParents {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        y: f64,
    },

    /// Add a new person below PARENT, linked as its child.
    AddChild { parent: String },

    /// Link ORIGIN to TARGET. "child" links run from parent to child.
    Link {
        origin: String,
        target: String,
        /// married, child, separated, cohabitation, distant, friend, hostile, abuse.
        #[arg(short = 'r', long = "relationship", default_value = "child")]
        relationship: String,
    },

    /// Remove a single relationship.
    Unlink { edge: String },

    /// Move a person's top-left corner.
    Move {
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
    },

    /// Shift every person by the given offset.
    Pan {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dx: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dy: f64,
    },

    /// Remove a person, optionally with their descendants.
    Remove {
        id: String,
        #[arg(long, value_enum, default_value_t = RemoveMode::Single)]
        mode: RemoveMode,
    },

    /// Print people and relationships.
    Show {
        /// Print the raw snapshot instead of a listing.
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },

    /// Load the snapshot and verify its internal consistency.
    Check,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum RemoveMode {
    /// Only the person and their relationships.
    Single,
    /// Everyone below the person, keeping the person.
    Children,
    /// The person and everyone below them.
    Subtree,
}

pub fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    run(cli)
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let policy = load_policy(cli.theme.as_deref())?;
    let path = cli.file.as_path();
    let open = || open_editor(path, policy.clone());

    let message = match cli.command {
        Command::New { force } => {
            if path.exists() && !force {
                bail!(
                    "'{}' already exists; pass --force to overwrite it",
                    path.display()
                );
            }
            let editor = Editor::with_policy(policy.clone(), EditorConfig::default());
            save(&editor, path)?;
            format!("Created empty genogram -> {}", path.display())
        }
        Command::AddPerson {
            id,
            x,
            y,
            width,
            height,
            padding,
        } => {
            let mut editor = open()?;
            let position = Vec2::new(x, y);
            let id = match id {
                Some(id) => id,
                None => genogram::generate_node_id("random"),
            };
            editor.create_sized_node(&id, position, Size::new(width, height), padding)?;
            save(&editor, path)?;
            format!("Added person {id}")
        }
        Command::AddParents { x, y } => {
            let mut editor = open()?;
            editor.context_click(Vec2::new(x, y));
            let pair = editor.add_parents()?;
            save(&editor, path)?;
            format!("Added parents {} and {}", pair.first, pair.second)
        }
        Command::AddChild { parent } => {
            let mut editor = open()?;
            let child = editor.create_child(&parent)?;
            save(&editor, path)?;
            format!("Added child {} via {}", child.node, child.edge)
        }
        Command::Link {
            origin,
            target,
            relationship,
        } => {
            let mut editor = open()?;
            editor.start_linking(&origin, Relationship::from(relationship))?;
            match editor.complete_linking(&target)? {
                Some(edge) => {
                    save(&editor, path)?;
                    format!("Linked {edge}")
                }
                None => "Nothing to link: origin and target are the same person".to_string(),
            }
        }
        Command::Unlink { edge } => {
            let mut editor = open()?;
            editor.remove_edge(&edge)?;
            save(&editor, path)?;
            format!("Removed relationship {edge}")
        }
        Command::Move { id, x, y } => {
            let mut editor = open()?;
            editor.move_node(&id, Vec2::new(x, y))?;
            save(&editor, path)?;
            format!("Moved {id} to ({x}, {y})")
        }
        Command::Pan { dx, dy } => {
            let mut editor = open()?;
            editor.pan(Vec2::new(dx, dy))?;
            save(&editor, path)?;
            format!("Shifted {} people by ({dx}, {dy})", editor.graph().node_count())
        }
        Command::Remove { id, mode } => {
            let mut editor = open()?;
            let removed = match mode {
                RemoveMode::Single => {
                    editor.delete_node(&id)?;
                    vec![id.clone()]
                }
                RemoveMode::Children => editor.delete_descendants(&id)?,
                RemoveMode::Subtree => editor.delete_subtree(&id)?,
            };
            save(&editor, path)?;
            if removed.is_empty() {
                format!("{id} has no descendants")
            } else {
                format!("Removed {}", removed.join(", "))
            }
        }
        Command::Show { json } => {
            let editor = open()?;
            let output = if json {
                editor.snapshot().to_json()?
            } else {
                describe(&editor)?
            };
            write_stdout(output.as_bytes())?;
            return Ok(());
        }
        Command::Check => {
            let editor = open()?;
            editor.graph().validate()?;
            format!(
                "{} is consistent: {} people, {} relationships",
                path.display(),
                editor.graph().node_count(),
                editor.graph().edge_count()
            )
        }
    };

    report(cli.quiet, message)
}

fn load_policy(theme: Option<&Path>) -> Result<StylePolicy> {
    let Some(path) = theme else {
        return Ok(StylePolicy::default());
    };

    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    let theme: Theme = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse theme '{}'", path.display()))?;
    Ok(StylePolicy::with_theme(theme))
}

fn open_editor(path: &Path, policy: StylePolicy) -> Result<Editor> {
    if !path.exists() {
        return Err(anyhow!(
            "snapshot '{}' does not exist; run 'genogram new' first",
            path.display()
        ));
    }

    let mut editor = Editor::with_policy(policy, EditorConfig::default());
    editor
        .open(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?;
    Ok(editor)
}

fn save(editor: &Editor, path: &Path) -> Result<()> {
    editor
        .save(path)
        .with_context(|| format!("failed to write '{}'", path.display()))
}

fn describe(editor: &Editor) -> Result<String> {
    let graph = editor.graph();
    let mut out = String::new();

    let mut nodes: Vec<_> = graph.nodes().collect();
    nodes.sort_by(|a, b| a.id().cmp(b.id()));

    out.push_str(&format!("people ({}):\n", nodes.len()));
    for node in nodes {
        let position = node.position();
        let size = node.size();
        out.push_str(&format!(
            "  {} at ({:.1}, {:.1}) size {:.1}x{:.1}",
            node.id(),
            position.x,
            position.y,
            size.width,
            size.height
        ));
        for (label, ids) in [
            ("parents", node.parents()),
            ("children", node.children()),
            ("partners", node.undirected()),
        ] {
            if !ids.is_empty() {
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                out.push_str(&format!(" {label}=[{}]", ids.join(", ")));
            }
        }
        out.push('\n');
    }

    let mut edges: Vec<_> = graph.edges().collect();
    edges.sort_by(|a, b| a.id().cmp(b.id()));

    out.push_str(&format!("relationships ({}):\n", edges.len()));
    for edge in edges {
        let (start, end) = graph.anchor_points(edge.id())?;
        let arrow = if edge.directed() { "->" } else { "--" };
        out.push_str(&format!(
            "  {}: {} {arrow} {} [{}] {} from ({:.1}, {:.1}) to ({:.1}, {:.1})\n",
            edge.id(),
            edge.origin(),
            edge.target(),
            edge.relationship(),
            edge.style().color.to_hex(),
            start.x,
            start.y,
            end.x,
            end.y
        ));
    }

    Ok(out)
}

fn report(quiet: bool, message: String) -> Result<()> {
    if !quiet {
        write_stdout(format!("{message}\n").as_bytes())?;
    }
    Ok(())
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}
