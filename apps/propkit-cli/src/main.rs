use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use propkit_builder::PropertyPanel;
use propkit_common::{ObjectId, ValueKind};
use propkit_history::{ChangeConsumer, EditHistory, HistoryConfig};
use propkit_property::{ReferenceCandidate, ReferenceChooser, Selection};
use propkit_scene::{ChooserFactory, NodeHandle, SharedScene, sample_scene, share};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "propkit", about = "Inspect and edit the sample scene through property panels")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Maximum number of undoable edits (0 keeps everything)
    #[arg(long, default_value_t = HistoryConfig::default().capacity)]
    history_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Print the sample scene hierarchy
    Tree,
    /// Build and print the property panel of a node
    Panel {
        /// Node name, e.g. Lamp
        node: String,
        /// Print the controls as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit one property through its control and print the result
    Edit {
        node: String,
        property: String,
        /// New value as typed into the widget. Reference properties take a
        /// sibling node name or `none`.
        value: String,
        /// Undo the edit afterwards
        #[arg(long)]
        undo: bool,
    },
    /// Run the editing scenarios against the sample scene
    Demo {
        #[arg(long)]
        json: bool,
    },
}

struct Session {
    scene: SharedScene,
    history: Rc<EditHistory<NodeHandle>>,
}

impl Session {
    fn new(capacity: usize) -> Self {
        let scene = share(sample_scene());
        let history = Rc::new(
            EditHistory::with_config(HistoryConfig { capacity })
                .with_root(NodeHandle::root(&scene)),
        );
        Self { scene, history }
    }

    fn consumer(&self) -> Rc<dyn ChangeConsumer<NodeHandle>> {
        self.history.clone()
    }

    fn node(&self, name: &str) -> anyhow::Result<NodeHandle> {
        Ok(NodeHandle::find(&self.scene, name)?)
    }

    fn panel(
        &self,
        node: &NodeHandle,
        chooser: Option<ChooserFactory>,
    ) -> anyhow::Result<PropertyPanel<NodeHandle>> {
        let registry = match chooser {
            Some(factory) => propkit_scene::registry_with_chooser(factory),
            None => propkit_scene::default_registry(),
        };
        registry
            .build_panel(node, node.parent().as_ref(), &self.consumer())
            .with_context(|| format!("building panel for {node}"))
    }
}

/// Chooser that answers with the candidate labelled `wanted`.
fn pick_by_name(wanted: String) -> ChooserFactory {
    Rc::new(
        move |candidates: &[ReferenceCandidate]| -> Box<dyn ReferenceChooser> {
            let found = candidates
                .iter()
                .find(|c| c.label == wanted)
                .map(|c| c.id);
            let names: Vec<String> = candidates.iter().map(|c| c.label.clone()).collect();
            let wanted = wanted.clone();
            Box::new(move |_current: Option<ObjectId>| match found {
                Some(id) => Selection::Chosen(Some(id)),
                None => {
                    tracing::warn!("`{wanted}` is not one of: {}", names.join(", "));
                    Selection::Cancelled
                }
            })
        },
    )
}

fn print_panel(panel: &PropertyPanel<NodeHandle>) {
    let snapshot = panel.snapshot();
    for group in panel.groups() {
        println!("[{}]", group.title);
        for control in &snapshot[group.range.clone()] {
            println!("  {control}");
        }
    }
}

fn print_tree(scene: &SharedScene) {
    let scene = scene.borrow();
    for id in scene.depth_first() {
        let (Some(node), Some(depth)) = (scene.get(id), scene.depth(id)) else {
            continue;
        };
        let position = scene.world_position(id).unwrap_or_default();
        println!(
            "{:indent$}{} ({}) [{}] at ({:.2}, {:.2}, {:.2})",
            "",
            node.name,
            id.short(),
            node.aspects().join(", "),
            position.x,
            position.y,
            position.z,
            indent = depth * 2
        );
    }
}

fn edit(
    session: &Session,
    node: &str,
    property: &str,
    value: &str,
    undo: bool,
) -> anyhow::Result<()> {
    let handle = session.node(node)?;
    let mut panel = session.panel(&handle, Some(pick_by_name(value.to_string())))?;
    let control = panel
        .control_mut(property)
        .with_context(|| format!("{handle} has no `{property}` property"))?;

    let committed = if control.kind() == ValueKind::Reference && value != "none" {
        control.choose_reference()?
    } else {
        control
            .edit_text(value)
            .with_context(|| format!("invalid value for `{property}`"))?;
        control.apply()?
    };
    if !committed {
        bail!("`{property}` was not changed");
    }
    println!("applied: {}", session.history.undo_description().unwrap_or_default());

    if undo {
        session.history.undo()?;
        let changes = session.history.drain_changes();
        let reloaded = panel.sync_changes(&changes);
        println!("undone ({reloaded} control reloaded)");
    }
    print_panel(&panel);
    println!(
        "history: {} undo, {} redo",
        session.history.undo_count(),
        session.history.redo_count()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let session = Session::new(cli.history_capacity);
    match cli.command {
        Commands::Info => {
            println!("propkit v{}", env!("CARGO_PKG_VERSION"));
            println!("history: {}", propkit_history::crate_info());
            println!("property: {}", propkit_property::crate_info());
            println!("builder: {}", propkit_builder::crate_info());
            println!("scene: {}", propkit_scene::crate_info());
            println!("egui: {}", propkit_egui::crate_info());
            println!(
                "history capacity: {}",
                session.history.config().capacity
            );
        }
        Commands::Tree => print_tree(&session.scene),
        Commands::Panel { node, json } => {
            let handle = session.node(&node)?;
            let panel = session.panel(&handle, None)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&panel.snapshot())?);
            } else {
                println!("{handle}");
                print_panel(&panel);
            }
        }
        Commands::Edit {
            node,
            property,
            value,
            undo,
        } => edit(&session, &node, &property, &value, undo)?,
        Commands::Demo { json } => {
            let reports = propkit_scene::scenarios::run_all();
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print!("{report}");
                }
            }
            let failed = reports.iter().filter(|r| !r.passed).count();
            if failed > 0 {
                bail!("{failed} scenario(s) failed");
            }
        }
    }

    Ok(())
}
