use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dsa_arcade_core::{
    modules::ModuleKind, ActionDispatcher, ArcadeConfig, ControlId, HeadlessBackend, ModuleHost,
    Outcome, Overlay, RenderBackend, RenderLoop, Services,
};
use tracing_subscriber::EnvFilter;

fn main() -> dsa_arcade_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Modules => {
            for kind in ModuleKind::all() {
                println!("{}", kind.id());
            }
            Ok(())
        }
        Commands::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> dsa_arcade_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => ArcadeConfig::load(path)?,
        None => ArcadeConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    let module = args
        .module
        .clone()
        .unwrap_or_else(|| config.start_module.clone());
    tracing::info!(module, config = ?args.config, "starting headless session");

    let backend = HeadlessBackend::default().with_overlay(Overlay {
        labels_layer: !args.no_labels,
        context_menu: !args.no_context_menu,
    });
    let services = Services::from_config(&config, backend.overlay())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async move {
        let mut render = RenderLoop::new(backend, services.scene.clone());
        let mut dispatcher = ActionDispatcher::new(ModuleHost::new(services));

        if let Some(speed) = args.speed {
            dispatcher.set_speed(speed)?;
        }
        dispatcher.load(&module)?;
        render.frame()?;

        for spec in &args.actions {
            let (action, aux) = match spec.split_once('=') {
                Some((action, aux)) => (action, Some(aux.to_string())),
                None => (spec.as_str(), None),
            };
            let ticket = dispatcher.dispatch(action, ControlId::new(action), aux)?;
            let outcome = ticket.settled().await;
            if let Outcome::Failed(reason) = &outcome {
                tracing::warn!(action, reason, "action failed");
            } else {
                tracing::debug!(action, ?outcome, "action settled");
            }
            render.frame()?;
        }

        dispatcher.settle().await;
        render.frame()?;

        for notice in dispatcher.notices().snapshot() {
            println!("[{}] {}", notice.severity, notice.message);
        }
        tracing::info!(
            frames = render.backend().frames(),
            objects = render.backend().last_object_count(),
            "session finished"
        );
        dispatcher.shutdown()
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless runner for the DSA Arcade visualizations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every module identifier.
    Modules,
    /// Load a module, play a list of actions and print the execution log.
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Module to load. Defaults to the configured start module.
    #[arg(short, long)]
    module: Option<String>,
    /// Action to dispatch, optionally with an argument (`name=value`).
    #[arg(short, long = "action")]
    actions: Vec<String>,
    /// Animation speed multiplier.
    #[arg(short, long)]
    speed: Option<f64>,
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Fixed seed for generated values.
    #[arg(long)]
    seed: Option<u64>,
    /// Run as if the UI had no floating label layer.
    #[arg(long)]
    no_labels: bool,
    /// Run as if the UI had no context menu.
    #[arg(long)]
    no_context_menu: bool,
}
