//! `rush-cli` – interactive shell over a namespace-scoped parameter store.
//!
//! The `rush` binary:
//!
//! 1. Reads `~/.rush/config.toml` (or `--config`), applies `RUSH_*`
//!    environment overrides, then command-line flags.
//! 2. Registers every configured TOML parameter file in an in-process
//!    [`MemoryRegistry`].
//! 3. Builds a [`ParamStore`] over that registry and loads the `autoload`
//!    namespaces.
//! 4. Drops the user into an **interactive REPL** with slash-commands
//!    (`/load`, `/reload`, `/get`, `/keys`, `/set`, `/help`, …).
//! 5. Intercepts **Ctrl-C** to leave the REPL cleanly.

mod config;
mod repl;
mod telemetry;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use rush_params::ParamStore;
use rush_registry::{FixedContext, MemoryRegistry, NamespaceContext};

#[derive(Debug, Parser)]
#[command(
    name = "rush",
    version,
    about = "Interactive shell over a namespace-scoped parameter store",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to ~/.rush/config.toml).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Context namespace that relative namespaces resolve against.
    #[arg(long, value_name = "NS")]
    namespace: Option<String>,

    /// Milliseconds to wait before each registry query.
    #[arg(long = "grace-ms", value_name = "MS")]
    grace_ms: Option<u64>,

    /// TOML parameter file to register at start-up (repeatable).
    #[arg(long = "file", value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Namespace to load at start-up (repeatable).
    #[arg(long = "load", value_name = "NS")]
    load: Vec<String>,
}

impl Cli {
    /// Layer command-line flags over the file/environment configuration.
    fn apply(&self, cfg: &mut config::Config) {
        if let Some(ns) = &self.namespace {
            cfg.namespace = ns.clone();
        }
        if let Some(ms) = self.grace_ms {
            cfg.grace_period_ms = ms;
        }
        cfg.params_files.extend(self.files.iter().cloned());
        cfg.autoload.extend(self.load.iter().cloned());
    }
}

fn main() {
    let _telemetry = telemetry::init_tracing("rush");
    let cli = Cli::parse();

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – leaving rush …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will terminate without cleanup");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => config::defaults_with_env_overrides(),
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::defaults_with_env_overrides()
        }
    };
    cli.apply(&mut cfg);

    // ── Registry ──────────────────────────────────────────────────────────
    let registry = Arc::new(MemoryRegistry::new());
    for file in &cfg.params_files {
        match registry.load_toml_file(file, "/") {
            Ok(count) => println!(
                "  Registered {} parameter(s) from {}",
                count,
                file.display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Parameter file error".red(), e),
        }
    }

    // ── Store ─────────────────────────────────────────────────────────────
    let context = match FixedContext::new(cfg.namespace.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            println!("{}: {} – using '/'", "Namespace error".red(), e);
            FixedContext::root()
        }
    };
    println!("  Context namespace: {}", context.current_namespace().yellow());

    let mut store = ParamStore::with_config(registry.clone(), Arc::new(context), cfg.store_config());
    for namespace in &cfg.autoload {
        match store.load(namespace) {
            Ok(merged) => println!("  Loaded {} parameter(s) from '{}'", merged, namespace),
            Err(e) => println!("{} '{}': {}", "Load failed for".red(), namespace, e),
        }
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    let mut session = repl::Session {
        store: &mut store,
        registry: &registry,
        config: cfg,
        config_path: path,
    };
    repl::run(&mut session, shutdown);
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "rush".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Namespace-scoped parameter shell");
    println!();
}
