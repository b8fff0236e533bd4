//! REPL – Read-Eval-Print Loop for the rush parameter shell.
//!
//! Supported slash-commands:
//!   /help                 – show this list
//!   /load [ns]            – load a namespace into the store (root when omitted)
//!   /reload               – rebuild the store from every loaded namespace
//!   /get <key>            – print a stored value
//!   /json <key>           – print a stored value as JSON
//!   /keys                 – list stored keys
//!   /namespaces           – list loaded namespaces
//!   /set <name> <value>   – set a registry parameter (TOML literal syntax)
//!   /unset <name>         – remove a registry parameter and its children
//!   /file <path> [ns]     – load a TOML parameter file into the registry
//!   /save                 – persist the loaded namespaces as `autoload`
//!                           in the active config file
//!   /quit | /exit         – leave the shell

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rush_params::ParamStore;
use rush_registry::{MemoryRegistry, parse_value};

use crate::config::{self, Config};

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Load(String),
    Reload,
    Get(String),
    Json(String),
    Keys,
    Namespaces,
    Set { name: String, value: String },
    Unset(String),
    File { path: PathBuf, namespace: String },
    Save,
    Quit,
}

/// Whether the loop keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// State the shell commands operate on.
pub struct Session<'a> {
    pub store: &'a mut ParamStore,
    pub registry: &'a MemoryRegistry,
    pub config: Config,
    /// Where `/save` writes `config`.
    pub config_path: PathBuf,
}

/// Parse one input line into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let need = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!("{head} needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    match head {
        "/help" => Ok(Command::Help),
        "/load" => Ok(Command::Load(rest.to_string())),
        "/reload" => Ok(Command::Reload),
        "/get" => need("a key").map(Command::Get),
        "/json" => need("a key").map(Command::Json),
        "/keys" => Ok(Command::Keys),
        "/namespaces" => Ok(Command::Namespaces),
        "/set" => {
            let args = need("a name and a value")?;
            match args.split_once(char::is_whitespace) {
                Some((name, value)) => Ok(Command::Set {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                }),
                None => Err("/set needs a name and a value".to_string()),
            }
        }
        "/unset" => need("a name").map(Command::Unset),
        "/file" => {
            let args = need("a path")?;
            let (path, namespace) = match args.split_once(char::is_whitespace) {
                Some((path, namespace)) => (path, namespace.trim()),
                None => (args.as_str(), "/"),
            };
            Ok(Command::File {
                path: PathBuf::from(path),
                namespace: namespace.to_string(),
            })
        }
        "/save" => Ok(Command::Save),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command: '{other}'")),
    }
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
pub fn run(session: &mut Session<'_>, shutdown: Arc<AtomicBool>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        print!("{} ", "rush>".bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        let flow = match parse_command(&line) {
            Ok(cmd) => execute(session, cmd, &mut stdout),
            Err(e) => writeln!(stdout, "{} Type {} for available commands.", e.red(), "/help".bold())
                .map(|_| Flow::Continue),
        };
        match flow {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => {
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(e) => {
                eprintln!("{}: {}", "Write error".red(), e);
                break;
            }
        }
    }
}

/// Run a single command against `session`, writing user-facing output to `out`.
pub fn execute(session: &mut Session<'_>, cmd: Command, out: &mut impl Write) -> io::Result<Flow> {
    match cmd {
        Command::Help => cmd_help(out)?,
        Command::Load(namespace) => match session.store.load(&namespace) {
            Ok(merged) => writeln!(
                out,
                "{} {} parameter(s) from '{}'",
                "✓ Loaded".green(),
                merged,
                namespace
            )?,
            Err(e) => writeln!(out, "{}: {}", "Load failed".red(), e)?,
        },
        Command::Reload => match session.store.reload() {
            Ok(count) => writeln!(out, "{} {} parameter(s)", "✓ Reloaded".green(), count)?,
            Err(e) => writeln!(out, "{}: {}", "Reload failed".red(), e)?,
        },
        Command::Get(key) => match session.store.get(&key) {
            Ok(value) => writeln!(
                out,
                "  {} = {} {}",
                key.bold(),
                value,
                format!("({})", value.type_name()).dimmed()
            )?,
            Err(e) => writeln!(out, "{}", e.to_string().red())?,
        },
        Command::Json(key) => match session.store.get(&key).map(serde_json::to_string_pretty) {
            Ok(Ok(json)) => writeln!(out, "{json}")?,
            Ok(Err(e)) => writeln!(out, "{}: {}", "JSON error".red(), e)?,
            Err(e) => writeln!(out, "{}", e.to_string().red())?,
        },
        Command::Keys => {
            if session.store.is_empty() {
                writeln!(out, "  {}", "(no parameters loaded)".dimmed())?;
            }
            for key in session.store.get_keys() {
                writeln!(out, "  {key}")?;
            }
        }
        Command::Namespaces => {
            for namespace in session.store.namespaces() {
                writeln!(out, "  {namespace}")?;
            }
        }
        Command::Set { name, value } => {
            let value = parse_value(&value);
            let shown = value.to_string();
            match session.registry.set(&name, value) {
                Ok(()) => writeln!(out, "{} {} = {}", "✓ Set".green(), name.bold(), shown)?,
                Err(e) => writeln!(out, "{}: {}", "Set failed".red(), e)?,
            }
        }
        Command::Unset(name) => {
            let removed = session.registry.remove(&name);
            writeln!(out, "{} {} parameter(s)", "✓ Removed".green(), removed)?;
        }
        Command::File { path, namespace } => {
            match session.registry.load_toml_file(&path, &namespace) {
                Ok(count) => writeln!(
                    out,
                    "{} {} parameter(s) from {}",
                    "✓ Registered".green(),
                    count,
                    path.display().to_string().bold()
                )?,
                Err(e) => writeln!(out, "{}: {}", "File failed".red(), e)?,
            }
        }
        Command::Save => {
            session.config.autoload = session.store.namespaces().map(str::to_string).collect();
            match config::save_to(&session.config, &session.config_path) {
                Ok(()) => writeln!(
                    out,
                    "{} {}",
                    "✓ Settings saved to".green(),
                    session.config_path.display().to_string().bold()
                )?,
                Err(e) => writeln!(out, "{}: {}", "Error saving config".red(), e)?,
            }
        }
        Command::Quit => {
            writeln!(out, "{}", "Goodbye.".green())?;
            return Ok(Flow::Quit);
        }
    }
    Ok(Flow::Continue)
}

fn cmd_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "rush Commands".bold().underline())?;
    let rows = [
        ("/load [ns]", "load a namespace (relative to the context, absolute, or root)"),
        ("/reload", "rebuild the store from every loaded namespace"),
        ("/get <key>", "print a stored value"),
        ("/json <key>", "print a stored value as JSON"),
        ("/keys", "list stored keys"),
        ("/namespaces", "list loaded namespaces"),
        ("/set <name> <value>", "set a registry parameter"),
        ("/unset <name>", "remove a registry parameter"),
        ("/file <path> [ns]", "register a TOML parameter file"),
        ("/save", "persist loaded namespaces to the config file"),
        ("/quit  /exit", "exit the shell"),
    ];
    for (cmd, what) in rows {
        writeln!(out, "  {:<20} – {}", cmd.bold().cyan(), what)?;
    }
    writeln!(out)
}
