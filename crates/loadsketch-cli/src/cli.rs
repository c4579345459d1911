//! Command-line interface for the loadsketch utility
//!
//! Hosts an editor session in the terminal: import a diagram, run the traffic
//! calculation, validate documents, and replay scripted editing sessions.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::report::render_report;
use loadsketch::core::logging::init_logging;
use loadsketch::{
    CanvasBounds, DiagramDocument, EditorConfig, EditorEvent, EditorSession, NodeKind,
    NodeMetrics, VisitPolicy,
};

/// Loadsketch - estimate request rates across architecture diagrams
#[derive(Parser)]
#[command(name = "loadsketch")]
#[command(about = "Propagate user demand through system architecture diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Log level options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a diagram and compute request rates
    Calculate {
        /// Input diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file for the updated document (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a load report instead of the document
        #[arg(long)]
        report: bool,

        #[command(flatten)]
        session: SessionArgs,

        /// When to use colors in the report
        #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
        color: ColorChoice,
    },

    /// Check that a document can be imported
    Validate {
        /// Input diagram document (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Apply a scripted list of editor events to a diagram
    Replay {
        /// Starting diagram document (use - for stdin, omit for an empty diagram)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSON array of editor events
        #[arg(short, long)]
        script: PathBuf,

        /// Output file for the resulting document (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Show the available component kinds
    Kinds {
        /// Show in JSON format
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by commands that open an editor session
#[derive(Args, Debug, Clone, Copy, PartialEq)]
pub struct SessionArgs {
    /// Canvas width nodes are kept within
    #[arg(long, default_value_t = 1600.0)]
    pub canvas_width: f64,

    /// Canvas height nodes are kept within
    #[arg(long, default_value_t = 1000.0)]
    pub canvas_height: f64,

    /// How the traffic calculation cuts cycles
    #[arg(long, value_enum, default_value_t = PolicyChoice::SharedPath)]
    pub visit_policy: PolicyChoice,
}

impl SessionArgs {
    fn config(&self) -> EditorConfig {
        EditorConfig::default()
            .with_canvas(CanvasBounds::new(self.canvas_width, self.canvas_height))
            .with_visit_policy(self.visit_policy.into())
    }
}

/// Cycle guard policies
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum PolicyChoice {
    /// One visited set per root descent (nodes reached twice count once)
    #[default]
    SharedPath,
    /// Visited set copied per inbound branch (only true cycles are cut)
    PerBranch,
}

impl From<PolicyChoice> for VisitPolicy {
    fn from(value: PolicyChoice) -> Self {
        match value {
            PolicyChoice::SharedPath => VisitPolicy::SharedPath,
            PolicyChoice::PerBranch => VisitPolicy::PerBranch,
        }
    }
}

/// When to colorize output
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if output is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Main CLI application
#[derive(Default)]
pub struct LoadsketchApp;

impl LoadsketchApp {
    pub fn new() -> Self {
        Self
    }

    /// Run the application with the given CLI arguments
    pub fn run(&mut self, cli: Cli) -> Result<()> {
        // flags win over LOADSKETCH_LOG_* and RUST_LOG
        if let Err(e) = init_logging(
            cli.log_level.map(|l| l.as_str()),
            cli.log_format.map(|f| f.as_str()),
        ) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Loadsketch v{}", env!("CARGO_PKG_VERSION"));
        }

        match cli.command {
            Commands::Calculate {
                input,
                output,
                report,
                session,
                color,
            } => self.calculate_command(input, output, report, session, color, cli.verbose),
            Commands::Validate { input } => self.validate_command(input, cli.verbose),
            Commands::Replay {
                input,
                script,
                output,
                session,
            } => self.replay_command(input, script, output, session, cli.verbose),
            Commands::Kinds { json } => self.kinds_command(json, cli.verbose),
        }
    }

    /// Handle the calculate command
    fn calculate_command(
        &self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        report: bool,
        session_args: SessionArgs,
        color: ColorChoice,
        verbose: bool,
    ) -> Result<()> {
        let content = self.read_input(input)?;

        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let mut session = EditorSession::from_json(&content, session_args.config())?;
        let traffic = match session.calculate_traffic() {
            Ok(traffic) => Some(traffic),
            Err(e) if e.is_warning() => {
                eprintln!("Warning: {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        if let (Some(traffic), true) = (&traffic, verbose) {
            eprintln!(
                "Calculated traffic for {} components, {} overloaded",
                traffic.nodes.len(),
                traffic.overloaded().count()
            );
        }

        if report {
            if let Some(traffic) = &traffic {
                let colorize = self.should_colorize(&None, color);
                self.write_output(None, &render_report(traffic, colorize))?;
            }
            if output.is_some() {
                self.write_document(output, &session.export())?;
            }
            Ok(())
        } else {
            self.write_document(output, &session.export())
        }
    }

    /// Determine if we should colorize the output based on color choice and output destination
    fn should_colorize(&self, output: &Option<PathBuf>, color: ColorChoice) -> bool {
        match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if std::env::var("NO_COLOR").is_ok() {
                    return false;
                }
                match output {
                    None => crossterm::tty::IsTty::is_tty(&std::io::stdout()),
                    Some(ref p) if p.to_str() == Some("-") => {
                        crossterm::tty::IsTty::is_tty(&std::io::stdout())
                    }
                    Some(_) => false,
                }
            }
        }
    }

    /// Handle the validate command
    fn validate_command(&self, input: Option<PathBuf>, verbose: bool) -> Result<()> {
        let content = self.read_input(input)?;

        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        match DiagramDocument::from_json(&content) {
            Ok(document) => {
                println!(
                    "✓ Valid diagram ({} components, {} connections)",
                    document.components.len(),
                    document.connections.len()
                );
                Ok(())
            }
            Err(e) => {
                println!("✗ Invalid diagram: {}", e);
                Err(e.into())
            }
        }
    }

    /// Handle the replay command
    fn replay_command(
        &self,
        input: Option<PathBuf>,
        script: PathBuf,
        output: Option<PathBuf>,
        session_args: SessionArgs,
        verbose: bool,
    ) -> Result<()> {
        let config = session_args.config();
        let mut session = match input {
            Some(path) => EditorSession::from_json(&self.read_input(Some(path))?, config)?,
            None => EditorSession::new(config),
        };

        let script_text = fs::read_to_string(&script)
            .with_context(|| format!("Failed to read script '{}'", script.display()))?;
        let events: Vec<EditorEvent> = serde_json::from_str(&script_text)
            .with_context(|| format!("Invalid event script '{}'", script.display()))?;

        if verbose {
            eprintln!("Replaying {} events", events.len());
        }
        info!(events = events.len(), script = %script.display(), "Replaying script");

        for (index, event) in events.into_iter().enumerate() {
            debug!(index, ?event, "Applying event");
            match session.handle(event) {
                Ok(()) => {}
                Err(e) if e.is_warning() => eprintln!("Warning: event {}: {}", index, e),
                Err(e) => return Err(anyhow!("event {}: {}", index, e)),
            }
        }

        self.write_document(output, &session.export())
    }

    /// Handle the kinds command
    fn kinds_command(&self, json: bool, verbose: bool) -> Result<()> {
        if verbose {
            eprintln!("Listing component kinds");
        }

        if json {
            let kinds: Vec<_> = NodeKind::ALL
                .iter()
                .map(|kind| {
                    serde_json::json!({
                        "kind": kind,
                        "label": kind.label(),
                        "metrics": NodeMetrics::for_kind(*kind),
                    })
                })
                .collect();
            let listing = serde_json::json!({
                "kinds": kinds,
                "total": NodeKind::ALL.len(),
            });
            println!("{}", serde_json::to_string_pretty(&listing)?);
        } else {
            println!("Component kinds:");
            for kind in NodeKind::ALL {
                println!("  {:<14} - {}", kind.as_str(), kind.label());
            }
            println!();
            println!("Total: {} component kinds", NodeKind::ALL.len());
        }

        Ok(())
    }

    fn write_document(&self, output: Option<PathBuf>, document: &DiagramDocument) -> Result<()> {
        let json = document.to_json_pretty()?;
        self.write_output(output, &json)
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let stdout_content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", stdout_content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}
