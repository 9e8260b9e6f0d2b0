//! CLI command definitions for the `qwire` binary.
//!
//! Uses clap derive macros for argument parsing. Two main modes:
//! `qwire serve` runs the relay HTTP server, `qwire chat` runs the
//! interactive terminal client against one.

pub mod chat;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Relay chat between field users and an automation workflow.
#[derive(Parser)]
#[command(name = "qwire", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay HTTP server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Use the in-process message store instead of the configured
        /// REST store (demo mode, nothing survives a restart).
        #[arg(long)]
        memory: bool,
    },

    /// Start an interactive chat session against a relay server.
    Chat {
        /// Relay server base URL.
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,

        /// Display name, embedded in the session id and forwarded to
        /// the automation workflow.
        #[arg(long)]
        name: Option<String>,

        /// Stable technician id (survives name changes).
        #[arg(long)]
        tech_id: Option<String>,

        /// Job title forwarded to the automation workflow.
        #[arg(long)]
        role: Option<String>,
    },

    /// Send feedback to the feedback webhook without starting a chat.
    Feedback {
        /// Name to attribute the feedback to.
        #[arg(long, default_value = "anonymous")]
        name: String,

        /// The feedback text.
        message: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
