//! Command line argument parsing.
//!
//! Subcommands:
//! - `processes`: list process definitions deployed on the engine
//! - `start-flow`: start an instance of a configured flow
//! - `tasks`: list human tasks, with state/assignee/process filters
//! - `case`: show a case, optionally with its variables
//! - `show-config`: show configuration discovery information

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "flowbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bridge to a Bonita-compatible business-process engine")]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path (bypasses discovery)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Engine username (falls back to FLOWBRIDGE_USERNAME)
    #[arg(short = 'u', long = "username", global = true)]
    pub username: Option<String>,

    /// Engine password (falls back to FLOWBRIDGE_PASSWORD)
    #[arg(short = 'p', long = "password", global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List process definitions deployed on the engine
    Processes {
        /// Page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Page size
        #[arg(long, default_value_t = 10)]
        count: u32,
        /// Sort criterion, e.g. "name ASC"
        #[arg(short = 'o', long)]
        sort: Option<String>,
    },
    /// Start an instance of a configured flow
    StartFlow {
        /// Flow slug as configured under [flows]
        slug: String,
        /// Contract inputs as an inline JSON object
        #[arg(short = 'i', long = "inputs")]
        inputs: Option<String>,
    },
    /// List human tasks
    Tasks {
        /// Task state filter (default: ready)
        #[arg(long, default_value = "ready")]
        state: String,
        /// Only tasks assigned to this user id
        #[arg(long)]
        user: Option<String>,
        /// Only tasks belonging to this process id
        #[arg(long)]
        process: Option<String>,
        /// Page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Page size
        #[arg(long, default_value_t = 10)]
        count: u32,
    },
    /// Show a case, optionally with its variables
    Case {
        /// Case id
        id: String,
        /// Also fetch the case variables
        #[arg(long)]
        variables: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
}
