//! CLI type definitions
//!
//! Clap command structures defining the `prodmind` command-line interface.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "prodmind")]
#[command(about = "ProdMind - adversarial debate engine for product ideas", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize ProdMind configuration and database
    Init {
        /// Force reinitialization even if already initialized
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration (API key masked)
    Config,

    /// Session management commands
    #[command(subcommand)]
    Session(SessionCommands),

    /// Debate flow commands
    #[command(subcommand)]
    Debate(DebateCommands),
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Create a new debate session for a product idea
    New {
        /// The product idea to pressure-test
        idea: String,

        /// Locale for rendered output (zh or en)
        #[arg(short, long, default_value = "zh")]
        locale: String,
    },

    /// List all sessions
    List,

    /// Show one session's transcript
    Show {
        /// Session ID (full UUID or unique prefix)
        id: String,
    },

    /// Export a session transcript
    Export {
        /// Session ID (full UUID or unique prefix)
        id: String,

        /// Output format
        #[arg(short, long, default_value = "markdown", value_parser = ["markdown", "json"])]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Delete a session and its transcript
    Delete {
        /// Session ID (full UUID or unique prefix)
        id: String,
    },
}

#[derive(Subcommand)]
pub enum DebateCommands {
    /// Open the next round (architect presents the problem definition)
    Start {
        /// Session ID (full UUID or unique prefix)
        id: String,
    },

    /// Confirm or correct the architect's problem definition
    Confirm {
        /// Session ID (full UUID or unique prefix)
        id: String,

        /// Your confirmation or correction text
        content: String,
    },

    /// Respond to the attack phase
    Respond {
        /// Session ID (full UUID or unique prefix)
        id: String,

        /// Your response to the challengers
        content: String,
    },

    /// Open the following round after a round completes
    Next {
        /// Session ID (full UUID or unique prefix)
        id: String,
    },

    /// Resolve a pending conflict alert
    Choice {
        /// Session ID (full UUID or unique prefix)
        id: String,

        /// Resolution kind
        #[arg(value_parser = ["accept", "counter", "verify", "force_opposition"])]
        choice: String,

        /// Supporting text (counter-evidence, corrected hypothesis, ...)
        content: Option<String>,
    },

    /// End the session explicitly
    End {
        /// Session ID (full UUID or unique prefix)
        id: String,
    },
}
