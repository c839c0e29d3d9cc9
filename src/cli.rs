use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Token-authenticated gateway in front of a local Ollama server
#[derive(Parser)]
#[command(name = "ollama-gateway", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to bind (defaults to GATEWAY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage API tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a new token for a user and API key name
    Create {
        #[arg(long)]
        user: String,
        #[arg(long)]
        api_name: String,
        /// Informational expiry, RFC 3339 (e.g. 2025-12-31T23:59:59Z)
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// List users and their API key names
    List,
    /// Delete the token for a user and API key name
    Revoke {
        #[arg(long)]
        user: String,
        #[arg(long)]
        api_name: String,
    },
    /// Export all token records (without secrets) as CSV
    Export {
        #[arg(short, long, default_value = "tokens.csv")]
        output: PathBuf,
    },
}
