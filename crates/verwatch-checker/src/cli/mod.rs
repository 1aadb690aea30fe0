/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Verwatch version checker
///
/// Compares the running version of every tracked service with the newest
/// upstream release and records the outcome in the record store.
pub struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Record store file; overrides `store.path` from the configuration
    #[arg(long, global = true)]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Check every enabled application
    CheckAll {
        /// Concurrent checks; defaults to `checker.workers`
        #[arg(long, short)]
        workers: Option<usize>,
    },

    /// Check every instance of one application
    Check {
        /// Application name as recorded in the store
        #[arg(long)]
        app: String,
    },

    /// Show status counts and the applications needing updates
    Summary,

    /// List all enabled applications
    List,

    /// Show only applications with an update available
    Updates,

    /// Interactive menu
    Menu,

    /// Rebuild the hypervisor/Ceph compatibility file from the vendor roadmap
    RefreshCephMatrix,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
