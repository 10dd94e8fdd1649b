// Copyright 2025 dentsusoken
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use treelock::commands::check::CheckCommand;
use treelock::commands::clear::ClearCommand;
use treelock::commands::list::ListCommand;
use treelock::commands::sweep::SweepCommand;
use treelock::config::TreeLockConfig;
use treelock::error::{Result, TreeLockError, get_exit_code};
use treelock::logging;

#[derive(Parser)]
#[command(name = "treelock")]
#[command(author, version, about = "Hierarchical path-lock manager", long_about = None)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Lock store root (defaults to $TREELOCK_HOME, then ~/.treelock)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active lock records
    #[command(visible_alias = "ls")]
    List,

    /// Verify paths are free of conflicting locks, without acquiring
    Check {
        /// Paths to check (e.g., "/docs", "/docs/report")
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<String>,
    },

    /// Release lock records by id
    ///
    /// Intended for stuck locks left behind by a crashed process. Verify the
    /// owner shown by `treelock list` is gone before clearing.
    Clear {
        /// Ids of the records to release
        #[arg(required = true, value_name = "ID")]
        ids: Vec<u64>,
    },

    /// Remove lock records older than the stale threshold
    Sweep {
        /// Override the configured threshold
        #[arg(long, value_name = "MINUTES")]
        stale_minutes: Option<u32>,
    },
}

fn resolve_root(cli: &Cli) -> Result<PathBuf> {
    if let Some(root) = &cli.root {
        return Ok(root.clone());
    }
    if let Ok(home) = std::env::var("TREELOCK_HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".treelock"))
        .ok_or_else(|| {
            TreeLockError::ConfigError(
                "cannot determine store root; pass --root or set TREELOCK_HOME".to_string(),
            )
        })
}

fn main() {
    let cli = Cli::parse();

    logging::setup_logger(cli.verbose);

    let result: Result<()> = (|| {
        let root = resolve_root(&cli)?;
        let config = TreeLockConfig::load(&root)?;

        match &cli.command {
            Commands::List => {
                let command = ListCommand::new(&root, &config)?;
                command.execute()
            }
            Commands::Check { paths } => {
                let command = CheckCommand::new(&root, &config)?;
                command.execute(paths)
            }
            Commands::Clear { ids } => {
                let command = ClearCommand::new(&root, &config)?;
                command.execute(ids)
            }
            Commands::Sweep { stale_minutes } => {
                let command = SweepCommand::new(&root, &config)?;
                command.execute(*stale_minutes)
            }
        }
    })();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(get_exit_code(&e));
    }
}
