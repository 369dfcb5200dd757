// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod login;
pub mod zk;

use crate::config::{BuildMode, ZkConfig};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SuiPeer ZK CLI
#[derive(Parser, Debug)]
#[command(name = "suipeer-zk")]
#[command(version)]
#[command(about = "Credential commitments, Groth16 proofs and zkLogin for SuiPeer", long_about = None)]
pub struct Cli {
    /// Development build: allows placeholder anonymous-review proofs
    #[arg(long, global = true)]
    pub dev: bool,

    /// File holding the in-flight login session between invocations
    #[arg(long, global = true, env = "ZK_SESSION_FILE", default_value = ".suipeer-session.json")]
    pub session_file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn build_mode(&self) -> BuildMode {
        if self.dev {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }

    /// Environment configuration with the build mode from the command line
    pub fn config(&self) -> ZkConfig {
        ZkConfig::from_env().with_build_mode(self.build_mode())
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute a credential commitment
    Hash(zk::HashArgs),

    /// Generate Groth16 keys and write circuit artifacts
    Setup(zk::SetupArgs),

    /// Generate a proof from a circuit inputs JSON file
    Prove(zk::ProveArgs),

    /// Encode a proof bundle into verifier bytes
    Encode(zk::EncodeArgs),

    /// Verify a proof bundle against a verifying key
    Verify(zk::VerifyArgs),

    /// Print the verifier call for a proof bundle without sending it
    Submit(zk::SubmitArgs),

    /// zkLogin session commands
    #[command(subcommand)]
    Login(login::LoginCommands),
}

impl Commands {
    /// Commands that read the salt, timeout or epoch settings
    pub fn uses_runtime_config(&self) -> bool {
        match self {
            Commands::Prove(_) | Commands::Submit(_) => true,
            Commands::Login(command) => command.starts_or_completes_login(),
            Commands::Hash(_) | Commands::Setup(_) | Commands::Encode(_) | Commands::Verify(_) => {
                false
            }
        }
    }
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.config();
    if cli.command.uses_runtime_config() {
        config.validate().map_err(anyhow::Error::msg)?;
    }
    match cli.command {
        Commands::Hash(args) => zk::hash(args).await,
        Commands::Setup(args) => zk::setup(args).await,
        Commands::Prove(args) => zk::prove(args, &config).await,
        Commands::Encode(args) => zk::encode(args).await,
        Commands::Verify(args) => zk::verify(args).await,
        Commands::Submit(args) => zk::submit(args, &config).await,
        Commands::Login(command) => login::execute(command, &config, &cli.session_file).await,
    }
}
