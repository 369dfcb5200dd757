// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;
use std::sync::Arc;

use crate::config::ZkConfig;
use crate::zklogin::{FileSessionStore, LoginFlow, SessionKey, SessionStore};

#[derive(Subcommand, Debug)]
pub enum LoginCommands {
    /// Start a login and print the authorization URL
    Start(StartArgs),

    /// Complete a login from the provider redirect URL or fragment
    Callback(CallbackArgs),

    /// Show the resolved address, if any
    Status,

    /// Clear every stored login value
    Logout,
}

impl LoginCommands {
    pub fn starts_or_completes_login(&self) -> bool {
        matches!(self, LoginCommands::Start(_) | LoginCommands::Callback(_))
    }
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Current ledger epoch
    #[arg(long)]
    pub epoch: u64,
}

#[derive(Args, Debug)]
pub struct CallbackArgs {
    /// Redirect URL (or its fragment) returned by the identity provider
    pub redirect: String,
}

pub async fn execute(command: LoginCommands, config: &ZkConfig, session_file: &Path) -> Result<()> {
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(session_file));

    match command {
        LoginCommands::Start(args) => {
            config.oauth.validate().map_err(anyhow::Error::msg)?;
            let mut flow = LoginFlow::from_config(store, config)?;
            let request = flow.begin(args.epoch).await?;
            println!("{}", request.url);
        }
        LoginCommands::Callback(args) => {
            let mut flow = LoginFlow::from_config(store, config)?;
            flow.resume().await?;
            let binding = flow.handle_callback(&args.redirect).await?;
            println!("{}", binding.account_address);
        }
        LoginCommands::Status => match store.get(SessionKey::ResolvedAddress).await? {
            Some(address) => println!("{}", address),
            None => println!("not logged in"),
        },
        LoginCommands::Logout => {
            store.clear().await?;
            println!("logged out");
        }
    }
    Ok(())
}
