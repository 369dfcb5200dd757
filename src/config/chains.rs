// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ledger network presets for the on-chain verifier

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default gas budget for verifier calls, in MIST
pub const DEFAULT_GAS_BUDGET: u64 = 10_000_000;

/// Move module exposing the verifier entry points
pub const VERIFIER_MODULE: &str = "platform_zk";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiNetwork {
    Devnet,
    Testnet,
    Mainnet,
    Localnet,
}

impl SuiNetwork {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Devnet => "devnet",
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
            Self::Localnet => "localnet",
        }
    }
}

impl fmt::Display for SuiNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuiNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            "localnet" | "local" => Ok(Self::Localnet),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

/// Where the verifier package lives and how calls to it are funded
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub network: SuiNetwork,
    pub rpc_url: String,
    /// Published package id of the platform contracts
    pub package_id: String,
    /// Shared object holding the verifying keys
    pub verifier_object_id: String,
    pub gas_budget: u64,
}

impl LedgerConfig {
    fn preset(network: SuiNetwork, default_rpc: &str) -> Self {
        LedgerConfig {
            network,
            rpc_url: std::env::var("SUI_RPC_URL").unwrap_or_else(|_| default_rpc.to_string()),
            package_id: std::env::var("SUI_PACKAGE_ID").unwrap_or_else(|_| "0x0".to_string()),
            verifier_object_id: std::env::var("SUI_ZK_VERIFIER_ID")
                .unwrap_or_else(|_| "0x0".to_string()),
            gas_budget: std::env::var("SUI_GAS_BUDGET")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_GAS_BUDGET),
        }
    }

    pub fn devnet() -> Self {
        Self::preset(SuiNetwork::Devnet, "https://fullnode.devnet.sui.io:443")
    }

    pub fn testnet() -> Self {
        Self::preset(SuiNetwork::Testnet, "https://fullnode.testnet.sui.io:443")
    }

    pub fn mainnet() -> Self {
        Self::preset(SuiNetwork::Mainnet, "https://fullnode.mainnet.sui.io:443")
    }

    pub fn localnet() -> Self {
        Self::preset(SuiNetwork::Localnet, "http://127.0.0.1:9000")
    }

    /// Build a config with explicit ids, bypassing the environment
    pub fn new(
        network: SuiNetwork,
        rpc_url: impl Into<String>,
        package_id: impl Into<String>,
        verifier_object_id: impl Into<String>,
    ) -> Self {
        LedgerConfig {
            network,
            rpc_url: rpc_url.into(),
            package_id: package_id.into(),
            verifier_object_id: verifier_object_id.into(),
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    /// Fully qualified Move call target, e.g. `0xabc::platform_zk::verify_researcher_with_zk`
    pub fn target(&self, function: &str) -> String {
        format!("{}::{}::{}", self.package_id, VERIFIER_MODULE, function)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !is_object_id(&self.package_id) {
            return Err(format!("invalid package id: {}", self.package_id));
        }
        if !is_object_id(&self.verifier_object_id) {
            return Err(format!(
                "invalid verifier object id: {}",
                self.verifier_object_id
            ));
        }
        if self.gas_budget == 0 {
            return Err("gas_budget must be > 0".to_string());
        }
        Ok(())
    }
}

/// `0x` followed by 1 to 64 hex digits
pub fn is_object_id(id: &str) -> bool {
    match id.strip_prefix("0x") {
        Some(hex) => !hex.is_empty() && hex.len() <= 64 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub struct NetworkRegistry {
    networks: HashMap<SuiNetwork, LedgerConfig>,
    default_network: SuiNetwork,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        let mut networks = HashMap::new();
        networks.insert(SuiNetwork::Devnet, LedgerConfig::devnet());
        networks.insert(SuiNetwork::Testnet, LedgerConfig::testnet());
        networks.insert(SuiNetwork::Mainnet, LedgerConfig::mainnet());
        networks.insert(SuiNetwork::Localnet, LedgerConfig::localnet());

        NetworkRegistry {
            networks,
            default_network: SuiNetwork::Testnet,
        }
    }

    pub fn get(&self, network: SuiNetwork) -> Option<&LedgerConfig> {
        self.networks.get(&network)
    }

    pub fn default_network(&self) -> SuiNetwork {
        self.default_network
    }

    pub fn default_config(&self) -> Option<&LedgerConfig> {
        self.get(self.default_network)
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
