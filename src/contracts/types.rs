// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Argument of a Move call, in the order the entry function declares it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MoveArg {
    U64(u64),
    Bool(bool),
    /// UTF-8 `std::string::String`
    String(String),
    Bytes(Vec<u8>),
    /// Shared or owned object reference
    Object(String),
}

/// A fully assembled call into the verifier package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierCall {
    /// `package::module::function`
    pub target: String,
    pub arguments: Vec<MoveArg>,
    pub gas_budget: u64,
}

impl VerifierCall {
    pub fn function(&self) -> &str {
        self.target.rsplit("::").next().unwrap_or(&self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub digest: String,
    /// Execution status reported by the ledger
    pub success: bool,
    pub gas_used: Option<u64>,
    /// Abort message when `success` is false
    pub error: Option<String>,
}

/// Failure reported by the ledger collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Unexpected ledger response: {0}")]
    InvalidResponse(String),
}
