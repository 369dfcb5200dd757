// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod submitter;
pub mod types;

pub use submitter::{
    DryRunLedger, LedgerClient, SubmissionError, VerificationSubmitter, VerifierTarget,
};
pub use types::{LedgerError, MoveArg, TransactionReceipt, VerifierCall};
