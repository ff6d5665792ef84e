// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Single-user TRY ledger with monthly balance propagation, installment
//! debts, recurring payment projection and multi-currency savings.
//!
//! The engine module holds the three idempotent recomputation passes that
//! every mutating command runs through; commands are thin wrappers that
//! parse arguments, touch rows and delegate to the engine.

pub mod cli;
pub mod commands;
pub mod db;
pub mod engine;
pub mod models;
pub mod rates;
pub mod utils;
