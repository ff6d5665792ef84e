// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The recomputation engine. All three entry points are idempotent and
//! re-entrant: they are invoked after every mutation, sometimes more than
//! once for the same year, and each commits its own atomic batch. "Today"
//! is always an explicit parameter, never the system clock.

pub mod balance;
pub mod debt;
pub mod recurring;

pub use balance::recalculate_balances;
pub use debt::{load_debt, load_debts, refresh_all_debts, update_debt_progress};
pub use recurring::{
    check_recurring_payments, load_recurring_payment, load_recurring_payments,
};
