// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod categories;
pub mod debts;
pub mod months;
pub mod rates;
pub mod recurring;
pub mod savings;
pub mod transactions;
