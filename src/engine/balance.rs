// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance recalculation: each month's opening balance is the prior month's
//! closing balance, and a non-zero carryover materializes as the reserved
//! `Devreden Bakiye` row dated the 1st. Safe to run after every mutation;
//! a second run with no intervening change is a no-op.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::utils::{CARRYOVER_TITLE, EXPENSE, INCOME, month_ids_for_year};

/// Walk the year's months in order, rewriting opening/closing balances and
/// the carryover transaction of every month. One atomic commit.
pub fn recalculate_balances(conn: &mut Connection, year: i32) -> Result<()> {
    let tx = conn.transaction()?;
    let months = month_ids_for_year(&tx, year)?;
    let mut previous_closing = Decimal::ZERO;

    for (index, month_id) in months.iter().enumerate() {
        let month_number = (index % 12) as u32 + 1;
        let carryover_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM transactions WHERE month_id=?1 AND title=?2",
                params![month_id, CARRYOVER_TITLE],
                |r| r.get(0),
            )
            .optional()?;

        if !previous_closing.is_zero() {
            let kind = if previous_closing >= Decimal::ZERO {
                INCOME
            } else {
                EXPENSE
            };
            let amount = previous_closing.abs();
            let date = NaiveDate::from_ymd_opt(year, month_number, 1)
                .with_context(|| format!("Invalid carryover date {}-{}", year, month_number))?;
            match carryover_id {
                Some(id) => {
                    tx.execute(
                        "UPDATE transactions SET type=?1, amount=?2, date=?3 WHERE id=?4",
                        params![kind, amount.to_string(), date, id],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO transactions(month_id, title, amount, type, date, is_recurring, order_index)
                         VALUES (?1, ?2, ?3, ?4, ?5, 0, 0)",
                        params![month_id, CARRYOVER_TITLE, amount.to_string(), kind, date],
                    )?;
                }
            }
        } else if let Some(id) = carryover_id {
            // Nothing to carry; the reserved row must not linger.
            tx.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
        }

        let total_income = sum_by_type(&tx, *month_id, INCOME)?;
        let total_expense = sum_by_type(&tx, *month_id, EXPENSE)?;
        let closing = total_income - total_expense;

        tx.execute(
            "UPDATE months SET opening_balance=?1, closing_balance=?2 WHERE id=?3",
            params![previous_closing.to_string(), closing.to_string(), month_id],
        )?;
        previous_closing = closing;
    }

    tx.commit()?;
    Ok(())
}

fn sum_by_type(conn: &Connection, month_id: i64, kind: &str) -> Result<Decimal> {
    let mut stmt =
        conn.prepare_cached("SELECT amount FROM transactions WHERE month_id=?1 AND type=?2")?;
    let mut rows = stmt.query(params![month_id, kind])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        total += crate::utils::decimal_col(r.get(0)?);
    }
    Ok(total)
}
