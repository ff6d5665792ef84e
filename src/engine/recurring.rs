// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recurring payment projection: materialize every active definition into
//! at most one transaction per eligible month of a year. Projected rows
//! carry `recurring_payment_id` back to their definition, so repeated runs
//! insert nothing new, and debt-linked projections in months beyond `today`
//! are retracted instead of counting as paid.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::engine::debt::{load_debt, update_debt_progress};
use crate::models::RecurringPayment;
use crate::utils::{
    DEBT_PAYMENT_PREFIX, EXPENSE, decimal_col, last_day_of_month, month_ids_for_year,
    opt_decimal_col,
};

pub fn load_recurring_payments(conn: &Connection, only_active: bool) -> Result<Vec<RecurringPayment>> {
    let sql = if only_active {
        "SELECT id, name, amount, type, day_of_month, is_active, last_applied_month, category_id,
                debt_id, unit_currency, unit_grams, start_month, end_month, order_index
         FROM recurring_payments WHERE is_active=1 ORDER BY order_index ASC, id ASC"
    } else {
        "SELECT id, name, amount, type, day_of_month, is_active, last_applied_month, category_id,
                debt_id, unit_currency, unit_grams, start_month, end_month, order_index
         FROM recurring_payments ORDER BY order_index ASC, id ASC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], payment_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<RecurringPayment>, _>>()?)
}

pub fn load_recurring_payment(conn: &Connection, id: i64) -> Result<Option<RecurringPayment>> {
    let payment = conn
        .query_row(
            "SELECT id, name, amount, type, day_of_month, is_active, last_applied_month, category_id,
                    debt_id, unit_currency, unit_grams, start_month, end_month, order_index
             FROM recurring_payments WHERE id=?1",
            params![id],
            payment_from_row,
        )
        .optional()?;
    Ok(payment)
}

fn payment_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<RecurringPayment> {
    Ok(RecurringPayment {
        id: r.get(0)?,
        name: r.get(1)?,
        amount: decimal_col(r.get(2)?),
        r#type: r.get(3)?,
        day_of_month: r.get::<_, i64>(4)? as u32,
        is_active: r.get(5)?,
        last_applied_month: r.get(6)?,
        category_id: r.get(7)?,
        debt_id: r.get(8)?,
        unit_currency: r.get(9)?,
        unit_grams: opt_decimal_col(r.get(10)?),
        start_month: r.get(11)?,
        end_month: r.get(12)?,
        order_index: r.get(13)?,
    })
}

/// A `YYYY-MM` window bound; malformed strings are treated as unconstrained
/// rather than failing the projection pass.
fn parse_month_bound(s: &str) -> Option<(i32, u32)> {
    let (y, m) = s.split_once('-')?;
    let year = y.trim().parse::<i32>().ok()?;
    let month = m.trim().parse::<u32>().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

/// Project all active recurring payments onto the months of `year`.
/// Idempotent; returns the number of transactions added. One atomic commit
/// per invocation.
pub fn check_recurring_payments(conn: &mut Connection, year: i32, today: NaiveDate) -> Result<usize> {
    let tx = conn.transaction()?;
    let months = month_ids_for_year(&tx, year)?;
    let payments = load_recurring_payments(&tx, true)?;
    let mut added = 0usize;

    for (index, month_id) in months.iter().enumerate() {
        let month_number = (index % 12) as u32 + 1;

        for payment in &payments {
            // Window check; an unset start defaults to the current month.
            let start_bound = match payment.start_month.as_deref() {
                Some(s) => parse_month_bound(s),
                None => Some((today.year(), today.month())),
            };
            if let Some(start) = start_bound {
                if (year, month_number) < start {
                    continue;
                }
            }
            if let Some(end) = payment.end_month.as_deref().and_then(parse_month_bound) {
                if (year, month_number) > end {
                    continue;
                }
            }

            // Debt payments must not exist in months beyond today: retract
            // anything a prior run projected there, credit TRY debts back,
            // and skip the slot.
            if let Some(debt_id) = payment.debt_id {
                if (year, month_number) > (today.year(), today.month()) {
                    retract_future_projection(&tx, *month_id, payment.id, debt_id, today)?;
                    continue;
                }
            }

            if projection_exists(&tx, *month_id, payment)? {
                continue;
            }

            let last_day = last_day_of_month(year, month_number)?;
            let target_day = payment.day_of_month.clamp(1, last_day);
            let target_date = NaiveDate::from_ymd_opt(year, month_number, target_day)
                .with_context(|| format!("Invalid projection date {}-{}", year, month_number))?;

            tx.execute(
                "INSERT INTO transactions(month_id, title, amount, type, date, is_recurring,
                                          category_id, debt_id, recurring_payment_id, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8,
                         (SELECT COALESCE(MAX(order_index), 0) + 1 FROM transactions WHERE month_id=?1))",
                params![
                    month_id,
                    payment.name,
                    payment.amount.to_string(),
                    payment.r#type,
                    target_date,
                    payment.category_id,
                    payment.debt_id,
                    payment.id
                ],
            )?;
            added += 1;

            // Optimistic decrement so the debt reads consistently even
            // before the next full refresh; the recompute that follows is
            // authoritative.
            if let Some(debt_id) = payment.debt_id {
                if let Some(mut debt) = load_debt(&tx, debt_id)? {
                    debt.remaining_amount =
                        (debt.remaining_amount - payment.amount).max(Decimal::ZERO);
                    tx.execute(
                        "UPDATE debts SET remaining_amount=?1 WHERE id=?2",
                        params![debt.remaining_amount.to_string(), debt_id],
                    )?;
                    update_debt_progress(&tx, &mut debt, today)?;
                }
                // A dangling debt reference skips the debt steps only.
            }
        }
    }

    tx.commit()?;
    Ok(added)
}

/// Duplicate check. Debt-linked payments are also suppressed by a manual
/// payment already booked for the same debt in the month; everything else
/// matches on the definition's foreign key.
fn projection_exists(conn: &Connection, month_id: i64, payment: &RecurringPayment) -> Result<bool> {
    if let Some(debt_id) = payment.debt_id {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions
                 WHERE month_id=?1 AND debt_id=?2 AND type=?3 AND title LIKE ?4 LIMIT 1",
                params![
                    month_id,
                    debt_id,
                    EXPENSE,
                    format!("{}%", DEBT_PAYMENT_PREFIX)
                ],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(true);
        }
    }
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM transactions WHERE month_id=?1 AND recurring_payment_id=?2 LIMIT 1",
            params![month_id, payment.id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(existing.is_some())
}

fn retract_future_projection(
    conn: &Connection,
    month_id: i64,
    payment_id: i64,
    debt_id: i64,
    today: NaiveDate,
) -> Result<()> {
    let rows: Vec<(i64, Decimal)> = {
        let mut stmt = conn.prepare_cached(
            "SELECT id, amount FROM transactions WHERE month_id=?1 AND recurring_payment_id=?2",
        )?;
        let mapped = stmt.query_map(params![month_id, payment_id], |r| {
            Ok((r.get::<_, i64>(0)?, decimal_col(r.get(1)?)))
        })?;
        mapped.collect::<std::result::Result<Vec<_>, _>>()?
    };
    if rows.is_empty() {
        return Ok(());
    }

    let mut debt = load_debt(conn, debt_id)?;
    for (tx_id, amount) in rows {
        if let Some(d) = debt.as_mut() {
            if d.currency == "TRY" {
                d.remaining_amount += amount;
                conn.execute(
                    "UPDATE debts SET remaining_amount=?1 WHERE id=?2",
                    params![d.remaining_amount.to_string(), d.id],
                )?;
            }
        }
        conn.execute("DELETE FROM transactions WHERE id=?1", params![tx_id])?;
    }
    if let Some(d) = debt.as_mut() {
        update_debt_progress(conn, d, today)?;
    }
    Ok(())
}
