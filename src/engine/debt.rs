// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Debt progress: `remaining_amount` and `installments_paid` are derived
//! state, recomputed from the full history of linked expense transactions
//! rather than trusted as cumulative mutations. Future-dated rows never
//! count as paid.

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::models::Debt;
use crate::utils::{EXPENSE, decimal_col, opt_decimal_col};

pub fn load_debt(conn: &Connection, debt_id: i64) -> Result<Option<Debt>> {
    let debt = conn
        .query_row(
            "SELECT id, name, total_amount, remaining_amount, is_credit, installment_amount,
                    total_installments, installments_paid, due_day, currency, gold_type, created_at
             FROM debts WHERE id=?1",
            params![debt_id],
            debt_from_row,
        )
        .optional()?;
    Ok(debt)
}

pub fn load_debts(conn: &Connection) -> Result<Vec<Debt>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, total_amount, remaining_amount, is_credit, installment_amount,
                total_installments, installments_paid, due_day, currency, gold_type, created_at
         FROM debts ORDER BY id",
    )?;
    let rows = stmt.query_map([], debt_from_row)?;
    Ok(rows.collect::<std::result::Result<Vec<Debt>, _>>()?)
}

fn debt_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Debt> {
    Ok(Debt {
        id: r.get(0)?,
        name: r.get(1)?,
        total_amount: decimal_col(r.get(2)?),
        remaining_amount: decimal_col(r.get(3)?),
        is_credit: r.get(4)?,
        installment_amount: decimal_col(r.get(5)?),
        total_installments: r.get(6)?,
        installments_paid: r.get(7)?,
        due_day: r.get::<_, i64>(8)? as u32,
        currency: r.get(9)?,
        gold_type: r.get(10)?,
        created_at: r.get(11)?,
        paid_amount_calculated: Decimal::ZERO,
        payments_this_month: 0,
    })
}

/// Recompute one debt's paid amount and installment counter from its linked
/// expense transactions dated on or before `today`, write the derived pair
/// back, and return `(paid_amount, installments_paid)`.
///
/// Contributions are converted into the debt's native unit: gold debts use
/// the booked grams (or TRY value divided by the booked gold price), TRY
/// debts take the amount as-is, and other currencies divide by the booked
/// purchase rate, falling back 1:1 when no usable rate was recorded.
pub fn update_debt_progress(
    conn: &Connection,
    debt: &mut Debt,
    today: NaiveDate,
) -> Result<(Decimal, i64)> {
    let mut paid_amount_unit = Decimal::ZERO;
    let mut payments_this_month: i64 = 0;
    let mut payments_total_count: i64 = 0;
    let mut first_payment_date: Option<NaiveDate> = None;

    let mut stmt = conn.prepare_cached(
        "SELECT amount, date, purchase_rate, gold_grams, gold_tl_value
         FROM transactions WHERE debt_id=?1 AND type=?2 ORDER BY date ASC, id ASC",
    )?;
    let mut rows = stmt.query(params![debt.id, EXPENSE])?;
    while let Some(r) = rows.next()? {
        let amount = decimal_col(r.get(0)?);
        let date: NaiveDate = r.get(1)?;
        let purchase_rate = opt_decimal_col(r.get(2)?);
        let gold_grams = opt_decimal_col(r.get(3)?);
        let gold_tl_value = opt_decimal_col(r.get(4)?);

        if date > today {
            continue;
        }
        payments_total_count += 1;
        if date.year() == today.year() && date.month() == today.month() {
            payments_this_month += 1;
        }
        if first_payment_date.is_none() {
            first_payment_date = Some(date);
        }

        match debt.currency.as_str() {
            "GAU" => {
                if let Some(grams) = gold_grams.filter(|g| *g > Decimal::ZERO) {
                    paid_amount_unit += grams;
                } else if let Some(tl_value) = gold_tl_value.filter(|v| *v > Decimal::ZERO) {
                    paid_amount_unit += amount / tl_value;
                }
                // No grams and no usable gold price: contributes nothing.
            }
            "TRY" => paid_amount_unit += amount,
            _ => {
                if let Some(rate) = purchase_rate.filter(|p| *p > Decimal::ZERO) {
                    paid_amount_unit += amount / rate;
                } else {
                    paid_amount_unit += amount;
                }
            }
        }
    }
    drop(rows);

    let remaining = (debt.total_amount - paid_amount_unit).max(Decimal::ZERO);
    let paid_amount = (debt.total_amount - remaining).max(Decimal::ZERO);
    debt.remaining_amount = remaining;

    let mut installments_paid: i64 = 0;
    if debt.is_credit && debt.total_installments > 0 && debt.total_amount > Decimal::ZERO {
        let start = first_payment_date.unwrap_or(debt.created_at);
        let months_elapsed = (((today.year() - start.year()) * 12 + today.month() as i32
            - start.month() as i32)
            + 1)
        .max(0) as i64;

        let by_payment = if debt.currency == "TRY" && debt.installment_amount > Decimal::ZERO {
            (paid_amount / debt.installment_amount)
                .floor()
                .to_i64()
                .unwrap_or(0)
        } else {
            let ratio = paid_amount / debt.total_amount;
            (ratio * Decimal::from(debt.total_installments))
                .floor()
                .to_i64()
                .unwrap_or(0)
        };

        // Conservative tie-break: the counter may not run ahead of elapsed
        // calendar time, the amount actually paid, or the number of payment
        // records, whichever is most restrictive.
        installments_paid = debt
            .total_installments
            .min(months_elapsed + (payments_this_month - 1).max(0))
            .min(by_payment)
            .min(payments_total_count);
    }
    debt.installments_paid = installments_paid.max(0);
    debt.paid_amount_calculated = paid_amount;
    debt.payments_this_month = payments_this_month;

    conn.execute(
        "UPDATE debts SET remaining_amount=?1, installments_paid=?2 WHERE id=?3",
        params![
            debt.remaining_amount.to_string(),
            debt.installments_paid,
            debt.id
        ],
    )?;
    Ok((paid_amount, debt.installments_paid))
}

/// Recompute every debt in one atomic batch.
pub fn refresh_all_debts(conn: &mut Connection, today: NaiveDate) -> Result<()> {
    let tx = conn.transaction()?;
    let mut debts = load_debts(&tx)?;
    for debt in &mut debts {
        update_debt_progress(&tx, debt, today)?;
    }
    tx.commit()?;
    Ok(())
}
