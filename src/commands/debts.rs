// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::{
    load_debt, load_debts, recalculate_balances, refresh_all_debts, update_debt_progress,
};
use crate::rates::{RateKind, resolve_rates};
use crate::utils::{
    DEBT_PAYMENT_PREFIX, EXPENSE, fmt_try, maybe_print_json, month_year, next_order_index,
    parse_decimal, pretty_table, target_month_id, today,
};
use anyhow::{Context, Result, bail};
use chrono::Datelike;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("pay", sub)) => pay(conn, sub)?,
        Some(("quick-borrow", sub)) => quick_borrow(conn, sub)?,
        Some(("quick-pay", sub)) => quick_pay(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn normalize_currency(raw: &str) -> String {
    let c = raw.trim().to_uppercase();
    // The rate service quotes gold grams as GRA.
    if c == "GRA" { "GAU".to_string() } else { c }
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let currency = normalize_currency(sub.get_one::<String>("currency").unwrap());
    let total = parse_decimal(sub.get_one::<String>("total").unwrap())?;
    if total <= Decimal::ZERO {
        bail!("Total amount must be positive");
    }
    let is_credit = sub.get_flag("credit");
    let total_installments = *sub.get_one::<i64>("installments").unwrap();
    let due_day = *sub.get_one::<u32>("due-day").unwrap();
    if is_credit && !(1..=28).contains(&due_day) {
        bail!("Due day must be between 1 and 28");
    }
    let mut installment_amount = match sub.get_one::<String>("installment-amount") {
        Some(s) => parse_decimal(s)?,
        None => Decimal::ZERO,
    };
    if is_credit && total_installments > 0 && installment_amount <= Decimal::ZERO {
        installment_amount = (total / Decimal::from(total_installments)).round_dp(2);
    }
    let gold_type = if currency == "GAU" {
        Some(
            sub.get_one::<String>("gold-type")
                .cloned()
                .unwrap_or_else(|| "Gram".to_string()),
        )
    } else {
        None
    };

    if let Some(id) = sub.get_one::<i64>("id").copied() {
        let mut debt = load_debt(conn, id)?.with_context(|| format!("Debt {} not found", id))?;
        // A changed principal resets the remaining amount; the recompute
        // below rebuilds it from history.
        let remaining = if debt.total_amount != total {
            total
        } else {
            debt.remaining_amount
        };
        conn.execute(
            "UPDATE debts SET name=?1, currency=?2, gold_type=?3, total_amount=?4,
                              remaining_amount=?5, is_credit=?6, total_installments=?7,
                              installment_amount=?8, due_day=?9
             WHERE id=?10",
            params![
                name,
                currency,
                gold_type,
                total.to_string(),
                remaining.to_string(),
                is_credit,
                if is_credit { total_installments } else { 0 },
                if is_credit { installment_amount.to_string() } else { "0".into() },
                if is_credit { due_day } else { now.day() },
                id
            ],
        )?;
        debt = load_debt(conn, id)?.with_context(|| format!("Debt {} not found", id))?;
        update_debt_progress(conn, &mut debt, now)?;
        println!("Updated debt '{}'", debt.name);
    } else {
        conn.execute(
            "INSERT INTO debts(name, total_amount, remaining_amount, is_credit, installment_amount,
                               total_installments, installments_paid, due_day, currency, gold_type,
                               created_at)
             VALUES (?1, ?2, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9)",
            params![
                name,
                total.to_string(),
                is_credit,
                if is_credit { installment_amount.to_string() } else { "0".into() },
                if is_credit { total_installments } else { 0 },
                if is_credit { due_day } else { now.day() },
                currency,
                gold_type,
                now
            ],
        )?;
        println!("Added debt '{}' of {} {}", name, total, currency);
    }
    Ok(())
}

fn list(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    refresh_all_debts(conn, now)?;
    let debts = load_debts(conn)?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if !maybe_print_json(json_flag, jsonl_flag, &debts)? {
        let rows: Vec<Vec<String>> = debts
            .iter()
            .map(|d| {
                vec![
                    d.id.to_string(),
                    d.name.clone(),
                    d.currency.clone(),
                    format!("{:.2}", d.total_amount),
                    format!("{:.2}", d.remaining_amount),
                    if d.is_credit {
                        format!("{}/{}", d.installments_paid, d.total_installments)
                    } else {
                        String::new()
                    },
                    if d.is_credit {
                        d.due_day.to_string()
                    } else {
                        String::new()
                    },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Name", "CCY", "Total", "Remaining", "Installments", "Due"],
                rows,
            )
        );
    }
    Ok(())
}

fn pay(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let debt = load_debt(conn, id)?.with_context(|| format!("Debt {} not found", id))?;

    let mut amount_unit = match sub.get_one::<String>("amount") {
        Some(s) => parse_decimal(s)?,
        None => Decimal::ZERO,
    };
    if amount_unit <= Decimal::ZERO {
        amount_unit = if debt.is_credit && debt.installment_amount > Decimal::ZERO {
            debt.installment_amount
        } else {
            debt.remaining_amount
        };
    }
    if amount_unit <= Decimal::ZERO {
        bail!("Debt '{}' is already closed", debt.name);
    }

    let tl_arg = sub
        .get_one::<String>("tl-amount")
        .map(|s| parse_decimal(s))
        .transpose()?;
    let rate_arg = sub
        .get_one::<String>("rate")
        .map(|s| parse_decimal(s))
        .transpose()?;
    let gold_tl_arg = sub
        .get_one::<String>("gold-tl")
        .map(|s| parse_decimal(s))
        .transpose()?;

    let mut purchase_rate: Option<Decimal> = None;
    let mut gold_grams: Option<Decimal> = None;
    let mut gold_tl_value: Option<Decimal> = None;
    let mut gold_type: Option<String> = None;

    let tl_amount = match debt.currency.as_str() {
        "TRY" => tl_arg.unwrap_or(amount_unit),
        "GAU" => {
            let unit_tl = match gold_tl_arg {
                Some(v) if v > Decimal::ZERO => v,
                _ => resolve_rates(conn, RateKind::Buying)
                    .get("GAU")
                    .context("No gold rate available")?,
            };
            gold_tl_value = Some(unit_tl);
            gold_type = Some(
                debt.gold_type
                    .clone()
                    .unwrap_or_else(|| "Gram".to_string()),
            );
            match tl_arg {
                Some(tl) => {
                    gold_grams = Some(tl / unit_tl);
                    tl
                }
                None => {
                    gold_grams = Some(amount_unit);
                    (amount_unit * unit_tl).round_dp(2)
                }
            }
        }
        _ => {
            let rate = match rate_arg {
                Some(v) if v > Decimal::ZERO => v,
                _ => resolve_rates(conn, RateKind::Buying)
                    .get(&debt.currency)
                    .with_context(|| format!("No {} rate available", debt.currency))?,
            };
            purchase_rate = Some(rate);
            match tl_arg {
                Some(tl) => tl,
                None => (amount_unit * rate).round_dp(2),
            }
        }
    };

    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;
    let title = format!("{} - {}", DEBT_PAYMENT_PREFIX, debt.name);
    let order_index = next_order_index(conn, month_id)?;
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, is_recurring, debt_id,
                                  order_index, purchase_rate, gold_type, gold_grams, gold_tl_value)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            month_id,
            title,
            tl_amount.to_string(),
            EXPENSE,
            now,
            debt.id,
            order_index,
            purchase_rate.map(|d| d.to_string()),
            gold_type,
            gold_grams.map(|d| d.to_string()),
            gold_tl_value.map(|d| d.to_string()),
        ],
    )?;

    if sub.get_flag("recurring") {
        let day = if (1..=28).contains(&debt.due_day) {
            debt.due_day
        } else {
            now.day().min(28)
        };
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM recurring_payments WHERE debt_id=?1 LIMIT 1",
                params![debt.id],
                |r| r.get(0),
            )
            .optional()?;
        match existing {
            Some(rec_id) => {
                conn.execute(
                    "UPDATE recurring_payments SET amount=?1, day_of_month=?2, is_active=1 WHERE id=?3",
                    params![tl_amount.to_string(), day, rec_id],
                )?;
            }
            None => {
                conn.execute(
                    "INSERT INTO recurring_payments(name, amount, type, day_of_month, is_active, debt_id,
                                                    order_index)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5,
                             (SELECT COALESCE(MAX(order_index), 0) + 1 FROM recurring_payments))",
                    params![title, tl_amount.to_string(), EXPENSE, day, debt.id],
                )?;
            }
        }
    }

    refresh_all_debts(conn, now)?;
    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;

    let debt = load_debt(conn, id)?.with_context(|| format!("Debt {} not found", id))?;
    println!(
        "Paid {} against '{}'; remaining {} {}, installments {}/{}",
        fmt_try(&tl_amount),
        debt.name,
        debt.remaining_amount,
        debt.currency,
        debt.installments_paid,
        debt.total_installments
    );
    Ok(())
}

fn quick_borrow(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let currency = normalize_currency(sub.get_one::<String>("currency").unwrap());
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    if amount <= Decimal::ZERO {
        bail!("Amount must be positive");
    }
    let name = match sub.get_one::<String>("name") {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => {
            if currency == "GAU" {
                "Altın Borcu".to_string()
            } else {
                format!("Döviz Borcu - {}", currency)
            }
        }
    };
    let gold_type: Option<&str> = if currency == "GAU" { Some("Gram") } else { None };

    let existing: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT id, total_amount, remaining_amount FROM debts WHERE name=?1 AND currency=?2",
            params![name, currency],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    match existing {
        Some((id, total_s, remaining_s)) => {
            let total = crate::utils::decimal_col(total_s) + amount;
            let remaining = crate::utils::decimal_col(remaining_s) + amount;
            conn.execute(
                "UPDATE debts SET total_amount=?1, remaining_amount=?2, gold_type=?3 WHERE id=?4",
                params![total.to_string(), remaining.to_string(), gold_type, id],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO debts(name, total_amount, remaining_amount, is_credit, installment_amount,
                                   total_installments, installments_paid, due_day, currency, gold_type,
                                   created_at)
                 VALUES (?1, ?2, ?2, 0, '0', 0, 0, ?3, ?4, ?5, ?6)",
                params![name, amount.to_string(), now.day(), currency, gold_type, now],
            )?;
        }
    }
    refresh_all_debts(conn, now)?;
    println!("Borrowed {} {} as '{}'", amount, currency, name);
    Ok(())
}

fn quick_pay(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let currency = normalize_currency(sub.get_one::<String>("currency").unwrap());
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let rate = parse_decimal(sub.get_one::<String>("rate").unwrap())?;
    if amount <= Decimal::ZERO || rate <= Decimal::ZERO {
        bail!("Amount and rate must be positive");
    }

    // Largest open debt in the currency takes the payment.
    let debt_id: Option<i64> = conn
        .query_row(
            "SELECT id FROM debts WHERE currency=?1
             ORDER BY CAST(remaining_amount AS REAL) DESC LIMIT 1",
            params![currency],
            |r| r.get(0),
        )
        .optional()?;
    let debt_id = debt_id.with_context(|| format!("No {} debt found", currency))?;
    let debt = load_debt(conn, debt_id)?.context("Debt disappeared mid-operation")?;
    if debt.remaining_amount <= Decimal::ZERO {
        bail!("Debt '{}' is already closed", debt.name);
    }

    let pay_units = amount.min(debt.remaining_amount);
    let tl_amount = (pay_units * rate).round_dp(2);
    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;
    let order_index = next_order_index(conn, month_id)?;
    let is_gold = currency == "GAU";
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, is_recurring, debt_id,
                                  order_index, purchase_rate, gold_type, gold_grams, gold_tl_value)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            month_id,
            format!("{} - {}", DEBT_PAYMENT_PREFIX, debt.name),
            tl_amount.to_string(),
            EXPENSE,
            now,
            debt.id,
            order_index,
            if is_gold { None } else { Some(rate.to_string()) },
            if is_gold { debt.gold_type.clone() } else { None },
            if is_gold { Some(pay_units.to_string()) } else { None },
            if is_gold { Some(rate.to_string()) } else { None },
        ],
    )?;

    refresh_all_debts(conn, now)?;
    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!(
        "Paid {} {} ({}) against '{}'",
        pay_units,
        currency,
        fmt_try(&tl_amount),
        debt.name
    );
    Ok(())
}

fn delete(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let name: Option<String> = conn
        .query_row("SELECT name FROM debts WHERE id=?1", params![id], |r| {
            r.get(0)
        })
        .optional()?;
    let name = name.with_context(|| format!("Debt {} not found", id))?;
    // Booked payments keep their debt_id on purpose; orphaned references
    // are ignored by aggregation.
    conn.execute("DELETE FROM debts WHERE id=?1", params![id])?;
    println!("Deleted debt '{}'; its booked payments remain as history", name);
    Ok(())
}
