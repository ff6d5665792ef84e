// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::{
    check_recurring_payments, load_recurring_payment, load_recurring_payments,
    recalculate_balances, refresh_all_debts,
};
use crate::utils::{
    id_for_category, maybe_print_json, month_slot, next_order_index, parse_decimal, parse_month,
    pretty_table, target_month_id, today,
};
use anyhow::{Context, Result, bail};
use chrono::Datelike;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("toggle", sub)) => toggle(conn, sub)?,
        Some(("reorder", sub)) => reorder(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        Some(("apply", sub)) => apply(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    if amount <= Decimal::ZERO {
        bail!("Amount must be positive");
    }
    let kind = sub.get_one::<String>("type").unwrap();
    let day = *sub.get_one::<u32>("day").unwrap();
    if !(1..=28).contains(&day) {
        bail!("Day of month must be between 1 and 28");
    }
    let category_id = match sub.get_one::<String>("category") {
        Some(c) => Some(id_for_category(conn, c)?),
        None => None,
    };
    let debt_id = sub.get_one::<i64>("debt").copied();
    // Unset window defaults to the current year, January through December.
    let start = match sub.get_one::<String>("start") {
        Some(s) => parse_month(s)?,
        None => format!("{}-01", now.year()),
    };
    let end = match sub.get_one::<String>("end") {
        Some(s) => parse_month(s)?,
        None => format!("{}-12", now.year()),
    };
    let unit_currency = sub.get_one::<String>("unit-currency").map(|s| s.to_uppercase());
    let unit_grams = sub
        .get_one::<String>("unit-grams")
        .map(|s| parse_decimal(s))
        .transpose()?;

    if let Some(id) = sub.get_one::<i64>("id").copied() {
        load_recurring_payment(conn, id)?
            .with_context(|| format!("Recurring payment {} not found", id))?;
        conn.execute(
            "UPDATE recurring_payments SET name=?1, amount=?2, type=?3, day_of_month=?4,
                    category_id=?5, debt_id=?6, unit_currency=?7, unit_grams=?8,
                    start_month=?9, end_month=?10
             WHERE id=?11",
            params![
                name,
                amount.to_string(),
                kind,
                day,
                category_id,
                debt_id,
                unit_currency,
                unit_grams.map(|d| d.to_string()),
                start,
                end,
                id
            ],
        )?;
        // Stale projections from the old definition are removed; the
        // projector below re-adds current ones.
        conn.execute(
            "DELETE FROM transactions WHERE recurring_payment_id=?1",
            params![id],
        )?;
        println!("Updated recurring payment '{}'", name);
    } else {
        conn.execute(
            "INSERT INTO recurring_payments(name, amount, type, day_of_month, is_active, category_id,
                                            debt_id, unit_currency, unit_grams, start_month, end_month,
                                            order_index)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8, ?9, ?10,
                     (SELECT COALESCE(MAX(order_index), 0) + 1 FROM recurring_payments))",
            params![
                name,
                amount.to_string(),
                kind,
                day,
                category_id,
                debt_id,
                unit_currency,
                unit_grams.map(|d| d.to_string()),
                start,
                end
            ],
        )?;
        println!("Added recurring payment '{}'", name);
    }

    let added = check_recurring_payments(conn, now.year(), now)?;
    recalculate_balances(conn, now.year())?;
    if added > 0 {
        println!("Projected {} transaction(s)", added);
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let payments = load_recurring_payments(conn, false)?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if !maybe_print_json(json_flag, jsonl_flag, &payments)? {
        let rows: Vec<Vec<String>> = payments
            .iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.name.clone(),
                    format!("{:.2}", p.amount),
                    p.r#type.clone(),
                    p.day_of_month.to_string(),
                    format!(
                        "{} .. {}",
                        p.start_month.as_deref().unwrap_or("-"),
                        p.end_month.as_deref().unwrap_or("-")
                    ),
                    if p.is_active { "yes".into() } else { "no".into() },
                    p.debt_id.map(|d| d.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Name", "Amount", "Type", "Day", "Window", "Active", "Debt"],
                rows,
            )
        );
    }
    Ok(())
}

fn toggle(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let payment = load_recurring_payment(conn, id)?
        .with_context(|| format!("Recurring payment {} not found", id))?;
    let new_state = !payment.is_active;
    conn.execute(
        "UPDATE recurring_payments SET is_active=?1 WHERE id=?2",
        params![new_state, id],
    )?;
    if new_state {
        check_recurring_payments(conn, now.year(), now)?;
        recalculate_balances(conn, now.year())?;
    }
    println!(
        "Recurring payment '{}' is now {}",
        payment.name,
        if new_state { "active" } else { "inactive" }
    );
    Ok(())
}

/// Rewrite display order from an explicit id list; ids that no longer
/// exist are skipped.
fn reorder(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let ids: Vec<i64> = sub.get_many::<i64>("ids").unwrap().copied().collect();
    for (index, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE recurring_payments SET order_index=?1 WHERE id=?2",
            params![(index + 1) as i64, id],
        )?;
    }
    println!("Reordered {} definition(s)", ids.len());
    Ok(())
}

fn delete(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let payment = load_recurring_payment(conn, id)?
        .with_context(|| format!("Recurring payment {} not found", id))?;

    conn.execute(
        "DELETE FROM transactions WHERE recurring_payment_id=?1",
        params![id],
    )?;
    if let Some(debt_id) = payment.debt_id {
        conn.execute(
            "DELETE FROM transactions WHERE debt_id=?1 AND is_recurring=1",
            params![debt_id],
        )?;
    }
    conn.execute("DELETE FROM recurring_payments WHERE id=?1", params![id])?;

    // Compact display ordering after the removal.
    let remaining = load_recurring_payments(conn, false)?;
    for (index, p) in remaining.iter().enumerate() {
        conn.execute(
            "UPDATE recurring_payments SET order_index=?1 WHERE id=?2",
            params![(index + 1) as i64, p.id],
        )?;
    }

    if payment.debt_id.is_some() {
        refresh_all_debts(conn, now)?;
    }
    recalculate_balances(conn, now.year())?;
    println!("Deleted recurring payment '{}'", payment.name);
    Ok(())
}

/// Book a definition into a month right now, outside the normal projection
/// cycle, and stamp `last_applied_month`.
fn apply(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let payment = load_recurring_payment(conn, id)?
        .with_context(|| format!("Recurring payment {} not found", id))?;
    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;

    let order_index = next_order_index(conn, month_id)?;
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, is_recurring, category_id,
                                  order_index)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
        params![
            month_id,
            payment.name,
            payment.amount.to_string(),
            payment.r#type,
            now,
            payment.category_id,
            order_index
        ],
    )?;

    if let Some((year, number)) = month_slot(conn, month_id)? {
        conn.execute(
            "UPDATE recurring_payments SET last_applied_month=?1 WHERE id=?2",
            params![format!("{}-{:02}", year, number), id],
        )?;
        recalculate_balances(conn, year)?;
    }
    println!("Applied '{}' ({})", payment.name, payment.amount);
    Ok(())
}
