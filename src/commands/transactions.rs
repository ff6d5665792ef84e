// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::{check_recurring_payments, recalculate_balances, refresh_all_debts};
use crate::utils::{
    CARRYOVER_TITLE, id_for_category, maybe_print_json, month_year, next_order_index, parse_date,
    parse_decimal, parse_month, pretty_table, target_month_id, today,
};
use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        Some(("reorder", sub)) => reorder(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let title = sub.get_one::<String>("title").unwrap().trim().to_string();
    if title == CARRYOVER_TITLE {
        bail!("'{}' is reserved for the balance recalculator", CARRYOVER_TITLE);
    }
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    if amount <= Decimal::ZERO {
        bail!("Amount must be positive");
    }
    let kind = sub.get_one::<String>("type").unwrap();
    let date = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => now,
    };
    let category_id = match sub.get_one::<String>("category") {
        Some(name) => Some(id_for_category(conn, name)?),
        None => None,
    };
    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;
    let is_recurring = sub.get_flag("recurring");

    let order_index = next_order_index(conn, month_id)?;
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, is_recurring, category_id, order_index)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            month_id,
            title,
            amount.to_string(),
            kind,
            date,
            is_recurring,
            category_id,
            order_index
        ],
    )?;
    let origin_id = conn.last_insert_rowid();

    if is_recurring {
        let day = sub
            .get_one::<u32>("recurring-day")
            .copied()
            .unwrap_or_else(|| now.day().min(28));
        if !(1..=28).contains(&day) {
            bail!("Recurring day must be between 1 and 28");
        }
        let start = sub
            .get_one::<String>("recurring-start")
            .map(|s| parse_month(s))
            .transpose()?;
        let end = sub
            .get_one::<String>("recurring-end")
            .map(|s| parse_month(s))
            .transpose()?;
        conn.execute(
            "INSERT INTO recurring_payments(name, amount, type, day_of_month, is_active, category_id,
                                            start_month, end_month, order_index)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7,
                     (SELECT COALESCE(MAX(order_index), 0) + 1 FROM recurring_payments))",
            params![title, amount.to_string(), kind, day, category_id, start, end],
        )?;
        // The entry that spawned the definition doubles as this month's
        // projection; without the link the projector would add a second copy.
        let payment_id = conn.last_insert_rowid();
        conn.execute(
            "UPDATE transactions SET recurring_payment_id=?1 WHERE id=?2",
            params![payment_id, origin_id],
        )?;
    }

    let year = month_year(conn, month_id, now.year())?;
    if is_recurring {
        check_recurring_payments(conn, year, now)?;
    }
    recalculate_balances(conn, year)?;
    println!("Recorded {} '{}' of {} on {}", kind, title, amount, date);
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub month: String,
    pub title: String,
    pub amount: String,
    pub r#type: String,
    pub date: String,
    pub recurring: bool,
    pub category: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.month.clone(),
                    r.title.clone(),
                    r.amount.clone(),
                    r.r#type.clone(),
                    r.date.clone(),
                    if r.recurring { "*".into() } else { String::new() },
                    r.category.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Month", "Title", "Amount", "Type", "Date", "Rec", "Category"],
                rows,
            )
        );
    }
    Ok(())
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let now = today();
    let mut sql = String::from(
        "SELECT t.id, m.name || ' ' || m.year, t.title, t.amount, t.type, t.date, t.is_recurring, c.name
         FROM transactions t
         JOIN months m ON t.month_id=m.id
         LEFT JOIN categories c ON t.category_id=c.id WHERE 1=1",
    );
    let mut params_vec: Vec<i64> = Vec::new();

    let year = sub.get_one::<i32>("year").copied();
    let month = sub.get_one::<u32>("month").copied();
    if month.is_some() {
        let month_id = target_month_id(conn, year, month, now)?;
        sql.push_str(" AND t.month_id=?");
        params_vec.push(month_id);
    } else if let Some(y) = year {
        sql.push_str(" AND m.year=?");
        params_vec.push(y as i64);
    }
    sql.push_str(" ORDER BY m.year, t.month_id, t.order_index, t.id");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|v| v as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let date: NaiveDate = r.get(5)?;
        let category: Option<String> = r.get(7)?;
        data.push(TransactionRow {
            id: r.get(0)?,
            month: r.get(1)?,
            title: r.get(2)?,
            amount: r.get(3)?,
            r#type: r.get(4)?,
            date: date.to_string(),
            recurring: r.get(6)?,
            category: category.unwrap_or_default(),
        });
    }
    Ok(data)
}

/// Rewrite display order from an explicit id list; ids that no longer
/// exist are skipped.
fn reorder(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let ids: Vec<i64> = sub.get_many::<i64>("ids").unwrap().copied().collect();
    for (index, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE transactions SET order_index=?1 WHERE id=?2",
            params![(index + 1) as i64, id],
        )?;
    }
    println!("Reordered {} transaction(s)", ids.len());
    Ok(())
}

fn edit(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let existing: Option<(i64, String, Option<i64>)> = conn
        .query_row(
            "SELECT month_id, title, debt_id FROM transactions WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let (month_id, old_title, debt_id) =
        existing.with_context(|| format!("Transaction {} not found", id))?;
    if old_title == CARRYOVER_TITLE {
        bail!("'{}' rows are owned by the balance recalculator", CARRYOVER_TITLE);
    }

    if let Some(title) = sub.get_one::<String>("title") {
        if title.trim() == CARRYOVER_TITLE {
            bail!("'{}' is reserved for the balance recalculator", CARRYOVER_TITLE);
        }
        conn.execute(
            "UPDATE transactions SET title=?1 WHERE id=?2",
            params![title.trim(), id],
        )?;
    }
    if let Some(amount) = sub.get_one::<String>("amount") {
        let amount = parse_decimal(amount)?;
        if amount <= Decimal::ZERO {
            bail!("Amount must be positive");
        }
        conn.execute(
            "UPDATE transactions SET amount=?1 WHERE id=?2",
            params![amount.to_string(), id],
        )?;
    }
    if let Some(kind) = sub.get_one::<String>("type") {
        conn.execute(
            "UPDATE transactions SET type=?1 WHERE id=?2",
            params![kind, id],
        )?;
    }
    if let Some(date) = sub.get_one::<String>("date") {
        conn.execute(
            "UPDATE transactions SET date=?1 WHERE id=?2",
            params![parse_date(date)?, id],
        )?;
    }
    if let Some(category) = sub.get_one::<String>("category") {
        let category_id = id_for_category(conn, category)?;
        conn.execute(
            "UPDATE transactions SET category_id=?1 WHERE id=?2",
            params![category_id, id],
        )?;
    }

    if debt_id.is_some() {
        refresh_all_debts(conn, now)?;
    }
    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!("Updated transaction {}", id);
    Ok(())
}

fn delete(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let existing: Option<(i64, String, Option<i64>, Option<i64>)> = conn
        .query_row(
            "SELECT month_id, title, debt_id, recurring_payment_id FROM transactions WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    let (month_id, title, debt_id, recurring_payment_id) =
        existing.with_context(|| format!("Transaction {} not found", id))?;
    if title == CARRYOVER_TITLE {
        bail!("'{}' rows are owned by the balance recalculator", CARRYOVER_TITLE);
    }

    // Deleting a projected row deactivates its definition so the projector
    // does not immediately re-add it.
    if let Some(payment_id) = recurring_payment_id {
        conn.execute(
            "UPDATE recurring_payments SET is_active=0 WHERE id=?1",
            params![payment_id],
        )?;
    }
    conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;

    if debt_id.is_some() {
        refresh_all_debts(conn, now)?;
    }
    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!("Deleted transaction {}", id);
    Ok(())
}
