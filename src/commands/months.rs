// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::{check_recurring_payments, recalculate_balances};
use crate::utils::{
    EXPENSE, INCOME, decimal_col, ensure_year_months, fix_month_names, fmt_try, maybe_print_json,
    month_slot, pretty_table, target_month_id, today,
};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("view", sub)) => view(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Create the canonical twelve months of a year and settle their balances.
pub fn init(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let year = m.get_one::<i32>("year").copied().unwrap_or_else(|| now.year());
    let created = ensure_year_months(conn, year)?;
    fix_month_names(conn, year)?;
    recalculate_balances(conn, year)?;
    if created > 0 {
        println!("Created {} month(s) for {}", created, year);
    } else {
        println!("Months for {} already exist", year);
    }
    Ok(())
}

#[derive(Serialize)]
struct MonthView {
    name: String,
    year: i32,
    opening_balance: String,
    closing_balance: String,
    total_income: String,
    total_expense: String,
    transactions: Vec<ViewRow>,
}

#[derive(Serialize)]
struct ViewRow {
    id: i64,
    title: String,
    amount: String,
    r#type: String,
    date: String,
    recurring: bool,
    category: String,
}

fn view(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;

    // Viewing a month settles it first: project pending recurring rows,
    // then recompute the year's balance chain.
    if let Some((year, _)) = month_slot(conn, month_id)? {
        check_recurring_payments(conn, year, now)?;
        recalculate_balances(conn, year)?;
    }

    let (name, year, opening, closing): (String, i32, Decimal, Decimal) = conn.query_row(
        "SELECT name, year, opening_balance, closing_balance FROM months WHERE id=?1",
        params![month_id],
        |r| {
            Ok((
                r.get(0)?,
                r.get(1)?,
                decimal_col(r.get(2)?),
                decimal_col(r.get(3)?),
            ))
        },
    )?;

    let mut transactions = Vec::new();
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    {
        let mut stmt = conn.prepare(
            "SELECT t.id, t.title, t.amount, t.type, t.date, t.is_recurring, c.name
             FROM transactions t LEFT JOIN categories c ON t.category_id=c.id
             WHERE t.month_id=?1
             ORDER BY t.order_index, t.id",
        )?;
        let mut rows = stmt.query(params![month_id])?;
        while let Some(r) = rows.next()? {
            let amount = decimal_col(r.get(2)?);
            let kind: String = r.get(3)?;
            if kind == INCOME {
                total_income += amount;
            } else if kind == EXPENSE {
                total_expense += amount;
            }
            let date: NaiveDate = r.get(4)?;
            let category: Option<String> = r.get(6)?;
            transactions.push(ViewRow {
                id: r.get(0)?,
                title: r.get(1)?,
                amount: fmt_try(&amount),
                r#type: kind,
                date: date.to_string(),
                recurring: r.get(5)?,
                category: category.unwrap_or_default(),
            });
        }
    }

    let view = MonthView {
        name: name.clone(),
        year,
        opening_balance: fmt_try(&opening),
        closing_balance: fmt_try(&closing),
        total_income: fmt_try(&total_income),
        total_expense: fmt_try(&total_expense),
        transactions,
    };

    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if !maybe_print_json(json_flag, jsonl_flag, &view)? {
        println!("{} {}", view.name, view.year);
        println!("Opening: {}   Closing: {}", view.opening_balance, view.closing_balance);
        println!(
            "Income:  {}   Expense: {}",
            view.total_income, view.total_expense
        );
        let rows: Vec<Vec<String>> = view
            .transactions
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.title.clone(),
                    t.amount.clone(),
                    t.r#type.clone(),
                    t.date.clone(),
                    if t.recurring { "*".into() } else { String::new() },
                    t.category.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Id", "Title", "Amount", "Type", "Date", "Rec", "Category"], rows)
        );
    }
    Ok(())
}
