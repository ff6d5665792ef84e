// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::engine::recalculate_balances;
use crate::models::Saving;
use crate::rates::{RateKind, resolve_rates};
use crate::utils::{
    EXPENSE, INCOME, decimal_col, fmt_try, maybe_print_json, month_year, next_order_index,
    opt_decimal_col, parse_decimal, pretty_table, target_month_id, today,
};
use anyhow::{Context, Result, bail};
use chrono::Datelike;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        Some(("quick-buy", sub)) => quick_buy(conn, sub)?,
        Some(("quick-sell", sub)) => quick_sell(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn label(currency: &str) -> &str {
    match currency {
        "USD" => "Dolar",
        "GAU" => "Altın",
        other => other,
    }
}

fn normalize_currency(raw: &str) -> String {
    let upper = raw.to_uppercase();
    if upper == "GRA" { "GAU".into() } else { upper }
}

/// Book a saving row plus the paired expense that funded it.
fn book_saving(
    conn: &Connection,
    month_id: i64,
    currency: &str,
    tl_amount: Decimal,
    unit_amount: Decimal,
    purchase_rate: Option<Decimal>,
    gold_type: Option<&str>,
    date: chrono::NaiveDate,
) -> Result<()> {
    conn.execute(
        "INSERT INTO savings(month_id, currency, tl_amount, unit_amount, purchase_rate, gold_type, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            month_id,
            currency,
            tl_amount.to_string(),
            unit_amount.to_string(),
            purchase_rate.map(|d| d.to_string()),
            gold_type,
            date
        ],
    )?;
    let order_index = next_order_index(conn, month_id)?;
    let (grams, gold_tl) = if currency == "GAU" {
        (Some(unit_amount.to_string()), Some(tl_amount.to_string()))
    } else {
        (None, None)
    };
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, order_index,
                                  purchase_rate, gold_type, gold_grams, gold_tl_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            month_id,
            format!("Birikim - {}", label(currency)),
            tl_amount.to_string(),
            EXPENSE,
            date,
            order_index,
            purchase_rate.map(|d| d.to_string()),
            gold_type,
            grams,
            gold_tl
        ],
    )?;
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let currency = normalize_currency(sub.get_one::<String>("currency").unwrap());
    let tl_amount = parse_decimal(sub.get_one::<String>("tl").unwrap())?;
    if tl_amount <= Decimal::ZERO {
        bail!("TRY amount must be positive");
    }
    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;

    let (unit_amount, purchase_rate, gold_type) = if currency == "GAU" {
        let grams = sub
            .get_one::<String>("grams")
            .map(|s| parse_decimal(s))
            .transpose()?
            .context("Gold savings need --grams")?;
        if grams <= Decimal::ZERO {
            bail!("Gram amount must be positive");
        }
        let gold_type = sub
            .get_one::<String>("gold-type")
            .map(|s| s.as_str())
            .unwrap_or("Gram")
            .to_string();
        (grams, None, Some(gold_type))
    } else {
        let rate = match sub.get_one::<String>("rate") {
            Some(r) => parse_decimal(r)?,
            None => resolve_rates(conn, RateKind::Selling)
                .get(&currency)
                .with_context(|| format!("No rate available for {}", currency))?,
        };
        if rate <= Decimal::ZERO {
            bail!("Rate must be positive");
        }
        ((tl_amount / rate).round_dp(4), Some(rate), None)
    };

    book_saving(
        conn,
        month_id,
        &currency,
        tl_amount,
        unit_amount,
        purchase_rate,
        gold_type.as_deref(),
        now,
    )?;
    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!(
        "Saved {} {} for {}",
        unit_amount,
        currency,
        fmt_try(&tl_amount)
    );
    Ok(())
}

/// Rewrite a saving in place and swap its paired expense, keeping the
/// replaced row's position in the month.
fn edit(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let old: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT month_id, currency, tl_amount FROM savings WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let (month_id, old_currency, old_tl) =
        old.with_context(|| format!("Saving {} not found", id))?;

    let currency = match sub.get_one::<String>("currency") {
        Some(c) => normalize_currency(c),
        None => old_currency.clone(),
    };
    let tl_amount = parse_decimal(sub.get_one::<String>("tl").unwrap())?;
    if tl_amount <= Decimal::ZERO {
        bail!("TRY amount must be positive");
    }
    let (unit_amount, purchase_rate, gold_type) = if currency == "GAU" {
        let grams = sub
            .get_one::<String>("grams")
            .map(|s| parse_decimal(s))
            .transpose()?
            .context("Gold savings need --grams")?;
        if grams <= Decimal::ZERO {
            bail!("Gram amount must be positive");
        }
        let gold_type = sub
            .get_one::<String>("gold-type")
            .map(|s| s.as_str())
            .unwrap_or("Gram")
            .to_string();
        (grams, None, Some(gold_type))
    } else {
        let rate = sub
            .get_one::<String>("rate")
            .map(|s| parse_decimal(s))
            .transpose()?
            .context("Currency savings need --rate")?;
        if rate <= Decimal::ZERO {
            bail!("Rate must be positive");
        }
        ((tl_amount / rate).round_dp(4), Some(rate), None)
    };

    conn.execute(
        "UPDATE savings SET currency=?1, tl_amount=?2, unit_amount=?3, purchase_rate=?4,
                            gold_type=?5
         WHERE id=?6",
        params![
            currency,
            tl_amount.to_string(),
            unit_amount.to_string(),
            purchase_rate.map(|d| d.to_string()),
            gold_type,
            id
        ],
    )?;

    // Replace the old paired expense; the new one inherits its slot.
    let old_tx: Option<(i64, i64)> = conn
        .query_row(
            "SELECT id, order_index FROM transactions
             WHERE month_id=?1 AND title=?2 AND amount=?3 AND type=?4
             ORDER BY date DESC LIMIT 1",
            params![
                month_id,
                format!("Birikim - {}", label(&old_currency)),
                old_tl,
                EXPENSE
            ],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let order_index = match old_tx {
        Some((tx_id, order)) => {
            conn.execute("DELETE FROM transactions WHERE id=?1", params![tx_id])?;
            order
        }
        None => next_order_index(conn, month_id)?,
    };
    let (grams, gold_tl) = if currency == "GAU" {
        (Some(unit_amount.to_string()), Some(tl_amount.to_string()))
    } else {
        (None, None)
    };
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, order_index,
                                  purchase_rate, gold_type, gold_grams, gold_tl_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            month_id,
            format!("Birikim - {}", label(&currency)),
            tl_amount.to_string(),
            EXPENSE,
            now,
            order_index,
            purchase_rate.map(|d| d.to_string()),
            gold_type,
            grams,
            gold_tl
        ],
    )?;

    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!("Updated saving {}", id);
    Ok(())
}

fn load_savings(conn: &Connection) -> Result<Vec<Saving>> {
    let mut stmt = conn.prepare(
        "SELECT id, month_id, currency, tl_amount, unit_amount, purchase_rate, gold_type, date
         FROM savings ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Saving {
            id: r.get(0)?,
            month_id: r.get(1)?,
            currency: r.get(2)?,
            tl_amount: decimal_col(r.get(3)?),
            unit_amount: decimal_col(r.get(4)?),
            purchase_rate: opt_decimal_col(r.get(5)?),
            gold_type: r.get(6)?,
            date: r.get(7)?,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let savings = load_savings(conn)?;
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if !maybe_print_json(json_flag, jsonl_flag, &savings)? {
        let rows: Vec<Vec<String>> = savings
            .iter()
            .map(|s| {
                vec![
                    s.id.to_string(),
                    s.currency.clone(),
                    s.unit_amount.to_string(),
                    fmt_try(&s.tl_amount),
                    s.purchase_rate.map(|r| r.to_string()).unwrap_or_default(),
                    s.gold_type.clone().unwrap_or_default(),
                    s.date.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Currency", "Units", "TRY", "Rate", "Gold type", "Date"],
                rows,
            )
        );
    }
    Ok(())
}

fn delete(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let id = *sub.get_one::<i64>("id").unwrap();
    let saving: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT month_id, currency, tl_amount FROM savings WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let (month_id, currency, tl_amount) =
        saving.with_context(|| format!("Saving {} not found", id))?;

    // The paired expense is matched by month, title and amount; only one
    // row goes, even when two savings in the month look alike.
    conn.execute(
        "DELETE FROM transactions WHERE id IN (
             SELECT id FROM transactions
             WHERE month_id=?1 AND title=?2 AND amount=?3 AND type=?4
             LIMIT 1)",
        params![
            month_id,
            format!("Birikim - {}", label(&currency)),
            tl_amount,
            EXPENSE
        ],
    )?;
    conn.execute("DELETE FROM savings WHERE id=?1", params![id])?;

    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!("Deleted saving {}", id);
    Ok(())
}

fn quick_buy(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let currency = normalize_currency(sub.get_one::<String>("currency").unwrap());
    let units = parse_decimal(sub.get_one::<String>("units").unwrap())?;
    if units <= Decimal::ZERO {
        bail!("Unit amount must be positive");
    }
    let rate = match sub.get_one::<String>("rate") {
        Some(r) => parse_decimal(r)?,
        None => resolve_rates(conn, RateKind::Selling)
            .get(&currency)
            .with_context(|| format!("No rate available for {}", currency))?,
    };
    if rate <= Decimal::ZERO {
        bail!("Rate must be positive");
    }
    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;

    let tl_amount = (units * rate).round_dp(2);
    let gold_type = if currency == "GAU" { Some("Gram") } else { None };
    book_saving(
        conn,
        month_id,
        &currency,
        tl_amount,
        units,
        Some(rate),
        gold_type,
        now,
    )?;
    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!(
        "Bought {} {} at {} for {}",
        units,
        currency,
        rate,
        fmt_try(&tl_amount)
    );
    Ok(())
}

fn quick_sell(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let now = today();
    let currency = normalize_currency(sub.get_one::<String>("currency").unwrap());
    let units = parse_decimal(sub.get_one::<String>("units").unwrap())?;
    if units <= Decimal::ZERO {
        bail!("Unit amount must be positive");
    }
    let rate = match sub.get_one::<String>("rate") {
        Some(r) => parse_decimal(r)?,
        None => resolve_rates(conn, RateKind::Buying)
            .get(&currency)
            .with_context(|| format!("No rate available for {}", currency))?,
    };
    if rate <= Decimal::ZERO {
        bail!("Rate must be positive");
    }
    let month_id = target_month_id(
        conn,
        sub.get_one::<i32>("year").copied(),
        sub.get_one::<u32>("month").copied(),
        now,
    )?;

    // Deplete newest savings first; partially consumed rows keep their
    // TRY cost pro rata. Summing happens in Decimal, TEXT amounts never
    // go through floating point.
    let rows: Vec<(i64, Decimal, Decimal)> = {
        let mut stmt = conn.prepare(
            "SELECT id, unit_amount, tl_amount FROM savings WHERE currency=?1
             ORDER BY date DESC, id DESC",
        )?;
        let mapped = stmt.query_map(params![currency], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?;
        mapped
            .map(|r| r.map(|(id, u, t)| (id, decimal_col(u), decimal_col(t))))
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    let held: Decimal = rows.iter().map(|(_, u, _)| *u).sum();
    if held < units {
        bail!("Only {} {} held, cannot sell {}", held, currency, units);
    }

    let mut remaining = units;
    for (id, unit_amount, tl_amount) in rows {
        if remaining <= Decimal::ZERO {
            break;
        }
        let take = remaining.min(unit_amount);
        let left = unit_amount - take;
        if left <= Decimal::ZERO {
            conn.execute("DELETE FROM savings WHERE id=?1", params![id])?;
        } else {
            let left_tl = if unit_amount > Decimal::ZERO {
                (tl_amount * left / unit_amount).round_dp(2)
            } else {
                tl_amount
            };
            conn.execute(
                "UPDATE savings SET unit_amount=?1, tl_amount=?2 WHERE id=?3",
                params![left.to_string(), left_tl.to_string(), id],
            )?;
        }
        remaining -= take;
    }

    let proceeds = (units * rate).round_dp(2);
    let order_index = next_order_index(conn, month_id)?;
    let (grams, gold_tl) = if currency == "GAU" {
        (Some(units.to_string()), Some(proceeds.to_string()))
    } else {
        (None, None)
    };
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, order_index,
                                  purchase_rate, gold_grams, gold_tl_value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            month_id,
            format!("Birikim Bozdurma - {}", label(&currency)),
            proceeds.to_string(),
            INCOME,
            now,
            order_index,
            rate.to_string(),
            grams,
            gold_tl
        ],
    )?;

    let year = month_year(conn, month_id, now.year())?;
    recalculate_balances(conn, year)?;
    println!(
        "Sold {} {} at {} for {}",
        units,
        currency,
        rate,
        fmt_try(&proceeds)
    );
    Ok(())
}
