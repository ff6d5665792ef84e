// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

/// Reserved title of the synthetic carryover row; owned by the balance
/// recalculator, never user-editable.
pub const CARRYOVER_TITLE: &str = "Devreden Bakiye";

/// Title prefix of booked debt payments, manual and projected alike.
pub const DEBT_PAYMENT_PREFIX: &str = "Borç ödemesi";

pub const INCOME: &str = "income";
pub const EXPENSE: &str = "expense";

/// Canonical month names; a year always holds these twelve, in id order.
pub const MONTH_NAMES: [&str; 12] = [
    "Ocak", "Şubat", "Mart", "Nisan", "Mayıs", "Haziran", "Temmuz", "Ağustos", "Eylül", "Ekim",
    "Kasım", "Aralık",
];

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_month(s: &str) -> Result<String> {
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    Ok(s.to_string())
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Stored amounts are TEXT; unreadable values degrade to zero instead of
/// failing a whole recomputation pass.
pub fn decimal_col(s: String) -> Decimal {
    s.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

pub fn opt_decimal_col(s: Option<String>) -> Option<Decimal> {
    s.and_then(|v| v.parse::<Decimal>().ok())
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<u32> {
    let last = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => return Err(anyhow::anyhow!("Invalid month number {}", month)),
    };
    Ok(last)
}

/// Turkish money display: thousands '.', decimals ',', e.g. "1.234,56 ₺".
pub fn fmt_try(value: &Decimal) -> String {
    let rendered = format!("{:.2}", value);
    let negative = rendered.starts_with('-');
    let digits = rendered.trim_start_matches('-');
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));
    let mut grouped = String::new();
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let int_grouped: String = grouped.chars().rev().collect();
    format!(
        "{}{},{} ₺",
        if negative { "-" } else { "" },
        int_grouped,
        frac_part
    )
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn id_for_category(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM categories WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name))?;
    Ok(id)
}

/// Month ids of a year in chronological order; the 1-based position within
/// this list is the month number.
pub fn month_ids_for_year(conn: &Connection, year: i32) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM months WHERE year=?1 ORDER BY id")?;
    let rows = stmt.query_map(params![year], |r| r.get(0))?;
    Ok(rows.collect::<std::result::Result<Vec<i64>, _>>()?)
}

pub fn month_id_for(conn: &Connection, year: i32, month_number: u32) -> Result<Option<i64>> {
    if !(1..=12).contains(&month_number) {
        return Ok(None);
    }
    let ids = month_ids_for_year(conn, year)?;
    Ok(ids.get(month_number as usize - 1).copied())
}

/// Resolve a month id back to its (year, month number) slot.
pub fn month_slot(conn: &Connection, month_id: i64) -> Result<Option<(i32, u32)>> {
    let year: Option<i32> = conn
        .query_row(
            "SELECT year FROM months WHERE id=?1",
            params![month_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(year) = year else {
        return Ok(None);
    };
    let ids = month_ids_for_year(conn, year)?;
    let number = ids
        .iter()
        .position(|id| *id == month_id)
        .map(|i| (i % 12) as u32 + 1);
    Ok(number.map(|n| (year, n)))
}

pub fn latest_month_id(conn: &Connection) -> Result<Option<i64>> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM months ORDER BY year DESC, id DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn month_year(conn: &Connection, month_id: i64, fallback: i32) -> Result<i32> {
    let year: Option<i32> = conn
        .query_row(
            "SELECT year FROM months WHERE id=?1",
            params![month_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(year.unwrap_or(fallback))
}

pub fn next_order_index(conn: &Connection, month_id: i64) -> Result<i64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(order_index) FROM transactions WHERE month_id=?1",
        params![month_id],
        |r| r.get(0),
    )?;
    Ok(max.unwrap_or(0) + 1)
}

/// Create any missing canonical months for a year. Safe to call repeatedly;
/// insertion order keeps id order aligned with the calendar.
pub fn ensure_year_months(conn: &Connection, year: i32) -> Result<usize> {
    let mut created = 0;
    for name in MONTH_NAMES {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM months WHERE name=?1 AND year=?2",
                params![name, year],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            conn.execute(
                "INSERT INTO months(name, year) VALUES (?1, ?2)",
                params![name, year],
            )?;
            created += 1;
        }
    }
    Ok(created)
}

/// The ambient date for command handlers. Engine functions never call this;
/// they take "today" as a parameter.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Resolve the month a command targets: an explicit --year/--month pair,
/// partial flags filled from `today`, or the latest month when neither is
/// given.
pub fn target_month_id(
    conn: &Connection,
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
) -> Result<i64> {
    if year.is_none() && month.is_none() {
        return latest_month_id(conn)?.context("No months exist yet; run 'portfoy init' first");
    }
    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());
    month_id_for(conn, year, month)?.with_context(|| {
        format!(
            "Month {}/{} not found; run 'portfoy init --year {}'",
            month, year, year
        )
    })
}

/// Repair drifted month names by position within the year.
pub fn fix_month_names(conn: &Connection, year: i32) -> Result<()> {
    let ids = month_ids_for_year(conn, year)?;
    for (index, id) in ids.iter().enumerate() {
        let expected = MONTH_NAMES[index % 12];
        conn.execute(
            "UPDATE months SET name=?1 WHERE id=?2 AND name<>?1",
            params![expected, id],
        )?;
    }
    Ok(())
}
