// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use portfoy::engine::recalculate_balances;
use portfoy::utils::{CARRYOVER_TITLE, ensure_year_months, month_id_for};
use rusqlite::{Connection, params};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    portfoy::db::init_schema(&mut conn).unwrap();
    ensure_year_months(&conn, 2024).unwrap();
    conn
}

fn month(conn: &Connection, number: u32) -> i64 {
    month_id_for(conn, 2024, number).unwrap().unwrap()
}

fn add_tx(conn: &Connection, month_id: i64, title: &str, amount: &str, kind: &str, date: &str) {
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            month_id,
            title,
            amount,
            kind,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()
        ],
    )
    .unwrap();
}

fn balances(conn: &Connection, month_id: i64) -> (String, String) {
    conn.query_row(
        "SELECT opening_balance, closing_balance FROM months WHERE id=?1",
        params![month_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .unwrap()
}

fn carryover_count(conn: &Connection, month_id: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE month_id=?1 AND title=?2",
        params![month_id, CARRYOVER_TITLE],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn schema_initializes_on_a_fresh_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = Connection::open(dir.path().join("portfoy.sqlite")).unwrap();
    portfoy::db::init_schema(&mut conn).unwrap();
    // Re-running the batch on an existing file is a no-op.
    portfoy::db::init_schema(&mut conn).unwrap();
    ensure_year_months(&conn, 2024).unwrap();
    let months: i64 = conn
        .query_row("SELECT COUNT(*) FROM months WHERE year=2024", [], |r| r.get(0))
        .unwrap();
    assert_eq!(months, 12);
}

#[test]
fn surplus_carries_forward_as_income() {
    let mut conn = setup();
    let ocak = month(&conn, 1);
    add_tx(&conn, ocak, "Maaş", "5000", "income", "2024-01-05");
    add_tx(&conn, ocak, "Kira", "500", "expense", "2024-01-10");
    add_tx(&conn, ocak, "Market", "200", "expense", "2024-01-12");

    recalculate_balances(&mut conn, 2024).unwrap();

    let (opening, closing) = balances(&conn, ocak);
    assert_eq!(opening, "0");
    assert_eq!(closing, "4300");

    let subat = month(&conn, 2);
    let (opening, closing) = balances(&conn, subat);
    assert_eq!(opening, "4300");
    assert_eq!(closing, "4300");

    let (kind, amount, date): (String, String, NaiveDate) = conn
        .query_row(
            "SELECT type, amount, date FROM transactions WHERE month_id=?1 AND title=?2",
            params![subat, CARRYOVER_TITLE],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(kind, "income");
    assert_eq!(amount, "4300");
    assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
}

#[test]
fn deficit_carries_forward_as_expense() {
    let mut conn = setup();
    let ocak = month(&conn, 1);
    add_tx(&conn, ocak, "Fatura", "150", "expense", "2024-01-20");

    recalculate_balances(&mut conn, 2024).unwrap();

    let subat = month(&conn, 2);
    let (opening, _) = balances(&conn, subat);
    assert_eq!(opening, "-150");
    let (kind, amount): (String, String) = conn
        .query_row(
            "SELECT type, amount FROM transactions WHERE month_id=?1 AND title=?2",
            params![subat, CARRYOVER_TITLE],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(kind, "expense");
    assert_eq!(amount, "150");
}

#[test]
fn recalculation_is_idempotent() {
    let mut conn = setup();
    let ocak = month(&conn, 1);
    add_tx(&conn, ocak, "Maaş", "1000", "income", "2024-01-05");

    recalculate_balances(&mut conn, 2024).unwrap();
    let first: Vec<(String, String)> = (1..=12).map(|n| balances(&conn, month(&conn, n))).collect();
    recalculate_balances(&mut conn, 2024).unwrap();
    let second: Vec<(String, String)> = (1..=12).map(|n| balances(&conn, month(&conn, n))).collect();

    assert_eq!(first, second);
    for n in 2..=12 {
        assert_eq!(carryover_count(&conn, month(&conn, n)), 1);
    }
}

#[test]
fn zero_carryover_removes_the_reserved_row() {
    let mut conn = setup();
    let ocak = month(&conn, 1);
    add_tx(&conn, ocak, "Maaş", "1000", "income", "2024-01-05");
    recalculate_balances(&mut conn, 2024).unwrap();
    assert_eq!(carryover_count(&conn, month(&conn, 2)), 1);

    conn.execute(
        "DELETE FROM transactions WHERE month_id=?1 AND title='Maaş'",
        params![ocak],
    )
    .unwrap();
    recalculate_balances(&mut conn, 2024).unwrap();

    for n in 1..=12 {
        let m = month(&conn, n);
        assert_eq!(carryover_count(&conn, m), 0);
        assert_eq!(balances(&conn, m), ("0".to_string(), "0".to_string()));
    }
}

#[test]
fn carryover_chains_across_the_whole_year() {
    let mut conn = setup();
    add_tx(&conn, month(&conn, 1), "Maaş", "100", "income", "2024-01-05");
    add_tx(&conn, month(&conn, 3), "Prim", "50", "income", "2024-03-05");

    recalculate_balances(&mut conn, 2024).unwrap();

    let (opening, closing) = balances(&conn, month(&conn, 12));
    assert_eq!(opening, "150");
    assert_eq!(closing, "150");
}
