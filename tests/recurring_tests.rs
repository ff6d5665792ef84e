// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use portfoy::engine::check_recurring_payments;
use portfoy::utils::{ensure_year_months, month_id_for};
use rusqlite::{Connection, params};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    portfoy::db::init_schema(&mut conn).unwrap();
    ensure_year_months(&conn, 2024).unwrap();
    conn
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add_payment(
    conn: &Connection,
    name: &str,
    amount: &str,
    day_of_month: u32,
    debt_id: Option<i64>,
    start: &str,
    end: &str,
) -> i64 {
    conn.execute(
        "INSERT INTO recurring_payments(name, amount, type, day_of_month, is_active, debt_id,
                                        start_month, end_month, order_index)
         VALUES (?1, ?2, 'expense', ?3, 1, ?4, ?5, ?6, 1)",
        params![name, amount, day_of_month, debt_id, start, end],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn add_debt(conn: &Connection, name: &str, total: &str, currency: &str) -> i64 {
    conn.execute(
        "INSERT INTO debts(name, total_amount, remaining_amount, currency, created_at)
         VALUES (?1, ?2, ?2, ?3, ?4)",
        params![name, total, currency, day(2024, 1, 1)],
    )
    .unwrap();
    conn.last_insert_rowid()
}

fn projected_rows(conn: &Connection, payment_id: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE recurring_payment_id=?1",
        params![payment_id],
        |r| r.get(0),
    )
    .unwrap()
}

fn remaining(conn: &Connection, debt_id: i64) -> String {
    conn.query_row(
        "SELECT remaining_amount FROM debts WHERE id=?1",
        params![debt_id],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn plain_payment_projects_every_window_month_once() {
    let mut conn = setup();
    let id = add_payment(&conn, "Kira", "1000", 5, None, "2024-01", "2024-12");
    let today = day(2024, 6, 10);

    let added = check_recurring_payments(&mut conn, 2024, today).unwrap();
    assert_eq!(added, 12);
    assert_eq!(projected_rows(&conn, id), 12);

    let added = check_recurring_payments(&mut conn, 2024, today).unwrap();
    assert_eq!(added, 0);
    assert_eq!(projected_rows(&conn, id), 12);
}

#[test]
fn window_bounds_are_inclusive() {
    let mut conn = setup();
    let id = add_payment(&conn, "Kurs", "250", 1, None, "2024-03", "2024-05");

    check_recurring_payments(&mut conn, 2024, day(2024, 6, 10)).unwrap();
    assert_eq!(projected_rows(&conn, id), 3);

    let months: Vec<NaiveDate> = {
        let mut stmt = conn
            .prepare("SELECT date FROM transactions WHERE recurring_payment_id=?1 ORDER BY date")
            .unwrap();
        stmt.query_map(params![id], |r| r.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    };
    assert_eq!(months[0], day(2024, 3, 1));
    assert_eq!(months[2], day(2024, 5, 1));
}

#[test]
fn malformed_window_bound_is_ignored() {
    let mut conn = setup();
    let id = add_payment(&conn, "Abonelik", "100", 1, None, "garbage", "2024-12");

    check_recurring_payments(&mut conn, 2024, day(2024, 6, 10)).unwrap();
    assert_eq!(projected_rows(&conn, id), 12);
}

#[test]
fn day_is_clamped_to_the_month_length() {
    let mut conn = setup();
    let id = add_payment(&conn, "Taksit", "300", 31, None, "2024-02", "2024-02");

    check_recurring_payments(&mut conn, 2024, day(2024, 6, 10)).unwrap();
    let date: NaiveDate = conn
        .query_row(
            "SELECT date FROM transactions WHERE recurring_payment_id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap();
    // 2024 is a leap year
    assert_eq!(date, day(2024, 2, 29));
    assert_eq!(projected_rows(&conn, id), 1);
}

#[test]
fn debt_payment_stops_at_the_current_month() {
    let mut conn = setup();
    let debt = add_debt(&conn, "Kredi", "1200", "TRY");
    let id = add_payment(&conn, "Kredi taksiti", "100", 5, Some(debt), "2024-01", "2024-12");

    check_recurring_payments(&mut conn, 2024, day(2024, 3, 15)).unwrap();
    assert_eq!(projected_rows(&conn, id), 3);
    assert_eq!(remaining(&conn, debt), "900");

    // A month later one more installment lands.
    check_recurring_payments(&mut conn, 2024, day(2024, 4, 15)).unwrap();
    assert_eq!(projected_rows(&conn, id), 4);
    assert_eq!(remaining(&conn, debt), "800");
}

#[test]
fn future_debt_rows_are_retracted_and_credited_back() {
    let mut conn = setup();
    let debt = add_debt(&conn, "Kredi", "1200", "TRY");
    let id = add_payment(&conn, "Kredi taksiti", "100", 5, Some(debt), "2024-01", "2024-12");

    check_recurring_payments(&mut conn, 2024, day(2024, 5, 15)).unwrap();
    assert_eq!(projected_rows(&conn, id), 5);
    assert_eq!(remaining(&conn, debt), "700");

    // Running with an earlier clock pulls the Apr/May rows back out.
    check_recurring_payments(&mut conn, 2024, day(2024, 3, 15)).unwrap();
    assert_eq!(projected_rows(&conn, id), 3);
    assert_eq!(remaining(&conn, debt), "900");
}

#[test]
fn manual_debt_payment_suppresses_the_projection() {
    let mut conn = setup();
    let debt = add_debt(&conn, "Kredi", "1200", "TRY");
    let id = add_payment(&conn, "Kredi taksiti", "100", 5, Some(debt), "2024-01", "2024-12");

    let ocak = month_id_for(&conn, 2024, 1).unwrap().unwrap();
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, debt_id)
         VALUES (?1, 'Borç ödemesi - Kredi', '100', 'expense', ?2, ?3)",
        params![ocak, day(2024, 1, 3), debt],
    )
    .unwrap();

    check_recurring_payments(&mut conn, 2024, day(2024, 2, 15)).unwrap();
    // January is covered by the manual payment; only February projects.
    assert_eq!(projected_rows(&conn, id), 1);
    let projected_month: i64 = conn
        .query_row(
            "SELECT month_id FROM transactions WHERE recurring_payment_id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(
        projected_month,
        month_id_for(&conn, 2024, 2).unwrap().unwrap()
    );
}

#[test]
fn dangling_debt_reference_still_projects() {
    let mut conn = setup();
    let id = add_payment(&conn, "Eski kredi", "100", 5, Some(9999), "2024-01", "2024-12");

    check_recurring_payments(&mut conn, 2024, day(2024, 3, 15)).unwrap();
    assert_eq!(projected_rows(&conn, id), 3);
}

#[test]
fn reorder_rewrites_definition_order() {
    let mut conn = setup();
    let a = add_payment(&conn, "Kira", "1000", 5, None, "2024-01", "2024-12");
    let b = add_payment(&conn, "Aidat", "200", 5, None, "2024-01", "2024-12");
    let c = add_payment(&conn, "Internet", "150", 5, None, "2024-01", "2024-12");

    let argv = vec![
        "portfoy".to_string(),
        "recurring".to_string(),
        "reorder".to_string(),
        "--ids".to_string(),
        format!("{},{},{}", c, a, b),
    ];
    let m = portfoy::cli::build_cli().get_matches_from(argv);
    let (_, sub) = m.subcommand().unwrap();
    portfoy::commands::recurring::handle(&mut conn, sub).unwrap();

    let order_of = |id: i64| -> i64 {
        conn.query_row(
            "SELECT order_index FROM recurring_payments WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap()
    };
    assert_eq!(order_of(c), 1);
    assert_eq!(order_of(a), 2);
    assert_eq!(order_of(b), 3);
}

#[test]
fn inactive_definitions_are_skipped() {
    let mut conn = setup();
    let id = add_payment(&conn, "Kira", "1000", 5, None, "2024-01", "2024-12");
    conn.execute(
        "UPDATE recurring_payments SET is_active=0 WHERE id=?1",
        params![id],
    )
    .unwrap();

    let added = check_recurring_payments(&mut conn, 2024, day(2024, 6, 10)).unwrap();
    assert_eq!(added, 0);
    assert_eq!(projected_rows(&conn, id), 0);
}
