// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::Datelike;
use portfoy::utils::{ensure_year_months, month_id_for};
use rusqlite::{Connection, params};

fn setup_for(year: i32) -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    portfoy::db::init_schema(&mut conn).unwrap();
    ensure_year_months(&conn, year).unwrap();
    conn
}

fn tx_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["portfoy", "tx"];
    argv.extend_from_slice(args);
    let m = portfoy::cli::build_cli().get_matches_from(argv);
    let (_, sub) = m.subcommand().unwrap();
    sub.clone()
}

fn title_count(conn: &Connection, month_id: i64, title: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE month_id=?1 AND title=?2",
        params![month_id, title],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn recurring_origin_is_not_projected_twice() {
    let now = chrono::Local::now().date_naive();
    let mut conn = setup_for(now.year());
    let year = now.year().to_string();
    let month = now.month().to_string();
    let sub = tx_matches(&[
        "add", "--title", "Kira", "--amount", "100", "--type", "expense", "--year", &year,
        "--month", &month, "--recurring",
    ]);
    portfoy::commands::transactions::handle(&mut conn, &sub).unwrap();

    let month_id = month_id_for(&conn, now.year(), now.month()).unwrap().unwrap();
    // The entry that spawned the definition doubles as the projection.
    assert_eq!(title_count(&conn, month_id, "Kira"), 1);
    let fk: Option<i64> = conn
        .query_row(
            "SELECT recurring_payment_id FROM transactions WHERE month_id=?1 AND title='Kira'",
            params![month_id],
            |r| r.get(0),
        )
        .unwrap();
    assert!(fk.is_some());

    // Later months get exactly one projected copy each.
    if now.month() < 12 {
        let next = month_id_for(&conn, now.year(), now.month() + 1).unwrap().unwrap();
        assert_eq!(title_count(&conn, next, "Kira"), 1);
    }
}

#[test]
fn deleting_the_origin_row_deactivates_its_definition() {
    let now = chrono::Local::now().date_naive();
    let mut conn = setup_for(now.year());
    let year = now.year().to_string();
    let month = now.month().to_string();
    let sub = tx_matches(&[
        "add", "--title", "Aidat", "--amount", "50", "--type", "expense", "--year", &year,
        "--month", &month, "--recurring",
    ]);
    portfoy::commands::transactions::handle(&mut conn, &sub).unwrap();

    let month_id = month_id_for(&conn, now.year(), now.month()).unwrap().unwrap();
    let tx_id: i64 = conn
        .query_row(
            "SELECT id FROM transactions WHERE month_id=?1 AND title='Aidat'",
            params![month_id],
            |r| r.get(0),
        )
        .unwrap();
    let sub = tx_matches(&["delete", "--id", &tx_id.to_string()]);
    portfoy::commands::transactions::handle(&mut conn, &sub).unwrap();

    let active: bool = conn
        .query_row(
            "SELECT is_active FROM recurring_payments WHERE name='Aidat'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(!active);
}

#[test]
fn reorder_rewrites_order_from_the_id_list() {
    let mut conn = setup_for(2024);
    let month_id = month_id_for(&conn, 2024, 1).unwrap().unwrap();
    let mut ids = Vec::new();
    for (i, title) in ["A", "B", "C"].iter().enumerate() {
        conn.execute(
            "INSERT INTO transactions(month_id, title, amount, type, date, order_index)
             VALUES (?1, ?2, '10', 'expense', '2024-01-05', ?3)",
            params![month_id, title, (i + 1) as i64],
        )
        .unwrap();
        ids.push(conn.last_insert_rowid());
    }

    let list = format!("{},{},{}", ids[2], ids[0], ids[1]);
    let sub = tx_matches(&["reorder", "--ids", &list]);
    portfoy::commands::transactions::handle(&mut conn, &sub).unwrap();

    let order_of = |id: i64| -> i64 {
        conn.query_row(
            "SELECT order_index FROM transactions WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap()
    };
    assert_eq!(order_of(ids[2]), 1);
    assert_eq!(order_of(ids[0]), 2);
    assert_eq!(order_of(ids[1]), 3);
}
