// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use portfoy::utils::{ensure_year_months, month_id_for};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    portfoy::db::init_schema(&mut conn).unwrap();
    ensure_year_months(&conn, 2024).unwrap();
    conn
}

fn saving_matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["portfoy", "saving"];
    argv.extend_from_slice(args);
    let m = portfoy::cli::build_cli().get_matches_from(argv);
    let (_, sub) = m.subcommand().unwrap();
    sub.clone()
}

fn add_saving_row(conn: &Connection, month_id: i64, units: &str, tl: &str) {
    conn.execute(
        "INSERT INTO savings(month_id, currency, tl_amount, unit_amount, purchase_rate, date)
         VALUES (?1, 'USD', ?2, ?3, '40', '2024-01-05')",
        params![month_id, tl, units],
    )
    .unwrap();
}

#[test]
fn quick_sell_accepts_exactly_the_held_units() {
    let mut conn = setup();
    let month_id = month_id_for(&conn, 2024, 1).unwrap().unwrap();
    // Three 0.1-unit lots; the sum must stay exact, not a float artifact.
    for _ in 0..3 {
        add_saving_row(&conn, month_id, "0.1", "4");
    }

    let sub = saving_matches(&[
        "quick-sell", "--currency", "USD", "--units", "0.3", "--rate", "40", "--year", "2024",
        "--month", "1",
    ]);
    portfoy::commands::savings::handle(&mut conn, &sub).unwrap();

    let left: i64 = conn
        .query_row("SELECT COUNT(*) FROM savings WHERE currency='USD'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(left, 0);

    let proceeds: String = conn
        .query_row(
            "SELECT amount FROM transactions WHERE title='Birikim Bozdurma - Dolar' AND type='income'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(proceeds.parse::<Decimal>().unwrap(), Decimal::from(12));
}

#[test]
fn quick_sell_rejects_more_than_held() {
    let mut conn = setup();
    let month_id = month_id_for(&conn, 2024, 1).unwrap().unwrap();
    add_saving_row(&conn, month_id, "0.2", "8");

    let sub = saving_matches(&[
        "quick-sell", "--currency", "USD", "--units", "0.3", "--rate", "40", "--year", "2024",
        "--month", "1",
    ]);
    assert!(portfoy::commands::savings::handle(&mut conn, &sub).is_err());

    // Nothing was depleted.
    let units: String = conn
        .query_row("SELECT unit_amount FROM savings", [], |r| r.get(0))
        .unwrap();
    assert_eq!(units, "0.2");
}

#[test]
fn edit_replaces_the_paired_expense_in_place() {
    let mut conn = setup();
    let month_id = month_id_for(&conn, 2024, 1).unwrap().unwrap();
    add_saving_row(&conn, month_id, "2.5", "100");
    let saving_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, order_index)
         VALUES (?1, 'Birikim - Dolar', '100', 'expense', '2024-01-05', 5)",
        params![month_id],
    )
    .unwrap();

    let sub = saving_matches(&[
        "edit", "--id", &saving_id.to_string(), "--tl", "200", "--rate", "50",
    ]);
    portfoy::commands::savings::handle(&mut conn, &sub).unwrap();

    let (units, tl): (String, String) = conn
        .query_row(
            "SELECT unit_amount, tl_amount FROM savings WHERE id=?1",
            params![saving_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(units.parse::<Decimal>().unwrap(), Decimal::from(4));
    assert_eq!(tl, "200");

    // One paired expense, at the replaced row's slot.
    let (amount, order): (String, i64) = conn
        .query_row(
            "SELECT amount, order_index FROM transactions
             WHERE month_id=?1 AND title='Birikim - Dolar'",
            params![month_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(amount, "200");
    assert_eq!(order, 5);
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM transactions WHERE month_id=?1 AND title='Birikim - Dolar'",
            params![month_id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}
