// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, NaiveDate};
use portfoy::engine::{load_debt, refresh_all_debts, update_debt_progress};
use portfoy::utils::{ensure_year_months, month_id_for};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    portfoy::db::init_schema(&mut conn).unwrap();
    ensure_year_months(&conn, 2024).unwrap();
    conn
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add_debt(conn: &Connection, total: &str, currency: &str) -> i64 {
    conn.execute(
        "INSERT INTO debts(name, total_amount, remaining_amount, currency, created_at)
         VALUES ('Borç', ?1, ?1, ?2, ?3)",
        params![total, currency, day(2024, 1, 1)],
    )
    .unwrap();
    conn.last_insert_rowid()
}

#[allow(clippy::too_many_arguments)]
fn add_payment(
    conn: &Connection,
    debt_id: i64,
    amount: &str,
    date: NaiveDate,
    rate: Option<&str>,
    grams: Option<&str>,
    gold_tl: Option<&str>,
) {
    let month = month_id_for(conn, date.year(), date.month()).unwrap().unwrap();
    conn.execute(
        "INSERT INTO transactions(month_id, title, amount, type, date, debt_id,
                                  purchase_rate, gold_grams, gold_tl_value)
         VALUES (?1, 'Borç ödemesi - Borç', ?2, 'expense', ?3, ?4, ?5, ?6, ?7)",
        params![month, amount, date, debt_id, rate, grams, gold_tl],
    )
    .unwrap();
}

#[test]
fn try_payments_reduce_remaining_directly() {
    let conn = setup();
    let debt = add_debt(&conn, "1200", "TRY");
    for m in 1..=3 {
        add_payment(&conn, debt, "100", day(2024, m, 5), None, None, None);
    }

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    let (paid, _) = update_debt_progress(&conn, &mut d, day(2024, 3, 15)).unwrap();
    assert_eq!(paid, Decimal::from(300));
    assert_eq!(d.remaining_amount, Decimal::from(900));
}

#[test]
fn future_dated_payments_do_not_count() {
    let conn = setup();
    let debt = add_debt(&conn, "1200", "TRY");
    add_payment(&conn, debt, "100", day(2024, 1, 5), None, None, None);
    add_payment(&conn, debt, "100", day(2024, 8, 5), None, None, None);

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    update_debt_progress(&conn, &mut d, day(2024, 1, 31)).unwrap();
    assert_eq!(d.remaining_amount, Decimal::from(1100));
}

#[test]
fn usd_payments_convert_through_the_booked_rate() {
    let conn = setup();
    let debt = add_debt(&conn, "500", "USD");
    // 4000 TRY at 40 TRY/USD is 100 USD
    add_payment(&conn, debt, "4000", day(2024, 1, 5), Some("40"), None, None);

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    update_debt_progress(&conn, &mut d, day(2024, 2, 1)).unwrap();
    assert_eq!(d.remaining_amount, Decimal::from(400));
}

#[test]
fn missing_or_zero_rate_falls_back_to_one_to_one() {
    let conn = setup();
    let debt = add_debt(&conn, "500", "USD");
    add_payment(&conn, debt, "100", day(2024, 1, 5), None, None, None);
    add_payment(&conn, debt, "50", day(2024, 1, 6), Some("0"), None, None);

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    update_debt_progress(&conn, &mut d, day(2024, 2, 1)).unwrap();
    assert_eq!(d.remaining_amount, Decimal::from(350));
}

#[test]
fn gold_payments_count_in_grams() {
    let conn = setup();
    let debt = add_debt(&conn, "50", "GAU");
    add_payment(&conn, debt, "65000", day(2024, 1, 5), None, Some("10"), None);

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    update_debt_progress(&conn, &mut d, day(2024, 2, 1)).unwrap();
    assert_eq!(d.remaining_amount, Decimal::from(40));
}

#[test]
fn gold_payment_without_grams_uses_the_booked_gold_price() {
    let conn = setup();
    let debt = add_debt(&conn, "50", "GAU");
    // 65000 TRY at 6500 TRY/gram is 10 grams
    add_payment(&conn, debt, "65000", day(2024, 1, 5), None, None, Some("6500"));
    // No grams and no price: contributes nothing
    add_payment(&conn, debt, "1000", day(2024, 1, 6), None, None, None);

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    update_debt_progress(&conn, &mut d, day(2024, 2, 1)).unwrap();
    assert_eq!(d.remaining_amount, Decimal::from(40));
}

#[test]
fn overpayment_floors_remaining_at_zero() {
    let conn = setup();
    let debt = add_debt(&conn, "100", "TRY");
    add_payment(&conn, debt, "250", day(2024, 1, 5), None, None, None);

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    let (paid, _) = update_debt_progress(&conn, &mut d, day(2024, 2, 1)).unwrap();
    assert_eq!(d.remaining_amount, Decimal::ZERO);
    // Paid never exceeds the debt's own total.
    assert_eq!(paid, Decimal::from(100));
}

#[test]
fn installment_counter_tracks_payments_and_calendar() {
    let conn = setup();
    conn.execute(
        "INSERT INTO debts(name, total_amount, remaining_amount, is_credit, installment_amount,
                           total_installments, currency, created_at)
         VALUES ('Kredi', '12000', '12000', 1, '1000', 12, 'TRY', ?1)",
        params![day(2024, 1, 10)],
    )
    .unwrap();
    let debt = conn.last_insert_rowid();
    for m in 1..=3 {
        add_payment(&conn, debt, "1000", day(2024, m, 10), None, None, None);
    }

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    let (_, installments) = update_debt_progress(&conn, &mut d, day(2024, 3, 15)).unwrap();
    assert_eq!(installments, 3);
    assert_eq!(d.remaining_amount, Decimal::from(9000));
}

#[test]
fn installment_counter_cannot_run_ahead_of_the_calendar() {
    let conn = setup();
    conn.execute(
        "INSERT INTO debts(name, total_amount, remaining_amount, is_credit, installment_amount,
                           total_installments, currency, created_at)
         VALUES ('Kredi', '12000', '12000', 1, '1000', 12, 'TRY', ?1)",
        params![day(2024, 1, 10)],
    )
    .unwrap();
    let debt = conn.last_insert_rowid();
    // Five payments booked inside a single month.
    for d in 1..=5 {
        add_payment(&conn, debt, "1000", day(2024, 1, d), None, None, None);
    }

    let mut d = load_debt(&conn, debt).unwrap().unwrap();
    let (_, installments) = update_debt_progress(&conn, &mut d, day(2024, 1, 20)).unwrap();
    // One month elapsed plus the extra same-month payments.
    assert_eq!(installments, 5);
}

#[test]
fn refresh_all_debts_covers_every_row() {
    let mut conn = setup();
    let a = add_debt(&conn, "1000", "TRY");
    let b = add_debt(&conn, "2000", "TRY");
    add_payment(&conn, a, "400", day(2024, 1, 5), None, None, None);
    add_payment(&conn, b, "500", day(2024, 1, 5), None, None, None);

    refresh_all_debts(&mut conn, day(2024, 2, 1)).unwrap();

    let ra: String = conn
        .query_row("SELECT remaining_amount FROM debts WHERE id=?1", params![a], |r| r.get(0))
        .unwrap();
    let rb: String = conn
        .query_row("SELECT remaining_amount FROM debts WHERE id=?1", params![b], |r| r.get(0))
        .unwrap();
    assert_eq!(ra, "600");
    assert_eq!(rb, "1500");
}
