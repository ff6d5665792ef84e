// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("dev.sezer", "Portfoy", "portfoy"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("portfoy.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS months(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        year INTEGER NOT NULL,
        opening_balance TEXT NOT NULL DEFAULT '0',
        closing_balance TEXT NOT NULL DEFAULT '0',
        UNIQUE(name, year)
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        type TEXT NOT NULL DEFAULT 'expense'
    );

    CREATE TABLE IF NOT EXISTS debts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        total_amount TEXT NOT NULL,
        remaining_amount TEXT NOT NULL,
        is_credit INTEGER NOT NULL DEFAULT 0,
        installment_amount TEXT NOT NULL DEFAULT '0',
        total_installments INTEGER NOT NULL DEFAULT 0,
        installments_paid INTEGER NOT NULL DEFAULT 0,
        due_day INTEGER NOT NULL DEFAULT 1,
        currency TEXT NOT NULL DEFAULT 'TRY',
        gold_type TEXT,
        created_at TEXT NOT NULL DEFAULT (date('now'))
    );

    CREATE TABLE IF NOT EXISTS recurring_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        amount TEXT NOT NULL,
        type TEXT NOT NULL,
        day_of_month INTEGER NOT NULL DEFAULT 1,
        is_active INTEGER NOT NULL DEFAULT 1,
        last_applied_month TEXT,
        category_id INTEGER,
        debt_id INTEGER,
        unit_currency TEXT,
        unit_grams TEXT,
        start_month TEXT,
        end_month TEXT,
        order_index INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
    );

    -- debt_id and recurring_payment_id are deliberately not declared as
    -- foreign keys: deleting a debt or a recurring definition keeps booked
    -- rows as history, and aggregation ignores dangling references.
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        month_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        amount TEXT NOT NULL,
        type TEXT NOT NULL,
        date TEXT NOT NULL,
        is_recurring INTEGER NOT NULL DEFAULT 0,
        category_id INTEGER,
        debt_id INTEGER,
        recurring_payment_id INTEGER,
        order_index INTEGER NOT NULL DEFAULT 0,
        purchase_rate TEXT,
        gold_type TEXT,
        gold_grams TEXT,
        gold_tl_value TEXT,
        FOREIGN KEY(month_id) REFERENCES months(id) ON DELETE CASCADE,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_month ON transactions(month_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_debt ON transactions(debt_id);

    CREATE TABLE IF NOT EXISTS savings(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        month_id INTEGER NOT NULL,
        currency TEXT NOT NULL,
        tl_amount TEXT NOT NULL DEFAULT '0',
        unit_amount TEXT NOT NULL DEFAULT '0',
        purchase_rate TEXT,
        gold_type TEXT,
        date TEXT NOT NULL,
        FOREIGN KEY(month_id) REFERENCES months(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}
