// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::rates::{RateKind, cache_rates, fetch_rates, resolve_rates};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

/// Codes shown by default; --all widens to everything the service quotes.
const CORE_CODES: [&str; 4] = ["USD", "EUR", "GAU", "BTC"];

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(conn, sub)?,
        Some(("fetch", _)) => fetch(conn)?,
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct RateRow {
    code: String,
    try_value: String,
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let kind = if sub.get_flag("buying") {
        RateKind::Buying
    } else {
        RateKind::Selling
    };
    let table = resolve_rates(conn, kind);
    let all = sub.get_flag("all");
    let rows: Vec<RateRow> = table
        .iter()
        .filter(|(code, _)| all || CORE_CODES.contains(&code.as_str()))
        .map(|(code, value)| RateRow {
            code: code.clone(),
            try_value: value.to_string(),
        })
        .collect();

    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if !maybe_print_json(json_flag, jsonl_flag, &rows)? {
        let display: Vec<Vec<String>> = rows
            .iter()
            .map(|r| vec![r.code.clone(), r.try_value.clone()])
            .collect();
        println!("{}", pretty_table(&["Code", "TRY"], display));
    }
    Ok(())
}

fn fetch(conn: &Connection) -> Result<()> {
    for kind in [RateKind::Selling, RateKind::Buying] {
        let table = fetch_rates(kind)?;
        cache_rates(conn, kind, &table)?;
    }
    println!("Cached selling and buying rate tables");
    Ok(())
}
