// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Category;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let kind = sub.get_one::<String>("type").unwrap();
    conn.execute(
        "INSERT INTO categories(name, type) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET type=excluded.type",
        params![name, kind],
    )?;
    println!("Category '{}' ({})", name, kind);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt = conn.prepare("SELECT id, name, type FROM categories ORDER BY name")?;
    let categories: Vec<Category> = stmt
        .query_map([], |r| {
            Ok(Category {
                id: r.get(0)?,
                name: r.get(1)?,
                r#type: r.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    if !maybe_print_json(json_flag, jsonl_flag, &categories)? {
        let rows: Vec<Vec<String>> = categories
            .iter()
            .map(|c| vec![c.id.to_string(), c.name.clone(), c.r#type.clone()])
            .collect();
        println!("{}", pretty_table(&["Id", "Name", "Type"], rows));
    }
    Ok(())
}
