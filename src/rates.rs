// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::BTreeMap;

const UA: &str = concat!(
    "portfoy/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/emresezer/portfoy)"
);

const RATES_URL: &str = "https://finans.truncgil.com/v4/today.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    /// Bank sells to us; used when valuing holdings.
    Selling,
    /// Bank buys from us; used when booking purchases.
    Buying,
}

impl RateKind {
    fn field(self) -> &'static str {
        match self {
            RateKind::Selling => "Selling",
            RateKind::Buying => "Buying",
        }
    }

    fn cache_key(self) -> &'static str {
        match self {
            RateKind::Selling => "rates_selling",
            RateKind::Buying => "rates_buying",
        }
    }
}

/// Currency code -> TRY unit value. Resolved once per command and passed
/// down; nothing below this layer does network I/O.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: BTreeMap<String, Decimal>,
}

impl RateTable {
    pub fn new(rates: BTreeMap<String, Decimal>) -> Self {
        Self { rates }
    }

    pub fn get(&self, code: &str) -> Option<Decimal> {
        self.rates.get(code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decimal)> {
        self.rates.iter()
    }

    /// Static defaults used when the rate service is unreachable and no
    /// cached table exists.
    pub fn fallback() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), Decimal::new(4327, 2));
        rates.insert("EUR".to_string(), Decimal::new(5020, 2));
        rates.insert("GAU".to_string(), Decimal::new(637538, 2));
        rates.insert("BTC".to_string(), Decimal::new(4124679, 0));
        Self { rates }
    }
}

fn http_client() -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

fn value_to_decimal(v: &serde_json::Value) -> Option<Decimal> {
    if let Some(s) = v.as_str() {
        return s.parse::<Decimal>().ok();
    }
    v.as_f64()
        .and_then(Decimal::from_f64)
        .map(|d| d.round_dp(4))
}

/// Fetch the full rate table from the upstream service. Gold grams arrive
/// under the code GRA and are normalized to GAU; coin quotes expose only a
/// TRY_Price field.
pub fn fetch_rates(kind: RateKind) -> Result<RateTable> {
    let client = http_client()?;
    let resp = client.get(RATES_URL).send()?.error_for_status()?;
    let data: serde_json::Value = resp.json().context("Rate payload is not JSON")?;
    let obj = data
        .as_object()
        .context("Rate payload is not a JSON object")?;

    let mut rates = BTreeMap::new();
    for (code, info) in obj {
        if code == "Update_Date" || code == "Timestamp" {
            continue;
        }
        let Some(info) = info.as_object() else {
            continue;
        };
        let value = info
            .get(kind.field())
            .and_then(value_to_decimal)
            .or_else(|| info.get("TRY_Price").and_then(value_to_decimal));
        if let Some(v) = value {
            if v > Decimal::ZERO {
                let code = if code == "GRA" { "GAU" } else { code.as_str() };
                rates.insert(code.to_string(), v);
            }
        }
    }
    if rates.is_empty() {
        anyhow::bail!("Rate payload contained no usable quotes");
    }
    Ok(RateTable::new(rates))
}

/// Best-effort rate resolution: live fetch, else the cached copy in
/// settings, else static defaults. Never fails and never blocks longer
/// than the HTTP timeout.
pub fn resolve_rates(conn: &Connection, kind: RateKind) -> RateTable {
    match fetch_rates(kind) {
        Ok(table) => {
            let _ = cache_rates(conn, kind, &table);
            table
        }
        Err(_) => cached_rates(conn, kind).unwrap_or_else(RateTable::fallback),
    }
}

pub fn cache_rates(conn: &Connection, kind: RateKind, table: &RateTable) -> Result<()> {
    let map: BTreeMap<&String, String> =
        table.iter().map(|(k, v)| (k, v.to_string())).collect();
    let payload = serde_json::to_string(&map)?;
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![kind.cache_key(), payload],
    )?;
    Ok(())
}

fn cached_rates(conn: &Connection, kind: RateKind) -> Option<RateTable> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![kind.cache_key()],
            |r| r.get(0),
        )
        .optional()
        .ok()
        .flatten();
    let payload = payload?;
    let map: BTreeMap<String, String> = serde_json::from_str(&payload).ok()?;
    let rates: BTreeMap<String, Decimal> = map
        .into_iter()
        .filter_map(|(k, v)| v.parse::<Decimal>().ok().map(|d| (k, d)))
        .collect();
    if rates.is_empty() {
        None
    } else {
        Some(RateTable::new(rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_table_has_core_codes() {
        let table = RateTable::fallback();
        assert!(table.get("USD").is_some());
        assert!(table.get("GAU").is_some());
        assert!(table.get("XAU").is_none());
    }

    #[test]
    fn string_and_number_quotes_parse() {
        let v = serde_json::json!("43.27");
        assert_eq!(value_to_decimal(&v), Some(Decimal::new(4327, 2)));
        let v = serde_json::json!(50.2);
        assert_eq!(value_to_decimal(&v), Some(Decimal::new(502, 1)));
        let v = serde_json::json!(null);
        assert_eq!(value_to_decimal(&v), None);
    }
}
