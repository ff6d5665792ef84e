// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Month {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub month_id: i64,
    pub title: String,
    pub amount: Decimal,
    pub r#type: String,
    pub date: NaiveDate,
    pub is_recurring: bool,
    pub category_id: Option<i64>,
    pub debt_id: Option<i64>,
    pub recurring_payment_id: Option<i64>,
    pub order_index: i64,
    pub purchase_rate: Option<Decimal>,
    pub gold_type: Option<String>,
    pub gold_grams: Option<Decimal>,
    pub gold_tl_value: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub name: String,
    pub total_amount: Decimal,
    pub remaining_amount: Decimal,
    pub is_credit: bool,
    pub installment_amount: Decimal,
    pub total_installments: i64,
    pub installments_paid: i64,
    pub due_day: u32,
    pub currency: String,
    pub gold_type: Option<String>,
    pub created_at: NaiveDate,
    // Derived for display only, never persisted.
    #[serde(skip)]
    pub paid_amount_calculated: Decimal,
    #[serde(skip)]
    pub payments_this_month: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub id: i64,
    pub name: String,
    pub amount: Decimal,
    pub r#type: String,
    pub day_of_month: u32,
    pub is_active: bool,
    pub last_applied_month: Option<String>,
    pub category_id: Option<i64>,
    pub debt_id: Option<i64>,
    pub unit_currency: Option<String>,
    pub unit_grams: Option<Decimal>,
    pub start_month: Option<String>,
    pub end_month: Option<String>,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Saving {
    pub id: i64,
    pub month_id: i64,
    pub currency: String,
    pub tl_amount: Decimal,
    pub unit_amount: Decimal,
    pub purchase_rate: Option<Decimal>,
    pub gold_type: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub r#type: String,
}
