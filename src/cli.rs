// Copyright (c) 2025 Emre Sezer.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn year_arg() -> Arg {
    Arg::new("year")
        .long("year")
        .value_parser(value_parser!(i32))
        .help("Ledger year (defaults to the current year)")
}

fn month_arg() -> Arg {
    Arg::new("month")
        .long("month")
        .value_parser(value_parser!(u32))
        .help("Month number 1-12 (defaults to the current month)")
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON instead of a table"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print one JSON object per line"),
    )
}

pub fn build_cli() -> Command {
    Command::new("portfoy")
        .about("Single-user TRY ledger: monthly balances, installment debts, recurring payments, multi-currency savings")
        .version(clap::crate_version!())
        .subcommand(
            Command::new("init")
                .about("Create the database and the twelve months of a year")
                .arg(year_arg()),
        )
        .subcommand(
            Command::new("month")
                .about("Month views")
                .subcommand(json_flags(
                    Command::new("view")
                        .about("Show a month's transactions and balances")
                        .arg(year_arg())
                        .arg(month_arg()),
                )),
        )
        .subcommand(
            Command::new("tx")
                .about("Ledger transactions")
                .subcommand(
                    Command::new("add")
                        .about("Record an income or expense")
                        .arg(year_arg())
                        .arg(month_arg())
                        .arg(Arg::new("title").long("title").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["income", "expense"])
                                .required(true),
                        )
                        .arg(Arg::new("date").long("date").help("YYYY-MM-DD, defaults to today"))
                        .arg(Arg::new("category").long("category"))
                        .arg(
                            Arg::new("recurring")
                                .long("recurring")
                                .action(ArgAction::SetTrue)
                                .help("Also create a recurring definition from this entry"),
                        )
                        .arg(
                            Arg::new("recurring-day")
                                .long("recurring-day")
                                .value_parser(value_parser!(u32))
                                .help("Day of month for the recurring definition (1-28)"),
                        )
                        .arg(
                            Arg::new("recurring-start")
                                .long("recurring-start")
                                .help("First month for the recurring definition, YYYY-MM"),
                        )
                        .arg(
                            Arg::new("recurring-end")
                                .long("recurring-end")
                                .help("Last month for the recurring definition, YYYY-MM"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List transactions")
                        .arg(year_arg())
                        .arg(month_arg()),
                ))
                .subcommand(
                    Command::new("edit")
                        .about("Edit a transaction")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true))
                        .arg(Arg::new("title").long("title"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("type").long("type").value_parser(["income", "expense"]))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("category").long("category")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a transaction")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true)),
                )
                .subcommand(
                    Command::new("reorder")
                        .about("Set display order from an id list")
                        .arg(
                            Arg::new("ids")
                                .long("ids")
                                .value_delimiter(',')
                                .value_parser(value_parser!(i64))
                                .required(true)
                                .help("Comma-separated transaction ids in the desired order"),
                        ),
                ),
        )
        .subcommand(
            Command::new("debt")
                .about("Debts and installment credits")
                .subcommand(
                    Command::new("add")
                        .about("Create a debt, or edit one with --id")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("total").long("total").required(true))
                        .arg(
                            Arg::new("currency")
                                .long("currency")
                                .value_parser(["TRY", "USD", "GAU"])
                                .default_value("TRY"),
                        )
                        .arg(Arg::new("gold-type").long("gold-type"))
                        .arg(
                            Arg::new("credit")
                                .long("credit")
                                .action(ArgAction::SetTrue)
                                .help("Installment-based credit"),
                        )
                        .arg(
                            Arg::new("installments")
                                .long("installments")
                                .value_parser(value_parser!(i64))
                                .default_value("0"),
                        )
                        .arg(Arg::new("installment-amount").long("installment-amount"))
                        .arg(
                            Arg::new("due-day")
                                .long("due-day")
                                .value_parser(value_parser!(u32))
                                .default_value("1"),
                        ),
                )
                .subcommand(json_flags(Command::new("list").about("List debts with derived progress")))
                .subcommand(
                    Command::new("pay")
                        .about("Book a payment against a debt")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true))
                        .arg(Arg::new("amount").long("amount").help("Payment in the debt's unit"))
                        .arg(Arg::new("tl-amount").long("tl-amount").help("TRY amount actually spent"))
                        .arg(Arg::new("rate").long("rate").help("Purchase rate for USD debts"))
                        .arg(Arg::new("gold-tl").long("gold-tl").help("TRY value of one gram for gold debts"))
                        .arg(year_arg())
                        .arg(month_arg())
                        .arg(
                            Arg::new("recurring")
                                .long("recurring")
                                .action(ArgAction::SetTrue)
                                .help("Also create or refresh a recurring definition for this debt"),
                        ),
                )
                .subcommand(
                    Command::new("quick-borrow")
                        .about("Fast unit-denominated borrow, merged by name and currency")
                        .arg(Arg::new("currency").long("currency").default_value("USD"))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("name").long("name")),
                )
                .subcommand(
                    Command::new("quick-pay")
                        .about("Fast unit-denominated payment against the largest open debt")
                        .arg(Arg::new("currency").long("currency").default_value("USD"))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("rate").long("rate").required(true))
                        .arg(year_arg())
                        .arg(month_arg()),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a debt; booked payments stay as history")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true)),
                ),
        )
        .subcommand(
            Command::new("recurring")
                .about("Recurring payment definitions")
                .subcommand(
                    Command::new("add")
                        .about("Create a definition, or edit one with --id")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["income", "expense"])
                                .default_value("expense"),
                        )
                        .arg(
                            Arg::new("day")
                                .long("day")
                                .value_parser(value_parser!(u32))
                                .default_value("1")
                                .help("Day of month 1-28, clamped to shorter months"),
                        )
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("debt").long("debt").value_parser(value_parser!(i64)))
                        .arg(Arg::new("start").long("start").help("First month, YYYY-MM"))
                        .arg(Arg::new("end").long("end").help("Last month inclusive, YYYY-MM"))
                        .arg(Arg::new("unit-currency").long("unit-currency"))
                        .arg(Arg::new("unit-grams").long("unit-grams")),
                )
                .subcommand(json_flags(Command::new("list").about("List definitions")))
                .subcommand(
                    Command::new("toggle")
                        .about("Flip a definition active/inactive")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true)),
                )
                .subcommand(
                    Command::new("reorder")
                        .about("Set display order from an id list")
                        .arg(
                            Arg::new("ids")
                                .long("ids")
                                .value_delimiter(',')
                                .value_parser(value_parser!(i64))
                                .required(true)
                                .help("Comma-separated definition ids in the desired order"),
                        ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a definition and its projected transactions")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true)),
                )
                .subcommand(
                    Command::new("apply")
                        .about("Book a definition into a month immediately")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true))
                        .arg(year_arg())
                        .arg(month_arg()),
                ),
        )
        .subcommand(
            Command::new("saving")
                .about("Multi-currency savings")
                .subcommand(
                    Command::new("add")
                        .about("Record a saving with its paired expense")
                        .arg(Arg::new("currency").long("currency").default_value("USD"))
                        .arg(Arg::new("tl").long("tl").required(true).help("TRY amount spent"))
                        .arg(Arg::new("rate").long("rate").help("Purchase rate for USD"))
                        .arg(Arg::new("grams").long("grams").help("Gram amount for GAU"))
                        .arg(Arg::new("gold-type").long("gold-type"))
                        .arg(year_arg())
                        .arg(month_arg()),
                )
                .subcommand(
                    Command::new("edit")
                        .about("Rewrite a saving and its paired expense")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true))
                        .arg(Arg::new("currency").long("currency").help("Defaults to the saving's current currency"))
                        .arg(Arg::new("tl").long("tl").required(true).help("TRY amount spent"))
                        .arg(Arg::new("rate").long("rate").help("Purchase rate for USD"))
                        .arg(Arg::new("grams").long("grams").help("Gram amount for GAU"))
                        .arg(Arg::new("gold-type").long("gold-type")),
                )
                .subcommand(json_flags(Command::new("list").about("List savings")))
                .subcommand(
                    Command::new("delete")
                        .about("Delete a saving and its paired expense")
                        .arg(Arg::new("id").long("id").value_parser(value_parser!(i64)).required(true)),
                )
                .subcommand(
                    Command::new("quick-buy")
                        .about("Buy units at a rate; books the saving and the expense")
                        .arg(Arg::new("currency").long("currency").default_value("USD"))
                        .arg(Arg::new("units").long("units").required(true))
                        .arg(Arg::new("rate").long("rate"))
                        .arg(year_arg())
                        .arg(month_arg()),
                )
                .subcommand(
                    Command::new("quick-sell")
                        .about("Sell units at a rate; books the income and reduces savings")
                        .arg(Arg::new("currency").long("currency").default_value("USD"))
                        .arg(Arg::new("units").long("units").required(true))
                        .arg(Arg::new("rate").long("rate"))
                        .arg(year_arg())
                        .arg(month_arg()),
                ),
        )
        .subcommand(
            Command::new("category")
                .about("Income/expense categories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .value_parser(["income", "expense"])
                                .default_value("expense"),
                        ),
                )
                .subcommand(json_flags(Command::new("list"))),
        )
        .subcommand(
            Command::new("rates")
                .about("TRY exchange rates")
                .subcommand(json_flags(
                    Command::new("show")
                        .about("Show the current rate table")
                        .arg(
                            Arg::new("buying")
                                .long("buying")
                                .action(ArgAction::SetTrue)
                                .help("Buying quotes instead of selling"),
                        )
                        .arg(
                            Arg::new("all")
                                .long("all")
                                .action(ArgAction::SetTrue)
                                .help("All quoted codes, not just the core set"),
                        ),
                ))
                .subcommand(
                    Command::new("fetch").about("Fetch and cache both selling and buying tables"),
                ),
        )
}
