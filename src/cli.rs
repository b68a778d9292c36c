// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_flags(c: Command) -> Command {
    c.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    )
}

fn req(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn split_args(c: Command, required: bool) -> Command {
    c.arg(opt("company", "Company share in percent").required(required))
        .arg(opt("team", "Team pool share in percent").required(required))
        .arg(opt("finder", "Finder commission in percent").required(required))
}

pub fn build_cli() -> Command {
    Command::new("taskledger")
        .about("Project budgets, profit splits, task commissions and wallets")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("config")
                .about("Display settings")
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("user")
                .about("People who can be assigned tasks")
                .subcommand(
                    Command::new("add")
                        .arg(req("name", "Unique user name, used for @mentions"))
                        .arg(opt("email", "Contact address")),
                )
                .subcommand(json_flags(Command::new("list")))
                .subcommand(Command::new("rm").arg(req("name", "User name"))),
        )
        .subcommand(
            Command::new("org")
                .about("Organizations and their members")
                .subcommand(Command::new("add").arg(req("name", "Organization name")))
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("member")
                        .arg(req("org", "Organization name"))
                        .arg(req("user", "User name"))
                        .arg(opt("role", "Member role").default_value("member")),
                )
                .subcommand(Command::new("members").arg(req("org", "Organization name"))),
        )
        .subcommand(
            Command::new("project")
                .about("Projects and their profit split")
                .subcommand(split_args(
                    Command::new("add")
                        .arg(req("org", "Owning organization"))
                        .arg(req("name", "Project name"))
                        .arg(req("budget", "Project budget"))
                        .arg(opt("finder-user", "User credited with the finder commission")),
                    false,
                ))
                .subcommand(json_flags(
                    Command::new("list").arg(opt("org", "Only this organization")),
                ))
                .subcommand(json_flags(
                    Command::new("show").arg(req("project", "Project id or name")),
                ))
                .subcommand(split_args(
                    Command::new("split").arg(req("project", "Project id or name")),
                    true,
                ))
                .subcommand(
                    Command::new("budget")
                        .arg(req("project", "Project id or name"))
                        .arg(req("amount", "New budget")),
                )
                .subcommand(Command::new("freeze").arg(req("project", "Project id or name")))
                .subcommand(Command::new("unfreeze").arg(req("project", "Project id or name")))
                .subcommand(Command::new("recalc").arg(req("project", "Project id or name")))
                .subcommand(Command::new("rm").arg(req("project", "Project id or name"))),
        )
        .subcommand(
            Command::new("expense")
                .about("Project expenses")
                .subcommand(
                    Command::new("add")
                        .arg(req("project", "Project id or name"))
                        .arg(req("amount", "Expense amount"))
                        .arg(opt("kind", "direct|overhead").default_value("direct"))
                        .arg(opt("date", "YYYY-MM-DD, defaults to today"))
                        .arg(opt("note", "Free text")),
                )
                .subcommand(json_flags(
                    Command::new("list").arg(req("project", "Project id or name")),
                )),
        )
        .subcommand(
            Command::new("column")
                .about("Kanban columns")
                .subcommand(
                    Command::new("add")
                        .arg(req("project", "Project id or name"))
                        .arg(req("name", "Column name"))
                        .arg(
                            opt("position", "Sort position, appended when omitted")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(
                            Arg::new("done")
                                .long("done")
                                .action(ArgAction::SetTrue)
                                .help("Tasks in this column count as completed"),
                        ),
                )
                .subcommand(Command::new("list").arg(req("project", "Project id or name"))),
        )
        .subcommand(
            Command::new("task")
                .about("Tasks on the board")
                .subcommand(
                    Command::new("add")
                        .arg(req("project", "Project id or name"))
                        .arg(req("title", "Task title"))
                        .arg(opt("description", "Details, @mentions notify users"))
                        .arg(opt("assignee", "User name"))
                        .arg(opt("priority", "low|medium|high|urgent").default_value("medium"))
                        .arg(opt("due", "YYYY-MM-DD or YYYY-MM-DDTHH:MM"))
                        .arg(opt("weight", "Share of the team pool").default_value("1"))
                        .arg(opt("by", "Author, not notified of own mentions")),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(req("project", "Project id or name"))
                        .arg(opt("assignee", "Only tasks of this user")),
                ))
                .subcommand(
                    Command::new("move")
                        .arg(req("id", "Task id").value_parser(value_parser!(i64)))
                        .arg(req("column", "Target column name")),
                )
                .subcommand(
                    Command::new("assign")
                        .arg(req("id", "Task id").value_parser(value_parser!(i64)))
                        .arg(opt("user", "User name, omit to unassign")),
                )
                .subcommand(
                    Command::new("comment")
                        .arg(req("id", "Task id").value_parser(value_parser!(i64)))
                        .arg(req("text", "Comment, @mentions notify users"))
                        .arg(opt("by", "Author")),
                )
                .subcommand(
                    Command::new("rm").arg(req("id", "Task id").value_parser(value_parser!(i64))),
                ),
        )
        .subcommand(
            Command::new("commission")
                .about("Per-task commissions")
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(req("org", "Organization name"))
                        .arg(opt("project", "Project id or name"))
                        .arg(opt("status", "pending|confirmed|frozen")),
                ))
                .subcommand(
                    Command::new("edit")
                        .arg(req("id", "Commission id").value_parser(value_parser!(i64)))
                        .arg(opt("amount", "New amount"))
                        .arg(opt("status", "pending|confirmed|frozen")),
                )
                .subcommand(
                    Command::new("reset")
                        .arg(req("id", "Commission id").value_parser(value_parser!(i64))),
                ),
        )
        .subcommand(
            Command::new("wallet")
                .about("User wallets")
                .subcommand(json_flags(
                    Command::new("show").arg(req("user", "User name")),
                ))
                .subcommand(
                    Command::new("target")
                        .arg(req("user", "User name"))
                        .arg(req("amount", "Monthly earnings goal")),
                ),
        )
        .subcommand(
            Command::new("notify")
                .about("Notifications")
                .subcommand(json_flags(
                    Command::new("list").arg(req("user", "User name")).arg(
                        Arg::new("unread")
                            .long("unread")
                            .action(ArgAction::SetTrue)
                            .help("Only unread notifications"),
                    ),
                ))
                .subcommand(
                    Command::new("read")
                        .arg(
                            opt("id", "Notification id")
                                .value_parser(value_parser!(i64))
                                .required_unless_present("user"),
                        )
                        .arg(opt("user", "Mark everything for this user as read")),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Dashboards")
                .subcommand(json_flags(
                    Command::new("org").arg(req("org", "Organization name")),
                ))
                .subcommand(json_flags(
                    Command::new("deadlines")
                        .arg(req("org", "Organization name"))
                        .arg(opt("now", "Reference time, defaults to the local clock")),
                )),
        )
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand(
                    Command::new("commissions")
                        .arg(req("org", "Organization name"))
                        .arg(opt("format", "csv|json").default_value("csv"))
                        .arg(req("out", "Output file")),
                ),
        )
        .subcommand(
            Command::new("migrate")
                .about("Apply ordered SQL files and record the outcome")
                .arg(req("dir", "Directory of *.sql files")),
        )
        .subcommand(Command::new("doctor").about("Report data problems"))
}
