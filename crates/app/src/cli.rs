//! Command line definition.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Currency, ExpenseCategory, MemberRole, Money, UserExpenseKind};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "splitbook")]
#[command(about = "Split shared expenses and settle up inside a group")]
pub struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    /// Overrides the configured database.
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Acting user.
    #[arg(long = "as", env = "SPLITBOOK_USER", global = true)]
    pub as_user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    User(User),
    Group(Group),
    Expense(Expense),
    /// Per-member owes/owed/net of a group.
    Balances { group: Uuid },
    /// Minimal list of payments that clears a group.
    Suggest { group: Uuid },
    /// Record a payment between two members.
    Settle(SettleArgs),
    /// Settlement history of a group.
    Settlements { group: Uuid },
    /// Your net position across every group.
    Overview,
    /// Your net position with another user.
    Pair { other: String },
}

#[derive(Args, Debug)]
pub struct User {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Create {
        username: String,
        #[arg(long, default_value = "")]
        display_name: String,
    },
}

#[derive(Args, Debug)]
pub struct Group {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_currency)]
        currency: Option<Currency>,
    },
    Show {
        group: Uuid,
    },
    List,
    /// Rename the group or change its description (admin-only).
    Update {
        group: Uuid,
        #[arg(long)]
        name: Option<String>,
        /// An empty value clears the description.
        #[arg(long)]
        description: Option<String>,
    },
    AddMember {
        group: Uuid,
        member: String,
        #[arg(long, default_value = "member", value_parser = parse_role)]
        role: MemberRole,
    },
    Join {
        invite_code: String,
    },
    Leave {
        group: Uuid,
    },
    RemoveMember {
        group: Uuid,
        member: String,
    },
    Delete {
        group: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct Expense {
    #[command(subcommand)]
    pub command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    Add(ExpenseAddArgs),
    List {
        group: Uuid,
        #[arg(long, value_parser = parse_category)]
        category: Option<ExpenseCategory>,
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Your expenses across every group.
    Mine {
        /// One of `all`, `paid`, `owe`, `owed`.
        #[arg(long, default_value = "all", value_parser = parse_kind)]
        kind: UserExpenseKind,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
    },
    Show {
        expense: Uuid,
    },
    Delete {
        expense: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct ExpenseAddArgs {
    pub group: Uuid,
    pub description: String,
    pub amount: Money,
    /// Defaults to the acting user.
    #[arg(long)]
    pub paid_by: Option<String>,
    #[arg(long, value_parser = parse_category)]
    pub category: Option<ExpenseCategory>,
    /// Expense date, `YYYY-MM-DD` (defaults to now).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<DateTime<Utc>>,
    /// Explicit share, `user=amount`; repeatable.
    #[arg(long = "split", value_parser = parse_share, conflicts_with = "equal")]
    pub splits: Vec<(String, Money)>,
    /// Split equally between these users.
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub equal: Vec<String>,
}

#[derive(Args, Debug)]
pub struct SettleArgs {
    pub group: Uuid,
    /// Who receives the payment.
    pub to: String,
    pub amount: Money,
    /// Who pays (defaults to the acting user).
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

fn parse_role(raw: &str) -> Result<MemberRole, String> {
    MemberRole::try_from(raw).map_err(|err| err.to_string())
}

fn parse_category(raw: &str) -> Result<ExpenseCategory, String> {
    ExpenseCategory::try_from(raw).map_err(|err| err.to_string())
}

fn parse_kind(raw: &str) -> Result<UserExpenseKind, String> {
    UserExpenseKind::try_from(raw).map_err(|err| err.to_string())
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| format!("invalid date `{raw}`: {err}"))?;
    date.and_hms_opt(12, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date `{raw}`"))
}

fn parse_share(raw: &str) -> Result<(String, Money), String> {
    let (user, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected user=amount, got `{raw}`"))?;
    let user = user.trim();
    if user.is_empty() {
        return Err(format!("missing user in `{raw}`"));
    }
    let amount = amount.parse::<Money>().map_err(|err| err.to_string())?;
    Ok((user.to_string(), amount))
}
