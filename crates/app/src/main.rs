use std::error::Error;

use chrono::Utc;
use clap::Parser;
use engine::{
    Engine, EngineError, ExpenseCmd, ExpenseListFilter, Money, SettlementCmd, SplitShare,
    UserExpenseFilter, equal_split,
};
use migration::{Migrator, MigratorTrait};

use cli::{Cli, Command, ExpenseAddArgs, ExpenseCommand, GroupCommand, UserCommand};

mod cli;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "splitbook={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;
    let engine = Engine::builder()
        .database(db)
        .walk_policy(settings.settlement.policy)
        .build()
        .await?;

    if let Err(err) = run(&engine, cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    tracing::debug!(database_url, "database ready");
    Ok(db)
}

fn acting(as_user: Option<&str>) -> Result<&str, EngineError> {
    as_user.ok_or_else(|| EngineError::Forbidden("pass --as <user> to act".to_string()))
}

async fn run(engine: &Engine, cli: Cli) -> Result<(), EngineError> {
    let as_user = cli.as_user.as_deref();
    match cli.command {
        Command::User(cli::User {
            command:
                UserCommand::Create {
                    username,
                    display_name,
                },
        }) => {
            engine.create_user(&username, &display_name).await?;
            println!("created user: {}", username.trim());
        }
        Command::Group(cli::Group { command }) => run_group(engine, command, as_user).await?,
        Command::Expense(cli::Expense { command }) => {
            run_expense(engine, command, acting(as_user)?).await?;
        }
        Command::Balances { group } => {
            for member in engine.group_balances(group, acting(as_user)?).await? {
                println!(
                    "{:<20} owes {:>10}  owed {:>10}  net {:>10}",
                    member.display_name, member.owes, member.owed, member.net
                );
            }
        }
        Command::Suggest { group } => {
            let debts = engine.suggested_settlements(group, acting(as_user)?).await?;
            if debts.is_empty() {
                println!("all settled up");
            }
            for debt in debts {
                println!("{} -> {}: {}", debt.from_id, debt.to_id, debt.amount);
            }
        }
        Command::Settle(args) => {
            let user_id = acting(as_user)?;
            let from = args.from.unwrap_or_else(|| user_id.to_string());
            let mut cmd = SettlementCmd::new(args.group, user_id, from, args.to, args.amount);
            if let Some(notes) = args.notes {
                cmd = cmd.notes(notes);
            }
            let outcome = engine.record_settlement(cmd).await?;
            let record = &outcome.record;
            println!(
                "recorded settlement {}: {} -> {} {}",
                record.id, record.from_id, record.to_id, record.amount
            );
            println!(
                "cleared {} split(s) worth {}",
                outcome.cleared.len(),
                outcome.applied
            );
            if !outcome.unapplied.is_zero() {
                println!("{} did not match any open split", outcome.unapplied);
            }
        }
        Command::Settlements { group } => {
            for record in engine.list_settlements(group, acting(as_user)?).await? {
                println!(
                    "{}  {} -> {}  {}  {}",
                    record.settled_at.format("%Y-%m-%d"),
                    record.from_id,
                    record.to_id,
                    record.amount,
                    record.notes.unwrap_or_default()
                );
            }
        }
        Command::Overview => {
            let overview = engine.user_overview(acting(as_user)?).await?;
            for group in &overview.groups {
                println!("{:<24} {:>10} {}", group.name, group.net, group.currency);
            }
            println!(
                "you owe {}, owed to you {}, net {}",
                overview.you_owe, overview.owed_to_you, overview.net
            );
        }
        Command::Pair { other } => {
            let pair = engine.pair_balance(acting(as_user)?, &other).await?;
            for group in &pair.groups {
                println!("{:<24} {:>10}", group.name, group.net);
            }
            println!("net with {}: {}", pair.other_id, pair.net);
        }
    }
    Ok(())
}

async fn run_group(
    engine: &Engine,
    command: GroupCommand,
    as_user: Option<&str>,
) -> Result<(), EngineError> {
    let user_id = acting(as_user)?;
    match command {
        GroupCommand::Create {
            name,
            description,
            currency,
        } => {
            let id = engine
                .create_group(&name, description.as_deref(), currency, user_id)
                .await?;
            let group = engine.group(id, user_id).await?;
            println!("created group {} ({id})", group.name);
            println!("invite code: {}", group.invite_code);
        }
        GroupCommand::Show { group } => {
            let group = engine.group(group, user_id).await?;
            println!("{} ({}) {}", group.name, group.id, group.currency);
            if let Some(description) = &group.description {
                println!("{description}");
            }
            println!("invite code: {}", group.invite_code);
            for member in &group.members {
                println!("  {} [{}]", member.display_name, member.role.as_str());
            }
        }
        GroupCommand::List => {
            for group in engine.list_groups(user_id).await? {
                println!(
                    "{}  {:<24} {:>2} members  net {} {}",
                    group.id, group.name, group.members, group.net, group.currency
                );
            }
        }
        GroupCommand::Update {
            group,
            name,
            description,
        } => {
            let group = engine
                .update_group(group, name.as_deref(), description.as_deref(), user_id)
                .await?;
            println!("updated group {} ({})", group.name, group.id);
        }
        GroupCommand::AddMember {
            group,
            member,
            role,
        } => {
            engine.add_member(group, &member, role, user_id).await?;
            println!("added {member} as {}", role.as_str());
        }
        GroupCommand::Join { invite_code } => {
            let id = engine.join_group(&invite_code, user_id).await?;
            println!("joined group {id}");
        }
        GroupCommand::Leave { group } => {
            engine.leave_group(group, user_id).await?;
            println!("left group {group}");
        }
        GroupCommand::RemoveMember { group, member } => {
            engine.remove_member(group, &member, user_id).await?;
            println!("removed {member}");
        }
        GroupCommand::Delete { group } => {
            engine.delete_group(group, user_id).await?;
            println!("deleted group {group}");
        }
    }
    Ok(())
}

async fn run_expense(
    engine: &Engine,
    command: ExpenseCommand,
    user_id: &str,
) -> Result<(), EngineError> {
    match command {
        ExpenseCommand::Add(args) => {
            let id = engine.create_expense(expense_cmd(args, user_id)?).await?;
            println!("created expense {id}");
        }
        ExpenseCommand::List {
            group,
            category,
            limit,
        } => {
            let filter = ExpenseListFilter {
                category,
                limit,
                ..ExpenseListFilter::default()
            };
            for expense in engine.list_expenses(group, &filter, user_id).await? {
                println!(
                    "{}  {}  {:<24} {:>10}  paid by {}",
                    expense.id,
                    expense.occurred_at.format("%Y-%m-%d"),
                    expense.description,
                    expense.amount,
                    expense.paid_by
                );
            }
        }
        ExpenseCommand::Mine {
            kind,
            limit,
            offset,
        } => {
            let filter = UserExpenseFilter {
                kind,
                limit,
                offset,
            };
            for expense in engine.list_user_expenses(&filter, user_id).await? {
                println!(
                    "{}  {}  {:<24} {:>10}  paid by {}",
                    expense.id,
                    expense.occurred_at.format("%Y-%m-%d"),
                    expense.description,
                    expense.amount,
                    expense.paid_by
                );
            }
        }
        ExpenseCommand::Show { expense } => {
            let expense = engine.expense(expense, user_id).await?;
            println!(
                "{} {} [{}] paid by {} on {}",
                expense.description,
                expense.amount,
                expense.category.as_str(),
                expense.paid_by,
                expense.occurred_at.format("%Y-%m-%d")
            );
            for split in &expense.splits {
                let state = if split.settled { "settled" } else { "open" };
                println!("  {:<20} {:>10} {state}", split.user_id, split.amount);
            }
        }
        ExpenseCommand::Delete { expense } => {
            engine.delete_expense(expense, user_id).await?;
            println!("deleted expense {expense}");
        }
    }
    Ok(())
}

fn expense_cmd(args: ExpenseAddArgs, user_id: &str) -> Result<ExpenseCmd, EngineError> {
    let shares: Vec<SplitShare> = if args.equal.is_empty() {
        args.splits
            .into_iter()
            .map(|(user, amount)| SplitShare::new(user, amount))
            .collect()
    } else {
        equal_split(args.amount, &args.equal)?
    };

    let mut cmd = ExpenseCmd::new(
        args.group,
        user_id,
        args.description,
        args.amount,
        args.date.unwrap_or_else(Utc::now),
    )
    .splits(shares);
    if let Some(paid_by) = args.paid_by {
        cmd = cmd.paid_by(paid_by);
    }
    if let Some(category) = args.category {
        cmd = cmd.category(category);
    }
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_flag_builds_even_shares() {
        let Cli {
            command:
                Command::Expense(cli::Expense {
                    command: ExpenseCommand::Add(args),
                }),
            ..
        } = Cli::try_parse_from([
            "splitbook",
            "expense",
            "add",
            "6f1b0d8e-8a53-4f7e-9d1c-2f3b4a5c6d7e",
            "taxi",
            "100",
            "--equal",
            "a,b,c",
        ])
        .unwrap()
        else {
            panic!("expected expense add");
        };
        let cmd = expense_cmd(args, "a").unwrap();
        let amounts: Vec<Money> = cmd.splits.iter().map(|s| s.amount).collect();
        assert_eq!(
            amounts,
            vec![Money::new(3334), Money::new(3333), Money::new(3333)]
        );
        assert_eq!(cmd.paid_by, "a");
    }
}
