//! One function per subcommand. Each builds the engine component it needs,
//! drives it to completion and prints the result.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

use tally_client::{LedgerClient, LedgerError};
use tally_engine::{
    ConfirmOutcome, DeletionConfirmed, MemberPicker, SettlementBoard, TOKEN_ENV, Tally,
    TallyConfig,
};
use tally_types::{
    BoardStatus, DashboardSummary, Expense, ExpenseCategory, Group, GroupId, RowStatus,
    SETTLE_FALLBACK, User, format_money, search_by_description, split_caption,
};

use crate::{Command, ExpenseCommand, GroupCommand};

pub(crate) async fn run(command: Command, config: &TallyConfig) -> Result<()> {
    let client = LedgerClient::new(config.ledger_config()?)?;

    match command {
        Command::Login { email, password } => login(&client, &email, &password).await,
        Command::Register {
            name,
            email,
            password,
        } => {
            client.register(&name, &email, &password).await.map_err(ledger)?;
            println!("Registered {email}. Run `tally login` to get a token.");
            Ok(())
        }
        command => {
            let user = config
                .user_id()
                .context("no acting user: set [session] user_id, TALLY_USER or --user")?;
            let tally = Tally::new(Arc::new(client), user).configured(config);
            dispatch(command, &tally, config.currency()).await
        }
    }
}

async fn dispatch(command: Command, tally: &Tally, currency: &str) -> Result<()> {
    match command {
        Command::Groups => groups(tally).await,
        Command::Group(cmd) => group(cmd, tally).await,
        Command::Search { query } => {
            for user in lookup(tally, &query).await? {
                println!("{}  {} <{}>", user.id, user.name, user.email);
            }
            Ok(())
        }
        Command::Expense(ExpenseCommand::Add {
            amount,
            description,
            group,
            exclude,
        }) => add_expense(tally, &amount, &description, group.as_deref(), &exclude).await,
        Command::Expenses { search } => history(tally, search.as_deref()).await,
        Command::Dashboard => dashboard(tally).await,
        Command::Settlements { group } => settlements(tally, group.as_deref(), currency).await,
        Command::Settle { index, group } => settle(tally, index, group.as_deref()).await,
        Command::Remind { index, group } => remind(tally, index, group.as_deref()).await,
        Command::Login { .. } | Command::Register { .. } => {
            bail!("login and register run without a session")
        }
    }
}

fn ledger(err: LedgerError) -> anyhow::Error {
    anyhow!(err.user_message("Request failed"))
}

async fn login(client: &LedgerClient, email: &str, password: &str) -> Result<()> {
    let session = client.login(email, password).await.map_err(ledger)?;
    println!("Signed in as {} ({})", session.user.name, session.user.id);
    println!("export {TOKEN_ENV}={}", session.token.expose_secret());
    println!("export TALLY_USER={}", session.user.id);
    Ok(())
}

async fn groups(tally: &Tally) -> Result<()> {
    let groups = tally.roster().list_groups().await?;
    if groups.is_empty() {
        println!("You are not in any group yet.");
    }
    for group in &groups {
        println!(
            "{}  {}  ({}, balance {})",
            group.id,
            group.name,
            group.member_count_label(),
            format_money(group.total_balance)
        );
    }
    Ok(())
}

async fn group(cmd: GroupCommand, tally: &Tally) -> Result<()> {
    let roster = tally.roster();
    match cmd {
        GroupCommand::Create { name, members } => {
            let mut picker = MemberPicker::new();
            for email in &members {
                let user = resolve_user(tally, email).await?;
                if !picker.contains(&user.id) {
                    picker.toggle(&user);
                }
            }
            let group = roster
                .create_group(&name, &picker)
                .await
                .map_err(|e| anyhow!(e.user_message("Failed to create group")))?;
            println!("Created {} ({}), {}", group.name, group.id, group.member_count_label());
        }
        GroupCommand::Rename { group, name } => {
            let groups = roster.list_groups().await?;
            let target = find_group(&groups, &group)?;
            let renamed = roster
                .rename_group(target, &name)
                .await
                .map_err(|e| anyhow!(e.user_message("Failed to rename group")))?;
            println!("{}  {}", renamed.id, renamed.name);
        }
        GroupCommand::Delete { group, yes } => {
            let groups = roster.list_groups().await?;
            let target = find_group(&groups, &group)?;
            if !yes && !ask(&DeletionConfirmed::prompt(target))? {
                println!("Cancelled.");
                return Ok(());
            }
            roster
                .delete_group(target, DeletionConfirmed::for_group(target))
                .await
                .map_err(|e| anyhow!(e.user_message("Failed to delete group")))?;
            println!("Deleted {}.", target.name);
        }
        GroupCommand::AddMember { group, email } => {
            let groups = roster.list_groups().await?;
            let target = find_group(&groups, &group)?;
            let user = resolve_user(tally, &email).await?;
            let updated = roster
                .add_member(target, &user.id)
                .await
                .map_err(|e| anyhow!(e.user_message("Failed to add member")))?;
            println!("Added {} to {}, {}", user.name, updated.name, updated.member_count_label());
        }
    }
    Ok(())
}

async fn add_expense(
    tally: &Tally,
    amount: &str,
    description: &str,
    group: Option<&str>,
    exclude: &[String],
) -> Result<()> {
    let mut form = tally.expense_form();
    form.refresh_groups().await.map_err(ledger)?;

    if let Some(wanted) = group {
        let id = find_group(form.groups(), wanted)?.id.clone();
        form.switch_group(&id);
    }
    let selected = form
        .selected_group()
        .cloned()
        .context("you are not in any group yet")?;
    for who in exclude {
        let member = find_member(&selected, who)?;
        if form.split_with().contains(&member.id) {
            form.toggle_member(&member.id);
        }
    }

    form.set_amount(amount);
    form.set_description(description);
    if let Some(share) = form.preview_share() {
        println!("{} people, {share} each", form.participants().len());
    }

    match form.submit().await {
        Ok(expense) => {
            if let Some(notice) = tally.notices().current() {
                println!("{}", notice.text());
            }
            println!("{}  {} {}", expense.id, expense.description, format_money(expense.amount));
            Ok(())
        }
        Err(e) => Err(anyhow!(e.user_message())),
    }
}

async fn history(tally: &Tally, query: Option<&str>) -> Result<()> {
    let expenses = tally.expenses().await.map_err(ledger)?;
    let shown: Vec<&Expense> = match query {
        Some(q) => search_by_description(&expenses, q).collect(),
        None => expenses.iter().collect(),
    };
    if shown.is_empty() {
        println!("No expenses found.");
    }
    for expense in shown {
        let date = expense
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{date:10}  {:<24} {:>10}  [{}] {}  ({})",
            expense.description,
            format_money(expense.amount),
            ExpenseCategory::classify(&expense.description).label(),
            split_caption(expense),
            expense.group.name().unwrap_or(expense.group.id().as_str()),
        );
    }
    Ok(())
}

async fn dashboard(tally: &Tally) -> Result<()> {
    let groups = tally.roster().list_groups().await?;
    let expenses = tally.expenses().await.map_err(ledger)?;
    let summary = DashboardSummary::new(&expenses, groups.len());

    println!("Total spent:    {}", format_money(summary.total_spent));
    println!("Expenses:       {}", summary.expense_count);
    println!("Average:        {}", summary.average_display());
    println!("Active groups:  {}", summary.active_groups);
    if let Some(largest) = summary.largest {
        println!(
            "Largest:        {} ({})",
            largest.description,
            format_money(largest.amount)
        );
    }
    if !summary.recent.is_empty() {
        println!("Recent:");
        for expense in summary.recent {
            println!("  {:<24} {:>10}", expense.description, format_money(expense.amount));
        }
    }
    Ok(())
}

async fn open_board(tally: &Tally, group: Option<&str>) -> Result<SettlementBoard> {
    let board = tally.settlement_board();
    let wanted = group.map(GroupId::from);
    board.open(wanted.as_ref()).await.map_err(ledger)?;
    if let Some(wanted) = wanted
        && board.selected_group().as_ref() != Some(&wanted)
    {
        bail!("no group with id {wanted}");
    }
    Ok(board)
}

async fn settlements(tally: &Tally, group: Option<&str>, currency: &str) -> Result<()> {
    let board = open_board(tally, group).await?;
    let snapshot = board.snapshot();

    if let Some(selected) = snapshot
        .selected
        .as_ref()
        .and_then(|id| snapshot.groups.iter().find(|g| &g.id == id))
    {
        println!("{} ({})", selected.name, selected.id);
    }
    match snapshot.status {
        BoardStatus::NoGroup => println!("You are not in any group yet."),
        BoardStatus::Loading | BoardStatus::Unavailable => {
            println!("Could not load settlements.");
        }
        BoardStatus::Settled => println!("All settled up!"),
        BoardStatus::Outstanding(_) => {
            for (i, row) in snapshot.rows.iter().enumerate() {
                let tx = &row.transaction;
                let marker = match row.status {
                    RowStatus::Pending => "",
                    RowStatus::Confirming => "  (confirming)",
                };
                println!("[{i}] {} owes {} {currency}{}{marker}", tx.from, tx.to, tx.amount);
            }
        }
    }
    Ok(())
}

async fn settle(tally: &Tally, index: usize, group: Option<&str>) -> Result<()> {
    let board = open_board(tally, group).await?;
    let outcome = board.confirm(index).await;
    let notice = board.notice();
    match outcome {
        ConfirmOutcome::Settled => {
            if let Some(notice) = notice {
                println!("{}", notice.text());
            }
            match board.status() {
                BoardStatus::Settled => println!("All settled up!"),
                BoardStatus::Outstanding(n) => println!("{n} transaction(s) still outstanding."),
                BoardStatus::NoGroup | BoardStatus::Loading | BoardStatus::Unavailable => {}
            }
            Ok(())
        }
        ConfirmOutcome::SettledRefreshFailed => {
            if let Some(notice) = notice {
                println!("{}", notice.text());
            }
            println!("Could not reload settlements.");
            Ok(())
        }
        ConfirmOutcome::Failed => {
            let text = notice.map_or_else(|| SETTLE_FALLBACK.to_string(), |n| n.text().to_string());
            Err(anyhow!(text))
        }
        ConfirmOutcome::Busy => bail!("another settlement is being confirmed"),
        ConfirmOutcome::NoSuchTransaction => bail!("no outstanding transaction at index {index}"),
    }
}

async fn remind(tally: &Tally, index: usize, group: Option<&str>) -> Result<()> {
    let board = open_board(tally, group).await?;
    if !board.remind(index) {
        bail!("no outstanding transaction at index {index}");
    }
    if let Some(notice) = board.notice() {
        println!("{}", notice.text());
    }
    Ok(())
}

/// Run one directory lookup through the debounced search and wait for it.
async fn lookup(tally: &Tally, query: &str) -> Result<Vec<User>> {
    let mut search = tally.directory();
    let mut results = search.subscribe();
    let request = search.set_query(query);
    loop {
        results.changed().await.context("directory search stopped")?;
        let applied = results.borrow_and_update().clone();
        if applied.request == request {
            return Ok(applied.users);
        }
    }
}

async fn resolve_user(tally: &Tally, email: &str) -> Result<User> {
    let candidates = lookup(tally, email).await?;
    pick_user(candidates, email)
}

/// An exact email match wins; otherwise the lookup must be unambiguous.
fn pick_user(candidates: Vec<User>, email: &str) -> Result<User> {
    if let Some(exact) = candidates
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(email))
    {
        return Ok(exact.clone());
    }
    match candidates.len() {
        0 => bail!("no user found matching {email}"),
        1 => Ok(candidates.into_iter().next().context("no user found")?),
        _ => {
            let names: Vec<String> = candidates.iter().map(|u| u.email.clone()).collect();
            bail!("{email} is ambiguous: {}", names.join(", "))
        }
    }
}

/// Match by id first, then by name (case-insensitive).
fn find_group<'a>(groups: &'a [Group], wanted: &str) -> Result<&'a Group> {
    groups
        .iter()
        .find(|g| g.id.as_str() == wanted)
        .or_else(|| groups.iter().find(|g| g.name.eq_ignore_ascii_case(wanted)))
        .with_context(|| format!("no group named or with id {wanted}"))
}

fn find_member<'a>(group: &'a Group, wanted: &str) -> Result<&'a User> {
    group
        .members
        .iter()
        .find(|m| {
            m.id.as_str() == wanted
                || m.email.eq_ignore_ascii_case(wanted)
                || m.name.eq_ignore_ascii_case(wanted)
        })
        .with_context(|| format!("{wanted} is not a member of {}", group.name))
}

fn ask(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "Yes"))
}
