//! Command handlers. Every successful mutation is followed by an autosave.

use std::fs;

use uuid::Uuid;

use crate::currency::{format_amount, parse_amount};
use crate::errors::SessionError;
use crate::exchange;
use crate::ledger::{Allocation, Contributor, Item, PLACEHOLDER_DESCRIPTION};
use crate::session::{ContributorPatch, EditSession, EntityKey, ItemPatch};
use crate::settlement::SettlementEngine;

use super::core::{CommandError, CommandResult, ShellContext};
use super::output;

pub(crate) type Handler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// What a command takes as its first argument, used for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    Nothing,
    Person,
    BatchAction,
    Path,
    Command,
}

pub(crate) struct Command {
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub operand: Operand,
    pub run: Handler,
}

const fn command(
    name: &'static str,
    summary: &'static str,
    usage: &'static str,
    operand: Operand,
    run: Handler,
) -> Command {
    Command {
        name,
        summary,
        usage,
        operand,
        run,
    }
}

/// Every shell command, in the order `help` lists them.
pub(crate) const COMMANDS: &[Command] = &[
    command(
        "add",
        "Record a contribution, creating the person if needed",
        "add <name> [amount] [description]",
        Operand::Person,
        cmd_add,
    ),
    command(
        "edit-item",
        "Change the amount and description of an item",
        "edit-item <name> <item#> <amount> [description]",
        Operand::Person,
        cmd_edit_item,
    ),
    command(
        "delete-item",
        "Delete one of a person's items",
        "delete-item <name> <item#>",
        Operand::Person,
        cmd_delete_item,
    ),
    command(
        "edit-person",
        "Rename a person and/or change how they pay",
        "edit-person <name> [new-name] [share <weight> | fixed <amount>]",
        Operand::Person,
        cmd_edit_person,
    ),
    command(
        "remove",
        "Remove a person and all of their items",
        "remove <name>",
        Operand::Person,
        cmd_remove,
    ),
    command("list", "Show everyone and their items", "list", Operand::Nothing, cmd_list),
    command(
        "summary",
        "Show totals, cost per share, and balances",
        "summary",
        Operand::Nothing,
        cmd_summary,
    ),
    command("settle", "Show who pays whom", "settle", Operand::Nothing, cmd_settle),
    command("clear", "Remove everyone", "clear", Operand::Nothing, cmd_clear),
    command(
        "batch",
        "Stage several edits and apply them together",
        "batch begin | set <name> (name <new> | share <weight> | fixed <amount>) | item <name> <item#> (description <text> | amount <amount>) | show | commit | rollback",
        Operand::BatchAction,
        cmd_batch,
    ),
    command(
        "import",
        "Replace everything with people from a JSON file",
        "import <path>",
        Operand::Path,
        cmd_import,
    ),
    command(
        "export",
        "Write everyone to a JSON file, or print it",
        "export [path]",
        Operand::Path,
        cmd_export,
    ),
    command("help", "Show available commands", "help [command]", Operand::Command, cmd_help),
    command("exit", "Leave the shell", "exit", Operand::Nothing, cmd_exit),
];

/// `batch` sub-actions; `set` and `item` are followed by a person.
pub(crate) const BATCH_ACTIONS: &[&str] = &["begin", "set", "item", "show", "commit", "rollback"];

pub(crate) fn find(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|command| command.name == name)
}

fn cmd_add(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = required(args, 0, "add <name> [amount] [description]")?;
    let amount = match args.get(1) {
        Some(raw) => parse_amount(raw)?,
        None => None,
    };
    let description = rest(args, 2);
    let weight = ctx.config.share_weight();
    let reference = ctx.store.add_contribution(
        name,
        description.as_deref(),
        amount,
        weight,
    )?;
    ctx.autosave();
    if let Some(contributor) = ctx.store.contributor(reference.contributor) {
        match contributor.item(reference.item) {
            Some(item) if !item.is_placeholder() => output::success(format!(
                "{} now has {} for {}.",
                contributor.name,
                format_amount(item.amount),
                item.description
            )),
            _ => output::success(format!("Added {} with no contributions yet.", contributor.name)),
        }
    }
    Ok(())
}

fn cmd_edit_item(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "edit-item <name> <item#> <amount> [description]";
    let (contributor_id, item) = lookup_item(ctx, args, USAGE)?;
    let amount = parse_amount(required(args, 2, USAGE)?)?.unwrap_or(0.0);
    let current = ctx.store.start_item_edit(contributor_id, item.id)?;
    let description = match rest(args, 3) {
        Some(description) => description,
        None if current.description == PLACEHOLDER_DESCRIPTION => String::new(),
        None => current.description.clone(),
    };
    if let Err(err) = ctx
        .store
        .edit_item(contributor_id, item.id, &description, amount)
    {
        ctx.store.cancel_edit();
        return Err(err.into());
    }
    ctx.autosave();
    output::success("Item updated.");
    Ok(())
}

fn cmd_delete_item(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (contributor_id, item) = lookup_item(ctx, args, "delete-item <name> <item#>")?;
    ctx.store.delete_item(contributor_id, item.id)?;
    ctx.autosave();
    output::success(format!("Deleted `{}`.", item.description));
    Ok(())
}

fn cmd_edit_person(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "edit-person <name> [new-name] [share <weight> | fixed <amount>]";
    let name = required(args, 0, USAGE)?;
    let id = ctx.person(name)?.id;
    let current = ctx.store.start_contributor_edit(id)?;

    let tail = &args[1..];
    let (new_name, mode_args) = match tail {
        [mode, ..] if is_mode(mode) => (current.name.clone(), tail),
        [new_name, rest @ ..] => (new_name.to_string(), rest),
        [] => {
            ctx.store.cancel_edit();
            return Err(CommandError::InvalidArguments(format!("Usage: {USAGE}")));
        }
    };
    let allocation = match parse_allocation(mode_args, USAGE) {
        Ok(Some(allocation)) => allocation,
        Ok(None) => current.allocation,
        Err(err) => {
            ctx.store.cancel_edit();
            return Err(err);
        }
    };
    if let Err(err) = ctx.store.edit_contributor(id, &new_name, allocation) {
        ctx.store.cancel_edit();
        return Err(err.into());
    }
    ctx.autosave();
    output::success(format!("{} now pays by {allocation}.", new_name.trim()));
    Ok(())
}

fn cmd_remove(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = required(args, 0, "remove <name>")?;
    let id = ctx.person(name)?.id;
    let removed = ctx.store.remove_contributor(id)?;
    ctx.autosave();
    output::success(format!("Removed {}.", removed.name));
    Ok(())
}

fn cmd_list(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if ctx.store.is_empty() {
        output::info("Nobody has been added yet.");
        return Ok(());
    }
    output::section("People");
    print_people(ctx.store.contributors());
    Ok(())
}

fn cmd_summary(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let contributors = ctx.store.contributors();
    let summary = SettlementEngine::summary(contributors);
    output::section("Summary");
    println!("Total spent:      {}", format_amount(summary.total));
    println!("Fixed payments:   {}", format_amount(summary.fixed_total));
    println!("Split by share:   {}", format_amount(summary.remaining));
    println!("Total shares:     {}", summary.total_shares);
    println!("Cost per share:   {}", format_amount(summary.cost_per_share));
    if contributors.is_empty() {
        return Ok(());
    }
    let rows: Vec<Vec<String>> = SettlementEngine::balances(contributors)
        .into_iter()
        .map(|balance| {
            vec![
                balance.name,
                format_amount(balance.contributed),
                format_amount(balance.owes),
                format_amount(balance.balance),
            ]
        })
        .collect();
    output::render_table(&["Name", "Paid", "Owes", "Balance"], &rows);
    Ok(())
}

fn cmd_settle(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let transfers = SettlementEngine::settle(ctx.store.contributors());
    if transfers.is_empty() {
        output::info("Everyone is settled up.");
        return Ok(());
    }
    output::section("Settlement");
    for transfer in transfers {
        println!(
            "{} pays {} {}",
            transfer.from_name,
            transfer.to_name,
            format_amount(transfer.amount)
        );
    }
    Ok(())
}

fn cmd_clear(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if ctx.store.is_empty() {
        output::info("Nothing to clear.");
        return Ok(());
    }
    if !ctx.confirm("Remove everyone and all of their items?")? {
        output::info("Clear cancelled.");
        return Ok(());
    }
    ctx.store.clear()?;
    ctx.autosave();
    output::success("Cleared everyone.");
    Ok(())
}

fn cmd_batch(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let action = required(args, 0, "batch begin|set|item|show|commit|rollback")?;
    let args = &args[1..];
    match action.to_lowercase().as_str() {
        "begin" => {
            if ctx.session.as_ref().is_some_and(EditSession::is_open) {
                return Err(SessionError::AlreadyOpen.into());
            }
            ctx.session = Some(EditSession::begin(&mut ctx.store)?);
            output::success("Batch edit started. Stage changes, then `batch commit`.");
        }
        "set" => {
            const USAGE: &str = "batch set <name> (name <new> | share <weight> | fixed <amount>)";
            let id = ctx.person(required(args, 0, USAGE)?)?.id;
            let field = required(args, 1, USAGE)?;
            let patch = if field.eq_ignore_ascii_case("name") {
                ContributorPatch::name(rest(args, 2).unwrap_or_default())
            } else {
                match parse_allocation(&args[1..], USAGE)? {
                    Some(Allocation::Share { weight }) => ContributorPatch::share(weight),
                    Some(Allocation::Fixed { amount }) => ContributorPatch::fixed(amount),
                    None => return Err(CommandError::InvalidArguments(format!("Usage: {USAGE}"))),
                }
            };
            open_session(ctx)?.stage(EntityKey::Contributor(id), patch)?;
            output::info("Staged.");
        }
        "item" => {
            const USAGE: &str =
                "batch item <name> <item#> (description <text> | amount <amount>)";
            let (contributor_id, item) = lookup_item(ctx, args, USAGE)?;
            let field = required(args, 2, USAGE)?.to_lowercase();
            let patch = match field.as_str() {
                "description" => ItemPatch::description(rest(args, 3).unwrap_or_default()),
                "amount" => {
                    ItemPatch::amount(parse_amount(required(args, 3, USAGE)?)?.unwrap_or(0.0))
                }
                _ => return Err(CommandError::InvalidArguments(format!("Usage: {USAGE}"))),
            };
            open_session(ctx)?.stage(EntityKey::item(contributor_id, item.id), patch)?;
            output::info("Staged.");
        }
        "show" => {
            let preview = open_session(ctx)?.preview();
            output::section("Batch preview");
            print_people(&preview);
        }
        "commit" => {
            let session = ctx.session.as_mut().ok_or(SessionError::NotOpen)?;
            session.commit(&mut ctx.store)?;
            ctx.session = None;
            ctx.autosave();
            output::success("Batch edit committed.");
        }
        "rollback" => {
            let session = ctx.session.as_mut().ok_or(SessionError::NotOpen)?;
            session.rollback(&mut ctx.store)?;
            ctx.session = None;
            output::success("Batch edit discarded.");
        }
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "Unknown batch action `{other}`"
            )))
        }
    }
    Ok(())
}

fn cmd_import(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = required(args, 0, "import <path>")?;
    let data = fs::read_to_string(path)?;
    let count = exchange::import_json(&mut ctx.store, &data)?;
    ctx.autosave();
    output::success(format!("Imported {count} people from {path}."));
    Ok(())
}

fn cmd_export(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let json = exchange::export_json(&ctx.store)?;
    match args.first() {
        Some(path) => {
            fs::write(path, json)?;
            output::success(format!("Exported {} people to {path}.", ctx.store.len()));
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_help(_ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        let Some(command) = find(&name.to_lowercase()) else {
            return Err(CommandError::InvalidArguments(format!(
                "Unknown command `{name}`"
            )));
        };
        println!("{}: {}", command.name, command.summary);
        println!("usage: {}", command.usage);
        return Ok(());
    }
    output::section("Commands");
    let rows: Vec<Vec<String>> = COMMANDS
        .iter()
        .map(|command| vec![command.name.to_string(), command.summary.to_string()])
        .collect();
    output::render_table(&["Command", "Description"], &rows);
    Ok(())
}

fn cmd_exit(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if let Some(session) = ctx.session.as_ref().filter(|s| s.is_open()) {
        output::warning(format!(
            "Discarding {} staged change(s) from the open batch.",
            session.staged_count()
        ));
    }
    Err(CommandError::ExitRequested)
}

fn open_session(ctx: &mut ShellContext) -> Result<&mut EditSession, CommandError> {
    ctx.session
        .as_mut()
        .filter(|session| session.is_open())
        .ok_or_else(|| SessionError::NotOpen.into())
}

fn required<'a>(args: &[&'a str], index: usize, usage: &str) -> Result<&'a str, CommandError> {
    args.get(index)
        .copied()
        .ok_or_else(|| CommandError::InvalidArguments(format!("Usage: {usage}")))
}

/// Joins the remaining arguments into one phrase.
fn rest(args: &[&str], from: usize) -> Option<String> {
    args.get(from..)
        .filter(|tail| !tail.is_empty())
        .map(|tail| tail.join(" "))
}

fn is_mode(token: &str) -> bool {
    token.eq_ignore_ascii_case("share") || token.eq_ignore_ascii_case("fixed")
}

fn parse_allocation(args: &[&str], usage: &str) -> Result<Option<Allocation>, CommandError> {
    let Some(mode) = args.first() else {
        return Ok(None);
    };
    let value = required(args, 1, usage)?;
    match mode.to_lowercase().as_str() {
        "share" => value.parse::<u8>().map(|w| Some(Allocation::share(w))).map_err(|_| {
            CommandError::InvalidArguments(format!("`{value}` is not a share weight"))
        }),
        "fixed" => {
            let amount = parse_amount(value)?.ok_or_else(|| {
                CommandError::InvalidArguments("Enter the fixed amount".into())
            })?;
            Ok(Some(Allocation::fixed(amount)))
        }
        _ => Err(CommandError::InvalidArguments(format!("Usage: {usage}"))),
    }
}

/// Resolves `<name> <item#>` (1-based, as shown by `list`).
fn lookup_item(
    ctx: &ShellContext,
    args: &[&str],
    usage: &str,
) -> Result<(Uuid, Item), CommandError> {
    let contributor = ctx.person(required(args, 0, usage)?)?;
    let raw = required(args, 1, usage)?;
    let item = raw
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| contributor.items.get(index))
        .ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "{} has no item #{raw}",
                contributor.name
            ))
        })?;
    Ok((contributor.id, item.clone()))
}

fn print_people(contributors: &[Contributor]) {
    let mut rows = Vec::new();
    for contributor in contributors {
        for (index, item) in contributor.items.iter().enumerate() {
            let (name, pays) = if index == 0 {
                (contributor.name.clone(), contributor.allocation.to_string())
            } else {
                (String::new(), String::new())
            };
            rows.push(vec![
                name,
                pays,
                (index + 1).to_string(),
                item.description.clone(),
                format_amount(item.amount),
            ]);
        }
    }
    output::render_table(&["Name", "Pays", "#", "Item", "Amount"], &rows);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::core::CliMode;
    use crate::config::Config;
    use crate::errors::ValidationError;
    use crate::storage::{MemoryStorage, PersistenceAdapter};
    use std::sync::Arc;

    struct SharedStorage(Arc<MemoryStorage>);

    impl PersistenceAdapter for SharedStorage {
        fn load(&self) -> crate::storage::Result<Option<crate::ledger::LedgerSnapshot>> {
            self.0.load()
        }
        fn save(&self, snapshot: &crate::ledger::LedgerSnapshot) -> crate::storage::Result<()> {
            self.0.save(snapshot)
        }
        fn clear(&self) -> crate::storage::Result<()> {
            self.0.clear()
        }
    }

    fn context() -> (ShellContext, Arc<MemoryStorage>) {
        let memory = Arc::new(MemoryStorage::new());
        let ctx = ShellContext::with_parts(
            CliMode::Script,
            Box::new(SharedStorage(Arc::clone(&memory))),
            Config::default(),
        );
        (ctx, memory)
    }

    fn run(ctx: &mut ShellContext, line: &str) -> Result<(), CommandError> {
        ctx.process_line(line).map(|_| ())
    }

    #[test]
    fn command_names_are_unique_and_usages_start_with_them() {
        let mut seen = std::collections::HashSet::new();
        for command in COMMANDS {
            assert!(seen.insert(command.name), "{} listed twice", command.name);
            assert!(command.usage.starts_with(command.name), "{}", command.name);
            assert_eq!(find(command.name).map(|found| found.summary), Some(command.summary));
        }
        assert!(find("frobnicate").is_none());
    }

    #[test]
    fn add_merges_and_autosaves() {
        let (mut ctx, memory) = context();
        run(&mut ctx, "add Sam 10 Lunch").unwrap();
        run(&mut ctx, "add sam 5 lunch").unwrap();
        let sam = ctx.store().find_by_name("SAM").unwrap();
        assert_eq!(sam.items.len(), 1);
        assert_eq!(sam.items[0].amount, 15.0);
        assert!(memory.raw().unwrap().contains("Lunch"));
    }

    #[test]
    fn add_without_amount_creates_placeholder() {
        let (mut ctx, _) = context();
        run(&mut ctx, "add Kim").unwrap();
        let kim = ctx.store().find_by_name("Kim").unwrap();
        assert_eq!(kim.items[0].description, PLACEHOLDER_DESCRIPTION);
    }

    #[test]
    fn edit_person_switches_to_fixed() {
        let (mut ctx, _) = context();
        run(&mut ctx, "add Sam 100 Hotel").unwrap();
        run(&mut ctx, "add Kim 20 Fuel").unwrap();
        run(&mut ctx, "edit-person Kim Kimberly fixed 30").unwrap();
        let kim = ctx.store().find_by_name("Kimberly").unwrap();
        assert_eq!(kim.allocation, Allocation::fixed(30.0));

        let err = run(&mut ctx, "edit-person Sam fixed 10").unwrap_err();
        assert!(matches!(
            err,
            CommandError::Validation(ValidationError::NoShareContributor)
        ));
    }

    #[test]
    fn edit_item_keeps_description_when_omitted() {
        let (mut ctx, _) = context();
        run(&mut ctx, "add Sam 10 Lunch").unwrap();
        run(&mut ctx, "edit-item Sam 1 12.5").unwrap();
        let sam = ctx.store().find_by_name("Sam").unwrap();
        assert_eq!(sam.items[0].description, "Lunch");
        assert_eq!(sam.items[0].amount, 12.5);
    }

    #[test]
    fn unknown_item_index_is_an_argument_error() {
        let (mut ctx, _) = context();
        run(&mut ctx, "add Sam 10 Lunch").unwrap();
        assert!(matches!(
            run(&mut ctx, "delete-item Sam 3"),
            Err(CommandError::InvalidArguments(_))
        ));
    }

    #[test]
    fn batch_blocks_direct_edits_until_commit() {
        let (mut ctx, _) = context();
        run(&mut ctx, "add Sam 10 Lunch").unwrap();
        run(&mut ctx, "batch begin").unwrap();
        run(&mut ctx, "batch set Sam name Samuel").unwrap();
        run(&mut ctx, "batch item Sam 1 amount 25").unwrap();
        assert!(matches!(
            run(&mut ctx, "add Kim 5 Fuel"),
            Err(CommandError::Validation(ValidationError::EditSessionOpen))
        ));
        run(&mut ctx, "batch commit").unwrap();
        let samuel = ctx.store().find_by_name("Samuel").unwrap();
        assert_eq!(samuel.items[0].amount, 25.0);
        run(&mut ctx, "add Kim 5 Fuel").unwrap();
    }

    #[test]
    fn batch_rollback_restores_original() {
        let (mut ctx, _) = context();
        run(&mut ctx, "add Sam 10 Lunch").unwrap();
        run(&mut ctx, "batch begin").unwrap();
        run(&mut ctx, "batch set Sam name Samuel").unwrap();
        run(&mut ctx, "batch rollback").unwrap();
        assert!(ctx.store().find_by_name("Sam").is_some());
        assert!(matches!(
            run(&mut ctx, "batch commit"),
            Err(CommandError::Session(SessionError::NotOpen))
        ));
    }

    #[test]
    fn clear_in_script_mode_skips_confirmation() {
        let (mut ctx, memory) = context();
        run(&mut ctx, "add Sam 10 Lunch").unwrap();
        run(&mut ctx, "clear").unwrap();
        assert!(ctx.store().is_empty());
        assert!(memory.raw().is_none());
    }
}
