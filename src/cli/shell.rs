use std::{
    borrow::Cow,
    io::{self, BufRead},
};

use colored::Colorize;
use rustyline::{
    completion::{Completer, FilenameCompleter, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;
use thiserror::Error;

use crate::cli::commands::{self, Operand, BATCH_ACTIONS, COMMANDS};
use crate::cli::core::{CliMode, LoopControl, ShellContext};
use crate::cli::output;
use crate::errors::CliError;

const SCRIPT_ENV: &str = "SPLITSIES_CLI_SCRIPT";

#[derive(Debug, Error)]
#[error("Could not parse input: {message}")]
pub(crate) struct ParseError {
    message: String,
}

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<LedgerHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(LedgerHelper::default()));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
    output::info("Type `help` to list commands.");

    while context.running {
        if let Some(helper) = editor.helper_mut() {
            helper.people = context.people();
        }
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                if run_line(context, trimmed) == LoopControl::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm("Exit shell?").unwrap_or(true) {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    for line in io::stdin().lock().lines() {
        if !context.running || run_line(context, &line?) == LoopControl::Exit {
            break;
        }
    }
    Ok(())
}

fn run_line(context: &mut ShellContext, line: &str) -> LoopControl {
    context.process_line(line).unwrap_or_else(|err| {
        context.report_error(err);
        LoopControl::Continue
    })
}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

/// Where the word under the cursor begins and what it should complete to.
#[derive(Debug, PartialEq)]
pub(crate) enum Completion {
    Words { start: usize, words: Vec<String> },
    Path,
}

/// Completes command names, `batch` actions, person names, and file paths.
///
/// Names containing whitespace are offered quoted. An open quote in `prefix`
/// keeps the quoted text together as one word.
pub(crate) fn complete_words(prefix: &str, people: &[String]) -> Completion {
    let start = if prefix.matches('"').count() % 2 == 1 {
        prefix.rfind('"').unwrap_or(0)
    } else {
        prefix.rfind(char::is_whitespace).map_or(0, |index| index + 1)
    };
    let before: Vec<String> = prefix[..start]
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let pool: Vec<String> = match before.as_slice() {
        [] => command_names(),
        [name] => match commands::find(name).map(|command| command.operand) {
            Some(Operand::Person) => quoted(people),
            Some(Operand::BatchAction) => BATCH_ACTIONS.iter().map(|a| a.to_string()).collect(),
            Some(Operand::Command) => command_names(),
            Some(Operand::Path) => return Completion::Path,
            Some(Operand::Nothing) | None => Vec::new(),
        },
        [batch, action] if batch == "batch" && (action == "set" || action == "item") => {
            quoted(people)
        }
        _ => Vec::new(),
    };

    let needle = prefix[start..].trim_start_matches('"').to_lowercase();
    let words = pool
        .into_iter()
        .filter(|word| word.trim_start_matches('"').to_lowercase().starts_with(&needle))
        .collect();
    Completion::Words { start, words }
}

/// Usage text still to be typed after `<command> `.
pub(crate) fn usage_hint(line: &str) -> Option<String> {
    let name = line.strip_suffix(' ')?;
    if name.contains(char::is_whitespace) {
        return None;
    }
    let command = commands::find(&name.to_lowercase())?;
    command
        .usage
        .strip_prefix(command.name)
        .map(str::trim_start)
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

fn command_names() -> Vec<String> {
    COMMANDS.iter().map(|command| command.name.to_string()).collect()
}

fn quoted(people: &[String]) -> Vec<String> {
    people
        .iter()
        .map(|name| {
            if name.contains(char::is_whitespace) {
                format!("\"{name}\"")
            } else {
                name.clone()
            }
        })
        .collect()
}

#[derive(Default)]
struct LedgerHelper {
    people: Vec<String>,
    files: FilenameCompleter,
}

impl Helper for LedgerHelper {}

impl Completer for LedgerHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        match complete_words(&line[..pos], &self.people) {
            Completion::Path => self.files.complete_path(line, pos),
            Completion::Words { start, words } => Ok((
                start,
                words
                    .into_iter()
                    .map(|word| Pair {
                        display: word.trim_matches('"').to_string(),
                        replacement: word,
                    })
                    .collect(),
            )),
        }
    }
}

impl Hinter for LedgerHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        usage_hint(line)
    }
}

impl Highlighter for LedgerHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.dimmed().to_string())
    }
}

impl Validator for LedgerHelper {}
