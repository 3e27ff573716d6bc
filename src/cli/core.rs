//! Shell context, dispatch, and error reporting.

use std::io;

use dialoguer::theme::ColorfulTheme;
use strsim::levenshtein;
use thiserror::Error;

use crate::config::{Config, ConfigManager};
use crate::errors::{CliError, SessionError, StorageError, ValidationError};
use crate::ledger::{Contributor, LedgerStore};
use crate::session::EditSession;
use crate::storage::{self, JsonStorage, PersistenceAdapter};

use super::commands;
use super::io as cli_io;
use super::output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Recoverable command failure; reported and the shell keeps running.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("No person named `{0}`")]
    UnknownPerson(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

pub struct ShellContext {
    pub(crate) mode: CliMode,
    pub(crate) store: LedgerStore,
    pub(crate) session: Option<EditSession>,
    pub(crate) storage: Box<dyn PersistenceAdapter>,
    pub(crate) config: Config,
    pub(crate) theme: ColorfulTheme,
    pub(crate) running: bool,
}

impl ShellContext {
    /// Builds a context backed by the on-disk config and JSON storage.
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        let storage = JsonStorage::new(
            Some(config_manager.base_dir().to_path_buf()),
            &config.storage_key,
            Some(config.backup_retention),
        )?;
        Ok(Self::with_parts(mode, Box::new(storage), config))
    }

    /// Builds a context from explicit parts, loading whatever the adapter holds.
    pub fn with_parts(mode: CliMode, storage: Box<dyn PersistenceAdapter>, config: Config) -> Self {
        let store = storage::load_or_empty(storage.as_ref());
        Self {
            mode,
            store,
            session: None,
            storage,
            config,
            theme: ColorfulTheme::default(),
            running: true,
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub fn mode(&self) -> CliMode {
        self.mode
    }

    /// Current contributor names, in ledger order.
    pub(crate) fn people(&self) -> Vec<String> {
        self.store
            .contributors()
            .iter()
            .map(|contributor| contributor.name.clone())
            .collect()
    }

    pub(crate) fn prompt(&self) -> String {
        match &self.session {
            Some(session) if session.is_open() => {
                format!("splitsies [batch: {}]> ", session.staged_count())
            }
            _ => "splitsies> ".to_string(),
        }
    }

    /// Case-insensitive lookup of a contributor by name.
    pub(crate) fn person(&self, name: &str) -> Result<&Contributor, CommandError> {
        self.store
            .find_by_name(name)
            .ok_or_else(|| CommandError::UnknownPerson(name.trim().to_string()))
    }

    /// Saves the store after a successful mutation. Failures only warn.
    pub(crate) fn autosave(&self) {
        if !storage::persist(self.storage.as_ref(), &self.store) {
            output::warning("Could not save changes; they remain in memory for this session.");
        }
    }

    pub(crate) fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, prompt, false)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(command) = commands::find(command) {
            match (command.run)(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    /// Tokenizes and dispatches one input line.
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = match super::shell::parse_command_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                output::warning(err);
                return Ok(LoopControl::Continue);
            }
        };
        let Some(raw) = tokens.first() else {
            return Ok(LoopControl::Continue);
        };
        let command = raw.to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        match self.dispatch(&command, raw, &args) {
            Ok(LoopControl::Exit) => {
                self.running = false;
                Ok(LoopControl::Exit)
            }
            other => other,
        }
    }

    pub(crate) fn closest_command(&self, input: &str) -> Option<&'static str> {
        let input = input.to_lowercase();
        commands::COMMANDS
            .iter()
            .map(|command| (levenshtein(command.name, &input), command.name))
            .min_by_key(|(distance, _)| *distance)
            .filter(|(distance, _)| *distance <= 3)
            .map(|(_, name)| name)
    }

    fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        if let Some(best) = self.closest_command(input) {
            output::info(format!("Suggestion: `{best}`?"));
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::Validation(ValidationError::EditSessionOpen) => {
                output::error(ValidationError::EditSessionOpen);
                output::hint("Finish with `batch commit` or `batch rollback`.");
            }
            other => output::error(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn context() -> ShellContext {
        ShellContext::with_parts(
            CliMode::Script,
            Box::new(MemoryStorage::new()),
            Config::default(),
        )
    }

    #[test]
    fn misspelled_commands_get_a_suggestion() {
        let ctx = context();
        assert_eq!(ctx.closest_command("setle"), Some("settle"));
        assert_eq!(ctx.closest_command("xyzzyplugh"), None);
    }

    #[test]
    fn exit_stops_the_loop() {
        let mut ctx = context();
        assert_eq!(ctx.process_line("exit").unwrap(), LoopControl::Exit);
        assert!(!ctx.running);
    }

    #[test]
    fn blank_and_unknown_lines_continue() {
        let mut ctx = context();
        assert_eq!(ctx.process_line("   ").unwrap(), LoopControl::Continue);
        assert_eq!(ctx.process_line("frobnicate").unwrap(), LoopControl::Continue);
    }

    #[test]
    fn prompt_reflects_batch_state() {
        let mut ctx = context();
        ctx.process_line("add Sam 20 Lunch").unwrap();
        assert_eq!(ctx.prompt(), "splitsies> ");
        ctx.process_line("batch begin").unwrap();
        assert_eq!(ctx.prompt(), "splitsies [batch: 0]> ");
    }
}
