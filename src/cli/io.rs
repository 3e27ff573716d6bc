use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::cli::core::CommandError;

/// Asks a yes/no question on the terminal.
pub fn confirm_action(theme: &ColorfulTheme, prompt: &str, default: bool) -> Result<bool, CommandError> {
    Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(CommandError::from)
}
