//! Operator command parsing.
//!
//! All subcommands hang off one root (`/cargo`) and share one permission.

use thiserror::Error;

/// Permission required for every subcommand.
pub const PERM_ADMIN: &str = "harborgate.admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("not authorized")]
    Unauthorized,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move zone 0 and the spawn location to the caller.
    SetSpawn,
    SpawnOverride(bool),
    Add,
    /// `None` removes the most recently added zone.
    Remove(Option<u32>),
    List,
    Debug(bool),
    Tides(bool),
    Reload,
    Reset,
    Save,
    View,
    Blocked,
    Help,
}

impl Command {
    /// Parse the arguments after the root command. Unknown or missing
    /// subcommands map to [`Command::Help`].
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, CommandError> {
        let mut args = args.iter().map(|a| a.as_ref().trim());
        let Some(sub) = args.next() else {
            return Ok(Command::Help);
        };
        let next = args.next();

        let cmd = match sub.to_ascii_lowercase().as_str() {
            "spawn" => match next {
                None => Command::SetSpawn,
                Some(arg) => Command::SpawnOverride(parse_switch(arg)?),
            },
            "add" => Command::Add,
            // Non-numeric ids fall back to "remove latest".
            "remove" => Command::Remove(next.and_then(|a| a.parse().ok())),
            "list" => Command::List,
            "debug" => Command::Debug(parse_switch(next.unwrap_or_default())?),
            "tides" => Command::Tides(parse_switch(next.unwrap_or_default())?),
            "reload" => Command::Reload,
            "reset" => Command::Reset,
            "save" => Command::Save,
            "view" => Command::View,
            "blocked" => Command::Blocked,
            _ => Command::Help,
        };
        Ok(cmd)
    }
}

fn parse_switch(arg: &str) -> Result<bool, CommandError> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(CommandError::InvalidArgument(format!(
            "expected on|off, got '{}'",
            other
        ))),
    }
}
