//! Error types for the bot, layered by audience.
//!
//! [UserError]s are expected failures shown to users as normal replies.
//! [ConfigError]s abort startup. Everything else in [DigestError] is
//! unexpected and triggers a bug notification.

use std::time::Duration;

use thiserror::Error;

use crate::serenity;

/// Any error the bot can produce.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Expected failures, see [UserError].
    #[error(transparent)]
    UserError(#[from] UserError),

    /// Startup configuration problems, see [ConfigError].
    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    /// Errors from the discord api.
    #[error(transparent)]
    Serenity(#[from] serenity::Error),

    /// Errors from outgoing http requests (summaries, link previews).
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The language model api answered with an error payload.
    #[error("Summary api error: {0}")]
    SummaryApi(String),

    /// A command panicked during execution.
    #[error("Command panicked: {payload:?}")]
    Panic {
        /// The panic payload, if it was a string.
        payload: Option<String>,
    },

    /// A command check failed.
    #[error("A command check failed{}.", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    CheckFailed {
        /// The reason given by the check, if any.
        reason: Option<String>,
    },

    /// Discord's registered version of a command doesn't match ours.
    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch {
        /// What didn't line up.
        description: String,
    },
}

/// Errors shown to users without being treated as bugs.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("This command only works in a server.")]
    GuildOnly,
    #[error("This command only works in DMs.")]
    DmOnly,
    #[error("This command only works in age-restricted channels.")]
    NsfwOnly,
    #[error("Only the bot owner can use this command.")]
    NotOwner,
    #[error("On cooldown, try again in {} seconds.", remaining_cooldown.as_secs())]
    OnCooldown { remaining_cooldown: Duration },
    #[error("I'm missing permissions: {missing_permissions}.")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },
    #[error("You're missing the permissions for that.")]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },
    #[error("Couldn't understand the arguments{}.", input.as_deref().map(|i| format!(": '{i}'")).unwrap_or_default())]
    BadArgs { input: Option<String> },
    #[error("Missing subcommand, expected one of: {subcmds}.")]
    MissingSubcommand { subcmds: String },
    #[error("No channel named '{name}' found in this server.")]
    NoDigestChannel { name: String },
}

/// Problems with the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },
    #[error("Invalid config file: {reason}")]
    InvalidConfig { reason: String },
    #[error("Couldn't access config file: {0}")]
    IoError(std::io::Error),
}
