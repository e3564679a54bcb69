//! Bot commands.

mod digest;

use crate::{Data, DigestError};

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, DigestError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![digest::digest()]
}
