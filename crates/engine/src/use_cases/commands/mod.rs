//! Chat command interpretation.

mod command;
mod interpreter;

pub use command::{Command, CommandError, InfoKind};
pub use interpreter::{is_command, CommandInterpreter, HELP_TEXT, TRIGGER};
pub(crate) use interpreter::USAGE_FOLLOW;
