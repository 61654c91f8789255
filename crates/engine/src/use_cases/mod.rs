//! Use cases - User story orchestration.
//!
//! `operator_state` is the mandatory validation pass every state goes
//! through; `commands` turns chat lines into intents against it.

pub mod commands;
pub mod operator_state;

pub use commands::{Command, CommandError, CommandInterpreter, InfoKind};
pub use operator_state::{OperatorError, OperatorStateService};
