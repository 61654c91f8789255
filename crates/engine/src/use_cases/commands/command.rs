//! Intents produced by the interpreter.

use chibibot_domain::OperatorState;

/// What a single chat line asks the room to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Nothing to do, nothing to say.
    NoOp,
    /// Fixed reply text, no state change.
    Reply(String),
    /// A report rendered from the chatter's state when the reply is sent.
    Info(InfoKind),
    /// Commit this working copy and broadcast it.
    Update(OperatorState),
    /// Like `Update`, but the action follows another chatter.
    Follow(OperatorState),
    /// Plain chat line to show as a caption.
    ShowMessage(String),
    SavePreferences(OperatorState),
    ClearPreferences,
    /// Highlight the sender's chibi.
    Find,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoOp => "noop",
            Self::Reply(_) => "reply",
            Self::Info(_) => "info",
            Self::Update(_) => "update",
            Self::Follow(_) => "follow",
            Self::ShowMessage(_) => "show_message",
            Self::SavePreferences(_) => "save_preferences",
            Self::ClearPreferences => "clear_preferences",
            Self::Find => "find",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKind {
    Skins,
    Animations,
    Summary,
}

impl InfoKind {
    pub fn render(&self, state: &OperatorState) -> String {
        match self {
            Self::Skins => format!("{} skins: {}", state.display_name, state.skins.join(", ")),
            Self::Animations => format!(
                "{} animations: {}",
                state.display_name,
                state.available_animations.join(",")
            ),
            Self::Summary => format!(
                "{}: {}, {}, {}, ({})",
                state.display_name,
                state.skin,
                state.stance,
                state.facing,
                state.current_animations().join(",")
            ),
        }
    }
}

/// A malformed command. The message is meant for chat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::amiya_base;

    #[test]
    fn info_reports_match_chat_format() {
        let state = amiya_base();
        assert_eq!(
            InfoKind::Skins.render(&state),
            "Amiya skins: default, epoque#4"
        );
        assert_eq!(
            InfoKind::Animations.render(&state),
            "Amiya animations: Move,Relax,Sit,Interact"
        );
        assert_eq!(
            InfoKind::Summary.render(&state),
            "Amiya: default, base, Front, (Relax)"
        );
    }
}
