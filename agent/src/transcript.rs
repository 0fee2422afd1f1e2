//! Append-only conversation transcript.

use copilot_completion::{ConversationTurn, Role};

use crate::error::{AgentError, Result};

/// A conversation that starts with exactly one system turn and only grows.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    /// Start a transcript with the given system instructions.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            turns: vec![ConversationTurn::system(system)],
        }
    }

    /// All turns, system turn first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Number of turns, including the system turn.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: a transcript holds at least its system turn.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append turns in order. Either all are appended or none.
    pub fn extend(&mut self, turns: Vec<ConversationTurn>) -> Result<()> {
        if let Some(turn) = turns.iter().find(|t| t.role == Role::System) {
            return Err(AgentError::InvalidTurn(format!(
                "system turn cannot be appended: {}",
                turn.content
            )));
        }
        if let Some(turn) = turns
            .iter()
            .find(|t| (t.role == Role::Tool) != t.invocation.is_some())
        {
            return Err(AgentError::InvalidTurn(format!(
                "{} turn has mismatched tool invocation",
                turn.role.as_str()
            )));
        }

        self.turns.extend(turns);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_completion::ToolInvocation;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_starts_with_system_turn() {
        let transcript = Transcript::new("rules");
        assert_eq!(transcript.turns(), &[ConversationTurn::system("rules")]);
        assert!(!transcript.is_empty());
    }

    #[test]
    fn test_rejects_system_turns_atomically() {
        let mut transcript = Transcript::new("rules");
        let err = transcript
            .extend(vec![
                ConversationTurn::user("hi"),
                ConversationTurn::system("new rules"),
            ])
            .unwrap_err();

        assert!(matches!(err, AgentError::InvalidTurn(_)));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_rejects_tool_turn_without_invocation() {
        let mut transcript = Transcript::new("rules");
        let mut turn = ConversationTurn::tool(
            ToolInvocation {
                call_id: "c".into(),
                name: "t".into(),
                arguments: Default::default(),
                round: 1,
                failed: false,
            },
            "ok",
        );
        turn.invocation = None;

        assert!(transcript.extend(vec![turn]).is_err());
        assert_eq!(transcript.len(), 1);
    }
}
