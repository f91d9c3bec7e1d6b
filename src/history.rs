//! Session-scoped conversation history.
//!
//! An append-only log of (question, answer) turns, owned by the active
//! session and passed by reference through the request pipeline. History
//! lives in memory only; it survives a session solely through an explicit
//! export. No dedup, no size cap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question/answer exchange. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered turn log for one interactive session.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    id: String,
    turns: Vec<ChatTurn>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            question: question.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        });
    }

    #[allow(dead_code)]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The (question, answer) pairs in append order, the shape the
    /// conversation engine feeds back to the model as prior context.
    pub fn as_pairs(&self) -> Vec<(String, String)> {
        self.turns
            .iter()
            .map(|t| (t.question.clone(), t.answer.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut history = SessionHistory::new();
        for i in 0..5 {
            history.append(format!("q{}", i), format!("a{}", i));
        }
        let pairs = history.as_pairs();
        assert_eq!(pairs.len(), 5);
        for (i, (q, a)) in pairs.iter().enumerate() {
            assert_eq!(q, &format!("q{}", i));
            assert_eq!(a, &format!("a{}", i));
        }
    }

    #[test]
    fn empty_then_nonempty() {
        let mut history = SessionHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        history.append("q", "a");
        assert!(!history.is_empty());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn sessions_have_distinct_ids() {
        assert_ne!(SessionHistory::new().id(), SessionHistory::new().id());
    }

    #[test]
    fn timestamps_are_monotonic_in_order() {
        let mut history = SessionHistory::new();
        history.append("q0", "a0");
        history.append("q1", "a1");
        let turns = history.turns();
        assert!(turns[0].timestamp <= turns[1].timestamp);
    }
}
