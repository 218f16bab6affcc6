//! Per-session conversation state.

use crate::policy::flow::FlowStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, Utc::now())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Utc::now())
    }
}

/// State tracked for one conversation.
///
/// The turn window and presented-block set are private so the bounding and
/// anti-repetition invariants cannot be bypassed; the flow stage is public
/// because the decision policy owns its transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    turns: VecDeque<Turn>,
    max_turns: usize,
    presented_blocks: HashSet<String>,
    /// Current position in the session's multi-turn flow.
    pub stage: FlowStage,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, max_turns: usize, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: VecDeque::new(),
            max_turns,
            presented_blocks: HashSet::new(),
            stage: FlowStage::Initial,
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a turn, dropping the oldest once the window is full.
    pub fn append_turn(&mut self, turn: Turn) {
        if self.max_turns == 0 {
            return;
        }
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Remember that a block's first-time variant was shown.
    pub fn mark_presented(&mut self, block_id: &str) {
        self.presented_blocks.insert(block_id.to_string());
    }

    pub fn has_presented(&self, block_id: &str) -> bool {
        self.presented_blocks.contains(block_id)
    }

    pub fn presented_blocks(&self) -> impl Iterator<Item = &str> {
        self.presented_blocks.iter().map(|s| s.as_str())
    }

    pub fn touch_at(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Compact form for logging.
    pub fn summary(&self) -> String {
        format!(
            "session={} stage={} turns={} presented={}",
            self.session_id,
            self.stage,
            self.turns.len(),
            self.presented_blocks.len(),
        )
    }
}
