use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;

use crate::models::ChatMessage;
use crate::session::SessionKey;

struct Conversation {
    turns: VecDeque<ChatMessage>,
    touched: DateTime<Utc>,
}

// chat history per session and feature, last `max_turns` messages only
pub struct ConversationStore {
    conversations: DashMap<SessionKey, Conversation>,
    max_turns: usize,
    idle: chrono::Duration,
}

impl ConversationStore {
    pub fn new(max_turns: usize, idle: Duration) -> Self {
        Self {
            conversations: DashMap::new(),
            max_turns,
            idle: chrono::Duration::from_std(idle).unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn history(&self, key: &SessionKey) -> Vec<ChatMessage> {
        self.conversations
            .get(key)
            .map(|c| c.turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn append<I>(&self, key: &SessionKey, turns: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        let mut conversation = self
            .conversations
            .entry(key.clone())
            .or_insert_with(|| Conversation {
                turns: VecDeque::new(),
                touched: now,
            });

        conversation.turns.extend(turns);
        while conversation.turns.len() > self.max_turns {
            conversation.turns.pop_front();
        }
        conversation.touched = now;
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.conversations.len();
        self.conversations
            .retain(|_, c| now.signed_duration_since(c.touched) <= self.idle);
        before.saturating_sub(self.conversations.len())
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
