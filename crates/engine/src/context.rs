//! Bounded conversation context: the most recent turns, oldest evicted first.

use colloquy_core::ConversationTurn;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct ContextTracker {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ContextTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest ones beyond capacity.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        self.evict();
    }

    /// A copy of the turns, oldest first.
    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the bound. Shrinking drops the oldest turns.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict();
    }

    fn evict(&mut self) {
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }
}
