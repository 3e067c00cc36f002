use parking_lot::Mutex;
use std::collections::VecDeque;

/// Number of recent exchanges replayed into prompts.
pub const PROMPT_TURNS: usize = 5;

/// Bounded, process-local question/answer history.
pub struct ConversationMemory {
    turns: Mutex<VecDeque<(String, String)>>,
    capacity: usize,
}

impl ConversationMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            turns: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn remember(&self, question: impl Into<String>, answer: impl Into<String>) {
        let mut turns = self.turns.lock();
        if turns.len() == self.capacity {
            turns.pop_front();
        }
        turns.push_back((question.into(), answer.into()));
    }

    /// Last `n` exchanges as `Q: ..\nA: ..` blocks, oldest first.
    pub fn render(&self, n: usize) -> String {
        let turns = self.turns.lock();
        let skip = turns.len().saturating_sub(n);
        turns
            .iter()
            .skip(skip)
            .map(|(q, a)| format!("Q: {}\nA: {}", q, a))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.turns.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_most_recent_turns() {
        let memory = ConversationMemory::new(10);
        for i in 0..7 {
            memory.remember(format!("q{}", i), format!("a{}", i));
        }
        let rendered = memory.render(PROMPT_TURNS);
        assert!(rendered.starts_with("Q: q2\nA: a2"));
        assert!(rendered.ends_with("Q: q6\nA: a6"));
        assert!(!rendered.contains("q1"));
    }

    #[test]
    fn capacity_drops_oldest() {
        let memory = ConversationMemory::new(2);
        memory.remember("first", "1");
        memory.remember("second", "2");
        memory.remember("third", "3");
        assert_eq!(memory.len(), 2);
        assert!(!memory.render(5).contains("first"));
    }

    #[test]
    fn empty_memory_renders_nothing() {
        assert_eq!(ConversationMemory::default().render(PROMPT_TURNS), "");
    }
}
