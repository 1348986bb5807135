//! Message log: per-origin, append-only, indexed by sequence id.

use shared_types::RumorMessage;
use std::collections::HashMap;

/// Accepted rumors. The entry for `(origin, id)` lives at index `id - 1`.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    by_origin: HashMap<String, Vec<RumorMessage>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `msg` if it is the next id for its origin.
    ///
    /// The vector clock already guarantees this; a gap here would mean the
    /// two stores diverged, so the append is refused rather than leaving a hole.
    pub fn append(&mut self, msg: RumorMessage) -> bool {
        let entries = self.by_origin.entry(msg.origin.clone()).or_default();
        if msg.id as usize != entries.len() + 1 {
            return false;
        }
        entries.push(msg);
        true
    }

    pub fn get(&self, origin: &str, id: u32) -> Option<&RumorMessage> {
        let index = (id as usize).checked_sub(1)?;
        self.by_origin.get(origin)?.get(index)
    }

    pub fn len_for(&self, origin: &str) -> usize {
        self.by_origin.get(origin).map_or(0, Vec::len)
    }

    /// All chat rumors (route rumors excluded), grouped by origin in sorted
    /// origin order and by id within an origin.
    pub fn chat_messages(&self) -> Vec<RumorMessage> {
        let mut origins: Vec<&String> = self.by_origin.keys().collect();
        origins.sort();
        origins
            .into_iter()
            .flat_map(|origin| self.by_origin[origin].iter())
            .filter(|msg| !msg.is_route_rumor())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_id_minus_one() {
        let mut log = MessageLog::new();
        assert!(log.append(RumorMessage::new("A", 1, "first")));
        assert!(log.append(RumorMessage::new("A", 2, "second")));

        assert_eq!(log.get("A", 1).map(|m| m.text.as_str()), Some("first"));
        assert_eq!(log.get("A", 2).map(|m| m.text.as_str()), Some("second"));
        assert!(log.get("A", 0).is_none());
        assert!(log.get("A", 3).is_none());
        assert!(log.get("B", 1).is_none());
    }

    #[test]
    fn test_gap_is_refused() {
        let mut log = MessageLog::new();
        assert!(!log.append(RumorMessage::new("A", 2, "early")));
        assert_eq!(log.len_for("A"), 0);
    }

    #[test]
    fn test_chat_messages_skip_route_rumors() {
        let mut log = MessageLog::new();
        log.append(RumorMessage::new("B", 1, ""));
        log.append(RumorMessage::new("B", 2, "hello"));
        log.append(RumorMessage::new("A", 1, "hi"));

        let texts: Vec<String> = log.chat_messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["hi".to_string(), "hello".to_string()]);
    }
}
