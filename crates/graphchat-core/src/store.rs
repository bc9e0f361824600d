//! Append-only conversation log.

use crate::types::{Message, MessageId};
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered log of messages shared by the session and its views.
///
/// Insertion order is display order. Messages are never updated or removed.
#[derive(Clone, Default)]
pub struct ConversationStore {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end of the log.
    pub fn append(&self, message: Message) {
        self.messages.write().push(message);
    }

    /// Snapshot of the whole log.
    pub fn all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Most recently appended message.
    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    /// Messages sharing a correlation id, in append order.
    pub fn by_id(&self, id: MessageId) -> Vec<Message> {
        self.messages
            .read()
            .iter()
            .filter(|message| message.id == id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn append_preserves_order_and_snapshots_are_detached() {
        let store = ConversationStore::new();
        assert!(store.is_empty());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        store.append(Message::user(first, "one"));
        let snapshot = store.all();
        store.append(Message::assistant(first, "two", None));
        store.append(Message::user(second, "three"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 3);
        let contents: Vec<String> = store.all().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
        assert_eq!(store.last().map(|m| m.id), Some(second));
    }

    #[test]
    fn by_id_returns_the_pair() {
        let store = ConversationStore::new();
        let id = Uuid::new_v4();
        store.append(Message::user(id, "q"));
        store.append(Message::user(Uuid::new_v4(), "other"));
        store.append(Message::assistant(id, "a", None));
        let roles: Vec<Role> = store.by_id(id).into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }
}
