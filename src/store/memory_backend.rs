//! In-memory message store backed by DashMap.
//!
//! Messages are grouped per conversation: an unordered user pair plus the
//! product the conversation is about. Nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;

use super::backend::{ChatSummary, MessageStore, NewMessage, StoreError, StoredMessage};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct ConversationKey {
    low: String,
    high: String,
    product_id: String,
}

impl ConversationKey {
    fn new(user_a: &str, user_b: &str, product_id: &str) -> Self {
        let (low, high) = if user_a <= user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };
        Self {
            low: low.to_string(),
            high: high.to_string(),
            product_id: product_id.to_string(),
        }
    }

    fn involves(&self, user_a: &str, user_b: &str) -> bool {
        (self.low == user_a && self.high == user_b) || (self.low == user_b && self.high == user_a)
    }
}

#[derive(Default)]
pub struct MemoryMessageStore {
    conversations: DashMap<ConversationKey, Vec<StoredMessage>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored messages
    pub fn len(&self) -> usize {
        self.conversations.iter().map(|c| c.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn persist(&self, message: NewMessage) -> Result<StoredMessage, StoreError> {
        let key = ConversationKey::new(&message.sender, &message.receiver, &message.product_id);
        let stored = StoredMessage::from_new(message);

        self.conversations
            .entry(key)
            .or_default()
            .push(stored.clone());

        tracing::trace!(message_id = %stored.m_id, "Message stored in memory");
        Ok(stored)
    }

    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
        product_id: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let key = ConversationKey::new(user_a, user_b, product_id);
        let mut messages = self
            .conversations
            .get(&key)
            .map(|c| c.value().clone())
            .unwrap_or_default();

        messages.sort_by_key(|m| m.created);
        Ok(messages)
    }

    async fn mark_seen(&self, sender: &str, receiver: &str) -> Result<u64, StoreError> {
        let mut updated = 0;

        for mut conversation in self.conversations.iter_mut() {
            if !conversation.key().involves(sender, receiver) {
                continue;
            }
            for message in conversation.value_mut().iter_mut() {
                if message.sender == sender && message.receiver == receiver && !message.seen {
                    message.seen = true;
                    updated += 1;
                }
            }
        }

        Ok(updated)
    }

    async fn chats(&self, receiver: &str) -> Result<Vec<ChatSummary>, StoreError> {
        // Ordered like the SQL backend: user pair, then product
        let mut inbox: BTreeMap<(ConversationKey, String), u64> = BTreeMap::new();

        for conversation in self.conversations.iter() {
            for message in conversation.value().iter().filter(|m| m.receiver == receiver) {
                let unseen = inbox
                    .entry((conversation.key().clone(), message.sender.clone()))
                    .or_insert(0);
                if !message.seen {
                    *unseen += 1;
                }
            }
        }

        Ok(inbox
            .into_iter()
            .map(|((key, sender), unseen_count)| ChatSummary {
                sender,
                product_id: key.product_id,
                unseen_count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(sender: &str, receiver: &str, product_id: &str, content: &str) -> NewMessage {
        NewMessage {
            content: content.to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            product_id: product_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_conversation_is_symmetric_and_per_product() {
        let store = MemoryMessageStore::new();
        store.persist(new_message("buyer", "seller", "p1", "hi")).await.unwrap();
        store.persist(new_message("seller", "buyer", "p1", "hello")).await.unwrap();
        store.persist(new_message("buyer", "seller", "p2", "other item")).await.unwrap();

        let from_buyer = store.conversation("buyer", "seller", "p1").await.unwrap();
        let from_seller = store.conversation("seller", "buyer", "p1").await.unwrap();

        assert_eq!(from_buyer.len(), 2);
        assert_eq!(from_buyer, from_seller);
        assert_eq!(from_buyer[0].content, "hi");
        assert_eq!(from_buyer[1].content, "hello");
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_empty() {
        let store = MemoryMessageStore::new();
        assert!(store.conversation("a", "b", "p").await.unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_mark_seen_only_touches_one_direction() {
        let store = MemoryMessageStore::new();
        store.persist(new_message("buyer", "seller", "p1", "1")).await.unwrap();
        store.persist(new_message("buyer", "seller", "p2", "2")).await.unwrap();
        store.persist(new_message("seller", "buyer", "p1", "3")).await.unwrap();
        store.persist(new_message("other", "seller", "p1", "4")).await.unwrap();

        assert_eq!(store.mark_seen("buyer", "seller").await.unwrap(), 2);
        // Already seen
        assert_eq!(store.mark_seen("buyer", "seller").await.unwrap(), 0);

        let reply = store.conversation("buyer", "seller", "p1").await.unwrap();
        let seller_reply = reply.iter().find(|m| m.sender == "seller").unwrap();
        assert!(!seller_reply.seen);

        let other = store.conversation("other", "seller", "p1").await.unwrap();
        assert!(!other[0].seen);
    }

    #[tokio::test]
    async fn test_chats_counts_unseen_per_conversation() {
        let store = MemoryMessageStore::new();
        store.persist(new_message("buyer", "seller", "p1", "hi")).await.unwrap();
        store.persist(new_message("buyer", "seller", "p1", "price?")).await.unwrap();
        store.persist(new_message("seller", "buyer", "p1", "50")).await.unwrap();
        store.persist(new_message("alice", "seller", "p2", "is it new?")).await.unwrap();
        // Sent by the seller only, not part of the seller's inbox
        store.persist(new_message("seller", "carol", "p3", "hello")).await.unwrap();

        let inbox = store.chats("seller").await.unwrap();
        assert_eq!(
            inbox,
            vec![
                ChatSummary {
                    sender: "alice".to_string(),
                    product_id: "p2".to_string(),
                    unseen_count: 1,
                },
                ChatSummary {
                    sender: "buyer".to_string(),
                    product_id: "p1".to_string(),
                    unseen_count: 2,
                },
            ]
        );

        store.mark_seen("buyer", "seller").await.unwrap();
        let inbox = store.chats("seller").await.unwrap();
        let buyer = inbox.iter().find(|c| c.sender == "buyer").unwrap();
        assert_eq!(buyer.unseen_count, 0);
        let alice = inbox.iter().find(|c| c.sender == "alice").unwrap();
        assert_eq!(alice.unseen_count, 1);

        assert!(store.chats("nobody").await.unwrap().is_empty());
    }
}
