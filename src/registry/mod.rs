//! Subscriber registry.
//!
//! Stores, per message type, the ordered set of subscribed mailboxes. Type
//! entries are kept in the order their key first entered the registry; that
//! order is the resolver's tie-break between unrelated types.
//!
//! The registry itself is not synchronized. The bus owns it behind a lock and
//! never holds that lock while a mailbox runs.

/// Type-order resolution over registered entries.
pub mod resolver;

use crate::error::SubscriptionError;
use crate::mailbox::MailboxRef;
use crate::message::MessageType;

/// One (type, mailbox) registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// The type the mailbox subscribed to.
    pub message_type: MessageType,
    /// The subscribed mailbox.
    pub mailbox: MailboxRef,
    /// Subscription order index, increasing per message type.
    pub order: u64,
}

#[derive(Debug)]
pub(crate) struct TypeEntry {
    message_type: MessageType,
    sequence: u64,
    next_order: u64,
    subscriptions: Vec<Subscription>,
}

impl TypeEntry {
    fn new(message_type: MessageType, sequence: u64) -> Self {
        Self {
            message_type,
            sequence,
            next_order: 0,
            subscriptions: Vec::new(),
        }
    }

    pub(crate) const fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    pub(crate) const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn mailboxes(&self) -> impl Iterator<Item = &MailboxRef> {
        self.subscriptions.iter().map(|s| &s.mailbox)
    }
}

/// Ordered per-type mailbox sets.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: Vec<TypeEntry>,
    next_sequence: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends `mailbox` to the set for `message_type`.
    ///
    /// Returns false if the mailbox was already subscribed to that type; its
    /// original position is kept.
    pub(crate) fn subscribe(&mut self, message_type: MessageType, mailbox: MailboxRef) -> bool {
        let idx = match self.position(&message_type) {
            Some(idx) => idx,
            None => {
                let sequence = self.next_sequence;
                self.next_sequence += 1;
                self.entries.push(TypeEntry::new(message_type.clone(), sequence));
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[idx];
        if entry.subscriptions.iter().any(|s| s.mailbox == mailbox) {
            return false;
        }

        let order = entry.next_order;
        entry.next_order += 1;
        entry.subscriptions.push(Subscription {
            message_type,
            mailbox,
            order,
        });
        true
    }

    /// Removes `mailbox` from the set for `message_type`, dropping the type
    /// entry once its set is empty.
    pub(crate) fn unsubscribe(
        &mut self,
        message_type: &MessageType,
        mailbox: &MailboxRef,
    ) -> Result<(), SubscriptionError> {
        let idx = self
            .position(message_type)
            .ok_or_else(|| SubscriptionError::TypeNotRegistered {
                message_type: message_type.clone(),
            })?;

        let entry = &mut self.entries[idx];
        let pos = entry
            .subscriptions
            .iter()
            .position(|s| &s.mailbox == mailbox)
            .ok_or_else(|| SubscriptionError::MailboxNotSubscribed {
                message_type: message_type.clone(),
                mailbox: mailbox.clone(),
            })?;

        entry.subscriptions.remove(pos);
        if entry.subscriptions.is_empty() {
            self.entries.remove(idx);
        }
        Ok(())
    }

    /// Ordered mailboxes eligible for a message of `concrete` type.
    pub(crate) fn mailboxes_for(&self, concrete: &MessageType) -> Vec<MailboxRef> {
        resolver::resolve(&self.entries, concrete)
    }

    pub(crate) fn subscriptions(&self) -> Vec<Subscription> {
        self.entries
            .iter()
            .flat_map(|e| e.subscriptions.iter().cloned())
            .collect()
    }

    pub(crate) fn message_types(&self) -> Vec<MessageType> {
        self.entries.iter().map(|e| e.message_type.clone()).collect()
    }

    fn position(&self, message_type: &MessageType) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| &e.message_type == message_type)
    }
}
