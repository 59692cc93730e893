//! Type-order resolution.
//!
//! Selects every registered type that is a supertype of (or equal to) the
//! concrete message type and orders them general-before-specific.
//!
//! The "is-supertype-of" predicate is only a partial order, so the matching
//! entries are placed by a stable topological sort: starting from
//! registration order, repeatedly emit the earliest-registered entry with no
//! proper supertype still unplaced. Every supertype's mailboxes precede every
//! subtype's, and unrelated types keep registration order.
//!
//! Mailboxes of one type keep their subscription order.

use crate::mailbox::MailboxRef;
use crate::message::MessageType;

use super::TypeEntry;

pub(crate) fn resolve(entries: &[TypeEntry], concrete: &MessageType) -> Vec<MailboxRef> {
    let mut pending: Vec<&TypeEntry> = entries
        .iter()
        .filter(|e| e.message_type().is_supertype_of(concrete))
        .collect();
    pending.sort_by_key(|e| e.sequence());

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        // Ancestor sets are acyclic, so a minimal entry always exists.
        let next = pending
            .iter()
            .position(|e| !pending.iter().any(|other| is_proper_supertype(other, e)))
            .unwrap_or(0);
        ordered.push(pending.remove(next));
    }

    ordered
        .into_iter()
        .flat_map(|e| e.mailboxes())
        .cloned()
        .collect()
}

fn is_proper_supertype(candidate: &TypeEntry, entry: &TypeEntry) -> bool {
    candidate.message_type() != entry.message_type()
        && candidate.message_type().is_supertype_of(entry.message_type())
}
