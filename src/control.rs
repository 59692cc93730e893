//! Control messages synthesized by the dispatcher.
//!
//! Subscribe to these to observe delivery problems. The bus installs inert
//! guard mailboxes for each of them at construction, so posting one never
//! falls through to another `UndeliveredMessage`.

use crate::bus::Bus;
use crate::error::FaultCause;
use crate::mailbox::MailboxRef;
use crate::message::{Envelope, Message};

/// A mailbox returned a recoverable fault.
///
/// The bus posts one of these per failing mailbox, in failure order,
/// interleaved with delivery to the remaining mailboxes.
#[derive(Debug, Clone)]
pub struct FailedMessage {
    /// The bus the failing post ran on.
    pub bus: Bus,
    /// The mailbox that returned the fault.
    pub mailbox: MailboxRef,
    /// The message it was receiving.
    pub message: Envelope,
    /// The recoverable cause the mailbox returned.
    pub fault: FaultCause,
}

impl FailedMessage {
    /// Records a recoverable fault of `mailbox` on `message`.
    #[must_use]
    pub fn new(bus: Bus, mailbox: MailboxRef, message: Envelope, fault: FaultCause) -> Self {
        Self {
            bus,
            mailbox,
            message,
            fault,
        }
    }
}

impl Message for FailedMessage {}

/// A post matched no mailbox.
#[derive(Debug, Clone)]
pub struct UndeliveredMessage {
    /// The bus the message was posted on.
    pub bus: Bus,
    /// The message nobody received.
    pub message: Envelope,
}

impl UndeliveredMessage {
    /// Records a post of `message` that matched no mailbox.
    #[must_use]
    pub fn new(bus: Bus, message: Envelope) -> Self {
        Self { bus, message }
    }
}

impl Message for UndeliveredMessage {}

/// A post reached at least one mailbox without a fault.
///
/// Only posted when `BusConfig::return_receipts` is enabled. Receipts are
/// never issued for receipts.
#[derive(Debug, Clone)]
pub struct ReturnReceipt {
    /// The bus the message was posted on.
    pub bus: Bus,
    /// The delivered message.
    pub message: Envelope,
}

impl ReturnReceipt {
    /// Acknowledges delivery of `message`.
    #[must_use]
    pub fn new(bus: Bus, message: Envelope) -> Self {
        Self { bus, message }
    }
}

impl Message for ReturnReceipt {
    fn requests_receipt(&self) -> bool {
        false
    }
}
