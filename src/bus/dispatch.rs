//! The dispatcher: `post`.
//!
//! ```text
//! post(message)
//!   ├─► resolve mailboxes for message's concrete type (read lock, snapshot)
//!   ├─► none: post(UndeliveredMessage), return
//!   └─► for each mailbox, in order:
//!         ├─ Ok                 ─► continue
//!         ├─ Err(Recoverable)   ─► post(FailedMessage), continue
//!         ├─ Err(Fatal)         ─► return Err(PostError::Fatal)
//!         └─ panic              ─► unwinds out of post
//! ```
//!
//! Control messages go through the same `post`, recursively. Nothing detects
//! repost cycles unless `BusConfig::max_post_depth` is set.

use std::cell::Cell;

use crate::control::{FailedMessage, ReturnReceipt, UndeliveredMessage};
use crate::error::{DeliveryFault, PostError};
use crate::message::{Envelope, Message};

use super::Bus;

thread_local! {
    static POST_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Tracks `post` nesting on the current thread; restores it on drop, including
/// during unwinding.
struct DepthGuard {
    depth: usize,
}

impl DepthGuard {
    fn enter() -> Self {
        let depth = POST_DEPTH.with(|d| {
            let next = d.get() + 1;
            d.set(next);
            next
        });
        Self { depth }
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        POST_DEPTH.with(|d| d.set(self.depth - 1));
    }
}

impl Bus {
    /// Posts `message` to every mailbox subscribed to its type or one of its
    /// supertypes.
    ///
    /// Blocks until every resolved mailbox has been attempted. Recoverable
    /// mailbox faults are reposted as [`FailedMessage`]; a post with no
    /// mailboxes is reposted as [`UndeliveredMessage`].
    ///
    /// # Errors
    ///
    /// Returns [`PostError::Fatal`] if a mailbox raised a fatal fault, after
    /// which no further mailbox is invoked, and [`PostError::DepthExceeded`]
    /// if a configured nesting limit was hit. A panicking mailbox unwinds
    /// through this call.
    pub fn post<M: Message>(&self, message: M) -> Result<(), PostError> {
        self.post_envelope(Envelope::new(message))
    }

    /// Posts an already wrapped message, preserving its identity.
    ///
    /// # Errors
    ///
    /// See [`Bus::post`].
    pub fn post_envelope(&self, message: Envelope) -> Result<(), PostError> {
        let guard = DepthGuard::enter();
        if let Some(limit) = self.inner.config.max_post_depth {
            if guard.depth > limit {
                tracing::error!(
                    bus = %self.inner.id,
                    depth = guard.depth,
                    limit,
                    message_type = message.message_type().name(),
                    "post depth limit exceeded"
                );
                return Err(PostError::DepthExceeded {
                    depth: guard.depth,
                    limit,
                });
            }
        }

        let mailboxes = self.subscribers_to(message.message_type());

        if mailboxes.is_empty() {
            tracing::debug!(
                bus = %self.inner.id,
                message_type = message.message_type().name(),
                "undelivered"
            );
            return self.post(UndeliveredMessage::new(self.clone(), message));
        }

        let mut delivered = false;
        for mailbox in &mailboxes {
            if let Some(observer) = &self.inner.observer {
                observer(mailbox, &message);
            }

            tracing::trace!(
                bus = %self.inner.id,
                message_type = message.message_type().name(),
                mailbox = %mailbox,
                depth = guard.depth,
                "deliver"
            );

            match mailbox.receive(&message) {
                Ok(()) => delivered = true,
                Err(DeliveryFault::Recoverable(cause)) => {
                    tracing::warn!(
                        bus = %self.inner.id,
                        message_type = message.message_type().name(),
                        mailbox = %mailbox,
                        error = %cause,
                        "mailbox failed"
                    );
                    self.post(FailedMessage::new(
                        self.clone(),
                        mailbox.clone(),
                        message.clone(),
                        cause,
                    ))?;
                }
                Err(DeliveryFault::Fatal(cause)) => {
                    tracing::error!(
                        bus = %self.inner.id,
                        message_type = message.message_type().name(),
                        mailbox = %mailbox,
                        error = %cause,
                        "mailbox raised fatal fault"
                    );
                    return Err(PostError::Fatal {
                        mailbox: mailbox.clone(),
                        message,
                        cause,
                    });
                }
            }
        }

        if delivered && self.inner.config.return_receipts && message.requests_receipt() {
            self.post(ReturnReceipt::new(self.clone(), message))?;
        }

        Ok(())
    }
}
