//! Error types for the bus.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. Two error surfaces exist:
//!
//! - [`SubscriptionError`] is returned by `unsubscribe`.
//! - [`PostError`] is the only thing that ever escapes `post`.
//!
//! Mailboxes report their own faults through [`DeliveryFault`], which the
//! dispatcher classifies as recoverable (absorbed into a `FailedMessage`) or
//! fatal (propagated to the poster).

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::mailbox::MailboxRef;
use crate::message::{Envelope, MessageType};

/// Shared, cloneable fault cause carried by control messages and errors.
pub type FaultCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors from subscription management.
#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    /// No mailbox is subscribed to the type.
    #[error("Message type {message_type} has no subscriptions")]
    TypeNotRegistered {
        /// The type passed to `unsubscribe`.
        message_type: MessageType,
    },

    /// The type is registered but not for this mailbox.
    #[error("Mailbox {mailbox} is not subscribed to {message_type}")]
    MailboxNotSubscribed {
        /// The type passed to `unsubscribe`.
        message_type: MessageType,
        /// The mailbox passed to `unsubscribe`.
        mailbox: MailboxRef,
    },
}

impl SubscriptionError {
    /// Both variants mean the (type, mailbox) pair was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TypeNotRegistered { .. } | Self::MailboxNotSubscribed { .. }
        )
    }
}

/// Errors escaping `post`.
#[derive(Debug, Clone, Error)]
pub enum PostError {
    /// A mailbox raised a fatal fault; remaining deliveries were aborted.
    ///
    /// `cause` is the exact value the mailbox returned.
    #[error("Mailbox {mailbox} raised a fatal fault: {cause}")]
    Fatal {
        /// The mailbox that raised the fault.
        mailbox: MailboxRef,
        /// The message it was receiving.
        message: Envelope,
        /// The fault cause.
        cause: FaultCause,
    },

    /// The configured post nesting limit was exceeded.
    #[error("Post nesting depth {depth} exceeds limit {limit}")]
    DepthExceeded {
        /// Nesting depth the refused post would have run at.
        depth: usize,
        /// Configured `BusConfig::max_post_depth`.
        limit: usize,
    },
}

impl PostError {
    /// Returns true if a mailbox raised a fatal fault.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// The fatal cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&FaultCause> {
        match self {
            Self::Fatal { cause, .. } => Some(cause),
            Self::DepthExceeded { .. } => None,
        }
    }
}

/// Top-level error type.
///
/// Lets application code use `?` on both `unsubscribe` and `post` results.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// From `unsubscribe`.
    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// From `post`.
    #[error("Post error: {0}")]
    Post(#[from] PostError),
}

impl BusError {
    /// Returns true if this is a subscription error.
    #[must_use]
    pub const fn is_subscription(&self) -> bool {
        matches!(self, Self::Subscription(_))
    }

    /// Returns true if this is a post error.
    #[must_use]
    pub const fn is_post(&self) -> bool {
        matches!(self, Self::Post(_))
    }

    /// Returns true if a (type, mailbox) pair was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::Subscription(e) => e.is_not_found(),
            Self::Post(_) => false,
        }
    }
}

/// Result type alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// A fault raised by a mailbox while receiving a message.
///
/// Bus errors convert with `?`: a nested [`PostError::Fatal`] stays fatal,
/// everything else is recoverable. Other errors go through
/// `map_err(DeliveryFault::recoverable)` or [`DeliveryFault::fatal`]. A panic
/// is treated as fatal and is never caught.
#[derive(Clone)]
pub enum DeliveryFault {
    /// Contained per mailbox and reposted as a `FailedMessage`.
    Recoverable(FaultCause),
    /// Never contained; aborts the current `post`.
    Fatal(FaultCause),
}

impl DeliveryFault {
    /// Creates a recoverable fault.
    #[must_use]
    pub fn recoverable(cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Recoverable(Arc::from(cause.into()))
    }

    /// Creates a fatal fault.
    #[must_use]
    pub fn fatal(cause: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Fatal(Arc::from(cause.into()))
    }

    /// Returns true if this fault aborts delivery.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// The underlying cause.
    #[must_use]
    pub fn cause(&self) -> &FaultCause {
        match self {
            Self::Recoverable(cause) | Self::Fatal(cause) => cause,
        }
    }
}

impl From<PostError> for DeliveryFault {
    /// A nested post keeps its fatal cause, so `?` inside a mailbox cannot
    /// downgrade it.
    fn from(err: PostError) -> Self {
        match err {
            PostError::Fatal { cause, .. } => Self::Fatal(cause),
            err @ PostError::DepthExceeded { .. } => Self::Recoverable(Arc::new(err)),
        }
    }
}

impl From<SubscriptionError> for DeliveryFault {
    fn from(err: SubscriptionError) -> Self {
        Self::Recoverable(Arc::new(err))
    }
}

impl From<BusError> for DeliveryFault {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Subscription(e) => e.into(),
            BusError::Post(e) => e.into(),
        }
    }
}

impl fmt::Debug for DeliveryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable(cause) => f.debug_tuple("Recoverable").field(cause).finish(),
            Self::Fatal(cause) => f.debug_tuple("Fatal").field(cause).finish(),
        }
    }
}

impl fmt::Display for DeliveryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable(cause) => write!(f, "recoverable fault: {cause}"),
            Self::Fatal(cause) => write!(f, "fatal fault: {cause}"),
        }
    }
}

/// Raised by a typed mailbox handed a message it cannot view as its type.
#[derive(Debug, Clone, Error)]
#[error("Mailbox expected {expected} but received {actual}")]
pub struct IncompatibleMessage {
    /// Type name the mailbox accepts.
    pub expected: &'static str,
    /// Concrete type of the message it received.
    pub actual: MessageType,
}
