//! Mailboxes: the single-method receive capability.
//!
//! A [`Mailbox`] is anything that can synchronously receive one message.
//! [`MailboxRef`] is the identity-bearing handle the bus stores: two handles
//! are equal only if one was cloned from the other, even when the wrapped
//! behaviour is identical.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{DeliveryFault, IncompatibleMessage};
use crate::message::{Envelope, Message};

/// Receives messages from the bus.
///
/// Called on the posting thread with no bus lock held, so implementations may
/// subscribe, unsubscribe, or post re-entrantly.
pub trait Mailbox: Send + Sync {
    /// Receives one message.
    ///
    /// Returning a recoverable fault reports the failure as a
    /// `FailedMessage`; returning a fatal fault, or panicking, aborts the
    /// current post.
    fn receive(&self, message: &Envelope) -> Result<(), DeliveryFault>;
}

/// Unique identifier for a mailbox handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MailboxId(Uuid);

impl MailboxId {
    /// Create a new random mailbox id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MailboxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MailboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity-bearing handle to a mailbox.
#[derive(Clone)]
pub struct MailboxRef {
    id: MailboxId,
    name: Cow<'static, str>,
    inner: Arc<dyn Mailbox>,
}

impl MailboxRef {
    /// Wraps a mailbox under a fresh identity.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, mailbox: impl Mailbox + 'static) -> Self {
        Self {
            id: MailboxId::new(),
            name: name.into(),
            inner: Arc::new(mailbox),
        }
    }

    /// Wraps a closure receiving the raw envelope.
    #[must_use]
    pub fn from_fn<F>(name: impl Into<Cow<'static, str>>, receive: F) -> Self
    where
        F: Fn(&Envelope) -> Result<(), DeliveryFault> + Send + Sync + 'static,
    {
        Self::new(name, FnMailbox(receive))
    }

    /// Wraps a closure receiving the message viewed as `M`.
    #[must_use]
    pub fn typed<M, F>(name: impl Into<Cow<'static, str>>, receive: F) -> Self
    where
        M: Message,
        F: Fn(&M) -> Result<(), DeliveryFault> + Send + Sync + 'static,
    {
        Self::new(name, TypedMailbox::new(receive))
    }

    /// A mailbox that accepts and drops every message.
    #[must_use]
    pub fn discard(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, DiscardMailbox)
    }

    /// The identity of this handle.
    #[must_use]
    pub const fn id(&self) -> MailboxId {
        self.id
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn receive(&self, message: &Envelope) -> Result<(), DeliveryFault> {
        self.inner.receive(message)
    }
}

impl PartialEq for MailboxRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MailboxRef {}

impl Hash for MailboxRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MailboxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for MailboxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Adapter for closures over the raw envelope.
pub struct FnMailbox<F>(pub F);

impl<F> Mailbox for FnMailbox<F>
where
    F: Fn(&Envelope) -> Result<(), DeliveryFault> + Send + Sync,
{
    fn receive(&self, message: &Envelope) -> Result<(), DeliveryFault> {
        (self.0)(message)
    }
}

/// Adapter for closures over a concrete message type.
///
/// The message is borrowed through [`Envelope::downcast_ref`]; a message that
/// cannot be viewed as `M` is a wiring error and yields a fatal fault.
pub struct TypedMailbox<M, F> {
    receive: F,
    _message: PhantomData<fn(&M)>,
}

impl<M, F> TypedMailbox<M, F>
where
    M: Message,
    F: Fn(&M) -> Result<(), DeliveryFault> + Send + Sync,
{
    /// Wraps `receive`.
    pub const fn new(receive: F) -> Self {
        Self {
            receive,
            _message: PhantomData,
        }
    }
}

impl<M, F> Mailbox for TypedMailbox<M, F>
where
    M: Message,
    F: Fn(&M) -> Result<(), DeliveryFault> + Send + Sync,
{
    fn receive(&self, message: &Envelope) -> Result<(), DeliveryFault> {
        match message.downcast_ref::<M>() {
            Some(typed) => (self.receive)(typed),
            None => Err(DeliveryFault::fatal(IncompatibleMessage {
                expected: std::any::type_name::<M>(),
                actual: message.message_type().clone(),
            })),
        }
    }
}

/// Accepts and drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardMailbox;

impl Mailbox for DiscardMailbox {
    fn receive(&self, _message: &Envelope) -> Result<(), DeliveryFault> {
        Ok(())
    }
}
