//! The bus façade.
//!
//! [`Bus`] owns the subscriber registry and exposes the four operations:
//! `subscribe`, `unsubscribe`, `post`, and `subscribers_to`. It is a cheap,
//! cloneable handle; clones share one registry. Construct one instance at
//! startup and pass it to collaborators; independent instances never share
//! state.

mod config;
mod dispatch;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::control::{FailedMessage, ReturnReceipt, UndeliveredMessage};
use crate::error::SubscriptionError;
use crate::mailbox::MailboxRef;
use crate::message::{Envelope, MessageType};
use crate::registry::{Registry, Subscription};

pub use config::BusConfig;

/// Callback invoked immediately before each mailbox invocation.
pub type DeliveryObserver = Arc<dyn Fn(&MailboxRef, &Envelope) + Send + Sync>;

/// Unique identifier for a bus instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(Uuid);

impl BusId {
    /// Create a new random bus id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BusId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct BusInner {
    id: BusId,
    config: BusConfig,
    observer: Option<DeliveryObserver>,
    registry: RwLock<Registry>,
}

/// In-process, type-indexed publish/subscribe bus.
///
/// Delivery is synchronous on the posting thread. Supertype mailboxes receive
/// a message before subtype mailboxes; mailboxes of one type are invoked in
/// subscription order.
///
/// Guard mailboxes for [`FailedMessage`] and [`UndeliveredMessage`] are
/// installed before `new` returns, so unhandled control messages are
/// absorbed rather than reposted.
///
/// A mailbox that captures a clone of its own bus keeps that bus alive until
/// it is unsubscribed.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

impl Bus {
    /// Creates a bus with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates a bus with `config`.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> BusBuilder {
        BusBuilder::default()
    }

    fn from_parts(config: BusConfig, observer: Option<DeliveryObserver>) -> Self {
        let bus = Self {
            inner: Arc::new(BusInner {
                id: BusId::new(),
                config,
                observer,
                registry: RwLock::new(Registry::new()),
            }),
        };
        bus.install_guards();
        bus
    }

    fn install_guards(&self) {
        self.subscribe(
            MessageType::of::<FailedMessage>(),
            MailboxRef::discard("guard:FailedMessage"),
        );
        self.subscribe(
            MessageType::of::<UndeliveredMessage>(),
            MailboxRef::discard("guard:UndeliveredMessage"),
        );
        if self.inner.config.return_receipts {
            self.subscribe(
                MessageType::of::<ReturnReceipt>(),
                MailboxRef::discard("guard:ReturnReceipt"),
            );
        }
    }

    /// The identity of this bus.
    #[must_use]
    pub fn id(&self) -> BusId {
        self.inner.id
    }

    /// The configuration this bus was built with.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Returns true if both handles refer to the same bus.
    #[must_use]
    pub fn same_bus(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Delivers messages of `message_type`, and of its subtypes, to `mailbox`.
    ///
    /// Never fails. Subscribing a mailbox already subscribed to the same type
    /// leaves the registry unchanged.
    pub fn subscribe(&self, message_type: MessageType, mailbox: MailboxRef) {
        let name = message_type.name();
        let mailbox_name = mailbox.to_string();
        let added = self.write_registry().subscribe(message_type, mailbox);
        tracing::debug!(
            bus = %self.inner.id,
            message_type = name,
            mailbox = %mailbox_name,
            added,
            "subscribe"
        );
    }

    /// Stops delivering messages of `message_type` to `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`SubscriptionError`] if the type has no
    /// subscriptions or `mailbox` is not among them.
    pub fn unsubscribe(
        &self,
        message_type: &MessageType,
        mailbox: &MailboxRef,
    ) -> Result<(), SubscriptionError> {
        let result = self.write_registry().unsubscribe(message_type, mailbox);
        match &result {
            Ok(()) => tracing::debug!(
                bus = %self.inner.id,
                message_type = message_type.name(),
                mailbox = %mailbox,
                "unsubscribe"
            ),
            Err(err) => tracing::debug!(bus = %self.inner.id, error = %err, "unsubscribe rejected"),
        }
        result
    }

    /// The ordered mailboxes a message of `message_type` would be delivered to.
    #[must_use]
    pub fn subscribers_to(&self, message_type: &MessageType) -> Vec<MailboxRef> {
        self.read_registry().mailboxes_for(message_type)
    }

    /// Snapshot of every subscription, grouped by type in type-registration
    /// order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.read_registry().subscriptions()
    }

    /// Registered message types in registration order.
    #[must_use]
    pub fn message_types(&self) -> Vec<MessageType> {
        self.read_registry().message_types()
    }

    // No mailbox ever runs under the registry lock, so a poisoned lock cannot
    // hold a half-applied mutation.
    fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Bus {
    fn eq(&self, other: &Self) -> bool {
        self.same_bus(other)
    }
}

impl Eq for Bus {}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Bus`].
#[derive(Default)]
pub struct BusBuilder {
    config: BusConfig,
    observer: Option<DeliveryObserver>,
}

impl BusBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: BusConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables return receipts.
    #[must_use]
    pub fn return_receipts(mut self, enabled: bool) -> Self {
        self.config.return_receipts = enabled;
        self
    }

    /// Limits post nesting depth per thread.
    #[must_use]
    pub fn max_post_depth(mut self, limit: usize) -> Self {
        self.config.max_post_depth = Some(limit);
        self
    }

    /// Installs a callback run before every mailbox invocation.
    #[must_use]
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&MailboxRef, &Envelope) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Builds the bus and installs its guard mailboxes.
    #[must_use]
    pub fn build(self) -> Bus {
        Bus::from_parts(self.config, self.observer)
    }
}

impl fmt::Debug for BusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusBuilder")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
