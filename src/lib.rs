//! # typebus - In-process, type-indexed publish/subscribe
//!
//! Components inside one process exchange typed messages through a [`Bus`]
//! without holding references to each other. A mailbox subscribed to a type
//! receives every posted message of that type or of any of its nominal
//! subtypes.
//!
//! ## Core Concepts
//!
//! - **Message**: any `Send + Sync + Debug` value implementing [`Message`];
//!   subtypes declare their supertypes explicitly
//! - **Mailbox**: a single-method receive capability, held by identity as a
//!   [`MailboxRef`]
//! - **Resolution**: supertype mailboxes first, then subtypes; subscription
//!   order within a type
//! - **Control messages**: [`FailedMessage`] for recoverable mailbox faults,
//!   [`UndeliveredMessage`] for posts nobody received
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use typebus::{Bus, MailboxRef, Message, MessageType, UndeliveredMessage};
//!
//! #[derive(Debug)]
//! struct Ping(u32);
//! impl Message for Ping {}
//!
//! let bus = Bus::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! bus.subscribe(
//!     MessageType::of::<Ping>(),
//!     MailboxRef::typed("pings", move |p: &Ping| {
//!         sink.lock().unwrap().push(p.0);
//!         Ok(())
//!     }),
//! );
//!
//! bus.post(Ping(1))?;
//! assert_eq!(*seen.lock().unwrap(), vec![1]);
//!
//! // Nobody listens for strings: the guard absorbs the UndeliveredMessage.
//! bus.post("ping")?;
//! assert_eq!(bus.subscribers_to(&MessageType::of::<UndeliveredMessage>()).len(), 1);
//! # Ok::<(), typebus::BusError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod control;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod registry;

// Re-export primary types at crate root for convenience
pub use bus::{Bus, BusBuilder, BusConfig, BusId, DeliveryObserver};
pub use control::{FailedMessage, ReturnReceipt, UndeliveredMessage};
pub use error::{
    BusError, BusResult, DeliveryFault, FaultCause, IncompatibleMessage, PostError,
    SubscriptionError,
};
pub use mailbox::{DiscardMailbox, FnMailbox, Mailbox, MailboxId, MailboxRef, TypedMailbox};
pub use message::{Envelope, Message, MessageType};
pub use registry::Subscription;
