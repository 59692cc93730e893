//! Message types and the nominal subtype relation.
//!
//! Rust has no class inheritance, so a message declares its nominal
//! supertypes explicitly through [`Message::supertypes`]. [`MessageType`]
//! carries the transitive closure of those declarations, which makes the
//! "is-supertype-of" predicate a set lookup independent of any reflection API.
//!
//! ```
//! use std::any::{Any, TypeId};
//! use typebus::{Message, MessageType};
//!
//! #[derive(Debug)]
//! struct Animal { name: String }
//! impl Message for Animal {}
//!
//! #[derive(Debug)]
//! struct Dog { animal: Animal }
//! impl Message for Dog {
//!     fn supertypes() -> Vec<MessageType> {
//!         vec![MessageType::of::<Animal>()]
//!     }
//!
//!     fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
//!         (target == TypeId::of::<Animal>()).then_some(&self.animal as &dyn Any)
//!     }
//! }
//!
//! assert!(MessageType::of::<Animal>().is_supertype_of(&MessageType::of::<Dog>()));
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A value that can be posted on the bus.
///
/// The trait stays object safe: the associated function is only callable on
/// sized implementors, and the remaining methods have defaults.
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Direct nominal supertypes of this message type.
    ///
    /// Transitive supertypes are picked up automatically. Cyclic declarations
    /// recurse without bound.
    fn supertypes() -> Vec<MessageType>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Views this value as one of its supertypes.
    ///
    /// Typed mailboxes subscribed to a supertype use this to borrow the
    /// supertype value out of a subtype message.
    fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
        let _ = target;
        None
    }

    /// Whether a successful delivery of this message earns a return receipt.
    fn requests_receipt(&self) -> bool {
        true
    }
}

impl Message for String {}

impl Message for &'static str {}

/// Marker for the root of the type hierarchy.
enum AnyMessage {}

/// Identifier for a nominal message type.
///
/// Equality and hashing use the type id only.
#[derive(Clone)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
    ancestors: Arc<[TypeId]>,
}

impl MessageType {
    /// The message type of `M`, with every transitive supertype resolved.
    #[must_use]
    pub fn of<M: Message>() -> Self {
        let mut ancestors: Vec<TypeId> = Vec::new();
        for parent in M::supertypes() {
            if parent.is_root() {
                continue;
            }
            for id in std::iter::once(parent.id).chain(parent.ancestors.iter().copied()) {
                if !ancestors.contains(&id) {
                    ancestors.push(id);
                }
            }
        }

        Self {
            id: TypeId::of::<M>(),
            name: type_name::<M>(),
            ancestors: ancestors.into(),
        }
    }

    /// The root type: a supertype of every message type.
    #[must_use]
    pub fn any() -> Self {
        Self {
            id: TypeId::of::<AnyMessage>(),
            name: "any",
            ancestors: Vec::new().into(),
        }
    }

    /// The underlying type id.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.id
    }

    /// The type name, as reported by `std::any::type_name`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true for [`MessageType::any`].
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id == TypeId::of::<AnyMessage>()
    }

    /// Returns true if `self` is `other` or one of its supertypes.
    #[must_use]
    pub fn is_supertype_of(&self, other: &Self) -> bool {
        self.is_root() || self.id == other.id || other.ancestors.contains(&self.id)
    }

    /// Returns true if `self` is `other` or one of its subtypes.
    #[must_use]
    pub fn is_subtype_of(&self, other: &Self) -> bool {
        other.is_supertype_of(self)
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageType").field(&self.name).finish()
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A posted message: a shared payload tagged with its concrete type.
///
/// Cloning is cheap and preserves identity, so control messages can carry
/// the original message and callers can compare with [`Envelope::ptr_eq`].
#[derive(Clone)]
pub struct Envelope {
    message_type: MessageType,
    message: Arc<dyn Message>,
    any: Arc<dyn Any + Send + Sync>,
}

impl Envelope {
    /// Wraps a message.
    #[must_use]
    pub fn new<M: Message>(message: M) -> Self {
        let shared = Arc::new(message);
        Self {
            message_type: MessageType::of::<M>(),
            message: Arc::clone(&shared) as Arc<dyn Message>,
            any: shared,
        }
    }

    /// The concrete (dynamic) type of the payload.
    #[must_use]
    pub const fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    /// The payload as a trait object.
    #[must_use]
    pub fn message(&self) -> &dyn Message {
        &*self.message
    }

    /// Returns true if the payload has concrete type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.any.is::<T>()
    }

    /// Borrows the payload as `T`: the concrete type first, then a
    /// supertype view through [`Message::upcast`].
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        if let Some(exact) = self.any.downcast_ref::<T>() {
            return Some(exact);
        }
        self.message
            .upcast(TypeId::of::<T>())
            .and_then(|view| view.downcast_ref::<T>())
    }

    /// Returns true if both envelopes wrap the same posted value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.any, &other.any)
    }

    pub(crate) fn requests_receipt(&self) -> bool {
        self.message.requests_receipt()
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.message, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Base;
    impl Message for Base {}

    #[derive(Debug)]
    struct Left;
    impl Message for Left {
        fn supertypes() -> Vec<MessageType> {
            vec![MessageType::of::<Base>()]
        }
    }

    #[derive(Debug)]
    struct Right {
        base: Base,
    }
    impl Message for Right {
        fn supertypes() -> Vec<MessageType> {
            vec![MessageType::of::<Base>()]
        }

        fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
            (target == TypeId::of::<Base>()).then_some(&self.base as &dyn Any)
        }
    }

    #[derive(Debug)]
    struct FarRight;
    impl Message for FarRight {
        fn supertypes() -> Vec<MessageType> {
            vec![MessageType::of::<Right>()]
        }
    }

    #[derive(Debug)]
    struct Both;
    impl Message for Both {
        fn supertypes() -> Vec<MessageType> {
            vec![MessageType::of::<Left>(), MessageType::of::<Right>()]
        }
    }

    #[test]
    fn test_supertype_relation_is_transitive() {
        let base = MessageType::of::<Base>();
        let right = MessageType::of::<Right>();
        let far = MessageType::of::<FarRight>();

        assert!(base.is_supertype_of(&far));
        assert!(right.is_supertype_of(&far));
        assert!(far.is_subtype_of(&base));
        assert!(!far.is_supertype_of(&right));
    }

    #[test]
    fn test_type_is_its_own_supertype() {
        let left = MessageType::of::<Left>();
        assert!(left.is_supertype_of(&left));
        assert!(left.is_subtype_of(&left));
    }

    #[test]
    fn test_siblings_are_unrelated() {
        let left = MessageType::of::<Left>();
        let right = MessageType::of::<Right>();
        assert!(!left.is_supertype_of(&right));
        assert!(!right.is_supertype_of(&left));
    }

    #[test]
    fn test_root_is_supertype_of_everything() {
        let any = MessageType::any();
        assert!(any.is_supertype_of(&MessageType::of::<Base>()));
        assert!(any.is_supertype_of(&MessageType::of::<String>()));
        assert!(!MessageType::of::<Base>().is_supertype_of(&any));
    }

    #[test]
    fn test_diamond_ancestors_deduplicated() {
        let both = MessageType::of::<Both>();
        // Left, Right, and Base exactly once.
        assert_eq!(both.ancestors.len(), 3);
        assert!(MessageType::of::<Base>().is_supertype_of(&both));
    }

    #[test]
    fn test_supertype_relation_is_transitive_and_antisymmetric() {
        let base = MessageType::of::<Base>();
        let far = MessageType::of::<FarRight>();
        assert!(base.is_supertype_of(&far));
        assert!(far.is_subtype_of(&base));
        assert!(!far.is_supertype_of(&base));
    }

    #[test]
    fn test_equality_by_type_id() {
        assert_eq!(MessageType::of::<Base>(), MessageType::of::<Base>());
        assert_ne!(MessageType::of::<Base>(), MessageType::of::<Left>());
        assert!(MessageType::of::<Base>().name().ends_with("Base"));
    }

    #[test]
    fn test_envelope_downcast_exact_and_upcast() {
        let env = Envelope::new(Right { base: Base });
        assert!(env.is::<Right>());
        assert!(env.downcast_ref::<Right>().is_some());
        assert!(env.downcast_ref::<Base>().is_some());
        assert!(env.downcast_ref::<Left>().is_none());
    }

    #[test]
    fn test_envelope_identity() {
        let a = Envelope::new("ping");
        let b = a.clone();
        let c = Envelope::new("ping");
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(format!("{a:?}"), "\"ping\"");
    }
}
