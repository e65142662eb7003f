//! Value identity resolution for events and observations.
//!
//! Equality guards need to compare two observed values without knowing their
//! shape. Each event type declares an [`Identity`] strategy; the resolver
//! turns it into a [`Comparator`] once per type and caches it in a
//! process-wide registry keyed by `TypeId`, shared by every engine and every
//! durable task that works with that type.

use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt::Debug;
use std::mem;
use std::sync::LazyLock;

/// Trait for values produced by `Instance::observe`.
///
/// Every event type names its [`Identity`]. Plain value types use
/// [`Identity::structural`]. Enums whose variants carry payload that should
/// not take part in matching use [`Identity::Variant`]. Anything else can
/// supply its own comparison with [`Identity::Custom`].
///
/// # Example
///
/// ```rust
/// use durable_fsm::core::{resolve, Event, Identity};
///
/// #[derive(Clone, Debug)]
/// enum Signal {
///     Wait,
///     Fail { reason: String },
/// }
///
/// impl Event for Signal {
///     fn identity() -> Identity<Self> {
///         Identity::Variant
///     }
/// }
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Reading(u32);
///
/// impl Event for Reading {
///     fn identity() -> Identity<Self> {
///         Identity::structural()
///     }
/// }
///
/// let by_variant = resolve::<Signal>();
/// assert!(by_variant.equals(
///     &Signal::Fail { reason: "a".into() },
///     &Signal::Fail { reason: "b".into() },
/// ));
/// assert!(!by_variant.equals(&Signal::Wait, &Signal::Fail { reason: "a".into() }));
///
/// let by_value = resolve::<Reading>();
/// assert!(by_value.equals(&Reading(1), &Reading(1)));
/// assert!(!by_value.equals(&Reading(1), &Reading(2)));
/// ```
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// Comparison strategy for this type.
    ///
    /// Called at most once per process for each type; the result is cached.
    fn identity() -> Identity<Self>;
}

/// How two values of an event type are tested for equality.
pub enum Identity<E> {
    /// Native value equality.
    Structural(fn(&E, &E) -> bool),
    /// Same enum variant, payload ignored. Only meaningful for enums: any
    /// two values of a struct type count as the same variant.
    Variant,
    /// A comparison supplied by the type, authoritative over the tag.
    Custom(fn(&E, &E) -> bool),
}

impl<E: PartialEq> Identity<E> {
    /// Structural identity backed by the type's `PartialEq`.
    pub fn structural() -> Self {
        Identity::Structural(<E as PartialEq>::eq)
    }
}

/// Which strategy a [`Comparator`] was resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityKind {
    Structural,
    Variant,
    Custom,
}

/// Resolved equality test for one event type.
pub struct Comparator<E> {
    kind: IdentityKind,
    eq: fn(&E, &E) -> bool,
}

impl<E> Clone for Comparator<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Comparator<E> {}

impl<E> Debug for Comparator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comparator").field("kind", &self.kind).finish()
    }
}

impl<E> Comparator<E> {
    /// The strategy in use.
    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// Test two values for equality under the resolved strategy.
    pub fn equals(&self, a: &E, b: &E) -> bool {
        (self.eq)(a, b)
    }
}

impl<E: Event> Comparator<E> {
    fn build() -> Self {
        match E::identity() {
            Identity::Structural(eq) => Comparator {
                kind: IdentityKind::Structural,
                eq,
            },
            Identity::Variant => Comparator {
                kind: IdentityKind::Variant,
                eq: same_variant::<E>,
            },
            Identity::Custom(eq) => Comparator {
                kind: IdentityKind::Custom,
                eq,
            },
        }
    }
}

fn same_variant<E>(a: &E, b: &E) -> bool {
    mem::discriminant(a) == mem::discriminant(b)
}

static COMPARATORS: LazyLock<DashMap<TypeId, Box<dyn Any + Send + Sync>>> =
    LazyLock::new(DashMap::new);

/// Resolve the comparator for `E`, computing and caching it on first use.
///
/// Lookup-or-insert is atomic per type; concurrent first calls agree because
/// the strategy is a pure function of the type.
pub fn resolve<E: Event>() -> Comparator<E> {
    let key = TypeId::of::<E>();

    if let Some(cached) = COMPARATORS.get(&key) {
        if let Some(comparator) = cached.value().downcast_ref::<Comparator<E>>() {
            return *comparator;
        }
    }

    let entry = COMPARATORS.entry(key).or_insert_with(|| {
        let comparator = Comparator::<E>::build();
        tracing::trace!(
            event_type = std::any::type_name::<E>(),
            kind = ?comparator.kind(),
            "resolved event identity"
        );
        Box::new(comparator)
    });

    match entry.value().downcast_ref::<Comparator<E>>() {
        Some(comparator) => *comparator,
        None => Comparator::<E>::build(),
    }
}

/// Whether a comparator for `E` is already in the registry.
pub fn is_resolved<E: Event>() -> bool {
    COMPARATORS.contains_key(&TypeId::of::<E>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum Tagged {
        Wait,
        Stop { fields: i32 },
        Fail { reason: String },
    }

    impl Event for Tagged {
        fn identity() -> Identity<Self> {
            Identity::Variant
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Plain {
        Wait,
        Stop,
    }

    impl Event for Plain {
        fn identity() -> Identity<Self> {
            Identity::structural()
        }
    }

    #[derive(Clone, Debug)]
    struct Threshold {
        level: u32,
    }

    impl Event for Threshold {
        fn identity() -> Identity<Self> {
            Identity::Custom(|a, b| a.level / 10 == b.level / 10)
        }
    }

    #[derive(Clone, Debug)]
    enum NeverResolvedBefore {
        A,
    }

    impl Event for NeverResolvedBefore {
        fn identity() -> Identity<Self> {
            Identity::Variant
        }
    }

    #[test]
    fn variant_identity_ignores_payload() {
        let cmp = resolve::<Tagged>();
        assert_eq!(cmp.kind(), IdentityKind::Variant);
        assert!(cmp.equals(&Tagged::Stop { fields: 1 }, &Tagged::Stop { fields: 2 }));
        assert!(cmp.equals(
            &Tagged::Fail {
                reason: "x".into()
            },
            &Tagged::Fail {
                reason: "y".into()
            }
        ));
        assert!(!cmp.equals(&Tagged::Wait, &Tagged::Stop { fields: 0 }));
    }

    #[test]
    fn structural_identity_uses_partial_eq() {
        let cmp = resolve::<Plain>();
        assert_eq!(cmp.kind(), IdentityKind::Structural);
        assert!(cmp.equals(&Plain::Wait, &Plain::Wait));
        assert!(!cmp.equals(&Plain::Wait, &Plain::Stop));
    }

    #[test]
    fn custom_identity_is_authoritative() {
        let cmp = resolve::<Threshold>();
        assert_eq!(cmp.kind(), IdentityKind::Custom);
        assert!(cmp.equals(&Threshold { level: 11 }, &Threshold { level: 19 }));
        assert!(!cmp.equals(&Threshold { level: 11 }, &Threshold { level: 21 }));
    }

    #[test]
    fn resolution_is_cached() {
        assert!(!is_resolved::<NeverResolvedBefore>());
        let first = resolve::<NeverResolvedBefore>();
        assert!(is_resolved::<NeverResolvedBefore>());
        let second = resolve::<NeverResolvedBefore>();
        assert_eq!(first.kind(), second.kind());
        assert!(second.equals(&NeverResolvedBefore::A, &NeverResolvedBefore::A));
    }

    #[test]
    fn concurrent_resolution_agrees() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| resolve::<Tagged>().kind()))
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), IdentityKind::Variant);
        }
    }
}
