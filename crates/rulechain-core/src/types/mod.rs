//! # Core Type Definitions
//!
//! This module contains all core types for the rulechain composition engine:
//! - Context handles and identity keys (`ContextRef`, `ContextId`, `RuleId`)
//! - Operation identity (`MethodId`)
//! - Unit-under-test description (`UnitDescription`)
//! - Error types (`RuleError`)
//!
//! ## Determinism Guarantees
//!
//! All identity keys implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! deterministically. Identity is allocation-pointer based and stable for
//! the lifetime of one composition run, which is the only lifetime the
//! engine ever observes (registry and chain are request-scoped).

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

// =============================================================================
// CONTEXT HANDLES & IDENTITY KEYS
// =============================================================================

/// Identity key for one context instance (one level of the owning chain).
///
/// Derived from the allocation pointer of the underlying `ContextRef`.
/// Two handles compare equal exactly when they refer to the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextId(pub usize);

/// Identity key for one discovered rule instance.
///
/// A rule instance satisfying both capability contracts keeps a single
/// `RuleId` across both capability views, which is what makes
/// identity-based subsumption possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub usize);

/// Opaque, cloneable handle to one context instance in an owning chain.
///
/// The engine never inspects context internals; it only threads handles
/// through to rules and uses pointer identity to key per-level state.
/// Cloning the handle clones the reference, not the instance.
#[derive(Clone)]
pub struct ContextRef(Rc<dyn Any>);

impl ContextRef {
    /// Wrap a context instance into a handle.
    #[must_use]
    pub fn new<T: Any>(instance: T) -> Self {
        Self(Rc::new(instance))
    }

    /// Identity of the underlying instance.
    ///
    /// Stable across clones of the handle; distinct instances always get
    /// distinct ids while both are alive, which holds for the duration of
    /// any composition run.
    #[must_use]
    pub fn id(&self) -> ContextId {
        ContextId(Rc::as_ptr(&self.0).cast::<()>() as usize)
    }

    /// Borrow the underlying instance as a concrete type, if it is one.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for ContextRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ContextRef {}

impl fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextRef").field(&self.id()).finish()
    }
}

// =============================================================================
// OPERATION IDENTITY
// =============================================================================

/// Identity of the operation (test method) a composition run is built for.
///
/// Invocation-capable rules receive this alongside the target instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodId(pub String);

impl MethodId {
    /// Create a new method identity from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the method name as a string slice.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// UNIT DESCRIPTION
// =============================================================================

/// Description of the unit under test, handed to Around-capable rules and
/// to the external executor for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDescription {
    /// Name of the context the unit belongs to.
    pub context: String,
    /// Name of the unit itself.
    pub name: String,
}

impl UnitDescription {
    /// Create a new unit description.
    #[must_use]
    pub fn new(context: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            name: name.into(),
        }
    }

    /// Render the description as `name(context)`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}({})", self.name, self.context)
    }
}

impl fmt::Display for UnitDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.context)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while composing or evaluating a rule chain.
///
/// - `Access` is composition-time and terminal: no partial rule chain is
///   ever executed. The composer converts it into an always-failing
///   statement that surfaces the original cause unmodified.
/// - `Evaluation` is run-time and expected: it propagates outward through
///   the composed statement exactly as a stack unwinds, and the engine
///   never intercepts it.
///
/// Payloads are plain strings so errors stay `Clone`-able and
/// deterministic; no silent failures, no panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A rule-producing member could not be read (visibility restriction).
    #[error("rule member access denied: {0}")]
    Access(String),

    /// Failure raised while evaluating a composed statement.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

// =============================================================================
// TESTS
// =============================================================================
