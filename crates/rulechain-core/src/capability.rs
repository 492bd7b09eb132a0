//! # Capability Model
//!
//! The two decorator capabilities a rule may satisfy:
//!
//! - **Around**: wraps an already-built inner statement and receives the
//!   description of the unit under test.
//! - **Invocation**: wraps the inner statement and receives the operation
//!   identity plus the specific target instance at the rule's own
//!   hierarchy level.
//!
//! One rule instance may satisfy both contracts at once. Discovered rules
//! are therefore modeled as a tagged variant ([`RuleValue`]) carrying
//! explicit capability flags, never probed at runtime. Identity is
//! allocation-pointer based and stays stable across both capability views
//! of the same instance, which is what the registry's subsumption set
//! keys on.

use crate::statement::StatementRef;
use crate::{ContextRef, MethodId, RuleId, UnitDescription};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// A decorator that wraps a statement and sees the unit description.
pub trait AroundRule {
    /// Wrap `inner`, returning the new outer statement.
    ///
    /// The returned statement may pass through, run setup/teardown, or
    /// choose not to invoke `inner` at all.
    fn apply(&self, inner: StatementRef, description: &UnitDescription) -> StatementRef;
}

/// A decorator that wraps a statement and sees the operation identity and
/// the target instance of its own declaration level.
pub trait InvocationRule {
    /// Wrap `inner`, returning the new outer statement.
    ///
    /// `target` is the context instance at the level the rule was declared
    /// on: for a rule declared at an outer level this is that outer
    /// instance, not the innermost object.
    fn apply_invocation(
        &self,
        inner: StatementRef,
        method: &MethodId,
        target: &ContextRef,
    ) -> StatementRef;
}

// =============================================================================
// CAPABILITY FLAGS
// =============================================================================

/// Which capability contracts a discovered rule instance satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Satisfies the Around contract.
    pub around: bool,
    /// Satisfies the Invocation contract.
    pub invocation: bool,
}

// =============================================================================
// DISCOVERED RULE VALUE
// =============================================================================

/// A rule instance as returned by the metadata provider, tagged with the
/// capability contract(s) it satisfies.
///
/// The `Combined` variant holds both capability views of one allocation;
/// [`RuleValue::id`] returns the same identity through either view, so a
/// combined instance collected by both provider queries deduplicates by
/// identity.
#[derive(Clone)]
pub enum RuleValue {
    /// Satisfies the Around contract only.
    Around(Rc<dyn AroundRule>),
    /// Satisfies the Invocation contract only.
    Invocation(Rc<dyn InvocationRule>),
    /// Satisfies both contracts (the combined capability).
    Combined {
        /// Around view of the instance.
        around: Rc<dyn AroundRule>,
        /// Invocation view of the same instance.
        invocation: Rc<dyn InvocationRule>,
    },
}

impl RuleValue {
    /// Tag a rule instance satisfying both contracts.
    ///
    /// Both views share the allocation, so the identity is the same
    /// through either capability.
    #[must_use]
    pub fn combined<R>(rule: Rc<R>) -> Self
    where
        R: AroundRule + InvocationRule + 'static,
    {
        Self::Combined {
            around: rule.clone(),
            invocation: rule,
        }
    }

    /// Identity of the underlying instance, stable across capability views.
    #[must_use]
    pub fn id(&self) -> RuleId {
        match self {
            Self::Around(rule) => RuleId(Rc::as_ptr(rule).cast::<()>() as usize),
            Self::Invocation(rule) => RuleId(Rc::as_ptr(rule).cast::<()>() as usize),
            // Either view works; they point at the same allocation.
            Self::Combined { around, .. } => RuleId(Rc::as_ptr(around).cast::<()>() as usize),
        }
    }

    /// The capability flags of this instance.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::Around(_) => Capabilities {
                around: true,
                invocation: false,
            },
            Self::Invocation(_) => Capabilities {
                around: false,
                invocation: true,
            },
            Self::Combined { .. } => Capabilities {
                around: true,
                invocation: true,
            },
        }
    }

    /// The Around view of this instance, if it satisfies the contract.
    #[must_use]
    pub fn as_around(&self) -> Option<Rc<dyn AroundRule>> {
        match self {
            Self::Around(rule) | Self::Combined { around: rule, .. } => Some(Rc::clone(rule)),
            Self::Invocation(_) => None,
        }
    }

    /// The Invocation view of this instance, if it satisfies the contract.
    #[must_use]
    pub fn as_invocation(&self) -> Option<Rc<dyn InvocationRule>> {
        match self {
            Self::Invocation(rule)
            | Self::Combined {
                invocation: rule, ..
            } => Some(Rc::clone(rule)),
            Self::Around(_) => None,
        }
    }
}

impl std::fmt::Debug for RuleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Around(_) => "Around",
            Self::Invocation(_) => "Invocation",
            Self::Combined { .. } => "Combined",
        };
        f.debug_struct("RuleValue")
            .field("kind", &kind)
            .field("id", &self.id())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
