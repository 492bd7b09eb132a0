//! # Statement Adapter
//!
//! The minimal executable-with-failure-semantics unit the composition
//! engine produces and consumes.
//!
//! A rule's `apply`/`apply_invocation` returns a new statement; it may be a
//! pass-through, may run setup/teardown around the inner statement, or may
//! never invoke the inner statement at all (e.g. to skip). Composition makes
//! no assumption about whether the inner statement is ever invoked; only
//! the external executor inspects the final evaluation outcome.

use crate::RuleError;
use std::rc::Rc;

// =============================================================================
// STATEMENT TRAIT
// =============================================================================

/// An executable unit that may fail.
///
/// The external executor calls `evaluate` exactly once on the final
/// composed statement. Composition never inspects statement internals,
/// it only wraps them.
///
/// Statements are reference-counted (`Rc`, not `Arc`): composition and
/// evaluation run on one logical thread of control per unit.
pub trait Statement {
    /// Run the unit. Errors propagate outward through the wrapper chain
    /// exactly as a stack unwinds.
    fn evaluate(&self) -> Result<(), RuleError>;
}

/// Shared handle to a statement.
///
/// Pointer identity on this handle is observable: a hierarchy with zero
/// rules composes back to the identical base handle.
pub type StatementRef = Rc<dyn Statement>;

// =============================================================================
// FAIL STATEMENT
// =============================================================================

/// A statement that always fails with a fixed, pre-determined error.
///
/// Used by the composer when metadata retrieval signals restricted access:
/// the whole composition fails immediately and the executor receives this
/// statement, which surfaces the original cause unmodified on every
/// evaluation.
#[derive(Debug, Clone)]
pub struct FailStatement {
    error: RuleError,
}

impl FailStatement {
    /// Create a failing statement carrying the given cause.
    #[must_use]
    pub fn new(error: RuleError) -> Self {
        Self { error }
    }

    /// The cause this statement fails with.
    #[must_use]
    pub fn error(&self) -> &RuleError {
        &self.error
    }
}

impl Statement for FailStatement {
    fn evaluate(&self) -> Result<(), RuleError> {
        Err(self.error.clone())
    }
}

// =============================================================================
// CLOSURE ADAPTER
// =============================================================================

/// Statement backed by a closure.
struct FnStatement<F: Fn() -> Result<(), RuleError>> {
    body: F,
}

impl<F: Fn() -> Result<(), RuleError>> Statement for FnStatement<F> {
    fn evaluate(&self) -> Result<(), RuleError> {
        (self.body)()
    }
}

/// Wrap a closure as a statement handle.
///
/// Convenient for base actions and for pass-through rule wrappers.
#[must_use]
pub fn statement_fn<F>(body: F) -> StatementRef
where
    F: Fn() -> Result<(), RuleError> + 'static,
{
    Rc::new(FnStatement { body })
}

// =============================================================================
// TESTS
// =============================================================================
