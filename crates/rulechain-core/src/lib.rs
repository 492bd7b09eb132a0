//! # rulechain-core
//!
//! The hierarchical rule composition engine - THE LOGIC.
//!
//! This crate resolves behavioral decorators ("rules") declared across a
//! chain of nested owning contexts (an object and the sequence of
//! enclosing objects that constructed it) and composes them into a single
//! executable statement wrapping a base action. It is the engine behind
//! running a test method whose fixtures are declared at multiple nesting
//! levels of a composition-built hierarchy.
//!
//! ## Data Flow
//!
//! ```text
//! hierarchy::walk ──> OwningChain (innermost first)
//!                         │
//! RuleProvider ──> RuleRegistry::populate (classify + subsume)
//!                         │
//!                  Composer::compose ──> StatementRef ──> executor
//! ```
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network, no I/O of its own
//! - Deterministic: `BTreeMap`/`BTreeSet` only, identity-keyed
//! - Request-scoped: registry and chain are built and consumed within one
//!   composition call; no state is shared across calls
//! - Closed: member discovery (`RuleProvider`) and owner lookup
//!   (`OwnerResolver`) are injected, never reimplemented inside the core
//! - Single-threaded: statements and rules are `Rc`-shared; the host runs
//!   each unit on one logical thread of control

// =============================================================================
// MODULES
// =============================================================================

pub mod capability;
pub mod composer;
pub mod hierarchy;
pub mod provider;
pub mod registry;
pub mod statement;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{ContextId, ContextRef, MethodId, RuleError, RuleId, UnitDescription};

// =============================================================================
// RE-EXPORTS: Capability Model
// =============================================================================

pub use capability::{AroundRule, Capabilities, InvocationRule, RuleValue};

// =============================================================================
// RE-EXPORTS: Statement Adapter
// =============================================================================

pub use statement::{FailStatement, Statement, StatementRef, statement_fn};

// =============================================================================
// RE-EXPORTS: Hierarchy, Registry, Composition
// =============================================================================

pub use composer::{Composer, Composite};
pub use hierarchy::{OwnerResolver, OwningChain, StaticOwners, walk};
pub use provider::{RuleProvider, RuleQuery, StaticProvider};
pub use registry::{InvocationEntry, RuleRegistry};
