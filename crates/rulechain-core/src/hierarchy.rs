//! # Hierarchy Walker
//!
//! Produces the ordered sequence of owning instances from the innermost
//! (closest to the action) to the outermost (root context).
//!
//! The "owner of an instance" relation is supplied externally through
//! [`OwnerResolver`]; the engine never infers it structurally. The chain is
//! computed once per composition call as a plain ordered value, not as a
//! live traversal of opaque object internals. Cycle-freedom is part of the
//! resolver's contract and is not re-checked here.

use crate::{ContextId, ContextRef, RuleError};
use std::collections::BTreeMap;
use tracing::debug;

// =============================================================================
// OWNER RESOLVER
// =============================================================================

/// External lookup from an instance to the instance that constructed it.
pub trait OwnerResolver {
    /// The enclosing instance of `instance`, or `None` at the root.
    ///
    /// Failures (e.g. a restricted enclosing reference) propagate and abort
    /// the composition run.
    fn owner_of(&self, instance: &ContextRef) -> Result<Option<ContextRef>, RuleError>;
}

/// Owner resolver backed by an explicit link table.
///
/// The injectable, non-reflective resolver: callers declare each
/// child-to-owner link up front. Unlinked instances are roots.
#[derive(Debug, Default)]
pub struct StaticOwners {
    links: BTreeMap<ContextId, ContextRef>,
}

impl StaticOwners {
    /// Create an empty link table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `owner` constructed `child`.
    pub fn link(&mut self, child: &ContextRef, owner: &ContextRef) {
        self.links.insert(child.id(), owner.clone());
    }
}

impl OwnerResolver for StaticOwners {
    fn owner_of(&self, instance: &ContextRef) -> Result<Option<ContextRef>, RuleError> {
        Ok(self.links.get(&instance.id()).cloned())
    }
}

// =============================================================================
// OWNING CHAIN
// =============================================================================

/// Ordered sequence of owning instances, innermost first.
///
/// Always contains at least the target itself. Every element except the
/// first is the resolved owner of its predecessor.
#[derive(Debug, Clone)]
pub struct OwningChain {
    levels: Vec<ContextRef>,
}

impl OwningChain {
    /// Build a chain directly from an innermost-first level sequence.
    ///
    /// `walk` is the usual constructor; this exists for callers that
    /// already hold the resolved levels.
    #[must_use]
    pub fn from_levels(levels: Vec<ContextRef>) -> Self {
        Self { levels }
    }

    /// The levels, innermost first.
    #[must_use]
    pub fn levels(&self) -> &[ContextRef] {
        &self.levels
    }

    /// The innermost instance (the composition target).
    #[must_use]
    pub fn innermost(&self) -> Option<&ContextRef> {
        self.levels.first()
    }

    /// Number of levels in the chain.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

/// Walk the owning chain of `target`, innermost to outermost.
///
/// Repeatedly resolves owners until the resolver returns `None`. The
/// returned chain includes `target` itself. Pure, no side effects; the
/// only failure mode is a resolver failure, which is propagated.
pub fn walk(target: &ContextRef, resolver: &dyn OwnerResolver) -> Result<OwningChain, RuleError> {
    let mut levels = vec![target.clone()];
    let mut current = target.clone();
    while let Some(owner) = resolver.owner_of(&current)? {
        levels.push(owner.clone());
        current = owner;
    }
    debug!(innermost = ?target.id(), depth = levels.len(), "walked owning chain");
    Ok(OwningChain::from_levels(levels))
}

// =============================================================================
// TESTS
// =============================================================================
