//! # Rule Provider Interface
//!
//! The external metadata provider: enumeration of rule-producing members
//! declared on a context, queried per owning level and per value
//! capability. The engine never reimplements member discovery (reflection,
//! annotation scanning); a concrete provider is injected per platform.
//!
//! ## Member order
//!
//! Providers must preserve member-declaration order within a level. A
//! platform whose contexts distinguish method members from field members
//! must yield methods before fields in the Around query; [`StaticProvider`]
//! keeps one flat list per capability, so for it declaration order is the
//! whole contract.

use crate::capability::RuleValue;
use crate::{AroundRule, ContextId, ContextRef, InvocationRule, RuleError};
use std::collections::BTreeMap;
use std::rc::Rc;

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Value-capability selector for a member query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleQuery {
    /// Members whose value satisfies the Around contract.
    Around,
    /// Members whose value satisfies the Invocation contract.
    Invocation,
}

/// External enumeration of rule-producing members.
pub trait RuleProvider {
    /// The rule values declared on `owner` matching `query`, in
    /// declaration order.
    ///
    /// An instance satisfying both contracts must be returned from both
    /// queries backed by the same allocation, so that its identity matches
    /// across the two capability views.
    ///
    /// Fails with [`RuleError::Access`] when a declared member cannot be
    /// read; the composer turns that into an immediate always-failing
    /// statement.
    fn rule_members(
        &self,
        owner: &ContextRef,
        query: RuleQuery,
    ) -> Result<Vec<RuleValue>, RuleError>;
}

// =============================================================================
// STATIC PROVIDER
// =============================================================================

/// Per-level declared members, in declaration order.
#[derive(Default)]
struct LevelMembers {
    around: Vec<RuleValue>,
    invocation: Vec<RuleValue>,
}

/// Declarative in-memory provider.
///
/// Callers state each context's rule members explicitly, in the order they
/// are declared. Uses `BTreeMap` for deterministic iteration.
#[derive(Default)]
pub struct StaticProvider {
    members: BTreeMap<ContextId, LevelMembers>,
    restricted: BTreeMap<ContextId, String>,
}

impl StaticProvider {
    /// Create a provider with no declarations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an Around-capable rule member on `owner`.
    pub fn declare_around(&mut self, owner: &ContextRef, rule: Rc<dyn AroundRule>) {
        self.members
            .entry(owner.id())
            .or_default()
            .around
            .push(RuleValue::Around(rule));
    }

    /// Declare an Invocation-capable rule member on `owner`.
    pub fn declare_invocation(&mut self, owner: &ContextRef, rule: Rc<dyn InvocationRule>) {
        self.members
            .entry(owner.id())
            .or_default()
            .invocation
            .push(RuleValue::Invocation(rule));
    }

    /// Declare a rule member on `owner` that satisfies both contracts.
    ///
    /// The member shows up in both queries with one shared identity, which
    /// is what drives subsumption in the registry.
    pub fn declare_combined<R>(&mut self, owner: &ContextRef, rule: Rc<R>)
    where
        R: AroundRule + InvocationRule + 'static,
    {
        let value = RuleValue::combined(rule);
        let level = self.members.entry(owner.id()).or_default();
        level.invocation.push(value.clone());
        level.around.push(value);
    }

    /// Mark `owner` as access-restricted: every query against it fails
    /// with [`RuleError::Access`] carrying `reason`.
    pub fn restrict(&mut self, owner: &ContextRef, reason: impl Into<String>) {
        self.restricted.insert(owner.id(), reason.into());
    }
}

impl RuleProvider for StaticProvider {
    fn rule_members(
        &self,
        owner: &ContextRef,
        query: RuleQuery,
    ) -> Result<Vec<RuleValue>, RuleError> {
        if let Some(reason) = self.restricted.get(&owner.id()) {
            return Err(RuleError::Access(reason.clone()));
        }
        let members = match self.members.get(&owner.id()) {
            Some(level) => match query {
                RuleQuery::Around => level.around.clone(),
                RuleQuery::Invocation => level.invocation.clone(),
            },
            None => Vec::new(),
        };
        Ok(members)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementRef;
    use crate::{MethodId, UnitDescription};

    struct Ctx;

    struct PassThrough;

    impl AroundRule for PassThrough {
        fn apply(&self, inner: StatementRef, _description: &UnitDescription) -> StatementRef {
            inner
        }
    }

    impl InvocationRule for PassThrough {
        fn apply_invocation(
            &self,
            inner: StatementRef,
            _method: &MethodId,
            _target: &ContextRef,
        ) -> StatementRef {
            inner
        }
    }

    #[test]
    fn undeclared_context_yields_no_members() {
        let ctx = ContextRef::new(Ctx);
        let provider = StaticProvider::new();

        let members = provider
            .rule_members(&ctx, RuleQuery::Around)
            .expect("query");
        assert!(members.is_empty());
    }

    #[test]
    fn declaration_order_is_preserved() {
        let ctx = ContextRef::new(Ctx);
        let first: Rc<dyn AroundRule> = Rc::new(PassThrough);
        let second: Rc<dyn AroundRule> = Rc::new(PassThrough);

        let mut provider = StaticProvider::new();
        provider.declare_around(&ctx, Rc::clone(&first));
        provider.declare_around(&ctx, Rc::clone(&second));

        let members = provider
            .rule_members(&ctx, RuleQuery::Around)
            .expect("query");
        let ids: Vec<_> = members.iter().map(RuleValue::id).collect();
        assert_eq!(
            ids,
            vec![
                RuleValue::Around(first).id(),
                RuleValue::Around(second).id()
            ]
        );
    }

    #[test]
    fn combined_declaration_appears_in_both_queries_with_one_identity() {
        let ctx = ContextRef::new(Ctx);
        let mut provider = StaticProvider::new();
        provider.declare_combined(&ctx, Rc::new(PassThrough));

        let around = provider
            .rule_members(&ctx, RuleQuery::Around)
            .expect("query");
        let invocation = provider
            .rule_members(&ctx, RuleQuery::Invocation)
            .expect("query");

        assert_eq!(around.len(), 1);
        assert_eq!(invocation.len(), 1);
        assert_eq!(around[0].id(), invocation[0].id());
        assert!(around[0].capabilities().around);
        assert!(around[0].capabilities().invocation);
    }

    #[test]
    fn restricted_context_fails_with_access_error() {
        let ctx = ContextRef::new(Ctx);
        let mut provider = StaticProvider::new();
        provider.declare_around(&ctx, Rc::new(PassThrough));
        provider.restrict(&ctx, "field `rule` is not visible");

        let result = provider.rule_members(&ctx, RuleQuery::Invocation);
        assert_eq!(
            result.expect_err("query must fail"),
            RuleError::Access("field `rule` is not visible".into())
        );
    }
}
