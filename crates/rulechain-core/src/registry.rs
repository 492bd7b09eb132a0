//! # Rule Registry
//!
//! Per-composition-run accumulation of discovered rule instances.
//!
//! The registry is built fresh for each composition request and discarded
//! once the final statement is produced. It records:
//! - Invocation-capable entries in discovery order, each keyed to its
//!   owning level;
//! - Around-capable rules per level, insertion order preserved;
//! - the subsumption set: identities of Invocation-capable instances that
//!   are also Around-capable. Around capability takes precedence, expressed
//!   through subsumption rather than overwriting, so such an instance is
//!   applied exactly once, via the Around path. The check is independent of
//!   the order the two capability views are collected in, so it holds even
//!   when the views are declared at different hierarchy levels.

use crate::capability::RuleValue;
use crate::hierarchy::OwningChain;
use crate::provider::{RuleProvider, RuleQuery};
use crate::{AroundRule, ContextId, InvocationRule, RuleError, RuleId};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::debug;

// =============================================================================
// ENTRIES
// =============================================================================

/// One discovered Invocation-capable rule, keyed to its owning level.
#[derive(Clone)]
pub struct InvocationEntry {
    level: ContextId,
    id: RuleId,
    rule: Rc<dyn InvocationRule>,
}

impl InvocationEntry {
    /// The level the rule was declared on.
    #[must_use]
    pub fn level(&self) -> ContextId {
        self.level
    }

    /// Identity of the rule instance.
    #[must_use]
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// The rule instance itself.
    #[must_use]
    pub fn rule(&self) -> &Rc<dyn InvocationRule> {
        &self.rule
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Accumulated rule instances for one composition run.
#[derive(Default)]
pub struct RuleRegistry {
    /// Invocation-capable entries, discovery order across levels.
    invocation: Vec<InvocationEntry>,
    /// Around-capable rules per owning level, declaration order per level.
    around: BTreeMap<ContextId, Vec<Rc<dyn AroundRule>>>,
    /// Identities of all collected Around-capable rules, across levels.
    around_ids: BTreeSet<RuleId>,
    /// Identities excluded from Invocation-capable application.
    subsumed: BTreeSet<RuleId>,
}

impl RuleRegistry {
    /// Discover and classify the rules declared along `chain`.
    ///
    /// Levels are processed innermost to outermost; within a level,
    /// Invocation-capable members are collected before Around-capable
    /// members. An instance whose identity shows up through both
    /// capability views is marked subsumed no matter which view arrives
    /// first, including views declared at different levels.
    ///
    /// Any provider failure aborts population: composition never proceeds
    /// with a partial registry.
    pub fn populate(chain: &OwningChain, provider: &dyn RuleProvider) -> Result<Self, RuleError> {
        let mut registry = Self::default();
        for level in chain.levels() {
            let level_id = level.id();
            for member in provider.rule_members(level, RuleQuery::Invocation)? {
                registry.add_invocation(level_id, &member);
            }
            for member in provider.rule_members(level, RuleQuery::Around)? {
                registry.add_around(level_id, &member);
            }
        }
        debug!(
            invocation = registry.invocation.len(),
            around = registry.around_rule_count(),
            subsumed = registry.subsumed.len(),
            "populated rule registry"
        );
        Ok(registry)
    }

    fn add_invocation(&mut self, level: ContextId, member: &RuleValue) {
        if let Some(rule) = member.as_invocation() {
            let id = member.id();
            if self.around_ids.contains(&id) {
                debug!(rule = ?id, "invocation application subsumed by around capability");
                self.subsumed.insert(id);
            }
            self.invocation.push(InvocationEntry { level, id, rule });
        }
    }

    fn add_around(&mut self, level: ContextId, member: &RuleValue) {
        if let Some(rule) = member.as_around() {
            let id = member.id();
            if self.invocation.iter().any(|entry| entry.id == id) {
                debug!(rule = ?id, "invocation application subsumed by around capability");
                self.subsumed.insert(id);
            }
            self.around_ids.insert(id);
            self.around.entry(level).or_default().push(rule);
        }
    }

    /// Whether Invocation-capable application of `id` is suppressed.
    #[must_use]
    pub fn is_subsumed(&self, id: RuleId) -> bool {
        self.subsumed.contains(&id)
    }

    /// Around-capable rules declared on `level`, declaration order.
    /// Empty if the level declares none.
    #[must_use]
    pub fn around_rules_at(&self, level: ContextId) -> &[Rc<dyn AroundRule>] {
        self.around.get(&level).map_or(&[], Vec::as_slice)
    }

    /// Whether any level declares an Around-capable rule.
    ///
    /// A chain without any lets the composer skip the Around pass entirely,
    /// keeping the statement graph minimal.
    #[must_use]
    pub fn has_any_around_rule(&self) -> bool {
        self.around.values().any(|rules| !rules.is_empty())
    }

    /// Invocation-capable entries declared on `level`, discovery order.
    pub fn invocation_rules_at(
        &self,
        level: ContextId,
    ) -> impl Iterator<Item = &InvocationEntry> {
        self.invocation
            .iter()
            .filter(move |entry| entry.level == level)
    }

    /// Total number of Invocation-capable entries.
    #[must_use]
    pub fn invocation_rule_count(&self) -> usize {
        self.invocation.len()
    }

    /// Total number of Around-capable rules across all levels.
    #[must_use]
    pub fn around_rule_count(&self) -> usize {
        self.around.values().map(Vec::len).sum()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;
    use crate::statement::StatementRef;
    use crate::{ContextRef, MethodId, UnitDescription};

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

    fn chain_of(levels: &[&ContextRef]) -> OwningChain {
        OwningChain::from_levels(levels.iter().map(|level| (*level).clone()).collect())
    }

    #[test]
    fn empty_chain_members_yield_empty_registry() {
        let target = ContextRef::new(Ctx);
        let provider = StaticProvider::new();

        let registry =
            RuleRegistry::populate(&chain_of(&[&target]), &provider).expect("populate");

        assert_eq!(registry.invocation_rule_count(), 0);
        assert_eq!(registry.around_rule_count(), 0);
        assert!(!registry.has_any_around_rule());
        assert!(registry.around_rules_at(target.id()).is_empty());
    }

    #[test]
    fn rules_are_keyed_to_their_declaration_level() {
        let outer = ContextRef::new(Ctx);
        let inner = ContextRef::new(Ctx);

        let mut provider = StaticProvider::new();
        provider.declare_around(&outer, Rc::new(PassThrough));
        provider.declare_invocation(&inner, Rc::new(PassThrough));

        let registry =
            RuleRegistry::populate(&chain_of(&[&inner, &outer]), &provider).expect("populate");

        assert_eq!(registry.around_rules_at(outer.id()).len(), 1);
        assert!(registry.around_rules_at(inner.id()).is_empty());
        assert_eq!(registry.invocation_rules_at(inner.id()).count(), 1);
        assert_eq!(registry.invocation_rules_at(outer.id()).count(), 0);
        assert!(registry.has_any_around_rule());
    }

    #[test]
    fn combined_instance_is_registered_around_and_marked_subsumed() {
        let target = ContextRef::new(Ctx);
        let mut provider = StaticProvider::new();
        provider.declare_combined(&target, Rc::new(PassThrough));

        let registry =
            RuleRegistry::populate(&chain_of(&[&target]), &provider).expect("populate");

        assert_eq!(registry.around_rules_at(target.id()).len(), 1);
        let entry = registry
            .invocation_rules_at(target.id())
            .next()
            .expect("invocation entry");
        assert!(registry.is_subsumed(entry.id()));
    }

    #[test]
    fn subsumption_spans_levels() {
        // One shared instance: Invocation-declared on the inner level,
        // Around-declared on the outer level.
        let outer = ContextRef::new(Ctx);
        let inner = ContextRef::new(Ctx);
        let shared = Rc::new(PassThrough);

        let mut provider = StaticProvider::new();
        provider.declare_invocation(&inner, shared.clone());
        provider.declare_around(&outer, shared.clone());

        let registry =
            RuleRegistry::populate(&chain_of(&[&inner, &outer]), &provider).expect("populate");

        let entry = registry
            .invocation_rules_at(inner.id())
            .next()
            .expect("invocation entry");
        assert!(registry.is_subsumed(entry.id()));
        assert_eq!(registry.around_rules_at(outer.id()).len(), 1);
    }

    #[test]
    fn subsumption_holds_when_the_around_view_is_collected_first() {
        // The reverse split: Around-declared on the inner level, so its
        // view is collected before the outer level's Invocation view.
        let outer = ContextRef::new(Ctx);
        let inner = ContextRef::new(Ctx);
        let shared = Rc::new(PassThrough);

        let mut provider = StaticProvider::new();
        provider.declare_around(&inner, shared.clone());
        provider.declare_invocation(&outer, shared.clone());

        let registry =
            RuleRegistry::populate(&chain_of(&[&inner, &outer]), &provider).expect("populate");

        let entry = registry
            .invocation_rules_at(outer.id())
            .next()
            .expect("invocation entry");
        assert!(registry.is_subsumed(entry.id()));
        assert_eq!(registry.around_rules_at(inner.id()).len(), 1);
    }

    #[test]
    fn separate_instances_are_not_subsumed() {
        let target = ContextRef::new(Ctx);
        let mut provider = StaticProvider::new();
        provider.declare_invocation(&target, Rc::new(PassThrough));
        provider.declare_around(&target, Rc::new(PassThrough));

        let registry =
            RuleRegistry::populate(&chain_of(&[&target]), &provider).expect("populate");

        let entry = registry
            .invocation_rules_at(target.id())
            .next()
            .expect("invocation entry");
        assert!(!registry.is_subsumed(entry.id()));
    }

    #[test]
    fn provider_failure_aborts_population() {
        let outer = ContextRef::new(Ctx);
        let inner = ContextRef::new(Ctx);

        let mut provider = StaticProvider::new();
        provider.declare_around(&inner, Rc::new(PassThrough));
        provider.restrict(&outer, "method `rule` is not visible");

        let result = RuleRegistry::populate(&chain_of(&[&inner, &outer]), &provider);

        assert_eq!(
            result.err(),
            Some(RuleError::Access("method `rule` is not visible".into()))
        );
    }
}
