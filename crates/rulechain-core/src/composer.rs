//! # Composition Engine
//!
//! Builds the final wrapped statement from the owning chain and the
//! populated registry.
//!
//! Both passes proceed level by level, innermost to outermost, so a rule
//! declared at a given level wraps all the composed behavior of inner
//! levels but is itself wrapped by rules further out: the outermost rule's
//! before-logic runs first, its after-logic runs last.

use crate::hierarchy::{OwnerResolver, OwningChain, walk};
use crate::provider::RuleProvider;
use crate::registry::RuleRegistry;
use crate::statement::{FailStatement, Statement, StatementRef};
use crate::{AroundRule, ContextRef, MethodId, RuleError, UnitDescription};
use std::rc::Rc;
use tracing::{debug, warn};

// =============================================================================
// PER-LEVEL AROUND WRAPPER
// =============================================================================

/// A single combined wrapper for all Around-capable rules of one level.
///
/// On evaluation it applies each rule's `apply` in sequence, the first
/// rule wrapping the inner statement and each later rule wrapping the
/// previous result, then evaluates the outermost statement. Levels with
/// no Around rules get no wrapper at all, so a rule-free hierarchy
/// composes back to the identical base statement.
pub struct Composite {
    inner: StatementRef,
    rules: Vec<Rc<dyn AroundRule>>,
    description: UnitDescription,
}

impl Composite {
    /// Combine the Around rules of one level over `inner`.
    #[must_use]
    pub fn new(
        inner: StatementRef,
        rules: Vec<Rc<dyn AroundRule>>,
        description: UnitDescription,
    ) -> Self {
        Self {
            inner,
            rules,
            description,
        }
    }
}

impl Statement for Composite {
    fn evaluate(&self) -> Result<(), RuleError> {
        let mut statement = Rc::clone(&self.inner);
        for rule in &self.rules {
            statement = rule.apply(statement, &self.description);
        }
        statement.evaluate()
    }
}

// =============================================================================
// COMPOSER
// =============================================================================

/// The composition engine.
///
/// Stateless; all state lives in the per-run chain and registry.
pub struct Composer;

impl Composer {
    /// Compose the final statement for one unit.
    ///
    /// Walks the chain innermost to outermost with two interleaved passes
    /// per level:
    ///
    /// 1. every non-subsumed Invocation-capable entry of the level wraps
    ///    the running statement, receiving the operation identity and the
    ///    instance *at that level*;
    /// 2. if the level declares Around-capable rules, one [`Composite`]
    ///    wrapper for the whole level wraps the running statement.
    ///
    /// With no rules anywhere the returned handle is the `base` handle
    /// itself (pointer-identical), never a no-op wrapper.
    #[must_use]
    pub fn compose(
        chain: &OwningChain,
        registry: &RuleRegistry,
        method: &MethodId,
        base: StatementRef,
        description: &UnitDescription,
    ) -> StatementRef {
        let wrap_around = registry.has_any_around_rule();
        let mut statement = base;
        for level in chain.levels() {
            let level_id = level.id();
            for entry in registry.invocation_rules_at(level_id) {
                if !registry.is_subsumed(entry.id()) {
                    statement = entry.rule().apply_invocation(statement, method, level);
                }
            }
            if wrap_around {
                let rules = registry.around_rules_at(level_id);
                if !rules.is_empty() {
                    debug!(level = ?level_id, rules = rules.len(), "wrapping level");
                    statement = Rc::new(Composite::new(
                        statement,
                        rules.to_vec(),
                        description.clone(),
                    ));
                }
            }
        }
        statement
    }

    /// Resolve, collect and compose in one step.
    ///
    /// Walks the owning chain of `target`, populates a fresh registry from
    /// `provider` and composes the final statement. If metadata retrieval
    /// signals restricted access, the whole composition fails immediately:
    /// the returned statement is an always-failing one carrying the
    /// original cause, and no partial rule chain is ever executed.
    #[must_use]
    pub fn build(
        target: &ContextRef,
        provider: &dyn RuleProvider,
        resolver: &dyn OwnerResolver,
        method: &MethodId,
        base: StatementRef,
        description: &UnitDescription,
    ) -> StatementRef {
        match Self::try_build(target, provider, resolver, method, base, description) {
            Ok(statement) => statement,
            Err(error) => {
                warn!(%error, unit = %description, "composition failed");
                Rc::new(FailStatement::new(error))
            }
        }
    }

    fn try_build(
        target: &ContextRef,
        provider: &dyn RuleProvider,
        resolver: &dyn OwnerResolver,
        method: &MethodId,
        base: StatementRef,
        description: &UnitDescription,
    ) -> Result<StatementRef, RuleError> {
        let chain = walk(target, resolver)?;
        let registry = RuleRegistry::populate(&chain, provider)?;
        Ok(Self::compose(&chain, &registry, method, base, description))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;
    use crate::statement::statement_fn;
    use std::cell::Cell;

    struct Ctx;

    /// Around rule that counts applications and passes the statement through.
    #[derive(Default)]
    struct CountingAround {
        applications: Cell<u32>,
    }

    impl AroundRule for CountingAround {
        fn apply(&self, inner: StatementRef, _description: &UnitDescription) -> StatementRef {
            self.applications.set(self.applications.get() + 1);
            inner
        }
    }

    fn unit() -> UnitDescription {
        UnitDescription::new("Ctx", "unit")
    }

    #[test]
    fn rule_free_chain_returns_the_base_handle_itself() {
        let target = ContextRef::new(Ctx);
        let chain = OwningChain::from_levels(vec![target]);
        let registry =
            RuleRegistry::populate(&chain, &StaticProvider::new()).expect("populate");
        let base = statement_fn(|| Ok(()));

        let composed = Composer::compose(
            &chain,
            &registry,
            &MethodId::new("unit"),
            Rc::clone(&base),
            &unit(),
        );

        assert!(Rc::ptr_eq(&composed, &base));
    }

    #[test]
    fn composite_applies_rules_lazily_on_evaluation() {
        let rule = Rc::new(CountingAround::default());
        let rules: Vec<Rc<dyn AroundRule>> = vec![rule.clone()];
        let composite = Composite::new(statement_fn(|| Ok(())), rules, unit());

        assert_eq!(rule.applications.get(), 0);
        composite.evaluate().expect("evaluate");
        assert_eq!(rule.applications.get(), 1);
    }

    #[test]
    fn build_short_circuits_restricted_access_to_a_failing_statement() {
        let target = ContextRef::new(Ctx);
        let mut provider = StaticProvider::new();
        provider.restrict(&target, "field `rule` is not visible");

        let statement = Composer::build(
            &target,
            &provider,
            &crate::hierarchy::StaticOwners::new(),
            &MethodId::new("unit"),
            statement_fn(|| Ok(())),
            &unit(),
        );

        assert_eq!(
            statement.evaluate(),
            Err(RuleError::Access("field `rule` is not visible".into()))
        );
    }
}
