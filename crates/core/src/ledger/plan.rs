//! Turning an operation and its context into concrete mutations.
//!
//! Planning is pure: everything that can be rejected without storage is rejected
//! here, before a session is opened.

use serde::Serialize;
use tally_shared::types::UserId;

use super::context::{AllowancePolicy, OperationContext};
use super::entry::{NewLedgerEntry, RelatedEntity};
use super::error::LedgerError;
use crate::account::AccountKind;
use crate::catalog::{ConversionRateProvider, DeltaRule, OperationSpec, OperationType, SideEffect};
use crate::credential::Provider;

/// One balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedMutation {
    /// Account to mutate.
    pub kind: AccountKind,
    /// Signed delta, never zero.
    pub delta: i64,
}

/// Side effect resolved against the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlannedSideEffect {
    /// Touch the owner's credential for this provider.
    TouchCredential(Provider),
}

/// Fully validated work for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// The owning user.
    pub owner_id: UserId,
    /// The operation.
    pub operation: OperationType,
    /// Mutations in order; zero-valued scaled deltas are already dropped.
    pub mutations: Vec<PlannedMutation>,
    /// Free-action policy, `Charge` for operations that are not free-eligible.
    pub allowance: AllowancePolicy,
    /// Reference to claim before mutating.
    pub external_reference: Option<String>,
    /// Payout destination to record on the Funds account.
    pub withdraw_address: Option<String>,
    /// Side effect, if any.
    pub side_effect: Option<PlannedSideEffect>,
    /// Entry reason.
    pub reason: Option<String>,
    /// Entry traded resource.
    pub resource_traded: Option<String>,
    /// Entry related entities.
    pub related_entities: Vec<RelatedEntity>,
}

/// Longest stored reference, address, resource or related-entity id.
pub const MAX_FIELD_LEN: usize = 255;

/// Rejects a value longer than [`MAX_FIELD_LEN`] characters.
pub fn check_field_len(field: &str, value: &str) -> Result<(), LedgerError> {
    let len = value.chars().count();
    if len > MAX_FIELD_LEN {
        return Err(LedgerError::Validation(format!(
            "{field} is {len} characters, at most {MAX_FIELD_LEN} allowed"
        )));
    }
    Ok(())
}

fn non_blank(field: &str, value: Option<&String>) -> Result<Option<String>, LedgerError> {
    match value.map(|v| v.trim()) {
        None => Ok(None),
        Some("") => Err(LedgerError::Validation(format!("{field} must not be blank"))),
        Some(v) => {
            check_field_len(field, v)?;
            Ok(Some(v.to_string()))
        }
    }
}

impl ExecutionPlan {
    /// Validates `ctx` against `spec` and computes every mutation.
    ///
    /// The context's conversion rate wins over `rates`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a missing, non-positive or unexpected amount, a
    /// missing reference, provider or withdraw address, a free-action policy on an
    /// operation that has no free actions, or a conversion overflow.
    pub fn build(
        owner_id: UserId,
        spec: &OperationSpec,
        ctx: &OperationContext,
        rates: &dyn ConversionRateProvider,
    ) -> Result<Self, LedgerError> {
        let operation = spec.operation;

        let base = match (spec.delta, ctx.amount) {
            (DeltaRule::Fixed(delta), None) => delta,
            (DeltaRule::Fixed(_), Some(_)) => {
                return Err(LedgerError::Validation(format!(
                    "{operation} does not take an amount"
                )));
            }
            (DeltaRule::Supplied(_), None) => {
                return Err(LedgerError::Validation(format!(
                    "{operation} requires an amount"
                )));
            }
            (DeltaRule::Supplied(_), Some(amount)) if amount <= 0 => {
                return Err(LedgerError::Validation(format!(
                    "amount must be positive, got {amount}"
                )));
            }
            (DeltaRule::Supplied(sign), Some(amount)) => sign.apply(amount),
        };

        let external_reference = non_blank("external reference", ctx.external_reference.as_ref())?;
        if spec.requires_reference && external_reference.is_none() {
            return Err(LedgerError::Validation(format!(
                "{operation} requires an external reference"
            )));
        }

        let withdraw_address = non_blank("withdraw address", ctx.withdraw_address.as_ref())?;
        if spec.requires_withdraw_address && withdraw_address.is_none() {
            return Err(LedgerError::Validation(format!(
                "{operation} requires a withdraw address"
            )));
        }

        if let Some(resource) = &ctx.resource_traded {
            check_field_len("traded resource", resource)?;
        }
        for related in &ctx.related_entities {
            check_field_len("related entity id", &related.entity_id)?;
        }

        let side_effect = match spec.side_effect {
            Some(SideEffect::TouchCredential) => {
                let provider = ctx.provider.ok_or_else(|| {
                    LedgerError::Validation(format!("{operation} requires a social provider"))
                })?;
                Some(PlannedSideEffect::TouchCredential(provider))
            }
            None => None,
        };

        if ctx.allowance != AllowancePolicy::Charge && !spec.free_eligible {
            return Err(LedgerError::Validation(format!(
                "{operation} has no free allowance"
            )));
        }

        let mut mutations = Vec::with_capacity(spec.accounts.len());
        for &kind in &spec.accounts {
            let delta = if spec.rate_scaled && kind == AccountKind::Funds {
                let rate = match ctx.conversion_rate {
                    Some(rate) => rate,
                    None => rates.funds_rate()?,
                };
                rate.scale(base)?
            } else {
                base
            };
            if delta != 0 {
                mutations.push(PlannedMutation { kind, delta });
            }
        }

        Ok(Self {
            owner_id,
            operation,
            mutations,
            allowance: ctx.allowance,
            external_reference,
            withdraw_address,
            side_effect,
            reason: ctx.reason.clone(),
            resource_traded: ctx.resource_traded.clone(),
            related_entities: ctx.related_entities.clone(),
        })
    }

    /// The ledger entry describing `mutation` once it produced `balance_after`.
    pub fn entry_for(
        &self,
        mutation: PlannedMutation,
        balance_after: i64,
    ) -> Result<NewLedgerEntry, LedgerError> {
        let mut entry = NewLedgerEntry::for_mutation(
            self.owner_id,
            mutation.kind,
            self.operation,
            mutation.delta,
            balance_after,
        )?;
        entry.reason.clone_from(&self.reason);
        entry.resource_traded.clone_from(&self.resource_traded);
        entry.external_reference.clone_from(&self.external_reference);
        entry.related_entities.clone_from(&self.related_entities);
        Ok(entry)
    }

    /// Whether the plan may be settled with a free action.
    #[must_use]
    pub fn wants_free_action(&self) -> bool {
        self.allowance != AllowancePolicy::Charge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ConversionRate, OperationCatalog};
    use crate::ledger::{Flow, RelatedEntityType};

    fn plan(op: OperationType, ctx: &OperationContext) -> Result<ExecutionPlan, LedgerError> {
        let catalog = OperationCatalog::builtin();
        let rate = ConversionRate::from_percent(40).unwrap();
        ExecutionPlan::build(UserId::new(), catalog.resolve(op).unwrap(), ctx, &rate)
    }

    #[test]
    fn test_deposit_scales_funds_by_rate() {
        let ctx = OperationContext::new()
            .with_amount(100)
            .with_reference("0xabc");
        let plan = plan(OperationType::Deposit, &ctx).unwrap();
        assert_eq!(
            plan.mutations,
            vec![
                PlannedMutation {
                    kind: AccountKind::Credit,
                    delta: 100
                },
                PlannedMutation {
                    kind: AccountKind::Funds,
                    delta: 40
                },
            ]
        );
        assert_eq!(plan.external_reference.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_context_rate_overrides_provider() {
        let ctx = OperationContext::new()
            .with_amount(100)
            .with_reference("0xabc")
            .with_conversion_rate(ConversionRate::from_percent(25).unwrap());
        let plan = plan(OperationType::Deposit, &ctx).unwrap();
        assert_eq!(plan.mutations[1].delta, 25);
    }

    #[test]
    fn test_zero_scaled_funds_delta_is_skipped() {
        let ctx = OperationContext::new().with_amount(2).with_reference("0x1");
        let plan = plan(OperationType::Deposit, &ctx).unwrap();
        assert_eq!(plan.mutations.len(), 1);
        assert_eq!(plan.mutations[0].kind, AccountKind::Credit);
    }

    #[test]
    fn test_withdraw_is_negative_and_needs_address() {
        let ctx = OperationContext::new().with_amount(50).with_reference("0x2");
        assert!(matches!(
            plan(OperationType::Withdraw, &ctx),
            Err(LedgerError::Validation(_))
        ));

        let ctx = ctx.with_withdraw_address("0xpayout");
        let plan = plan(OperationType::Withdraw, &ctx).unwrap();
        assert_eq!(plan.mutations[0].delta, -50);
        assert_eq!(plan.mutations[1].delta, -20);
        assert_eq!(plan.withdraw_address.as_deref(), Some("0xpayout"));
    }

    #[test]
    fn test_overlong_fields_are_rejected() {
        let long = "x".repeat(MAX_FIELD_LEN + 1);
        let exact = "x".repeat(MAX_FIELD_LEN);

        let ctx = OperationContext::new().with_amount(100).with_reference(&long);
        assert!(matches!(
            plan(OperationType::Deposit, &ctx),
            Err(LedgerError::Validation(ref msg)) if msg.contains("external reference")
        ));
        let ctx = OperationContext::new().with_amount(100).with_reference(&exact);
        assert!(plan(OperationType::Deposit, &ctx).is_ok());

        let ctx = OperationContext::new()
            .with_amount(50)
            .with_reference("0x9")
            .with_withdraw_address(&long);
        assert!(matches!(
            plan(OperationType::Withdraw, &ctx),
            Err(LedgerError::Validation(_))
        ));

        let ctx = OperationContext::new().with_resource(&long);
        assert!(matches!(
            plan(OperationType::Buy, &ctx),
            Err(LedgerError::Validation(_))
        ));

        let ctx = OperationContext::new()
            .with_related(RelatedEntity::new(RelatedEntityType::Post, long.as_str()));
        assert!(matches!(
            plan(OperationType::Reply, &ctx),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_supplied_amount_validation() {
        let missing = OperationContext::new().with_reference("0x3");
        assert!(matches!(
            plan(OperationType::Deposit, &missing),
            Err(LedgerError::Validation(_))
        ));
        let negative = OperationContext::new().with_amount(-5).with_reference("0x3");
        assert!(matches!(
            plan(OperationType::Deposit, &negative),
            Err(LedgerError::Validation(_))
        ));
        let no_reference = OperationContext::new().with_amount(5);
        assert!(matches!(
            plan(OperationType::Deposit, &no_reference),
            Err(LedgerError::Validation(_))
        ));
        let blank_reference = OperationContext::new().with_amount(5).with_reference("  ");
        assert!(matches!(
            plan(OperationType::Deposit, &blank_reference),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_fixed_operation_rejects_amount() {
        let ctx = OperationContext::new().with_amount(8);
        assert!(matches!(
            plan(OperationType::Post, &ctx),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_contributor_operation_requires_provider() {
        assert!(matches!(
            plan(OperationType::ContributePost, &OperationContext::new()),
            Err(LedgerError::Validation(_))
        ));
        let ctx = OperationContext::new().with_provider(Provider::Twitter);
        let plan = plan(OperationType::ContributePost, &ctx).unwrap();
        assert_eq!(
            plan.side_effect,
            Some(PlannedSideEffect::TouchCredential(Provider::Twitter))
        );
    }

    #[test]
    fn test_free_policy_only_on_free_eligible() {
        let ctx = OperationContext::new().with_allowance(AllowancePolicy::PreferFree);
        assert!(plan(OperationType::Post, &ctx).unwrap().wants_free_action());
        assert!(matches!(
            plan(OperationType::Reply, &ctx),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_entry_for_carries_metadata() {
        let ctx = OperationContext::new()
            .with_resource("sword-01")
            .with_reason("market")
            .with_related(RelatedEntity::new(RelatedEntityType::Resource, "sword-01"));
        let plan = plan(OperationType::Buy, &ctx).unwrap();
        let entry = plan.entry_for(plan.mutations[0], 20).unwrap();
        assert_eq!(entry.flow, Flow::Outcome);
        assert_eq!(entry.delta, 100);
        assert_eq!(entry.resource_traded.as_deref(), Some("sword-01"));
        assert_eq!(entry.reason.as_deref(), Some("market"));
        assert_eq!(entry.related_entities.len(), 1);
    }
}
