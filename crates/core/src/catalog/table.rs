//! The operation table and its configuration overrides.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;
use tally_shared::LedgerConfig;

use super::operation::OperationType;
use crate::account::AccountKind;
use crate::ledger::LedgerError;

/// Sign of a caller-supplied magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    /// Credits the accounts.
    Positive,
    /// Debits the accounts.
    Negative,
}

impl Sign {
    /// Applies the sign to a positive magnitude.
    #[must_use]
    pub const fn apply(self, magnitude: i64) -> i64 {
        match self {
            Self::Positive => magnitude,
            Self::Negative => -magnitude,
        }
    }
}

/// How the base delta of an operation is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum DeltaRule {
    /// A constant signed delta.
    Fixed(i64),
    /// A caller-supplied positive magnitude with the given sign.
    Supplied(Sign),
}

/// Cross-entity work performed in the same session as the balance mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    /// Update `last_used_at` of the contributor's social credential.
    TouchCredential,
}

/// Catalog entry for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSpec {
    /// The operation.
    pub operation: OperationType,
    /// Accounts mutated, in mutation order.
    pub accounts: Vec<AccountKind>,
    /// Base delta rule.
    pub delta: DeltaRule,
    /// Funds delta is the base scaled by the conversion rate.
    pub rate_scaled: bool,
    /// May be paid for with a free action instead of a balance debit.
    pub free_eligible: bool,
    /// Requires an external reference (deduplicated).
    pub requires_reference: bool,
    /// Requires a payout destination.
    pub requires_withdraw_address: bool,
    /// Side effect, if any.
    pub side_effect: Option<SideEffect>,
}

impl OperationSpec {
    fn fixed(operation: OperationType, kind: AccountKind, delta: i64) -> Self {
        Self {
            operation,
            accounts: vec![kind],
            delta: DeltaRule::Fixed(delta),
            rate_scaled: false,
            free_eligible: false,
            requires_reference: false,
            requires_withdraw_address: false,
            side_effect: None,
        }
    }

    fn transfer(operation: OperationType, sign: Sign) -> Self {
        Self {
            operation,
            accounts: vec![AccountKind::Credit, AccountKind::Funds],
            delta: DeltaRule::Supplied(sign),
            rate_scaled: true,
            free_eligible: false,
            requires_reference: true,
            requires_withdraw_address: matches!(sign, Sign::Negative),
            side_effect: None,
        }
    }

    fn free_eligible(mut self) -> Self {
        self.free_eligible = true;
        self
    }

    fn with_side_effect(mut self, effect: SideEffect) -> Self {
        self.side_effect = Some(effect);
        self
    }

    /// Whether this operation mutates `kind`.
    #[must_use]
    pub fn affects(&self, kind: AccountKind) -> bool {
        self.accounts.contains(&kind)
    }
}

/// Lookup table from operation type to its specification.
#[derive(Debug, Clone)]
pub struct OperationCatalog {
    specs: HashMap<OperationType, OperationSpec>,
}

impl OperationCatalog {
    /// The built-in table.
    #[must_use]
    pub fn builtin() -> Self {
        use AccountKind::{Credit, Points};
        use OperationType as Op;

        let specs = [
            OperationSpec::fixed(Op::Post, Points, -8).free_eligible(),
            OperationSpec::fixed(Op::Reply, Points, -4),
            OperationSpec::fixed(Op::ContributePost, Points, 20)
                .with_side_effect(SideEffect::TouchCredential),
            OperationSpec::fixed(Op::ContributeReply, Points, 10)
                .with_side_effect(SideEffect::TouchCredential),
            OperationSpec::fixed(Op::BindSocial, Credit, 50),
            OperationSpec::fixed(Op::AiUsage, Credit, -5),
            OperationSpec::fixed(Op::Buy, Points, -100),
            OperationSpec::fixed(Op::Sell, Points, 80),
            OperationSpec::transfer(Op::Deposit, Sign::Positive),
            OperationSpec::transfer(Op::Withdraw, Sign::Negative),
        ];

        Self {
            specs: specs.into_iter().map(|spec| (spec.operation, spec)).collect(),
        }
    }

    /// The built-in table with fixed deltas replaced by `overrides`.
    ///
    /// Keys are operation names (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `UnknownOperation` for an unknown key and `Validation` when the
    /// override targets a supplied-delta operation, is zero, or flips the sign.
    pub fn with_overrides(overrides: &HashMap<String, i64>) -> Result<Self, LedgerError> {
        let mut catalog = Self::builtin();
        for (name, &delta) in overrides {
            let operation = OperationType::from_str(name)?;
            let spec = catalog
                .specs
                .get_mut(&operation)
                .ok_or_else(|| LedgerError::UnknownOperation(name.clone()))?;
            let DeltaRule::Fixed(builtin) = spec.delta else {
                return Err(LedgerError::Validation(format!(
                    "{operation} takes a caller-supplied amount and cannot be overridden"
                )));
            };
            if delta == 0 {
                return Err(LedgerError::Validation(format!(
                    "override for {operation} must be non-zero"
                )));
            }
            if delta.signum() != builtin.signum() {
                return Err(LedgerError::Validation(format!(
                    "override for {operation} must keep the sign of {builtin}"
                )));
            }
            spec.delta = DeltaRule::Fixed(delta);
        }
        Ok(catalog)
    }

    /// Builds the catalog from ledger configuration.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        Self::with_overrides(&config.delta_overrides)
    }

    /// Looks up an operation.
    pub fn resolve(&self, operation: OperationType) -> Result<&OperationSpec, LedgerError> {
        self.specs
            .get(&operation)
            .ok_or_else(|| LedgerError::UnknownOperation(operation.to_string()))
    }

    /// Parses and looks up an operation name.
    pub fn resolve_name(&self, name: &str) -> Result<&OperationSpec, LedgerError> {
        self.resolve(OperationType::from_str(name)?)
    }

    /// All entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        OperationType::ALL
            .into_iter()
            .filter_map(|op| self.specs.get(&op))
    }
}

impl Default for OperationCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(OperationType::Post, AccountKind::Points, -8)]
    #[case(OperationType::Reply, AccountKind::Points, -4)]
    #[case(OperationType::ContributePost, AccountKind::Points, 20)]
    #[case(OperationType::ContributeReply, AccountKind::Points, 10)]
    #[case(OperationType::BindSocial, AccountKind::Credit, 50)]
    #[case(OperationType::AiUsage, AccountKind::Credit, -5)]
    #[case(OperationType::Buy, AccountKind::Points, -100)]
    #[case(OperationType::Sell, AccountKind::Points, 80)]
    fn test_builtin_fixed_deltas(
        #[case] operation: OperationType,
        #[case] kind: AccountKind,
        #[case] delta: i64,
    ) {
        let catalog = OperationCatalog::builtin();
        let spec = catalog.resolve(operation).unwrap();
        assert_eq!(spec.accounts, vec![kind]);
        assert_eq!(spec.delta, DeltaRule::Fixed(delta));
        assert!(!spec.requires_reference);
    }

    #[rstest]
    #[case(OperationType::Deposit, Sign::Positive, false)]
    #[case(OperationType::Withdraw, Sign::Negative, true)]
    fn test_transfers_touch_credit_and_funds(
        #[case] operation: OperationType,
        #[case] sign: Sign,
        #[case] needs_address: bool,
    ) {
        let catalog = OperationCatalog::builtin();
        let spec = catalog.resolve(operation).unwrap();
        assert_eq!(spec.accounts, vec![AccountKind::Credit, AccountKind::Funds]);
        assert_eq!(spec.delta, DeltaRule::Supplied(sign));
        assert!(spec.rate_scaled);
        assert!(spec.requires_reference);
        assert_eq!(spec.requires_withdraw_address, needs_address);
    }

    #[test]
    fn test_every_operation_resolves() {
        let catalog = OperationCatalog::builtin();
        assert_eq!(catalog.iter().count(), OperationType::ALL.len());
        for op in OperationType::ALL {
            assert_eq!(catalog.resolve(op).unwrap().operation, op);
        }
    }

    #[test]
    fn test_only_post_is_free_eligible() {
        let catalog = OperationCatalog::builtin();
        let free: Vec<_> = catalog
            .iter()
            .filter(|spec| spec.free_eligible)
            .map(|spec| spec.operation)
            .collect();
        assert_eq!(free, vec![OperationType::Post]);
    }

    #[test]
    fn test_contributor_operations_touch_credentials() {
        let catalog = OperationCatalog::builtin();
        for op in [OperationType::ContributePost, OperationType::ContributeReply] {
            assert_eq!(
                catalog.resolve(op).unwrap().side_effect,
                Some(SideEffect::TouchCredential)
            );
        }
    }

    #[test]
    fn test_resolve_name_unknown() {
        let catalog = OperationCatalog::builtin();
        assert!(matches!(
            catalog.resolve_name("TIP"),
            Err(LedgerError::UnknownOperation(_))
        ));
        assert_eq!(
            catalog.resolve_name("reply").unwrap().operation,
            OperationType::Reply
        );
    }

    #[test]
    fn test_override_replaces_fixed_delta() {
        let overrides = HashMap::from([("post".to_string(), -10), ("SELL".to_string(), 60)]);
        let catalog = OperationCatalog::with_overrides(&overrides).unwrap();
        assert_eq!(
            catalog.resolve(OperationType::Post).unwrap().delta,
            DeltaRule::Fixed(-10)
        );
        assert_eq!(
            catalog.resolve(OperationType::Sell).unwrap().delta,
            DeltaRule::Fixed(60)
        );
        assert_eq!(
            catalog.resolve(OperationType::Reply).unwrap().delta,
            DeltaRule::Fixed(-4)
        );
    }

    #[rstest]
    #[case("POST", 8)]
    #[case("POST", 0)]
    #[case("DEPOSIT", 100)]
    fn test_invalid_override_rejected(#[case] name: &str, #[case] delta: i64) {
        let overrides = HashMap::from([(name.to_string(), delta)]);
        assert!(matches!(
            OperationCatalog::with_overrides(&overrides),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_override_rejected() {
        let overrides = HashMap::from([("LIKE".to_string(), 1)]);
        assert!(matches!(
            OperationCatalog::with_overrides(&overrides),
            Err(LedgerError::UnknownOperation(_))
        ));
    }
}
