//! Caller-supplied context for one operation.

use serde::{Deserialize, Serialize};

use super::entry::RelatedEntity;
use crate::catalog::ConversionRate;
use crate::credential::Provider;

/// How a free-eligible operation uses the free-action window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowancePolicy {
    /// Always charge the balance.
    #[default]
    Charge,
    /// Use a free action when one is left, otherwise charge.
    PreferFree,
    /// Use a free action or fail with `RateLimitExceeded`.
    FreeOnly,
}

/// Inputs to `TransactionCoordinator::execute` beyond owner and operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    /// Magnitude for caller-supplied operations (DEPOSIT, WITHDRAW).
    pub amount: Option<i64>,
    /// External transaction reference, deduplicated when present.
    pub external_reference: Option<String>,
    /// Overrides the configured Funds conversion rate.
    pub conversion_rate: Option<ConversionRate>,
    /// Contributor's social provider for attributed operations.
    pub provider: Option<Provider>,
    /// Free-form reason recorded on the entries.
    pub reason: Option<String>,
    /// Traded resource recorded on the entries.
    pub resource_traded: Option<String>,
    /// Related entities recorded on the entries.
    pub related_entities: Vec<RelatedEntity>,
    /// Payout destination (WITHDRAW).
    pub withdraw_address: Option<String>,
    /// Free-action policy.
    pub allowance: AllowancePolicy,
}

impl OperationContext {
    /// An empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the supplied amount.
    #[must_use]
    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Sets the external reference.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    /// Overrides the conversion rate.
    #[must_use]
    pub fn with_conversion_rate(mut self, rate: ConversionRate) -> Self {
        self.conversion_rate = Some(rate);
        self
    }

    /// Sets the contributor's provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the traded resource.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource_traded = Some(resource.into());
        self
    }

    /// Adds a related entity.
    #[must_use]
    pub fn with_related(mut self, entity: RelatedEntity) -> Self {
        self.related_entities.push(entity);
        self
    }

    /// Sets the payout destination.
    #[must_use]
    pub fn with_withdraw_address(mut self, address: impl Into<String>) -> Self {
        self.withdraw_address = Some(address.into());
        self
    }

    /// Sets the free-action policy.
    #[must_use]
    pub fn with_allowance(mut self, allowance: AllowancePolicy) -> Self {
        self.allowance = allowance;
        self
    }
}
