//! Finalization gate: pricing, cost summary and payment confirmation.
//!
//! Pricing composition is configuration ([`PricingTable`]), not arithmetic in
//! the workflow. The default table charges the professional-review add-on on
//! top of either tier, which reproduces the `$25 + $10 = $35` summary shown
//! for the digital tier.
//!
//! The payment provider itself is out of scope; it sits behind the
//! [`PaymentGateway`] seam and only has to say "charged" or "not charged".

use crate::context::{ServiceTier, WorkflowContext};
use crate::error::PaymentError;
use crate::review::ReviewRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use tracing::{info, warn};
use uuid::Uuid;

/// An amount in US cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(pub u64);

impl Money {
    pub const fn from_cents(cents: u64) -> Self {
        Money(cents)
    }

    pub const fn from_dollars(dollars: u64) -> Self {
        Money(dollars * 100)
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::default(), Add::add)
    }
}

/// A named amount on the cost summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub label: String,
    pub amount: Money,
}

impl LineItem {
    pub fn new(label: impl Into<String>, amount: Money) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

/// Tier prices plus flat add-ons applied to every tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    pub digital: Money,
    pub printed: Money,
    pub add_ons: Vec<LineItem>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            digital: Money::from_dollars(25),
            printed: Money::from_dollars(35),
            add_ons: vec![LineItem::new("Professional Review", Money::from_dollars(10))],
        }
    }
}

impl PricingTable {
    /// A table without add-ons: the total is the tier price.
    pub fn tier_only() -> Self {
        Self {
            add_ons: Vec::new(),
            ..Self::default()
        }
    }

    pub fn tier_price(&self, tier: ServiceTier) -> Money {
        match tier {
            ServiceTier::Digital => self.digital,
            ServiceTier::Printed => self.printed,
        }
    }
}

/// Itemised cost for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSummary {
    pub tier: ServiceTier,
    /// The tier line first, then the add-ons in table order.
    pub line_items: Vec<LineItem>,
    pub total: Money,
}

impl CostSummary {
    pub fn tier_price(&self) -> Money {
        self.line_items
            .first()
            .map(|item| item.amount)
            .unwrap_or_default()
    }
}

/// Compute the cost summary for `tier`.
pub fn compute_cost(pricing: &PricingTable, tier: ServiceTier) -> CostSummary {
    let mut line_items = vec![LineItem::new(tier.label(), pricing.tier_price(tier))];
    line_items.extend(pricing.add_ons.iter().cloned());
    let total = line_items.iter().map(|item| item.amount).sum();
    CostSummary {
        tier,
        line_items,
        total,
    }
}

/// Opaque proof handed over by the payment UI (token, nonce, ...).
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentProof(String);

impl PaymentProof {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PaymentProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PaymentProof(<redacted>)")
    }
}

/// What the provider returns for a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Provider-side transaction reference.
    pub reference: String,
    pub amount: Money,
}

/// The payment provider. One call per attempt; no retries inside.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        amount: Money,
        proof: &PaymentProof,
    ) -> Result<PaymentReceipt, PaymentError>;
}

/// A paid order, ready for the confirmation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedOrder {
    pub order_id: Uuid,
    pub template: Option<String>,
    pub target_language: Option<String>,
    pub service_tier: ServiceTier,
    pub cost: CostSummary,
    pub receipt: PaymentReceipt,
    pub record: ReviewRecord,
}

/// Charge `summary.total` and build the finalized order.
///
/// The record must be confirmed; the workflow checks that before it lets
/// anyone reach the payment stage, so here it is only asserted in debug
/// builds.
pub async fn confirm_payment(
    gateway: &dyn PaymentGateway,
    ctx: &WorkflowContext,
    summary: &CostSummary,
    proof: &PaymentProof,
) -> Result<FinalizedOrder, PaymentError> {
    if proof.as_str().trim().is_empty() {
        return Err(PaymentError::Declined {
            reason: "no payment proof supplied".into(),
        });
    }
    if summary.total.is_zero() {
        return Err(PaymentError::Declined {
            reason: "nothing to charge".into(),
        });
    }

    let record = ctx.review_fields.clone().unwrap_or_default();
    debug_assert!(record.can_advance(), "payment on an unconfirmed record");

    let receipt = gateway.charge(summary.total, proof).await.map_err(|e| {
        warn!("Payment of {} failed: {}", summary.total, e);
        e
    })?;

    let order = FinalizedOrder {
        order_id: Uuid::new_v4(),
        template: ctx.template.clone(),
        target_language: ctx.target_language.clone(),
        service_tier: summary.tier,
        cost: summary.clone(),
        receipt,
        record,
    };
    info!(
        order_id = %order.order_id,
        tier = %order.service_tier,
        total = %order.cost.total,
        "Payment confirmed"
    );
    Ok(order)
}
