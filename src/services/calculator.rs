//! Reward calculator: transaction + effective rule -> points, or no reward.
//!
//! All three payout formulas live in [`compute`] so they can be reviewed
//! side by side.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::model::{QualifyingTransaction, RewardMode, RewardRule};

/// Points carry two decimal places.
pub const POINTS_SCALE: u32 = 2;

/// Round up to the cent, toward positive infinity.
pub fn ceil2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(POINTS_SCALE, RoundingStrategy::ToPositiveInfinity);
    rounded.rescale(POINTS_SCALE);
    rounded
}

/// Revenue the transaction generated: fees plus commission, optionally other fees.
pub fn revenue_basis(tx: &QualifyingTransaction, rule: &RewardRule) -> Decimal {
    let other = if rule.include_other_fees_in_revenue {
        tx.other_fees
    } else {
        Decimal::ZERO
    };
    tx.internal_fee + tx.commission + other
}

/// Net amount a NET_AMOUNT_SHARE rule pays a percentage of.
pub fn net_basis(tx: &QualifyingTransaction) -> Decimal {
    tx.settlement_net.unwrap_or(tx.amount)
}

/// Compute the reward for `tx` under `rule`.
///
/// `fallback_base_points` is used by FIXED rules that carry no base of
/// their own (the campaign default's base). Returns `None` when the
/// transaction earns nothing; clamping never turns `None` into a reward.
pub fn compute(
    tx: &QualifyingTransaction,
    rule: &RewardRule,
    fallback_base_points: Option<i64>,
) -> Option<Decimal> {
    let hundred = Decimal::ONE_HUNDRED;

    let raw = match rule.reward_mode {
        RewardMode::Fixed => {
            let base = rule
                .base_reward_points
                .or(fallback_base_points)
                .unwrap_or(0)
                .max(0);
            Decimal::from(base)
        }
        RewardMode::RevenueShare => {
            let basis = revenue_basis(tx, rule);
            if basis <= Decimal::ZERO {
                return None;
            }
            let pct = rule.revenue_share_pct?;
            ceil2(basis * pct / hundred)
        }
        RewardMode::NetAmountShare => {
            if revenue_basis(tx, rule) <= Decimal::ZERO {
                return None;
            }
            let pct = rule.net_amount_share_pct?;
            ceil2(net_basis(tx) * pct / hundred).max(Decimal::ZERO)
        }
    };

    Some(clamp(raw, rule))
}

/// Apply the rule's optional `[minPoints, maxPoints]` bounds.
pub fn clamp(points: Decimal, rule: &RewardRule) -> Decimal {
    let mut clamped = points;
    if let Some(min) = rule.min_points {
        clamped = clamped.max(min);
    }
    if let Some(max) = rule.max_points {
        clamped = clamped.min(max);
    }
    ceil2(clamped)
}
