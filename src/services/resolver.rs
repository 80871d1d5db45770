//! Rule resolver: picks the effective reward rule for an inviter.
//!
//! Overrides may live in two places:
//! 1. `eligibilityRules.inviterOverrides` (authoritative)
//! 2. `milestoneRules.inviterOverrides` (legacy)
//!
//! The first location that has an entry wins, and the winning rule is used
//! as-is. When both hold an entry for the same inviter the resolution is
//! marked as a conflict and a warning is logged so operators can reconcile.

use serde::Serialize;
use tracing::warn;

use crate::model::{Campaign, RewardRule, RuleSource};
use crate::validation::LEGACY_OVERRIDES_KEY;

/// The rule that applies to one inviter, with where it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRule {
    pub rule: RewardRule,
    pub source: RuleSource,
    /// Both override locations held an entry for this inviter.
    pub conflict: bool,
}

/// An inviter-specific override as seen by the rule admin screens.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviterRuleEntry {
    pub inviter_account_id: String,
    pub rule: RewardRule,
    pub source: RuleSource,
    pub conflict: bool,
}

/// Resolve the effective rule for `inviter_account_id` under `campaign`.
pub fn resolve(campaign: &Campaign, inviter_account_id: &str) -> ResolvedRule {
    match find_override(campaign, inviter_account_id) {
        Some(entry) => ResolvedRule {
            rule: entry.rule,
            source: entry.source,
            conflict: entry.conflict,
        },
        None => ResolvedRule {
            rule: campaign.eligibility_rules.defaults.clone(),
            source: RuleSource::CampaignDefault,
            conflict: false,
        },
    }
}

/// The override for one inviter, if either location has one.
pub fn find_override(campaign: &Campaign, inviter_account_id: &str) -> Option<InviterRuleEntry> {
    let primary = campaign
        .eligibility_rules
        .inviter_overrides
        .get(inviter_account_id);
    let legacy = legacy_override(campaign, inviter_account_id);

    match (primary, legacy) {
        (Some(rule), legacy) => {
            let conflict = legacy.is_some();
            if conflict {
                warn!(
                    campaign_id = %campaign.id,
                    inviter = %inviter_account_id,
                    "Inviter override present in both eligibilityRules and milestoneRules; using eligibilityRules"
                );
            }
            Some(InviterRuleEntry {
                inviter_account_id: inviter_account_id.to_string(),
                rule: rule.clone(),
                source: RuleSource::InviterOverride,
                conflict,
            })
        }
        (None, Some(rule)) => Some(InviterRuleEntry {
            inviter_account_id: inviter_account_id.to_string(),
            rule,
            source: RuleSource::LegacyMilestoneOverride,
            conflict: false,
        }),
        (None, None) => None,
    }
}

/// Override stored in the legacy `milestoneRules.inviterOverrides` map.
///
/// Entries that no longer parse as a rule are skipped with a warning.
pub fn legacy_override(campaign: &Campaign, inviter_account_id: &str) -> Option<RewardRule> {
    let raw = campaign
        .milestone_rules
        .get(LEGACY_OVERRIDES_KEY)?
        .as_object()?
        .get(inviter_account_id)?;

    match serde_json::from_value::<RewardRule>(raw.clone()) {
        Ok(rule) => Some(rule),
        Err(e) => {
            warn!(
                campaign_id = %campaign.id,
                inviter = %inviter_account_id,
                error = %e,
                "Ignoring unparseable legacy inviter override"
            );
            None
        }
    }
}

/// Inviter ids that have an entry in the legacy location.
pub fn legacy_inviters(campaign: &Campaign) -> Vec<String> {
    campaign
        .milestone_rules
        .get(LEGACY_OVERRIDES_KEY)
        .and_then(|v| v.as_object())
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// Every overridden inviter across both locations, sorted by inviter id.
pub fn list_overrides(campaign: &Campaign) -> Vec<InviterRuleEntry> {
    let mut inviters: Vec<String> = campaign
        .eligibility_rules
        .inviter_overrides
        .keys()
        .cloned()
        .chain(legacy_inviters(campaign))
        .collect();
    inviters.sort();
    inviters.dedup();

    inviters
        .iter()
        .filter_map(|inviter| find_override(campaign, inviter))
        .collect()
}

/// Remove an inviter from the legacy map. Returns true if an entry was removed.
pub fn remove_legacy_override(campaign: &mut Campaign, inviter_account_id: &str) -> bool {
    campaign
        .milestone_rules
        .get_mut(LEGACY_OVERRIDES_KEY)
        .and_then(|v| v.as_object_mut())
        .map(|map| map.remove(inviter_account_id).is_some())
        .unwrap_or(false)
}
