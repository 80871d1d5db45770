//! Input validation for admin-supplied data.
//!
//! Validation collects every failing field before returning, so callers can
//! show per-field messages. Nothing is persisted when any field fails.

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::FieldErrors;
use crate::model::{CampaignSpec, PageRequest, RewardMode, RewardRule};

/// Length and range limits for validated fields.
pub mod limits {
    /// Maximum campaign name length, in characters.
    pub const MAX_NAME_LENGTH: usize = 120;
    /// Maximum campaign description length, in characters.
    pub const MAX_DESCRIPTION_LENGTH: usize = 500;
    /// Upper bound of `targetActions`.
    pub const MAX_TARGET_ACTIONS: i64 = 100;
    /// Maximum moderation/lifecycle reason length.
    pub const MAX_REASON_LENGTH: usize = 1000;
    /// Maximum account id / transaction reference length.
    pub const MAX_REFERENCE_LENGTH: usize = 128;
}

/// Error constants for validation failures.
pub mod errmsg {
    pub const NAME_EMPTY: &str = "must not be empty";
    pub const TOO_LONG: &str = "exceeds maximum length";
    pub const ENDS_BEFORE_START: &str = "must be after startsAt";
    pub const TARGET_ACTIONS_RANGE: &str = "must be between 0 and 100";
    pub const NEGATIVE: &str = "must be greater than or equal to 0";
    pub const OUT_OF_RANGE: &str = "exceeds the maximum allowed value";
    pub const PCT_REQUIRED: &str = "is required and must be greater than 0";
    pub const MAX_TRANSACTIONS_MIN: &str = "must be at least 1";
    pub const MIN_ABOVE_MAX: &str = "must not exceed maxPoints";
    pub const NOT_JSON_OBJECT: &str = "must be a JSON object";
    pub const INVALID_JSON: &str = "is not valid JSON";
    pub const INVALID_RULE: &str = "is not a valid reward rule";
    pub const REASON_REQUIRED: &str = "reason is required";
    pub const PAGE_SIZE_RANGE: &str = "must be between 1 and the maximum page size";
    pub const INVALID_EMAIL: &str = "must be a valid email address";
    pub const WINDOW_ORDER: &str = "must be after from";
}

/// Key under which legacy inviter overrides live inside `milestoneRules`.
pub const LEGACY_OVERRIDES_KEY: &str = "inviterOverrides";

/// Validate a campaign spec, returning the parsed `milestoneRules` object.
pub fn validate_campaign_spec(spec: &CampaignSpec) -> Result<Map<String, Value>, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name_len = spec.name.trim().chars().count();
    if name_len == 0 {
        errors.push("name", errmsg::NAME_EMPTY);
    } else if name_len > limits::MAX_NAME_LENGTH {
        errors.push(
            "name",
            format!("{} (max: {})", errmsg::TOO_LONG, limits::MAX_NAME_LENGTH),
        );
    }

    if spec.description.chars().count() > limits::MAX_DESCRIPTION_LENGTH {
        errors.push(
            "description",
            format!(
                "{} (max: {})",
                errmsg::TOO_LONG,
                limits::MAX_DESCRIPTION_LENGTH
            ),
        );
    }

    if let (Some(start), Some(end)) = (spec.starts_at, spec.ends_at) {
        if end <= start {
            errors.push("endsAt", errmsg::ENDS_BEFORE_START);
        }
    }

    if !(0..=limits::MAX_TARGET_ACTIONS).contains(&spec.target_actions) {
        errors.push("targetActions", errmsg::TARGET_ACTIONS_RANGE);
    }

    for (field, value) in [
        ("baseRewardPoints", spec.base_reward_points),
        ("activationRewardPoints", spec.activation_reward_points),
        ("passportBonusPoints", spec.passport_bonus_points),
    ] {
        if value < 0 {
            errors.push(field, errmsg::NEGATIVE);
        } else if u32::try_from(value).is_err() {
            errors.push(field, errmsg::OUT_OF_RANGE);
        }
    }

    validate_rule(
        "eligibilityRules.defaults",
        &spec.eligibility_rules.defaults,
        &mut errors,
    );
    for (inviter, rule) in &spec.eligibility_rules.inviter_overrides {
        validate_rule(
            &format!("eligibilityRules.inviterOverrides.{}", inviter),
            rule,
            &mut errors,
        );
    }

    let milestones = match spec.milestone_rules.as_deref() {
        None => Map::new(),
        Some(raw) if raw.trim().is_empty() => Map::new(),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => {
                validate_legacy_overrides(&map, &mut errors);
                map
            }
            Ok(_) => {
                errors.push("milestoneRules", errmsg::NOT_JSON_OBJECT);
                Map::new()
            }
            Err(_) => {
                errors.push("milestoneRules", errmsg::INVALID_JSON);
                Map::new()
            }
        },
    };

    errors.into_result().map(|()| milestones)
}

/// Validate one reward rule, recording failures under `prefix`.
pub fn validate_rule(prefix: &str, rule: &RewardRule, errors: &mut FieldErrors) {
    let field = |name: &str| format!("{}.{}", prefix, name);

    match rule.reward_mode {
        RewardMode::Fixed => {
            if rule.base_reward_points.is_some_and(|p| p < 0) {
                errors.push(field("baseRewardPoints"), errmsg::NEGATIVE);
            }
        }
        RewardMode::RevenueShare => {
            if !rule.revenue_share_pct.is_some_and(|p| p > Decimal::ZERO) {
                errors.push(field("revenueSharePct"), errmsg::PCT_REQUIRED);
            }
        }
        RewardMode::NetAmountShare => {
            if !rule.net_amount_share_pct.is_some_and(|p| p > Decimal::ZERO) {
                errors.push(field("netAmountSharePct"), errmsg::PCT_REQUIRED);
            }
        }
    }

    if rule.max_transactions < 1 {
        errors.push(field("maxTransactions"), errmsg::MAX_TRANSACTIONS_MIN);
    } else if u32::try_from(rule.max_transactions).is_err() {
        errors.push(field("maxTransactions"), errmsg::OUT_OF_RANGE);
    }

    if rule.min_points.is_some_and(|p| p < Decimal::ZERO) {
        errors.push(field("minPoints"), errmsg::NEGATIVE);
    }
    if rule.max_points.is_some_and(|p| p < Decimal::ZERO) {
        errors.push(field("maxPoints"), errmsg::NEGATIVE);
    }
    if let (Some(min), Some(max)) = (rule.min_points, rule.max_points) {
        if min > max {
            errors.push(field("minPoints"), errmsg::MIN_ABOVE_MAX);
        }
    }
}

/// Legacy overrides must be an object of valid rules when present.
fn validate_legacy_overrides(milestones: &Map<String, Value>, errors: &mut FieldErrors) {
    let Some(overrides) = milestones.get(LEGACY_OVERRIDES_KEY) else {
        return;
    };
    let prefix = format!("milestoneRules.{}", LEGACY_OVERRIDES_KEY);
    let Value::Object(entries) = overrides else {
        errors.push(prefix, errmsg::NOT_JSON_OBJECT);
        return;
    };
    for (inviter, raw) in entries {
        let entry_field = format!("{}.{}", prefix, inviter);
        match serde_json::from_value::<RewardRule>(raw.clone()) {
            Ok(rule) => validate_rule(&entry_field, &rule, errors),
            Err(_) => errors.push(entry_field, errmsg::INVALID_RULE),
        }
    }
}

/// Moderation reasons must carry text.
pub fn validate_reason(reason: &str) -> Result<(), FieldErrors> {
    if reason.trim().is_empty() {
        return Err(FieldErrors::single("reason", errmsg::REASON_REQUIRED));
    }
    if reason.chars().count() > limits::MAX_REASON_LENGTH {
        return Err(FieldErrors::single(
            "reason",
            format!("{} (max: {})", errmsg::TOO_LONG, limits::MAX_REASON_LENGTH),
        ));
    }
    Ok(())
}

/// Non-empty, bounded identifier such as an account id or transaction reference.
pub fn validate_reference(field: &str, value: &str, errors: &mut FieldErrors) {
    if value.trim().is_empty() {
        errors.push(field, errmsg::NAME_EMPTY);
    } else if value.len() > limits::MAX_REFERENCE_LENGTH {
        errors.push(
            field,
            format!(
                "{} (max: {})",
                errmsg::TOO_LONG,
                limits::MAX_REFERENCE_LENGTH
            ),
        );
    }
}

/// Minimal shape check: one `@` with text on both sides and a dot in the domain.
pub fn validate_email(field: &str, email: &str, errors: &mut FieldErrors) {
    let valid = match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        }
        None => false,
    };
    if !valid {
        errors.push(field, errmsg::INVALID_EMAIL);
    }
}

pub fn validate_non_negative(field: &str, value: Decimal, errors: &mut FieldErrors) {
    if value < Decimal::ZERO {
        errors.push(field, errmsg::NEGATIVE);
    }
}

pub fn validate_page(page: PageRequest, max_page_size: u32) -> Result<(), FieldErrors> {
    if page.size == 0 || page.size > max_page_size {
        return Err(FieldErrors::single("size", errmsg::PAGE_SIZE_RANGE));
    }
    Ok(())
}
