use crate::pack::models::MapRule;

/// Applies a map's modifier rule to a raw score.
///
/// The multiplier fires when the score's mod set satisfies the rule's
/// policy: with `exact_mods` the set must equal the required set, otherwise
/// any superset of the required set qualifies. Mod settings (e.g. DT rate)
/// play no part in matching; only short names are compared. Results round
/// to the nearest integer, ties away from zero.
///
/// A missing rule leaves the raw score untouched.
pub fn apply_map_rule(raw_score: i64, score_mods: &[String], rule: Option<&MapRule>) -> i64 {
    let Some(rule) = rule else {
        return raw_score;
    };

    let has_all = rule
        .required_mods
        .iter()
        .all(|required| score_mods.iter().any(|m| m == required));
    let is_exact = has_all && score_mods.len() == rule.required_mods.len();

    if (rule.exact_mods && is_exact) || (!rule.exact_mods && has_all) {
        // f64::round ties away from zero, which is the rounding we want
        (raw_score as f64 * rule.multiplier).round() as i64
    } else {
        raw_score
    }
}
