use std::collections::BTreeSet;

use rand::Rng;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::asset::AssetLibrary;

use super::fields::{int_field, non_empty_str, str_field};
use super::rng::SpawnRng;
use super::types::{CandidateOutcome, SpawnCandidate};

pub(crate) const NULL_CANDIDATE_NAME: &str = "null";
// Bare strings in a candidate list have no room for a chance field.
const SHORTHAND_CHANCE: i32 = 100;
const FALLBACK_CHANCE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagResolutionError {
    #[error("No assets found for tag: {tag}")]
    NoAssetsForTag { tag: String },
}

/// One raw candidate after parsing, before any library lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CandidateDraft {
    pub weight: i32,
    pub use_tag: bool,
    pub tag: String,
    pub asset_name: String,
    pub raw_name: String,
    pub is_null: bool,
    pub label: Option<String>,
}

/// Cross-candidate exclusion rules for one spawn group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSets {
    /// Tags of zero-weight tag candidates.
    pub blocked_tags: BTreeSet<String>,
    /// Names of zero-weight literal candidates.
    pub blocked_assets: BTreeSet<String>,
    /// Tags of positive-weight tag candidates, checked against anti-tags.
    pub candidate_tags: BTreeSet<String>,
}

impl ExclusionSets {
    pub(crate) fn from_drafts(drafts: &[CandidateDraft]) -> Self {
        let mut sets = Self::default();
        for draft in drafts {
            if draft.use_tag {
                if draft.tag.is_empty() {
                    continue;
                }
                if draft.weight <= 0 {
                    sets.blocked_tags.insert(draft.tag.clone());
                } else {
                    sets.candidate_tags.insert(draft.tag.clone());
                }
            } else if draft.weight <= 0 && !draft.is_null && !draft.asset_name.is_empty() {
                sets.blocked_assets.insert(draft.asset_name.clone());
            }
        }
        sets
    }
}

pub(crate) fn sanitize_tag(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix('#').unwrap_or(trimmed).trim().to_string()
}

pub(crate) fn parse_candidate(raw: &Value) -> Option<CandidateDraft> {
    match raw {
        Value::String(text) => Some(draft_from_parts(text, SHORTHAND_CHANCE, None, None)),
        Value::Object(_) => {
            let name = str_field(raw, "name").unwrap_or_default();
            let weight = int_field(raw, "chance").unwrap_or(0).clamp(0, i32::MAX as i64) as i32;
            let label = non_empty_str(raw, "display_name")
                .or_else(|| non_empty_str(raw, "label"))
                .map(ToString::to_string);
            let explicit_tag = non_empty_str(raw, "tag_name")
                .or_else(|| non_empty_str(raw, "tag"))
                .map(ToString::to_string);
            let tag_flag = raw.get("tag").and_then(Value::as_bool).unwrap_or(false)
                || explicit_tag.is_some();
            let mut draft = draft_from_parts(name, weight, label, explicit_tag);
            if tag_flag && !draft.use_tag {
                draft.use_tag = true;
                draft.tag = sanitize_tag(name);
                draft.asset_name.clear();
                draft.is_null = false;
                draft.raw_name = tag_raw_name(name.trim(), &draft.tag);
            }
            Some(draft)
        }
        _ => None,
    }
}

fn tag_raw_name(trimmed: &str, tag: &str) -> String {
    if tag.is_empty() {
        trimmed.to_string()
    } else {
        format!("#{tag}")
    }
}

fn draft_from_parts(
    name: &str,
    weight: i32,
    label: Option<String>,
    explicit_tag: Option<String>,
) -> CandidateDraft {
    let trimmed = name.trim();
    let use_tag = trimmed.starts_with('#') || explicit_tag.is_some();
    if use_tag {
        let tag = sanitize_tag(explicit_tag.as_deref().unwrap_or(trimmed));
        let raw_name = tag_raw_name(trimmed, &tag);
        return CandidateDraft {
            weight,
            use_tag,
            tag,
            asset_name: String::new(),
            raw_name,
            is_null: false,
            label,
        };
    }
    CandidateDraft {
        weight,
        use_tag,
        tag: String::new(),
        asset_name: trimmed.to_string(),
        raw_name: trimmed.to_string(),
        is_null: trimmed == NULL_CANDIDATE_NAME || trimmed.is_empty(),
        label,
    }
}

/// Drafts for a group's `candidates` array, or a single synthesized draft when
/// the array is missing or yields nothing usable: the group's own `name` at
/// full chance, else an explicit null placeholder.
pub(crate) fn drafts_for_entry(entry: &Value) -> Vec<CandidateDraft> {
    let drafts = entry
        .get("candidates")
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(parse_candidate).collect::<Vec<_>>())
        .unwrap_or_default();
    if !drafts.is_empty() {
        return drafts;
    }

    let fallback = match non_empty_str(entry, "name") {
        Some(name) => json!({ "name": name, "chance": FALLBACK_CHANCE }),
        None => json!({ "name": NULL_CANDIDATE_NAME, "chance": 0 }),
    };
    parse_candidate(&fallback).into_iter().collect()
}

/// Picks uniformly among library assets that carry `tag` and survive the
/// exclusion rules. The requested tag itself never counts as blocked or as a
/// conflicting anti-tag.
pub fn resolve_asset_from_tag(
    library: &AssetLibrary,
    tag: &str,
    exclusions: &ExclusionSets,
    rng: &mut SpawnRng,
) -> Result<String, TagResolutionError> {
    let matches = library
        .all()
        .iter()
        .filter(|(name, info)| {
            info.has_tag(tag)
                && !exclusions.blocked_assets.contains(name.as_str())
                && !info
                    .tags
                    .iter()
                    .any(|other| other != tag && exclusions.blocked_tags.contains(other))
                && !info
                    .anti_tags
                    .iter()
                    .any(|anti| anti != tag && exclusions.candidate_tags.contains(anti))
        })
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

    if matches.is_empty() {
        return Err(TagResolutionError::NoAssetsForTag {
            tag: tag.to_string(),
        });
    }
    Ok(matches[rng.gen_range(0..matches.len())].clone())
}

pub(crate) fn resolve_candidates(
    drafts: &[CandidateDraft],
    library: &AssetLibrary,
    rng: &mut SpawnRng,
) -> Vec<SpawnCandidate> {
    let exclusions = ExclusionSets::from_drafts(drafts);
    drafts
        .iter()
        .map(|draft| resolve_draft(draft, &exclusions, library, rng))
        .collect()
}

fn resolve_draft(
    draft: &CandidateDraft,
    exclusions: &ExclusionSets,
    library: &AssetLibrary,
    rng: &mut SpawnRng,
) -> SpawnCandidate {
    let mut outcome = CandidateOutcome::Resolved;
    let resolved_name = if draft.is_null {
        String::new()
    } else if draft.use_tag {
        if draft.weight > 0 && !draft.tag.is_empty() {
            match resolve_asset_from_tag(library, &draft.tag, exclusions, rng) {
                Ok(name) => name,
                Err(error) => {
                    debug!(tag = %draft.tag, error = %error, "spawn_candidate_tag_unresolved");
                    outcome = CandidateOutcome::NotFound;
                    String::new()
                }
            }
        } else {
            String::new()
        }
    } else {
        draft.asset_name.clone()
    };

    let mut is_null =
        draft.is_null || (draft.use_tag && draft.weight <= 0) || resolved_name.is_empty();
    let info = if is_null {
        None
    } else {
        library.get(&resolved_name)
    };
    if !is_null && info.is_none() {
        warn!(asset = %resolved_name, "spawn_candidate_asset_missing");
        is_null = true;
        outcome = CandidateOutcome::NotFound;
    } else if is_null && outcome == CandidateOutcome::Resolved {
        outcome = CandidateOutcome::NullFallback;
    }

    let display_name = draft
        .label
        .clone()
        .or_else(|| Some(resolved_name.clone()).filter(|name| !name.is_empty()))
        .or_else(|| Some(draft.raw_name.clone()).filter(|name| !name.is_empty()))
        .unwrap_or_else(|| NULL_CANDIDATE_NAME.to_string());

    SpawnCandidate {
        name: if is_null { String::new() } else { resolved_name },
        display_name,
        weight: draft.weight,
        is_null,
        info,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::asset::AssetInfo;

    fn library() -> AssetLibrary {
        AssetLibrary::from_infos([
            AssetInfo::new("grunt").with_tags(["goblin"]),
            AssetInfo::new("lich_goblin").with_tags(["goblin", "undead"]),
            AssetInfo::new("zombie").with_tags(["undead"]),
            AssetInfo::new("paladin_goblin")
                .with_tags(["goblin"])
                .with_anti_tags(["undead"]),
            AssetInfo::new("torch").with_tags(["light"]),
        ])
    }

    fn drafts(raw: Value) -> Vec<CandidateDraft> {
        raw.as_array()
            .expect("array")
            .iter()
            .filter_map(parse_candidate)
            .collect()
    }

    #[test]
    fn parses_string_and_object_forms() {
        let parsed = drafts(json!([
            "torch",
            "#goblin",
            {"name": " #Undead ", "chance": 5},
            {"name": "cave", "tag": true, "chance": 3},
            {"name": "ignored", "tag_name": "#light", "chance": 1, "label": "Lights"},
            {"name": "null", "chance": 0},
            {"name": "grunt", "chance": -4},
            42
        ]));
        assert_eq!(parsed.len(), 7);
        assert_eq!(parsed[0].asset_name, "torch");
        assert_eq!(parsed[0].weight, 100);
        assert!(parsed[1].use_tag);
        assert_eq!(parsed[1].tag, "goblin");
        assert_eq!(parsed[2].tag, "Undead");
        assert_eq!(parsed[2].weight, 5);
        assert!(parsed[3].use_tag);
        assert_eq!(parsed[3].tag, "cave");
        assert_eq!(parsed[4].tag, "light");
        assert_eq!(parsed[4].label.as_deref(), Some("Lights"));
        assert!(parsed[5].is_null);
        assert_eq!(parsed[6].weight, 0);
        assert!(!parsed[6].is_null);
    }

    #[test]
    fn nameless_tag_flag_displays_as_null() {
        let lib = library();
        let mut rng = SpawnRng::seeded(2);
        let parsed = drafts(json!([{"tag": true, "chance": 10}]));
        assert!(parsed[0].use_tag);
        assert_eq!(parsed[0].raw_name, "");
        let resolved = resolve_candidates(&parsed, &lib, &mut rng);
        assert!(resolved[0].is_null);
        assert_eq!(resolved[0].display_name, "null");
        assert_eq!(resolved[0].outcome, CandidateOutcome::NullFallback);
    }

    #[test]
    fn exclusion_sets_split_by_weight() {
        let parsed = drafts(json!([
            {"name": "#undead", "chance": 0},
            {"name": "grunt", "chance": 0},
            {"name": "null", "chance": 0},
            {"name": "#goblin", "chance": 10},
            {"name": "torch", "chance": 10}
        ]));
        let sets = ExclusionSets::from_drafts(&parsed);
        assert_eq!(sets.blocked_tags, BTreeSet::from(["undead".to_string()]));
        assert_eq!(sets.blocked_assets, BTreeSet::from(["grunt".to_string()]));
        assert_eq!(sets.candidate_tags, BTreeSet::from(["goblin".to_string()]));
    }

    #[test]
    fn blocked_tag_filters_other_carriers() {
        let lib = library();
        let exclusions = ExclusionSets {
            blocked_tags: BTreeSet::from(["undead".to_string()]),
            ..ExclusionSets::default()
        };
        let mut rng = SpawnRng::seeded(9);
        for _ in 0..40 {
            let picked =
                resolve_asset_from_tag(&lib, "goblin", &exclusions, &mut rng).expect("match");
            assert_ne!(picked, "lich_goblin");
        }
        // The requested tag is exempt from its own block.
        let picked = resolve_asset_from_tag(&lib, "undead", &exclusions, &mut rng).expect("match");
        assert!(picked == "zombie" || picked == "lich_goblin");
    }

    #[test]
    fn blocked_asset_is_never_picked() {
        let lib = library();
        let exclusions = ExclusionSets {
            blocked_assets: BTreeSet::from(["grunt".to_string(), "paladin_goblin".to_string()]),
            ..ExclusionSets::default()
        };
        let mut rng = SpawnRng::seeded(2);
        for _ in 0..20 {
            assert_eq!(
                resolve_asset_from_tag(&lib, "goblin", &exclusions, &mut rng).expect("match"),
                "lich_goblin"
            );
        }
    }

    #[test]
    fn anti_tags_conflict_only_with_other_candidate_tags() {
        let lib = library();
        let mut rng = SpawnRng::seeded(4);
        let with_undead = ExclusionSets {
            candidate_tags: BTreeSet::from(["goblin".to_string(), "undead".to_string()]),
            ..ExclusionSets::default()
        };
        for _ in 0..40 {
            let picked =
                resolve_asset_from_tag(&lib, "goblin", &with_undead, &mut rng).expect("match");
            assert_ne!(picked, "paladin_goblin");
        }

        let anti_self = AssetLibrary::from_infos([AssetInfo::new("odd")
            .with_tags(["goblin"])
            .with_anti_tags(["goblin"])]);
        let only_goblin = ExclusionSets {
            candidate_tags: BTreeSet::from(["goblin".to_string()]),
            ..ExclusionSets::default()
        };
        assert_eq!(
            resolve_asset_from_tag(&anti_self, "goblin", &only_goblin, &mut rng).expect("match"),
            "odd"
        );
    }

    #[test]
    fn missing_tag_reports_error() {
        let lib = library();
        let mut rng = SpawnRng::seeded(1);
        let error = resolve_asset_from_tag(&lib, "dragon", &ExclusionSets::default(), &mut rng)
            .expect_err("no dragons");
        assert_eq!(error.to_string(), "No assets found for tag: dragon");
    }

    #[test]
    fn resolution_degrades_to_null_candidates() {
        let lib = library();
        let mut rng = SpawnRng::seeded(5);
        let parsed = drafts(json!([
            {"name": "null", "chance": 0},
            {"name": "#dragon", "chance": 10},
            {"name": "#light", "chance": 0},
            {"name": "ghost", "chance": 10},
            {"name": "torch", "chance": 10, "display_name": "Wall Torch"},
            {"name": "#light", "chance": 10}
        ]));
        let resolved = resolve_candidates(&parsed, &lib, &mut rng);

        assert!(resolved[0].is_null);
        assert_eq!(resolved[0].outcome, CandidateOutcome::NullFallback);
        assert_eq!(resolved[0].display_name, "null");

        assert!(resolved[1].is_null);
        assert_eq!(resolved[1].outcome, CandidateOutcome::NotFound);
        assert_eq!(resolved[1].display_name, "#dragon");

        assert!(resolved[2].is_null);
        assert_eq!(resolved[2].outcome, CandidateOutcome::NullFallback);

        assert!(resolved[3].is_null);
        assert_eq!(resolved[3].outcome, CandidateOutcome::NotFound);
        assert!(resolved[3].name.is_empty());
        assert_eq!(resolved[3].display_name, "ghost");
        assert!(resolved[3].info.is_none());

        assert!(!resolved[4].is_null);
        assert_eq!(resolved[4].name, "torch");
        assert_eq!(resolved[4].display_name, "Wall Torch");
        assert!(resolved[4].info.is_some());

        // "#light" at zero weight blocks only other carriers; torch carries it
        // as the requested tag and still resolves.
        assert!(!resolved[5].is_null);
        assert_eq!(resolved[5].name, "torch");
        assert_eq!(resolved[5].outcome, CandidateOutcome::Resolved);
    }

    #[test]
    fn empty_candidates_synthesize_fallback() {
        let from_name = drafts_for_entry(&json!({"name": "torch", "candidates": []}));
        assert_eq!(from_name.len(), 1);
        assert_eq!(from_name[0].asset_name, "torch");
        assert_eq!(from_name[0].weight, 100);

        let placeholder = drafts_for_entry(&json!({"min_number": 2}));
        assert_eq!(placeholder.len(), 1);
        assert!(placeholder[0].is_null);
    }
}
