use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::asset::AssetInfo;

use super::rng::SpawnRng;

pub const SPAWN_GROUPS_KEY: &str = "spawn_groups";
/// Names both the per-document batch block and the entry array inside it.
pub const BATCH_ASSETS_KEY: &str = "batch_assets";
pub const DEFAULT_BATCH_GRID_SPACING: i32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const UNSET: Point = Point { x: -1, y: -1 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Where a merged spawn-group entry lives in its originating source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvenanceRef {
    pub source_index: usize,
    pub entry_index: usize,
    pub key: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// Resolved to an asset present in the library.
    Resolved,
    /// Deliberately spawns nothing: explicit `"null"`, a zero-weight tag, or an
    /// empty name.
    NullFallback,
    /// A tag with no eligible assets, or a name missing from the library.
    NotFound,
}

#[derive(Debug, Clone)]
pub struct SpawnCandidate {
    pub name: String,
    pub display_name: String,
    pub weight: i32,
    pub is_null: bool,
    pub info: Option<Arc<AssetInfo>>,
    pub outcome: CandidateOutcome,
}

#[derive(Debug, Clone)]
pub struct SpawnInfo {
    pub name: String,
    pub position: String,
    pub spawn_id: String,
    pub quantity: i32,
    pub priority: i32,
    pub check_spacing: bool,
    pub check_min_spacing: bool,
    pub exact_offset: Point,
    pub exact_origin_w: i32,
    pub exact_origin_h: i32,
    pub exact_point: Point,
    pub perimeter_radius: Option<i32>,
    pub grid_spacing: i32,
    pub jitter: i32,
    pub empty_grid_spaces: i32,
    pub border_shift: i32,
    pub sector_center: i32,
    pub sector_range: i32,
    pub perimeter_offset: Point,
    pub percent_x_min: i32,
    pub percent_x_max: i32,
    pub percent_y_min: i32,
    pub percent_y_max: i32,
    pub candidates: Vec<SpawnCandidate>,
}

impl SpawnInfo {
    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Weighted pick among candidates. Negative weights count as zero; when no
    /// weight is positive every candidate is equally likely.
    pub fn select_candidate(&self, rng: &mut SpawnRng) -> Option<&SpawnCandidate> {
        if self.candidates.is_empty() {
            return None;
        }
        let mut weights = self
            .candidates
            .iter()
            .map(|candidate| candidate.weight.max(0) as u64)
            .collect::<Vec<_>>();
        if weights.iter().all(|weight| *weight == 0) {
            weights.iter_mut().for_each(|weight| *weight = 1);
        }
        match WeightedIndex::<u64>::new(&weights) {
            Ok(dist) => self.candidates.get(dist.sample(rng)),
            Err(_) => self.candidates.get(rng.gen_range(0..self.candidates.len())),
        }
    }
}

/// One entry of a document's `batch_assets` block: an asset spread over the
/// whole area at `percent` density, on a shared grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSpawnInfo {
    pub name: String,
    pub percent: i32,
    pub spawn_id: String,
}

#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    /// Write back-filled source documents to their paths after planning.
    pub persist: bool,
    /// Raise every Perimeter group's `min_number` to at least 2 before
    /// planning, the way the room editor does on save.
    pub sanitize_perimeter: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            persist: true,
            sanitize_perimeter: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnQueueSummary {
    pub total_entries: usize,
    pub total_candidates: usize,
    pub null_candidates: usize,
    pub batch_entries: usize,
    pub changed_sources: usize,
    pub written_sources: usize,
    pub failed_sources: usize,
}

impl SpawnQueueSummary {
    pub fn status_label(&self) -> &'static str {
        if self.failed_sources > 0 {
            "persist_failed"
        } else if self.written_sources > 0 {
            "persisted"
        } else {
            "planned"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, weight: i32) -> SpawnCandidate {
        SpawnCandidate {
            name: name.to_string(),
            display_name: name.to_string(),
            weight,
            is_null: false,
            info: None,
            outcome: CandidateOutcome::Resolved,
        }
    }

    fn info_with(candidates: Vec<SpawnCandidate>) -> SpawnInfo {
        SpawnInfo {
            name: "group".to_string(),
            position: "Random".to_string(),
            spawn_id: "spn-000000000000".to_string(),
            quantity: 1,
            priority: 0,
            check_spacing: false,
            check_min_spacing: false,
            exact_offset: Point::default(),
            exact_origin_w: 0,
            exact_origin_h: 0,
            exact_point: Point::UNSET,
            perimeter_radius: None,
            grid_spacing: 0,
            jitter: 0,
            empty_grid_spaces: 0,
            border_shift: 0,
            sector_center: 0,
            sector_range: 0,
            perimeter_offset: Point::default(),
            percent_x_min: 0,
            percent_x_max: 0,
            percent_y_min: 0,
            percent_y_max: 0,
            candidates,
        }
    }

    #[test]
    fn select_never_picks_zero_weight_when_positive_exists() {
        let info = info_with(vec![candidate("null", 0), candidate("torch", 100)]);
        let mut rng = SpawnRng::seeded(3);
        for _ in 0..50 {
            let picked = info.select_candidate(&mut rng).expect("candidate");
            assert_eq!(picked.name, "torch");
        }
    }

    #[test]
    fn select_falls_back_to_uniform_when_all_weights_non_positive() {
        let info = info_with(vec![candidate("a", 0), candidate("b", -5)]);
        let mut rng = SpawnRng::seeded(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(info.select_candidate(&mut rng).expect("candidate").name.clone());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn select_handles_weights_summing_past_i32() {
        let info = info_with(vec![
            candidate("a", i32::MAX),
            candidate("b", i32::MAX),
            candidate("c", i32::MAX),
        ]);
        let mut rng = SpawnRng::seeded(5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(info.select_candidate(&mut rng).expect("candidate").name.clone());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn select_on_empty_is_none() {
        let info = info_with(Vec::new());
        let mut rng = SpawnRng::seeded(1);
        assert!(info.select_candidate(&mut rng).is_none());
        assert!(!info.has_candidates());
    }
}
