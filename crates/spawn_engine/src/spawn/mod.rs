mod candidates;
mod fields;
mod groups;
mod persist;
mod planner;
mod rng;
mod types;

pub use candidates::{resolve_asset_from_tag, ExclusionSets, TagResolutionError};
pub use groups::{
    ensure_spawn_groups, find_spawn_groups, generate_spawn_id, normalize_position,
    sanitize_perimeter_spawn_groups, SPAWN_ID_PREFIX,
};
pub use persist::{PersistError, PersistOutcome, SourcePath};
pub use planner::SpawnPlanner;
pub use rng::SpawnRng;
pub use types::{
    BatchSpawnInfo, CandidateOutcome, PlannerConfig, Point, ProvenanceRef, SpawnCandidate,
    SpawnInfo, SpawnQueueSummary, BATCH_ASSETS_KEY, DEFAULT_BATCH_GRID_SPACING, SPAWN_GROUPS_KEY,
};
