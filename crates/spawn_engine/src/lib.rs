pub mod area;
pub mod asset;
mod paths;
pub mod spawn;

pub use area::{Area, AreaBounds, Bounds};
pub use asset::{AssetInfo, AssetLibrary, AssetLibraryError, AssetLoadSummary};
pub use paths::{resolve_tool_paths, StartupError, ToolPaths, LIBRARY_DIR_NAME, ROOT_ENV_VAR};
pub use spawn::{
    ensure_spawn_groups, find_spawn_groups, generate_spawn_id, normalize_position,
    resolve_asset_from_tag, sanitize_perimeter_spawn_groups, BatchSpawnInfo, CandidateOutcome,
    ExclusionSets, PersistError, PersistOutcome, PlannerConfig, Point, ProvenanceRef,
    SpawnCandidate, SpawnInfo, SpawnPlanner, SpawnQueueSummary, SpawnRng, SourcePath,
    TagResolutionError, BATCH_ASSETS_KEY, DEFAULT_BATCH_GRID_SPACING, SPAWN_GROUPS_KEY,
    SPAWN_ID_PREFIX,
};
