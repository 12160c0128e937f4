use std::collections::{BTreeMap, HashSet};

use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::area::{AreaBounds, Bounds};
use crate::asset::AssetLibrary;

use super::candidates::{
    drafts_for_entry, resolve_asset_from_tag, resolve_candidates, sanitize_tag, ExclusionSets,
};
use super::fields::{averaged_int, bool_any, int_any, int_field, non_empty_str, str_field, to_i32};
use super::groups::{
    ensure_spawn_groups, find_spawn_groups, generate_spawn_id, migrate_legacy_groups,
    normalize_position, sanitize_perimeter_spawn_groups,
};
use super::persist::{write_source, PersistOutcome, SourcePath};
use super::rng::SpawnRng;
use super::types::{
    BatchSpawnInfo, PlannerConfig, Point, ProvenanceRef, SpawnInfo, SpawnQueueSummary,
    BATCH_ASSETS_KEY, DEFAULT_BATCH_GRID_SPACING, SPAWN_GROUPS_KEY,
};

const POSITION_EXACT: &str = "Exact";
const POSITION_PERIMETER: &str = "Perimeter";
const DEFAULT_MIN_NUMBER: i64 = 1;
const MAX_BATCH_PERCENT: i64 = 100;

/// Builds a priority-ordered spawn queue from one or more room, trail or map
/// documents.
///
/// Construction merges every document's spawn groups, back-fills missing
/// `spawn_id`, `priority` and `origional_width`/`origional_height` into both
/// the merged copy and the originating document, resolves candidates against
/// the asset library, sorts by priority and writes changed documents back to
/// their paths. Nothing in this process fails: unusable data degrades to null
/// candidates and write failures are reported in [`SpawnPlanner::persist_report`].
///
/// Each document's `batch_assets` block is merged the same way into a flat
/// list of [`BatchSpawnInfo`] sharing one grid spacing and jitter.
#[derive(Debug)]
pub struct SpawnPlanner {
    sources: Vec<Value>,
    source_paths: Vec<SourcePath>,
    source_changed: Vec<bool>,
    merged: Vec<Value>,
    provenance: Vec<ProvenanceRef>,
    batch_merged: Vec<Value>,
    batch_provenance: Vec<ProvenanceRef>,
    has_batch_assets: bool,
    batch_grid_spacing: i32,
    batch_jitter: i32,
    spawn_queue: Vec<SpawnInfo>,
    batch_spawn_assets: Vec<BatchSpawnInfo>,
    duplicate_spawn_ids: Vec<String>,
    persist_report: Vec<PersistOutcome>,
}

impl SpawnPlanner {
    pub fn new(
        json_sources: Vec<Value>,
        area: &dyn AreaBounds,
        library: &AssetLibrary,
        source_paths: Vec<String>,
        rng: &mut SpawnRng,
    ) -> Self {
        Self::with_config(
            json_sources,
            area,
            library,
            source_paths,
            rng,
            PlannerConfig::default(),
        )
    }

    pub fn with_config(
        json_sources: Vec<Value>,
        area: &dyn AreaBounds,
        library: &AssetLibrary,
        source_paths: Vec<String>,
        rng: &mut SpawnRng,
        config: PlannerConfig,
    ) -> Self {
        let source_count = json_sources.len();
        let mut paths = source_paths
            .iter()
            .take(source_count)
            .map(|raw| SourcePath::parse(raw))
            .collect::<Vec<_>>();
        paths.resize(source_count, SourcePath::InMemory);

        let mut planner = Self {
            sources: json_sources,
            source_paths: paths,
            source_changed: vec![false; source_count],
            merged: Vec::new(),
            provenance: Vec::new(),
            batch_merged: Vec::new(),
            batch_provenance: Vec::new(),
            has_batch_assets: false,
            batch_grid_spacing: DEFAULT_BATCH_GRID_SPACING,
            batch_jitter: 0,
            spawn_queue: Vec::new(),
            batch_spawn_assets: Vec::new(),
            duplicate_spawn_ids: Vec::new(),
            persist_report: Vec::new(),
        };

        if config.sanitize_perimeter {
            planner.sanitize_perimeter_sources();
        }
        planner.merge_sources();
        let mut used_ids = planner.collect_existing_ids();
        let bounds = area.bounds();
        for index in 0..planner.merged.len() {
            let spawn = planner.plan_entry(index, bounds, library, rng, &mut used_ids);
            planner.spawn_queue.push(spawn);
        }
        for index in 0..planner.batch_merged.len() {
            if let Some(batch) = planner.plan_batch_entry(index, library, rng, &mut used_ids) {
                planner.batch_spawn_assets.push(batch);
            }
        }
        // Stable: equal priorities keep merge order.
        planner.spawn_queue.sort_by_key(|spawn| spawn.priority);

        planner.persist_report = planner.persist_changed_sources(config);
        let summary = planner.summary();
        info!(
            sources = source_count,
            entries = summary.total_entries,
            candidates = summary.total_candidates,
            null_candidates = summary.null_candidates,
            batch_entries = summary.batch_entries,
            changed_sources = summary.changed_sources,
            written_sources = summary.written_sources,
            failed_sources = summary.failed_sources,
            status = summary.status_label(),
            "spawn_planner_summary"
        );
        planner
    }

    pub fn spawn_queue(&self) -> &[SpawnInfo] {
        &self.spawn_queue
    }

    /// Source documents including every back-filled field.
    pub fn sources(&self) -> &[Value] {
        &self.sources
    }

    pub fn batch_spawn_assets(&self) -> &[BatchSpawnInfo] {
        &self.batch_spawn_assets
    }

    /// True when at least one document carried a `batch_assets` block.
    pub fn has_batch_assets(&self) -> bool {
        self.has_batch_assets
    }

    /// Averaged `grid_spacing_min`/`grid_spacing_max` of the last batch block.
    pub fn batch_grid_spacing(&self) -> i32 {
        self.batch_grid_spacing
    }

    pub fn batch_jitter(&self) -> i32 {
        self.batch_jitter
    }

    pub fn source_paths(&self) -> &[SourcePath] {
        &self.source_paths
    }

    pub fn source_changed(&self, source_index: usize) -> bool {
        self.source_changed
            .get(source_index)
            .copied()
            .unwrap_or(false)
    }

    pub fn merged_entries(&self) -> &[Value] {
        &self.merged
    }

    pub fn provenance(&self) -> &[ProvenanceRef] {
        &self.provenance
    }

    pub fn batch_provenance(&self) -> &[ProvenanceRef] {
        &self.batch_provenance
    }

    /// Explicit `spawn_id` values shared by more than one merged entry. They are
    /// kept as written.
    pub fn duplicate_spawn_ids(&self) -> &[String] {
        &self.duplicate_spawn_ids
    }

    pub fn persist_report(&self) -> &[PersistOutcome] {
        &self.persist_report
    }

    pub fn summary(&self) -> SpawnQueueSummary {
        let total_candidates = self
            .spawn_queue
            .iter()
            .map(|spawn| spawn.candidates.len())
            .sum();
        let null_candidates = self
            .spawn_queue
            .iter()
            .flat_map(|spawn| spawn.candidates.iter())
            .filter(|candidate| candidate.is_null)
            .count();
        let count_outcome = |wanted: fn(&PersistOutcome) -> bool| {
            self.persist_report
                .iter()
                .filter(|outcome| wanted(outcome))
                .count()
        };
        SpawnQueueSummary {
            total_entries: self.spawn_queue.len(),
            total_candidates,
            null_candidates,
            batch_entries: self.batch_spawn_assets.len(),
            changed_sources: self.source_changed.iter().filter(|changed| **changed).count(),
            written_sources: count_outcome(|outcome| matches!(outcome, PersistOutcome::Written)),
            failed_sources: count_outcome(|outcome| matches!(outcome, PersistOutcome::Failed(_))),
        }
    }

    pub fn render_human_readable(&self) -> String {
        let summary = self.summary();
        let mut output = format!(
            "entries={} candidates={} null_candidates={} batch_entries={} changed_sources={} written={} failed={} status={}",
            summary.total_entries,
            summary.total_candidates,
            summary.null_candidates,
            summary.batch_entries,
            summary.changed_sources,
            summary.written_sources,
            summary.failed_sources,
            summary.status_label()
        );
        for spawn in &self.spawn_queue {
            output.push('\n');
            output.push_str(&format!(
                "priority={} spawn_id={} name={} position={} quantity={}",
                spawn.priority, spawn.spawn_id, spawn.name, spawn.position, spawn.quantity
            ));
            for candidate in &spawn.candidates {
                output.push_str(&format!(
                    "\n  candidate={} weight={} outcome={:?}",
                    candidate.display_name, candidate.weight, candidate.outcome
                ));
            }
        }
        if self.has_batch_assets {
            output.push_str(&format!(
                "\nbatch grid_spacing={} jitter={}",
                self.batch_grid_spacing, self.batch_jitter
            ));
            for batch in &self.batch_spawn_assets {
                output.push_str(&format!(
                    "\n  batch_asset={} percent={} spawn_id={}",
                    batch.name, batch.percent, batch.spawn_id
                ));
            }
        }
        for (index, outcome) in self.persist_report.iter().enumerate() {
            output.push('\n');
            output.push_str(&format!(
                "source={} path={} persist={:?}",
                index, self.source_paths[index], outcome
            ));
        }
        output
    }

    fn sanitize_perimeter_sources(&mut self) {
        for (source_index, doc) in self.sources.iter_mut().enumerate() {
            if find_spawn_groups(doc).is_none() {
                continue;
            }
            if let Some((groups, migrated)) = ensure_spawn_groups(doc) {
                if sanitize_perimeter_spawn_groups(groups) || migrated {
                    self.source_changed[source_index] = true;
                }
            }
        }
    }

    fn merge_sources(&mut self) {
        for (source_index, doc) in self.sources.iter_mut().enumerate() {
            let Some(object) = doc.as_object_mut() else {
                debug!(source_index, "spawn_source_not_an_object");
                continue;
            };
            if migrate_legacy_groups(object) {
                self.source_changed[source_index] = true;
            }

            if let Some(groups) = find_spawn_groups(doc) {
                for (entry_index, entry) in groups.iter().enumerate() {
                    if !entry.is_object() {
                        debug!(source_index, entry_index, "spawn_group_entry_skipped");
                        continue;
                    }
                    self.merged.push(entry.clone());
                    self.provenance.push(ProvenanceRef {
                        source_index,
                        entry_index,
                        key: SPAWN_GROUPS_KEY,
                    });
                }
            }

            let Some(block) = doc.get(BATCH_ASSETS_KEY).filter(|block| block.is_object()) else {
                continue;
            };
            let Some(entries) = block.get(BATCH_ASSETS_KEY).and_then(Value::as_array) else {
                continue;
            };
            // Later documents override the grid settings of earlier ones.
            self.has_batch_assets = true;
            self.batch_grid_spacing = to_i32(averaged_int(
                block,
                "grid_spacing",
                i64::from(DEFAULT_BATCH_GRID_SPACING),
            ));
            self.batch_jitter = to_i32(averaged_int(block, "jitter", 0));
            for (entry_index, entry) in entries.iter().enumerate() {
                if !entry.is_object() {
                    debug!(source_index, entry_index, "batch_asset_entry_skipped");
                    continue;
                }
                self.batch_merged.push(entry.clone());
                self.batch_provenance.push(ProvenanceRef {
                    source_index,
                    entry_index,
                    key: BATCH_ASSETS_KEY,
                });
            }
        }
    }

    fn collect_existing_ids(&mut self) -> HashSet<String> {
        let mut counts = BTreeMap::<String, usize>::new();
        for entry in self.merged.iter().chain(self.batch_merged.iter()) {
            if let Some(id) = non_empty_str(entry, "spawn_id") {
                *counts.entry(id.to_string()).or_default() += 1;
            }
        }
        for (id, count) in &counts {
            if *count > 1 {
                warn!(spawn_id = %id, count, "spawn_id_duplicated");
                self.duplicate_spawn_ids.push(id.clone());
            }
        }
        counts.into_keys().collect()
    }

    /// Sets `key` on merged entry `index` and on the cell it came from.
    fn write_back(&mut self, index: usize, key: &str, value: Value) {
        self.merged[index][key] = value.clone();
        let origin = self.provenance[index];
        self.write_to_source(origin, key, value);
    }

    fn write_back_batch(&mut self, index: usize, key: &str, value: Value) {
        self.batch_merged[index][key] = value.clone();
        let origin = self.batch_provenance[index];
        self.write_to_source(origin, key, value);
    }

    fn write_to_source(&mut self, origin: ProvenanceRef, key: &str, value: Value) {
        let target = self
            .sources
            .get_mut(origin.source_index)
            .and_then(|doc| entry_array_mut(doc, origin.key))
            .and_then(|entries| entries.get_mut(origin.entry_index))
            .filter(|entry| entry.is_object());
        if let Some(entry) = target {
            entry[key] = value;
            self.source_changed[origin.source_index] = true;
        }
    }

    fn next_spawn_id(rng: &mut SpawnRng, used_ids: &mut HashSet<String>) -> String {
        let mut id = generate_spawn_id(rng);
        while used_ids.contains(&id) {
            id = generate_spawn_id(rng);
        }
        used_ids.insert(id.clone());
        id
    }

    fn plan_entry(
        &mut self,
        index: usize,
        bounds: Bounds,
        library: &AssetLibrary,
        rng: &mut SpawnRng,
        used_ids: &mut HashSet<String>,
    ) -> SpawnInfo {
        let existing_id = non_empty_str(&self.merged[index], "spawn_id").map(ToString::to_string);
        let spawn_id = match existing_id {
            Some(id) => id,
            None => {
                let id = Self::next_spawn_id(rng, used_ids);
                self.write_back(index, "spawn_id", Value::from(id.clone()));
                id
            }
        };

        let priority = match int_field(&self.merged[index], "priority") {
            Some(priority) if priority >= 0 => to_i32(priority),
            _ => {
                self.write_back(index, "priority", Value::from(index));
                to_i32(index as i64)
            }
        };

        let position = normalize_position(str_field(&self.merged[index], "position"));
        let is_exact = position == POSITION_EXACT;
        let is_perimeter = position == POSITION_PERIMETER;

        if is_exact || is_perimeter {
            self.backfill_original_size(index, bounds);
        }

        let (min_number, max_number) = self.normalize_quantity_bounds(index);
        let quantity = rng.gen_range(min_number..=max_number);

        let entry = &self.merged[index];
        let name = non_empty_str(entry, "display_name")
            .or_else(|| non_empty_str(entry, "name"))
            .unwrap_or(&spawn_id)
            .to_string();

        let drafts = drafts_for_entry(entry);
        let spawn = SpawnInfo {
            name,
            position,
            spawn_id,
            quantity: to_i32(quantity),
            priority,
            check_spacing: bool_any(entry, &["check_overlap", "check_spacing"]).unwrap_or(false),
            check_min_spacing: bool_any(entry, &["enforce_spacing", "check_min_spacing"])
                .unwrap_or(false),
            exact_offset: Point::new(
                to_i32(int_any(entry, &["dx", "exact_dx"]).unwrap_or(0)),
                to_i32(int_any(entry, &["dy", "exact_dy"]).unwrap_or(0)),
            ),
            exact_origin_w: to_i32(int_field(entry, "origional_width").unwrap_or(0)),
            exact_origin_h: to_i32(int_field(entry, "origional_height").unwrap_or(0)),
            exact_point: Point::new(
                to_i32(averaged_int(entry, "ep_x", -1)),
                to_i32(averaged_int(entry, "ep_y", -1)),
            ),
            perimeter_radius: is_perimeter.then(|| {
                to_i32(int_any(entry, &["radius", "perimeter_radius"]).unwrap_or(0))
            }),
            grid_spacing: to_i32(averaged_int(entry, "grid_spacing", 0)),
            jitter: to_i32(averaged_int(entry, "jitter", 0)),
            empty_grid_spaces: to_i32(averaged_int(entry, "empty_grid_spaces", 0)),
            border_shift: to_i32(averaged_int(entry, "border_shift", 0)),
            sector_center: to_i32(averaged_int(entry, "sector_center", 0)),
            sector_range: to_i32(averaged_int(entry, "sector_range", 0)),
            perimeter_offset: Point::new(
                to_i32(averaged_int(entry, "perimeter_x_offset", 0)),
                to_i32(averaged_int(entry, "perimeter_y_offset", 0)),
            ),
            percent_x_min: to_i32(int_any(entry, &["p_x_min", "percent_x_min"]).unwrap_or(0)),
            percent_x_max: to_i32(int_any(entry, &["p_x_max", "percent_x_max"]).unwrap_or(0)),
            percent_y_min: to_i32(int_any(entry, &["p_y_min", "percent_y_min"]).unwrap_or(0)),
            percent_y_max: to_i32(int_any(entry, &["p_y_max", "percent_y_max"]).unwrap_or(0)),
            candidates: resolve_candidates(&drafts, library, rng),
        };
        debug!(
            spawn_id = %spawn.spawn_id,
            name = %spawn.name,
            position = %spawn.position,
            priority = spawn.priority,
            quantity = spawn.quantity,
            candidates = spawn.candidates.len(),
            "spawn_group_planned"
        );
        spawn
    }

    /// Resolves one batch entry. Entries whose tag matches nothing or whose
    /// asset is missing from the library are dropped before an id is assigned.
    fn plan_batch_entry(
        &mut self,
        index: usize,
        library: &AssetLibrary,
        rng: &mut SpawnRng,
        used_ids: &mut HashSet<String>,
    ) -> Option<BatchSpawnInfo> {
        let entry = &self.batch_merged[index];
        let tag = str_field(entry, "tag").map(sanitize_tag).filter(|tag| !tag.is_empty());
        let name = match tag {
            Some(tag) => {
                match resolve_asset_from_tag(library, &tag, &ExclusionSets::default(), rng) {
                    Ok(name) => {
                        self.batch_merged[index]["name"] = Value::from(name.clone());
                        name
                    }
                    Err(error) => {
                        debug!(tag = %tag, error = %error, "batch_asset_tag_unresolved");
                        return None;
                    }
                }
            }
            None => non_empty_str(entry, "name")?.to_string(),
        };
        if !library.contains(&name) {
            warn!(asset = %name, "batch_asset_missing");
            return None;
        }

        let entry = &self.batch_merged[index];
        let percent = to_i32(int_field(entry, "percent").unwrap_or(0).clamp(0, MAX_BATCH_PERCENT));
        let existing_id = non_empty_str(entry, "spawn_id").map(ToString::to_string);
        let spawn_id = match existing_id {
            Some(id) => id,
            None => {
                let id = Self::next_spawn_id(rng, used_ids);
                self.write_back_batch(index, "spawn_id", Value::from(id.clone()));
                id
            }
        };
        debug!(spawn_id = %spawn_id, name = %name, percent, "batch_asset_planned");
        Some(BatchSpawnInfo {
            name,
            percent,
            spawn_id,
        })
    }

    fn backfill_original_size(&mut self, index: usize, bounds: Bounds) {
        let entry = &self.merged[index];
        let has_width = int_field(entry, "origional_width").is_some();
        let has_height = int_field(entry, "origional_height").is_some();
        if !has_width {
            self.write_back(index, "origional_width", Value::from(bounds.width().max(1)));
        }
        if !has_height {
            self.write_back(index, "origional_height", Value::from(bounds.height().max(1)));
        }
    }

    /// Clamps both bounds to zero and orders them. The merged copy is updated
    /// when they change; the source document is left as authored.
    fn normalize_quantity_bounds(&mut self, index: usize) -> (i64, i64) {
        let entry = &self.merged[index];
        let raw_min = int_field(entry, "min_number");
        let raw_max = int_field(entry, "max_number");
        let mut min_number = raw_min.unwrap_or(DEFAULT_MIN_NUMBER).max(0);
        let mut max_number = raw_max.unwrap_or(min_number).max(0);
        if max_number < min_number {
            std::mem::swap(&mut min_number, &mut max_number);
        }
        if raw_min != Some(min_number) || raw_max != Some(max_number) {
            self.merged[index]["min_number"] = Value::from(min_number);
            self.merged[index]["max_number"] = Value::from(max_number);
        }
        (min_number, max_number)
    }

    fn persist_changed_sources(&self, config: PlannerConfig) -> Vec<PersistOutcome> {
        self.sources
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let path = &self.source_paths[index];
                if !self.source_changed[index] {
                    return PersistOutcome::Unchanged;
                }
                if path.is_in_memory() {
                    return PersistOutcome::SkippedInMemory;
                }
                if !config.persist {
                    return PersistOutcome::SkippedDisabled;
                }
                match write_source(path, doc) {
                    Ok(()) => {
                        info!(source_index = index, path = %path, "spawn_source_persisted");
                        PersistOutcome::Written
                    }
                    Err(error) => {
                        warn!(
                            source_index = index,
                            path = %path,
                            error = %error,
                            "spawn_source_persist_failed"
                        );
                        PersistOutcome::Failed(error.to_string())
                    }
                }
            })
            .collect()
    }
}

/// The array a provenance key points at: `spawn_groups` directly, or the
/// `batch_assets` array nested inside the `batch_assets` block.
fn entry_array_mut<'a>(doc: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    let container = doc.get_mut(key)?;
    if key == BATCH_ASSETS_KEY {
        container.get_mut(BATCH_ASSETS_KEY)
    } else {
        Some(container)
    }
}
