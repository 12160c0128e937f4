use std::fs;
use std::io::Write;
use std::path::Path;

use serde_json::Value;
use spawn_engine::{
    resolve_tool_paths, Area, AreaBounds, AssetLibrary, PlannerConfig, SourcePath, SpawnPlanner,
    SpawnRng,
};
use tracing::info;

use crate::config::ToolConfig;

const DEFAULT_ROOM_SIZE: i64 = 64;

pub(crate) fn run(
    sources: &[String],
    config: &ToolConfig,
    out: &mut impl Write,
) -> Result<(), String> {
    let library_dir = match &config.library_dir {
        Some(dir) => dir.clone(),
        None => {
            resolve_tool_paths()
                .map_err(|error| format!("resolve tool paths: {error}"))?
                .library_dir
        }
    };
    let (library, load_summary) = AssetLibrary::load_from_dir(&library_dir)
        .map_err(|error| format!("load asset library: {error}"))?;
    info!(
        library_dir = %library_dir.display(),
        loaded = load_summary.loaded,
        failed = load_summary.failed,
        "spawn_tool_library_ready"
    );

    let documents = sources
        .iter()
        .map(|raw| load_source(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let area: Box<dyn AreaBounds> = match config.bounds {
        Some(bounds) => Box::new(bounds),
        None => {
            let room = room_area(documents.first().unwrap_or(&Value::Null));
            info!(area = room.name(), bounds = ?room.bounds(), "spawn_tool_room_area");
            Box::new(room)
        }
    };
    let mut rng = match config.seed {
        Some(seed) => SpawnRng::seeded(seed),
        None => SpawnRng::from_entropy(),
    };

    let planner = SpawnPlanner::with_config(
        documents,
        area.as_ref(),
        &library,
        sources.to_vec(),
        &mut rng,
        PlannerConfig {
            persist: config.persist,
            sanitize_perimeter: config.sanitize_perimeter,
        },
    );
    writeln!(out, "{}", planner.render_human_readable())
        .map_err(|error| format!("write output: {error}"))
}

fn load_source(raw: &str) -> Result<Value, String> {
    let path = SourcePath::parse(raw);
    let file = path
        .file()
        .ok_or_else(|| "source path cannot be empty".to_string())?;
    let doc = read_json(file)?;
    match &path {
        SourcePath::Embedded { key, .. } => Ok(doc
            .get(key)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))),
        _ => Ok(doc),
    }
}

fn read_json(path: &Path) -> Result<Value, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read source '{}': {error}", path.display()))?;
    serde_json::from_str::<Value>(&raw)
        .map_err(|error| format!("parse source '{}': {error}", path.display()))
}

/// Room-sized rectangle from a room document's `min_width`/`max_width` and
/// `min_height`/`max_height` midpoints.
fn room_area(doc: &Value) -> Area {
    let dimension = |min_key: &str, max_key: &str| -> i32 {
        let min = doc
            .get(min_key)
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_ROOM_SIZE);
        let max = doc.get(max_key).and_then(Value::as_i64).unwrap_or(min);
        (min.saturating_add(max) / 2).clamp(1, i64::from(i32::MAX)) as i32
    };
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("room")
        .to_string();
    Area::rect(
        name,
        0,
        0,
        dimension("min_width", "max_width"),
        dimension("min_height", "max_height"),
    )
}
