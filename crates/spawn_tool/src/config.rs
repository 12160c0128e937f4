use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use spawn_engine::Bounds;

/// Optional JSON file passed with `--config`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ToolConfigFile {
    #[serde(default)]
    pub library_dir: Option<PathBuf>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub bounds: Option<[i32; 4]>,
    #[serde(default)]
    pub persist: Option<bool>,
    #[serde(default)]
    pub sanitize_perimeter: Option<bool>,
}

#[derive(Debug, Default)]
pub(crate) struct CliOverrides {
    pub library_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub bounds: Option<Bounds>,
    pub dry_run: bool,
    pub sanitize_perimeter: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ToolConfig {
    pub library_dir: Option<PathBuf>,
    pub seed: Option<u64>,
    pub bounds: Option<Bounds>,
    pub persist: bool,
    pub sanitize_perimeter: bool,
}

/// Command-line values win over the config file; `--dry-run` always disables
/// persistence.
pub(crate) fn load_tool_config(
    path: Option<&Path>,
    overrides: CliOverrides,
) -> Result<ToolConfig, String> {
    let file = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .map_err(|error| format!("read config '{}': {error}", path.display()))?;
            let mut parsed = parse_tool_config_json(&raw)?;
            if let (Some(library_dir), Some(parent)) = (parsed.library_dir.as_mut(), path.parent())
            {
                if library_dir.is_relative() {
                    *library_dir = parent.join(&*library_dir);
                }
            }
            parsed
        }
        None => ToolConfigFile::default(),
    };

    let file_bounds = file.bounds.map(bounds_from_array).transpose()?;
    Ok(ToolConfig {
        library_dir: overrides.library_dir.or(file.library_dir),
        seed: overrides.seed.or(file.seed),
        bounds: overrides.bounds.or(file_bounds),
        persist: !overrides.dry_run && file.persist.unwrap_or(true),
        sanitize_perimeter: overrides.sanitize_perimeter
            || file.sanitize_perimeter.unwrap_or(false),
    })
}

pub(crate) fn parse_tool_config_json(raw: &str) -> Result<ToolConfigFile, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, ToolConfigFile>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}

pub(crate) fn parse_bounds(raw: &str) -> Result<Bounds, String> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| format!("invalid bounds '{raw}' (expected minx,miny,maxx,maxy)"))?;
    let values: [i32; 4] = values
        .try_into()
        .map_err(|_| format!("invalid bounds '{raw}' (expected 4 integers)"))?;
    bounds_from_array(values)
}

fn bounds_from_array([min_x, min_y, max_x, max_y]: [i32; 4]) -> Result<Bounds, String> {
    if max_x < min_x || max_y < min_y {
        return Err(format!(
            "invalid bounds {min_x},{min_y},{max_x},{max_y}: max must not be below min"
        ));
    }
    Ok(Bounds::new(min_x, min_y, max_x, max_y))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn parses_bounds_argument() {
        assert_eq!(parse_bounds("0, 0, 99, 49"), Ok(Bounds::new(0, 0, 99, 49)));
        assert!(parse_bounds("0,0,99").is_err());
        assert!(parse_bounds("0,0,a,49").is_err());
        assert!(parse_bounds("10,0,5,49").is_err());
    }

    #[test]
    fn config_errors_carry_json_path() {
        let error = parse_tool_config_json(r#"{"seed": "twelve"}"#).expect_err("bad seed");
        assert!(error.starts_with("parse config json at seed:"), "{error}");
        let unknown = parse_tool_config_json(r#"{"sed": 1}"#).expect_err("unknown field");
        assert!(unknown.contains("sed"), "{unknown}");
    }

    #[test]
    fn cli_overrides_config_file() {
        let temp = TempDir::new().expect("temp");
        let config_path = temp.path().join("spawn_tool.json");
        fs::write(
            &config_path,
            r#"{"library_dir": "SRC", "seed": 5, "bounds": [0, 0, 9, 9], "persist": true,
                "sanitize_perimeter": true}"#,
        )
        .expect("config");

        let from_file =
            load_tool_config(Some(&config_path), CliOverrides::default()).expect("config");
        assert_eq!(from_file.library_dir, Some(temp.path().join("SRC")));
        assert_eq!(from_file.seed, Some(5));
        assert_eq!(from_file.bounds, Some(Bounds::new(0, 0, 9, 9)));
        assert!(from_file.persist);
        assert!(from_file.sanitize_perimeter);

        let overridden = load_tool_config(
            Some(&config_path),
            CliOverrides {
                library_dir: Some(PathBuf::from("/assets")),
                seed: Some(7),
                bounds: None,
                dry_run: true,
                sanitize_perimeter: false,
            },
        )
        .expect("config");
        assert_eq!(overridden.library_dir, Some(PathBuf::from("/assets")));
        assert_eq!(overridden.seed, Some(7));
        assert_eq!(overridden.bounds, Some(Bounds::new(0, 0, 9, 9)));
        assert!(!overridden.persist);
    }

    #[test]
    fn defaults_without_config_file() {
        let config = load_tool_config(None, CliOverrides::default()).expect("config");
        assert_eq!(
            config,
            ToolConfig {
                library_dir: None,
                seed: None,
                bounds: None,
                persist: true,
                sanitize_perimeter: false,
            }
        );
    }
}
