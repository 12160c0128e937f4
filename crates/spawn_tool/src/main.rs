use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod run;

use config::{load_tool_config, parse_bounds, CliOverrides};

fn main() -> ExitCode {
    init_tracing();
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        return Err(usage_text());
    }
    if args[0] == "-h" || args[0] == "--help" {
        print_usage();
        return Ok(());
    }

    let mut config_path = None::<PathBuf>;
    let mut overrides = CliOverrides::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--config" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --config".to_string())?;
                config_path = Some(PathBuf::from(value));
                index += 2;
            }
            "--library" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --library".to_string())?;
                overrides.library_dir = Some(PathBuf::from(value));
                index += 2;
            }
            "--seed" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --seed".to_string())?;
                overrides.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("invalid --seed value '{value}' (expected u64)"))?,
                );
                index += 2;
            }
            "--bounds" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --bounds".to_string())?;
                overrides.bounds = Some(parse_bounds(value)?);
                index += 2;
            }
            "--dry-run" => {
                overrides.dry_run = true;
                index += 1;
            }
            "--sanitize-perimeter" => {
                overrides.sanitize_perimeter = true;
                index += 1;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option '{other}'"));
            }
            _ => break,
        }
    }

    let sources = args[index..].to_vec();
    if sources.is_empty() {
        return Err("missing source file (expected <source.json[::key]>...)".to_string());
    }

    let config = load_tool_config(config_path.as_deref(), overrides)?;
    info!(
        sources = sources.len(),
        library_dir = ?config.library_dir,
        seed = ?config.seed,
        persist = config.persist,
        "spawn_tool_start"
    );
    run::run(&sources, &config, &mut io::stdout())
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "spawn_tool - plan spawn groups for rooms, trails and maps",
        "",
        "Usage:",
        "  spawn_tool [--config <file>] [--library <dir>] [--seed <u64>] [--bounds <minx,miny,maxx,maxy>] [--dry-run] [--sanitize-perimeter] <source.json[::key]>...",
        "",
        "Sources are planned together in the given order. A source written as",
        "file.json::key reads and updates the object stored under key in file.json.",
        "--sanitize-perimeter raises Perimeter groups to at least two spawns before planning.",
        "",
        "Defaults:",
        "  --library <root>/SRC (root from SPAWN_TOOL_ROOT or the nearest parent holding SRC/)",
        "  --bounds from the first source's min/max width and height",
        "  --seed random",
    ]
    .join("\n")
}
