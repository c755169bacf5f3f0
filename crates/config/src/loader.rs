use std::path::{Path, PathBuf};

use {
    regex::{Captures, Regex},
    tracing::{debug, warn},
};

use crate::schema::SpindriftConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "spindrift.toml",
    "spindrift.yaml",
    "spindrift.yml",
    "spindrift.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<SpindriftConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./spindrift.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/spindrift/spindrift.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SpindriftConfig::default()` if no config file is found.
pub fn discover_and_load() -> SpindriftConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    SpindriftConfig::default()
}

/// Returns the user-global config directory (`~/.config/spindrift/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "spindrift").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<SpindriftConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Replace `${ENV_VAR}` placeholders in the raw config text.
///
/// Unresolvable variables are left as-is so the parse error points at the
/// placeholder rather than at an empty value.
fn substitute_env(raw: &str) -> String {
    substitute_env_with(raw, |name| std::env::var(name).ok())
}

// Split out so tests can substitute without mutating the process environment.
fn substitute_env_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let pattern = match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
        Ok(re) => re,
        Err(_) => return raw.to_string(),
    };
    pattern
        .replace_all(raw, |caps: &Captures<'_>| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
