//! Configuration schema and loading.
//!
//! Config files: `spindrift.toml`, `spindrift.yaml`, or `spindrift.json`,
//! searched in `./` then `~/.config/spindrift/`. Supports `${ENV_VAR}`
//! substitution in all string values.
//!
//! The loaded [`SpindriftConfig`] is immutable and constructed once at
//! process start; components receive the sections they need by reference
//! instead of reading ambient state.

pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        GraphConfig, MailConfig, PollConfig, RelayConfig, RunnerConfig, SaildocsConfig,
        SpindriftConfig, TrackerConfig, TrackerStrategy,
    },
};
