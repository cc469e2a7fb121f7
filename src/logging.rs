//! `env_logger` bootstrap scoped to this crate's targets.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// How much the engine itself reports. Other crates stay at `warn`, and
/// `RUST_LOG` overrides both.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings about aborted responses and dropped events, plus `info`.
    #[default]
    Quiet,
    /// Box registration, deregistration and skipped boxes.
    Lifecycle,
    /// Every narrowphase hit and a per-frame counter summary.
    Pairs,
}

impl Verbosity {
    pub fn level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Info,
            Verbosity::Lifecycle => LevelFilter::Debug,
            Verbosity::Pairs => LevelFilter::Trace,
        }
    }
}

fn builder(verbosity: Verbosity, env: Env<'_>) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), verbosity.level())
        .format_timestamp(None)
        .format_target(true);
    builder.parse_env(env);
    builder
}

/// Install the global logger. Later calls are no-ops, so every test may call it.
pub fn init(verbosity: Verbosity) {
    let _ = builder(verbosity, Env::default()).try_init();
}
