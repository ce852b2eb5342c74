//! Build-mode policy.
//!
//! Trellis has exactly two behaviours that differ between development and
//! production, and both are decided here:
//!
//! - reading a selector context without a provider is an error in
//!   development and silently yields the default value in production;
//! - the state manager adapter checks and logs manager transitions in
//!   development only.

/// Environment variable read by [`HostConfig::from_env`] to pick the build mode.
pub const BUILD_MODE_ENV: &str = "TRELLIS_BUILD_MODE";
/// Environment variable read by [`HostConfig::from_env`] to enable strict mode.
pub const STRICT_ENV: &str = "TRELLIS_STRICT";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    /// `Development` under `debug_assertions`, `Production` otherwise.
    pub fn from_profile() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(BuildMode::Development),
            "production" | "prod" => Some(BuildMode::Production),
            _ => None,
        }
    }

    /// Missing providers are reported instead of falling back to the default.
    pub fn reports_missing_provider(self) -> bool {
        self == BuildMode::Development
    }

    /// Manager snapshots are checked and transitions logged.
    pub fn guards_snapshots(self) -> bool {
        self == BuildMode::Development
    }
}

impl Default for BuildMode {
    fn default() -> Self {
        Self::from_profile()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostConfig {
    pub mode: BuildMode,
    /// Invoke every render body twice per render and discard the first
    /// pass's layout effects. Children are rendered by the second pass
    /// only, so each body runs exactly twice however deep it sits.
    pub strict: bool,
    /// Upper bound on render-then-commit passes in a single flush.
    pub max_flush_passes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mode: BuildMode::from_profile(),
            strict: false,
            max_flush_passes: 50,
        }
    }
}

impl HostConfig {
    pub fn development() -> Self {
        Self {
            mode: BuildMode::Development,
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self {
            mode: BuildMode::Production,
            ..Self::default()
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Defaults, overridden by `TRELLIS_BUILD_MODE` and `TRELLIS_STRICT`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(BUILD_MODE_ENV) {
            match BuildMode::parse(&raw) {
                Some(mode) => config.mode = mode,
                None => log::warn!("{BUILD_MODE_ENV}={raw:?} is not a build mode; using {:?}", config.mode),
            }
        }
        if let Ok(raw) = std::env::var(STRICT_ENV) {
            config.strict = matches!(raw.trim(), "1" | "true" | "yes");
        }
        config
    }
}
