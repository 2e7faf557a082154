//! Process-wide settings for the built-in execution contexts.
//!
//! The configuration is read the first time a built-in context or the
//! default context is needed. Install a custom one before that point.
use crate::ConfigError;
use once_cell::sync::OnceCell;
use std::str::FromStr;

static CONFIG: OnceCell<Config> = OnceCell::new();

pub const DEFAULT_CONTEXT_VAR: &str = "PROMISE_DEFAULT_CONTEXT";
pub const BACKGROUND_THREADS_VAR: &str = "PROMISE_BACKGROUND_THREADS";

/// Which context `then`/`catch`/`finally` use when the caller names none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultContext {
    #[default]
    Foreground,
    Background,
    /// Run continuations on whichever thread settles the upstream promise.
    Immediate,
}

impl FromStr for DefaultContext {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foreground" | "main" => Ok(DefaultContext::Foreground),
            "background" => Ok(DefaultContext::Background),
            "immediate" | "inline" => Ok(DefaultContext::Immediate),
            _ => Err(ConfigError::Invalid {
                key: DEFAULT_CONTEXT_VAR,
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    default_context: DefaultContext,
    background_threads: Option<usize>,
    thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_context: DefaultContext::Foreground,
            background_threads: None,
            thread_name_prefix: "promise".to_owned(),
        }
    }
}

impl Config {
    /// Defaults overridden by `PROMISE_DEFAULT_CONTEXT` and
    /// `PROMISE_BACKGROUND_THREADS` when they are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(value) = lookup(DEFAULT_CONTEXT_VAR) {
            config.default_context = value.parse()?;
        }
        if let Some(value) = lookup(BACKGROUND_THREADS_VAR) {
            let threads = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid {
                    key: BACKGROUND_THREADS_VAR,
                    value,
                })?;
            config.background_threads = Some(threads);
        }
        Ok(config)
    }

    pub fn with_default_context(mut self, context: DefaultContext) -> Self {
        self.default_context = context;
        self
    }

    /// `None` lets the pool size itself to the number of CPUs.
    pub fn with_background_threads(mut self, threads: Option<usize>) -> Self {
        self.background_threads = threads;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn default_context(&self) -> DefaultContext {
        self.default_context
    }

    pub fn background_threads(&self) -> Option<usize> {
        self.background_threads
    }

    pub fn thread_name_prefix(&self) -> &str {
        &self.thread_name_prefix
    }

    /// Make this the process-wide configuration. Fails once any configuration
    /// has been installed or read.
    pub fn install(self) -> Result<(), ConfigError> {
        tracing::debug!(config = ?self, "installing promise configuration");
        CONFIG.set(self).map_err(|_| ConfigError::AlreadyInstalled)
    }

    /// The installed configuration, or the defaults if none was installed.
    pub fn current() -> &'static Config {
        CONFIG.get_or_init(Config::default)
    }
}
