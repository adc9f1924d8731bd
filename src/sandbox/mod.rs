//! Bounded execution of small assistant snippets.
//!
//! Python snippets run in a child interpreter process; JavaScript snippets run
//! in an in-process script context that only sees the host functions granted
//! by a [`Capabilities`] allow-list. Every outcome, including timeouts and a
//! disabled executor, comes back as displayable [`ExecutionResult`] text.

use std::{fmt, str::FromStr, time::Duration};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;

mod process;
mod script;

pub use script::{Capabilities, Capability};

pub const TIMEOUT_OUTPUT: &str = "Timeout";
pub const DISABLED_OUTPUT: &str = "Code execution is disabled.";
pub const TRUNCATION_MARKER: &str = "\n[output truncated]";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub language: Language,
    pub source: String,
    timeout: Duration,
}

impl ExecutionRequest {
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self { language, source: source.into(), timeout: DEFAULT_TIMEOUT }
    }

    /// A zero timeout keeps the current one.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Truncated,
    Failed,
    TimedOut,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub output: String,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    pub(crate) fn completed(output: impl Into<String>) -> Self {
        Self { output: output.into(), status: ExecutionStatus::Completed }
    }

    pub(crate) fn failed(output: impl Into<String>) -> Self {
        let output = output.into();
        let output = if output.trim().is_empty() { "Error: execution failed".to_string() } else { output };
        Self { output, status: ExecutionStatus::Failed }
    }

    pub(crate) fn timed_out() -> Self {
        Self { output: TIMEOUT_OUTPUT.to_string(), status: ExecutionStatus::TimedOut }
    }

    pub(crate) fn disabled() -> Self {
        Self { output: DISABLED_OUTPUT.to_string(), status: ExecutionStatus::Disabled }
    }

    pub fn truncated_or_failed(&self) -> bool {
        self.status != ExecutionStatus::Completed
    }

    /// Truncates captured output. Sentinel outputs are left as they are.
    fn cap(mut self, max_bytes: usize) -> Self {
        let captured = matches!(self.status, ExecutionStatus::Completed | ExecutionStatus::Failed);
        if !captured || self.output.len() <= max_bytes {
            return self;
        }
        let mut end = max_bytes;
        while !self.output.is_char_boundary(end) {
            end -= 1;
        }
        self.output.truncate(end);
        self.output.push_str(TRUNCATION_MARKER);
        if self.status == ExecutionStatus::Completed {
            self.status = ExecutionStatus::Truncated;
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub enabled: bool,
    pub python_bin: String,
    pub default_timeout: Duration,
    pub loop_iteration_limit: u64,
    pub max_output_bytes: usize,
    pub capabilities: Capabilities,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            python_bin: "python3".into(),
            default_timeout: DEFAULT_TIMEOUT,
            loop_iteration_limit: 10_000_000,
            max_output_bytes: 64 * 1024,
            capabilities: Capabilities::default(),
        }
    }
}

impl ExecutorSettings {
    pub fn from_config(cfg: &Config) -> Self {
        let defaults = Self::default();
        Self {
            enabled: cfg.get_bool("ENABLE_CODE_EXECUTION"),
            python_bin: cfg.get("PYTHON_BIN").unwrap_or(defaults.python_bin),
            default_timeout: cfg
                .get_u64("CODE_EXECUTION_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_timeout),
            loop_iteration_limit: cfg.get_u64("SCRIPT_LOOP_LIMIT").unwrap_or(defaults.loop_iteration_limit),
            max_output_bytes: cfg
                .get_usize("MAX_OUTPUT_BYTES")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_output_bytes),
            capabilities: defaults.capabilities,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SandboxedExecutor {
    settings: ExecutorSettings,
}

impl SandboxedExecutor {
    pub fn new(settings: ExecutorSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(ExecutorSettings::from_config(cfg))
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Request with this executor's configured default timeout.
    pub fn request(&self, language: Language, source: impl Into<String>) -> ExecutionRequest {
        ExecutionRequest::new(language, source).with_timeout(self.settings.default_timeout)
    }

    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        if !self.settings.enabled {
            debug!(language = %request.language, "code execution disabled");
            return ExecutionResult::disabled();
        }

        let result = match request.language {
            Language::Python => process::run(&self.settings.python_bin, &request.source, request.timeout()).await,
            Language::JavaScript => script::run(
                &request.source,
                request.timeout(),
                self.settings.loop_iteration_limit,
                self.settings.capabilities.clone(),
            )
            .await,
        };

        if result.status == ExecutionStatus::TimedOut {
            warn!(language = %request.language, timeout_ms = request.timeout().as_millis() as u64, "snippet timed out");
        }
        result.cap(self.settings.max_output_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_executor_never_runs_anything() {
        let settings = ExecutorSettings { python_bin: "/definitely/not/a/python".into(), ..Default::default() };
        let executor = SandboxedExecutor::new(settings);
        for language in [Language::Python, Language::JavaScript] {
            let result = executor.execute(&ExecutionRequest::new(language, "print(1)")).await;
            assert_eq!(result.output, DISABLED_OUTPUT);
            assert_eq!(result.status, ExecutionStatus::Disabled);
            assert!(result.truncated_or_failed());
        }
    }

    #[test]
    fn output_is_capped_on_char_boundary() {
        let result = ExecutionResult::completed("ಕನ್ನಡ text").cap(4);
        assert_eq!(result.status, ExecutionStatus::Truncated);
        assert!(result.output.starts_with('ಕ'));
        assert!(result.output.ends_with(TRUNCATION_MARKER));

        let failed = ExecutionResult::failed("boom boom").cap(4);
        assert_eq!(failed.status, ExecutionStatus::Failed);
    }

    #[test]
    fn sentinels_survive_tiny_caps() {
        let timed_out = ExecutionResult::timed_out().cap(1);
        assert_eq!(timed_out.output, TIMEOUT_OUTPUT);
        assert_eq!(timed_out.status, ExecutionStatus::TimedOut);

        let disabled = ExecutionResult::disabled().cap(1);
        assert_eq!(disabled.output, DISABLED_OUTPUT);
        assert_eq!(disabled.status, ExecutionStatus::Disabled);
    }

    #[test]
    fn zero_timeout_keeps_default() {
        let req = ExecutionRequest::new(Language::Python, "1").with_timeout(Duration::ZERO);
        assert_eq!(req.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn settings_read_from_config() {
        let cfg = Config::from_pairs([
            ("ENABLE_CODE_EXECUTION", "true"),
            ("CODE_EXECUTION_TIMEOUT_MS", "250"),
            ("PYTHON_BIN", "pypy3"),
        ]);
        let settings = ExecutorSettings::from_config(&cfg);
        assert!(settings.enabled);
        assert_eq!(settings.default_timeout, Duration::from_millis(250));
        assert_eq!(settings.python_bin, "pypy3");
        assert_eq!(settings.capabilities, Capabilities::default());
        assert_eq!(settings.max_output_bytes, ExecutorSettings::default().max_output_bytes);
    }

    #[test]
    fn zero_output_cap_keeps_default() {
        let cfg = Config::from_pairs([("MAX_OUTPUT_BYTES", "0")]);
        let settings = ExecutorSettings::from_config(&cfg);
        assert_eq!(settings.max_output_bytes, 64 * 1024);

        let result = ExecutionResult::completed("42").cap(settings.max_output_bytes);
        assert_eq!(result.output, "42");
        assert_eq!(result.status, ExecutionStatus::Completed);
    }

    #[test]
    fn language_names() {
        assert_eq!("PY".parse::<Language>(), Ok(Language::Python));
        assert_eq!("js".parse::<Language>(), Ok(Language::JavaScript));
        assert!("ruby".parse::<Language>().is_err());
    }
}
