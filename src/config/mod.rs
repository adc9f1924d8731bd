use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let config_path = default_config_path();
        let mut cfg = Self { inner: default_map(), config_path };

        // Read .kisanrc if exists
        if cfg.config_path.exists() {
            let path = cfg.config_path.clone();
            cfg.overlay_file(&path);
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                cfg.inner.insert(k, v);
            }
        }

        cfg
    }

    /// Defaults plus the given pairs; ignores the rc file and the environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut inner = default_map();
        for (k, v) in pairs {
            inner.insert(k.into(), v.into());
        }
        Self { inner, config_path: default_config_path() }
    }

    fn overlay_file(&mut self, path: &Path) {
        if let Ok(file) = fs::File::open(path) {
            let reader = BufReader::new(file);
            for line in reader.lines().map_while(|l| l.ok()) {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((k, v)) = line.split_once('=') {
                    self.inner.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| Error::Config(format!("missing {key}; set it in env or {}", self.config_path.display())))
    }

    pub fn data_store_path(&self) -> PathBuf {
        self.get("DATA_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| kisan_data_dir().join("store.json"))
    }

    pub fn memory_path(&self) -> PathBuf {
        self.get("MEMORY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| kisan_data_dir().join("memory.json"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("REQUEST_TIMEOUT").unwrap_or(30))
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or KISAN_* for forward-compat
    const KEYS: &[&str] = &[
        "ENABLE_CODE_EXECUTION",
        "CODE_EXECUTION_TIMEOUT_MS",
        "PYTHON_BIN",
        "SCRIPT_LOOP_LIMIT",
        "MAX_OUTPUT_BYTES",
        "DATA_STORE_PATH",
        "MEMORY_PATH",
        "MARKET_API_BASE",
        "MARKET_API_KEY",
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "DEFAULT_MODEL",
        "REQUEST_TIMEOUT",
        "USE_AI",
        "RESULT_LIMIT",
        "LOG_LEVEL",
    ];

    KEYS.contains(&k) || k.starts_with("KISAN_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("project_kisan").join(".kisanrc")
}

fn kisan_data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.data_dir().to_path_buf())
        .unwrap_or_else(env::temp_dir)
        .join("project_kisan")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Numbers
    m.insert("CODE_EXECUTION_TIMEOUT_MS".into(), "5000".into());
    m.insert("SCRIPT_LOOP_LIMIT".into(), "10000000".into());
    m.insert("MAX_OUTPUT_BYTES".into(), "65536".into());
    m.insert("REQUEST_TIMEOUT".into(), "30".into());
    m.insert("RESULT_LIMIT".into(), "20".into());

    // Strings
    m.insert("PYTHON_BIN".into(), "python3".into());
    m.insert("DEFAULT_MODEL".into(), "gpt-4o-mini".into());
    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("LOG_LEVEL".into(), "warn".into());

    // Bools as strings
    m.insert("ENABLE_CODE_EXECUTION".into(), "false".into());
    m.insert("USE_AI".into(), "true".into());

    m
}
