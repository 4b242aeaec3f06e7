use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
    read_env: bool,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        // Read .codeshellrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path: config_path.to_path_buf(), read_env: true }
    }

    /// Defaults overlaid with explicit pairs; never touches disk or the environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, config_path: PathBuf::new(), read_env: false }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if self.read_env {
            if let Ok(v) = env::var(key) {
                return Some(v);
            }
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.get_u64("REQUEST_TIMEOUT").unwrap_or(60))
    }

    /// Non-empty string value, used for URLs and keys.
    pub fn get_nonempty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|s| !s.trim().is_empty())
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or CODESHELL_* for forward-compat
    const KEYS: &[&str] = &[
        "EXECUTION_API_URL",
        "ANALYSIS_API_URL",
        "MODEL_API_URL",
        "MODEL_API_KEY",
        "MODEL_ID",
        "MODEL_TASK",
        "MODEL_RETRY_AFTER_FAILURE",
        "REQUEST_TIMEOUT",
        "DEFAULT_LANGUAGE",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("CODESHELL_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("codeshell").join(".codeshellrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Endpoints
    m.insert("EXECUTION_API_URL".into(), "https://emkc.org/api/v2/piston".into());
    m.insert("ANALYSIS_API_URL".into(), "https://emkc.org/api/v2/piston/analyze".into());
    m.insert("MODEL_API_URL".into(), "https://api-inference.huggingface.co".into());

    // Model
    m.insert("MODEL_ID".into(), "Xenova/codellama-7b-instruct-hf".into());
    m.insert("MODEL_TASK".into(), "text-generation".into());

    // Numbers
    m.insert("REQUEST_TIMEOUT".into(), "60".into());

    // Strings
    m.insert("DEFAULT_LANGUAGE".into(), "javascript".into());

    // Bools as strings
    m.insert("MODEL_RETRY_AFTER_FAILURE".into(), "true".into());
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}
