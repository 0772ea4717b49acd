use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Waterer monitoring dashboard", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "WATERER_BACKEND_URL", help = "Base URL of the waterer backend.")]
    pub backend_url: Option<String>,

    #[clap(long, env = "WATERER_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "WATERER_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "WATERER_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "WATERER_POLL_INTERVAL_SECONDS", help = "Seconds between status polls per channel.")]
    pub poll_interval_seconds: Option<u64>,

    #[clap(long, env = "WATERER_RESET_BATCH_LIMIT", help = "Received batches after which a channel's history is cleared.")]
    pub reset_batch_limit: Option<u32>,

    #[clap(long, env = "WATERER_REGISTRY_RETRY_SECONDS", help = "Seconds between retries while the channel count is unavailable.")]
    pub registry_retry_seconds: Option<u64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            backend_url: other.backend_url.or(self.backend_url),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            poll_interval_seconds: other.poll_interval_seconds.or(self.poll_interval_seconds),
            reset_batch_limit: other.reset_batch_limit.or(self.reset_batch_limit),
            registry_retry_seconds: other.registry_retry_seconds.or(self.registry_retry_seconds),
        }
    }
}

pub fn load_config() -> Config {
    // 1. Load defaults
    let default_config = Config {
        backend_url: Some("http://127.0.0.1:5000/".to_string()),
        log_dir: Some(PathBuf::from("./logs")),
        log_level: Some("info".to_string()),
        poll_interval_seconds: Some(5),
        reset_batch_limit: Some(1000),
        registry_retry_seconds: Some(5),
        ..Default::default()
    };

    // 2. Load from config file (waterer_dash.conf) if present.
    //    Allow overriding default config file path with CLI arg.
    let cli_args_for_path = Config::parse();

    let config_file_path = cli_args_for_path.config_path.clone().unwrap_or_else(|| {
        let local = PathBuf::from("waterer_dash.conf");
        if local.exists() {
            return local;
        }
        // Fall back to a per-user config next to the home directory.
        dirs::home_dir()
            .map(|home| home.join(".waterer_dash.conf"))
            .unwrap_or(local)
    });

    let mut current_config = default_config;

    if config_file_path.exists() {
        if let Ok(config_str) = fs::read_to_string(&config_file_path) {
            if let Ok(file_config) = serde_json::from_str::<Config>(&config_str) {
                current_config = current_config.merge(file_config);
            } else {
                log::warn!(
                    "Failed to parse config file: {}. Falling back to other sources.",
                    config_file_path.display()
                );
            }
        } else {
            log::warn!(
                "Failed to read config file: {}. Falling back to other sources.",
                config_file_path.display()
            );
        }
    }

    // 3. Override with environment variables and CLI arguments
    let cli_args_final = Config::parse();
    current_config = current_config.merge(cli_args_final);

    current_config
}
