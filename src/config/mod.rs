use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use platform_dirs::AppDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub(crate) mod duration;

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_user_agent() -> String {
    "curl/8.7.1".to_string()
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RegistryConfig {
    pub url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(with = "crate::config::duration", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(with = "crate::config::duration", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".to_string(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DashboardConfig {
    pub address: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrometheusConfig {
    pub address: String,
    pub port: u16,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 9080,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Configuration {
    pub registry: RegistryConfig,
    pub dashboard: DashboardConfig,
    pub prometheus: PrometheusConfig,
}

impl Configuration {
    pub fn figment(configs: Vec<PathBuf>) -> Figment {
        let fig = Figment::from(Serialized::defaults(Configuration::default()));

        let fig = match AppDirs::new(Some("regdash"), true) {
            Some(app_dirs) => {
                let config_path = app_dirs.config_dir.join("config.yaml");
                match config_path.exists() {
                    true => fig.admerge(Yaml::file(config_path)),
                    false => fig,
                }
            }
            None => fig,
        };

        let fig = configs
            .into_iter()
            .fold(fig, |fig, config_path| fig.admerge(Yaml::file(config_path)));

        fig.admerge(Env::prefixed("REGDASH_").split("__"))
            .admerge(
                Env::raw()
                    .only(&["REGISTRY_URL"])
                    .map(|_| "registry.url".into()),
            )
            .admerge(Env::raw().only(&["HOST"]).map(|_| "dashboard.address".into()))
            .admerge(Env::raw().only(&["PORT"]).map(|_| "dashboard.port".into()))
    }

    pub fn config(figment: Figment) -> Result<Configuration> {
        let mut config: Configuration =
            figment.extract().context("Failed to load configuration")?;

        let url = Url::parse(&config.registry.url)
            .with_context(|| format!("Invalid registry url: {}", config.registry.url))?;

        if !matches!(url.scheme(), "http" | "https") {
            bail!("Registry url must use http or https");
        }

        if url.host_str().is_none() {
            bail!("Registry url must contain a host");
        }

        config.registry.url = config.registry.url.trim_end_matches('/').to_string();

        Ok(config)
    }

    /// `host:port` of the registry, as shown on the dashboard.
    pub fn registry_name(&self) -> String {
        match Url::parse(&self.registry.url) {
            Ok(url) => format!(
                "{}:{}",
                url.host_str().unwrap_or_default(),
                url.port_or_known_default().unwrap_or_default()
            ),
            Err(_) => self.registry.url.clone(),
        }
    }
}
