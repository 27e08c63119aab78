use std::path::Path;

use serde::Deserialize;

use crate::proxy_config::{ProxyConfig, ProxyMode, SessionType};
use crate::ConfigError;

/// Top-level shape of the YAML config file. Only the `proxy:` block is read.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    proxy: Option<ProxyFileSection>,
}

/// The `proxy:` block of the YAML config file.
///
/// ```yaml
/// proxy:
///   mode: residential
///   username: acme
///   password: secret
///   country_code: us
///   city: seattle
///   timeout: 60
///   max_retries: 3
///   retry_delay: 2.0
///   residential:
///     endpoint: pr.oxylabs.io:7777
///     session_type: sticky
///   web_scraper_api:
///     render_js: true
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyFileSection {
    pub mode: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub country_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<f64>,
    pub min_delay: Option<f64>,
    pub max_delay: Option<f64>,
    pub residential: Option<ResidentialSection>,
    pub web_scraper_api: Option<ScraperApiSection>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ResidentialSection {
    pub endpoint: Option<String>,
    pub session_type: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperApiSection {
    pub endpoint: Option<String>,
    pub render_js: Option<bool>,
    pub parse: Option<bool>,
}

/// Load the proxy configuration: defaults, then the optional YAML file, then
/// environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed, or an env var
/// holds an invalid value.
pub fn load_proxy_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_proxy_config_from_env(path)
}

/// Like [`load_proxy_config`], without loading `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed, or an env var
/// holds an invalid value.
pub fn load_proxy_config_from_env(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let file = path.map(read_proxy_file).transpose()?;
    build_proxy_config(file.as_ref(), |key| std::env::var(key))
}

/// Read and parse the `proxy:` block of a YAML config file.
///
/// A file without a `proxy:` block yields an empty section.
///
/// # Errors
///
/// Returns [`ConfigError::ConfigFileIo`] or [`ConfigError::ConfigFileParse`].
pub fn read_proxy_file(path: &Path) -> Result<ProxyFileSection, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_proxy_yaml(&content)
}

/// Parse the `proxy:` block out of YAML text.
///
/// # Errors
///
/// Returns [`ConfigError::ConfigFileParse`] on malformed YAML.
pub fn parse_proxy_yaml(content: &str) -> Result<ProxyFileSection, ConfigError> {
    if content.trim().is_empty() {
        return Ok(ProxyFileSection::default());
    }
    let file: ConfigFile = serde_yaml::from_str(content)?;
    Ok(file.proxy.unwrap_or_default())
}

/// Merge defaults, the file section and env lookups into a validated config.
///
/// The env lookup is injected so tests can pass a plain map instead of
/// mutating the process environment.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for unparseable numeric env values
/// and [`ConfigError::Validation`] for out-of-range settings.
pub fn build_proxy_config<F>(
    file: Option<&ProxyFileSection>,
    lookup: F,
) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let mut config = ProxyConfig::default();
    if let Some(section) = file {
        apply_file_section(&mut config, section);
    }
    apply_env(&mut config, &lookup)?;
    config.check_ranges()?;
    Ok(config.validated())
}

fn apply_file_section(config: &mut ProxyConfig, section: &ProxyFileSection) {
    if let Some(mode) = &section.mode {
        config.mode = ProxyMode::parse_or_direct(mode);
    }
    if let Some(v) = &section.username {
        config.username.clone_from(v);
    }
    if let Some(v) = &section.password {
        config.password.clone_from(v);
    }
    if let Some(v) = &section.country_code {
        config.country_code.clone_from(v);
    }
    if let Some(v) = &section.city {
        config.city.clone_from(v);
    }
    if let Some(v) = &section.state {
        config.state.clone_from(v);
    }
    if let Some(v) = section.timeout {
        config.timeout_secs = v;
    }
    if let Some(v) = section.max_retries {
        config.max_retries = v;
    }
    if let Some(v) = section.retry_delay {
        config.retry_delay_secs = v;
    }
    if let Some(v) = section.min_delay {
        config.min_delay_secs = v;
    }
    if let Some(v) = section.max_delay {
        config.max_delay_secs = v;
    }

    if let Some(residential) = &section.residential {
        if let Some(v) = &residential.endpoint {
            config.residential_endpoint.clone_from(v);
        }
        if let Some(v) = &residential.session_type {
            config.session_type = SessionType::parse(v);
        }
        if let Some(v) = &residential.session_id {
            config.session_id.clone_from(v);
        }
    }

    if let Some(api) = &section.web_scraper_api {
        if let Some(v) = &api.endpoint {
            config.scraper_api_endpoint.clone_from(v);
        }
        if let Some(v) = api.render_js {
            config.render_js = v;
        }
        if let Some(v) = api.parse {
            config.parse = v;
        }
    }
}

fn apply_env<F>(config: &mut ProxyConfig, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let parse_u64 = |var: &str, raw: &str| -> Result<u64, ConfigError> {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, raw: &str| -> Result<u32, ConfigError> {
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    if let Ok(mode) = lookup("PROXY_MODE") {
        config.mode = ProxyMode::parse_or_direct(&mode);
    }
    if let Ok(v) = lookup("OXYLABS_USERNAME") {
        config.username = v;
    }
    if let Ok(v) = lookup("OXYLABS_PASSWORD") {
        config.password = v;
    }
    if let Ok(v) = lookup("OXYLABS_COUNTRY") {
        config.country_code = v;
    }
    if let Ok(v) = lookup("OXYLABS_CITY") {
        config.city = v;
    }
    if let Ok(v) = lookup("OXYLABS_STATE") {
        config.state = v;
    }
    if let Ok(v) = lookup("OXYLABS_RENDER_JS") {
        config.render_js = v.trim().eq_ignore_ascii_case("true");
    }
    if let Ok(v) = lookup("OXYLABS_TIMEOUT") {
        config.timeout_secs = parse_u64("OXYLABS_TIMEOUT", &v)?;
    }
    if let Ok(v) = lookup("OXYLABS_MAX_RETRIES") {
        config.max_retries = parse_u32("OXYLABS_MAX_RETRIES", &v)?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
