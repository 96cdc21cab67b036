use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;

pub const TOKEN_KEY: &str = "META_TOKEN";
pub const PAGE_ID_KEY: &str = "META_PAGE_ID";
pub const API_VERSION_KEY: &str = "META_API_VERSION";
pub const GRAPH_URL_KEY: &str = "META_GRAPH_URL";

pub const ENV_FILE_NAME: &str = ".env";
pub const DEFAULT_LIMIT: u32 = 25;
pub const DEFAULT_RESULTS_DIR: &str = "results";

pub type EnvVars = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Per-post and campaign views together
    #[default]
    All,
    /// Per-post engagement, keyed by platform
    #[value(name = "social_media")]
    SocialMedia,
    /// One aggregate campaign per platform
    Campaigns,
    /// Write a CSV file under the results directory
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub access_token: String,
    pub page_id: String,
    pub limit: u32,
    pub output: OutputMode,
    pub format: OutputFormat,
    pub api_version: String,
    pub api_base: String,
    pub out_prefix: Option<String>,
    pub instagram_only: bool,
    pub results_dir: PathBuf,
    pub concurrency: usize,
}

/// Parse `.env` text into a map. Each line is split at its first `=`; blank
/// lines, `#` comments and lines without `=` or with an empty key are skipped.
/// Values are taken literally apart from trimming and stripping surrounding
/// quotes. The first occurrence of a key wins.
pub fn parse_env_file(text: &str) -> EnvVars {
    let mut vars = EnvVars::new();
    for (key, value) in text.lines().filter_map(parse_env_line) {
        vars.entry(key).or_insert(value);
    }
    vars
}

fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
    Some((key.to_string(), value.to_string()))
}

/// Directories searched for `.env`, in order: next to the executable, then
/// the working directory.
pub fn default_env_dirs() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();
    exe_dir.into_iter().chain(cwd).collect()
}

/// First `.env` that exists in `dirs`.
pub fn find_env_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(ENV_FILE_NAME))
        .find(|path| path.is_file())
}

pub fn load_env_file(path: &Path) -> Result<EnvVars> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read env file {}", path.display()))?;
    Ok(parse_env_file(&text))
}

/// Load the explicit env file if given, otherwise the first one found in the
/// default search directories. No file is not an error.
pub fn discover_env_vars(explicit: Option<&Path>) -> Result<EnvVars> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_env_file(&default_env_dirs()),
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading env file");
            load_env_file(&path)
        }
        None => Ok(EnvVars::new()),
    }
}

pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// CLI value, then process environment, then env file. An explicit CLI value
/// is taken as given, even when empty; empty env values count as unset.
pub fn resolve_setting<F>(cli: Option<String>, key: &str, process_env: F, file: &EnvVars) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    cli.or_else(|| process_env(key).filter(|v| !v.is_empty()))
        .or_else(|| file.get(key).filter(|v| !v.is_empty()).cloned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub page_id: String,
}

impl Credentials {
    pub fn resolve<F>(
        token: Option<String>,
        page_id: Option<String>,
        process_env: F,
        file: &EnvVars,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String> + Copy,
    {
        let token = resolve_setting(token, TOKEN_KEY, process_env, file).filter(|v| !v.is_empty());
        let page_id = resolve_setting(page_id, PAGE_ID_KEY, process_env, file).filter(|v| !v.is_empty());

        match (token, page_id) {
            (Some(access_token), Some(page_id)) => Ok(Self {
                access_token,
                page_id,
            }),
            _ => bail!(
                "--token and --page-id are required (or set {TOKEN_KEY} and {PAGE_ID_KEY} in {ENV_FILE_NAME})."
            ),
        }
    }
}
