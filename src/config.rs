use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Account environment. Demo and live accounts use separate credentials,
/// separate config files, and separate API hosts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Demo,
    Live,
}

impl Environment {
    /// Oanda hosts the demo ("practice") and live APIs on different domains.
    /// The base URL is derived from the environment alone, so credentials
    /// loaded for one environment can never be sent to the other's host.
    pub fn api_base(&self) -> &'static str {
        match self {
            Environment::Demo => "https://api-fxpractice.oanda.com",
            Environment::Live => "https://api-fxtrade.oanda.com",
        }
    }

    /// Name of the credentials file for this environment.
    pub fn config_file(&self) -> &'static str {
        match self {
            Environment::Demo => "config.demo.json",
            Environment::Live => "config.live.json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Demo => "demo",
            Environment::Live => "live",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API credentials for one account environment, persisted as plaintext JSON.
/// Created on first submission from the UI, overwritten on each edit, read
/// on every fetch.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Credentials {
    pub account_id: String,
    pub access_token: String,
    pub environment: Environment,
}

fn config_path(dir: &Path, env: Environment) -> PathBuf {
    dir.join(env.config_file())
}

/// Load the credentials for an environment.
///
/// Missing file, unreadable file, malformed JSON, blank fields, and a file
/// whose environment tag does not match the file it was read from are all
/// distinct errors so the UI can tell the user what to fix.
pub fn load(dir: &Path, env: Environment) -> Result<Credentials, String> {
    let path = config_path(dir, env);
    if !path.exists() {
        return Err(format!(
            "No credentials saved for the {} account. Open Setup and save them first.",
            env
        ));
    }

    let contents = std::fs::read_to_string(&path)
        .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;

    let creds: Credentials = serde_json::from_str(&contents)
        .map_err(|e| format!("Credentials file {} is malformed: {}", path.display(), e))?;

    if creds.account_id.trim().is_empty() || creds.access_token.trim().is_empty() {
        return Err(format!(
            "Credentials file {} is missing the account id or access token.",
            path.display()
        ));
    }

    // A demo token must never reach the live host, so refuse a file whose
    // tag disagrees with the environment it was loaded for.
    if creds.environment != env {
        return Err(format!(
            "Credentials file {} is tagged for the {} environment, expected {}.",
            path.display(),
            creds.environment,
            env
        ));
    }

    Ok(creds)
}

/// Save credentials to the file named by their environment, overwriting any
/// previous contents.
pub fn save(dir: &Path, creds: &Credentials) -> Result<(), String> {
    if creds.account_id.trim().is_empty() || creds.access_token.trim().is_empty() {
        return Err("Please fill in both the account id and the access token.".to_string());
    }

    let path = config_path(dir, creds.environment);
    let contents = serde_json::to_string_pretty(creds)
        .map_err(|e| format!("Could not serialize credentials: {}", e))?;

    std::fs::write(&path, contents)
        .map_err(|e| format!("Could not write {}: {}", path.display(), e))
}

/// Non-failing variant of [`load`] used by the setup page to decide whether
/// to show the form or the saved state. Any problem reads as "not saved".
pub fn peek(dir: &Path, env: Environment) -> Option<Credentials> {
    load(dir, env).ok()
}
