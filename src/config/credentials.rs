//! Build-service credential resolution
//!
//! Credentials come from an explicit ordered chain of providers instead of
//! implicit global lookups: environment variables first, then an osc-style
//! INI file with the section keyed by API URL. Username and password
//! resolve independently, so one may come from the environment and the
//! other from the file.

use crate::{BundlewatchError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// HTTP Basic auth credentials for the build-service API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObsCredentials {
    pub username: String,
    pub password: String,
}

/// One source of credentials in the chain
#[derive(Debug, Clone)]
pub enum CredentialProvider {
    /// Read username/password from the named environment variables
    EnvVars {
        username_var: String,
        password_var: String,
    },

    /// Read from an osc-style INI file. With no explicit path, the
    /// standard locations are searched: $OSC_CONFIG, ~/.oscrc,
    /// $XDG_CONFIG_HOME/osc/oscrc.
    OscRc { path: Option<PathBuf> },
}

impl CredentialProvider {
    fn lookup(&self, api_url: &str, key: OscKey) -> Option<String> {
        match self {
            CredentialProvider::EnvVars {
                username_var,
                password_var,
            } => {
                let var = match key {
                    OscKey::User => username_var,
                    OscKey::Pass => password_var,
                };
                std::env::var(var).ok().filter(|v| !v.is_empty())
            }
            CredentialProvider::OscRc { path } => {
                let file = match path {
                    Some(p) => p.clone(),
                    None => find_oscrc()?,
                };
                let content = std::fs::read_to_string(file).ok()?;
                let sections = parse_ini(&content);
                sections
                    .get(api_url)
                    .and_then(|section| section.get(key.as_str()))
                    .cloned()
            }
        }
    }
}

/// Ordered list of credential providers, tried first to last
#[derive(Debug, Clone)]
pub struct CredentialChain {
    providers: Vec<CredentialProvider>,
}

#[derive(Debug, Clone, Copy)]
enum OscKey {
    User,
    Pass,
}

impl OscKey {
    fn as_str(self) -> &'static str {
        match self {
            OscKey::User => "user",
            OscKey::Pass => "pass",
        }
    }
}

impl CredentialChain {
    pub fn new(providers: Vec<CredentialProvider>) -> Self {
        Self { providers }
    }

    /// The default chain: OBSUSER/OBSPASSWD, then the standard oscrc
    /// locations
    pub fn default_chain() -> Self {
        Self::new(vec![
            CredentialProvider::EnvVars {
                username_var: "OBSUSER".to_string(),
                password_var: "OBSPASSWD".to_string(),
            },
            CredentialProvider::OscRc { path: None },
        ])
    }

    /// Resolve credentials for an API server.
    ///
    /// # Errors
    /// Returns `Credentials` if no provider yields a username or no
    /// provider yields a password.
    pub fn resolve(&self, api_url: &str) -> Result<ObsCredentials> {
        let username = self.first_match(api_url, OscKey::User).ok_or_else(|| {
            BundlewatchError::Credentials(format!(
                "no username for {} (set OBSUSER or add a [{}] section to an oscrc)",
                api_url, api_url
            ))
        })?;
        let password = self.first_match(api_url, OscKey::Pass).ok_or_else(|| {
            BundlewatchError::Credentials(format!(
                "no password for {} (set OBSPASSWD or add a [{}] section to an oscrc)",
                api_url, api_url
            ))
        })?;

        Ok(ObsCredentials { username, password })
    }

    fn first_match(&self, api_url: &str, key: OscKey) -> Option<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.lookup(api_url, key))
    }
}

/// Locate an oscrc file in the standard places.
///
/// Reading from an oscrc only works when the password is stored in clear
/// text; environment variables are the recommended source.
fn find_oscrc() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("OSC_CONFIG") {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let p = home.join(".oscrc");
        if p.exists() {
            return Some(p);
        }
    }

    let config_home = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")));
    if let Some(base) = config_home {
        let p = base.join("osc").join("oscrc");
        if p.exists() {
            return Some(p);
        }
    }

    None
}

/// Minimal INI parser for osc config files: `[section]` headers and
/// `key=value` lines. Comment lines start with `#` or `;`. No escaping or
/// line continuations; osc does not use them.
fn parse_ini(content: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = Some(name.trim().to_string());
            sections.entry(name.trim().to_string()).or_default();
            continue;
        }

        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const EXAMPLE_OSCRC: &str = "\
[general]
[https://api.opensuse.org]
user=myusername
pass=mypassword
";

    fn write_oscrc(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".oscrc");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_ini_sections() {
        let sections = parse_ini(EXAMPLE_OSCRC);
        let api = &sections["https://api.opensuse.org"];
        assert_eq!(api["user"], "myusername");
        assert_eq!(api["pass"], "mypassword");
        assert!(sections.contains_key("general"));
    }

    #[test]
    fn test_parse_ini_ignores_comments_and_whitespace() {
        let sections = parse_ini("# comment\n[s]\n  key = spaced value \n; other\n");
        assert_eq!(sections["s"]["key"], "spaced value");
    }

    #[test]
    fn test_oscrc_provider_resolves_both_keys() {
        let (_dir, path) = write_oscrc(EXAMPLE_OSCRC);
        let chain = CredentialChain::new(vec![CredentialProvider::OscRc { path: Some(path) }]);

        let creds = chain.resolve("https://api.opensuse.org").unwrap();
        assert_eq!(creds.username, "myusername");
        assert_eq!(creds.password, "mypassword");
    }

    #[test]
    fn test_oscrc_missing_password_is_an_error() {
        let (_dir, path) = write_oscrc(
            "\
[general]
[https://api.opensuse.org]
user=myusername
",
        );
        let chain = CredentialChain::new(vec![CredentialProvider::OscRc { path: Some(path) }]);

        let err = chain.resolve("https://api.opensuse.org").unwrap_err();
        assert!(matches!(err, BundlewatchError::Credentials(_)));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_env_provider_takes_precedence() {
        // Distinct variable names per test keep parallel test runs from
        // interfering with each other.
        std::env::set_var("BW_TEST_USER_A", "envuser");
        std::env::set_var("BW_TEST_PASS_A", "envpass");
        let (_dir, path) = write_oscrc(EXAMPLE_OSCRC);

        let chain = CredentialChain::new(vec![
            CredentialProvider::EnvVars {
                username_var: "BW_TEST_USER_A".to_string(),
                password_var: "BW_TEST_PASS_A".to_string(),
            },
            CredentialProvider::OscRc { path: Some(path) },
        ]);

        let creds = chain.resolve("https://api.opensuse.org").unwrap();
        assert_eq!(creds.username, "envuser");
        assert_eq!(creds.password, "envpass");
    }

    #[test]
    fn test_username_and_password_resolve_independently() {
        // Username from the environment, password from the file.
        std::env::set_var("BW_TEST_USER_B", "envuser");
        let (_dir, path) = write_oscrc(EXAMPLE_OSCRC);

        let chain = CredentialChain::new(vec![
            CredentialProvider::EnvVars {
                username_var: "BW_TEST_USER_B".to_string(),
                password_var: "BW_TEST_PASS_B_UNSET".to_string(),
            },
            CredentialProvider::OscRc { path: Some(path) },
        ]);

        let creds = chain.resolve("https://api.opensuse.org").unwrap();
        assert_eq!(creds.username, "envuser");
        assert_eq!(creds.password, "mypassword");
    }

    #[test]
    fn test_no_provider_matches() {
        let chain = CredentialChain::new(vec![CredentialProvider::OscRc {
            path: Some(PathBuf::from("/nonexistent/oscrc")),
        }]);
        assert!(chain.resolve("https://api.opensuse.org").is_err());
    }
}
