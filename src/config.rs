// ⚙️ Configuration
//
// Local runs read a JSON file; the event server reads the same fields from
// the environment. Missing fields fall back to zero values, unknown fields are
// ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::email::Logo;

/// SMTP port used when SMTP_PORT is unset or unparseable in the environment
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_pass: String,
    pub from_email: String,
    /// Display name on the From header
    pub account_name: String,
    /// Used when the account has no email on file
    pub recipient_email: String,
    /// URL (http/https) or path to a local image
    pub logo_value: String,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_json(&data)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Read config from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read config through an arbitrary key lookup (environment, test map, ...)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();

        Config {
            smtp_host: get("SMTP_HOST"),
            smtp_port: lookup("SMTP_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: get("SMTP_USER"),
            smtp_pass: get("SMTP_PASS"),
            from_email: get("FROM_EMAIL"),
            account_name: get("ACCOUNT_NAME"),
            recipient_email: get("RECIPIENT_EMAIL"),
            logo_value: get("LOGO_VALUE"),
        }
    }

    /// Logo to embed: configured value first, otherwise `fallback_path` if that file exists
    pub fn logo(&self, fallback_path: Option<&Path>) -> Option<Logo> {
        let value = self.logo_value.trim();
        if !value.is_empty() {
            return Some(Logo::from_value(value));
        }

        fallback_path
            .filter(|p| p.is_file())
            .map(|p| Logo::File(p.to_path_buf()))
    }

    /// Fallback recipient, if one is configured
    pub fn fallback_recipient(&self) -> Option<&str> {
        let recipient = self.recipient_email.trim();
        (!recipient.is_empty()).then_some(recipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_json_full() {
        let cfg = Config::from_json(
            r#"{
                "smtp_host": "smtp.example.com",
                "smtp_port": 2525,
                "smtp_user": "user",
                "smtp_pass": "secret",
                "from_email": "reports@example.com",
                "account_name": "Stori",
                "recipient_email": "fallback@example.com",
                "logo_value": "https://example.com/logo.png"
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.smtp_host, "smtp.example.com");
        assert_eq!(cfg.smtp_port, 2525);
        assert_eq!(cfg.from_email, "reports@example.com");
        assert_eq!(cfg.fallback_recipient(), Some("fallback@example.com"));
    }

    #[test]
    fn test_missing_fields_default_and_unknown_ignored() {
        let cfg = Config::from_json(r#"{"smtp_host": "localhost", "logo_type": "url"}"#).unwrap();

        assert_eq!(cfg.smtp_host, "localhost");
        assert_eq!(cfg.smtp_port, 0);
        assert_eq!(cfg.smtp_user, "");
        assert_eq!(cfg.fallback_recipient(), None);
    }

    #[test]
    fn test_from_file_errors_name_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));

        let err = Config::from_file(Path::new("/no/such/config.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/no/such/config.json"));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USER", "user"),
            ("ACCOUNT_NAME", "Stori"),
        ]
        .into_iter()
        .collect();

        let cfg = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.smtp_host, "smtp.example.com");
        assert_eq!(cfg.smtp_port, DEFAULT_SMTP_PORT);
        assert_eq!(cfg.account_name, "Stori");
        assert_eq!(cfg.smtp_pass, "");
    }

    #[test]
    fn test_from_lookup_bad_port_uses_default() {
        let cfg = Config::from_lookup(|k| (k == "SMTP_PORT").then(|| "abc".to_string()));
        assert_eq!(cfg.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn test_logo_resolution() {
        let mut cfg = Config::default();
        let logo_file = NamedTempFile::new().unwrap();

        assert_eq!(cfg.logo(None), None);
        assert_eq!(cfg.logo(Some(Path::new("/no/such/logo.png"))), None);
        assert_eq!(
            cfg.logo(Some(logo_file.path())),
            Some(Logo::File(logo_file.path().to_path_buf()))
        );

        cfg.logo_value = "https://example.com/logo.png".to_string();
        assert_eq!(
            cfg.logo(Some(logo_file.path())),
            Some(Logo::Url("https://example.com/logo.png".to_string()))
        );
    }
}
