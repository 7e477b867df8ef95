pub(crate) use crate::config::token::TokenConfig;
use confique::Config;

pub mod token;

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_FILE_ENV: &str = "UAA_CONFIG_FILE";

/// Main configuration structure for the UAA server
#[derive(Debug, Config, Clone)]
pub struct Settings {
    /// The port the server will listen to (default: 8080)
    #[config(env = "UAA_PORT", default = 8080)]
    pub port: u16,

    /// Externally visible base URL, used for the token issuer and the login
    /// redirect (default: http://localhost:8080)
    #[config(env = "UAA_PUBLIC_URL", default = "http://localhost:8080")]
    pub public_url: String,

    /// Token issuance configuration
    #[config(nested)]
    pub token: TokenConfig,
}

impl Settings {
    /// Loads settings from `UAA_*` environment variables, falling back to the
    /// TOML file named by `UAA_CONFIG_FILE` and then to the defaults
    pub fn new() -> Result<Self, confique::Error> {
        let mut builder = Settings::builder().env();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.file(path);
        }
        builder.load()
    }

    /// Issuer claim stamped on every token
    pub fn issuer(&self) -> String {
        format!("{}/oauth/token", self.public_url.trim_end_matches('/'))
    }

    /// Where failed authorize requests are sent
    pub fn login_url(&self) -> String {
        format!("{}/login", self.public_url.trim_end_matches('/'))
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            public_url: "http://localhost:8080".to_string(),
            token: TokenConfig::for_testing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_env() {
        std::env::set_var("UAA_PORT", "9090");
        std::env::set_var("UAA_TOKEN_VERIFY_CLIENT_SECRET", "true");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.port, 9090);
        assert!(settings.token.verify_client_secret);
        assert_eq!(settings.token.key_id, "legacy-token-key");
        assert_eq!(settings.token.access_token_validity, 43200);
        assert!(settings.token.signing_key_path.is_none());

        std::env::remove_var("UAA_PORT");
        std::env::remove_var("UAA_TOKEN_VERIFY_CLIENT_SECRET");
    }

    #[test]
    fn test_toml_file() {
        let path = std::env::temp_dir().join(format!("uaa-settings-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            r#"
public_url = "https://uaa.example.com/"

[token]
key_id = "key-2"
default_scopes = "openid"
"#,
        )
        .unwrap();

        let settings = Settings::builder().file(&path).load().unwrap();
        assert_eq!(settings.token.key_id, "key-2");
        assert_eq!(settings.token.get_default_scopes(), vec!["openid"]);
        assert_eq!(settings.issuer(), "https://uaa.example.com/oauth/token");
        assert_eq!(settings.login_url(), "https://uaa.example.com/login");

        std::fs::remove_file(&path).unwrap();
    }
}
