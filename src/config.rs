//! read configuration from a file, the environment, or a managed secret

use aws_config::BehaviorVersion;

use crate::errors::Error;

pub enum ConfigLocation {
    File(String),
    Env,
    Secret,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    pub base_url: String,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u8>,
}

impl Config {
    pub fn from_values(
        base_url: &str,
        user_agent: Option<String>,
        timeout_secs: Option<u64>,
        max_attempts: Option<u8>,
    ) -> Self {
        Config {
            base_url: base_url.to_string(),
            user_agent,
            timeout_secs,
            max_attempts,
        }
    }

    pub async fn load(loc: ConfigLocation) -> Result<Config, Error> {
        let config = match loc {
            ConfigLocation::File(path) => {
                let contents = std::fs::read_to_string(path)?;
                serde_json::from_str(&contents)?
            }
            ConfigLocation::Env => Self::from_env()?,
            ConfigLocation::Secret => Self::from_secret().await?,
        };
        Ok(config)
    }

    fn from_env() -> Result<Config, Error> {
        Ok(Config {
            base_url: std::env::var("MARKETPLACE_URL")
                .map_err(|_| Error::Config("Missing MARKETPLACE_URL env var".to_string()))?,
            user_agent: std::env::var("MARKETPLACE_USER_AGENT").ok(),
            timeout_secs: optional_env_u64("MARKETPLACE_TIMEOUT_SECS")?,
            max_attempts: optional_env_u64("MARKETPLACE_MAX_ATTEMPTS")?.map(|n| n as u8),
        })
    }

    async fn from_secret() -> Result<Config, Error> {
        let secret_arn = std::env::var("MARKETPLACE_CONFIG_SECRET_ARN").map_err(|_| {
            Error::Config("Missing MARKETPLACE_CONFIG_SECRET_ARN env var".to_string())
        })?;
        let client = aws_sdk_secretsmanager::Client::new(
            &aws_config::load_defaults(BehaviorVersion::latest()).await,
        );
        let resp = client
            .get_secret_value()
            .secret_id(secret_arn)
            .send()
            .await
            .map_err(|e| Error::Config(format!("Failed to get secret: {}", e)))?;
        let secret = match resp.secret_string() {
            Some(s) => Ok(s),
            None => Err(Error::Config(
                "Failed to get secret string, returned None".to_string(),
            )),
        }?;
        let config: Config = serde_json::from_str(secret)?;
        Ok(config)
    }
}

fn optional_env_u64(name: &str) -> Result<Option<u64>, Error> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be an integer, got '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
