use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::{collections::BTreeMap, env, fs::File, path::PathBuf};

/// Environment variable that takes priority over the configured session token
pub const SESSION_TOKEN_ENV: &str = "PARTUP_SESSION_TOKEN";

#[derive(Debug, Deserialize, Eq, PartialEq)]
pub struct Config {
    pub hosts: BTreeMap<String, Host>,
}

#[derive(Debug, Deserialize, Eq, PartialEq)]
pub struct Host {
    pub endpoint: String,
    pub session_token: Option<String>,
}

impl Config {
    /// # Errors
    /// Will return an error if the file can not be read or parsed
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let file = File::open(config_path)?;

        let config: Self =
            serde_yaml_ng::from_reader(file).context("unable to parse config file")?;

        Ok(config)
    }

    /// Get the host from the config.yml
    ///
    /// # Errors
    /// Will return an error if the host is not defined
    pub fn get_host(&self, name: &str) -> Result<&Host> {
        self.hosts
            .get(name)
            .with_context(|| format!("could not find host {name}"))
    }
}

impl Host {
    /// Session token sent when finalizing, the environment wins over the file
    #[must_use]
    pub fn get_session_token(&self) -> Option<SecretString> {
        env::var(SESSION_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .or_else(|| self.session_token.clone())
            .filter(|token| !token.is_empty())
            .map(|token| SecretString::new(token.into()))
    }
}
