//! Service configuration.
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables prefixed `HOTEL_INFERENCE__`, with `__` between
//!    nesting levels (`HOTEL_INFERENCE__ARTIFACT__BUCKET`)
//!
//! The plain credential variables `AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, `SESSION_TOKEN` and `REGION` fill any credential
//! the layers above left unset.

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactLocation, MaterializeOptions, DEFAULT_MODEL_FILE, EXTRACT_DIR};
use crate::encoding::EncodingPolicy;

/// Prefix of the environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "HOTEL_INFERENCE";

pub const DEFAULT_BUCKET: &str = "sprint4-5";
pub const DEFAULT_KEY: &str =
    "modelos/hotel_reservation/XGBoost/output/sagemaker-xgboost-2024-09-16-00-18-36-300/output/model.tar.gz";
pub const DEFAULT_PORT: u16 = 8000;

const LEGACY_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const LEGACY_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const LEGACY_SESSION_TOKEN: &str = "SESSION_TOKEN";
const LEGACY_REGION: &str = "REGION";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where the model bundle is read from.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    /// S3 object storage.
    #[default]
    S3,
    /// A local directory laid out as `<local_root>/<bucket>/<key>`.
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactSettings {
    pub source: ArtifactSource,
    pub bucket: String,
    pub key: String,
    /// Root directory for [`ArtifactSource::Local`].
    pub local_root: PathBuf,
    /// Parent of the `download` and `model` directories.
    pub staging_dir: PathBuf,
    pub model_file_name: String,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            source: ArtifactSource::default(),
            bucket: DEFAULT_BUCKET.to_owned(),
            key: DEFAULT_KEY.to_owned(),
            local_root: PathBuf::from("./artifacts"),
            staging_dir: PathBuf::from("./model-staging"),
            model_file_name: DEFAULT_MODEL_FILE.to_owned(),
        }
    }
}

impl ArtifactSettings {
    pub fn location(&self) -> ArtifactLocation {
        ArtifactLocation::new(&self.bucket, &self.key)
    }

    /// The bundle is unpacked into `<staging_dir>/model`.
    pub fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions::new(self.staging_dir.join(EXTRACT_DIR)).with_model_file_name(&self.model_file_name)
    }
}

/// Object storage credentials. Unset fields defer to the AWS SDK's own
/// provider chain.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AwsCredentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .field("region", &self.region)
            .finish()
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub artifact: ArtifactSettings,
    pub aws: AwsCredentials,
    pub encoding: EncodingPolicy,
}

impl Settings {
    /// Load from `file` (if given) and the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(file, std::env::vars().collect())
    }

    /// Load from `file` (if given) and an explicit set of variables.
    pub fn load_from(file: Option<&Path>, vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .source(Some(vars.clone())),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.aws.fill_from_legacy(&vars);
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.port() == 0 {
            return Err(ConfigError::Invalid("server.bind must have a non-zero port".into()));
        }
        if self.artifact.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("artifact.bucket must not be empty".into()));
        }
        if self.artifact.key.trim().is_empty() {
            return Err(ConfigError::Invalid("artifact.key must not be empty".into()));
        }
        if self.artifact.model_file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("artifact.model_file_name must not be empty".into()));
        }
        Ok(())
    }
}

impl AwsCredentials {
    fn fill_from_legacy(&mut self, vars: &HashMap<String, String>) {
        let get = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        self.access_key_id = self.access_key_id.take().or_else(|| get(LEGACY_ACCESS_KEY_ID));
        self.secret_access_key = self.secret_access_key.take().or_else(|| get(LEGACY_SECRET_ACCESS_KEY));
        self.session_token = self.session_token.take().or_else(|| get(LEGACY_SESSION_TOKEN));
        self.region = self.region.take().or_else(|| get(LEGACY_REGION));
    }
}
