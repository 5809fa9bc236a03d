use core_config::{
    app_info, env_or_default, server::ServerConfig, AppInfo, ConfigError, FromEnv,
};
use database::postgres::PostgresConfig;
use domain_images::ClipConfig;
use std::path::PathBuf;
use std::str::FromStr;
use strum::{Display, EnumString};

pub use core_config::Environment;

/// Which `BlobStore` implementation backs uploads
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BlobProvider {
    Local,
    Memory,
}

#[derive(Clone, Debug)]
pub struct BlobConfig {
    pub provider: BlobProvider,
    /// Root directory of the local provider
    pub root_dir: PathBuf,
    /// Origin used when formatting download URLs
    pub public_base_url: String,
}

impl FromEnv for BlobConfig {
    /// - BLOB_PROVIDER: `local` (default) or `memory`
    /// - BLOB_ROOT_DIR: defaults to ./data/blobs
    /// - PUBLIC_BASE_URL: defaults to http://localhost:8080
    fn from_env() -> Result<Self, ConfigError> {
        let raw = env_or_default("BLOB_PROVIDER", "local");
        let provider = BlobProvider::from_str(raw.trim()).map_err(|_| ConfigError::ParseError {
            key: "BLOB_PROVIDER".to_string(),
            details: format!("unknown provider '{}', expected 'local' or 'memory'", raw),
        })?;

        Ok(Self {
            provider,
            root_dir: PathBuf::from(env_or_default("BLOB_ROOT_DIR", "./data/blobs")),
            public_base_url: env_or_default("PUBLIC_BASE_URL", "http://localhost:8080"),
        })
    }
}

/// Application configuration composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    pub clip: ClipConfig,
    pub blobs: BlobConfig,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            database: PostgresConfig::from_env()?,
            clip: ClipConfig::from_env()?,
            blobs: BlobConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/images")),
                ("CLIP_GRPC_ADDR", Some("http://clip:50051")),
                ("BLOB_PROVIDER", None),
                ("BLOB_ROOT_DIR", None),
                ("PUBLIC_BASE_URL", None),
                ("MAX_UPLOAD_BYTES", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.app.name, "zerg_image_search");
                assert_eq!(config.blobs.provider, BlobProvider::Local);
                assert_eq!(config.blobs.root_dir, PathBuf::from("./data/blobs"));
                assert_eq!(config.blobs.public_base_url, "http://localhost:8080");
                assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
                assert_eq!(config.clip.address, "http://clip:50051");
            },
        );
    }

    #[test]
    fn test_config_requires_clip_address() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/images")),
                ("CLIP_GRPC_ADDR", None),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("CLIP_GRPC_ADDR"));
            },
        );
    }

    #[test]
    fn test_blob_provider_parsing() {
        temp_env::with_var("BLOB_PROVIDER", Some("Memory"), || {
            assert_eq!(BlobConfig::from_env().unwrap().provider, BlobProvider::Memory);
        });

        temp_env::with_var("BLOB_PROVIDER", Some("s3"), || {
            let err = BlobConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("BLOB_PROVIDER"));
        });
    }
}
