use crate::error::ConfigError;

/// Bucket every artifact is published to unless overridden
pub const DEFAULT_BUCKET: &str = "gtfs-fp";

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Clone)]
pub struct StorageConfig {
    /// Host (`minio.example.org`) or full URL; a bare host implies TLS
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::invalid("storage endpoint", "must not be empty"));
        }
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::invalid("bucket", "must not be empty"));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(ConfigError::invalid(
                "storage credentials",
                "access key and secret key are required",
            ));
        }
        Ok(())
    }

    /// Endpoint as a URL, defaulting to `https://` when no scheme is given
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        }
    }
}

// Hand-written so the secret never reaches the logs
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("path_style", &self.path_style)
            .finish()
    }
}
