//! Environment-driven configuration, read once at process start.

/// Azure Document Intelligence credentials.
#[derive(Clone)]
pub struct AzureConfig {
    /// Resource endpoint, e.g. `https://myresource.cognitiveservices.azure.com`.
    pub endpoint: String,
    pub key: String,
}

impl std::fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConfig")
            .field("endpoint", &self.endpoint)
            .field("key", &"***")
            .finish()
    }
}

/// Bucket settings for the object store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO etc.).
    pub endpoint_url: Option<String>,
}

/// Everything the service reads from the environment. Credentials for the
/// AWS SDK itself (access key, secret) stay in the environment where the
/// SDK's default provider chain picks them up.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub storage: Option<StorageConfig>,
    pub azure: Option<AzureConfig>,
    pub diffbot_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let port = var("DOCMILL_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        let storage = var("AWS_BUCKET_NAME").map(|bucket| StorageConfig {
            bucket,
            region: var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            endpoint_url: var("AWS_ENDPOINT_URL"),
        });

        let azure = match (
            var("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT"),
            var("AZURE_DOCUMENT_INTELLIGENCE_KEY"),
        ) {
            (Some(endpoint), Some(key)) => Some(AzureConfig { endpoint, key }),
            _ => None,
        };

        Self {
            port,
            storage,
            azure,
            diffbot_token: var("DIFFBOT_TOKEN"),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("storage", &self.storage)
            .field("azure", &self.azure)
            .field(
                "diffbot_token",
                &self.diffbot_token.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8000);
        assert!(config.storage.is_none());
        assert!(config.azure.is_none());
        assert!(config.diffbot_token.is_none());
    }

    #[test]
    fn storage_needs_only_a_bucket() {
        let config = config_from(&[("AWS_BUCKET_NAME", "docs")]);
        let storage = config.storage.unwrap();
        assert_eq!(storage.bucket, "docs");
        assert_eq!(storage.region, "us-east-1");
        assert!(storage.endpoint_url.is_none());
    }

    #[test]
    fn storage_honors_region_and_endpoint() {
        let config = config_from(&[
            ("AWS_BUCKET_NAME", "docs"),
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ENDPOINT_URL", "http://localhost:9000"),
        ]);
        let storage = config.storage.unwrap();
        assert_eq!(storage.region, "eu-west-1");
        assert_eq!(
            storage.endpoint_url.as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn azure_requires_both_endpoint_and_key() {
        let endpoint_only = config_from(&[(
            "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT",
            "https://x.cognitiveservices.azure.com",
        )]);
        assert!(endpoint_only.azure.is_none());

        let both = config_from(&[
            (
                "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT",
                "https://x.cognitiveservices.azure.com",
            ),
            ("AZURE_DOCUMENT_INTELLIGENCE_KEY", "secret"),
        ]);
        assert!(both.azure.is_some());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("DIFFBOT_TOKEN", "   "), ("DOCMILL_PORT", "")]);
        assert!(config.diffbot_token.is_none());
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn custom_port_parses() {
        let config = config_from(&[("DOCMILL_PORT", "9100")]);
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = config_from(&[
            ("DIFFBOT_TOKEN", "super-secret"),
            (
                "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT",
                "https://x.cognitiveservices.azure.com",
            ),
            ("AZURE_DOCUMENT_INTELLIGENCE_KEY", "also-secret"),
        ]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("also-secret"));
        assert!(rendered.contains("***"));
    }
}
