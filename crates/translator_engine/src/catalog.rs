use serde::Deserialize;
use translator_core::{ProviderCatalog, ProviderOption};
use translator_logging::engine_info;

use crate::http::{build_client, describe_reqwest_error, error_parts};
use crate::{CatalogError, TransportSettings};

#[derive(Debug, Deserialize)]
struct ProvidersResponse {
    providers: Vec<WireProvider>,
}

#[derive(Debug, Deserialize)]
struct WireProvider {
    name: String,
    #[serde(default)]
    models: Vec<String>,
}

#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> Result<ProviderCatalog, CatalogError>;
}

/// Read-only `GET /providers`.
#[derive(Debug, Clone)]
pub struct ReqwestCatalogSource {
    settings: TransportSettings,
}

impl ReqwestCatalogSource {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl CatalogSource for ReqwestCatalogSource {
    async fn fetch(&self) -> Result<ProviderCatalog, CatalogError> {
        let client = build_client(&self.settings, true)
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        let response = client
            .get(self.settings.endpoint(&["providers"]))
            .send()
            .await
            .map_err(|err| CatalogError::Network(describe_reqwest_error(&err)))?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(CatalogError::Server { status, message });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| CatalogError::Network(describe_reqwest_error(&err)))?;
        let parsed: ProvidersResponse = serde_json::from_slice(&body)
            .map_err(|err| CatalogError::Malformed(err.to_string()))?;

        let providers: Vec<ProviderOption> = parsed
            .providers
            .into_iter()
            .filter(|p| !p.name.trim().is_empty())
            .map(|p| ProviderOption {
                name: p.name,
                models: p.models,
            })
            .collect();
        engine_info!("Loaded {} providers", providers.len());
        Ok(ProviderCatalog::new(providers))
    }
}
