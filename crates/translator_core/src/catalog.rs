#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOption {
    pub name: String,
    pub models: Vec<String>,
}

/// Provider to model options, fetched once at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderCatalog {
    providers: Vec<ProviderOption>,
}

impl ProviderCatalog {
    pub fn new(providers: Vec<ProviderOption>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[ProviderOption] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// First provider and its first model, the selection a fresh form starts with.
    pub fn default_selection(&self) -> Option<(&str, Option<&str>)> {
        let provider = self.providers.first()?;
        Some((
            provider.name.as_str(),
            provider.models.first().map(String::as_str),
        ))
    }

    pub fn models_for(&self, provider: &str) -> &[String] {
        self.providers
            .iter()
            .find(|p| p.name == provider)
            .map(|p| p.models.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, provider: &str, model: &str) -> bool {
        self.models_for(provider).iter().any(|m| m == model)
    }
}
