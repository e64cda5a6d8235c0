//! Recipe import from OCR text.
//!
//! [`RecipeImporter::builder`] chains the steps an imported recipe goes
//! through: servings detection, extraction by the language model, then
//! resolution of the extracted rows against the catalog. [`ImportSession`]
//! lets a caller that fires several imports keep only the latest answer.

use log::{debug, info};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::canonicalize::canonicalize_with;
use crate::config::{load_config, MatchingConfig, PlannerConfig, ProviderConfig};
use crate::error::PlannerError;
use crate::model::{Catalog, PlannedRecipe};
use crate::parser::{parse_with_hint, ParsedRecipe};
use crate::prep::{candidate_lines, detect_servings};
use crate::providers::{LlmProvider, ProviderFactory};

/// Providers the builder can create from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    /// Name used by the factory and the configuration file
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }
}

/// Builder for configuring and executing a recipe import
#[derive(Default)]
pub struct RecipeImporterBuilder {
    text: Option<String>,
    provider: Option<Arc<dyn LlmProvider>>,
    kind: Option<ProviderKind>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    config: Option<PlannerConfig>,
    catalog: Option<Catalog>,
    matching: Option<MatchingConfig>,
    prefilter: bool,
    extract_only: bool,
}

impl RecipeImporterBuilder {
    /// Set the OCR text to import
    ///
    /// # Example
    /// ```
    /// use meal_basket::RecipeImporter;
    ///
    /// let builder = RecipeImporter::builder()
    ///     .text("Crêpes pour 4 personnes\n250 g farine\n50 cl lait");
    /// ```
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Use an already constructed provider for both model calls.
    ///
    /// Takes precedence over [`provider`](Self::provider) and the configuration.
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Pick the configured provider to use instead of the default one
    ///
    /// # Example
    /// ```
    /// use meal_basket::{ProviderKind, RecipeImporter};
    ///
    /// let builder = RecipeImporter::builder()
    ///     .text("2 oeufs")
    ///     .provider(ProviderKind::Ollama);
    /// ```
    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the API key directly instead of relying on environment variables
    /// or the configuration file
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model name for the provider
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Point the provider at another endpoint (proxy, local server)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Use this configuration instead of loading `meal-basket.toml`
    pub fn config(mut self, config: PlannerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Catalog to resolve rows against. Without one, rows stay free text.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Candidate count and confidence threshold for resolution
    pub fn matching(mut self, matching: MatchingConfig) -> Self {
        self.matching = Some(matching);
        self
    }

    /// Send only the lines that look like ingredients instead of the whole
    /// text. The servings hint is still read from the full text.
    pub fn prefilter(mut self) -> Self {
        self.prefilter = true;
        self
    }

    /// Stop after extraction; rows are returned unresolved.
    ///
    /// # Example
    /// ```
    /// use meal_basket::RecipeImporter;
    ///
    /// let builder = RecipeImporter::builder()
    ///     .text("2 oeufs")
    ///     .extract_only();
    /// ```
    pub fn extract_only(mut self) -> Self {
        self.extract_only = true;
        self
    }

    /// Run the import
    ///
    /// # Errors
    /// Returns `PlannerError` if:
    /// - no text was given, or the text is blank
    /// - no provider could be created from the configuration
    /// - either model call fails
    ///
    /// A confident-enough resolution is not required: rows the resolver
    /// cannot place simply keep their extracted name.
    ///
    /// # Example
    /// ```no_run
    /// # use meal_basket::RecipeImporter;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let recipe = RecipeImporter::builder()
    ///     .text("Omelette pour 2\n3 oeufs\n10 g beurre")
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build(self) -> Result<ParsedRecipe, PlannerError> {
        let text = self
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PlannerError::InvalidInput("Recipe text cannot be empty".to_string()))?
            .to_string();

        let (provider, config) = self.resolve_provider()?;
        let hint = detect_servings(&text);

        let sent = if self.prefilter {
            let lines = candidate_lines(&text);
            if lines.is_empty() {
                return Err(PlannerError::InvalidInput(
                    "No ingredient lines found in text".to_string(),
                ));
            }
            lines.join("\n")
        } else {
            text
        };

        let mut parsed = parse_with_hint(&sent, hint, provider.as_ref()).await?;
        info!("Extracted {} rows", parsed.rows.len());

        if self.extract_only {
            return Ok(parsed);
        }
        let Some(catalog) = self.catalog.as_ref().filter(|c| !c.is_empty()) else {
            debug!("No catalog given, keeping rows unresolved");
            return Ok(parsed);
        };

        let matching = self
            .matching
            .or_else(|| config.map(|c| c.matching))
            .unwrap_or_default();
        parsed.rows = canonicalize_with(parsed.rows, catalog, provider.as_ref(), &matching).await?;
        Ok(parsed)
    }

    /// The explicit provider wins; otherwise one is created from the
    /// configuration with the builder's overrides applied.
    fn resolve_provider(
        &self,
    ) -> Result<(Arc<dyn LlmProvider>, Option<PlannerConfig>), PlannerError> {
        if let Some(provider) = &self.provider {
            return Ok((provider.clone(), self.config.clone()));
        }

        let config = match &self.config {
            Some(config) => config.clone(),
            None => load_config()?,
        };
        let name = self
            .kind
            .map(|k| k.as_str().to_string())
            .unwrap_or_else(|| config.default_provider.clone());

        let mut provider_config = config
            .providers
            .get(&name)
            .cloned()
            .unwrap_or_else(|| ProviderConfig {
                enabled: true,
                model: default_model(&name).to_string(),
                temperature: 0.0,
                max_tokens: 2000,
                api_key: None,
                base_url: None,
            });
        if let Some(key) = &self.api_key {
            provider_config.api_key = Some(key.clone());
        }
        if let Some(model) = &self.model {
            provider_config.model = model.clone();
        }
        if let Some(url) = &self.base_url {
            provider_config.base_url = Some(url.clone());
        }

        debug!("Using provider {} with model {}", name, provider_config.model);
        let provider = ProviderFactory::create(&name, &provider_config)?;
        Ok((Arc::from(provider), Some(config)))
    }
}

fn default_model(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "claude-3-5-haiku-latest",
        "ollama" => "llama3.1",
        _ => "gpt-4o-mini",
    }
}

/// Main entry point for the builder API
pub struct RecipeImporter;

impl RecipeImporter {
    /// Creates a new builder for importing recipes
    ///
    /// # Example
    /// ```
    /// use meal_basket::RecipeImporter;
    ///
    /// let builder = RecipeImporter::builder();
    /// ```
    pub fn builder() -> RecipeImporterBuilder {
        RecipeImporterBuilder::default()
    }
}

impl ParsedRecipe {
    /// Plan the imported recipe for `servings`, scaling from the detected
    /// servings (or `servings` itself when none were found).
    pub fn into_planned(self, servings: u32, date: chrono::DateTime<chrono::Utc>) -> PlannedRecipe {
        PlannedRecipe::new(
            self.title.as_deref().unwrap_or_default(),
            servings,
            self.servings,
            self.rows,
            date,
        )
    }
}

/// Identifier of one in-flight request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    slot: String,
    id: u64,
}

impl RequestTicket {
    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Hands out increasing request ids per slot and tells whether an answer is
/// still wanted. A slot is whatever the caller refreshes as a unit, e.g. one
/// import screen.
#[derive(Debug, Default)]
pub struct ImportSession {
    counter: AtomicU64,
    latest: Mutex<HashMap<String, u64>>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request; every earlier ticket of the slot becomes stale.
    pub fn begin(&self, slot: &str) -> RequestTicket {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.insert(slot.to_string(), id);
        RequestTicket {
            slot: slot.to_string(),
            id,
        }
    }

    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.get(&ticket.slot) == Some(&ticket.id)
    }

    /// Give back `result` if the ticket is still the latest of its slot
    pub fn accept<T>(&self, ticket: &RequestTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            debug!(
                "Discarding stale result {} for slot '{}'",
                ticket.id, ticket.slot
            );
            None
        }
    }

    /// Forget the slot; pending tickets become stale.
    pub fn cancel(&self, slot: &str) {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.remove(slot);
    }

    /// Begin a ticket, await `task` and keep its output only if no newer
    /// request for the slot started meanwhile.
    pub async fn run<F, T>(&self, slot: &str, task: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let ticket = self.begin(slot);
        let result = task.await;
        self.accept(&ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{catalog_from, Ingredient};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers extraction and canonicalization from canned JSON
    struct CannedProvider {
        extraction: String,
        mapping: String,
        calls: Mutex<Vec<String>>,
    }

    impl CannedProvider {
        fn new(extraction: &str, mapping: &str) -> Arc<Self> {
            Arc::new(Self {
                extraction: extraction.to_string(),
                mapping: mapping.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn provider_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String, PlannerError> {
            self.calls.lock().unwrap().push(user.to_string());
            if user.contains("\"candidates\"") {
                Ok(self.mapping.clone())
            } else {
                Ok(self.extraction.clone())
            }
        }
    }

    const EXTRACTION: &str = r#"{"r":"Crêpes","s":null,"i":[
        {"n":"farine de ble","q":250,"u":"grammes"},
        {"n":"lait entier","q":50,"u":"cl"}
    ],"p":["Mélanger","Cuire"]}"#;

    fn catalog() -> Catalog {
        catalog_from(vec![
            Ingredient::new(1, "Farine", "Pantry", "g"),
            Ingredient::new(2, "Lait", "Fresh", "ml"),
        ])
    }

    #[tokio::test]
    async fn test_import_resolves_confident_rows() {
        let provider = CannedProvider::new(
            EXTRACTION,
            r#"{"mapped":[
                {"idx":0,"canonical_id":1,"canonical_name":"Farine","confidence":0.92},
                {"idx":1,"canonical_id":2,"canonical_name":"Lait","confidence":0.5}
            ]}"#,
        );

        let recipe = RecipeImporter::builder()
            .text("Crêpes pour 4 personnes\n250 g farine de blé\n50 cl lait entier")
            .with_provider(provider.clone())
            .catalog(catalog())
            .build()
            .await
            .unwrap();

        assert_eq!(recipe.title.as_deref(), Some("Crêpes"));
        assert_eq!(recipe.servings, Some(4));
        assert_eq!(recipe.rows[0].canonical_id, Some(1));
        assert_eq!(recipe.rows[0].name, "Farine");
        assert_eq!(recipe.rows[0].unit, "g");
        assert_eq!(recipe.rows[1].canonical_id, None);
        assert_eq!(recipe.rows[1].name, "lait entier");
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_extract_only_skips_resolution() {
        let provider = CannedProvider::new(EXTRACTION, "not json");
        let recipe = RecipeImporter::builder()
            .text("250 g farine")
            .with_provider(provider.clone())
            .catalog(catalog())
            .extract_only()
            .build()
            .await
            .unwrap();

        assert_eq!(recipe.rows.len(), 2);
        assert!(recipe.rows.iter().all(|r| r.canonical_id.is_none()));
        assert_eq!(provider.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_prefilter_keeps_servings_hint() {
        let provider = CannedProvider::new(EXTRACTION, r#"{"mapped":[]}"#);
        let recipe = RecipeImporter::builder()
            .text("Pour 6 personnes\n250 g farine\nPréchauffer le four à 180°C")
            .with_provider(provider.clone())
            .prefilter()
            .build()
            .await
            .unwrap();

        assert_eq!(recipe.servings, Some(6));
        let calls = provider.calls.lock().unwrap();
        assert!(calls[0].contains("farine"));
        assert!(!calls[0].contains("personnes"));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let provider = CannedProvider::new(EXTRACTION, "");
        let result = RecipeImporter::builder()
            .text("   \n ")
            .with_provider(provider.clone())
            .build()
            .await;
        assert!(matches!(result, Err(PlannerError::InvalidInput(_))));
        assert!(provider.calls.lock().unwrap().is_empty());

        let result = RecipeImporter::builder().build().await;
        assert!(matches!(result, Err(PlannerError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_configured_provider() {
        let config = PlannerConfig {
            default_provider: "mistral".to_string(),
            ..Default::default()
        };
        let result = RecipeImporter::builder()
            .text("2 oeufs")
            .config(config)
            .build()
            .await;
        assert!(matches!(result, Err(PlannerError::UnknownProvider(_))));
    }

    #[test]
    fn test_into_planned_scales_from_detected_servings() {
        let parsed = crate::parser::rows_from_response(
            serde_json::from_str(EXTRACTION).unwrap(),
            Some(4),
        );
        let planned = parsed.into_planned(6, chrono::Utc::now());
        assert_eq!(planned.title, "Crêpes");
        assert_eq!(planned.base_servings, 4);
        assert_eq!(planned.scaled_rows()[0].quantity, Some(375.0));
    }

    #[test]
    fn test_only_latest_ticket_is_accepted() {
        let session = ImportSession::new();
        let first = session.begin("import");
        let second = session.begin("import");
        let other = session.begin("catalog");

        assert!(second.id() > first.id());
        assert!(!session.is_current(&first));
        assert_eq!(session.accept(&first, "old"), None);
        assert_eq!(session.accept(&second, "new"), Some("new"));
        assert_eq!(session.accept(&other, 1), Some(1));

        session.cancel("import");
        assert_eq!(session.accept(&second, "new"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_answer_is_discarded() {
        let session = ImportSession::new();

        let slow = session.run("import", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "slow"
        });
        let fast = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            session.run("import", async { "fast" }).await
        };

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(slow, None);
        assert_eq!(fast, Some("fast"));
    }
}
