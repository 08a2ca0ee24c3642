//! Model price table
//!
//! Costs are computed only from token counts a provider actually reported;
//! admission estimates never touch money. Amounts are kept in USD and BRL,
//! converted at a fixed configurable rate, because the billing surface of the
//! deployed platform reports both.

use crate::dispatch::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default USD to BRL conversion rate used by the billing reports
pub const DEFAULT_USD_TO_BRL: f64 = 5.5;

/// Price per 1M tokens, in USD
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenPrice {
    /// Price per 1M prompt tokens
    pub prompt: f64,
    /// Price per 1M completion tokens
    pub completion: f64,
}

impl TokenPrice {
    /// Create new token price
    pub const fn new(prompt: f64, completion: f64) -> Self {
        Self { prompt, completion }
    }

    /// Cost in USD for the given token counts
    pub fn calculate(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let prompt_cost = (prompt_tokens as f64 / 1_000_000.0) * self.prompt;
        let completion_cost = (completion_tokens as f64 / 1_000_000.0) * self.completion;
        prompt_cost + completion_cost
    }
}

/// One model's pricing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrice {
    /// Model identifier
    pub model_id: String,
    /// Provider serving the model
    pub provider: ProviderId,
    /// Display name
    pub display_name: String,
    /// Token pricing
    pub price: TokenPrice,
}

impl ModelPrice {
    /// Create a new model price entry
    pub fn new(model_id: impl Into<String>, provider: ProviderId, price: TokenPrice) -> Self {
        let model_id = model_id.into();
        Self {
            display_name: model_id.clone(),
            model_id,
            provider,
            price,
        }
    }

    /// Set display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// A computed cost in both billing currencies
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// US dollars
    pub usd: f64,
    /// Brazilian reais
    pub brl: f64,
}

impl Cost {
    /// Zero cost
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Price lookup for all known models
#[derive(Debug, Clone)]
pub struct PricingTable {
    /// Prices by model ID
    models: HashMap<String, ModelPrice>,
    /// Aliases for model IDs
    aliases: HashMap<String, String>,
    /// USD to BRL conversion rate
    usd_to_brl: f64,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PricingTable {
    /// Create a new empty table with the default conversion rate
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
            aliases: HashMap::new(),
            usd_to_brl: DEFAULT_USD_TO_BRL,
        }
    }

    /// Create a table with the deployed model roster
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register_defaults();
        table
    }

    /// Set the USD to BRL conversion rate
    pub fn with_fx_rate(mut self, usd_to_brl: f64) -> Self {
        self.usd_to_brl = usd_to_brl;
        self
    }

    /// The conversion rate in use
    pub fn fx_rate(&self) -> f64 {
        self.usd_to_brl
    }

    /// Register a model
    pub fn register(&mut self, price: ModelPrice) {
        self.models.insert(price.model_id.clone(), price);
    }

    /// Register an alias
    pub fn register_alias(&mut self, alias: impl Into<String>, model_id: impl Into<String>) {
        self.aliases.insert(alias.into(), model_id.into());
    }

    /// Look up a model's price entry
    pub fn price_of(&self, model_id: &str) -> Option<&ModelPrice> {
        // Check direct match
        if let Some(price) = self.models.get(model_id) {
            return Some(price);
        }

        // Check aliases
        if let Some(actual_id) = self.aliases.get(model_id) {
            return self.models.get(actual_id);
        }

        // Try partial match
        self.models
            .values()
            .find(|p| model_id.contains(&p.model_id) || p.model_id.contains(model_id))
    }

    /// Cost of an exchange against a model, in both currencies
    ///
    /// Unknown models price at `None`; the caller decides whether that means
    /// free or unbillable.
    pub fn cost_of(&self, model_id: &str, prompt_tokens: u64, completion_tokens: u64) -> Option<Cost> {
        self.price_of(model_id).map(|p| {
            let usd = p.price.calculate(prompt_tokens, completion_tokens);
            Cost {
                usd,
                brl: usd * self.usd_to_brl,
            }
        })
    }

    /// List all models
    pub fn list_models(&self) -> impl Iterator<Item = &ModelPrice> {
        self.models.values()
    }

    /// List models served by a provider
    pub fn list_by_provider<'a>(
        &'a self,
        provider: &'a ProviderId,
    ) -> impl Iterator<Item = &'a ModelPrice> {
        self.models.values().filter(move |p| &p.provider == provider)
    }

    /// Register the deployed model roster
    fn register_defaults(&mut self) {
        // OpenAI tiers
        self.register(
            ModelPrice::new("gpt-4o-mini", ProviderId::OpenAI, TokenPrice::new(0.15, 0.60))
                .with_display_name("GPT-4o Mini"),
        );
        self.register(
            ModelPrice::new(
                "gpt-5-chat-latest",
                ProviderId::OpenAI,
                TokenPrice::new(1.25, 10.0),
            )
            .with_display_name("GPT-5 Chat"),
        );
        self.register_alias("gpt-5-chat", "gpt-5-chat-latest");

        // Google
        self.register(
            ModelPrice::new(
                "gemini-2.0-flash-exp",
                ProviderId::Google,
                TokenPrice::new(0.10, 0.40),
            )
            .with_display_name("Gemini 2.0 Flash"),
        );
        self.register_alias("gemini-2.0-flash", "gemini-2.0-flash-exp");

        // Anthropic
        self.register(
            ModelPrice::new(
                "claude-3-haiku-20240307",
                ProviderId::Anthropic,
                TokenPrice::new(0.25, 1.25),
            )
            .with_display_name("Claude 3 Haiku"),
        );
        self.register_alias("claude-3-haiku", "claude-3-haiku-20240307");

        self.register(
            ModelPrice::new(
                "claude-3-sonnet-20240229",
                ProviderId::Anthropic,
                TokenPrice::new(3.0, 15.0),
            )
            .with_display_name("Claude 3 Sonnet"),
        );
        self.register_alias("claude-3-sonnet", "claude-3-sonnet-20240229");

        // Perplexity
        self.register(
            ModelPrice::new("sonar", ProviderId::Perplexity, TokenPrice::new(1.0, 1.0))
                .with_display_name("Sonar"),
        );
    }
}
