//! Command handlers
//!
//! The library speaks `SwitchyardError`; here at the binary edge everything
//! flattens into `anyhow` for display.

use crate::args::ConfigAction;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchyard_core::config::{default_config_path, ConfigLoader};
use switchyard_core::dispatch::EchoBackend;
use switchyard_core::{
    Classifier, Pipeline, PipelineRequest, PricingTable, ProviderId, RouterConfig,
    SwitchyardError,
};

/// Load the layered configuration: defaults, then file, then environment
pub fn load_config(config_file: &Path) -> Result<RouterConfig> {
    ConfigLoader::new()
        .with_defaults()
        .with_file(config_file)
        .with_env()
        .load()
        .context("failed to load configuration")
}

/// `classify <text>`: print the routing verdict as JSON
pub fn classify(config: RouterConfig, text: &str) -> Result<()> {
    let classifier = Classifier::new(config.keywords, config.routing);

    let analysis = classifier.classify(text);
    let explanation = Classifier::selection_explanation(&analysis);

    let output = serde_json::json!({
        "analysis": analysis,
        "explanation": explanation,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// `route <text>`: run the full pipeline against the echo backend
pub async fn route(
    config: RouterConfig,
    text: &str,
    user: &str,
    module: Option<&str>,
) -> Result<()> {
    let pipeline = Pipeline::builder()
        .with_backend(Arc::new(EchoBackend))
        .with_config(config)
        .build()?;

    let mut request = PipelineRequest::new(user, text);
    if let Some(module) = module {
        request = request.with_module(module);
    }

    match pipeline.handle(request).await {
        Ok(response) => {
            let output = serde_json::json!({
                "text": response.text,
                "provider": response.provider.to_string(),
                "model": response.model,
                "analysis": response.analysis,
                "usage": response.usage,
                "from_cache": response.from_cache,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(SwitchyardError::QuotaExceeded { message, windows }) => {
            let output = serde_json::json!({
                "rejected": true,
                "reason": message,
                "windows": windows.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(SwitchyardError::AllProvidersFailed { message, failures }) => {
            let output = serde_json::json!({
                "failed": true,
                "reason": message,
                "attempts": failures
                    .iter()
                    .map(|f| serde_json::json!({"provider": f.provider, "reason": f.reason}))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(other) => return Err(other.into()),
    }

    pipeline.shutdown().await;
    Ok(())
}

/// `status`: health snapshot for the configured providers
///
/// A one-shot process always shows fresh counters; in a deployment the same
/// snapshot comes from the long-lived registry behind the admin endpoint.
pub fn status(config: &RouterConfig) -> Result<()> {
    let registry = switchyard_core::HealthRegistry::new()
        .with_failure_threshold(config.failure_threshold)
        .with_fallback_order(&config.fallback_order);

    let mut output = serde_json::Map::new();
    for provider in &config.fallback_order {
        let status = registry.status(provider);
        output.insert(provider.to_string(), serde_json::to_value(&status)?);
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// `reset <provider>`: clear a provider's failure counter and show it
pub fn reset(config: &RouterConfig, provider: &str) -> Result<()> {
    let registry = switchyard_core::HealthRegistry::new()
        .with_failure_threshold(config.failure_threshold)
        .with_fallback_order(&config.fallback_order);

    let provider: ProviderId = provider.parse().unwrap_or(ProviderId::Custom(provider.to_string()));
    registry.reset(&provider);

    let status = registry.status(&provider);
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// `models`: print the pricing table
pub fn models(config: &RouterConfig) -> Result<()> {
    let table = PricingTable::with_defaults().with_fx_rate(config.quota.fx_rate);

    let mut models: Vec<_> = table.list_models().collect();
    models.sort_by(|a, b| a.model_id.cmp(&b.model_id));

    println!(
        "{:<28} {:<12} {:>12} {:>14}",
        "MODEL", "PROVIDER", "USD/1M IN", "USD/1M OUT"
    );
    for model in models {
        println!(
            "{:<28} {:<12} {:>12.2} {:>14.2}",
            model.model_id, model.provider.to_string(), model.price.prompt, model.price.completion
        );
    }
    println!("\nFX rate: {:.2} BRL/USD", table.fx_rate());
    Ok(())
}

/// `config init|show`
pub fn config(config: RouterConfig, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { path } => {
            let target: PathBuf = path.clone().unwrap_or_else(default_config_path);
            if target.exists() {
                anyhow::bail!("config file already exists: {}", target.display());
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let content = toml::to_string_pretty(&RouterConfig::default())?;
            std::fs::write(&target, content)
                .with_context(|| format!("writing {}", target.display()))?;
            println!("wrote {}", target.display());
        }
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
