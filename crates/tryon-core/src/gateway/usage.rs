//! Token usage accounting for generation calls.

use serde::Deserialize;
use tracing::info;

/// Usage metadata as reported by the generation API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: u64,
}

/// Per-model pricing used for estimates, in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_token: f64,
    pub output_per_token: f64,
    pub per_image_input: f64,
}

/// Look up pricing for a model. Unknown models have no estimate.
pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    match model {
        "gemini-2.5-flash-image" => Some(ModelPricing {
            input_per_token: 0.35 / 1_000_000.0,
            output_per_token: 1.05 / 1_000_000.0,
            per_image_input: 0.0025,
        }),
        _ => None,
    }
}

/// Estimated cost in USD of one call.
pub fn estimate_cost(model: &str, usage: &UsageMetadata, image_inputs: usize) -> Option<f64> {
    let pricing = pricing_for(model)?;
    Some(
        usage.prompt_token_count as f64 * pricing.input_per_token
            + usage.candidates_token_count as f64 * pricing.output_per_token
            + image_inputs as f64 * pricing.per_image_input,
    )
}

/// Log usage for one call at info level.
pub fn log_usage(operation: &str, model: &str, usage: Option<&UsageMetadata>, image_inputs: usize) {
    let Some(usage) = usage else {
        info!("{} ({}): no usage metadata returned", operation, model);
        return;
    };
    match estimate_cost(model, usage, image_inputs) {
        Some(cost) => info!(
            "{} ({}): prompt={} candidates={} total={} tokens, {} image input(s), est. ${:.6}",
            operation,
            model,
            usage.prompt_token_count,
            usage.candidates_token_count,
            usage.total_token_count,
            image_inputs,
            cost
        ),
        None => info!(
            "{} ({}): prompt={} candidates={} total={} tokens, {} image input(s)",
            operation,
            model,
            usage.prompt_token_count,
            usage.candidates_token_count,
            usage.total_token_count,
            image_inputs
        ),
    }
}
