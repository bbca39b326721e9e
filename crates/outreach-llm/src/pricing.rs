//! Per-model token pricing, in dollars per million tokens.

/// (input, output) price per 1M tokens. Unknown models fall back to the
/// cheapest tier so costs stay conservative rather than absent.
fn model_rates(model: &str) -> (f64, f64) {
    match model {
        "gpt-4o" => (2.50, 10.00),
        _ => (0.15, 0.60), // gpt-4o-mini and everything unknown
    }
}

pub fn compute_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let (input_rate, output_rate) = model_rates(model);
    (prompt_tokens as f64 * input_rate + completion_tokens as f64 * output_rate) / 1_000_000.0
}
