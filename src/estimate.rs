use crate::config::PricingConfig;
use crate::models::{slice_batches, Batch, PreviewEntry};
use anyhow::Result;
use std::fmt;
use tiktoken_rs::CoreBPE;
use tracing::debug;

/// Counts prompt tokens the way the tagging model does
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// BPE tokenizer matching the configured model, `o200k_base` for unknown models
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                debug!(model, error = %e, "Unknown model for tokenizer, using o200k_base");
                tiktoken_rs::o200k_base()?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Figures shown to the user before any request is sent
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub file_count: usize,
    pub batch_count: usize,
    pub pixel_count: u64,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub pixel_price: f64,
    pub total_price: f64,
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files: {} in {} request(s)", self.file_count, self.batch_count)?;
        writeln!(f, "Input tokens: {}", self.input_tokens)?;
        writeln!(f, "Input pixels: {}", self.pixel_count)?;
        writeln!(f, "Output tokens: ~{}", self.output_tokens)?;
        write!(f, "Estimated price: ${:.4}", self.total_price)
    }
}

/// Estimate together with the batches it was computed over
#[derive(Debug, Clone, PartialEq)]
pub struct TaggingPlan {
    pub estimate: CostEstimate,
    pub batches: Vec<Batch>,
}

/// Slice previews into batches and price the run.
///
/// Input tokens are the prompt plus every asset name, counted once per batch.
pub fn estimate(
    previews: Vec<PreviewEntry>,
    prompt: &str,
    batch_size: usize,
    pricing: &PricingConfig,
    tokens: &dyn TokenCounter,
) -> TaggingPlan {
    let file_count = previews.len();
    let pixel_count: u64 = previews.iter().map(PreviewEntry::pixel_count).sum();
    let names: Vec<String> = previews.iter().map(PreviewEntry::source_name).collect();

    let batches = slice_batches(previews, batch_size);
    let prompt_tokens = tokens.count(&format!("{}{}", prompt, names.join(", ")));
    let input_tokens = prompt_tokens * batches.len();
    let output_tokens = pricing.output_tokens_per_image * file_count;

    let pixel_price = pixel_count as f64 * pricing.input_pixel_price;
    let total_price = input_tokens as f64 * pricing.input_token_price
        + pixel_price
        + output_tokens as f64 * pricing.output_token_price;
    debug!(pixel_count, pixel_price, "Priced preview pixels");

    TaggingPlan {
        estimate: CostEstimate {
            file_count,
            batch_count: batches.len(),
            pixel_count,
            input_tokens,
            output_tokens,
            pixel_price,
            total_price,
        },
        batches,
    }
}
