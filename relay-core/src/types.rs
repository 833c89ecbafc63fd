use std::collections::BTreeMap;

/// Parameter bundle handed to the batched engine when a generation is
/// registered. `Default` carries the engine defaults, so a decoder only
/// overrides the knobs the client actually set.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Cap on newly generated tokens. Unbounded unless the request caps it.
    pub max_new_tokens: usize,
    /// Suppress EOS-based termination.
    pub ignore_eos: bool,
    /// Number of beam groups. Always 1 for chat completions.
    pub num_groups: usize,
    /// Beams per group; >1 steers the engine into beam search.
    pub group_size: usize,
    pub diversity_penalty: f32,
    pub repetition_penalty: f32,
    pub length_penalty: f32,
    /// How many finished sequences the engine returns.
    pub num_return_sequences: usize,
    pub temperature: f32,
    /// 0 disables the top-k cutoff.
    pub top_k: usize,
    pub top_p: f32,
    pub rng_seed: u64,
    /// Multinomial sampling; only valid with a single beam.
    pub do_sample: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: usize::MAX,
            ignore_eos: false,
            num_groups: 1,
            group_size: 1,
            diversity_penalty: 1.0,
            repetition_penalty: 1.0,
            length_penalty: 1.0,
            num_return_sequences: 1,
            temperature: 0.0,
            top_k: 0,
            top_p: 1.0,
            rng_seed: 0,
            do_sample: false,
        }
    }
}

/// Lifecycle of one generation inside the shared pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    /// Still producing tokens.
    Running,
    /// All sequences complete; outputs are ready to read.
    Finished,
    /// Dropped by the pipeline; no further output will arrive.
    Failed,
}

/// Tokens produced for one sequence of a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    pub generated_token_ids: Vec<u32>,
}

/// Per-sequence outputs from a single non-blocking read, keyed by
/// sequence id in the engine's emission order.
pub type GenerationOutputs = BTreeMap<u64, GenerationOutput>;
