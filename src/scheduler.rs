//! Per-attempt sampling schedule
//!
//! Each attempt gets a pre-tuned set of sampling knobs and an increasingly
//! directive prompt prefix, so a retry never repeats the request that just
//! produced a blocked or unparseable answer.

use crate::models::OutputMode;
use chrono::{DateTime, Utc};

/// Highest attempt number the orchestrator will run (attempts are 0-based).
pub const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParameters {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub prompt_prefix: String,
    pub seed: i32,
}

struct Step {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    prefix: &'static str,
}

// Attempt 1 loosens sampling to get away from recitation blocks; attempt 2
// tightens it for the most literal JSON.
const SCHEDULE: [Step; 3] = [
    Step {
        temperature: 0.5,
        top_k: 20,
        top_p: 0.9,
        prefix: "",
    },
    Step {
        temperature: 0.7,
        top_k: 30,
        top_p: 0.9,
        prefix: "Please use exactly this format (JSON object): ",
    },
    Step {
        temperature: 0.3,
        top_k: 10,
        top_p: 0.9,
        prefix: "RESPOND WITH ONLY A JSON OBJECT in this exact format: ",
    },
];

const COLOR_ONLY_NOTE: &str = "No image is needed. ";

pub fn schedule(attempt: u32, output_mode: OutputMode) -> SamplingParameters {
    schedule_at(attempt, output_mode, Utc::now())
}

/// Same as [`schedule`] with the clock injected.
pub fn schedule_at(
    attempt: u32,
    output_mode: OutputMode,
    now: DateTime<Utc>,
) -> SamplingParameters {
    let index = (attempt as usize).min(SCHEDULE.len() - 1);
    let step = &SCHEDULE[index];

    let prompt_prefix = match (step.prefix, output_mode) {
        ("", _) => String::new(),
        (prefix, OutputMode::ColorOnly) => format!("{}{}", COLOR_ONLY_NOTE, prefix),
        (prefix, OutputMode::WithImage) => prefix.to_string(),
    };

    SamplingParameters {
        temperature: step.temperature,
        top_k: step.top_k,
        top_p: step.top_p,
        prompt_prefix,
        seed: seed_for(attempt, now),
    }
}

/// Mixes wall-clock milliseconds with the attempt number into a
/// non-negative `i32`, the range Gemini accepts for `seed`.
fn seed_for(attempt: u32, now: DateTime<Utc>) -> i32 {
    let millis = now.timestamp_millis() as u64;
    let mixed = millis
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(u64::from(attempt).wrapping_mul(0xBF58_476D_1CE4_E5B9));
    let folded = (mixed ^ (mixed >> 31)) % (i32::MAX as u64);
    folded as i32
}
