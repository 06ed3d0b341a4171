//! Pass-through response text.

use triad_types::FusionResult;

/// Longest input prefix echoed back, in characters.
pub const ECHO_LIMIT: usize = 50;

/// Produces the `rendered_response` of an accepted result.
pub trait ResponseRenderer: Send + Sync {
    fn render(&self, text: &str, result: &FusionResult) -> String;
}

/// Keyword-driven acknowledgement.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcknowledgementRenderer;

impl ResponseRenderer for AcknowledgementRenderer {
    fn render(&self, text: &str, _result: &FusionResult) -> String {
        let lowered = text.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

        if mentions(&["help", "assist", "guide"]) {
            format!("I'm here to help you. Processing: {}...", echo(text))
        } else if mentions(&["wisdom", "knowledge", "learn"]) {
            format!("Seeking wisdom is virtuous. Reflecting on: {}...", echo(text))
        } else if mentions(&["thank", "grateful", "appreciate"]) {
            "Gratitude is a noble virtue. I'm glad to assist you.".to_string()
        } else {
            format!("Acknowledged. Processing your input: {}...", echo(text))
        }
    }
}

fn echo(text: &str) -> String {
    text.chars().take(ECHO_LIMIT).collect()
}
