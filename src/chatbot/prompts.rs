//! Prompt templates for the scam classifier.

pub const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You are a scam-detection assistant for a consumer protection service. \
Given a message a user received (text, email, social post, or call summary), \
decide whether it is a scam. Respond with ONLY a JSON object:
{
  \"isScam\": true|false,
  \"confidence\": 0.0-1.0,
  \"category\": \"impersonation|crypto|romance|tech_support|phishing|other|none\",
  \"advice\": \"one or two sentences of plain-language guidance\"
}";

/// Wrap the user's message for classification.
pub fn build_classification_prompt(message: &str) -> String {
    format!(
        "Classify the following message a user received:\n\n---\n{}\n---",
        message.trim()
    )
}
