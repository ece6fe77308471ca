//! OpenAI-compatible chat-completions classifier.

mod client;
mod config;

pub use client::OpenAiClassifier;
pub use config::ClassifierConfig;
