pub mod client;
pub mod config;

pub use client::EmbeddingsClient;
pub use config::{EmbeddingsConfig, EmbeddingsProviderKind};
