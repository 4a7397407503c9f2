pub mod auth;
pub mod config;
pub mod factory;
pub mod providers;

pub use auth::TokenManager;
pub use config::{LlmConfig, ProviderKind};
pub use factory::ProviderFactory;
pub use providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderClient, ProviderId, TokenUsage,
};
