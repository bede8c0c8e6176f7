//! Inference backend implementations for CampusFed.
//!
//! All providers implement the `campusfed_core::Provider` trait.
//! The router selects the configured provider.

pub mod gemini;
pub mod openai_compat;
pub mod router;
#[cfg(test)]
mod test_server;

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
