//! # CampusFed Core
//!
//! Domain types, traits, and error definitions for the CampusFed federated
//! query pipeline. This crate has **no framework dependencies**; it defines
//! the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - `Provider` for the inference backend
//! - `SourceConnector` for each federated data source
//! - `StudentStore` for the profile/document store
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted stand-ins and the dependency graph points inward on core.

pub mod error;
pub mod provider;
pub mod student;
pub mod listing;
pub mod tool;
pub mod context;
pub mod query;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{
    DecompositionError, EtlError, Error, FilterDataError, ProviderError, Result, StoreError, SynthesisError,
    ToolError,
};
pub use provider::{ModelSettings, Provider, ProviderRequest, ProviderResponse, Usage};
pub use student::{DocumentRecord, NewStudent, Profile, ProfileUpdate, StudentId, VerificationStatus};
pub use listing::{Criteria, Listing, ListingKind, StructuredCriteria};
pub use tool::{ConnectorRegistry, Plan, SourceConnector, ToolContext, ToolName};
pub use context::ContextBag;
pub use query::{Answer, Query};
pub use store::{NewDocument, StudentStore};
