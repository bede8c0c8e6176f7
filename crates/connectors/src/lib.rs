//! Federated source connectors for CampusFed.
//!
//! One `SourceConnector` per catalog tool:
//! - profile store: own profile, all profiles, own documents, all documents
//! - partner catalog: jobs, scholarships
//! - advisory: a flag-only tool with no data source
//!
//! `default_registry` builds the static registration table at startup.

pub mod advisory;
pub mod catalog;
pub mod documents;
pub mod listings;
pub mod profiles;

use campusfed_core::store::StudentStore;
use campusfed_core::tool::ConnectorRegistry;
use std::sync::Arc;

pub use catalog::CatalogClient;

/// Register every catalog tool against the given store and partner catalog.
pub fn default_registry(store: Arc<dyn StudentStore>, catalog: Arc<CatalogClient>) -> ConnectorRegistry {
    let mut registry = ConnectorRegistry::new();
    registry.register(Box::new(profiles::StudentProfileConnector::new(store.clone())));
    registry.register(Box::new(profiles::AllProfilesConnector::new(store.clone())));
    registry.register(Box::new(documents::StudentDocumentsConnector::new(store.clone())));
    registry.register(Box::new(documents::AllDocumentsConnector::new(store)));
    registry.register(Box::new(listings::JobsConnector::new(catalog.clone())));
    registry.register(Box::new(listings::ScholarshipsConnector::new(catalog)));
    registry.register(Box::new(advisory::CareerAdviceConnector));
    registry
}
