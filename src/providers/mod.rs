//! External lookup collaborators consumed by the enrichment stage.
//!
//! Both providers are fallible and may be slow; callers bound every call
//! with a timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

mod simulated;

pub use simulated::{SimulatedAvailabilityProvider, SimulatedDetailProvider, SimulationProfile};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Product details as returned by the detail service.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// Stock information for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub id: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("lookup failed for item {id}: {message}")]
    Lookup { id: u64, message: String },

    #[error("lookup timed out for item {id} after {timeout:?}")]
    Timeout { id: u64, timeout: Duration },
}

pub trait DetailProvider: Send + Sync {
    fn get(&self, id: u64) -> BoxFuture<'_, Result<Detail, ProviderError>>;
}

pub trait AvailabilityProvider: Send + Sync {
    fn get(&self, id: u64) -> BoxFuture<'_, Result<Availability, ProviderError>>;
}
