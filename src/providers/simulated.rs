//! In-process stand-ins for the detail and stock services.
//!
//! Each call sleeps for a random latency and fails with a configured
//! probability, the way the real services misbehave under load.

use std::time::Duration;

use rand::Rng;

use super::{Availability, AvailabilityProvider, BoxFuture, Detail, DetailProvider, ProviderError};

const DESCRIPTION: &str = "This is a randomly generated product.";

#[derive(Debug, Clone, Copy)]
pub struct SimulationProfile {
    pub max_latency: Duration,
    /// Probability of a failed call [0.0, 1.0]
    pub failure_rate: f64,
}

impl SimulationProfile {
    async fn simulate_io(&self) {
        let max_ms = self.max_latency.as_millis() as u64;
        let delay = rand::rng().random_range(0..=max_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    fn simulate_error(&self, id: u64, message: &str) -> Result<(), ProviderError> {
        if rand::random::<f64>() < self.failure_rate {
            return Err(ProviderError::Lookup {
                id,
                message: message.to_string(),
            });
        }
        Ok(())
    }
}

pub struct SimulatedDetailProvider {
    profile: SimulationProfile,
}

impl SimulatedDetailProvider {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }
}

impl DetailProvider for SimulatedDetailProvider {
    fn get(&self, id: u64) -> BoxFuture<'_, Result<Detail, ProviderError>> {
        Box::pin(async move {
            self.profile.simulate_io().await;
            self.profile
                .simulate_error(id, "network error: failed to fetch product")?;

            let mut rng = rand::rng();
            Ok(Detail {
                id,
                name: format!("Product-{}", rng.random_range(0..1000)),
                description: DESCRIPTION.to_string(),
                price: rng.random_range(1.0..101.0),
            })
        })
    }
}

pub struct SimulatedAvailabilityProvider {
    profile: SimulationProfile,
}

impl SimulatedAvailabilityProvider {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }
}

impl AvailabilityProvider for SimulatedAvailabilityProvider {
    fn get(&self, id: u64) -> BoxFuture<'_, Result<Availability, ProviderError>> {
        Box::pin(async move {
            self.profile.simulate_io().await;
            self.profile
                .simulate_error(id, "network error: failed to fetch stock")?;

            Ok(Availability {
                id,
                quantity: rand::rng().random_range(0..=100),
            })
        })
    }
}
