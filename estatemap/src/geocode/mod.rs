//! Address geocoding: provider abstraction and the batch resolver.
//!
//! The geocoding provider is an external, rate-limited capability. The
//! [`Geocoder`] trait keeps it substitutable; [`AddressResolver`] fans a
//! batch of address queries out under an admission cap and writes resolved
//! coordinates back through a single designated writer.

mod nominatim;
mod resolver;

pub use nominatim::NominatimGeocoder;
pub use resolver::AddressResolver;

use crate::coord::Coordinate;
use crate::http::HttpError;
use std::future::Future;
use thiserror::Error;

/// Errors from a geocoding provider.
///
/// All variants are non-fatal: the resolver tallies them into a batch
/// failure count and keeps going.
#[derive(Debug, Clone, Error)]
pub enum GeocodeError {
    /// Transport-level failure
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Provider answered but the payload was not understood
    #[error("malformed provider response: {0}")]
    Decode(String),

    /// Provider-side error (quota, rejection)
    #[error("provider error: {0}")]
    Provider(String),
}

/// Geocoding provider abstraction.
///
/// `Ok(None)` means the provider answered but could not locate the address;
/// the resolver treats that the same as a provider error.
pub trait Geocoder: Send + Sync {
    /// Resolves a free-text address to a coordinate.
    fn resolve(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinate>, GeocodeError>> + Send;
}
