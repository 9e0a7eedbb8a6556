//! Listing record collaborator interfaces.
//!
//! The record store that owns listing entities lives outside this library;
//! only the surface the enrichment pipeline needs is modeled here. The
//! persistence commit after a geocode batch remains the caller's
//! responsibility.

use crate::coord::Coordinate;
use std::collections::HashMap;
use std::sync::Mutex;

/// Stable identifier of a listing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingId(pub u64);

/// A property listing as seen by the enrichment pipeline.
#[derive(Debug, Clone)]
pub struct Listing {
    /// Record identifier
    pub id: ListingId,
    /// Free-text address, possibly empty
    pub address: String,
    /// Resolved coordinate, absent until geocoded
    pub coordinate: Option<Coordinate>,
    /// Source URL of the listing photograph, if any
    pub photo_url: Option<String>,
}

impl Listing {
    /// Creates a listing with no coordinate and no photo.
    pub fn new(id: ListingId, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            coordinate: None,
            photo_url: None,
        }
    }

    /// Returns true if this listing still needs geocoding: it has a
    /// non-empty address and no coordinate yet.
    pub fn needs_geocoding(&self) -> bool {
        self.coordinate.is_none() && !self.address.trim().is_empty()
    }
}

/// Record store abstraction.
///
/// Coordinate writes go through `set_coordinate` so the store can funnel
/// them onto whatever execution context owns its state.
pub trait RecordStore: Send + Sync {
    /// Returns a snapshot of all listings.
    fn listings(&self) -> Vec<Listing>;

    /// Writes a resolved coordinate onto a listing.
    ///
    /// Unknown ids are ignored.
    fn set_coordinate(&self, id: ListingId, coordinate: Coordinate);
}

/// Ephemeral unit of geocoding work, created per batch and discarded after
/// processing.
#[derive(Debug, Clone)]
pub struct AddressQuery {
    /// Owning listing record
    pub id: ListingId,
    /// Address text to resolve
    pub address: String,
}

impl AddressQuery {
    /// Collects the queries for every listing in the store that still needs
    /// geocoding. Listings with empty addresses are skipped and do not count
    /// as attempts.
    pub fn pending(store: &dyn RecordStore) -> Vec<AddressQuery> {
        store
            .listings()
            .into_iter()
            .filter(Listing::needs_geocoding)
            .map(|listing| AddressQuery {
                id: listing.id,
                address: listing.address,
            })
            .collect()
    }
}

/// In-memory record store.
///
/// Used by tests and by embedders that keep the listing set in process
/// memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    listings: Mutex<HashMap<ListingId, Listing>>,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a listing.
    pub fn insert(&self, listing: Listing) {
        let mut listings = self.listings.lock().unwrap();
        listings.insert(listing.id, listing);
    }

    /// Returns a single listing by id.
    pub fn get(&self, id: ListingId) -> Option<Listing> {
        let listings = self.listings.lock().unwrap();
        listings.get(&id).cloned()
    }

    /// Number of listings held.
    pub fn len(&self) -> usize {
        self.listings.lock().unwrap().len()
    }

    /// Returns true if the store holds no listings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryRecordStore {
    fn listings(&self) -> Vec<Listing> {
        let listings = self.listings.lock().unwrap();
        listings.values().cloned().collect()
    }

    fn set_coordinate(&self, id: ListingId, coordinate: Coordinate) {
        let mut listings = self.listings.lock().unwrap();
        if let Some(listing) = listings.get_mut(&id) {
            listing.coordinate = Some(coordinate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord() -> Coordinate {
        Coordinate::new(35.66, 139.7).unwrap()
    }

    #[test]
    fn test_needs_geocoding() {
        let listing = Listing::new(ListingId(1), "東京都渋谷区1-2-3");
        assert!(listing.needs_geocoding());
    }

    #[test]
    fn test_needs_geocoding_empty_address() {
        let listing = Listing::new(ListingId(1), "");
        assert!(!listing.needs_geocoding());

        let listing = Listing::new(ListingId(2), "   ");
        assert!(!listing.needs_geocoding());
    }

    #[test]
    fn test_needs_geocoding_already_resolved() {
        let mut listing = Listing::new(ListingId(1), "somewhere");
        listing.coordinate = Some(coord());
        assert!(!listing.needs_geocoding());
    }

    #[test]
    fn test_store_insert_and_get() {
        let store = InMemoryRecordStore::new();
        store.insert(Listing::new(ListingId(7), "addr"));

        let listing = store.get(ListingId(7)).unwrap();
        assert_eq!(listing.address, "addr");
        assert!(listing.coordinate.is_none());
    }

    #[test]
    fn test_store_set_coordinate() {
        let store = InMemoryRecordStore::new();
        store.insert(Listing::new(ListingId(7), "addr"));

        store.set_coordinate(ListingId(7), coord());
        assert_eq!(store.get(ListingId(7)).unwrap().coordinate, Some(coord()));
    }

    #[test]
    fn test_store_set_coordinate_unknown_id_ignored() {
        let store = InMemoryRecordStore::new();
        store.set_coordinate(ListingId(99), coord());
        assert!(store.is_empty());
    }

    #[test]
    fn test_pending_queries_filter() {
        let store = InMemoryRecordStore::new();
        store.insert(Listing::new(ListingId(1), "has address"));
        store.insert(Listing::new(ListingId(2), ""));
        let mut resolved = Listing::new(ListingId(3), "already done");
        resolved.coordinate = Some(coord());
        store.insert(resolved);

        let queries = AddressQuery::pending(&store);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].id, ListingId(1));
        assert_eq!(queries[0].address, "has address");
    }
}
