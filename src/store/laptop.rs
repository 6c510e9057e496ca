//! Concurrency-safe keyed storage of laptop records.

use dashmap::DashMap;

use crate::error::{Error, Result};
use crate::proto::{Filter, Laptop};

/// In-memory laptop store keyed by record identifier.
///
/// Backed by a sharded map so that operations on unrelated records never
/// contend on a store-wide lock. Records are immutable once inserted.
#[derive(Default)]
pub struct LaptopStore {
    laptops: DashMap<String, Laptop>,
}

impl LaptopStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a laptop if its identifier is absent.
    ///
    /// The check and insert are atomic per key: of two concurrent saves with
    /// the same identifier exactly one succeeds and the other fails with
    /// `AlreadyExists`, leaving the stored value untouched.
    pub fn save(&self, laptop: Laptop) -> Result<String> {
        let id = laptop.id.clone();

        match self.laptops.entry(id.clone()) {
            dashmap::Entry::Occupied(_) => Err(Error::AlreadyExists(id)),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(laptop);
                Ok(id)
            }
        }
    }

    /// Returns an independent copy of the stored laptop.
    pub fn find(&self, id: &str) -> Result<Laptop> {
        self.laptops
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.laptops.contains_key(id)
    }

    /// Collects a snapshot of all records matching the filter.
    ///
    /// Every identifier present at call start is visited exactly once and
    /// values are cloned under their shard lock, so the result never contains
    /// torn records or duplicates. Inserts racing with the scan may or may
    /// not be observed.
    pub fn search(&self, filter: &Filter) -> Vec<Laptop> {
        self.laptops
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::proto::{Memory, MemoryUnit};

    fn laptop(id: &str, price: f64) -> Laptop {
        Laptop {
            id: id.to_string(),
            brand: "generic".to_string(),
            name: "model".to_string(),
            cpu: None,
            ram: None,
            price_usd: price,
        }
    }

    #[test]
    fn save_then_find_returns_copy() {
        let store = LaptopStore::new();
        store.save(laptop("a", 1000.0)).unwrap();

        let mut found = store.find("a").unwrap();
        found.price_usd = 1.0;

        // Mutating the returned value must not affect stored state.
        assert_eq!(store.find("a").unwrap().price_usd, 1000.0);
    }

    #[test]
    fn duplicate_id_fails_without_mutation() {
        let store = LaptopStore::new();
        store.save(laptop("a", 1000.0)).unwrap();

        let err = store.save(laptop("a", 2000.0)).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(store.find("a").unwrap().price_usd, 1000.0);
    }

    #[test]
    fn missing_id_is_not_found() {
        let store = LaptopStore::new();
        assert!(matches!(store.find("ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn concurrent_saves_same_id_yield_one_winner() {
        let store = Arc::new(LaptopStore::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.save(laptop("contested", f64::from(i))).is_ok()
            }));
        }

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(successes, 1);
    }

    #[test]
    fn concurrent_saves_distinct_ids_all_succeed() {
        let store = Arc::new(LaptopStore::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.save(laptop(&format!("laptop-{i}"), 1000.0))
            }));
        }

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
    }

    #[test]
    fn search_visits_each_match_once() {
        let store = LaptopStore::new();
        for i in 0..4 {
            let mut l = laptop(&format!("laptop-{i}"), 1500.0);
            l.ram = Some(Memory {
                value: 16,
                unit: MemoryUnit::Gigabyte as i32,
            });
            store.save(l).unwrap();
        }
        store.save(laptop("pricey", 9000.0)).unwrap();

        let filter = Filter {
            max_price_usd: 2000.0,
            min_cpu_cores: 0,
            min_cpu_ghz: 0.0,
            min_ram: None,
        };

        let mut ids: Vec<String> = store.search(&filter).into_iter().map(|l| l.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert!(!ids.contains(&"pricey".to_string()));
    }
}
