use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::data::DetailService;
use crate::omdb::{DetailRecord, OmdbError};

type Slot = Arc<OnceCell<Arc<DetailRecord>>>;

enum Miss {
    NotFound,
    Failed(OmdbError),
}

pub struct DetailCache {
    service: Arc<dyn DetailService>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl DetailCache {
    pub fn new(service: Arc<dyn DetailService>) -> Self {
        Self {
            service,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<DetailRecord>> {
        self.slots
            .lock()
            .get(id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Blocks the calling thread until the record is available. Concurrent
    /// callers for one id share a single request; misses and failures are
    /// not remembered, so the next caller retries.
    pub fn get_or_fetch(&self, id: &str) -> Result<Option<Arc<DetailRecord>>, OmdbError> {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(record) = slot.get() {
            return Ok(Some(record.clone()));
        }

        let outcome = slot.get_or_try_init(|| {
            debug!(id, "details: fetching");
            match self.service.details(id) {
                Ok(Some(record)) => Ok(Arc::new(record)),
                Ok(None) => Err(Miss::NotFound),
                Err(err) => Err(Miss::Failed(err)),
            }
        });

        match outcome {
            Ok(record) => Ok(Some(record.clone())),
            Err(Miss::NotFound) => {
                debug!(id, "details: no record upstream");
                Ok(None)
            }
            Err(Miss::Failed(err)) => {
                warn!(id, error = %err, "details: fetch failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_item, ScriptedDetailService};
    use crate::omdb::Poster;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn record(id: &str) -> DetailRecord {
        let item = sample_item(id, "The Matrix", "1999");
        DetailRecord {
            id: item.id,
            title: item.title,
            year: item.year,
            rated: "R".into(),
            released: "31 Mar 1999".into(),
            runtime: "136 min".into(),
            genre: "Action, Sci-Fi".into(),
            director: "Lana Wachowski, Lilly Wachowski".into(),
            plot: "A hacker learns the truth.".into(),
            language: "English".into(),
            country: "United States".into(),
            poster: Poster::Placeholder,
            imdb_rating: "8.7".into(),
            dvd: "N/A".into(),
            box_office: "N/A".into(),
            production: "N/A".into(),
            website: "N/A".into(),
        }
    }

    struct SlowService {
        calls: AtomicUsize,
    }

    impl DetailService for SlowService {
        fn details(&self, id: &str) -> Result<Option<DetailRecord>, OmdbError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(Some(record(id)))
        }
    }

    struct FailingService;

    impl DetailService for FailingService {
        fn details(&self, _id: &str) -> Result<Option<DetailRecord>, OmdbError> {
            Err(OmdbError::Upstream(None))
        }
    }

    #[test]
    fn second_lookup_is_served_from_memory() {
        let service = Arc::new(ScriptedDetailService::new(vec![record("tt0133093")]));
        let cache = DetailCache::new(service.clone());

        assert!(cache.get("tt0133093").is_none());
        let first = cache.get_or_fetch("tt0133093").unwrap().unwrap();
        let second = cache.get_or_fetch("tt0133093").unwrap().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.calls(), vec!["tt0133093".to_string()]);
        assert_eq!(cache.get("tt0133093").unwrap().rating(), Some("8.7"));
    }

    #[test]
    fn misses_are_retried() {
        let service = Arc::new(ScriptedDetailService::new(Vec::new()));
        let cache = DetailCache::new(service.clone());

        assert!(cache.get_or_fetch("tt404").unwrap().is_none());
        assert!(cache.get_or_fetch("tt404").unwrap().is_none());
        assert_eq!(service.calls().len(), 2);
        assert!(cache.get("tt404").is_none());
    }

    #[test]
    fn failures_propagate_and_are_not_cached() {
        let cache = DetailCache::new(Arc::new(FailingService));
        assert!(cache.get_or_fetch("tt1").is_err());
        assert!(cache.get("tt1").is_none());
    }

    #[test]
    fn concurrent_callers_share_one_request() {
        let service = Arc::new(SlowService {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(DetailCache::new(service.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.get_or_fetch("tt0133093").unwrap().unwrap())
            })
            .collect();
        let records: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert!(records.iter().all(|r| Arc::ptr_eq(r, &records[0])));
    }
}
