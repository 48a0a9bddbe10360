use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::omdb::{self, DetailRecord, OmdbError, Poster, ResultItem, SearchPage};

pub trait SearchService: Send + Sync {
    fn search(&self, query: &str, page: u32) -> Result<SearchPage, OmdbError>;
}

pub trait DetailService: Send + Sync {
    fn details(&self, id: &str) -> Result<Option<DetailRecord>, OmdbError>;
}

pub struct OmdbSearchService {
    client: Arc<omdb::Client>,
}

impl OmdbSearchService {
    pub fn new(client: Arc<omdb::Client>) -> Self {
        Self { client }
    }
}

impl SearchService for OmdbSearchService {
    fn search(&self, query: &str, page: u32) -> Result<SearchPage, OmdbError> {
        self.client.search(query, page)
    }
}

pub struct OmdbDetailService {
    client: Arc<omdb::Client>,
}

impl OmdbDetailService {
    pub fn new(client: Arc<omdb::Client>) -> Self {
        Self { client }
    }
}

impl DetailService for OmdbDetailService {
    fn details(&self, id: &str) -> Result<Option<DetailRecord>, OmdbError> {
        self.client.details(id)
    }
}

/// In-memory stand-in for the OMDb gateway. Queries match titles by
/// case-insensitive substring and are paginated ten at a time, like the real
/// service. Every call is recorded.
#[derive(Default)]
pub struct ScriptedSearchService {
    catalog: Vec<ResultItem>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedSearchService {
    pub fn new(catalog: Vec<ResultItem>) -> Self {
        Self {
            catalog,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn demo() -> Self {
        Self::new(demo_catalog())
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().clone()
    }
}

impl SearchService for ScriptedSearchService {
    fn search(&self, query: &str, page: u32) -> Result<SearchPage, OmdbError> {
        self.calls.lock().push((query.to_string(), page));
        let needle = query.to_lowercase();
        let matches: Vec<&ResultItem> = self
            .catalog
            .iter()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .collect();
        if matches.is_empty() {
            return Err(OmdbError::Upstream(Some("Movie not found!".into())));
        }
        let start = (page.max(1) as usize - 1) * omdb::PAGE_SIZE;
        if start >= matches.len() {
            return Err(OmdbError::Upstream(Some("Movie not found!".into())));
        }
        Ok(SearchPage {
            total_count: matches.len(),
            items: matches
                .into_iter()
                .skip(start)
                .take(omdb::PAGE_SIZE)
                .cloned()
                .collect(),
        })
    }
}

#[derive(Default)]
pub struct ScriptedDetailService {
    records: HashMap<String, DetailRecord>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDetailService {
    pub fn new(records: Vec<DetailRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn demo() -> Self {
        Self::new(
            demo_catalog()
                .iter()
                .enumerate()
                .map(|(idx, item)| demo_record(item, idx))
                .collect(),
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl DetailService for ScriptedDetailService {
    fn details(&self, id: &str) -> Result<Option<DetailRecord>, OmdbError> {
        self.calls.lock().push(id.to_string());
        Ok(self.records.get(id).cloned())
    }
}

pub fn sample_item(id: &str, title: &str, year: &str) -> ResultItem {
    ResultItem {
        id: id.to_string(),
        title: title.to_string(),
        year: year.to_string(),
        poster: Poster::Placeholder,
        media_type: "movie".to_string(),
    }
}

fn demo_catalog() -> Vec<ResultItem> {
    const SEEDS: [(&str, u32); 6] = [
        ("Avengers", 28),
        ("Batman", 23),
        ("Matrix", 7),
        ("Alien", 12),
        ("Star Trek", 15),
        ("Casablanca", 1),
    ];
    let mut items = Vec::new();
    for (seed_idx, (title, count)) in SEEDS.iter().enumerate() {
        for n in 0..*count {
            let title = if n == 0 {
                title.to_string()
            } else {
                format!("{title} Part {}", n + 1)
            };
            items.push(sample_item(
                &format!("tt{:02}{:05}", seed_idx + 1, n + 1),
                &title,
                &(1970 + (n * 2) % 54).to_string(),
            ));
        }
    }
    items
}

fn demo_record(item: &ResultItem, idx: usize) -> DetailRecord {
    const LANGUAGES: [&str; 3] = ["English", "English, French", "Japanese"];
    DetailRecord {
        id: item.id.clone(),
        title: item.title.clone(),
        year: item.year.clone(),
        rated: "PG-13".into(),
        released: format!("01 Jan {}", item.year),
        runtime: format!("{} min", 90 + idx % 60),
        genre: "Action, Adventure".into(),
        director: "N/A".into(),
        plot: format!("A demo record for {}.", item.title),
        language: LANGUAGES[idx % LANGUAGES.len()].into(),
        country: "United States".into(),
        poster: item.poster.clone(),
        imdb_rating: format!("{}.{}", 5 + idx % 5, idx % 10),
        dvd: if idx % 2 == 0 { "N/A".into() } else { "01 Jun 2010".into() },
        box_office: "N/A".into(),
        production: "N/A".into(),
        website: "N/A".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_search_paginates_by_ten() {
        let service = ScriptedSearchService::demo();
        let first = service.search("batman", 1).unwrap();
        let third = service.search("batman", 3).unwrap();
        assert_eq!(first.total_count, 23);
        assert_eq!(first.items.len(), 10);
        assert_eq!(third.items.len(), 3);
        assert_eq!(service.calls(), vec![("batman".to_string(), 1), ("batman".to_string(), 3)]);
    }

    #[test]
    fn scripted_search_reports_not_found() {
        let service = ScriptedSearchService::demo();
        let err = service.search("zzzqqq", 1).unwrap_err();
        assert_eq!(err.user_message(), "Movie not found!");
    }

    #[test]
    fn demo_records_cover_catalog() {
        let service = ScriptedDetailService::demo();
        let record = service.details("tt0100001").unwrap().unwrap();
        assert_eq!(record.title, "Avengers");
        assert!(service.details("missing").unwrap().is_none());
    }
}
