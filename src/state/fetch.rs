//! Fetch lifecycle for remote data.
//!
//! Every request goes through `begin`, which hands out a monotonically
//! increasing token and moves the state to `Loading`. A response is only
//! applied when its token is the most recently issued one, so a slow
//! earlier request can never overwrite a later one.

use std::collections::HashMap;
use std::fmt::Display;

use super::data::{ImageDetail, ImageSummary};
use super::session::{EditSession, EditSessionStore};

/// Identifies one initiated request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState<T> {
    Idle,
    Loading,
    Success(T),
    Failure(String),
}

impl<T> FetchState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Failure(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Fetcher<T> {
    state: FetchState<T>,
    latest: u64,
}

impl<T> Default for Fetcher<T> {
    fn default() -> Self {
        Self {
            state: FetchState::Idle,
            latest: 0,
        }
    }
}

impl<T> Fetcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    /// Start a new request, superseding any still in flight
    pub fn begin(&mut self) -> RequestToken {
        self.latest += 1;
        self.state = FetchState::Loading;
        RequestToken(self.latest)
    }

    /// Apply a response. Returns false when the response is stale and was dropped.
    pub fn resolve<E: Display>(&mut self, token: RequestToken, result: Result<T, E>) -> bool {
        if token.0 != self.latest {
            tracing::debug!(token = token.0, latest = self.latest, "discarding stale response");
            return false;
        }

        self.state = match result {
            Ok(data) => FetchState::Success(data),
            Err(err) => {
                tracing::warn!(%err, "fetch failed");
                FetchState::Failure(err.to_string())
            }
        };
        true
    }
}

/// One page of the catalog at a time
#[derive(Debug)]
pub struct CatalogFetcher {
    fetcher: Fetcher<Vec<ImageSummary>>,
    page_size: usize,
    requested_page: Option<u32>,
}

impl CatalogFetcher {
    pub fn new(page_size: usize) -> Self {
        Self {
            fetcher: Fetcher::new(),
            page_size,
            requested_page: None,
        }
    }

    pub fn state(&self) -> &FetchState<Vec<ImageSummary>> {
        self.fetcher.state()
    }

    /// Page of the most recently initiated request
    pub fn requested_page(&self) -> Option<u32> {
        self.requested_page
    }

    pub fn begin(&mut self, page: u32) -> RequestToken {
        self.requested_page = Some(page);
        let token = self.fetcher.begin();
        tracing::debug!(page, token = token.0, "catalog fetch started");
        token
    }

    pub fn resolve<E: Display>(
        &mut self,
        token: RequestToken,
        result: Result<Vec<ImageSummary>, E>,
    ) -> bool {
        let page_size = self.page_size;
        let result = result.map(|mut images| {
            images.truncate(page_size);
            images
        });
        self.fetcher.resolve(token, result)
    }
}

/// Metadata for the image being edited, plus any session restored for it
#[derive(Debug, Default)]
pub struct ImageDetailFetcher {
    fetcher: Fetcher<ImageDetail>,
    requested_id: Option<String>,
    restored: Option<EditSession>,
}

impl ImageDetailFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState<ImageDetail> {
        self.fetcher.state()
    }

    /// Session found for the image when its metadata arrived
    pub fn restored(&self) -> Option<&EditSession> {
        self.restored.as_ref()
    }

    pub fn begin(&mut self, image_id: &str) -> RequestToken {
        self.requested_id = Some(image_id.to_string());
        self.restored = None;
        let token = self.fetcher.begin();
        tracing::debug!(image_id, token = token.0, "image detail fetch started");
        token
    }

    /// Apply a response; on success, look up the saved session under the
    /// id that was requested, which is the id sessions are saved under.
    pub fn resolve<E: Display>(
        &mut self,
        token: RequestToken,
        result: Result<ImageDetail, E>,
        sessions: &EditSessionStore,
    ) -> bool {
        if !self.fetcher.resolve(token, result) {
            return false;
        }
        if let (Some(_), Some(image_id)) = (self.fetcher.state().data(), &self.requested_id) {
            self.restored = sessions.load(image_id);
        }
        true
    }
}

#[derive(Debug)]
struct KeyedEntry<T> {
    latest: u64,
    state: FetchState<T>,
}

/// Independent requests keyed by a string (a picture URL, an image id).
///
/// Each key only accepts the response to its most recent `begin`. Tokens
/// come from one counter shared by all keys, so a token can never be
/// reused for a key even after `forget`.
#[derive(Debug)]
pub struct KeyedFetcher<T> {
    entries: HashMap<String, KeyedEntry<T>>,
    issued: u64,
}

impl<T> Default for KeyedFetcher<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            issued: 0,
        }
    }
}

impl<T> KeyedFetcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: &str) -> Option<&FetchState<T>> {
        self.entries.get(key).map(|entry| &entry.state)
    }

    /// Loading or already loaded
    pub fn is_pending_or_done(&self, key: &str) -> bool {
        matches!(
            self.state(key),
            Some(FetchState::Loading | FetchState::Success(_))
        )
    }

    pub fn begin(&mut self, key: &str) -> RequestToken {
        self.issued += 1;
        self.entries.insert(
            key.to_string(),
            KeyedEntry {
                latest: self.issued,
                state: FetchState::Loading,
            },
        );
        RequestToken(self.issued)
    }

    /// Apply a response for `key`. Returns false when it was superseded or
    /// the key was forgotten.
    pub fn resolve<E: Display>(&mut self, key: &str, token: RequestToken, result: Result<T, E>) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            tracing::debug!(key, token = token.0, "discarding response for forgotten key");
            return false;
        };
        if token.0 != entry.latest {
            tracing::debug!(key, token = token.0, latest = entry.latest, "discarding stale response");
            return false;
        }

        entry.state = match result {
            Ok(data) => FetchState::Success(data),
            Err(err) => {
                tracing::warn!(key, %err, "fetch failed");
                FetchState::Failure(err.to_string())
            }
        };
        true
    }

    /// Drop every key `keep` rejects
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::edit::EditParams;
    use crate::state::store::MemoryStore;
    use std::rc::Rc;

    fn page(ids: &[&str]) -> Vec<ImageSummary> {
        ids.iter()
            .map(|id| ImageSummary {
                id: id.to_string(),
                author: format!("author {id}"),
                download_url: format!("https://picsum.photos/id/{id}/100/100"),
            })
            .collect()
    }

    fn detail(id: &str) -> ImageDetail {
        ImageDetail {
            id: id.to_string(),
            author: "André Spieker".to_string(),
            width: 3500,
            height: 2095,
            url: "https://unsplash.com/photos/8wTPqxlnKM4".to_string(),
            download_url: format!("https://picsum.photos/id/{id}/3500/2095"),
        }
    }

    #[test]
    fn fetcher_starts_idle_and_loads() {
        let mut fetcher: Fetcher<u32> = Fetcher::new();
        assert_eq!(fetcher.state(), &FetchState::Idle);

        let token = fetcher.begin();
        assert_eq!(fetcher.state(), &FetchState::Loading);

        assert!(fetcher.resolve::<String>(token, Ok(7)));
        assert_eq!(fetcher.state().data(), Some(&7));
    }

    #[test]
    fn failure_keeps_message() {
        let mut fetcher: Fetcher<u32> = Fetcher::new();
        let token = fetcher.begin();
        assert!(fetcher.resolve(token, Err("Error: Not Found")));
        assert_eq!(fetcher.state().error(), Some("Error: Not Found"));
    }

    #[test]
    fn begin_always_returns_to_loading() {
        let mut fetcher: Fetcher<u32> = Fetcher::new();
        let token = fetcher.begin();
        fetcher.resolve::<String>(token, Ok(1));

        let next = fetcher.begin();
        assert!(next > token);
        assert_eq!(fetcher.state(), &FetchState::Loading);
    }

    #[test]
    fn stale_catalog_response_resolving_last_is_discarded() {
        let mut catalog = CatalogFetcher::new(6);
        let first = catalog.begin(1);
        let second = catalog.begin(2);

        assert!(catalog.resolve::<String>(second, Ok(page(&["20", "21"]))));
        assert!(!catalog.resolve::<String>(first, Ok(page(&["10", "11"]))));

        assert_eq!(catalog.requested_page(), Some(2));
        assert_eq!(catalog.state().data(), Some(&page(&["20", "21"])));
    }

    #[test]
    fn stale_catalog_response_resolving_first_is_discarded() {
        let mut catalog = CatalogFetcher::new(6);
        let first = catalog.begin(1);
        let second = catalog.begin(2);

        assert!(!catalog.resolve::<String>(first, Ok(page(&["10", "11"]))));
        assert_eq!(catalog.state(), &FetchState::Loading);

        assert!(catalog.resolve::<String>(second, Ok(page(&["20", "21"]))));
        assert_eq!(catalog.state().data(), Some(&page(&["20", "21"])));
    }

    #[test]
    fn stale_failure_cannot_clobber_success() {
        let mut catalog = CatalogFetcher::new(6);
        let first = catalog.begin(1);
        let second = catalog.begin(2);

        catalog.resolve::<String>(second, Ok(page(&["20"])));
        catalog.resolve(first, Err("timed out"));

        assert_eq!(catalog.state().error(), None);
        assert_eq!(catalog.state().data(), Some(&page(&["20"])));
    }

    #[test]
    fn catalog_page_is_bounded() {
        let mut catalog = CatalogFetcher::new(6);
        let token = catalog.begin(3);
        catalog.resolve::<String>(token, Ok(page(&["1", "2", "3", "4", "5", "6", "7", "8"])));

        assert_eq!(catalog.state().data().map(Vec::len), Some(6));
    }

    #[test]
    fn detail_restores_saved_session() {
        let sessions = EditSessionStore::new(Rc::new(MemoryStore::new()));
        let params = EditParams {
            width: 200,
            height: 100,
            blur: 5,
            greyscale: true,
        };
        let url = "https://picsum.photos/id/237/200/100?blur=5&grayscale";
        sessions.save("237", &params, Some(url)).unwrap();

        let mut fetcher = ImageDetailFetcher::new();
        let token = fetcher.begin("237");
        assert!(fetcher.resolve::<String>(token, Ok(detail("237")), &sessions));

        let restored = fetcher.restored().unwrap();
        assert_eq!(restored.params, params);
        assert_eq!(restored.derived_url.as_deref(), Some(url));
    }

    #[test]
    fn detail_without_session_restores_nothing() {
        let sessions = EditSessionStore::new(Rc::new(MemoryStore::new()));
        let mut fetcher = ImageDetailFetcher::new();
        let token = fetcher.begin("10");
        fetcher.resolve::<String>(token, Ok(detail("10")), &sessions);

        assert!(fetcher.restored().is_none());
        assert_eq!(fetcher.state().data().map(|d| d.id.as_str()), Some("10"));
    }

    #[test]
    fn stale_detail_response_is_discarded() {
        let sessions = EditSessionStore::new(Rc::new(MemoryStore::new()));
        let ten = EditParams {
            width: 10,
            height: 10,
            blur: 1,
            greyscale: false,
        };
        sessions.save("10", &ten, None).unwrap();

        let mut fetcher = ImageDetailFetcher::new();
        let first = fetcher.begin("10");
        let second = fetcher.begin("237");

        assert!(fetcher.resolve::<String>(second, Ok(detail("237")), &sessions));
        assert!(!fetcher.resolve::<String>(first, Ok(detail("10")), &sessions));

        assert_eq!(fetcher.state().data().map(|d| d.id.as_str()), Some("237"));
        assert!(fetcher.restored().is_none());
    }

    #[test]
    fn session_is_looked_up_by_requested_id() {
        let sessions = EditSessionStore::new(Rc::new(MemoryStore::new()));
        let params = EditParams {
            blur: 3,
            ..EditParams::default()
        };
        sessions.save("237", &params, None).unwrap();

        // Server echoes the id in a different form
        let mut echoed = detail("237");
        echoed.id = "0237".to_string();

        let mut fetcher = ImageDetailFetcher::new();
        let token = fetcher.begin("237");
        fetcher.resolve::<String>(token, Ok(echoed), &sessions);

        let restored = fetcher.restored().unwrap();
        assert_eq!(restored.image_id, "237");
        assert_eq!(restored.params, params);
    }

    #[test]
    fn keyed_requests_are_independent() {
        let mut pictures: KeyedFetcher<u32> = KeyedFetcher::new();
        let a = pictures.begin("a");
        let b = pictures.begin("b");

        assert!(pictures.resolve::<String>("b", b, Ok(2)));
        assert!(pictures.resolve::<String>("a", a, Ok(1)));

        assert_eq!(pictures.state("a").and_then(FetchState::data), Some(&1));
        assert_eq!(pictures.state("b").and_then(FetchState::data), Some(&2));
        assert!(pictures.state("c").is_none());
    }

    #[test]
    fn keyed_stale_response_is_discarded() {
        let mut saves: KeyedFetcher<String> = KeyedFetcher::new();
        let first = saves.begin("237");
        let second = saves.begin("237");

        assert!(!saves.resolve::<String>("237", first, Ok("old".to_string())));
        assert_eq!(saves.state("237"), Some(&FetchState::Loading));

        assert!(saves.resolve::<String>("237", second, Ok("new".to_string())));
        assert_eq!(
            saves.state("237").and_then(FetchState::data).map(String::as_str),
            Some("new")
        );
    }

    #[test]
    fn forgotten_key_rejects_late_response() {
        let mut pictures: KeyedFetcher<u32> = KeyedFetcher::new();
        let token = pictures.begin("a");
        pictures.retain(|key| key != "a");

        assert!(!pictures.resolve::<String>("a", token, Ok(1)));
        assert!(pictures.state("a").is_none());

        let again = pictures.begin("a");
        assert!(again > token);
        assert!(pictures.is_pending_or_done("a"));
    }

    #[test]
    fn detail_failure_skips_session_lookup() {
        let sessions = EditSessionStore::new(Rc::new(MemoryStore::new()));
        sessions.save("237", &EditParams::default(), None).unwrap();

        let mut fetcher = ImageDetailFetcher::new();
        let token = fetcher.begin("237");
        fetcher.resolve(token, Err("Failed to fetch image details"), &sessions);

        assert!(fetcher.restored().is_none());
        assert_eq!(fetcher.state().error(), Some("Failed to fetch image details"));
    }
}
