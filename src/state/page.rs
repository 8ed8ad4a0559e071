use std::rc::Rc;

use thiserror::Error;

use super::store::KeyValueStore;

const LAST_ACTIVE_PAGE_KEY: &str = "lastActivePage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("page {page} is outside 1..={total}")]
    OutOfRange { page: u32, total: u32 },
}

/// Outcome of a page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    /// Already on the requested page; nothing to refetch
    Unchanged,
    /// The active page moved and the catalog must be refetched
    Changed { from: u32, to: u32 },
}

/// Keeps the list view's active page in step with navigation and with the
/// persisted "last active page".
pub struct PageStateController {
    active_page: u32,
    total_pages: u32,
    store: Rc<dyn KeyValueStore>,
}

impl PageStateController {
    /// Start on `requested` when it is a valid page, otherwise on page 1
    pub fn new(requested: Option<u32>, total_pages: u32, store: Rc<dyn KeyValueStore>) -> Self {
        let total_pages = total_pages.max(1);
        let active_page = match requested {
            Some(page) if (1..=total_pages).contains(&page) => page,
            Some(page) => {
                tracing::warn!(page, total_pages, "requested page out of range; starting on page 1");
                1
            }
            None => 1,
        };

        Self {
            active_page,
            total_pages,
            store,
        }
    }

    pub fn active_page(&self) -> u32 {
        self.active_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Move to page `page`.
    ///
    /// Requesting the current page is a no-op. Any other valid page becomes
    /// active and is persisted as the last active page.
    pub fn go_to_page(&mut self, page: u32) -> Result<PageSignal, PageError> {
        if page == self.active_page {
            return Ok(PageSignal::Unchanged);
        }
        if !(1..=self.total_pages).contains(&page) {
            return Err(PageError::OutOfRange {
                page,
                total: self.total_pages,
            });
        }

        let from = self.active_page;
        self.active_page = page;
        if let Err(err) = self.store.set(LAST_ACTIVE_PAGE_KEY, &page.to_string()) {
            tracing::warn!(%err, page, "failed to persist last active page");
        }

        tracing::debug!(from, to = page, "active page changed");
        Ok(PageSignal::Changed { from, to: page })
    }

    /// Reconcile with a page number coming from navigation.
    ///
    /// Navigation is authoritative: a mismatch moves the controller.
    pub fn reconcile(&mut self, requested: u32) -> Result<PageSignal, PageError> {
        self.go_to_page(requested)
    }

    /// Persisted last active page, if one is stored and still in range
    pub fn last_active_page(store: &dyn KeyValueStore, total_pages: u32) -> Option<u32> {
        let raw = store.get(LAST_ACTIVE_PAGE_KEY).ok()??;
        raw.trim()
            .parse::<u32>()
            .ok()
            .filter(|page| (1..=total_pages).contains(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::store::MemoryStore;

    fn controller(requested: Option<u32>) -> (Rc<MemoryStore>, PageStateController) {
        let store = Rc::new(MemoryStore::new());
        let controller = PageStateController::new(requested, 10, store.clone());
        (store, controller)
    }

    #[test]
    fn starts_on_requested_page_when_in_range() {
        let (_, c) = controller(Some(4));
        assert_eq!(c.active_page(), 4);
        assert_eq!(c.total_pages(), 10);
    }

    #[test]
    fn starts_on_first_page_without_valid_request() {
        assert_eq!(controller(None).1.active_page(), 1);
        assert_eq!(controller(Some(0)).1.active_page(), 1);
        assert_eq!(controller(Some(11)).1.active_page(), 1);
    }

    #[test]
    fn same_page_produces_no_signal() {
        let (store, mut c) = controller(Some(3));
        assert_eq!(c.go_to_page(3), Ok(PageSignal::Unchanged));
        assert_eq!(store.get(LAST_ACTIVE_PAGE_KEY).unwrap(), None);
    }

    #[test]
    fn new_page_signals_and_persists() {
        let (store, mut c) = controller(None);

        assert_eq!(c.go_to_page(5), Ok(PageSignal::Changed { from: 1, to: 5 }));
        assert_eq!(c.active_page(), 5);
        assert_eq!(store.get(LAST_ACTIVE_PAGE_KEY).unwrap().as_deref(), Some("5"));
        assert_eq!(PageStateController::last_active_page(&*store, 10), Some(5));
    }

    #[test]
    fn out_of_range_is_rejected_without_side_effects() {
        let (store, mut c) = controller(Some(2));

        assert_eq!(c.go_to_page(0), Err(PageError::OutOfRange { page: 0, total: 10 }));
        assert_eq!(c.go_to_page(11), Err(PageError::OutOfRange { page: 11, total: 10 }));
        assert_eq!(c.active_page(), 2);
        assert_eq!(store.get(LAST_ACTIVE_PAGE_KEY).unwrap(), None);
    }

    #[test]
    fn reconcile_follows_navigation() {
        let (_, mut c) = controller(Some(1));
        assert_eq!(c.reconcile(7), Ok(PageSignal::Changed { from: 1, to: 7 }));
        assert_eq!(c.reconcile(7), Ok(PageSignal::Unchanged));
    }

    #[test]
    fn last_active_page_ignores_garbage() {
        let store = MemoryStore::new();
        assert_eq!(PageStateController::last_active_page(&store, 10), None);

        store.set(LAST_ACTIVE_PAGE_KEY, "abc").unwrap();
        assert_eq!(PageStateController::last_active_page(&store, 10), None);

        store.set(LAST_ACTIVE_PAGE_KEY, "12").unwrap();
        assert_eq!(PageStateController::last_active_page(&store, 10), None);

        store.set(LAST_ACTIVE_PAGE_KEY, "9").unwrap();
        assert_eq!(PageStateController::last_active_page(&store, 10), Some(9));
    }
}
