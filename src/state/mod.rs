/// State management module
///
/// This module handles all application state, including:
/// - The persisted key-value store (store.rs)
/// - Catalog data structures (data.rs)
/// - Edit parameters and derived URLs (edit.rs, edit_url.rs)
/// - Per-image edit sessions (session.rs)
/// - The list view's active page (page.rs)
/// - Loading/error/success tracking for remote fetches (fetch.rs)

pub mod data;
pub mod edit;
pub mod edit_url;
pub mod fetch;
pub mod page;
pub mod session;
pub mod store;
