//! Collection administration: listing indexed collections and purging
//! documents by exact source.
//!
//! Both operations share one busy flag and one status message. The
//! listing is a snapshot; after a successful purge it is refreshed
//! according to the [`RefreshPolicy`]. With the default
//! [`RefreshPolicy::IfLoaded`] a listing is only re-fetched when one is
//! already held, so an operator who never asked for a listing never
//! triggers one.
//!
//! Listing fetches are sequenced: only the most recently started fetch
//! may replace the snapshot or report `List failed`. `busy` stays set
//! while any operation is outstanding.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::models::{Collection, CollectionList, DeleteRequest, DeleteResponse};
use crate::session::{decode_envelope, lock, Failure, Sequencer};
use crate::transport::{endpoints, Backend};

pub const EMPTY_SOURCE_MESSAGE: &str = "Enter a source (exact filename or page title).";

/// Whether a listing has been fetched.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ListingState {
    #[default]
    NotLoaded,
    Loaded(Vec<Collection>),
}

impl ListingState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ListingState::Loaded(_))
    }

    pub fn collections(&self) -> Option<&[Collection]> {
        match self {
            ListingState::Loaded(c) => Some(c),
            ListingState::NotLoaded => None,
        }
    }
}

/// When to re-fetch the listing after a successful purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    #[default]
    IfLoaded,
    Never,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminView {
    pub busy: bool,
    pub message: Option<String>,
    pub listing: ListingState,
}

#[derive(Default)]
struct State {
    in_flight: usize,
    message: Option<String>,
    listing: ListingState,
    listing_seq: Sequencer,
}

impl State {
    fn begin(&mut self) {
        self.in_flight += 1;
        self.message = None;
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}

pub struct AdminController {
    backend: Arc<dyn Backend>,
    collection: String,
    policy: RefreshPolicy,
    state: Mutex<State>,
}

impl AdminController {
    /// `collection` is the collection purges are scoped to.
    pub fn new(backend: Arc<dyn Backend>, collection: impl Into<String>) -> Self {
        Self {
            backend,
            collection: collection.into(),
            policy: RefreshPolicy::default(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn view(&self) -> AdminView {
        let s = lock(&self.state);
        AdminView {
            busy: s.in_flight > 0,
            message: s.message.clone(),
            listing: s.listing.clone(),
        }
    }

    /// Fetch the listing, replacing any held snapshot. Returns `true` on
    /// success; a fetch overtaken by a newer one returns `false` and leaves
    /// state untouched.
    pub async fn list_collections(&self) -> bool {
        lock(&self.state).begin();
        let ok = self.fetch_listing().await;
        lock(&self.state).finish();
        ok
    }

    /// Delete every document in the configured collection whose source is
    /// exactly `raw_source` (trimmed). Returns `true` on success.
    pub async fn delete_by_source(&self, raw_source: &str) -> bool {
        let source = raw_source.trim().to_string();
        if source.is_empty() {
            lock(&self.state).message = Some(EMPTY_SOURCE_MESSAGE.to_string());
            return false;
        }

        lock(&self.state).begin();

        let request = DeleteRequest {
            collection: self.collection.clone(),
            source: source.clone(),
        };
        debug!(collection = %request.collection, source = %request.source, "delete by source");

        let outcome = match serde_json::to_value(&request) {
            Ok(payload) => self
                .backend
                .send_json(endpoints::DELETE_DOCUMENTS, &payload)
                .await
                .map_err(Failure::from)
                .and_then(|body| {
                    decode_envelope::<DeleteResponse>(endpoints::DELETE_DOCUMENTS, body)
                }),
            Err(e) => Err(Failure::Validation(e.to_string())),
        };

        let ok = match outcome {
            Ok(resp) => {
                let deleted = resp.deleted.unwrap_or(0);
                let collection = resp.collection.unwrap_or_else(|| self.collection.clone());
                info!(deleted, %collection, %source, "purged documents");
                let refresh = {
                    let mut s = lock(&self.state);
                    s.message = Some(format!(
                        "Deleted {} docs from {} for source=\"{}\"",
                        deleted, collection, source
                    ));
                    self.policy == RefreshPolicy::IfLoaded && s.listing.is_loaded()
                };
                if refresh {
                    self.fetch_listing().await;
                }
                true
            }
            Err(failure) => {
                let reason = failure.message("unknown error");
                warn!(%source, error = %reason, "delete failed");
                lock(&self.state).message = Some(format!("Delete failed: {}", reason));
                false
            }
        };

        lock(&self.state).finish();
        ok
    }

    /// Fetch and store the listing. On failure the message is replaced;
    /// on success it is left untouched. Superseded fetches are dropped.
    async fn fetch_listing(&self) -> bool {
        let ticket = lock(&self.state).listing_seq.issue();
        let outcome = self
            .backend
            .get_json(endpoints::COLLECTIONS)
            .await
            .map_err(Failure::from)
            .and_then(|body| decode_envelope::<CollectionList>(endpoints::COLLECTIONS, body));

        let mut s = lock(&self.state);
        if !s.listing_seq.is_current(ticket) {
            warn!(seq = ticket.number(), "discarding superseded collection listing");
            return false;
        }
        match outcome {
            Ok(list) => {
                let collections = list.collections.unwrap_or_default();
                debug!(count = collections.len(), "collections listed");
                s.listing = ListingState::Loaded(collections);
                true
            }
            Err(failure) => {
                let reason = failure.message("unknown error");
                warn!(error = %reason, "listing failed");
                s.message = Some(format!("List failed: {}", reason));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedBackend;
    use serde_json::json;
    use tokio::sync::Notify;

    fn controller(backend: Arc<ScriptedBackend>) -> AdminController {
        AdminController::new(backend, "knowledge")
    }

    #[tokio::test]
    async fn test_blank_source_makes_no_call() {
        let backend = Arc::new(ScriptedBackend::new());
        let admin = controller(backend.clone());
        assert!(!admin.delete_by_source("").await);
        assert!(!admin.delete_by_source("   ").await);
        assert!(backend.calls().is_empty());
        assert_eq!(admin.view().message.as_deref(), Some(EMPTY_SOURCE_MESSAGE));
    }

    #[tokio::test]
    async fn test_list_replaces_snapshot() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::COLLECTIONS,
            Ok(json!({"collections": [{"name": "knowledge", "count": 12}, {"name": "scratch"}]})),
        );
        backend.respond(endpoints::COLLECTIONS, Ok(json!({"collections": []})));
        let admin = controller(backend);

        assert!(admin.list_collections().await);
        let listing = admin.view().listing;
        let collections = listing.collections().unwrap();
        assert_eq!(collections.len(), 2);
        assert_eq!(collections[1].count, None);

        assert!(admin.list_collections().await);
        assert_eq!(admin.view().listing, ListingState::Loaded(vec![]));
        assert!(!admin.view().busy);
    }

    #[tokio::test]
    async fn test_list_failure_message() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(endpoints::COLLECTIONS, Err((503, "down".into())));
        let admin = controller(backend);
        assert!(!admin.list_collections().await);
        let view = admin.view();
        assert!(view.message.unwrap().starts_with("List failed: HTTP 503"));
        assert_eq!(view.listing, ListingState::NotLoaded);
    }

    #[tokio::test]
    async fn test_delete_without_listing_does_not_refresh() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::DELETE_DOCUMENTS,
            Ok(json!({"deleted": 4, "collection": "knowledge"})),
        );
        let admin = controller(backend.clone());

        assert!(admin.delete_by_source("  my.pdf ").await);
        assert_eq!(backend.count(endpoints::COLLECTIONS), 0);
        let view = admin.view();
        assert_eq!(
            view.message.as_deref(),
            Some("Deleted 4 docs from knowledge for source=\"my.pdf\"")
        );
        assert_eq!(view.listing, ListingState::NotLoaded);
    }

    #[tokio::test]
    async fn test_delete_with_listing_refreshes_once() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            endpoints::COLLECTIONS,
            Ok(json!({"collections": [{"name": "knowledge", "count": 10}]})),
        );
        backend.respond(
            endpoints::DELETE_DOCUMENTS,
            Ok(json!({"deleted": 3, "collection": "knowledge"})),
        );
        backend.respond(
            endpoints::COLLECTIONS,
            Ok(json!({"collections": [{"name": "knowledge", "count": 7}]})),
        );
        let admin = controller(backend.clone());

        admin.list_collections().await;
        assert!(admin.delete_by_source("The Page Title").await);
        assert_eq!(backend.count(endpoints::COLLECTIONS), 2);

        let view = admin.view();
        assert_eq!(view.listing.collections().unwrap()[0].count, Some(7));
        assert!(view.message.unwrap().starts_with("Deleted 3 docs"));
    }

    #[tokio::test]
    async fn test_never_policy_skips_refresh() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(endpoints::COLLECTIONS, Ok(json!({"collections": []})));
        let admin = controller(backend.clone()).with_policy(RefreshPolicy::Never);
        admin.list_collections().await;
        admin.delete_by_source("x").await;
        assert_eq!(backend.count(endpoints::COLLECTIONS), 1);
    }

    #[tokio::test]
    async fn test_delete_request_body() {
        let backend = Arc::new(ScriptedBackend::new());
        let admin = controller(backend.clone());
        admin.delete_by_source(" a b ").await;
        match &backend.calls()[0] {
            crate::transport::testing::Call::Json { body, .. } => {
                assert_eq!(body, &json!({"collection": "knowledge", "source": "a b"}));
            }
            other => panic!("unexpected call {:?}", other),
        }
        // `{}` answer: missing count reads as zero, collection falls back.
        assert_eq!(
            admin.view().message.as_deref(),
            Some("Deleted 0 docs from knowledge for source=\"a b\"")
        );
    }

    #[tokio::test]
    async fn test_overlapping_lists_keep_newest_snapshot() {
        let backend = Arc::new(ScriptedBackend::new());
        let gate = Arc::new(Notify::new());
        backend.respond_after(
            endpoints::COLLECTIONS,
            Ok(json!({"collections": [{"name": "old", "count": 10}]})),
            gate.clone(),
        );
        backend.respond(
            endpoints::COLLECTIONS,
            Ok(json!({"collections": [{"name": "new", "count": 7}]})),
        );
        let admin = Arc::new(controller(backend.clone()));

        let slow = {
            let admin = admin.clone();
            tokio::spawn(async move { admin.list_collections().await })
        };
        while backend.count(endpoints::COLLECTIONS) < 1 {
            tokio::task::yield_now().await;
        }

        assert!(admin.list_collections().await);
        let view = admin.view();
        assert!(view.busy, "first fetch is still outstanding");
        assert_eq!(view.listing.collections().unwrap()[0].name, "new");

        gate.notify_one();
        assert!(!slow.await.unwrap());

        let view = admin.view();
        assert!(!view.busy);
        assert_eq!(
            view.listing,
            ListingState::Loaded(vec![Collection {
                name: "new".into(),
                count: Some(7),
            }])
        );
        assert_eq!(view.message, None);
    }

    #[tokio::test]
    async fn test_stale_list_failure_is_not_reported() {
        let backend = Arc::new(ScriptedBackend::new());
        let gate = Arc::new(Notify::new());
        backend.respond_after(endpoints::COLLECTIONS, Err((500, "down".into())), gate.clone());
        backend.respond(endpoints::COLLECTIONS, Ok(json!({"collections": []})));
        let admin = Arc::new(controller(backend.clone()));

        let slow = {
            let admin = admin.clone();
            tokio::spawn(async move { admin.list_collections().await })
        };
        while backend.count(endpoints::COLLECTIONS) < 1 {
            tokio::task::yield_now().await;
        }
        assert!(admin.list_collections().await);
        gate.notify_one();
        slow.await.unwrap();

        let view = admin.view();
        assert_eq!(view.message, None);
        assert_eq!(view.listing, ListingState::Loaded(vec![]));
    }

    #[tokio::test]
    async fn test_delete_failure_message() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(endpoints::DELETE_DOCUMENTS, Err((404, "Not Found".into())));
        let admin = controller(backend);
        assert!(!admin.delete_by_source("x").await);
        let view = admin.view();
        assert!(view.message.unwrap().starts_with("Delete failed: HTTP 404"));
        assert!(!view.busy);
    }
}
