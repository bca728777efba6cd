//! Debounced, cached recipient lookup with a multi-selection on top.
//!
//! Filter changes are recorded immediately but only resolved once the filters
//! have been quiet for [`QUIET_PERIOD`]. Every resolve is tagged with the key
//! of the filters it was issued for; a result is applied to the visible state
//! only if that key still matches the current filters. Superseded results
//! still land in the cache.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use campus_common::id::{prefix, prefixed_ulid};
use campus_common::{Role, UserId};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::directory::cache::{QueryCache, CACHE_TTL};
use crate::directory::model::{DirectoryUser, UserQuery};
use crate::directory::selection::{SelectedRecipient, SelectionSet};
use crate::directory::service::UserDirectory;
use crate::error::ClientError;

/// Default delay between the last filter change and the lookup.
pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

const FILTER_STREAM: &str = "filters";

/// What the user is searching for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientFilters {
    pub role: Option<Role>,
    pub search: String,
    /// Usually the current user, who should never be offered as a recipient.
    pub excluded_id: Option<UserId>,
}

impl RecipientFilters {
    pub fn new(role: Option<Role>, search: impl Into<String>, excluded_id: Option<UserId>) -> Self {
        Self {
            role,
            search: search.into(),
            excluded_id,
        }
    }

    /// Stable string key for the filter triple. Keys match exactly; a narrower
    /// search is a different key.
    pub fn cache_key(&self) -> String {
        serde_json::json!({
            "role": self.role,
            "search": self.search,
            "excluded": self.excluded_id,
        })
        .to_string()
    }

    fn query(&self) -> UserQuery {
        let search = self.search.trim();
        UserQuery {
            role: self.role,
            search: (!search.is_empty()).then(|| search.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    pub quiet_period: Duration,
    pub cache_ttl: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            quiet_period: QUIET_PERIOD,
            cache_ttl: CACHE_TTL,
        }
    }
}

impl From<&Config> for ResolverSettings {
    fn from(config: &Config) -> Self {
        Self {
            quiet_period: config.resolver_quiet_period,
            cache_ttl: config.resolver_cache_ttl,
        }
    }
}

/// Observable resolver state.
#[derive(Debug, Clone, Default)]
pub struct ResolverState {
    pub filters: RecipientFilters,
    /// Users for the current filters, in server order.
    pub resolved_users: Vec<DirectoryUser>,
    pub selection: SelectionSet,
    /// A resolve for the current filters is scheduled or in flight.
    pub loading: bool,
    pub error: Option<ClientError>,
}

impl ResolverState {
    pub fn selected_ids(&self) -> &[UserId] {
        self.selection.ids()
    }

    pub fn recipients(&self) -> Vec<SelectedRecipient> {
        self.selection.recipients(&self.resolved_users)
    }

    /// The last lookup failed because the session is no longer valid.
    pub fn needs_reauth(&self) -> bool {
        self.error.as_ref().is_some_and(ClientError::requires_reauth)
    }
}

/// Selection returned by [`RecipientResolver::toggle_selection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionView {
    pub ids: Vec<UserId>,
    pub recipients: Vec<SelectedRecipient>,
}

/// Recipient picker backed by a [`UserDirectory`].
///
/// Each instance owns its cache; dropping the resolver drops the cache and
/// cancels any pending lookup.
pub struct RecipientResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    directory: Arc<dyn UserDirectory>,
    cache: Mutex<QueryCache<Vec<DirectoryUser>>>,
    state: watch::Sender<ResolverState>,
    debouncer: Debouncer,
    quiet_period: Duration,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self::with_settings(directory, ResolverSettings::default())
    }

    pub fn with_settings(directory: Arc<dyn UserDirectory>, settings: ResolverSettings) -> Self {
        let (state, _) = watch::channel(ResolverState::default());
        Self {
            inner: Arc::new(ResolverInner {
                directory,
                cache: Mutex::new(QueryCache::new(settings.cache_ttl)),
                state,
                debouncer: Debouncer::new(),
                quiet_period: settings.quiet_period,
            }),
        }
    }

    pub fn snapshot(&self) -> ResolverState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolverState> {
        self.inner.state.subscribe()
    }

    /// Record new filters and schedule a lookup once they stop changing.
    ///
    /// Never fetches synchronously.
    pub fn set_filters(&self, filters: RecipientFilters) {
        tracing::trace!(key = %filters.cache_key(), "recipient filters changed");
        self.inner.state.send_modify(|state| {
            state.filters = filters;
            state.loading = true;
        });

        let inner = Arc::downgrade(&self.inner);
        self.inner
            .debouncer
            .schedule_after_quiet(FILTER_STREAM, self.inner.quiet_period, move || {
                refresh_if_alive(inner)
            });
    }

    /// Resolve `filters` through the cache, calling the directory on a miss.
    ///
    /// Does not touch the visible state.
    pub async fn resolve(&self, filters: &RecipientFilters) -> Result<Vec<DirectoryUser>, ClientError> {
        self.inner.resolve(filters).await
    }

    /// Re-resolve the current filters right away, skipping the quiet period.
    pub async fn retry(&self) {
        self.inner.debouncer.cancel(FILTER_STREAM);
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        self.inner.refresh().await;
    }

    /// Wait until no lookup is pending for the current filters.
    pub async fn settled(&self) -> ResolverState {
        let mut rx = self.inner.state.subscribe();
        let state = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => (*state).clone(),
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Add `id` to the selection if absent, remove it otherwise.
    pub fn toggle_selection(&self, id: &UserId) -> SelectionView {
        self.inner.state.send_modify(|state| {
            let record = state.resolved_users.iter().find(|user| user.id() == id).cloned();
            let selected = state.selection.toggle(id, record.as_ref());
            tracing::debug!(%id, selected, known = record.is_some(), "recipient toggled");
        });

        let state = self.inner.state.borrow();
        SelectionView {
            ids: state.selected_ids().to_vec(),
            recipients: state.recipients(),
        }
    }

    /// Seed the selection, e.g. from a saved draft. Unknown ids render by id
    /// until a lookup returns them.
    pub fn preselect(&self, ids: impl IntoIterator<Item = UserId>) {
        self.inner.state.send_modify(|state| {
            for id in ids {
                state.selection.insert(id);
            }
            state.selection.retain_records(&state.resolved_users);
        });
    }

    /// Empty the selection and filters. Cached results are kept.
    pub fn clear(&self) {
        self.inner.debouncer.cancel(FILTER_STREAM);
        self.inner.state.send_replace(ResolverState::default());
    }

    /// Drop every cached result.
    pub fn invalidate(&self) {
        let mut cache = self.inner.cache.lock();
        tracing::debug!(entries = cache.len(), "recipient cache invalidated");
        cache.clear();
    }
}

async fn refresh_if_alive(inner: Weak<ResolverInner>) {
    if let Some(inner) = inner.upgrade() {
        inner.refresh().await;
    }
}

impl ResolverInner {
    async fn refresh(&self) {
        let filters = self.state.borrow().filters.clone();
        let outcome = self.resolve(&filters).await;
        self.apply(&filters, outcome);
    }

    async fn resolve(&self, filters: &RecipientFilters) -> Result<Vec<DirectoryUser>, ClientError> {
        let key = filters.cache_key();
        let cached = self.cache.lock().get(&key);
        if let Some(users) = cached {
            tracing::debug!(%key, count = users.len(), "recipient cache hit");
            return Ok(users);
        }

        let request_id = prefixed_ulid(prefix::REQUEST);
        tracing::debug!(%request_id, %key, "recipient cache miss");

        let entries = match self.directory.list_users(&filters.query()).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(%request_id, %key, ?err, "directory lookup failed");
                return Err(err);
            }
        };
        let received = entries.len();

        let mut seen = HashSet::new();
        let users: Vec<DirectoryUser> = entries
            .into_iter()
            .filter(|entry| filters.excluded_id.as_ref() != Some(&entry.id))
            .filter_map(|entry| match DirectoryUser::try_from(entry) {
                Ok(user) => Some(user),
                Err(err) => {
                    tracing::debug!(%request_id, %err, "skipping directory entry");
                    None
                }
            })
            // Only complete records claim an id.
            .filter(|user| seen.insert(user.id().clone()))
            .collect();

        tracing::debug!(%request_id, received, kept = users.len(), "directory lookup resolved");
        self.cache.lock().insert(key, users.clone());
        Ok(users)
    }

    fn apply(&self, filters: &RecipientFilters, outcome: Result<Vec<DirectoryUser>, ClientError>) {
        let key = filters.cache_key();
        self.state.send_if_modified(|state| {
            if state.filters.cache_key() != key {
                tracing::debug!(%key, "discarding stale recipient result");
                return false;
            }
            state.loading = false;
            match outcome {
                Ok(users) => {
                    state.selection.retain_records(&users);
                    state.resolved_users = users;
                    state.error = None;
                }
                Err(err) => {
                    state.resolved_users.clear();
                    state.error = Some(err);
                }
            }
            true
        });
    }
}
