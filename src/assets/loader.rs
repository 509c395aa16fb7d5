use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc,
    },
    thread::JoinHandle,
};

use rayon::prelude::*;

use crate::{
    assets::{PreparedImage, decode::decode_image, source::AssetSource},
    foundation::error::{BannerError, BannerResult},
    foundation::math::Fingerprint,
};

/// Default worker count for the fetch/decode pool. Loading is IO-bound, so this is independent
/// of the CPU count.
pub const DEFAULT_LOADER_THREADS: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Ordered, duplicate-free set of asset URIs.
///
/// Identity is order-independent: two sets holding the same URIs in different orders are the
/// same batch as far as caching is concerned.
pub struct UriSet {
    ordered: Vec<String>,
    sorted: Vec<String>,
    key: u64,
}

impl UriSet {
    pub fn new<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::<String>::new();
        for uri in uris {
            let uri = uri.into();
            let uri = uri.trim();
            if uri.is_empty() || ordered.iter().any(|u| u == uri) {
                continue;
            }
            ordered.push(uri.to_string());
        }

        let mut sorted = ordered.clone();
        sorted.sort();
        let mut hasher = Fingerprint::default();
        hasher.u64(sorted.len() as u64);
        for uri in &sorted {
            hasher.str(uri);
        }

        Self {
            ordered,
            sorted,
            key: hasher.value(),
        }
    }

    /// Order-independent identity hash.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// `true` when both sets contain exactly the same URIs.
    pub fn same_identity(&self, other: &UriSet) -> bool {
        self.key == other.key && self.sorted == other.sorted
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

#[derive(Clone, Debug)]
/// A URI paired with its decoded image, or `None` when it could not be loaded.
pub struct ResolvedAsset {
    /// Requested URI.
    pub uri: String,
    /// Decoded image; `None` means "skip this layer".
    pub image: Option<Arc<PreparedImage>>,
}

impl ResolvedAsset {
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }
}

#[derive(Clone, Debug)]
/// Aggregate result of one committed batch.
pub struct LoadedAssets {
    uris: UriSet,
    assets: BTreeMap<String, ResolvedAsset>,
    all_succeeded: bool,
}

impl LoadedAssets {
    /// Result for an empty batch.
    pub fn empty() -> Self {
        Self {
            uris: UriSet::new(Vec::<String>::new()),
            assets: BTreeMap::new(),
            all_succeeded: true,
        }
    }

    /// Build a result directly from already-decoded images. Useful for callers that decode
    /// elsewhere and for tests.
    pub fn from_images<I>(images: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<PreparedImage>)>,
    {
        let mut assets = BTreeMap::new();
        let mut order = Vec::new();
        for (uri, image) in images {
            order.push(uri.clone());
            assets.insert(
                uri.clone(),
                ResolvedAsset {
                    uri,
                    image: image.map(Arc::new),
                },
            );
        }
        let all_succeeded = assets.values().all(ResolvedAsset::is_loaded);
        Self {
            uris: UriSet::new(order),
            assets,
            all_succeeded,
        }
    }

    pub fn uris(&self) -> &UriSet {
        &self.uris
    }

    pub fn get(&self, uri: &str) -> Option<&ResolvedAsset> {
        self.assets.get(uri)
    }

    /// Decoded image for `uri`, if it was requested and loaded.
    pub fn image(&self, uri: &str) -> Option<&PreparedImage> {
        self.assets
            .get(uri.trim())
            .and_then(|a| a.image.as_deref())
    }

    pub fn all_succeeded(&self) -> bool {
        self.all_succeeded
    }

    /// Resolved assets in request order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedAsset> {
        self.uris.iter().filter_map(|u| self.assets.get(u))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Monotonically increasing batch generation.
pub struct BatchToken(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// `completed / total` for the batch in flight.
pub struct LoadProgress {
    pub completed: usize,
    pub total: usize,
}

impl LoadProgress {
    /// Integer percentage; an empty batch counts as complete.
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed.min(self.total) * 100) / self.total) as u8
    }
}

#[derive(Clone, Debug)]
/// Events streamed while a batch is loading.
pub enum LoadEvent {
    /// A new batch started.
    Started {
        token: BatchToken,
        total: usize,
    },
    /// One URI finished (successfully or not).
    Resolved {
        token: BatchToken,
        asset: ResolvedAsset,
        progress: LoadProgress,
    },
    /// The batch was committed.
    Finished {
        token: BatchToken,
        all_succeeded: bool,
    },
}

#[derive(Clone, Debug)]
/// Final outcome of [`AssetLoader::load`].
pub enum LoadOutcome {
    /// The requested set matched the committed set; nothing was fetched.
    Cached(Arc<LoadedAssets>),
    /// The batch finished and is now the committed result.
    Committed(Arc<LoadedAssets>),
    /// A newer batch started before this one finished; the result was discarded.
    Stale {
        token: BatchToken,
        superseded_by: BatchToken,
    },
    /// The loader was torn down while the batch was in flight.
    TornDown,
}

impl LoadOutcome {
    /// Assets for `Cached` and `Committed` outcomes.
    pub fn assets(&self) -> Option<&Arc<LoadedAssets>> {
        match self {
            LoadOutcome::Cached(a) | LoadOutcome::Committed(a) => Some(a),
            LoadOutcome::Stale { .. } | LoadOutcome::TornDown => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, LoadOutcome::Stale { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Diagnostic record for an asset that degraded to `None`.
pub struct AssetFailure {
    pub uri: String,
    pub reason: String,
}

/// Callback receiving [`AssetFailure`]s.
pub type DiagnosticFn = Arc<dyn Fn(&AssetFailure) + Send + Sync>;

#[derive(Clone, Debug, Default)]
pub struct AssetLoaderOpts {
    /// Worker threads for fetch/decode; `None` uses [`DEFAULT_LOADER_THREADS`].
    pub threads: Option<usize>,
}

struct LoaderState {
    generation: u64,
    committed: Option<Arc<LoadedAssets>>,
}

struct Shared {
    source: Arc<dyn AssetSource>,
    pool: rayon::ThreadPool,
    state: Mutex<LoaderState>,
    images: RwLock<HashMap<String, Arc<PreparedImage>>>,
    torn_down: AtomicBool,
    fetches: AtomicU64,
    diagnostics: Option<DiagnosticFn>,
}

/// Concurrent, race-free asset loader with an order-independent batch cache.
///
/// Every call to [`AssetLoader::load`] for a new URI set takes the next [`BatchToken`]; only the
/// batch holding the latest token may commit. Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct AssetLoader {
    shared: Arc<Shared>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>, opts: AssetLoaderOpts) -> BannerResult<Self> {
        Self::build(source, opts, None)
    }

    /// Loader that reports every degraded asset to `diagnostics`.
    pub fn with_diagnostics(
        source: Arc<dyn AssetSource>,
        opts: AssetLoaderOpts,
        diagnostics: DiagnosticFn,
    ) -> BannerResult<Self> {
        Self::build(source, opts, Some(diagnostics))
    }

    fn build(
        source: Arc<dyn AssetSource>,
        opts: AssetLoaderOpts,
        diagnostics: Option<DiagnosticFn>,
    ) -> BannerResult<Self> {
        Ok(Self {
            shared: Arc::new(Shared {
                source,
                pool: build_thread_pool(opts.threads)?,
                state: Mutex::new(LoaderState {
                    generation: 0,
                    committed: None,
                }),
                images: RwLock::new(HashMap::new()),
                torn_down: AtomicBool::new(false),
                fetches: AtomicU64::new(0),
                diagnostics,
            }),
        })
    }

    /// Load `uris`, streaming progress to `on_event`, and block until the batch settles.
    ///
    /// Failed or undecodable URIs resolve to `image: None`; the batch itself never fails.
    #[tracing::instrument(skip(self, uris, on_event), fields(total = uris.len()))]
    pub fn load(&self, uris: &UriSet, mut on_event: impl FnMut(LoadEvent)) -> LoadOutcome {
        let token = {
            let mut state = self.lock_state();
            if self.is_torn_down() {
                return LoadOutcome::TornDown;
            }
            state.generation += 1;
            let token = BatchToken(state.generation);
            if let Some(committed) = &state.committed
                && committed.uris().same_identity(uris)
            {
                // Still bump the generation so any in-flight batch for another set is superseded.
                tracing::debug!(token = token.0, "uri set unchanged; serving cached batch");
                return LoadOutcome::Cached(committed.clone());
            }
            token
        };

        tracing::debug!(token = token.0, "asset batch started");
        on_event(LoadEvent::Started {
            token,
            total: uris.len(),
        });

        let total = uris.len();
        let mut assets = BTreeMap::<String, ResolvedAsset>::new();
        let (tx, rx) = mpsc::channel::<ResolvedAsset>();
        let work: Vec<&str> = uris.iter().collect();

        std::thread::scope(|scope| {
            scope.spawn(move || {
                self.shared.pool.install(|| {
                    work.par_iter().for_each_with(tx, |tx, uri| {
                        let _ = tx.send(self.resolve(uri));
                    });
                });
            });

            for asset in rx {
                if self.is_current(token) {
                    on_event(LoadEvent::Resolved {
                        token,
                        asset: asset.clone(),
                        progress: LoadProgress {
                            completed: assets.len() + 1,
                            total,
                        },
                    });
                }
                assets.insert(asset.uri.clone(), asset);
            }
        });

        let all_succeeded = assets.values().all(ResolvedAsset::is_loaded);
        let loaded = Arc::new(LoadedAssets {
            uris: uris.clone(),
            assets,
            all_succeeded,
        });

        let mut state = self.lock_state();
        if self.is_torn_down() {
            tracing::debug!(token = token.0, "loader torn down; dropping batch");
            return LoadOutcome::TornDown;
        }
        if state.generation != token.0 {
            let superseded_by = BatchToken(state.generation);
            tracing::debug!(
                token = token.0,
                superseded_by = superseded_by.0,
                "stale batch discarded"
            );
            return LoadOutcome::Stale {
                token,
                superseded_by,
            };
        }
        state.committed = Some(loaded.clone());
        drop(state);

        on_event(LoadEvent::Finished {
            token,
            all_succeeded,
        });
        LoadOutcome::Committed(loaded)
    }

    /// Run [`AssetLoader::load`] on a background thread.
    pub fn spawn(&self, uris: UriSet) -> LoadHandle {
        let (tx, rx) = mpsc::channel();
        let loader = self.clone();
        let join = std::thread::spawn(move || {
            loader.load(&uris, |event| {
                let _ = tx.send(event);
            })
        });
        LoadHandle { events: rx, join }
    }

    /// The most recently committed batch.
    pub fn committed(&self) -> Option<Arc<LoadedAssets>> {
        self.lock_state().committed.clone()
    }

    /// Latest batch token handed out.
    pub fn current_token(&self) -> BatchToken {
        BatchToken(self.lock_state().generation)
    }

    /// Stop in-flight and future batches from mutating shared state.
    pub fn teardown(&self) {
        let _state = self.lock_state();
        self.shared.torn_down.store(true, Ordering::SeqCst);
    }

    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.load(Ordering::SeqCst)
    }

    /// Number of calls made to the underlying [`AssetSource`].
    pub fn fetch_count(&self) -> u64 {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    /// Number of decoded images held in the shared cache.
    pub fn cached_image_count(&self) -> usize {
        self.shared
            .images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn is_current(&self, token: BatchToken) -> bool {
        !self.is_torn_down() && self.lock_state().generation == token.0
    }

    fn lock_state(&self) -> MutexGuard<'_, LoaderState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, uri: &str) -> ResolvedAsset {
        let cached = self
            .shared
            .images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned();
        if let Some(image) = cached {
            return ResolvedAsset {
                uri: uri.to_string(),
                image: Some(image),
            };
        }

        self.shared.fetches.fetch_add(1, Ordering::SeqCst);
        let image = match self.fetch_and_decode(uri) {
            Ok(image) => {
                let image = Arc::new(image);
                if !self.is_torn_down() {
                    self.shared
                        .images
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .entry(uri.to_string())
                        .or_insert_with(|| image.clone());
                }
                Some(image)
            }
            Err(err) => {
                let failure = AssetFailure {
                    uri: uri.to_string(),
                    reason: err.to_string(),
                };
                tracing::warn!(uri, reason = %failure.reason, "asset unavailable; layer will be skipped");
                if let Some(diag) = &self.shared.diagnostics {
                    diag(&failure);
                }
                None
            }
        };

        ResolvedAsset {
            uri: uri.to_string(),
            image,
        }
    }

    fn fetch_and_decode(&self, uri: &str) -> BannerResult<PreparedImage> {
        let bytes = self.shared.source.fetch(uri)?;
        decode_image(&bytes)
    }
}

/// Handle for a batch running on a background thread.
pub struct LoadHandle {
    /// Progress events; the channel closes when the batch settles.
    pub events: mpsc::Receiver<LoadEvent>,
    join: JoinHandle<LoadOutcome>,
}

impl LoadHandle {
    /// Wait for the batch to settle.
    pub fn join(self) -> BannerResult<LoadOutcome> {
        self.join
            .join()
            .map_err(|_| BannerError::evaluation("asset load thread panicked"))
    }
}

fn build_thread_pool(threads: Option<usize>) -> BannerResult<rayon::ThreadPool> {
    let n = threads.unwrap_or(DEFAULT_LOADER_THREADS);
    if n == 0 {
        return Err(BannerError::validation("loader threads must be > 0"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .thread_name(|i| format!("bannerkit-loader-{i}"))
        .build()
        .map_err(|e| BannerError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
