//! Process-wide lazy acquisition of the pdfium rasterization engine.
//!
//! ## Why a shared in-flight future?
//!
//! Binding pdfium means a `dlopen` plus library initialisation — work that
//! must happen at most once per process. Several submissions can race to
//! convert their first document, so [`acquire`] has to hand every concurrent
//! caller the *same* result without ever running the initialisation twice.
//! An [`EngineLoader`] keeps an explicit three-state cell:
//!
//! ```text
//! Idle ──first caller──▶ Loading(Shared<init future>) ──Ok──▶ Ready(handle)
//!   ▲                                                 │
//!   └──────────────────── Err ────────────────────────┘
//! ```
//!
//! Callers that arrive during `Loading` clone the shared future and await
//! the same outcome. Success is cached for the process lifetime; failure is
//! delivered identically to every waiter and then cleared, so the next
//! caller retries from scratch. Memoized success, never memoized failure.
//!
//! ## Library resolution
//!
//! The engine binds to the pdfium dynamic library exactly once, during
//! initialisation: `PDFIUM_LIB_PATH` env override, then the platform library
//! next to the current directory, then the system library.

use crate::error::EngineError;
use futures::future::{BoxFuture, FutureExt, Shared};
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// The shared, process-wide rasterization capability.
pub type EngineHandle = Arc<RenderEngine>;

/// Wrapper around a bound [`Pdfium`] instance.
///
/// Constructed only by the loader; configuration (the library binding) is
/// fixed at construction and never changes afterwards.
pub struct RenderEngine {
    pdfium: Pdfium,
}

// SAFETY: the `thread_safe` feature serialises all pdfium FFI calls behind
// a global lock, so sharing the binding across threads is sound.
unsafe impl Send for RenderEngine {}
unsafe impl Sync for RenderEngine {}

impl RenderEngine {
    /// Access the underlying pdfium binding.
    pub fn pdfium(&self) -> &Pdfium {
        &self.pdfium
    }
}

type InitFuture<T> = Shared<BoxFuture<'static, Result<T, EngineError>>>;

enum LoadState<T: Clone> {
    Idle,
    Loading(InitFuture<T>),
    Ready(T),
}

/// A lazily-initialised shared cell with reset-on-failure.
///
/// Generic so the concurrency contract is testable without a real pdfium
/// library; the crate uses a single `static` instance via [`acquire`].
pub struct EngineLoader<T: Clone> {
    state: Arc<Mutex<LoadState<T>>>,
}

impl<T: Clone + Send + Sync + 'static> EngineLoader<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoadState::Idle)),
        }
    }

    /// Return the cached handle, join an in-flight initialisation, or start
    /// a new one with `init`.
    ///
    /// `init` is only invoked when the cell is `Idle`; callers joining an
    /// in-flight attempt never trigger a second initialisation.
    pub async fn acquire_with<F, Fut>(&self, init: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EngineError>> + Send + 'static,
    {
        let shared = {
            let mut state = self.state.lock().expect("engine loader state poisoned");
            match &*state {
                LoadState::Ready(handle) => return Ok(handle.clone()),
                LoadState::Loading(in_flight) => in_flight.clone(),
                LoadState::Idle => {
                    let cell = Arc::clone(&self.state);
                    let fut = init();
                    // The future itself performs the state transition on
                    // completion. It runs exactly once no matter how many
                    // clones exist, so the transition is exactly-once too.
                    let shared: InitFuture<T> = async move {
                        let result = fut.await;
                        let mut state = cell.lock().expect("engine loader state poisoned");
                        match &result {
                            Ok(handle) => *state = LoadState::Ready(handle.clone()),
                            Err(_) => *state = LoadState::Idle,
                        }
                        result
                    }
                    .boxed()
                    .shared();
                    *state = LoadState::Loading(shared.clone());
                    shared
                }
            }
        };

        shared.await
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EngineLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Process-wide loader ──────────────────────────────────────────────────

static ENGINE: Lazy<EngineLoader<EngineHandle>> = Lazy::new(EngineLoader::new);

/// Acquire the shared rendering engine, initialising it on first use.
///
/// Suspends while another caller's initialisation is in flight and returns
/// that caller's result. After a failed initialisation the next call starts
/// over.
pub async fn acquire() -> Result<EngineHandle, EngineError> {
    ENGINE.acquire_with(init_engine).await
}

async fn init_engine() -> Result<EngineHandle, EngineError> {
    info!("Initialising pdfium engine");
    // dlopen and pdfium setup are blocking; keep them off the async workers.
    let engine = tokio::task::spawn_blocking(bind_engine)
        .await
        .map_err(|e| EngineError::Init(e.to_string()))??;
    debug!("pdfium engine ready");
    Ok(Arc::new(engine))
}

fn bind_engine() -> Result<RenderEngine, EngineError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path)
            .map_err(|e| EngineError::Bind(format!("PDFIUM_LIB_PATH '{path}': {e:?}")))?,
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| EngineError::Bind(format!("{e:?}")))?,
    };

    Ok(RenderEngine {
        pdfium: Pdfium::new(bindings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    fn counting_init(
        count: Arc<AtomicUsize>,
        result: Result<Arc<String>, EngineError>,
    ) -> impl Future<Output = Result<Arc<String>, EngineError>> + Send + 'static {
        async move {
            count.fetch_add(1, Ordering::SeqCst);
            // Long enough that concurrent callers land in Loading.
            sleep(Duration::from_millis(20)).await;
            result
        }
    }

    #[tokio::test]
    async fn concurrent_acquire_runs_init_once_and_shares_the_handle() {
        let loader = EngineLoader::new();
        let count = Arc::new(AtomicUsize::new(0));

        let (a, b, c) = tokio::join!(
            loader.acquire_with(|| counting_init(
                Arc::clone(&count),
                Ok(Arc::new("engine".to_string()))
            )),
            loader.acquire_with(|| counting_init(
                Arc::clone(&count),
                Ok(Arc::new("other".to_string()))
            )),
            loader.acquire_with(|| counting_init(
                Arc::clone(&count),
                Ok(Arc::new("another".to_string()))
            )),
        );

        assert_eq!(count.load(Ordering::SeqCst), 1, "init must run exactly once");

        let a = a.expect("first caller succeeds");
        let b = b.expect("second caller succeeds");
        let c = c.expect("third caller succeeds");
        assert!(Arc::ptr_eq(&a, &b), "all callers share one handle");
        assert!(Arc::ptr_eq(&a, &c), "all callers share one handle");
        assert_eq!(*a, "engine", "only the first caller's init ran");
    }

    #[tokio::test]
    async fn ready_handle_is_returned_without_reinitialising() {
        let loader = EngineLoader::new();
        let count = Arc::new(AtomicUsize::new(0));

        let first = loader
            .acquire_with(|| counting_init(Arc::clone(&count), Ok(Arc::new("engine".to_string()))))
            .await
            .expect("init succeeds");

        let second = loader
            .acquire_with(|| counting_init(Arc::clone(&count), Ok(Arc::new("fresh".to_string()))))
            .await
            .expect("cached handle");

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn concurrent_waiters_see_the_same_failure() {
        let loader = EngineLoader::new();
        let count = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            loader.acquire_with(|| counting_init(
                Arc::clone(&count),
                Err(EngineError::Bind("library missing".into()))
            )),
            loader.acquire_with(|| counting_init(
                Arc::clone(&count),
                Err(EngineError::Bind("never runs".into()))
            )),
        );

        assert_eq!(count.load(Ordering::SeqCst), 1, "one failed init, shared");
        let a = a.expect_err("first waiter fails");
        let b = b.expect_err("second waiter fails");
        assert!(a.to_string().contains("library missing"));
        assert_eq!(a.to_string(), b.to_string(), "identical failure for all waiters");
    }

    #[tokio::test]
    async fn failed_init_is_retried_not_memoized() {
        let loader = EngineLoader::new();
        let count = Arc::new(AtomicUsize::new(0));

        let first = loader
            .acquire_with(|| counting_init(Arc::clone(&count), Err(EngineError::Bind("boom".into()))))
            .await;
        assert!(first.is_err());

        let second = loader
            .acquire_with(|| counting_init(Arc::clone(&count), Ok(Arc::new("engine".to_string()))))
            .await
            .expect("retry after failure succeeds");

        assert_eq!(count.load(Ordering::SeqCst), 2, "failure clears the cell");
        assert_eq!(*second, "engine");
    }
}
