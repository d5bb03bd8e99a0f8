//! Change tracking, validation and batch apply for the Motion camera
//! daemon's web configuration API.
//!
//! motionctl sits between a settings UI and the daemon. It keeps the last
//! fetched configuration, layers the user's unsaved edits over it for
//! display, validates every edit as it is made, and submits edits as one
//! batch per scope. Batch responses are reconciled per parameter:
//!
//! - applied edits leave the pending set,
//! - rejected edits stay, with the daemon's message reported,
//! - edits that need a restart trigger one restart of the scope, followed by
//!   a fresh fetch once the daemon has settled.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use motionctl::{HttpBackend, MotionCtl, PanelConfig, Scope, Severity};
//!
//! #[tokio::main]
//! async fn main() -> motionctl::Result<()> {
//!     motionctl::init_tracing("motionctl=info");
//!
//!     let config = PanelConfig::from_file("motionctl.yaml")?;
//!     let backend = HttpBackend::new(&config)?;
//!     backend.login("admin", "secret").await?;
//!
//!     let session = MotionCtl::connect(backend, &config).await?;
//!     session.select_scope(Scope::Camera(1))?;
//!
//!     if !session.set_change("stream_quality", 85).is_valid() {
//!         return Ok(());
//!     }
//!     let report = session.apply().await?;
//!     if report.severity() == Severity::Warning {
//!         eprintln!("{}", report.message());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Local edit state
pub mod editor;
pub mod pending;
pub mod validation;
pub mod view;

// Remote side
pub mod backend;
pub mod backends;
pub mod snapshot;

// Apply engine and session
pub mod config;
pub mod debounce;
pub mod orchestrator;
pub mod session;

// Core exports
pub use error::*;
pub use types::*;

pub use backend::ConfigBackend;
pub use backends::HttpBackend;
pub use config::{PanelConfig, init_tracing};
pub use debounce::{DebouncedEdit, Debouncer};
pub use editor::{EditorState, ScopeSwitch};
pub use orchestrator::{ApplyOrchestrator, ApplyReport, ApplyState, FailedParam, Severity};
pub use pending::{PendingChanges, ValidationError};
pub use session::ConfigSession;
pub use snapshot::{ConfigSnapshot, SnapshotStore};
pub use validation::{Validation, validate};
pub use view::{EffectiveEntry, EffectiveView};

/// Unified entry point for configuration sessions.
///
/// # Examples
///
/// ```rust,no_run
/// use motionctl::MotionCtl;
///
/// #[tokio::main]
/// async fn main() -> motionctl::Result<()> {
///     let session = MotionCtl::open("http://motion.local:8080").await?;
///     println!("{} scope(s)", session.snapshot().scopes().len());
///     Ok(())
/// }
/// ```
pub struct MotionCtl;

impl MotionCtl {
    /// Open a session over any backend.
    ///
    /// Fetches the initial snapshot; the session starts on the default
    /// scope with no pending edits.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the initial fetch fails.
    pub async fn connect<B: ConfigBackend>(backend: B, config: &PanelConfig) -> Result<ConfigSession<B>> {
        ConfigSession::connect(backend, config).await
    }

    /// Open an HTTP session to the daemon at `base_url` with default
    /// settings and no login.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is not `http://` or `https://`
    /// - The daemon is unreachable or answers with a failure status
    /// - The configuration document cannot be decoded
    pub async fn open(base_url: &str) -> Result<ConfigSession<HttpBackend>> {
        let config = PanelConfig::new(base_url).validated()?;
        let backend = HttpBackend::new(&config)?;
        ConfigSession::connect(backend, &config).await
    }
}
