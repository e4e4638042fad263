//! # kassa-engine: Checkout, Returns and Authorization
//!
//! The till's operations, composed from kassa-core rules and kassa-db
//! repositories. Each mutating operation either commits as a whole or
//! leaves the store untouched.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Till screen (external)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │  EngineResult<T>                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ kassa-engine (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   PosSession ─┬─ CartSession      (stock reservation)           │   │
//! │  │               ├─ CheckoutEngine   (one tx per check)            │   │
//! │  │               ├─ ReturnEngine     (one tx per return)           │   │
//! │  │               └─ ReturnAuthorizer (admin challenge)             │   │
//! │  │                                                                 │   │
//! │  │   EngineConfig (TOML + KASSA_*)    EngineError { kind, message }│   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        kassa-core (rules)      kassa-db (SQLite)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use kassa_engine::{init_tracing, EngineConfig, PosSession};
//!
//! init_tracing();
//! let config = EngineConfig::load_or_default(None);
//! let mut session = PosSession::open(config, "anna", "till").await?;
//!
//! session.add_line("Espresso", 3).await?;
//! let client = session.lookup_client("042917").await?;
//! let receipt = session.sell(Some(client.id), 2).await?;
//! println!("Check №{} for {}", receipt.check.id, receipt.check.sum);
//!
//! session.close().await?;
//! ```

use tracing_subscriber::EnvFilter;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod authorizer;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod returns;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use authorizer::ReturnAuthorizer;
pub use cart::CartSession;
pub use checkout::{CheckReceipt, CheckoutEngine};
pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, EngineResult};
pub use returns::{ReturnEngine, ReturnSummary};
pub use session::PosSession;

pub use kassa_core::ErrorKind;

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=kassa=trace` - Show trace for kassa crates only
/// - Default: INFO, DEBUG for kassa crates, WARN for sqlx
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kassa=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
