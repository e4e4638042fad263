//! # kassa-core: Pure Business Logic for Kassa
//!
//! Everything the till needs to reason about a sale without touching disk:
//! money, entity types, cart line math, validation and the return gate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Till screen (external)                       │   │
//! │  │    Product table ──► Cart ──► Sell ──► Returns view             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kassa-engine                                 │   │
//! │  │    CartSession, CheckoutEngine, ReturnEngine, Authorizer        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kassa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   cart    │  │   gate    │  │   │
//! │  │   │  Product  │  │   Money   │  │   Cart    │  │ReturnGate │  │   │
//! │  │   │   Check   │  │BONUS_RATE │  │ CartLine  │  │ Locked/.. │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kassa-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Client, Check, SaleLine, Role)
//! - [`money`] - Integer money
//! - [`cart`] - Cart lines and totals
//! - [`gate`] - Return authorization state machine
//! - [`error`] - Domain error types and [`ErrorKind`]
//! - [`validation`] - Input parsing and business rule checks
//!
//! ## Example Usage
//!
//! ```rust
//! use kassa_core::{Money, BONUS_RATE};
//!
//! let total = Money::from_units(450);
//! let discount = BONUS_RATE.bonus_value(4);
//! assert_eq!((total - discount).units(), 410);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod gate;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use gate::{GateState, ReturnGate};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Value of one bonus point when redeemed.
///
/// Engines take the rate from configuration; this is the default.
pub const BONUS_RATE: Money = Money::from_units(10);

/// Digits in a client bonus code.
pub const BONUS_CODE_LEN: usize = 6;
