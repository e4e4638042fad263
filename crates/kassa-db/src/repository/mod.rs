//! # Repository Module
//!
//! Database repository implementations for Kassa.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Engine                                                                 │
//! │       │  db.products().find_by_name("Espresso")                        │
//! │       │  ProductRepository::adjust_stock_with(&mut tx, id, -3)         │
//! │       ▼                                                                 │
//! │  ProductRepository   ClientRepository   CheckRepository   LoginRepo    │
//! │   (goods)             (clients)          (checks, sales)   (logins)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Pool methods take `&self`; the `*_with(conn, ..)` associated          │
//! │  functions run on a caller-owned connection or transaction.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog and stock
//! - [`ClientRepository`](client::ClientRepository) - Loyalty ledger and code rotation
//! - [`CheckRepository`](check::CheckRepository) - Checks and sale lines
//! - [`LoginRepository`](login::LoginRepository) - Operator credentials

pub mod check;
pub mod client;
pub mod login;
pub mod product;
