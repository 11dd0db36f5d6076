//! Shared database repository test infrastructure
//!
//! Each repository test module contains shared async test functions plus two
//! instantiation blocks:
//!
//! - **SQLite**: fast in-memory databases, run with every `cargo test`
//! - **PostgreSQL**: testcontainers-backed, run with `cargo test -- --ignored`
//!
//! ```bash
//! cargo test                       # Run fast SQLite tests only
//! cargo test -- --ignored          # Run PostgreSQL integration tests (requires Docker)
//! cargo test -- --include-ignored  # Run all tests
//! ```

mod pool;
mod usage_logs;
