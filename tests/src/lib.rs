//! # DocAuth Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── session_flows.rs     # Session lifecycle and exchange against the loopback engine
//! │   ├── event_flows.rs       # Stage/error notifications alongside results
//! │   └── socket_transport.rs  # Real Unix socket with a scripted engine
//! └── benches/
//!     └── exchange_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p docauth-tests
//! cargo test -p docauth-tests integration::session_flows
//! cargo bench -p docauth-tests
//! ```

pub mod integration;
