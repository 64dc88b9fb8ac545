//! Mugs End-to-End Test Infrastructure
//!
//! Integration tests drive a real [`Shell`] over a temporary copy of the
//! golden extensions under `golden/extensions`:
//!
//! - Loading: discovery, compilation, fault isolation and caching
//! - Lifecycle: enable, disable and reload through the shell
//! - Scanning: scanner findings on the golden scan fixtures
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mugs-tests
//! ```

pub mod harness;

pub use harness::{golden_path, ShellFixture};
