//! Test utilities for nestplate
//!
//! Helpers shared by unit and integration tests: a temporary site fixture
//! and one-time logging setup.
//!
//! # Example
//!
//! ```rust,no_run
//! use nestplate::test_utils::TestSite;
//!
//! let site = TestSite::new().unwrap();
//! site.add_template("card.html", "<div>{{ template.content }}</div>").unwrap();
//! site.add_page("index.md", "{% template card.html %}Hi{% endtemplate %}").unwrap();
//! ```

pub mod environment;

pub use environment::TestSite;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` if it is set; with neither,
/// logging stays off. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=nestplate=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer() // captured per test
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
