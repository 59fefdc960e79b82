//! Crawler settings
//!
//! A config file has three tables, all optional:
//!
//! - `[browser]`: how the Chromium page is launched (headless, viewport,
//!   user agent, navigation timeout)
//! - `[scraping]`: pacing of the scroll loop and its stop heuristics
//! - `[guard]`: the resident-memory ceiling and how often it is sampled
//!
//! Keys are kebab-case. A missing key takes its default, and out-of-range
//! values are rejected before any browser starts.
//!
//! ```no_run
//! use std::path::Path;
//! use telescroll::config::load_config_with_hash;
//!
//! let (config, hash) = load_config_with_hash(Path::new("telescroll.toml")).unwrap();
//! println!("{} iterations at most (config {})", config.scraping.max_scroll_attempts, hash);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{load_config, load_config_with_hash, parse_config};
pub use types::{BrowserConfig, Config, GuardConfig, ScrapingConfig};
pub use validation::validate;
