//! # riskwatch - Risk-IP Log Watcher
//!
//! Continuously scans operator log files for IPv4 addresses that appear on
//! externally curated risk lists, counts hits per IP, and dispatches alerts
//! to pluggable notification services when thresholds are crossed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       riskwatch                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml) + hot reload (notify)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Loader (reqwest)                                           │
//! │    ├── safe_list feeds (whitelist, wins unconditionally)    │
//! │    └── risk_list feeds (text / csv / json)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Matcher                                                    │
//! │    └── ListGroup ── NetList (exact set + CIDR trie)         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Ingestors (once scan / tail follow via linemux)            │
//! │    └── per-line IPv4 extraction + sensitive-IP oracle       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Accumulator (per-IP hit sequences, threshold evaluation)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Dispatcher (1s tick, per-IP fan-out, bounded retries)      │
//! │    └── adapters: slack, discord, webhook, bark, telegram,   │
//! │        pushover, pushbullet, rocketchat, wechat, webpush,   │
//! │        curl                                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`accumulator`] - Per-IP hit sequences and threshold evaluation
//! - [`app`] - Task supervision for one engine generation
//! - [`cli`] - Command-line interface definitions
//! - [`config`] - Configuration parsing and validation
//! - [`dispatcher`] - Notification dispatch worker
//! - [`engine`] - Shared state: list groups, accumulator, queue, counter
//! - [`error`] - Typed error taxonomy
//! - [`ingest`] - Target-log scanning and following
//! - [`ip`] - IPv4 codec and line extraction
//! - [`listgroup`] - Hot-swappable collection of per-feed matchers
//! - [`loader`] - Feed download, parsing, and refresh scheduling
//! - [`logging`] - Subscriber setup with reloadable level
//! - [`netlist`] - Exact-set + CIDR-trie membership structure
//! - [`notifier`] - Service adapters behind one `send(title, body)` contract
//! - [`queue`] - Pending-notification FIFO
//! - [`server`] - Status and test-notification HTTP endpoints
//! - [`signal`] - Graceful shutdown signals
//! - [`template`] - Payload template rendering
//! - [`watcher`] - Config-file change watcher

pub mod accumulator;
pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod ip;
pub mod listgroup;
pub mod loader;
pub mod logging;
pub mod netlist;
pub mod notifier;
pub mod queue;
pub mod server;
pub mod signal;
pub mod template;
pub mod watcher;

pub use cli::Cli;
pub use config::Config;
pub use engine::Engine;
