//! regtest-collector: discovers legacy regression tests and rebuilds
//! replayable commands for them.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Parsers**: Read launcher batch files, definition and catalogue XML,
//!   and orchestrator reports ([`parser`])
//! - **Strategies**: Run one discovery pass, either in-process or delegated
//!   to an external script ([`strategy`])
//! - **Coordinator**: Holds the active strategy ([`coordinator`])
//! - **Commands and scripts**: Rewrite stored commands for a target
//!   environment and render debug scripts ([`command`], [`script`])
//! - **Report**: Console output and JSON persistence ([`report`])
//!
//! # Example
//!
//! ```no_run
//! use regtest_collector::coordinator::CollectionCoordinator;
//! use regtest_collector::strategy::InProcessStrategy;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let coordinator = CollectionCoordinator::new(Box::new(InProcessStrategy::new("regression")));
//!     let result = coordinator.collect("python", &CancellationToken::new()).await?;
//!     println!("{} tests, {} errors", result.tests.len(), result.errors.len());
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod coordinator;
pub mod filter;
pub mod model;
pub mod parser;
pub mod paths;
pub mod process;
pub mod report;
pub mod script;
pub mod strategy;
pub mod text;

// Re-export commonly used types
pub use command::{CommandBuilder, CommandOptions};
pub use config::{Config, load_config};
pub use coordinator::CollectionCoordinator;
pub use model::{CollectionError, CollectionResult, DiscoveredTest, LoadingProgress};
pub use strategy::{CollectionStrategy, DelegatedStrategy, InProcessStrategy};
