//! Resource loading orchestration for SC4 FastLoad.
//!
//! Replaces the game's linear plugin scan with the multi-packed pipeline
//! while preserving its load order exactly:
//!
//! 1. installation root — top-level `*.DAT` files, registered individually
//! 2. installation language folder — same
//! 3. installation SKU data folder — one recursive DAT aggregate
//! 4. installation plugins folder — loose `.SC4*` aggregate, then a DAT
//!    aggregate over the same tree
//! 5. user plugins folder — same two-pass pattern
//! 6. the stock resource-factory table, always last
//!
//! Registration order is override priority: the registry resolves keys
//! last-registered-wins, so a plugin in the user folder shadows the same
//! key anywhere in the installation.
//!
//! The user-plugins scan can optionally run on a background thread started
//! before the synchronous steps; this changes wall-clock time only, never
//! the observable registration order.

pub mod config;
pub mod directories;
pub mod factories;
pub mod registry;
pub mod setup;

pub use config::{LoaderConfig, ScanConcurrency, TraceOption};
pub use directories::GameDirectories;
pub use factories::DEFAULT_RESOURCE_FACTORIES;
pub use registry::{FactoryRegistration, SegmentRegistry};
pub use setup::ResourceLoader;
