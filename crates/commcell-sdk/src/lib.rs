//! # Commcell SDK
//!
//! Async Rust SDK for the Commvault Commcell REST API.
//!
//! ## Features
//!
//! - **Session management** - Web service discovery, password or token login,
//!   transparent token renewal
//! - **Typed errors** - Every failure maps to a stable `Domain/code` pair
//! - **Feature wrappers** - Clients, client groups, storage policies,
//!   schedules, entity tags, BLR pairs, datacube and eDiscovery crawl jobs
//! - **Legacy channel** - Raw qoperation and qcommand passthroughs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use commcell_sdk::{Commcell, Lister};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), commcell_sdk::Error> {
//!     let commcell = Commcell::builder()
//!         .host("webconsole.example.com")
//!         .username("admin")
//!         .password("secret")
//!         .build()
//!         .await?;
//!
//!     let groups = commcell.client_groups().await?;
//!     for name in groups.all().names() {
//!         println!("Client group: {name}");
//!     }
//!
//!     commcell.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Authentication
//!
//! ### Existing token
//! ```rust,no_run
//! # use commcell_sdk::Commcell;
//! # async fn example() -> Result<(), commcell_sdk::Error> {
//! let commcell = Commcell::builder()
//!     .host("webconsole.example.com")
//!     .token("QSDK 3a1f...")
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Profile file
//! ```rust,no_run
//! # use commcell_sdk::ProfileConfig;
//! # async fn example() -> Result<(), commcell_sdk::Error> {
//! let commcell = ProfileConfig::load("lab")?.into_builder().build().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! # use commcell_sdk::{Commcell, Fetcher};
//! # async fn example(commcell: Commcell) -> Result<(), commcell_sdk::Error> {
//! let policies = commcell.storage_policies().await?;
//! match policies.get("gold-30d").await {
//!     Ok(policy) => println!("Found policy {}", policy.id()),
//!     Err(e) if e.is_not_found() => println!("No such policy ({})", e.code()),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod response;

// Re-export main types
pub use auth::{AuthToken, Credentials};
pub use client::{
    BlrPair, BlrPairs, Client, ClientGroup, ClientGroups, Clients, Commcell, CommcellBuilder,
    CommcellConfig, CrawlJob, Datacube, Datasource, Datasources, EntityMap, Fetcher, Lister,
    Mutator, Payload, ProfileConfig, Schedule, Schedules, StoragePolicies, StoragePolicy, Tag,
    Tags,
};
pub use error::{Error, ErrorCode, ErrorDomain, Result};

// Re-export model types for convenience
pub use models::{
    ClientGroupCreate, CommServInfo, CrawlJobState, CrawlTarget, DatasourceCreate, FsPairCreate,
    Frequency, PairStatus, ScheduleQuery, SchedulePattern, StoragePolicyCreate, VolumeMapping,
};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent string for API requests
pub const USER_AGENT: &str = concat!("commcell-sdk-rust/", env!("CARGO_PKG_VERSION"));
