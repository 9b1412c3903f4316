//! Data models for the Commcell SDK.
//!
//! Request builders and typed views over the JSON the web service returns.

mod auth;
mod blr_pairs;
mod client_groups;
mod commserv;
mod datacube;
mod ediscovery;
mod schedules;
mod storage_policies;

pub use auth::*;
pub use blr_pairs::*;
pub use client_groups::*;
pub use commserv::*;
pub use datacube::*;
pub use ediscovery::*;
pub use schedules::*;
pub use storage_policies::*;
