//! Feature wrapper tests.

pub mod client_groups;
pub mod clients;
pub mod datacube;
pub mod ediscovery;
pub mod schedules;
pub mod storage_policies;
