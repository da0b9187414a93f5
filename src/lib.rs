//! reeldb - ingest the IMDb title feeds and query the joined titles
//!
//! - `record`: decode one feed line into a typed record
//! - `storage`: append-only, checksummed table files, sealed with one ordered
//!   copy of the join per sort key
//! - `loader`: stream a compressed feed into a table in batched commits
//! - `query`: stream ordered join rows through the filters, up to a limit
//! - `cli`: the `reeldb` command

pub mod cli;
pub mod loader;
pub mod observability;
pub mod query;
pub mod record;
pub mod storage;
