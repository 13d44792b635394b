//! Keeps one block subscription per channel of a Hyperledger Fabric network,
//! resuming each from the last stored block and handing new blocks to a
//! processing pipeline.

pub mod config;
pub mod db;
pub mod ledger;
pub mod models;
pub mod sync;
pub mod utils;
