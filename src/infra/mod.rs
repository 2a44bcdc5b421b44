//! Network and disk access for the market data.

pub mod cache;
pub mod eddb;
pub mod store;
