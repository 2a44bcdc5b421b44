//! Trade route domain: galaxy index, trade maths and searches.

pub mod entities;
pub mod galaxy;
pub mod market;
pub mod search;
pub mod trade;

#[cfg(test)]
pub(crate) mod fixtures;

pub use entities::{
    Commodity, Coords, Dataset, Listing, PadSize, ShipProfile, Station, StationId, System,
};
pub use galaxy::{Galaxy, ListingFilter, LookupError, StationFilter};
pub use market::{bracket_label, rank_markets, MarketEntry, MarketQuery, MarketSide};
pub use search::{find_routes, Route, RouteSort, SearchError, SearchOptions};
pub use trade::{trades_between, Trade};
