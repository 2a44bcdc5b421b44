//! Best places to sell or buy a single commodity around a system.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::entities::{jumps_for, CommodityId, Listing, PadSize, Station, System};
use super::galaxy::{Galaxy, StationFilter};
use super::trade::StationRef;

const JUMP_PENALTY: f64 = 25.0;
const FAR_FROM_STAR_PENALTY: f64 = 50.0;
const FAR_FROM_STAR_LS: f64 = 5_000.0;
const PLANETARY_PENALTY: f64 = 30.0;
const LOW_UNITS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketSide {
    /// The player sells; higher prices are better.
    Sell,
    /// The player buys; lower prices are better.
    Buy,
}

impl MarketSide {
    fn price(&self, listing: &Listing) -> Option<u32> {
        match self {
            Self::Sell => listing.is_sellable().then_some(listing.sell_price),
            Self::Buy => listing.is_buyable().then_some(listing.buy_price),
        }
    }

    fn units(&self, listing: &Listing) -> u32 {
        match self {
            Self::Sell => listing.demand,
            Self::Buy => listing.supply,
        }
    }

    fn bracket(&self, listing: &Listing) -> Option<u8> {
        match self {
            Self::Sell => listing.demand_bracket,
            Self::Buy => listing.supply_bracket,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub station: StationRef,
    pub price: u32,
    pub units: u32,
    pub bracket: Option<u8>,
    pub distance_ly: f64,
    pub jumps: u32,
    pub max_pad: Option<PadSize>,
    pub distance_to_star: Option<f64>,
    pub is_planetary: bool,
    pub collected_at: u64,
    pub adjusted_price: f64,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MarketQuery<'a> {
    pub commodity_id: CommodityId,
    pub origin: &'a System,
    pub side: MarketSide,
    pub radius_ly: f64,
    pub jump_range: f64,
    pub filter: &'a StationFilter,
    pub limit: usize,
}

/// Rank stations around `query.origin` by travel-adjusted price.
pub fn rank_markets(galaxy: &Galaxy, query: &MarketQuery<'_>) -> Vec<MarketEntry> {
    let side = query.side;
    let mut entries: Vec<MarketEntry> = galaxy
        .reachable_stations(query.origin, query.radius_ly, query.filter)
        .into_iter()
        .filter_map(|(station, distance)| {
            let listing = galaxy.market(station.id).get(&query.commodity_id)?;
            let price = side.price(listing)?;
            let system = galaxy.system(station.system_id)?;
            let jumps = jumps_for(distance, query.jump_range);

            let far_from_star = station
                .distance_to_star
                .map(|d| d > FAR_FROM_STAR_LS)
                .unwrap_or(false);
            let penalty = travel_penalty(jumps, far_from_star, station.is_planetary);
            let adjusted_price = match side {
                MarketSide::Sell => price as f64 - penalty,
                MarketSide::Buy => price as f64 + penalty,
            };

            let units = side.units(listing);
            let bracket = side.bracket(listing);
            Some(MarketEntry {
                station: StationRef::new(station, system),
                price,
                units,
                bracket,
                distance_ly: distance,
                jumps,
                max_pad: station.max_pad,
                distance_to_star: station.distance_to_star,
                is_planetary: station.is_planetary,
                collected_at: listing.collected_at,
                adjusted_price,
                notes: build_notes(side, station, far_from_star, units, bracket),
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        let ord = a
            .adjusted_price
            .partial_cmp(&b.adjusted_price)
            .unwrap_or(Ordering::Equal);
        let ord = match side {
            MarketSide::Sell => ord.reverse(),
            MarketSide::Buy => ord,
        };
        ord.then(a.jumps.cmp(&b.jumps))
    });
    entries.truncate(query.limit);
    entries
}

fn travel_penalty(jumps: u32, far_from_star: bool, planetary: bool) -> f64 {
    let mut penalty = JUMP_PENALTY * jumps as f64;
    if far_from_star {
        penalty += FAR_FROM_STAR_PENALTY;
    }
    if planetary {
        penalty += PLANETARY_PENALTY;
    }
    penalty
}

fn build_notes(
    side: MarketSide,
    station: &Station,
    far_from_star: bool,
    units: u32,
    bracket: Option<u8>,
) -> Option<String> {
    let mut notes = Vec::new();
    if station.is_planetary {
        notes.push("Planetary".to_string());
    }
    if far_from_star {
        notes.push("Far from star".to_string());
    }
    let kind = match side {
        MarketSide::Sell => "Demand",
        MarketSide::Buy => "Supply",
    };
    if let Some(level) = bracket_label(bracket) {
        notes.push(format!("{kind} {level}"));
    }
    if units > 0 && units < LOW_UNITS {
        notes.push(match side {
            MarketSide::Sell => "Low demand".to_string(),
            MarketSide::Buy => "Low stock".to_string(),
        });
    }

    if notes.is_empty() {
        None
    } else {
        Some(notes.join(", "))
    }
}

pub fn bracket_label(value: Option<u8>) -> Option<&'static str> {
    match value {
        Some(3) => Some("High"),
        Some(2) => Some("Med"),
        Some(1) => Some("Low"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{sample_dataset, GOLD, PALLADIUM};
    use crate::domain::galaxy::ListingFilter;

    fn query<'a>(origin: &'a System, filter: &'a StationFilter, side: MarketSide) -> MarketQuery<'a> {
        MarketQuery {
            commodity_id: GOLD,
            origin,
            side,
            radius_ly: 40.0,
            jump_range: 15.0,
            filter,
            limit: 10,
        }
    }

    #[test]
    fn sell_side_ranks_adjusted_price_descending() {
        let galaxy = Galaxy::build(sample_dataset(), &ListingFilter::default());
        let origin = galaxy.system_by_name("LHS 3447").unwrap();
        let filter = StationFilter::default();

        let entries = rank_markets(&galaxy, &query(origin, &filter, MarketSide::Sell));
        let ids: Vec<_> = entries.iter().map(|e| e.station.station_id).collect();
        assert_eq!(ids, vec![31, 30, 20]);

        // 11500 - 2 jumps - far from star - planetary
        assert_eq!(entries[0].adjusted_price, 11_370.0);
        assert_eq!(entries[0].notes.as_deref(), Some("Planetary, Far from star"));
        assert_eq!(entries[1].adjusted_price, 10_950.0);
        assert_eq!(entries[1].notes.as_deref(), Some("Low demand"));
        assert_eq!(entries[2].adjusted_price, 9_975.0);
        assert_eq!(entries[2].notes.as_deref(), Some("Demand High"));
    }

    #[test]
    fn buy_side_ranks_ascending_and_needs_supply() {
        let galaxy = Galaxy::build(sample_dataset(), &ListingFilter::default());
        let origin = galaxy.system_by_name("Eravate").unwrap();
        let filter = StationFilter::default();

        let mut q = query(origin, &filter, MarketSide::Buy);
        let gold = rank_markets(&galaxy, &q);
        assert_eq!(gold.len(), 1);
        assert_eq!(gold[0].station.station_name, "Trevithick Dock");
        assert_eq!(gold[0].adjusted_price, 9_025.0);

        q.commodity_id = PALLADIUM;
        let palladium = rank_markets(&galaxy, &q);
        assert_eq!(palladium.len(), 1);
        assert_eq!(palladium[0].jumps, 0);
        assert_eq!(palladium[0].adjusted_price, 13_000.0);
    }

    #[test]
    fn buy_side_flags_scarce_supply() {
        let mut dataset = sample_dataset();
        let listing = dataset
            .listings
            .iter_mut()
            .find(|l| l.station_id == 10 && l.commodity_id == GOLD)
            .unwrap();
        listing.supply = 50;
        listing.supply_bracket = Some(1);

        let galaxy = Galaxy::build(dataset, &ListingFilter::default());
        let origin = galaxy.system_by_name("Eravate").unwrap();
        let filter = StationFilter::default();

        let gold = rank_markets(&galaxy, &query(origin, &filter, MarketSide::Buy));
        assert_eq!(gold.len(), 1);
        assert_eq!(gold[0].units, 50);
        assert_eq!(gold[0].notes.as_deref(), Some("Supply Low, Low stock"));
    }

    #[test]
    fn radius_and_limit_bound_results() {
        let galaxy = Galaxy::build(sample_dataset(), &ListingFilter::default());
        let origin = galaxy.system_by_name("LHS 3447").unwrap();
        let filter = StationFilter::default();

        let mut q = query(origin, &filter, MarketSide::Sell);
        q.radius_ly = 10.0;
        assert_eq!(rank_markets(&galaxy, &q).len(), 1);

        q.radius_ly = 1_000.0;
        q.limit = 2;
        let entries = rank_markets(&galaxy, &q);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].station.station_name, "Remote Post");
    }
}
