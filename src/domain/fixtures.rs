//! Small hand-built galaxy shared by the unit tests.
//!
//! ```text
//! LHS 3447 (0 ly)     10 Trevithick Dock  L   500 ls   sells Gold 9000, buys Palladium 14500
//!                     11 Bluford Orbital  M  2000 ls   sells Silver 4000 (20 t)
//! Eravate (6 ly)      20 Russell Ring     L   300 ls   buys Gold 10000, sells Palladium 13000, buys Silver 4500
//! Sol (30 ly)         30 Abraham Lincoln  L   500 ls   buys Gold 11000 (30 t)
//!                     31 Jameson Base     L  6000 ls   planetary, buys Gold 11500
//! Far Away (500 ly)   40 Remote Post      L   100 ls   buys Gold 20000
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use super::entities::{
    Commodity, Coords, Dataset, Listing, PadSize, ShipProfile, Station, System,
};

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn system(id: u32, name: &str, x: f64) -> System {
    System {
        id,
        name: name.to_string(),
        coords: Coords::new(x, 0.0, 0.0),
        needs_permit: false,
    }
}

fn station(
    id: u32,
    name: &str,
    system_id: u32,
    pad: PadSize,
    distance_to_star: f64,
    is_planetary: bool,
) -> Station {
    Station {
        id,
        name: name.to_string(),
        system_id,
        max_pad: Some(pad),
        distance_to_star: Some(distance_to_star),
        is_planetary,
        updated_at: now(),
    }
}

fn commodity(id: u32, name: &str, category: &str) -> Commodity {
    Commodity {
        id,
        name: name.to_string(),
        category: category.to_string(),
        average_price: None,
        is_rare: false,
    }
}

/// `(station, commodity, supply, buy_price, sell_price, demand)`
fn listing(row: (u32, u32, u32, u32, u32, u32)) -> Listing {
    let (station_id, commodity_id, supply, buy_price, sell_price, demand) = row;
    Listing {
        station_id,
        commodity_id,
        supply,
        supply_bracket: None,
        buy_price,
        sell_price,
        demand,
        demand_bracket: None,
        collected_at: now(),
    }
}

pub const GOLD: u32 = 100;
pub const SILVER: u32 = 101;
pub const PALLADIUM: u32 = 102;
pub const TRITIUM: u32 = 103;

pub fn sample_dataset() -> Dataset {
    let mut listings: Vec<Listing> = [
        (10, GOLD, 500, 9000, 0, 0),
        (10, PALLADIUM, 0, 0, 14500, 200),
        (11, SILVER, 20, 4000, 0, 0),
        (20, GOLD, 0, 0, 10000, 1000),
        (20, PALLADIUM, 1000, 13000, 0, 0),
        (20, SILVER, 0, 0, 4500, 100),
        (30, GOLD, 0, 0, 11000, 30),
        (31, GOLD, 0, 0, 11500, 0),
        (40, GOLD, 0, 0, 20000, 5000),
    ]
    .into_iter()
    .map(listing)
    .collect();
    listings[3].demand_bracket = Some(3);

    Dataset {
        systems: vec![
            system(1, "LHS 3447", 0.0),
            system(2, "Eravate", 6.0),
            system(3, "Sol", 30.0),
            system(4, "Far Away", 500.0),
        ],
        stations: vec![
            station(10, "Trevithick Dock", 1, PadSize::Large, 500.0, false),
            station(11, "Bluford Orbital", 1, PadSize::Medium, 2000.0, false),
            station(20, "Russell Ring", 2, PadSize::Large, 300.0, false),
            station(30, "Abraham Lincoln", 3, PadSize::Large, 500.0, false),
            station(31, "Jameson Base", 3, PadSize::Large, 6000.0, true),
            station(40, "Remote Post", 4, PadSize::Large, 100.0, false),
        ],
        commodities: vec![
            commodity(GOLD, "Gold", "Metals"),
            commodity(SILVER, "Silver", "Metals"),
            commodity(PALLADIUM, "Palladium", "Metals"),
            commodity(TRITIUM, "Tritium", "Chemicals"),
        ],
        listings,
    }
}

pub fn sample_ship() -> ShipProfile {
    ShipProfile {
        capacity: 100,
        credits: 1_000_000,
        jump_range: 15.0,
        pad_size: PadSize::Medium,
    }
}
