use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub type SystemId = u32;
pub type StationId = u32;
pub type CommodityId = u32;

/// Galactic position in light years.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coords {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Coords) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct System {
    pub id: SystemId,
    pub name: String,
    pub coords: Coords,
    pub needs_permit: bool,
}

/// Largest landing pad a station offers, or the pad a ship requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PadSize {
    Small,
    Medium,
    Large,
}

impl PadSize {
    /// True if a ship that needs `ship_pad` can dock on a pad of this size.
    pub fn fits(&self, ship_pad: PadSize) -> bool {
        *self >= ship_pad
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Small => "S",
            Self::Medium => "M",
            Self::Large => "L",
        }
    }
}

impl fmt::Display for PadSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsePadSizeError(pub String);

impl fmt::Display for ParsePadSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown landing pad size '{}' (expected S, M or L)", self.0)
    }
}

impl std::error::Error for ParsePadSizeError {}

impl FromStr for PadSize {
    type Err = ParsePadSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "small" => Ok(Self::Small),
            "m" | "medium" => Ok(Self::Medium),
            "l" | "large" => Ok(Self::Large),
            _ => Err(ParsePadSizeError(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub system_id: SystemId,
    pub max_pad: Option<PadSize>,
    /// Supercruise distance from the arrival star, in light seconds.
    pub distance_to_star: Option<f64>,
    pub is_planetary: bool,
    /// Unix seconds.
    pub updated_at: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    pub id: CommodityId,
    pub name: String,
    pub category: String,
    pub average_price: Option<f64>,
    pub is_rare: bool,
}

/// One commodity row of a station market.
///
/// Prices are from the player's side of the counter: `buy_price` is what
/// the player pays, `sell_price` is what the station pays the player.
/// A zero price means the station does not trade that way.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub station_id: StationId,
    pub commodity_id: CommodityId,
    pub supply: u32,
    pub supply_bracket: Option<u8>,
    pub buy_price: u32,
    pub sell_price: u32,
    pub demand: u32,
    pub demand_bracket: Option<u8>,
    /// Unix seconds.
    pub collected_at: u64,
}

impl Listing {
    pub fn is_buyable(&self) -> bool {
        self.buy_price > 0 && self.supply > 0
    }

    pub fn is_sellable(&self) -> bool {
        self.sell_price > 0
    }
}

/// Everything parsed out of the market dumps, before indexing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub systems: Vec<System>,
    pub stations: Vec<Station>,
    pub commodities: Vec<Commodity>,
    pub listings: Vec<Listing>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipProfile {
    /// Cargo capacity in tonnes.
    pub capacity: u32,
    pub credits: u64,
    /// Laden jump range in light years.
    pub jump_range: f64,
    pub pad_size: PadSize,
}

impl Default for ShipProfile {
    fn default() -> Self {
        Self {
            capacity: 100,
            credits: 1_000_000,
            jump_range: 15.0,
            pad_size: PadSize::Medium,
        }
    }
}

/// Number of hyperspace jumps needed to cover `distance` light years.
///
/// Zero distance means the same system (supercruise only).
pub fn jumps_for(distance: f64, jump_range: f64) -> u32 {
    if distance <= 0.0 {
        return 0;
    }
    if jump_range <= 0.0 || !jump_range.is_finite() {
        return u32::MAX;
    }
    let jumps = (distance / jump_range).ceil();
    if jumps >= u32::MAX as f64 {
        u32::MAX
    } else {
        (jumps as u32).max(1)
    }
}
