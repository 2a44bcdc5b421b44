//! Single-hop trade calculation: buy at A, sell at B.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::entities::{CommodityId, Station, StationId, System, SystemId};
use super::galaxy::{Galaxy, Market};

/// Names travel with the ids so results can be printed or serialized
/// without the galaxy at hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationRef {
    pub station_id: StationId,
    pub station_name: String,
    pub system_id: SystemId,
    pub system_name: String,
}

impl StationRef {
    pub fn new(station: &Station, system: &System) -> Self {
        Self {
            station_id: station.id,
            station_name: station.name.clone(),
            system_id: system.id,
            system_name: system.name.clone(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} / {}", self.system_name, self.station_name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub commodity_id: CommodityId,
    pub commodity_name: String,
    /// What we pay per unit at the source.
    pub buy_price: u32,
    /// What we receive per unit at the destination.
    pub sell_price: u32,
    pub units: u32,
    pub unit_profit: u32,
    pub profit: u64,
    pub supply: u32,
    pub demand: u32,
}

impl Trade {
    pub fn invest(&self) -> u64 {
        self.buy_price as u64 * self.units as u64
    }

    fn rank(&self, other: &Trade) -> Ordering {
        self.profit
            .cmp(&other.profit)
            .then(self.unit_profit.cmp(&other.unit_profit))
            .then_with(|| other.commodity_name.cmp(&self.commodity_name))
    }
}

/// One leg of a route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub from: StationRef,
    pub to: StationRef,
    pub distance_ly: f64,
    pub jumps: u32,
    pub trade: Trade,
}

/// Every profitable trade from `source` to `dest`, best first.
///
/// Units are capped by cargo space, what the credits can pay for, the
/// source supply and, when the destination reports one, its demand.
pub fn trades_between(
    galaxy: &Galaxy,
    source: &Market,
    dest: &Market,
    capacity: u32,
    credits: u64,
) -> Vec<Trade> {
    let mut trades: Vec<Trade> = source
        .values()
        .filter(|listing| listing.is_buyable())
        .filter_map(|buy| {
            let sell = dest.get(&buy.commodity_id).filter(|l| l.is_sellable())?;
            if sell.sell_price <= buy.buy_price {
                return None;
            }
            let unit_profit = sell.sell_price - buy.buy_price;

            let affordable = (credits / buy.buy_price as u64).min(u32::MAX as u64) as u32;
            let mut units = capacity.min(affordable).min(buy.supply);
            if sell.demand > 0 {
                units = units.min(sell.demand);
            }
            if units == 0 {
                return None;
            }

            let commodity_name = galaxy
                .commodity(buy.commodity_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", buy.commodity_id));

            Some(Trade {
                commodity_id: buy.commodity_id,
                commodity_name,
                buy_price: buy.buy_price,
                sell_price: sell.sell_price,
                units,
                unit_profit,
                profit: units as u64 * unit_profit as u64,
                supply: buy.supply,
                demand: sell.demand,
            })
        })
        .collect();

    trades.sort_by(|a, b| b.rank(a));
    trades
}

/// The single most profitable trade between two markets.
pub fn best_trade(
    galaxy: &Galaxy,
    source: &Market,
    dest: &Market,
    capacity: u32,
    credits: u64,
) -> Option<Trade> {
    trades_between(galaxy, source, dest, capacity, credits)
        .into_iter()
        .next()
}
