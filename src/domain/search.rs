//! Multi-hop route search.
//!
//! A beam search over station-to-station hops: each level extends every
//! kept partial route by its best trade to every reachable station, then
//! keeps the `beam_width` best partial routes. Profit is reinvested, so a
//! later hop may afford more cargo than an earlier one.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{jumps_for, ShipProfile, StationId, SystemId};
use super::galaxy::{Galaxy, StationFilter};
use super::trade::{best_trade, Hop, StationRef};

#[derive(Debug, Error, PartialEq)]
pub enum SearchError {
    #[error("invalid search options: {0}")]
    InvalidOptions(String),
    #[error("no origin station to start from")]
    NoOrigin,
}

/// Ranking criteria for finished routes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteSort {
    #[default]
    Profit,
    ProfitPerJump,
    ProfitPerUnit,
}

impl RouteSort {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Profit => "Profit",
            Self::ProfitPerJump => "Profit/jump",
            Self::ProfitPerUnit => "Profit/t",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub hops: u32,
    pub max_jumps_per_hop: u32,
    pub beam_width: usize,
    pub limit: usize,
    pub round_trip: bool,
    pub sort: RouteSort,
    pub station_filter: StationFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            hops: 1,
            max_jumps_per_hop: 1,
            beam_width: 200,
            limit: 10,
            round_trip: false,
            sort: RouteSort::default(),
            station_filter: StationFilter::default(),
        }
    }
}

impl SearchOptions {
    fn validate(&self) -> Result<(), SearchError> {
        if self.hops == 0 {
            return Err(SearchError::InvalidOptions("hops must be at least 1".into()));
        }
        if self.max_jumps_per_hop == 0 {
            return Err(SearchError::InvalidOptions(
                "max jumps per hop must be at least 1".into(),
            ));
        }
        if self.beam_width == 0 || self.limit == 0 {
            return Err(SearchError::InvalidOptions(
                "beam width and limit must be positive".into(),
            ));
        }
        if self.round_trip && self.hops < 2 {
            return Err(SearchError::InvalidOptions(
                "a round trip needs at least 2 hops".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub hops: Vec<Hop>,
    pub total_profit: u64,
    pub total_jumps: u32,
    pub starting_credits: u64,
    pub final_credits: u64,
}

impl Route {
    fn start(credits: u64) -> Self {
        Self {
            hops: Vec::new(),
            total_profit: 0,
            total_jumps: 0,
            starting_credits: credits,
            final_credits: credits,
        }
    }

    fn push(&mut self, hop: Hop) {
        self.total_profit = self.total_profit.saturating_add(hop.trade.profit);
        self.total_jumps = self.total_jumps.saturating_add(hop.jumps);
        self.final_credits = self.final_credits.saturating_add(hop.trade.profit);
        self.hops.push(hop);
    }

    pub fn total_units(&self) -> u64 {
        self.hops.iter().map(|hop| hop.trade.units as u64).sum()
    }

    /// In-system hops still cost a supercruise leg, so jumps count as 1 at least.
    pub fn profit_per_jump(&self) -> f64 {
        self.total_profit as f64 / self.total_jumps.max(1) as f64
    }

    pub fn profit_per_unit(&self) -> f64 {
        self.total_profit as f64 / self.total_units().max(1) as f64
    }

    pub fn total_distance_ly(&self) -> f64 {
        self.hops.iter().map(|hop| hop.distance_ly).sum()
    }

    pub fn score(&self, sort: RouteSort) -> f64 {
        match sort {
            RouteSort::Profit => self.total_profit as f64,
            RouteSort::ProfitPerJump => self.profit_per_jump(),
            RouteSort::ProfitPerUnit => self.profit_per_unit(),
        }
    }

    fn stations(&self) -> Vec<StationId> {
        let mut ids: Vec<StationId> = self
            .hops
            .first()
            .map(|hop| vec![hop.from.station_id])
            .unwrap_or_default();
        ids.extend(self.hops.iter().map(|hop| hop.to.station_id));
        ids
    }
}

fn compare_routes(a: &Route, b: &Route, sort: RouteSort) -> Ordering {
    b.score(sort)
        .partial_cmp(&a.score(sort))
        .unwrap_or(Ordering::Equal)
        .then(a.total_jumps.cmp(&b.total_jumps))
        .then(b.total_profit.cmp(&a.total_profit))
}

struct Partial {
    route: Route,
    origin: StationId,
    current: StationId,
}

struct Searcher<'a> {
    galaxy: &'a Galaxy,
    ship: &'a ShipProfile,
    options: &'a SearchOptions,
    radius: f64,
    reachable: HashMap<SystemId, Vec<(StationId, f64)>>,
}

impl<'a> Searcher<'a> {
    fn reachable_from(&mut self, system_id: SystemId) -> Vec<(StationId, f64)> {
        let galaxy = self.galaxy;
        let radius = self.radius;
        let options = self.options;
        self.reachable
            .entry(system_id)
            .or_insert_with(|| {
                galaxy
                    .system(system_id)
                    .map(|system| {
                        galaxy
                            .reachable_stations(system, radius, &options.station_filter)
                            .into_iter()
                            .map(|(station, distance)| (station.id, distance))
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .clone()
    }

    fn extend(&mut self, partial: &Partial, closing: bool) -> Vec<Partial> {
        let galaxy = self.galaxy;
        let Some(current) = galaxy.station(partial.current) else {
            return Vec::new();
        };
        let Some(current_system) = galaxy.system(current.system_id) else {
            return Vec::new();
        };

        let candidates = if closing {
            // The last leg of a round trip has exactly one destination.
            galaxy
                .station(partial.origin)
                .and_then(|origin| galaxy.system(origin.system_id))
                .map(|system| current_system.coords.distance_to(&system.coords))
                .filter(|distance| *distance <= self.radius)
                .map(|distance| vec![(partial.origin, distance)])
                .unwrap_or_default()
        } else {
            self.reachable_from(current_system.id)
        };

        let mut extended = Vec::new();
        for (dest_id, distance) in candidates {
            if dest_id == current.id {
                continue;
            }
            let Some(dest) = galaxy.station(dest_id) else {
                continue;
            };
            let Some(dest_system) = galaxy.system(dest.system_id) else {
                continue;
            };
            let jumps = jumps_for(distance, self.ship.jump_range);
            if jumps > self.options.max_jumps_per_hop {
                continue;
            }
            let Some(trade) = best_trade(
                galaxy,
                galaxy.market(current.id),
                galaxy.market(dest.id),
                self.ship.capacity,
                partial.route.final_credits,
            ) else {
                continue;
            };

            let mut route = partial.route.clone();
            route.push(Hop {
                from: StationRef::new(current, current_system),
                to: StationRef::new(dest, dest_system),
                distance_ly: distance,
                jumps,
                trade,
            });
            extended.push(Partial {
                route,
                origin: partial.origin,
                current: dest.id,
            });
        }
        extended
    }
}

/// Find the best routes starting at any of `origins`.
pub fn find_routes(
    galaxy: &Galaxy,
    origins: &[StationId],
    ship: &ShipProfile,
    options: &SearchOptions,
) -> Result<Vec<Route>, SearchError> {
    options.validate()?;

    let mut beam: Vec<Partial> = origins
        .iter()
        .filter(|id| galaxy.station(**id).is_some())
        .map(|id| Partial {
            route: Route::start(ship.credits),
            origin: *id,
            current: *id,
        })
        .collect();
    if beam.is_empty() {
        return Err(SearchError::NoOrigin);
    }

    let mut searcher = Searcher {
        galaxy,
        ship,
        options,
        radius: ship.jump_range * options.max_jumps_per_hop as f64,
        reachable: HashMap::new(),
    };

    let mut finished: Vec<Route> = Vec::new();
    for level in 0..options.hops {
        let closing = options.round_trip && level + 1 == options.hops;
        let mut next: Vec<Partial> = Vec::new();

        for partial in &beam {
            let extended = searcher.extend(partial, closing);
            if extended.is_empty() {
                if !partial.route.hops.is_empty() && !options.round_trip {
                    finished.push(partial.route.clone());
                }
            } else {
                next.extend(extended);
            }
        }

        next.sort_by(|a, b| compare_routes(&a.route, &b.route, options.sort));
        next.truncate(options.beam_width);
        log::debug!(
            "[search] Level {}: {} partial routes, {} finished",
            level + 1,
            next.len(),
            finished.len()
        );
        beam = next;
        if beam.is_empty() {
            break;
        }
    }

    let mut routes = finished;
    routes.extend(beam.into_iter().map(|partial| partial.route));
    routes.sort_by(|a, b| compare_routes(a, b, options.sort));

    let mut seen = HashSet::new();
    routes.retain(|route| seen.insert(route.stations()));
    routes.truncate(options.limit);

    log::info!("[search] Found {} routes", routes.len());
    Ok(routes)
}
