//! In-memory index over a parsed [`Dataset`].

use std::{
    collections::HashMap,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use thiserror::Error;

use super::entities::{
    Commodity, CommodityId, Dataset, Listing, PadSize, Station, StationId, System, SystemId,
};

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("unknown system '{0}'")]
    UnknownSystem(String),
    #[error("no station named '{station}' in {system}")]
    UnknownStation { system: String, station: String },
    #[error("no commodity matches '{0}'")]
    UnknownCommodity(String),
    #[error("'{query}' is ambiguous, candidates: {}", candidates.join(", "))]
    AmbiguousCommodity {
        query: String,
        candidates: Vec<String>,
    },
}

/// Drops listings that are too old to trust.
#[derive(Clone, Debug, Default)]
pub struct ListingFilter {
    pub max_age: Option<Duration>,
}

impl ListingFilter {
    fn cutoff(&self) -> Option<u64> {
        let max_age = self.max_age?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Some(now.saturating_sub(max_age.as_secs()))
    }
}

/// Which stations a ship is willing to dock at.
#[derive(Clone, Debug, PartialEq)]
pub struct StationFilter {
    pub pad_size: PadSize,
    /// Light seconds.
    pub max_star_distance: Option<f64>,
    pub allow_planetary: bool,
}

impl Default for StationFilter {
    fn default() -> Self {
        Self {
            pad_size: PadSize::Small,
            max_star_distance: None,
            allow_planetary: true,
        }
    }
}

impl StationFilter {
    pub fn accepts(&self, station: &Station) -> bool {
        let Some(pad) = station.max_pad else {
            return false;
        };
        if !pad.fits(self.pad_size) {
            return false;
        }
        if let (Some(limit), Some(distance)) = (self.max_star_distance, station.distance_to_star) {
            if distance > limit {
                return false;
            }
        }
        self.allow_planetary || !station.is_planetary
    }
}

pub type Market = HashMap<CommodityId, Listing>;

#[derive(Debug, Default)]
pub struct Galaxy {
    systems: HashMap<SystemId, System>,
    system_names: HashMap<String, SystemId>,
    stations: HashMap<StationId, Station>,
    system_stations: HashMap<SystemId, Vec<StationId>>,
    commodities: HashMap<CommodityId, Commodity>,
    markets: HashMap<StationId, Market>,
    empty_market: Market,
}

impl Galaxy {
    pub fn build(dataset: Dataset, filter: &ListingFilter) -> Self {
        let mut galaxy = Galaxy::default();

        for system in dataset.systems {
            galaxy
                .system_names
                .insert(system.name.to_lowercase(), system.id);
            galaxy.systems.insert(system.id, system);
        }

        let mut orphans = 0_usize;
        for station in dataset.stations {
            if !galaxy.systems.contains_key(&station.system_id) {
                orphans += 1;
                continue;
            }
            galaxy
                .system_stations
                .entry(station.system_id)
                .or_default()
                .push(station.id);
            galaxy.stations.insert(station.id, station);
        }
        if orphans > 0 {
            log::debug!("[galaxy] Dropped {orphans} stations outside known systems");
        }

        for commodity in dataset.commodities {
            galaxy.commodities.insert(commodity.id, commodity);
        }

        let cutoff = filter.cutoff();
        let mut outdated = 0_usize;
        for listing in dataset.listings {
            if cutoff.map(|c| listing.collected_at < c).unwrap_or(false) {
                outdated += 1;
                continue;
            }
            if !galaxy.stations.contains_key(&listing.station_id) {
                continue;
            }
            galaxy
                .markets
                .entry(listing.station_id)
                .or_default()
                .insert(listing.commodity_id, listing);
        }
        if outdated > 0 {
            log::info!("[galaxy] Ignored {outdated} listings older than the age limit");
        }

        log::info!(
            "[galaxy] Indexed {} systems, {} stations, {} markets",
            galaxy.systems.len(),
            galaxy.stations.len(),
            galaxy.markets.len()
        );

        galaxy
    }

    pub fn system(&self, id: SystemId) -> Option<&System> {
        self.systems.get(&id)
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn commodity(&self, id: CommodityId) -> Option<&Commodity> {
        self.commodities.get(&id)
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn listing_count(&self) -> usize {
        self.markets.values().map(HashMap::len).sum()
    }

    pub fn system_by_name(&self, name: &str) -> Result<&System, LookupError> {
        self.system_names
            .get(&name.trim().to_lowercase())
            .and_then(|id| self.systems.get(id))
            .ok_or_else(|| LookupError::UnknownSystem(name.to_string()))
    }

    pub fn stations_in_system(&self, system_id: SystemId) -> Vec<&Station> {
        self.system_stations
            .get(&system_id)
            .map(|ids| ids.iter().filter_map(|id| self.stations.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn station_in_system(
        &self,
        system: &System,
        name: &str,
    ) -> Result<&Station, LookupError> {
        let wanted = name.trim().to_lowercase();
        self.stations_in_system(system.id)
            .into_iter()
            .find(|station| station.name.to_lowercase() == wanted)
            .ok_or_else(|| LookupError::UnknownStation {
                system: system.name.clone(),
                station: name.to_string(),
            })
    }

    /// Exact (case-insensitive) name first, then a unique substring match.
    pub fn find_commodity(&self, query: &str) -> Result<&Commodity, LookupError> {
        let wanted = query.trim().to_lowercase();
        if let Some(exact) = self
            .commodities
            .values()
            .find(|c| c.name.to_lowercase() == wanted)
        {
            return Ok(exact);
        }

        let mut partial: Vec<&Commodity> = self
            .commodities
            .values()
            .filter(|c| c.name.to_lowercase().contains(&wanted))
            .collect();

        match partial.len() {
            0 => Err(LookupError::UnknownCommodity(query.to_string())),
            1 => Ok(partial[0]),
            _ => {
                partial.sort_by(|a, b| a.name.cmp(&b.name));
                Err(LookupError::AmbiguousCommodity {
                    query: query.to_string(),
                    candidates: partial.into_iter().map(|c| c.name.clone()).collect(),
                })
            }
        }
    }

    pub fn market(&self, station_id: StationId) -> &Market {
        self.markets.get(&station_id).unwrap_or(&self.empty_market)
    }

    /// Systems within `radius` light years of `origin`, origin included.
    pub fn systems_within(&self, origin: &System, radius: f64) -> Vec<(&System, f64)> {
        self.systems
            .values()
            .filter_map(|system| {
                let distance = origin.coords.distance_to(&system.coords);
                (distance <= radius).then_some((system, distance))
            })
            .collect()
    }

    /// Accepted stations in systems within `radius` of `origin`, with the
    /// system distance.
    pub fn reachable_stations(
        &self,
        origin: &System,
        radius: f64,
        filter: &StationFilter,
    ) -> Vec<(&Station, f64)> {
        let mut found = Vec::new();
        for (system, distance) in self.systems_within(origin, radius) {
            for station in self.stations_in_system(system.id) {
                if filter.accepts(station) {
                    found.push((station, distance));
                }
            }
        }
        found.sort_by_key(|(station, _)| station.id);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{now, sample_dataset};

    fn galaxy() -> Galaxy {
        Galaxy::build(sample_dataset(), &ListingFilter::default())
    }

    #[test]
    fn looks_up_systems_ignoring_case() {
        let galaxy = galaxy();
        assert_eq!(galaxy.system_by_name("lhs 3447").map(|s| s.id), Ok(1));
        assert_eq!(
            galaxy.system_by_name("Nowhere").map(|s| s.id),
            Err(LookupError::UnknownSystem("Nowhere".to_string()))
        );
    }

    #[test]
    fn looks_up_stations_within_their_system() {
        let galaxy = galaxy();
        let system = galaxy.system_by_name("LHS 3447").unwrap();
        let station = galaxy.station_in_system(system, "trevithick dock").unwrap();
        assert_eq!(station.id, 10);
        assert!(galaxy.station_in_system(system, "Abraham Lincoln").is_err());
    }

    #[test]
    fn commodity_lookup_prefers_exact_names() {
        let galaxy = galaxy();
        assert_eq!(galaxy.find_commodity("GOLD").map(|c| c.id), Ok(100));
        assert_eq!(galaxy.find_commodity("pall").map(|c| c.id), Ok(102));
        assert!(matches!(
            galaxy.find_commodity("l"),
            Err(LookupError::AmbiguousCommodity { .. })
        ));
        assert!(matches!(
            galaxy.find_commodity("tea"),
            Err(LookupError::UnknownCommodity(_))
        ));
    }

    #[test]
    fn drops_listings_older_than_the_limit() {
        let mut dataset = sample_dataset();
        dataset.listings[0].collected_at = now() - 40 * 86_400;
        let total = dataset.listings.len();
        let filter = ListingFilter {
            max_age: Some(Duration::from_secs(30 * 86_400)),
        };
        let galaxy = Galaxy::build(dataset, &filter);
        assert_eq!(galaxy.listing_count(), total - 1);
    }

    #[test]
    fn station_filter_checks_pad_distance_and_surface() {
        let galaxy = galaxy();
        let outpost = galaxy.station(11).unwrap();
        let planetary = galaxy.station(31).unwrap();

        let large = StationFilter {
            pad_size: PadSize::Large,
            ..StationFilter::default()
        };
        assert!(!large.accepts(outpost));

        let near = StationFilter {
            max_star_distance: Some(100.0),
            ..StationFilter::default()
        };
        assert!(!near.accepts(outpost));

        let no_surface = StationFilter {
            allow_planetary: false,
            ..StationFilter::default()
        };
        assert!(!no_surface.accepts(planetary));
        assert!(StationFilter::default().accepts(planetary));
    }

    #[test]
    fn unknown_pad_size_is_never_accepted() {
        let mut station = galaxy().station(10).unwrap().clone();
        station.max_pad = None;
        assert!(!StationFilter::default().accepts(&station));
    }

    #[test]
    fn unknown_star_distance_passes_a_distance_limit() {
        let mut station = galaxy().station(10).unwrap().clone();
        station.distance_to_star = None;
        let near = StationFilter {
            max_star_distance: Some(100.0),
            ..StationFilter::default()
        };
        assert!(near.accepts(&station));
    }

    #[test]
    fn stations_outside_known_systems_are_dropped() {
        let mut dataset = sample_dataset();
        let mut orphan = dataset.stations[0].clone();
        orphan.id = 99;
        orphan.system_id = 99;
        dataset.stations.push(orphan);
        let known = dataset.stations.len() - 1;

        let galaxy = Galaxy::build(dataset, &ListingFilter::default());
        assert!(galaxy.station(99).is_none());
        assert_eq!(galaxy.station_count(), known);
    }

    #[test]
    fn radius_includes_systems_exactly_at_the_edge() {
        let galaxy = galaxy();
        let origin = galaxy.system_by_name("LHS 3447").unwrap();

        let ids: Vec<_> = galaxy
            .reachable_stations(origin, 6.0, &StationFilter::default())
            .into_iter()
            .map(|(station, distance)| (station.id, distance))
            .collect();
        assert_eq!(ids, vec![(10, 0.0), (11, 0.0), (20, 6.0)]);
    }

    #[test]
    fn reachable_stations_respect_radius() {
        let galaxy = galaxy();
        let origin = galaxy.system_by_name("LHS 3447").unwrap();

        let nearby: Vec<_> = galaxy
            .reachable_stations(origin, 10.0, &StationFilter::default())
            .into_iter()
            .map(|(station, _)| station.id)
            .collect();
        assert_eq!(nearby, vec![10, 11, 20]);

        let wide = galaxy.reachable_stations(origin, 100.0, &StationFilter::default());
        assert_eq!(wide.len(), 5);
    }
}
