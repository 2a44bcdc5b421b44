use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::{
    cli::{Cli, Command, FilterArgs, MarketArgs, RouteArgs, ShipArgs},
    config::{config_path, load_settings, save_settings, ConfigError, Settings},
    domain::{
        find_routes, rank_markets, trades_between, Galaxy, ListingFilter, LookupError,
        MarketQuery, MarketSide, Route, RouteSort, SearchError, SearchOptions, ShipProfile,
        StationFilter, StationId, Trade,
    },
    infra::{
        cache::{CacheError, DatasetCache, Manifest},
        eddb::{EddbClient, EddbClientError},
        store::{CacheStatus, DataStore, LoadMode, StoreError},
    },
    ui::report::{
        render_alternatives, render_markets, render_routes, render_ship, render_station,
        render_update, StationReport, UpdateSummary,
    },
    util::version::{check_for_update, version_label, UpdateError, APP_NAME},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Eddb(#[from] EddbClientError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error("update check failed: {0}")]
    Update(#[from] UpdateError),
    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no stations known in {0}")]
    NoStations(String),
}

struct Loaded {
    galaxy: Galaxy,
    manifest: Manifest,
    status: CacheStatus,
}

#[derive(Serialize)]
struct RouteOutput<'a> {
    sort: RouteSort,
    routes: &'a [Route],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alternatives: Vec<Vec<Trade>>,
}

#[derive(Serialize)]
struct ShipOutput<'a> {
    config: PathBuf,
    ship: &'a ShipProfile,
}

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_available: Option<bool>,
}

pub struct App {
    settings: Settings,
    config_path: PathBuf,
    offline: bool,
    json: bool,
}

impl App {
    /// Loads the settings and applies the global flags.
    pub fn new(cli: &Cli) -> Result<Self, AppError> {
        let config_path = config_path(cli.config.as_deref())?;
        let mut settings = load_settings(&config_path)?;
        if let Some(url) = &cli.data_url {
            settings.data_url = url.clone();
        }
        log::debug!("[config] Using settings from {}", config_path.display());
        Ok(Self {
            settings,
            config_path,
            offline: cli.offline,
            json: cli.json,
        })
    }

    pub async fn run(self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Route(args) => self.route(args).await,
            Command::Sell(args) => self.markets(args, MarketSide::Sell).await,
            Command::Buy(args) => self.markets(args, MarketSide::Buy).await,
            Command::Station { system, station } => self.station(&system, &station).await,
            Command::Update { clear: true, .. } => self.clear_cache(),
            Command::Update { force, .. } => self.update(force).await,
            Command::Ship(args) => self.ship(args),
            Command::Version { check } => self.version(check).await,
        }
    }

    async fn route(&self, args: RouteArgs) -> Result<(), AppError> {
        let ship = self.ship_profile(&args.ship);
        let loaded = self
            .load(args.update, &self.listing_filter(&args.filter))
            .await?;
        let galaxy = &loaded.galaxy;

        let system = galaxy.system_by_name(&args.system)?;
        let origins = origin_stations(galaxy, &args.system, args.station.as_deref())?;
        log::info!(
            "[search] {} origin station(s) in {}",
            origins.len(),
            system.name
        );

        let options = SearchOptions {
            hops: args.hops,
            max_jumps_per_hop: args.max_jumps.unwrap_or(self.settings.max_jumps_per_hop),
            beam_width: self.settings.beam_width,
            limit: args.limit,
            round_trip: args.round_trip,
            sort: args.sort.into(),
            station_filter: self.station_filter(&ship, &args.filter),
        };
        let routes = find_routes(galaxy, &origins, &ship, &options)?;
        let alternatives = match (args.alternatives, routes.first()) {
            (Some(count), Some(best)) => alternatives_for(galaxy, best, &ship, count),
            _ => Vec::new(),
        };

        if self.json {
            return self.print_json(&RouteOutput {
                sort: options.sort,
                routes: &routes,
                alternatives,
            });
        }

        print!("{}", render_routes(&routes, options.sort));
        if let Some(best) = routes.first() {
            for (hop, trades) in best.hops.iter().zip(&alternatives) {
                if trades.is_empty() {
                    continue;
                }
                println!("Alternatives {} -> {}:", hop.from.label(), hop.to.label());
                print!("{}", render_alternatives(trades));
                println!();
            }
        }
        Ok(())
    }

    async fn markets(&self, args: MarketArgs, side: MarketSide) -> Result<(), AppError> {
        let ship = self.ship_profile(&args.ship);
        let filter = self.station_filter(&ship, &args.filter);
        let loaded = self
            .load(false, &self.listing_filter(&args.filter))
            .await?;
        let galaxy = &loaded.galaxy;

        let commodity = galaxy.find_commodity(&args.commodity)?;
        let origin = galaxy.system_by_name(&args.system)?;
        let radius_ly = args
            .radius
            .unwrap_or(ship.jump_range * self.settings.max_jumps_per_hop as f64);

        let entries = rank_markets(
            galaxy,
            &MarketQuery {
                commodity_id: commodity.id,
                origin,
                side,
                radius_ly,
                jump_range: ship.jump_range,
                filter: &filter,
                limit: args.limit,
            },
        );

        if self.json {
            return self.print_json(&entries);
        }
        print!("{}", render_markets(&commodity.name, side, &entries));
        Ok(())
    }

    async fn station(&self, system: &str, station: &str) -> Result<(), AppError> {
        let loaded = self.load(false, &self.listing_filter(&FilterArgs::default())).await?;
        let galaxy = &loaded.galaxy;
        let system = galaxy.system_by_name(system)?;
        let station = galaxy.station_in_system(system, station)?;
        let report = StationReport::build(galaxy, system, station);

        if self.json {
            return self.print_json(&report);
        }
        print!("{}", render_station(&report));
        Ok(())
    }

    async fn update(&self, force: bool) -> Result<(), AppError> {
        let loaded = self.load(force, &ListingFilter::default()).await?;
        let summary = UpdateSummary::new(
            &loaded.manifest,
            &loaded.status,
            &loaded.galaxy,
            &self.settings.cache_dir(),
        );

        if self.json {
            return self.print_json(&summary);
        }
        print!("{}", render_update(&summary));
        Ok(())
    }

    fn clear_cache(&self) -> Result<(), AppError> {
        let cache = DatasetCache::new(self.settings.cache_dir());
        cache.clear()?;
        if self.json {
            return self.print_json(&serde_json::json!({ "cleared": cache.dir() }));
        }
        println!("Removed cached market data from {}", cache.dir().display());
        Ok(())
    }

    fn ship(mut self, args: ShipArgs) -> Result<(), AppError> {
        let overrides = args.overrides();
        if !overrides.is_empty() {
            overrides.apply(&mut self.settings.ship);
            save_settings(&self.config_path, &self.settings)?;
        }

        if self.json {
            return self.print_json(&ShipOutput {
                config: self.config_path.clone(),
                ship: &self.settings.ship,
            });
        }
        print!("{}", render_ship(&self.settings.ship, &self.config_path));
        Ok(())
    }

    async fn version(&self, check: bool) -> Result<(), AppError> {
        let mut output = VersionOutput {
            name: APP_NAME,
            version: version_label(),
            latest: None,
            update_available: None,
        };
        let info = if check {
            let info = check_for_update().await?;
            output.latest = info.latest.as_ref().map(|tag| tag.raw.clone());
            output.update_available = Some(info.update_available());
            Some(info)
        } else {
            None
        };

        if self.json {
            return self.print_json(&output);
        }
        println!("{} {}", output.name, output.version);
        if let Some(info) = info {
            println!("{info}");
        }
        Ok(())
    }

    async fn load(&self, force_refresh: bool, filter: &ListingFilter) -> Result<Loaded, AppError> {
        let client =
            EddbClient::with_base_url(&self.settings.data_url, self.settings.request_timeout())?;
        let cache = DatasetCache::new(self.settings.cache_dir());
        let store = DataStore::new(client, cache, self.settings.cache_ttl());

        let payload = store
            .load(LoadMode {
                force_refresh,
                offline: self.offline,
            })
            .await?;
        Ok(Loaded {
            galaxy: Galaxy::build(payload.data, filter),
            manifest: payload.manifest,
            status: payload.status,
        })
    }

    fn ship_profile(&self, args: &ShipArgs) -> ShipProfile {
        let mut ship = self.settings.ship.clone();
        args.overrides().apply(&mut ship);
        ship
    }

    fn station_filter(&self, ship: &ShipProfile, args: &FilterArgs) -> StationFilter {
        let mut filter = self.settings.station_filter();
        filter.pad_size = ship.pad_size;
        if let Some(limit) = args.max_star_distance {
            filter.max_star_distance = Some(limit);
        }
        if let Some(allow) = args.allow_planetary() {
            filter.allow_planetary = allow;
        }
        filter
    }

    fn listing_filter(&self, args: &FilterArgs) -> ListingFilter {
        ListingFilter {
            max_age: args
                .max_age
                .map(|days| Duration::from_secs(days as u64 * 86_400))
                .or(self.settings.max_age()),
        }
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<(), AppError> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// The named station, or every station in the system.
fn origin_stations(
    galaxy: &Galaxy,
    system: &str,
    station: Option<&str>,
) -> Result<Vec<StationId>, AppError> {
    let system = galaxy.system_by_name(system)?;
    if let Some(name) = station {
        return Ok(vec![galaxy.station_in_system(system, name)?.id]);
    }
    let origins: Vec<StationId> = galaxy
        .stations_in_system(system.id)
        .into_iter()
        .map(|station| station.id)
        .collect();
    if origins.is_empty() {
        return Err(AppError::NoStations(system.name.clone()));
    }
    Ok(origins)
}

/// Runner-up trades for every hop of `route`, at the credits the route
/// had when it reached that hop.
fn alternatives_for(
    galaxy: &Galaxy,
    route: &Route,
    ship: &ShipProfile,
    count: usize,
) -> Vec<Vec<Trade>> {
    let mut credits = route.starting_credits;
    route
        .hops
        .iter()
        .map(|hop| {
            let trades: Vec<Trade> = trades_between(
                galaxy,
                galaxy.market(hop.from.station_id),
                galaxy.market(hop.to.station_id),
                ship.capacity,
                credits,
            )
            .into_iter()
            .filter(|trade| trade.commodity_id != hop.trade.commodity_id)
            .take(count)
            .collect();
            credits = credits.saturating_add(hop.trade.profit);
            trades
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{sample_dataset, sample_ship, SILVER};
    use crate::domain::PadSize;

    fn galaxy() -> Galaxy {
        Galaxy::build(sample_dataset(), &ListingFilter::default())
    }

    fn app(settings: Settings) -> App {
        App {
            settings,
            config_path: PathBuf::from("config.json"),
            offline: true,
            json: false,
        }
    }

    #[test]
    fn filter_flags_override_saved_settings() {
        let mut settings = Settings::default();
        settings.max_star_distance = Some(1000.0);
        settings.allow_planetary = false;
        let app = app(settings);
        let ship = ShipProfile {
            pad_size: PadSize::Large,
            ..sample_ship()
        };

        let saved = app.station_filter(&ship, &FilterArgs::default());
        assert_eq!(saved.pad_size, PadSize::Large);
        assert_eq!(saved.max_star_distance, Some(1000.0));
        assert!(!saved.allow_planetary);

        let args = FilterArgs {
            max_star_distance: Some(500.0),
            planetary: true,
            ..FilterArgs::default()
        };
        let overridden = app.station_filter(&ship, &args);
        assert_eq!(overridden.max_star_distance, Some(500.0));
        assert!(overridden.allow_planetary);
    }

    #[test]
    fn every_station_in_the_system_is_an_origin() {
        let galaxy = galaxy();
        assert_eq!(origin_stations(&galaxy, "lhs 3447", None).unwrap(), vec![10, 11]);
        assert_eq!(
            origin_stations(&galaxy, "LHS 3447", Some("bluford orbital")).unwrap(),
            vec![11]
        );
        assert!(matches!(
            origin_stations(&galaxy, "LHS 3447", Some("Nowhere")),
            Err(AppError::Lookup(LookupError::UnknownStation { .. }))
        ));
        assert!(matches!(
            origin_stations(&galaxy, "Achenar", None),
            Err(AppError::Lookup(LookupError::UnknownSystem(_)))
        ));
    }

    #[test]
    fn alternatives_skip_the_chosen_commodity() {
        let mut dataset = sample_dataset();
        // Trevithick Dock also sells silver, which Russell Ring buys.
        dataset.listings.push(crate::domain::Listing {
            station_id: 10,
            commodity_id: SILVER,
            supply: 50,
            supply_bracket: None,
            buy_price: 4200,
            sell_price: 0,
            demand: 0,
            demand_bracket: None,
            collected_at: crate::domain::fixtures::now(),
        });
        let galaxy = Galaxy::build(dataset, &ListingFilter::default());
        let routes =
            find_routes(&galaxy, &[10], &sample_ship(), &SearchOptions::default()).unwrap();

        let alternatives = alternatives_for(&galaxy, &routes[0], &sample_ship(), 3);
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].len(), 1);
        assert_eq!(alternatives[0][0].commodity_name, "Silver");
        assert_eq!(alternatives[0][0].profit, 50 * 300);
    }

    #[test]
    fn alternatives_survive_huge_credit_balances() {
        let galaxy = galaxy();
        let ship = ShipProfile {
            credits: u64::MAX,
            ..sample_ship()
        };
        let options = SearchOptions {
            hops: 2,
            round_trip: true,
            ..SearchOptions::default()
        };
        let routes = find_routes(&galaxy, &[10], &ship, &options).unwrap();
        assert_eq!(routes[0].hops.len(), 2);

        let alternatives = alternatives_for(&galaxy, &routes[0], &ship, 3);
        assert_eq!(alternatives.len(), 2);
        assert!(alternatives.iter().all(Vec::is_empty));
    }
}
