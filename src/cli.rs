//! Command line definition.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::ShipOverrides;
use crate::domain::{PadSize, RouteSort};

#[derive(Debug, Parser)]
#[command(name = "edtp", version, about = "Command line Elite: Dangerous trade route finder.")]
pub struct Cli {
    /// Settings file to use instead of the platform default
    #[arg(long, global = true, env = "EDTP_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the market data dumps
    #[arg(long, global = true, value_name = "URL")]
    pub data_url: Option<String>,

    /// Never touch the network; use whatever is cached
    #[arg(long, global = true)]
    pub offline: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find the most profitable trade routes starting in a system
    Route(RouteArgs),
    /// Best places near a system to sell a commodity
    Sell(MarketArgs),
    /// Best places near a system to buy a commodity
    Buy(MarketArgs),
    /// Show a station and its market
    Station {
        system: String,
        station: String,
    },
    /// Download the market data unless the cache is still fresh
    Update {
        /// Download even if the cache is fresh
        #[arg(short, long)]
        force: bool,

        /// Delete the cached market data instead
        #[arg(long, conflicts_with = "force")]
        clear: bool,
    },
    /// Show the saved ship profile, or change it
    Ship(ShipArgs),
    /// Print the version
    Version {
        /// Ask GitHub whether a newer release exists
        #[arg(long)]
        check: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ShipArgs {
    /// Cargo capacity in tonnes
    #[arg(short, long)]
    pub capacity: Option<u32>,

    /// Available credits
    #[arg(short = 'm', long)]
    pub credits: Option<u64>,

    /// Laden jump range in light years
    #[arg(short, long, value_parser = parse_positive)]
    pub jump_range: Option<f64>,

    /// Landing pad the ship needs (S, M or L)
    #[arg(short, long)]
    pub pad: Option<PadSize>,
}

impl ShipArgs {
    pub fn overrides(&self) -> ShipOverrides {
        ShipOverrides {
            capacity: self.capacity,
            credits: self.credits,
            jump_range: self.jump_range,
            pad_size: self.pad,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Skip stations further than this from the star, in light seconds
    #[arg(long, value_name = "LS", value_parser = parse_positive)]
    pub max_star_distance: Option<f64>,

    /// Include planetary stations
    #[arg(long, overrides_with = "no_planetary")]
    pub planetary: bool,

    /// Exclude planetary stations
    #[arg(long, overrides_with = "planetary")]
    pub no_planetary: bool,

    /// Ignore market data older than this many days
    #[arg(long, value_name = "DAYS")]
    pub max_age: Option<u32>,
}

impl FilterArgs {
    /// `None` when neither flag was given.
    pub fn allow_planetary(&self) -> Option<bool> {
        match (self.planetary, self.no_planetary) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RouteArgs {
    pub system: String,

    /// Start from this station only; otherwise every station in the system
    pub station: Option<String>,

    #[command(flatten)]
    pub ship: ShipArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Number of trades in a route
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub hops: u32,

    /// Maximum jumps between two stations
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_jumps: Option<u32>,

    #[arg(long, value_enum, default_value_t = SortArg::Profit)]
    pub sort: SortArg,

    /// Number of routes to show
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,

    /// The last hop returns to the starting station
    #[arg(long)]
    pub round_trip: bool,

    /// Also list the next best trades for each hop of the top route
    #[arg(long, value_name = "N")]
    pub alternatives: Option<usize>,

    /// Refresh the market data first
    #[arg(long)]
    pub update: bool,
}

#[derive(Debug, Clone, Args)]
pub struct MarketArgs {
    pub commodity: String,

    pub system: String,

    /// Search radius in light years (default: jump range times max jumps)
    #[arg(long, value_name = "LY", value_parser = parse_positive)]
    pub radius: Option<f64>,

    #[command(flatten)]
    pub ship: ShipArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Number of stations to show
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Profit,
    PerJump,
    PerUnit,
}

impl From<SortArg> for RouteSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Profit => RouteSort::Profit,
            SortArg::PerJump => RouteSort::ProfitPerJump,
            SortArg::PerUnit => RouteSort::ProfitPerUnit,
        }
    }
}

fn parse_positive(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if parsed.is_finite() && parsed > 0.0 {
        Ok(parsed)
    } else {
        Err(format!("'{value}' must be greater than zero"))
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_route_with_overrides() {
        let cli = Cli::try_parse_from([
            "edtp", "--offline", "route", "LHS 3447", "Trevithick Dock", "-c", "720", "-m",
            "5000000", "-j", "22.5", "-p", "l", "--hops", "3", "--sort", "per-jump",
            "--round-trip", "--no-planetary",
        ])
        .unwrap();
        assert!(cli.offline);
        let Command::Route(args) = cli.command else {
            panic!("expected route");
        };
        assert_eq!(args.system, "LHS 3447");
        assert_eq!(args.station.as_deref(), Some("Trevithick Dock"));
        assert_eq!(args.ship.capacity, Some(720));
        assert_eq!(args.ship.credits, Some(5_000_000));
        assert_eq!(args.ship.jump_range, Some(22.5));
        assert_eq!(args.ship.pad, Some(PadSize::Large));
        assert_eq!(args.hops, 3);
        assert_eq!(RouteSort::from(args.sort), RouteSort::ProfitPerJump);
        assert!(args.round_trip);
        assert_eq!(args.filter.allow_planetary(), Some(false));
        assert_eq!(args.limit, 10);
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["edtp", "sell", "gold", "Eravate", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        let Command::Sell(args) = cli.command else {
            panic!("expected sell");
        };
        assert_eq!(args.commodity, "gold");
        assert_eq!(args.radius, None);
        assert_eq!(args.filter.allow_planetary(), None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Cli::try_parse_from(["edtp", "route", "Sol", "--hops", "0"]).is_err());
        assert!(Cli::try_parse_from(["edtp", "route", "Sol", "-p", "XL"]).is_err());
        assert!(Cli::try_parse_from(["edtp", "buy", "gold", "Sol", "--radius", "-3"]).is_err());
        assert!(Cli::try_parse_from(["edtp", "route", "Sol", "--sort", "fastest"]).is_err());
    }

    #[test]
    fn ship_arguments_become_overrides() {
        let cli = Cli::try_parse_from(["edtp", "ship", "--capacity", "64"]).unwrap();
        let Command::Ship(args) = cli.command else {
            panic!("expected ship");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.capacity, Some(64));
        assert!(overrides.credits.is_none());
        assert!(ShipArgs::default().overrides().is_empty());
    }
}
