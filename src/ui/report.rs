//! Plain-text rendering of command results.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::domain::{
    bracket_label, Galaxy, MarketEntry, MarketSide, Route, RouteSort, ShipProfile, Station,
    System, Trade,
};
use crate::infra::cache::Manifest;
use crate::infra::store::CacheStatus;
use crate::ui::format::{
    format_compact, format_credits, format_ls, format_ly, format_timestamp, format_units,
    humanize_age,
};
use crate::ui::table::{Align, Table};

pub fn render_routes(routes: &[Route], sort: RouteSort) -> String {
    if routes.is_empty() {
        return "No profitable routes found.\n".to_string();
    }

    let mut out = String::new();
    for (rank, route) in routes.iter().enumerate() {
        let _ = writeln!(
            out,
            "#{}  {}  |  {} jumps, {}  |  {}/jump  |  {}/t  (ranked by {})",
            rank + 1,
            format_credits(route.total_profit as f64),
            route.total_jumps,
            format_ly(route.total_distance_ly()),
            format_compact(route.profit_per_jump()),
            format_compact(route.profit_per_unit()),
            sort.label()
        );

        let mut table = Table::new(&[
            ("From", Align::Left),
            ("To", Align::Left),
            ("Dist", Align::Right),
            ("Jumps", Align::Right),
            ("Commodity", Align::Left),
            ("Units", Align::Right),
            ("Buy", Align::Right),
            ("Sell", Align::Right),
            ("Cost", Align::Right),
            ("Profit", Align::Right),
        ]);
        for hop in &route.hops {
            table.push_row(vec![
                hop.from.label(),
                hop.to.label(),
                format_ly(hop.distance_ly),
                hop.jumps.to_string(),
                hop.trade.commodity_name.clone(),
                hop.trade.units.to_string(),
                hop.trade.buy_price.to_string(),
                hop.trade.sell_price.to_string(),
                format_credits(hop.trade.invest() as f64),
                format_credits(hop.trade.profit as f64),
            ]);
        }
        out.push_str(&table.render());
        let _ = writeln!(
            out,
            "Credits: {} -> {}\n",
            format_credits(route.starting_credits as f64),
            format_credits(route.final_credits as f64)
        );
    }
    out
}

/// Lists the runner-up trades of a single hop.
pub fn render_alternatives(trades: &[Trade]) -> String {
    let mut table = Table::new(&[
        ("Commodity", Align::Left),
        ("Units", Align::Right),
        ("Buy", Align::Right),
        ("Sell", Align::Right),
        ("Profit/t", Align::Right),
        ("Profit", Align::Right),
    ]);
    for trade in trades {
        table.push_row(vec![
            trade.commodity_name.clone(),
            trade.units.to_string(),
            trade.buy_price.to_string(),
            trade.sell_price.to_string(),
            trade.unit_profit.to_string(),
            format_credits(trade.profit as f64),
        ]);
    }
    table.render()
}

pub fn render_markets(commodity: &str, side: MarketSide, entries: &[MarketEntry]) -> String {
    let verb = match side {
        MarketSide::Sell => "sell",
        MarketSide::Buy => "buy",
    };
    if entries.is_empty() {
        return format!("Nowhere in range to {verb} {commodity}.\n");
    }

    let units_header = match side {
        MarketSide::Sell => "Demand",
        MarketSide::Buy => "Supply",
    };
    let mut table = Table::new(&[
        ("Station", Align::Left),
        ("Price", Align::Right),
        ("Adjusted", Align::Right),
        (units_header, Align::Right),
        ("Dist", Align::Right),
        ("Jumps", Align::Right),
        ("Pad", Align::Left),
        ("Star dist", Align::Right),
        ("Updated", Align::Left),
        ("Notes", Align::Left),
    ]);
    for entry in entries {
        table.push_row(vec![
            entry.station.label(),
            entry.price.to_string(),
            format!("{:.0}", entry.adjusted_price),
            format_units(entry.units),
            format_ly(entry.distance_ly),
            entry.jumps.to_string(),
            entry
                .max_pad
                .map(|pad| pad.label().to_string())
                .unwrap_or_default(),
            format_ls(entry.distance_to_star),
            humanize_age(entry.collected_at),
            entry.notes.clone().unwrap_or_default(),
        ]);
    }
    format!("Best places to {verb} {commodity}:\n{}", table.render())
}

#[derive(Clone, Debug, Serialize)]
pub struct StationMarketRow {
    pub commodity: String,
    pub category: String,
    pub buy_price: u32,
    pub supply: u32,
    pub supply_level: Option<&'static str>,
    pub sell_price: u32,
    pub demand: u32,
    pub demand_level: Option<&'static str>,
    pub collected_at: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct StationReport {
    pub system: System,
    pub station: Station,
    pub market: Vec<StationMarketRow>,
}

impl StationReport {
    pub fn build(galaxy: &Galaxy, system: &System, station: &Station) -> Self {
        let mut market: Vec<StationMarketRow> = galaxy
            .market(station.id)
            .values()
            .map(|listing| {
                let commodity = galaxy.commodity(listing.commodity_id);
                StationMarketRow {
                    commodity: commodity
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| format!("#{}", listing.commodity_id)),
                    category: commodity
                        .map(|c| c.category.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    buy_price: listing.buy_price,
                    supply: listing.supply,
                    supply_level: bracket_label(listing.supply_bracket),
                    sell_price: listing.sell_price,
                    demand: listing.demand,
                    demand_level: bracket_label(listing.demand_bracket),
                    collected_at: listing.collected_at,
                }
            })
            .collect();
        market.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.commodity.cmp(&b.commodity))
        });
        Self {
            system: system.clone(),
            station: station.clone(),
            market,
        }
    }
}

pub fn render_station(report: &StationReport) -> String {
    let station = &report.station;
    let mut out = String::new();
    let _ = writeln!(out, "{} / {}", report.system.name, station.name);
    let _ = writeln!(
        out,
        "Pad: {}  Star distance: {}  {}",
        station
            .max_pad
            .map(|pad| pad.label())
            .unwrap_or("unknown"),
        format_ls(station.distance_to_star),
        if station.is_planetary {
            "Planetary"
        } else {
            "Orbital"
        }
    );
    if report.system.needs_permit {
        out.push_str("System requires a permit.\n");
    }

    if report.market.is_empty() {
        out.push_str("No market data.\n");
        return out;
    }

    let mut table = Table::new(&[
        ("Commodity", Align::Left),
        ("Category", Align::Left),
        ("Buy", Align::Right),
        ("Supply", Align::Right),
        ("Sell", Align::Right),
        ("Demand", Align::Right),
        ("Updated", Align::Left),
    ]);
    let price = |value: u32| {
        if value == 0 {
            "—".to_string()
        } else {
            value.to_string()
        }
    };
    for row in &report.market {
        table.push_row(vec![
            row.commodity.clone(),
            row.category.clone(),
            price(row.buy_price),
            format_units(row.supply),
            price(row.sell_price),
            format_units(row.demand),
            humanize_age(row.collected_at),
        ]);
    }
    out.push('\n');
    out.push_str(&table.render());
    out
}

pub fn render_ship(ship: &ShipProfile, path: &Path) -> String {
    format!(
        "Ship profile ({}):\n  Capacity:   {} t\n  Credits:    {}\n  Jump range: {}\n  Pad size:   {}\n",
        path.display(),
        ship.capacity,
        format_credits(ship.credits as f64),
        format_ly(ship.jump_range),
        ship.pad_size
    )
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateSummary {
    pub source_url: String,
    pub fetched_at: u64,
    pub status: &'static str,
    pub bytes: u64,
    pub systems: usize,
    pub stations: usize,
    pub listings: usize,
    pub cache_dir: String,
}

impl UpdateSummary {
    pub fn new(manifest: &Manifest, status: &CacheStatus, galaxy: &Galaxy, cache_dir: &Path) -> Self {
        Self {
            source_url: manifest.source_url.clone(),
            fetched_at: manifest.fetched_at,
            status: status_label(status),
            bytes: manifest.total_bytes(),
            systems: galaxy.system_count(),
            stations: galaxy.station_count(),
            listings: galaxy.listing_count(),
            cache_dir: cache_dir.display().to_string(),
        }
    }
}

pub fn status_label(status: &CacheStatus) -> &'static str {
    match status {
        CacheStatus::Fresh => "downloaded",
        CacheStatus::Cached => "cached",
        CacheStatus::Stale => "stale",
    }
}

pub fn render_update(summary: &UpdateSummary) -> String {
    format!(
        "Market data {} ({} from {}, {:.1} MB)\n  {} systems, {} stations, {} listings\n  Cache: {}\n",
        summary.status,
        format_timestamp(summary.fetched_at),
        summary.source_url,
        summary.bytes as f64 / 1_000_000.0,
        summary.systems,
        summary.stations,
        summary.listings,
        summary.cache_dir
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::fixtures::{sample_dataset, sample_ship};
    use crate::domain::{find_routes, ListingFilter, SearchOptions};

    #[test]
    fn renders_routes_with_hops() {
        let galaxy = Galaxy::build(sample_dataset(), &ListingFilter::default());
        let routes = find_routes(&galaxy, &[10], &sample_ship(), &SearchOptions::default()).unwrap();
        let text = render_routes(&routes, RouteSort::Profit);
        assert!(text.starts_with("#1  100,000 Cr  |  1 jumps, 6.0 ly"));
        assert!(text.contains("LHS 3447 / Trevithick Dock"));
        assert!(text.contains("Eravate / Russell Ring"));
        assert!(text.contains("900,000 Cr"));
        assert!(text.contains("Credits: 1,000,000 Cr -> 1,100,000 Cr"));
    }

    #[test]
    fn empty_results_say_so() {
        assert_eq!(render_routes(&[], RouteSort::Profit), "No profitable routes found.\n");
        assert_eq!(
            render_markets("Gold", MarketSide::Buy, &[]),
            "Nowhere in range to buy Gold.\n"
        );
    }

    #[test]
    fn station_report_sorts_by_category_then_name() {
        let galaxy = Galaxy::build(sample_dataset(), &ListingFilter::default());
        let system = galaxy.system_by_name("Eravate").unwrap();
        let station = galaxy.station_in_system(system, "Russell Ring").unwrap();
        let report = StationReport::build(&galaxy, system, station);
        let names: Vec<_> = report.market.iter().map(|r| r.commodity.as_str()).collect();
        assert_eq!(names, vec!["Gold", "Palladium", "Silver"]);
        assert_eq!(report.market[0].demand_level, Some("High"));

        let text = render_station(&report);
        assert!(text.starts_with("Eravate / Russell Ring\nPad: L  Star distance: 300 ls  Orbital\n"));
    }

    #[test]
    fn ship_profile_lists_every_field() {
        let text = render_ship(&sample_ship(), &PathBuf::from("/tmp/config.json"));
        assert!(text.contains("Capacity:   100 t"));
        assert!(text.contains("Credits:    1,000,000 Cr"));
        assert!(text.contains("Jump range: 15.0 ly"));
        assert!(text.contains("Pad size:   M"));
    }
}
