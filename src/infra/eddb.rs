//! Thin asynchronous client for the EDDB-style market dumps.
//!
//! - Downloads the four dump files (systems, stations, commodities, listings).
//! - Parses them into the domain [`Dataset`], tolerating sparse records.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Deserialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::{Commodity, Coords, Dataset, Listing, PadSize, Station, System};
use crate::util::version::user_agent;

pub const DEFAULT_BASE_URL: &str = "https://eddb.io/archive/v6/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum EddbClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },
    #[error("malformed {file}: {source}")]
    Json {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed listings: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DumpFile {
    Systems,
    Stations,
    Commodities,
    Listings,
}

impl DumpFile {
    pub const ALL: [DumpFile; 4] = [
        DumpFile::Systems,
        DumpFile::Stations,
        DumpFile::Commodities,
        DumpFile::Listings,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Systems => "systems_populated.json",
            Self::Stations => "stations.json",
            Self::Commodities => "commodities.json",
            Self::Listings => "listings.csv",
        }
    }
}

/// Unparsed dump contents, exactly as downloaded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawDumps {
    pub systems: Vec<u8>,
    pub stations: Vec<u8>,
    pub commodities: Vec<u8>,
    pub listings: Vec<u8>,
}

impl RawDumps {
    pub fn get(&self, file: DumpFile) -> &[u8] {
        match file {
            DumpFile::Systems => &self.systems,
            DumpFile::Stations => &self.stations,
            DumpFile::Commodities => &self.commodities,
            DumpFile::Listings => &self.listings,
        }
    }

    pub fn set(&mut self, file: DumpFile, data: Vec<u8>) {
        match file {
            DumpFile::Systems => self.systems = data,
            DumpFile::Stations => self.stations = data,
            DumpFile::Commodities => self.commodities = data,
            DumpFile::Listings => self.listings = data,
        }
    }

    pub fn total_bytes(&self) -> usize {
        DumpFile::ALL.iter().map(|file| self.get(*file).len()).sum()
    }
}

/// Anything that can hand over a full set of dumps.
#[allow(async_fn_in_trait)]
pub trait DumpSource {
    fn source_url(&self) -> String;

    async fn fetch_all(&self) -> Result<RawDumps, EddbClientError>;
}

#[derive(Clone)]
pub struct EddbClient {
    http: Client,
    base_url: Url,
}

impl EddbClient {
    pub fn with_base_url(base: &str, timeout: Duration) -> Result<Self, EddbClientError> {
        // `Url::join` drops the last path segment unless it ends with a slash.
        let base_url = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    pub async fn fetch_dump(&self, file: DumpFile) -> Result<Vec<u8>, EddbClientError> {
        let url = self.url(file.file_name())?;
        log::info!("[eddb] Downloading {url}");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EddbClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        log::info!("[eddb] Received {} bytes for {}", bytes.len(), file.file_name());
        Ok(bytes.to_vec())
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

impl DumpSource for EddbClient {
    fn source_url(&self) -> String {
        self.base_url.to_string()
    }

    async fn fetch_all(&self) -> Result<RawDumps, EddbClientError> {
        let (systems, stations, commodities, listings) = tokio::try_join!(
            self.fetch_dump(DumpFile::Systems),
            self.fetch_dump(DumpFile::Stations),
            self.fetch_dump(DumpFile::Commodities),
            self.fetch_dump(DumpFile::Listings),
        )?;
        Ok(RawDumps {
            systems,
            stations,
            commodities,
            listings,
        })
    }
}

pub fn parse_dataset(raw: &RawDumps) -> Result<Dataset, EddbClientError> {
    Ok(Dataset {
        systems: parse_systems(&raw.systems)?,
        stations: parse_stations(&raw.stations)?,
        commodities: parse_commodities(&raw.commodities)?,
        listings: parse_listings(&raw.listings)?,
    })
}

#[derive(Debug, Deserialize)]
struct SystemDto {
    id: u32,
    name: String,
    #[serde(deserialize_with = "number_from_json")]
    x: f64,
    #[serde(deserialize_with = "number_from_json")]
    y: f64,
    #[serde(deserialize_with = "number_from_json")]
    z: f64,
    #[serde(default, deserialize_with = "flag_from_json")]
    needs_permit: Option<bool>,
}

impl From<SystemDto> for System {
    fn from(dto: SystemDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            coords: Coords::new(dto.x, dto.y, dto.z),
            needs_permit: dto.needs_permit.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StationDto {
    id: u32,
    name: String,
    system_id: u32,
    #[serde(default)]
    max_landing_pad_size: Option<String>,
    #[serde(default, deserialize_with = "optional_number_from_json")]
    distance_to_star: Option<f64>,
    #[serde(default, deserialize_with = "flag_from_json")]
    is_planetary: Option<bool>,
    #[serde(default, deserialize_with = "timestamp_from_json")]
    updated_at: Option<u64>,
}

impl From<StationDto> for Station {
    fn from(dto: StationDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            system_id: dto.system_id,
            max_pad: dto
                .max_landing_pad_size
                .as_deref()
                .and_then(|raw| raw.parse::<PadSize>().ok()),
            distance_to_star: dto.distance_to_star,
            is_planetary: dto.is_planetary.unwrap_or(false),
            updated_at: dto.updated_at.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CategoryDto {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CommodityDto {
    id: u32,
    name: String,
    #[serde(default)]
    category: Option<CategoryDto>,
    #[serde(default, deserialize_with = "optional_number_from_json")]
    average_price: Option<f64>,
    #[serde(default, deserialize_with = "flag_from_json")]
    is_rare: Option<bool>,
}

impl From<CommodityDto> for Commodity {
    fn from(dto: CommodityDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            category: dto
                .category
                .map(|c| c.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            average_price: dto.average_price,
            is_rare: dto.is_rare.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListingRecord {
    station_id: u32,
    commodity_id: u32,
    supply: u32,
    #[serde(default)]
    supply_bracket: Option<i8>,
    buy_price: u32,
    sell_price: u32,
    demand: u32,
    #[serde(default)]
    demand_bracket: Option<i8>,
    collected_at: u64,
}

impl From<ListingRecord> for Listing {
    fn from(record: ListingRecord) -> Self {
        Self {
            station_id: record.station_id,
            commodity_id: record.commodity_id,
            supply: record.supply,
            supply_bracket: positive_bracket(record.supply_bracket),
            buy_price: record.buy_price,
            sell_price: record.sell_price,
            demand: record.demand,
            demand_bracket: positive_bracket(record.demand_bracket),
            collected_at: record.collected_at,
        }
    }
}

fn positive_bracket(raw: Option<i8>) -> Option<u8> {
    raw.filter(|value| *value > 0).map(|value| value as u8)
}

pub fn parse_systems(bytes: &[u8]) -> Result<Vec<System>, EddbClientError> {
    let dtos: Vec<SystemDto> = serde_json::from_slice(bytes).map_err(|source| {
        EddbClientError::Json {
            file: DumpFile::Systems.file_name(),
            source,
        }
    })?;
    Ok(dtos.into_iter().map(System::from).collect())
}

pub fn parse_stations(bytes: &[u8]) -> Result<Vec<Station>, EddbClientError> {
    let dtos: Vec<StationDto> = serde_json::from_slice(bytes).map_err(|source| {
        EddbClientError::Json {
            file: DumpFile::Stations.file_name(),
            source,
        }
    })?;
    Ok(dtos.into_iter().map(Station::from).collect())
}

pub fn parse_commodities(bytes: &[u8]) -> Result<Vec<Commodity>, EddbClientError> {
    let dtos: Vec<CommodityDto> = serde_json::from_slice(bytes).map_err(|source| {
        EddbClientError::Json {
            file: DumpFile::Commodities.file_name(),
            source,
        }
    })?;
    Ok(dtos.into_iter().map(Commodity::from).collect())
}

/// Rows that fail to deserialize are skipped; a missing or broken header
/// fails the whole file.
pub fn parse_listings(bytes: &[u8]) -> Result<Vec<Listing>, EddbClientError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    reader.headers()?;

    let mut listings = Vec::new();
    let mut skipped = 0_usize;
    for record in reader.deserialize::<ListingRecord>() {
        match record {
            Ok(record) => listings.push(Listing::from(record)),
            Err(error) => {
                skipped += 1;
                log::debug!("[eddb] Skipping listing row: {error}");
            }
        }
    }
    if skipped > 0 {
        log::warn!("[eddb] Skipped {skipped} malformed listing rows");
    }
    Ok(listings)
}

fn parse_timestamp_str(raw: &str) -> Option<u64> {
    if let Ok(secs) = raw.trim().parse::<i64>() {
        return u64::try_from(secs).ok();
    }
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|dt| u64::try_from(dt.unix_timestamp()).ok())
}

fn timestamp_from_json<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Timestamp;

    impl<'de> serde::de::Visitor<'de> for Timestamp {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("unix seconds or an RFC 3339 date")
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(u64::try_from(value).ok())
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(parse_timestamp_str(value))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Timestamp)
}

fn optional_number_from_json<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct NumberOrString;

    impl<'de> serde::de::Visitor<'de> for NumberOrString {
        type Value = Option<f64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value as f64))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.trim().parse::<f64>().ok())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(NumberOrString)
}

fn number_from_json<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    optional_number_from_json(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected a coordinate"))
}

/// Booleans arrive as `true`/`false`, `0`/`1` or `null` depending on the dump.
fn flag_from_json<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Flag;

    impl<'de> serde::de::Visitor<'de> for Flag {
        type Value = Option<bool>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a boolean or 0/1")
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value != 0))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value != 0))
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Flag)
}
