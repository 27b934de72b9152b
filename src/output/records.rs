//! Structured records produced by the scrape stages

use serde::{Deserialize, Serialize};

/// A record that can be written as one CSV row under a fixed header
pub trait CsvRecord: Serialize {
    /// Column names, in field order
    const HEADERS: &'static [&'static str];
}

/// One (athlete, event participation) pair
///
/// Biographical fields repeat on every row of the same athlete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AthleteRecord {
    pub id: u64,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub born: Option<String>,
    pub died: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub noc: Option<String>,
    pub roles: Option<String>,
    pub game: Option<String>,
    pub team: Option<String>,
    pub sport: Option<String>,
    pub event: Option<String>,
    pub position: Option<String>,
    pub image_url: Option<String>,
}

impl CsvRecord for AthleteRecord {
    const HEADERS: &'static [&'static str] = &[
        "id", "name", "gender", "born", "died", "height", "weight", "noc", "roles", "game",
        "team", "sport", "event", "position", "image_url",
    ];
}

/// One Games edition and the city that hosted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCityRecord {
    pub year: String,
    pub season: String,
    pub game: String,
    pub host_city: String,
}

impl CsvRecord for HostCityRecord {
    const HEADERS: &'static [&'static str] = &["year", "season", "game", "host_city"];
}

/// National committee code and the country it represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NocCountryRecord {
    pub noc: String,
    pub country: String,
}

impl CsvRecord for NocCountryRecord {
    const HEADERS: &'static [&'static str] = &["noc", "country"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteRoleRecord {
    pub id: u64,
    pub name: Option<String>,
    pub roles: String,
}

impl CsvRecord for AthleteRoleRecord {
    const HEADERS: &'static [&'static str] = &["id", "name", "roles"];
}
