use crate::output::Artifact;
use clap::ValueEnum;
use std::fmt;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Stage {
    Countries,
    Events,
    Athletes,
    ScrapeAthletes,
    ScrapeHostCities,
    ScrapeNocs,
    ExtractRoles,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Countries,
        Stage::Events,
        Stage::Athletes,
        Stage::ScrapeAthletes,
        Stage::ScrapeHostCities,
        Stage::ScrapeNocs,
        Stage::ExtractRoles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Countries => "countries",
            Stage::Events => "events",
            Stage::Athletes => "athletes",
            Stage::ScrapeAthletes => "scrape-athletes",
            Stage::ScrapeHostCities => "scrape-host-cities",
            Stage::ScrapeNocs => "scrape-nocs",
            Stage::ExtractRoles => "extract-roles",
        }
    }

    /// Status line published while the stage runs
    pub fn status_message(&self) -> &'static str {
        match self {
            Stage::Countries => "Fetching country URLs...",
            Stage::Events => "Fetching event URLs...",
            Stage::Athletes => "Fetching athlete URLs...",
            Stage::ScrapeAthletes => "Scraping athlete data...",
            Stage::ScrapeHostCities => "Scraping host cities...",
            Stage::ScrapeNocs => "Scraping NOC countries...",
            Stage::ExtractRoles => "Extracting athlete roles...",
        }
    }

    /// Label used in progress lines
    pub fn task(&self) -> &'static str {
        self.status_message().trim_end_matches("...")
    }

    /// The artifact whose presence marks the stage as done
    pub fn output(&self) -> Artifact {
        match self {
            Stage::Countries => Artifact::CountryUrls,
            Stage::Events => Artifact::EventUrls,
            Stage::Athletes => Artifact::AthleteUrls,
            Stage::ScrapeAthletes => Artifact::AthletesCsv,
            Stage::ScrapeHostCities => Artifact::HostCitiesCsv,
            Stage::ScrapeNocs => Artifact::NocCountriesCsv,
            Stage::ExtractRoles => Artifact::AthleteRolesCsv,
        }
    }

    /// Everything the stage writes, its output first
    pub fn artifacts(&self) -> &'static [Artifact] {
        match self {
            Stage::Countries => &[Artifact::CountryUrls],
            Stage::Events => &[Artifact::EventUrls],
            Stage::Athletes => &[Artifact::AthleteUrls],
            Stage::ScrapeAthletes => &[Artifact::AthletesCsv, Artifact::AthletesJson],
            Stage::ScrapeHostCities => &[Artifact::HostCitiesCsv],
            Stage::ScrapeNocs => &[Artifact::NocCountriesCsv],
            Stage::ExtractRoles => &[Artifact::AthleteRolesCsv],
        }
    }

    /// The artifact the stage reads, if it depends on an earlier one
    pub fn input(&self) -> Option<Artifact> {
        match self {
            Stage::Countries | Stage::ScrapeHostCities | Stage::ScrapeNocs => None,
            Stage::Events => Some(Artifact::CountryUrls),
            Stage::Athletes => Some(Artifact::EventUrls),
            Stage::ScrapeAthletes => Some(Artifact::AthleteUrls),
            Stage::ExtractRoles => Some(Artifact::AthletesJson),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
