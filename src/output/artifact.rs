use crate::config::OutputConfig;

/// Canonical outputs of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    CountryUrls,
    EventUrls,
    AthleteUrls,
    AthletesCsv,
    AthletesJson,
    HostCitiesCsv,
    NocCountriesCsv,
    AthleteRolesCsv,
    FailedUrls,
}

impl Artifact {
    pub const ALL: [Artifact; 9] = [
        Artifact::CountryUrls,
        Artifact::EventUrls,
        Artifact::AthleteUrls,
        Artifact::AthletesCsv,
        Artifact::AthletesJson,
        Artifact::HostCitiesCsv,
        Artifact::NocCountriesCsv,
        Artifact::AthleteRolesCsv,
        Artifact::FailedUrls,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Artifact::CountryUrls => "countries_urls.json",
            Artifact::EventUrls => "events_urls.json",
            Artifact::AthleteUrls => "athletes_urls.json",
            Artifact::AthletesCsv => "athletes.csv",
            Artifact::AthletesJson => "athletes_content.json.gz",
            Artifact::HostCitiesCsv => "host_cities.csv",
            Artifact::NocCountriesCsv => "noc_countries.csv",
            Artifact::AthleteRolesCsv => "athletes_roles.csv",
            Artifact::FailedUrls => "failed_urls.json",
        }
    }

    /// Intermediate artifacts live in the raw data directory
    pub fn is_raw(&self) -> bool {
        matches!(
            self,
            Artifact::CountryUrls
                | Artifact::EventUrls
                | Artifact::AthleteUrls
                | Artifact::AthletesJson
                | Artifact::FailedUrls
        )
    }
}

/// Maps artifacts to store keys
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    raw_data_dir: String,
    data_dir: String,
}

impl ArtifactPaths {
    pub fn new(raw_data_dir: &str, data_dir: &str) -> Self {
        Self {
            raw_data_dir: raw_data_dir.trim_end_matches('/').to_string(),
            data_dir: data_dir.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.raw_data_dir, &config.data_dir)
    }

    pub fn key(&self, artifact: Artifact) -> String {
        let dir = if artifact.is_raw() {
            &self.raw_data_dir
        } else {
            &self.data_dir
        };
        format!("{}/{}", dir, artifact.file_name())
    }

    /// Where a stage streams output before publishing it under [`key`](Self::key)
    pub fn partial_key(&self, artifact: Artifact) -> String {
        format!("{}.partial", self.key(artifact))
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::from_config(&OutputConfig::default())
    }
}
