//! Stage sequencing, checkpoint skipping and status reporting

use crate::config::{Config, CrawlerConfig};
use crate::crawler::{extract_roles, fetcher_from_config, scrape_page, FrontierStage, RecordStage, StageContext};
use crate::output::{
    read_url_list, Artifact, ArtifactPaths, ArtifactStore, AthleteRecord, FailedUrlLog, FsStore, HostCityRecord,
    NocCountryRecord,
};
use crate::pipeline::stage::Stage;
use crate::pipeline::status::{StatusHandle, CHECKING, COMPLETED};
use crate::proxy::pool_from_config;
use crate::site::{
    AthleteLinks, AthleteRecords, CountryLinks, EventLinks, HostCityRecords, NocRecords, Olympedia, PageToLinks,
};
use crate::{HarvestError, Result};
use std::path::Path;
use std::sync::Arc;

/// What a run would do with one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePlan {
    Run,
    /// The output artifact already exists
    Skip(String),
    /// The input artifact is missing
    Blocked(String),
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub ran: Vec<Stage>,
    pub skipped: Vec<Stage>,
    pub missing_input: Vec<Stage>,
    pub failure: Option<String>,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

enum StageOutcome {
    Ran,
    MissingInput(String),
}

/// Runs the stages in order over one artifact store
pub struct Pipeline {
    ctx: StageContext,
    site: Olympedia,
    workers: CrawlerConfig,
    paths: ArtifactPaths,
    status: StatusHandle,
}

impl Pipeline {
    pub fn new(ctx: StageContext, site: Olympedia, workers: CrawlerConfig, paths: ArtifactPaths) -> Self {
        Self {
            ctx,
            site,
            workers,
            paths,
            status: StatusHandle::new(),
        }
    }

    /// Builds the production pipeline with artifacts under `root`
    ///
    /// Nothing touches the network until a stage fetches its first page.
    pub fn from_config(config: &Config, root: &Path) -> Self {
        let paths = ArtifactPaths::from_config(&config.output);
        let store: Arc<dyn ArtifactStore> = Arc::new(FsStore::new(root));
        let failed = Arc::new(FailedUrlLog::new(store.clone(), &paths.key(Artifact::FailedUrls)));
        let pool = Arc::new(pool_from_config(&config.proxy));
        let fetcher = Arc::new(fetcher_from_config(config, pool));

        Self::new(
            StageContext::new(fetcher, store, failed),
            Olympedia::new(&config.site.base_url),
            config.crawler.clone(),
            paths,
        )
    }

    /// Shares an existing status surface instead of a private one
    pub fn with_status(mut self, status: StatusHandle) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Decides run or skip for each stage from the artifacts currently stored
    ///
    /// A stage whose input is produced by an earlier stage of the same plan is
    /// not reported as blocked.
    pub fn plan(&self, stages: &[Stage]) -> Vec<(Stage, StagePlan)> {
        let store = self.ctx.store.as_ref();
        let mut planned = Vec::new();

        for (i, stage) in stages.iter().enumerate() {
            let output = self.paths.key(stage.output());
            let decision = if store.exists(&output) {
                StagePlan::Skip(output)
            } else {
                match stage.input() {
                    Some(input) => {
                        let key = self.paths.key(input);
                        let produced_earlier = stages[..i].iter().any(|s| s.artifacts().contains(&input));
                        if store.exists(&key) || produced_earlier {
                            StagePlan::Run
                        } else {
                            StagePlan::Blocked(key)
                        }
                    }
                    None => StagePlan::Run,
                }
            };
            planned.push((*stage, decision));
        }

        planned
    }

    /// Deletes every stage artifact and partial file so the next run starts over
    pub fn clear_artifacts(&self) -> Result<()> {
        for artifact in Artifact::ALL {
            self.ctx.store.remove(&self.paths.key(artifact))?;
            self.ctx.store.remove(&self.paths.partial_key(artifact))?;
        }
        tracing::info!("Removed all stage artifacts");
        Ok(())
    }

    /// Runs every stage
    pub async fn run(&self) -> PipelineReport {
        self.run_stages(&Stage::ALL).await
    }

    /// Runs `stages` in order, skipping those whose output already exists
    ///
    /// Never fails: the first stage error aborts the run and is recorded both
    /// in the report and in the status.
    pub async fn run_stages(&self, stages: &[Stage]) -> PipelineReport {
        let mut report = PipelineReport::default();
        self.status.set(CHECKING);

        for stage in stages {
            let output = self.paths.key(stage.output());
            if self.ctx.store.exists(&output) {
                tracing::info!("Skipping {}: {} already exists", stage, output);
                report.skipped.push(*stage);
                continue;
            }

            self.status.set(stage.status_message());
            match self.run_stage(*stage).await {
                Ok(StageOutcome::Ran) => report.ran.push(*stage),
                Ok(StageOutcome::MissingInput(key)) => {
                    tracing::warn!("Skipping {}: input {} not found", stage, key);
                    report.missing_input.push(*stage);
                }
                Err(e) => {
                    let message = format!("Pipeline failed: {}", e);
                    tracing::error!("Stage {} failed: {}", stage, e);
                    self.status.set(message.clone());
                    report.failure = Some(message);
                    return report;
                }
            }
        }

        self.status.set(COMPLETED);
        report
    }

    async fn run_stage(&self, stage: Stage) -> Result<StageOutcome> {
        match stage {
            Stage::Countries => {
                let seeds = vec![self.site.countries_url()];
                self.frontier(stage, seeds, self.workers.country_workers, Arc::new(CountryLinks))
                    .await
            }
            Stage::Events => {
                self.frontier_from_input(stage, self.workers.event_workers, Arc::new(EventLinks))
                    .await
            }
            Stage::Athletes => {
                self.frontier_from_input(stage, self.workers.athlete_workers, Arc::new(AthleteLinks))
                    .await
            }
            Stage::ScrapeAthletes => {
                let Some(urls) = self.read_input(stage) else {
                    return Ok(self.missing(stage));
                };
                let records = RecordStage::<AthleteRecord>::new(
                    stage.task(),
                    self.workers.scrape_workers,
                    Arc::new(AthleteRecords),
                    &self.paths.key(Artifact::AthletesCsv),
                    &self.paths.partial_key(Artifact::AthletesCsv),
                    &self.paths.key(Artifact::AthletesJson),
                );
                records.run(&self.ctx, urls).await?;
                Ok(StageOutcome::Ran)
            }
            Stage::ScrapeHostCities => {
                let key = self.paths.key(stage.output());
                scrape_page::<HostCityRecord>(&self.ctx, &self.site.editions_url(), &HostCityRecords, &key).await?;
                Ok(StageOutcome::Ran)
            }
            Stage::ScrapeNocs => {
                let key = self.paths.key(stage.output());
                scrape_page::<NocCountryRecord>(&self.ctx, &self.site.countries_url(), &NocRecords, &key).await?;
                Ok(StageOutcome::Ran)
            }
            Stage::ExtractRoles => {
                let json_key = self.paths.key(Artifact::AthletesJson);
                let csv_key = self.paths.key(stage.output());
                match extract_roles(self.ctx.store.as_ref(), &json_key, &csv_key) {
                    Ok(_) => Ok(StageOutcome::Ran),
                    Err(HarvestError::MissingInput(key)) => Ok(StageOutcome::MissingInput(key)),
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn frontier_from_input(
        &self,
        stage: Stage,
        workers: usize,
        links: Arc<dyn PageToLinks>,
    ) -> Result<StageOutcome> {
        match self.read_input(stage) {
            Some(seeds) => self.frontier(stage, seeds, workers, links).await,
            None => Ok(self.missing(stage)),
        }
    }

    async fn frontier(
        &self,
        stage: Stage,
        seeds: Vec<String>,
        workers: usize,
        links: Arc<dyn PageToLinks>,
    ) -> Result<StageOutcome> {
        let artifact = stage.output();
        let frontier = FrontierStage::new(
            stage.task(),
            workers,
            links,
            &self.paths.key(artifact),
            &self.paths.partial_key(artifact),
        );
        frontier.run(&self.ctx, seeds).await?;
        Ok(StageOutcome::Ran)
    }

    /// The URL list a stage consumes; missing or malformed reads as absent
    fn read_input(&self, stage: Stage) -> Option<Vec<String>> {
        let input = stage.input()?;
        read_url_list(self.ctx.store.as_ref(), &self.paths.key(input))
    }

    fn missing(&self, stage: Stage) -> StageOutcome {
        let key = stage
            .input()
            .map(|input| self.paths.key(input))
            .unwrap_or_default();
        StageOutcome::MissingInput(key)
    }
}
