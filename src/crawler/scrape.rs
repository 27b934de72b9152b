//! Record-producing stages
//!
//! [`RecordStage`] runs a [`PageToRecords`] rule over a URL set with the same
//! worker pool as the frontier stages and streams every record into a CSV
//! file and a gzip-compressed JSON array. [`scrape_page`] handles stages that
//! read a single index page, and [`extract_roles`] derives the role table from
//! the scraped JSON without touching the network.

use crate::crawler::context::StageContext;
use crate::crawler::progress::ProgressTracker;
use crate::crawler::workers::run_workers;
use crate::output::{write_csv, ArtifactStore, AthleteRecord, AthleteRoleRecord, CsvRecord, RecordSinks, StoreError};
use crate::site::PageToRecords;
use crate::{HarvestError, Result};
use flate2::read::GzDecoder;
use std::io::{self, Read};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

type SharedSinks = Arc<Mutex<Option<RecordSinks>>>;

/// Multi-page scrape stage
pub struct RecordStage<R> {
    task: String,
    workers: usize,
    records: Arc<dyn PageToRecords<R>>,
    csv_key: String,
    csv_partial_key: String,
    json_key: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: CsvRecord + Send + 'static> RecordStage<R> {
    pub fn new(
        task: &str,
        workers: usize,
        records: Arc<dyn PageToRecords<R>>,
        csv_key: &str,
        csv_partial_key: &str,
        json_key: &str,
    ) -> Self {
        Self {
            task: task.to_string(),
            workers,
            records,
            csv_key: csv_key.to_string(),
            csv_partial_key: csv_partial_key.to_string(),
            json_key: json_key.to_string(),
            _record: PhantomData,
        }
    }

    /// Scrapes every URL and returns the number of records written
    ///
    /// The CSV is published under its canonical key only after the queue has
    /// drained and both sinks are closed.
    pub async fn run(&self, ctx: &StageContext, urls: Vec<String>) -> Result<usize> {
        tracing::info!("Total URLs to process: {}", urls.len());

        let sinks = RecordSinks::open::<R>(ctx.store.as_ref(), &self.csv_partial_key, &self.json_key)?;
        let sinks: SharedSinks = Arc::new(Mutex::new(Some(sinks)));
        let progress = Arc::new(ProgressTracker::new(&self.task, urls.len()));

        let handler = {
            let ctx = ctx.clone();
            let records = self.records.clone();
            let sinks = sinks.clone();
            move |url: String| {
                let ctx = ctx.clone();
                let records = records.clone();
                let sinks = sinks.clone();
                async move { scrape(&ctx, records.as_ref(), &sinks, &url).await }
            }
        };
        run_workers(urls, self.workers, progress, handler).await?;

        let finished = sinks.lock().unwrap_or_else(PoisonError::into_inner).take();
        let written = match finished {
            Some(sinks) => sinks.finish()?,
            None => 0,
        };
        ctx.store.rename(&self.csv_partial_key, &self.csv_key)?;

        tracing::info!(
            "{} completed. {} records saved to {} and {}",
            self.task,
            written,
            self.csv_key,
            self.json_key
        );
        Ok(written)
    }
}

async fn scrape<R: CsvRecord>(
    ctx: &StageContext,
    records: &dyn PageToRecords<R>,
    sinks: &SharedSinks,
    url: &str,
) -> Result<()> {
    let Some(body) = ctx.fetch_page(url).await? else {
        tracing::warn!("Error fetching {}", url);
        return Ok(());
    };

    let extracted = records.extract_records(url, &String::from_utf8_lossy(&body));
    if extracted.is_empty() {
        tracing::warn!("No records extracted from {}", url);
        return Ok(());
    }

    let mut guard = sinks.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_mut() {
        Some(sinks) => sinks.write(&extracted),
        None => Err(HarvestError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "stage output already closed",
        ))),
    }
}

/// Scrapes one index page into a CSV artifact
///
/// Nothing is written when the page cannot be fetched or yields no records,
/// so the stage runs again next time.
pub async fn scrape_page<R: CsvRecord>(
    ctx: &StageContext,
    url: &str,
    records: &dyn PageToRecords<R>,
    key: &str,
) -> Result<usize> {
    tracing::info!("Fetching data from {}", url);
    let Some(body) = ctx.fetch_page(url).await? else {
        tracing::warn!("Error fetching {}, {} not written", url, key);
        return Ok(0);
    };

    let extracted = records.extract_records(url, &String::from_utf8_lossy(&body));
    if extracted.is_empty() {
        tracing::warn!("No records found on {}, {} not written", url, key);
        return Ok(0);
    }

    write_csv(ctx.store.as_ref(), key, &extracted)?;
    tracing::info!("{} records saved to {}", extracted.len(), key);
    Ok(extracted.len())
}

/// Reads the gzip-compressed athlete array, tolerating corrupt content
fn read_athletes(store: &dyn ArtifactStore, key: &str) -> Result<Vec<AthleteRecord>> {
    let compressed = match store.read(key) {
        Ok(bytes) => bytes,
        Err(StoreError::NotFound(_)) => return Err(HarvestError::MissingInput(key.to_string())),
        Err(e) => return Err(e.into()),
    };

    let mut json = Vec::new();
    if let Err(e) = GzDecoder::new(compressed.as_slice()).read_to_end(&mut json) {
        tracing::error!("{} might be corrupted: {}", key, e);
        return Ok(Vec::new());
    }

    match serde_json::from_slice(&json) {
        Ok(athletes) => Ok(athletes),
        Err(e) => {
            tracing::error!("{} is improperly formatted: {}", key, e);
            Ok(Vec::new())
        }
    }
}

/// Builds the athlete role table from the scraped athlete content
///
/// One row per record with roles, in file order. Athletes with several events
/// get several identical rows, as the athlete CSV does. Returns the number of
/// rows written. Nothing is written when no athlete has roles.
pub fn extract_roles(store: &dyn ArtifactStore, json_key: &str, csv_key: &str) -> Result<usize> {
    tracing::info!("Reading data from {}", json_key);
    let athletes = read_athletes(store, json_key)?;
    let progress = ProgressTracker::new("Extracting athlete roles", athletes.len());

    let mut rows = Vec::new();
    for athlete in athletes {
        if let Some(roles) = athlete.roles.filter(|r| !r.is_empty()) {
            rows.push(AthleteRoleRecord {
                id: athlete.id,
                name: athlete.name,
                roles,
            });
        }
        progress.increment();
    }

    if rows.is_empty() {
        tracing::info!("No athletes with roles found");
        return Ok(0);
    }

    write_csv(store, csv_key, &rows)?;
    tracing::info!("Athlete roles saved to {}", csv_key);
    Ok(rows.len())
}
