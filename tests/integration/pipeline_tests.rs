//! End-to-end runs of the full pipeline against the in-memory site

use crate::support::{
    harness, harness_with_store, olympedia_site, pipeline_over, proxy_lines, static_pool, url, FakeSite,
};
use flate2::read::GzDecoder;
use olympedia_harvest::output::{
    read_url_list, Artifact, ArtifactPaths, ArtifactStore, AthleteRecord, AthleteRoleRecord, FsStore, MemoryStore,
    NocCountryRecord,
};
use olympedia_harvest::pipeline::{Stage, StagePlan};
use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

fn urls(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| url(p)).collect()
}

fn csv_rows<T: serde::de::DeserializeOwned>(text: &str) -> Vec<T> {
    csv::Reader::from_reader(text.as_bytes())
        .deserialize()
        .map(|row| row.unwrap())
        .collect()
}

#[tokio::test]
async fn test_full_pipeline_over_site() {
    let h = harness(olympedia_site(), proxy_lines(4), 3);

    let report = h.pipeline.run().await;

    assert!(report.succeeded(), "failure: {:?}", report.failure);
    assert_eq!(report.ran, Stage::ALL.to_vec());
    assert_eq!(h.pipeline.status().get(), "Data scraping completed.");

    let store = h.store.as_ref();
    assert_eq!(
        read_url_list(store, &h.key(Artifact::CountryUrls)),
        Some(urls(&["/countries/A", "/countries/B"]))
    );
    assert_eq!(
        read_url_list(store, &h.key(Artifact::EventUrls)),
        Some(urls(&["/event/1", "/event/2", "/event/3"]))
    );
    assert_eq!(
        read_url_list(store, &h.key(Artifact::AthleteUrls)),
        Some(urls(&["/athletes/1", "/athletes/2", "/athletes/3", "/athletes/4", "/athletes/5"]))
    );

    // One header row plus one row per (athlete, event) pair
    let csv_text = h.read_string(Artifact::AthletesCsv);
    assert_eq!(csv_text.lines().filter(|l| l.starts_with("id,name,")).count(), 1);
    let athletes: Vec<AthleteRecord> = csv_rows(&csv_text);
    assert_eq!(athletes.len(), 6);
    let ids: HashSet<u64> = athletes.iter().map(|a| a.id).collect();
    assert_eq!(ids, (1..=5).collect());
    assert!(athletes.iter().all(|a| a.name.as_deref().is_some_and(|n| !n.is_empty())));
    assert_eq!(athletes.iter().filter(|a| a.id == 2).count(), 2);

    // The compressed JSON holds the same records
    let mut json = String::new();
    GzDecoder::new(store.read(&h.key(Artifact::AthletesJson)).unwrap().as_slice())
        .read_to_string(&mut json)
        .unwrap();
    let from_json: Vec<AthleteRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(from_json.len(), 6);

    // Rows follow scrape order, which depends on worker scheduling
    let mut roles: Vec<AthleteRoleRecord> = csv_rows(&h.read_string(Artifact::AthleteRolesCsv));
    roles.sort_by_key(|r| r.id);
    assert_eq!(roles.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 4]);
    assert_eq!(roles[1].roles, "Referee • Coach");

    let nocs: Vec<NocCountryRecord> = csv_rows(&h.read_string(Artifact::NocCountriesCsv));
    assert_eq!(nocs.len(), 3);

    let host_cities = h.read_string(Artifact::HostCitiesCsv);
    assert!(host_cities.contains("1896,Summer,1896 Summer Olympics,Athina"));
    assert!(host_cities.contains("1924,Winter,1924 Winter Olympics,Chamonix"));

    // No partial files left behind, nothing failed
    assert!(h.store.keys().iter().all(|k| !k.ends_with(".partial")));
    assert!(!store.exists(&h.key(Artifact::FailedUrls)));
    assert_eq!(h.pool.reload_count(), 1);
    assert_eq!(h.pool.live_count(), 4);
}

#[tokio::test]
async fn test_rerun_skips_completed_stages() {
    let h = harness(olympedia_site(), proxy_lines(2), 3);
    assert!(h.pipeline.run().await.succeeded());
    let requests = h.site.requests().len();

    let report = h.pipeline.run().await;

    assert!(report.succeeded());
    assert!(report.ran.is_empty());
    assert_eq!(report.skipped, Stage::ALL.to_vec());
    assert_eq!(h.site.requests().len(), requests);
}

#[tokio::test]
async fn test_resume_runs_only_missing_stages() {
    let store = Arc::new(MemoryStore::new());
    let first = harness_with_store(olympedia_site(), proxy_lines(2), 3, store.clone());
    assert!(first.pipeline.run().await.succeeded());
    store.remove(&first.key(Artifact::AthleteRolesCsv)).unwrap();
    store.remove(&first.key(Artifact::EventUrls)).unwrap();

    let second = harness_with_store(olympedia_site(), proxy_lines(2), 3, store.clone());
    let report = second.pipeline.run().await;

    assert_eq!(report.ran, vec![Stage::Events, Stage::ExtractRoles]);
    assert_eq!(second.site.request_count("/countries/A"), 1);
    assert_eq!(second.site.request_count("/countries"), 0);
}

#[tokio::test]
async fn test_no_live_proxies_fails_the_run() {
    let h = harness(olympedia_site(), Vec::new(), 3);

    let report = h.pipeline.run().await;

    assert_eq!(report.ran, Vec::<Stage>::new());
    let failure = report.failure.unwrap();
    assert!(failure.starts_with("Pipeline failed: "), "{}", failure);
    assert!(failure.contains("No proxies available"), "{}", failure);
    assert_eq!(h.pipeline.status().get(), failure);
    assert!(!h.store.exists(&h.key(Artifact::CountryUrls)));
    assert!(h.site.requests().is_empty());
}

#[tokio::test]
async fn test_missing_input_skips_with_diagnostic() {
    let h = harness(olympedia_site(), proxy_lines(2), 3);

    let report = h.pipeline.run_stages(&[Stage::Athletes, Stage::ExtractRoles]).await;

    assert!(report.succeeded());
    assert!(report.ran.is_empty());
    assert_eq!(report.missing_input, vec![Stage::Athletes, Stage::ExtractRoles]);
    assert!(h.site.requests().is_empty());
}

#[tokio::test]
async fn test_exhausted_urls_are_logged_and_do_not_fail_the_stage() {
    let site = olympedia_site().status("/event/3", 503);
    let h = harness(site, proxy_lines(2), 3);

    let report = h.pipeline.run_stages(&[Stage::Countries, Stage::Events, Stage::Athletes]).await;

    assert!(report.succeeded());
    assert_eq!(h.site.request_count("/event/3"), 3);
    let failed = read_url_list(h.store.as_ref(), &h.key(Artifact::FailedUrls));
    assert_eq!(failed, Some(vec![url("/event/3")]));
    // Athletes 1-4 are still reachable through events 1 and 2
    assert_eq!(
        read_url_list(h.store.as_ref(), &h.key(Artifact::AthleteUrls)),
        Some(urls(&["/athletes/1", "/athletes/2", "/athletes/3", "/athletes/4"]))
    );
}

#[tokio::test]
async fn test_missing_pages_yield_empty_stage_output() {
    let h = harness(FakeSite::default(), proxy_lines(2), 3);

    let report = h.pipeline.run_stages(&[Stage::Countries, Stage::ScrapeHostCities]).await;

    assert!(report.succeeded());
    assert_eq!(read_url_list(h.store.as_ref(), &h.key(Artifact::CountryUrls)), Some(Vec::new()));
    // Nothing scraped, so nothing marks the stage done
    assert!(!h.store.exists(&h.key(Artifact::HostCitiesCsv)));
}

#[tokio::test]
async fn test_plan_reflects_stored_artifacts() {
    let h = harness(olympedia_site(), proxy_lines(2), 3);

    let plan = h.pipeline.plan(&[Stage::Athletes]);
    assert_eq!(plan, vec![(Stage::Athletes, StagePlan::Blocked(h.key(Artifact::EventUrls)))]);

    let plan = h.pipeline.plan(&Stage::ALL);
    assert!(plan.iter().all(|(_, p)| *p == StagePlan::Run));

    assert!(h.pipeline.run_stages(&[Stage::Countries]).await.succeeded());
    let plan = h.pipeline.plan(&[Stage::Countries, Stage::Events]);
    assert_eq!(plan[0].1, StagePlan::Skip(h.key(Artifact::CountryUrls)));
    assert_eq!(plan[1].1, StagePlan::Run);
}

#[tokio::test]
async fn test_clear_artifacts_forces_full_run() {
    let h = harness(olympedia_site(), proxy_lines(2), 3);
    assert!(h.pipeline.run().await.succeeded());

    h.pipeline.clear_artifacts().unwrap();
    assert!(h.store.keys().is_empty());

    let report = h.pipeline.run().await;
    assert_eq!(report.ran, Stage::ALL.to_vec());
}

#[tokio::test]
async fn test_pipeline_on_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsStore::new(dir.path()));
    let site = Arc::new(olympedia_site());
    let pipeline = pipeline_over(site.clone(), static_pool(proxy_lines(2)), 3, store.clone(), ArtifactPaths::default());

    let report = pipeline.run().await;

    assert!(report.succeeded(), "failure: {:?}", report.failure);
    for file in [
        "raw_data/countries_urls.json",
        "raw_data/events_urls.json",
        "raw_data/athletes_urls.json",
        "raw_data/athletes_content.json.gz",
        "data/athletes.csv",
        "data/host_cities.csv",
        "data/noc_countries.csv",
        "data/athletes_roles.csv",
    ] {
        assert!(dir.path().join(file).is_file(), "{} missing", file);
    }
    assert!(!dir.path().join("data/athletes.csv.partial").exists());
    assert_eq!(
        read_url_list(store.as_ref(), "raw_data/countries_urls.json"),
        Some(urls(&["/countries/A", "/countries/B"]))
    );

    // A second pipeline over the same directory resumes with nothing to do
    let again = pipeline_over(site.clone(), static_pool(proxy_lines(2)), 3, store, ArtifactPaths::default());
    let requests = site.requests().len();
    assert_eq!(again.run().await.skipped, Stage::ALL.to_vec());
    assert_eq!(site.requests().len(), requests);
}
