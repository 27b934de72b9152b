//! Shared fixtures: an in-memory olympedia site served through a fake
//! transport, a static proxy probe and a sleeper that never waits.

use async_trait::async_trait;
use olympedia_harvest::config::CrawlerConfig;
use olympedia_harvest::crawler::{Fetcher, RawResponse, RetryPolicy, Sleeper, StageContext, Transport, TransportError};
use olympedia_harvest::output::{Artifact, ArtifactPaths, ArtifactStore, FailedUrlLog, MemoryStore};
use olympedia_harvest::pipeline::Pipeline;
use olympedia_harvest::proxy::{ProxyEndpoint, ProxyPool, ProxyProbe, ProxySource};
use olympedia_harvest::site::Olympedia;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE: &str = "https://www.olympedia.org";

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

pub struct StaticProbe;

#[async_trait]
impl ProxyProbe for StaticProbe {
    async fn is_alive(&self, _endpoint: &ProxyEndpoint) -> bool {
        true
    }
}

pub struct NoWait;

#[async_trait]
impl Sleeper for NoWait {
    async fn sleep(&self, _duration: Duration) {}
}

/// Pages keyed by absolute URL; anything else is a 404
#[derive(Default)]
pub struct FakeSite {
    pages: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn page(mut self, path: &str, html: String) -> Self {
        self.pages.insert(url(path), (200, html));
        self
    }

    pub fn status(mut self, path: &str, status: u16) -> Self {
        self.pages.insert(url(path), (status, String::new()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, path: &str) -> usize {
        let target = url(path);
        self.requests().iter().filter(|u| **u == target).count()
    }
}

#[async_trait]
impl Transport for FakeSite {
    async fn get(&self, url: &str, _proxy: &ProxyEndpoint) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some((status, body)) => Ok(RawResponse::new(*status, body.as_bytes().to_vec())),
            None => Ok(RawResponse::new(404, Vec::new())),
        }
    }
}

fn table(rows: &[String]) -> String {
    format!(
        "<html><body><table><thead><tr><th>A</th><th>B</th></tr></thead><tbody>{}</tbody></table></body></html>",
        rows.concat()
    )
}

fn athlete_page(name: &str, roles: Option<&str>, events: &[(&str, &str)]) -> String {
    let roles = roles
        .map(|r| format!("<tr><th>Roles</th><td>{}</td></tr>", r))
        .unwrap_or_default();
    let rows: String = events
        .iter()
        .map(|(game, event)| {
            format!(
                r#"<tr class="active"><td>{game}</td><td>Athletics</td><td>FRA</td><td></td></tr>
                   <tr><td></td><td><a href="/results/1">{event}</a></td><td></td><td>1</td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><h1>{name}</h1>
        <table class="biodata"><tr><th>Sex</th><td>Female</td></tr>{roles}</table>
        <table class="table"><tbody>{rows}</tbody></table></body></html>"#
    )
}

/// Two countries, three events, five athletes; athlete 2 competed twice
pub fn olympedia_site() -> FakeSite {
    let countries = table(&[
        r#"<tr><td><a href="/countries/A">AAA</a></td><td><a href="/countries/A">Aland</a></td><td><span class="glyphicon glyphicon-ok"></span></td></tr>"#.to_string(),
        r#"<tr><td><a href="/countries/B">BBB</a></td><td><a href="/countries/B">Borduria</a></td><td><span class="glyphicon glyphicon-ok"></span></td></tr>"#.to_string(),
        r#"<tr><td><a href="/countries/C">CCC</a></td><td><a href="/countries/C">Carpania</a></td><td></td></tr>"#.to_string(),
    ]);
    let edition_row = |edition: &str| {
        format!(
            r#"<tr><td><a href="/editions/{e}">{e}</a></td><td><a href="/event/{e}">Event {e}</a></td></tr>"#,
            e = edition
        )
    };
    let athlete_row = |id: u32| format!(r#"<tr><td><a href="/athletes/{id}">Athlete {id}</a></td></tr>"#);
    let editions = r#"<html><body>
        <table><tr><th>#</th><th>Year</th><th>City</th></tr><tr><td>I</td><td>1896</td><td>Athina</td></tr></table>
        <table><tr><th>#</th><th>Year</th><th>City</th></tr><tr><td>I</td><td>1924</td><td>Chamonix</td></tr></table>
        </body></html>"#;

    FakeSite::default()
        .page("/countries", countries)
        .page("/editions", editions.to_string())
        .page("/countries/A", table(&[edition_row("1"), edition_row("2")]))
        .page("/countries/B", table(&[edition_row("2"), edition_row("3")]))
        .page("/event/1", table(&[athlete_row(1), athlete_row(2)]))
        .page("/event/2", table(&[athlete_row(2), athlete_row(3), athlete_row(4)]))
        .page("/event/3", table(&[athlete_row(4), athlete_row(5)]))
        .page("/athletes/1", athlete_page("Ada One", Some("Coach"), &[("2016 Summer Olympics", "100 metres")]))
        .page(
            "/athletes/2",
            athlete_page("Bea Two", None, &[("2016 Summer Olympics", "200 metres"), ("2020 Summer Olympics", "Marathon")]),
        )
        .page("/athletes/3", athlete_page("Cy Three", None, &[("2020 Summer Olympics", "Marathon")]))
        .page("/athletes/4", athlete_page("Di Four", Some("Referee • Coach"), &[("2020 Summer Olympics", "High Jump")]))
        .page("/athletes/5", athlete_page("Ed Five", None, &[("2024 Summer Olympics", "Long Jump")]))
}

pub struct Harness {
    pub pipeline: Pipeline,
    pub store: Arc<MemoryStore>,
    pub site: Arc<FakeSite>,
    pub pool: Arc<ProxyPool>,
    pub paths: ArtifactPaths,
}

impl Harness {
    pub fn key(&self, artifact: Artifact) -> String {
        self.paths.key(artifact)
    }

    pub fn read_string(&self, artifact: Artifact) -> String {
        String::from_utf8(self.store.read(&self.key(artifact)).unwrap()).unwrap()
    }
}

pub fn proxy_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("10.0.0.{}:8080:user:pass", i + 1))
        .collect()
}

/// A pipeline over `site` and a fresh in-memory store
pub fn harness(site: FakeSite, proxies: Vec<String>, max_retries: u32) -> Harness {
    harness_with_store(site, proxies, max_retries, Arc::new(MemoryStore::new()))
}

pub fn harness_with_store(site: FakeSite, proxies: Vec<String>, max_retries: u32, store: Arc<MemoryStore>) -> Harness {
    let site = Arc::new(site);
    let pool = static_pool(proxies);
    let paths = ArtifactPaths::default();
    let pipeline = pipeline_over(site.clone(), pool.clone(), max_retries, store.clone(), paths.clone());

    Harness {
        pipeline,
        store,
        site,
        pool,
        paths,
    }
}

pub fn static_pool(proxies: Vec<String>) -> Arc<ProxyPool> {
    Arc::new(ProxyPool::new(ProxySource::Lines(proxies), Arc::new(StaticProbe), 4))
}

/// Wires a pipeline over any store, with small worker counts and no backoff
pub fn pipeline_over(
    site: Arc<FakeSite>,
    pool: Arc<ProxyPool>,
    max_retries: u32,
    store: Arc<dyn ArtifactStore>,
    paths: ArtifactPaths,
) -> Pipeline {
    let policy = RetryPolicy {
        max_retries,
        ..RetryPolicy::default()
    };
    let fetcher = Fetcher::new(pool, site, policy).with_sleeper(Arc::new(NoWait));

    let failed = Arc::new(FailedUrlLog::new(store.clone(), &paths.key(Artifact::FailedUrls)));
    let ctx = StageContext::new(Arc::new(fetcher), store, failed);
    let workers = CrawlerConfig {
        country_workers: 2,
        event_workers: 3,
        athlete_workers: 4,
        scrape_workers: 3,
    };
    Pipeline::new(ctx, Olympedia::new(BASE), workers, paths)
}
