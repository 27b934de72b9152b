//! Adapter for olympedia.org
//!
//! Every rule parses the page with `scraper` and returns owned values, so no
//! parsed document outlives the call.

use crate::output::{AthleteRecord, HostCityRecord, NocCountryRecord};
use crate::site::{resolve_link, PageToLinks, PageToRecords};
use scraper::{ElementRef, Html, Selector};

/// Entry points of the site
#[derive(Debug, Clone)]
pub struct Olympedia {
    base_url: String,
}

impl Olympedia {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Index of all national committees; seed of the country stage
    pub fn countries_url(&self) -> String {
        format!("{}/countries", self.base_url)
    }

    /// List of Summer and Winter editions with their host cities
    pub fn editions_url(&self) -> String {
        format!("{}/editions", self.base_url)
    }
}

fn find_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn find<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    find_all(scope, css).into_iter().next()
}

fn text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Resolved href of the `index`-th link inside `row`
fn nth_link(row: ElementRef<'_>, index: usize, page_url: &str) -> Option<String> {
    let link = find_all(row, "a[href]").into_iter().nth(index)?;
    resolve_link(link.value().attr("href")?, page_url)
}

/// Country stage: participating committees on the country index
#[derive(Debug, Clone, Copy, Default)]
pub struct CountryLinks;

impl PageToLinks for CountryLinks {
    fn extract_links(&self, page_url: &str, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let Some(body) = find(document.root_element(), "tbody") else {
            tracing::warn!("No country table on {}", page_url);
            return Vec::new();
        };

        find_all(body, "tr")
            .into_iter()
            .filter(|row| find(*row, ".glyphicon-ok").is_some())
            .filter_map(|row| nth_link(row, 1, page_url))
            .collect()
    }
}

/// Event stage: every edition row of a country page
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLinks;

impl PageToLinks for EventLinks {
    fn extract_links(&self, page_url: &str, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let Some(body) = find(document.root_element(), "tbody") else {
            return Vec::new();
        };

        find_all(body, "tr")
            .into_iter()
            .filter_map(|row| nth_link(row, 1, page_url))
            .collect()
    }
}

/// Athlete stage: athlete profile links in an event's result table
#[derive(Debug, Clone, Copy, Default)]
pub struct AthleteLinks;

impl PageToLinks for AthleteLinks {
    fn extract_links(&self, page_url: &str, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let Some(body) = find(document.root_element(), "tbody") else {
            return Vec::new();
        };

        find_all(body, "a[href]")
            .into_iter()
            .filter_map(|link| link.value().attr("href"))
            .filter(|href| href.contains("athlete"))
            .filter_map(|href| resolve_link(href, page_url))
            .collect()
    }
}

/// Fields shared by every row of one athlete
#[derive(Debug, Default)]
struct Biography {
    gender: Option<String>,
    born: Option<String>,
    died: Option<String>,
    height: Option<String>,
    weight: Option<String>,
    noc: Option<String>,
    roles: Option<String>,
}

/// Drops the place part of "12 May 1990 in Paris, Île-de-France (FRA)"
fn date_part(value: &str) -> Option<String> {
    let date = value.split(" in ").next().unwrap_or(value);
    non_empty(date.trim().to_string())
}

fn parse_biography(document: &Html) -> Biography {
    let mut bio = Biography::default();

    for row in find_all(document.root_element(), ".biodata tr") {
        let header = find(row, "th").map(text).unwrap_or_default();
        let Some(cell) = find(row, "td") else {
            continue;
        };
        let data = text(cell);

        match header.as_str() {
            "Sex" => bio.gender = non_empty(data),
            "Born" => bio.born = date_part(&data),
            "Died" => bio.died = date_part(&data),
            "Measurements" => {
                let parts: Vec<&str> = data.split(" / ").collect();
                if let [height, weight] = parts.as_slice() {
                    bio.height = non_empty(height.trim().to_string());
                    bio.weight = non_empty(weight.trim().to_string());
                } else if data.contains("kg") {
                    bio.weight = non_empty(data);
                } else if data.contains("cm") {
                    bio.height = non_empty(data);
                }
            }
            "NOC" => {
                let nocs: Vec<String> = find_all(row, "a").into_iter().map(text).collect();
                bio.noc = non_empty(nocs.join(", "));
            }
            "Roles" => {
                let roles: Vec<&str> = data
                    .split('•')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .collect();
                bio.roles = non_empty(roles.join(" • "));
            }
            _ => {}
        }
    }

    bio
}

/// Next `tr` sibling, skipping whitespace nodes
fn next_row(row: ElementRef<'_>) -> Option<ElementRef<'_>> {
    row.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "tr")
}

/// Scrape stage: one record per event an athlete took part in
#[derive(Debug, Clone, Copy, Default)]
pub struct AthleteRecords;

impl PageToRecords<AthleteRecord> for AthleteRecords {
    fn extract_records(&self, page_url: &str, html: &str) -> Vec<AthleteRecord> {
        let id = page_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse::<u64>().ok());
        let Some(id) = id else {
            tracing::warn!("No athlete id in {}", page_url);
            return Vec::new();
        };

        let document = Html::parse_document(html);
        let root = document.root_element();
        let name = find(root, "h1").map(text).and_then(non_empty);
        let image_url = find(root, "img.photo")
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);
        let bio = parse_biography(&document);

        let mut records = Vec::new();
        for row in find_all(root, "table.table tr.active") {
            let cells = find_all(row, "td");
            if cells.len() < 3 {
                continue;
            }
            let discipline = non_empty(text(cells[1]));
            let event_row = next_row(row);

            let event = match event_row.and_then(|r| find(r, "a")) {
                Some(link) => {
                    let small = event_row.and_then(|r| find(r, "small")).map(text).unwrap_or_default();
                    if small.is_empty() {
                        non_empty(text(link))
                    } else {
                        Some(format!("{} ({})", text(link), small))
                    }
                }
                None => discipline.clone(),
            };
            let position = event_row
                .and_then(|r| find_all(r, "td").into_iter().nth(3))
                .map(text)
                .and_then(non_empty);

            records.push(AthleteRecord {
                id,
                name: name.clone(),
                gender: bio.gender.clone(),
                born: bio.born.clone(),
                died: bio.died.clone(),
                height: bio.height.clone(),
                weight: bio.weight.clone(),
                noc: bio.noc.clone(),
                roles: bio.roles.clone(),
                game: non_empty(text(cells[0])),
                team: non_empty(text(cells[2])),
                sport: discipline,
                event,
                position,
                image_url: image_url.clone(),
            });
        }

        records
    }
}

/// Host city stage: Summer and Winter tables of the editions page
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCityRecords;

impl HostCityRecords {
    fn season_rows(table: ElementRef<'_>, season: &str) -> Vec<HostCityRecord> {
        find_all(table, "tr")
            .into_iter()
            .skip(1)
            .filter_map(|row| {
                let cells = find_all(row, "td");
                if cells.len() < 3 {
                    tracing::debug!("Skipping {} edition row with {} cells", season, cells.len());
                    return None;
                }
                let year = text(cells[1]);
                Some(HostCityRecord {
                    game: format!("{} {} Olympics", year, season),
                    year,
                    season: season.to_string(),
                    host_city: text(cells[2]),
                })
            })
            .collect()
    }
}

impl PageToRecords<HostCityRecord> for HostCityRecords {
    fn extract_records(&self, page_url: &str, html: &str) -> Vec<HostCityRecord> {
        let document = Html::parse_document(html);
        let tables = find_all(document.root_element(), "table");
        let [summer, winter, ..] = tables.as_slice() else {
            tracing::warn!("Expected Summer and Winter tables on {}", page_url);
            return Vec::new();
        };

        let mut records = Self::season_rows(*summer, "Summer");
        records.extend(Self::season_rows(*winter, "Winter"));
        records
    }
}

/// NOC stage: code and country name of every committee on the index
#[derive(Debug, Clone, Copy, Default)]
pub struct NocRecords;

impl PageToRecords<NocCountryRecord> for NocRecords {
    fn extract_records(&self, page_url: &str, html: &str) -> Vec<NocCountryRecord> {
        let document = Html::parse_document(html);
        let Some(body) = find(document.root_element(), "tbody") else {
            tracing::warn!("No committee table on {}", page_url);
            return Vec::new();
        };

        let mut records = Vec::new();
        for row in find_all(body, "tr") {
            let cells = find_all(row, "td");
            if cells.len() < 2 {
                continue;
            }
            let (Some(code), Some(country)) = (find(cells[0], "a"), find(cells[1], "a")) else {
                tracing::debug!("Skipping committee row without code or name");
                continue;
            };
            let country = text(country);
            if find(row, ".glyphicon-ok").is_none() {
                tracing::debug!("Keeping non-participating committee {}", country);
            }
            records.push(NocCountryRecord {
                noc: text(code),
                country,
            });
        }
        records
    }
}
