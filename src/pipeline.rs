use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use tokio::time::sleep;

use crate::config::Config;
use crate::docs::DocsClient;
use crate::parser::{JobListing, ListingCard};
use crate::{fetcher, formatter, parser};

pub const ERROR_LOG_FILE: &str = "error_log.txt";

const LISTING_PAGE_DELAY: Duration = Duration::from_secs(2);
const DETAIL_PAGE_DELAY: Duration = Duration::from_secs(1);

// Backstop in case the end-of-listings markers stop matching; the search
// never comes close to this many pages.
const MAX_LISTING_PAGES: usize = 50;

/// Pipeline stage an error was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Write => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct ErrorRecord {
    pub stage: Stage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything one run produced: the scraped listings, every recorded error,
/// and whether the run as a whole failed.
#[derive(Debug, Default)]
pub struct RunReport {
    pub listings: Vec<JobListing>,
    pub errors: Vec<ErrorRecord>,
    pub failed: bool,
}

impl RunReport {
    fn record(&mut self, stage: Stage, message: String) {
        warn!("{stage} error: {message}");
        self.errors.push(ErrorRecord {
            stage,
            message,
            timestamp: Utc::now(),
        });
    }

    /// One line per recorded error, for the operator-facing log artifact.
    pub fn render_error_log(&self) -> String {
        let mut out = String::new();
        for err in &self.errors {
            out.push_str(&format!(
                "{} [{}] {}\n",
                err.timestamp.to_rfc3339(),
                err.stage,
                err.message
            ));
        }
        out
    }

    pub fn write_error_log<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.render_error_log())
    }
}

/// Runs the whole pipeline once: walk the search pages, fetch each detail
/// page, format the report and replace the target document. Per-record
/// failures are logged and skipped; a failed first search page or a failed
/// document write fails the run.
pub async fn run(config: &Config) -> RunReport {
    let mut report = RunReport::default();

    let cards = collect_listing_cards(&mut report).await;
    if report.failed {
        return report;
    }

    let total = cards.len();
    scrape_details(cards, &mut report).await;
    info!("Scraped {} of {total} job listings", report.listings.len());

    let content = formatter::format_report(&report.listings, Local::now());
    let docs = DocsClient::new(config.service_account.clone(), config.document_id.clone());
    if let Err(err) = docs.replace_contents(&content).await {
        report.record(Stage::Write, err.to_string());
        report.failed = true;
        return report;
    }

    report
}

/// Walks the search pages in order until one of the end-of-listings
/// conditions hits, accumulating the cards of every page.
async fn collect_listing_cards(report: &mut RunReport) -> Vec<ListingCard> {
    let mut cards = Vec::new();

    for page in 1..=MAX_LISTING_PAGES {
        let url = parser::search_url(page);
        info!("Fetching listing page {page}");
        let html = match fetcher::fetch_page(&url).await {
            Ok(html) => html,
            Err(err) => {
                report.record(Stage::Fetch, err.to_string());
                // Without the first page there is nothing to scrape at all.
                if page == 1 {
                    report.failed = true;
                }
                break;
            }
        };

        if parser::is_end_of_listings(&html) {
            info!("Reached end of listings at page {page}");
            break;
        }
        if page == 1 {
            if let Some(total) = parser::parse_total_count(&html) {
                info!("jobs.cz reports {total} matching jobs");
            }
        }

        let mut found = 0;
        for parsed in parser::parse_listing_page(&html) {
            match parsed {
                Ok(card) => {
                    cards.push(card);
                    found += 1;
                }
                Err(err) => report.record(Stage::Parse, err.to_string()),
            }
        }
        if found == 0 {
            info!("No job cards on page {page}");
            break;
        }
        info!("Found {found} jobs on page {page}");

        sleep(LISTING_PAGE_DELAY).await;
    }

    cards
}

/// Fetches each card's detail page and builds the final listing. A card
/// whose detail fetch fails is skipped, not aborted on.
async fn scrape_details(cards: Vec<ListingCard>, report: &mut RunReport) {
    for (index, card) in cards.into_iter().enumerate() {
        if index > 0 {
            sleep(DETAIL_PAGE_DELAY).await;
        }
        match fetcher::fetch_page(&card.url).await {
            Ok(html) => {
                let description = parser::parse_detail_page(&html);
                info!("Scraped job {}: {} at {}", index + 1, card.title, card.company);
                report.listings.push(JobListing::from_card(card, description));
            }
            Err(err) => report.record(Stage::Fetch, err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn stage_names_match_log_taxonomy() {
        assert_eq!(Stage::Fetch.to_string(), "fetch");
        assert_eq!(Stage::Parse.to_string(), "parse");
        assert_eq!(Stage::Write.to_string(), "write");
    }

    #[test]
    fn renders_one_line_per_error() {
        let mut report = RunReport::default();
        report.errors.push(ErrorRecord {
            stage: Stage::Fetch,
            message: "Failed to fetch data: timeout".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 8, 30, 0).unwrap(),
        });
        report.errors.push(ErrorRecord {
            stage: Stage::Write,
            message: "Failed to write document: 404".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 8, 31, 0).unwrap(),
        });

        assert_eq!(
            report.render_error_log(),
            "2025-01-15T08:30:00+00:00 [fetch] Failed to fetch data: timeout\n\
             2025-01-15T08:31:00+00:00 [write] Failed to write document: 404\n"
        );
    }

    #[test]
    fn clean_run_renders_nothing() {
        assert_eq!(RunReport::default().render_error_log(), "");
    }

    #[test]
    fn writes_error_log_file() {
        let mut report = RunReport::default();
        report.record(Stage::Parse, "listing card has no title".to_string());

        let path = std::env::temp_dir().join("python-jobs-scraper-error-log-test.txt");
        report.write_error_log(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(written.contains("[parse] listing card has no title"));
    }
}
