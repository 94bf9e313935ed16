//! Fixture-driven walk through the parse and format path: listing page to
//! cards, detail page to description, listings to the final document text.

use chrono::{Local, TimeZone};
use python_jobs_scraper::parser::{self, JobListing};
use python_jobs_scraper::{formatter, pipeline};

const LISTING_PAGE: &str = include_str!("fixtures/listing_page.html");
const DETAIL_PAGE: &str = include_str!("fixtures/detail_page.html");

fn scrape_fixtures() -> Vec<JobListing> {
    parser::parse_listing_page(LISTING_PAGE)
        .into_iter()
        .map(|card| card.expect("fixture cards are well-formed"))
        .map(|card| {
            // Both cards share the one detail fixture; in a live run each
            // card's URL would be fetched here.
            let description = parser::parse_detail_page(DETAIL_PAGE);
            JobListing::from_card(card, description)
        })
        .collect()
}

#[test]
fn listing_fixture_parses_in_page_order() {
    let listings = scrape_fixtures();
    assert_eq!(listings.len(), 2);

    assert_eq!(listings[0].title, "Python Developer");
    assert_eq!(listings[0].company, "Acme Digital s.r.o.");
    assert_eq!(listings[0].location, "Praha – Karlín");
    assert_eq!(listings[0].url, "https://www.jobs.cz/rpd/2000123456/");

    assert_eq!(listings[1].title, "Senior Python Engineer");
    assert_eq!(listings[1].company, "Beta Soft a.s.");
    // no locality on the second card
    assert_eq!(listings[1].location, "Remote");
}

#[test]
fn detail_fixture_yields_clean_description() {
    let description = parser::parse_detail_page(DETAIL_PAGE);
    assert_eq!(
        description,
        "Náplň práce\n\
         Vývoj a údržba interních nástrojů v Pythonu.\n\
         Spolupráce s datovým týmem na ETL pipelinách.\n\
         Co nabízíme\n\
         5 týdnů dovolené\n\
         Možnost práce z domova"
    );
}

#[test]
fn two_runs_over_fixed_pages_produce_identical_output() {
    let when = Local.with_ymd_and_hms(2025, 1, 15, 8, 30, 0).unwrap();

    let first = formatter::format_report(&scrape_fixtures(), when);
    let second = formatter::format_report(&scrape_fixtures(), when);

    assert_eq!(first, second);
    assert!(first.contains("Počet nalezených nabídek: 2\n"));
    assert!(first.contains("## Python Developer\n"));
    assert!(first.contains("Společnost: Beta Soft a.s.\n"));
}

#[test]
fn fixture_listing_page_is_not_end_of_results() {
    assert!(!parser::is_end_of_listings(LISTING_PAGE));
    assert_eq!(parser::parse_total_count(LISTING_PAGE), Some(2));
}

#[test]
fn error_log_name_matches_automation_contract() {
    assert_eq!(pipeline::ERROR_LOG_FILE, "error_log.txt");
}
