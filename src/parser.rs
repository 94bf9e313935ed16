use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};

const SITE_BASE: &str = "https://www.jobs.cz";
const SEARCH_BASE: &str = "https://www.jobs.cz/prace/";
const SEARCH_QUERY: &str = "python";

// jobs.cz shows this message instead of results once the page number runs
// past the last available page.
const PAGE_UNAVAILABLE_MARKER: &str = "Zadaná stránka už není dostupná";

// Create static selectors to avoid recompiling them each time
static RESULT_CARD: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("article.SearchResultCard").expect("Failed to parse result card selector")
});

static CARD_TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h2.SearchResultCard__title").expect("Failed to parse card title selector")
});

static CARD_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.link-primary").expect("Failed to parse card link selector"));

static CARD_COMPANY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"span[translate="no"]"#).expect("Failed to parse company selector")
});

static CARD_LOCALITY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"li[data-test="serp-locality"]"#).expect("Failed to parse locality selector")
});

static SEARCH_HEADER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1.SearchHeader__title").expect("Failed to parse search header selector")
});

static NO_RESULTS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.SearchNoResults").expect("Failed to parse no-results selector")
});

static JOB_BODY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-jobad="body"]"#).expect("Failed to parse job body selector")
});

static BASE_URL: Lazy<Url> =
    Lazy::new(|| Url::parse(SITE_BASE).expect("Failed to parse site base URL"));

static SPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" +").expect("Failed to compile whitespace regex"));

/// One entry of the search results page: card metadata plus the link to the
/// detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCard {
    pub title: String,
    pub url: String,
    pub company: String,
    pub location: String,
}

/// A fully scraped job: listing-card metadata plus the detail-page text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub description: String,
}

impl JobListing {
    pub fn from_card(card: ListingCard, description: String) -> Self {
        JobListing {
            title: card.title,
            company: card.company,
            location: card.location,
            url: card.url,
            description,
        }
    }
}

/// The search URL for a given results page (1-based).
pub fn search_url(page: usize) -> String {
    let mut url = Url::parse(SEARCH_BASE).expect("Failed to parse search base URL");
    url.query_pairs_mut().append_pair("q[]", SEARCH_QUERY);
    if page > 1 {
        url.query_pairs_mut().append_pair("page", &page.to_string());
    }
    url.to_string()
}

/// Extracts every result card from a search page, in page order. Cards
/// missing a title or link come back as per-card errors so the caller can
/// log and skip them without dropping the rest of the page.
pub fn parse_listing_page(html: &str) -> Vec<Result<ListingCard>> {
    let document = Html::parse_document(html);
    document.select(&RESULT_CARD).map(parse_card).collect()
}

fn parse_card(card: ElementRef<'_>) -> Result<ListingCard> {
    let title_elem = card
        .select(&CARD_TITLE)
        .next()
        .ok_or_else(|| AppError::ParseError("listing card has no title".to_string()))?;
    let title = text_content(title_elem);
    if title.is_empty() {
        return Err(AppError::ParseError("listing card has an empty title".to_string()));
    }

    let href = title_elem
        .select(&CARD_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or_else(|| AppError::ParseError(format!("listing card '{title}' has no link")))?;
    let url = absolute_url(href)?;

    let company = card
        .select(&CARD_COMPANY)
        .next()
        .map(text_content)
        .unwrap_or_default();
    let location = card
        .select(&CARD_LOCALITY)
        .next()
        .map(text_content)
        .unwrap_or_else(|| "Remote".to_string());

    Ok(ListingCard {
        title,
        url,
        company,
        location,
    })
}

/// Extracts the job description from a detail page. A page without the
/// description container yields an empty string rather than an error.
pub fn parse_detail_page(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&JOB_BODY)
        .next()
        .map(|body| clean_text(&element_text(body)))
        .unwrap_or_default()
}

/// True when a search page signals the end of the listings, either with the
/// page-unavailable message or an explicit no-results block.
pub fn is_end_of_listings(html: &str) -> bool {
    if html.contains(PAGE_UNAVAILABLE_MARKER) {
        return true;
    }
    let document = Html::parse_document(html);
    document.select(&NO_RESULTS).next().is_some()
}

/// The total match count jobs.cz reports in the search header, if present.
pub fn parse_total_count(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let header = document.select(&SEARCH_HEADER).next()?;
    let digits: String = header
        .text()
        .flat_map(str::chars)
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Collapses runs of spaces, trims every line and drops blank ones.
pub fn clean_text(text: &str) -> String {
    let collapsed = SPACE_RUNS.replace_all(text, " ");
    collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn absolute_url(href: &str) -> Result<String> {
    if href.starts_with("http") {
        return Ok(href.to_string());
    }
    BASE_URL
        .join(href)
        .map(|url| url.to_string())
        .map_err(|e| AppError::ParseError(format!("invalid job link '{href}': {e}")))
}

/// Whole-element text with normalized fragment boundaries.
fn text_content(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// Text of every descendant, one fragment per line, skipping markup that is
// not part of the ad itself.
fn element_text(root: ElementRef<'_>) -> String {
    const SKIPPED_TAGS: [&str; 5] = ["script", "style", "nav", "header", "footer"];
    let root_id = root.id();
    let mut parts = Vec::new();

    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root_id)
            .any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
            });
        if skipped {
            continue;
        }
        let piece = text.trim();
        if !piece.is_empty() {
            parts.push(piece.to_string());
        }
    }
    parts.join("\n")
}
