use chrono::{DateTime, Local};

use crate::parser::JobListing;

/// Renders one job as a text block. Deterministic: the same listing always
/// yields the same bytes.
pub fn format_listing(job: &JobListing) -> String {
    // Pre-allocate roughly the right amount of space
    let mut block = String::with_capacity(job.description.len() + 128);
    block.push_str(&format!("## {}\n", job.title));
    block.push_str(&format!("URL adresa: {}\n", job.url));
    block.push_str(&format!("Společnost: {}\n", job.company));
    block.push_str(&format!("Lokalita: {}\n", job.location));
    block.push_str(&format!("Text inzerátu:\n{}\n\n---\n\n", job.description));
    block
}

/// The full document content: a header with the update time and match
/// count, followed by every listing in scrape order. The timestamp comes in
/// as an argument so the output is fixed for a fixed input.
pub fn format_report(listings: &[JobListing], updated_at: DateTime<Local>) -> String {
    let mut content = format!(
        "# Python pracovní nabídky\nPoslední aktualizace: {}\nPočet nalezených nabídek: {}\n\n",
        updated_at.format("%d.%m.%Y %H:%M"),
        listings.len()
    );
    for job in listings {
        content.push_str(&format_listing(job));
    }
    content
}
