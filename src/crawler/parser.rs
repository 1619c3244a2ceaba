//! Job-card parser
//!
//! This module turns a listing page into [`JobListing`] records:
//! - Splitting the page into job cards (document order)
//! - Extracting each field independently, so a missing element only nulls that field
//! - Resolving the detail link against the site root
//! - Parsing the site's deadline strings into dates

use crate::config::{Config, SelectorConfig};
use crate::listing::JobListing;
use crate::url::{resolve_detail_url, site_root};
use crate::{ConfigError, HarvestError};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// A card that could not be turned into a listing
#[derive(Debug, Error)]
#[error("card skipped: {reason}")]
pub struct ParseSkipped {
    pub reason: String,
}

/// Selectors compiled once per run
#[derive(Debug, Clone)]
struct CardSelectors {
    card: Selector,
    badge: Selector,
    company: Selector,
    title_link: Selector,
    deadline: Selector,
    work_place: Selector,
    career: Selector,
    education: Selector,
    employment_type: Selector,
    salary: Selector,
    tag_container: Selector,
    tag: Selector,
}

fn compile(field: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field: field.to_string(),
        selector: selector.to_string(),
    })
}

impl CardSelectors {
    fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            card: compile("card", &config.card)?,
            badge: compile("badge", &config.badge)?,
            company: compile("company", &config.company)?,
            title_link: compile("title-link", &config.title_link)?,
            deadline: compile("deadline", &config.deadline)?,
            work_place: compile("work-place", &config.work_place)?,
            career: compile("career", &config.career)?,
            education: compile("education", &config.education)?,
            employment_type: compile("employment-type", &config.employment_type)?,
            salary: compile("salary", &config.salary)?,
            tag_container: compile("tag-container", &config.tag_container)?,
            tag: compile("tag", &config.tag)?,
        })
    }
}

/// Parses listing pages into job records
#[derive(Debug, Clone)]
pub struct ListingParser {
    selectors: CardSelectors,
    root: Url,
    job_group: String,
}

impl ListingParser {
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        Ok(Self {
            selectors: CardSelectors::compile(&config.selectors)?,
            root: site_root(&config.site.base_url)?,
            job_group: config.site.job_group.clone(),
        })
    }

    /// Parses every card on a listing page, in document order
    ///
    /// The result has one entry per card; `None` marks a card that was
    /// skipped. Descriptions are left empty for the detail fetcher.
    ///
    /// # Example
    ///
    /// ```
    /// use job_harvest::config::Config;
    /// use job_harvest::crawler::ListingParser;
    ///
    /// let mut config = Config::default();
    /// config.site.base_url = "https://jobs.example.com".to_string();
    /// let parser = ListingParser::new(&config).unwrap();
    ///
    /// let html = r#"<div class="item_recruit">
    ///     <h2 class="job_tit"><a href="/view?rec_idx=1" title="Rust Engineer">Rust</a></h2>
    /// </div>"#;
    /// let now = chrono::Local::now().naive_local();
    /// let cards = parser.parse_page(html, now);
    /// let listing = cards[0].as_ref().unwrap();
    /// assert_eq!(listing.title.as_deref(), Some("Rust Engineer"));
    /// assert_eq!(listing.url.as_deref(), Some("https://jobs.example.com/view?rec_idx=1"));
    /// ```
    pub fn parse_page(&self, html: &str, scraped_at: NaiveDateTime) -> Vec<Option<JobListing>> {
        let document = Html::parse_document(html);

        document
            .select(&self.selectors.card)
            .enumerate()
            .map(|(index, card)| match self.parse_card(card, scraped_at) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    tracing::warn!("Card {} skipped: {}", index, e.reason);
                    None
                }
            })
            .collect()
    }

    /// Extracts one listing from a job card
    pub fn parse_card(
        &self,
        card: ElementRef<'_>,
        scraped_at: NaiveDateTime,
    ) -> Result<JobListing, ParseSkipped> {
        let s = &self.selectors;

        let title_link = card.select(&s.title_link).next();
        let url = title_link
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| match resolve_detail_url(&self.root, href) {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    tracing::debug!("Unusable detail link '{}': {}", href, e);
                    None
                }
            });

        let title = title_link
            .and_then(|link| attr(link, "title"))
            .or_else(|| title_link.and_then(text_of));
        let company_name =
            select_attr(card, &s.company, "title").or_else(|| select_text(card, &s.company));

        if title.is_none() && company_name.is_none() && url.is_none() {
            return Err(ParseSkipped {
                reason: "no title, company or detail link".to_string(),
            });
        }

        let work_place = select_text(card, &s.work_place);

        Ok(JobListing {
            job_group: self.job_group.clone(),
            badge: select_attr(card, &s.badge, "src"),
            company_name,
            title,
            deadline: select_attr(card, &s.deadline, "title")
                .or_else(|| select_text(card, &s.deadline))
                .and_then(|raw| parse_deadline(&raw, scraped_at.date())),
            address_main: work_place.clone(),
            address_total: work_place,
            experience: select_text(card, &s.career),
            education: select_text(card, &s.education),
            employment_type: select_text(card, &s.employment_type),
            salary: select_text(card, &s.salary),
            tech_stack: tech_stack(card, &s.tag_container, &s.tag),
            created_at: scraped_at,
            crawled_at: scraped_at,
            url,
            description: String::new(),
        })
    }
}

/// Whitespace-collapsed text of an element, `None` if blank
fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn select_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector).next().and_then(text_of)
}

fn select_attr(card: ElementRef<'_>, selector: &Selector, name: &str) -> Option<String> {
    card.select(selector).next().and_then(|el| attr(el, name))
}

/// Comma-joined tag texts; `None` without a container or without tags
fn tech_stack(card: ElementRef<'_>, container: &Selector, tag: &Selector) -> Option<String> {
    let container = card.select(container).next()?;
    let tags: Vec<String> = container.select(tag).filter_map(text_of).collect();
    (!tags.is_empty()).then(|| tags.join(", "))
}

/// Parses the deadline strings the listing site uses
///
/// Accepts full dates (`2024-12-31`, `2024.12.31`, `2024/12/31`), short
/// month/day forms (`~ 12/31(화)`, `12.31`) and the `오늘마감` / `내일마감`
/// markers. Short forms take the year of `today`, rolling into next year
/// when the date has already passed. Anything else (e.g. `상시채용`) is `None`.
pub fn parse_deadline(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.contains("오늘마감") {
        return Some(today);
    }
    if raw.contains("내일마감") {
        return today.checked_add_signed(Duration::days(1));
    }

    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let date_part: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | '/'))
        .collect();

    let fields: Vec<u32> = date_part
        .split(['-', '.', '/'])
        .filter(|f| !f.is_empty())
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;

    match fields.as_slice() {
        [year, month, day] if *year >= 1000 => {
            NaiveDate::from_ymd_opt(i32::try_from(*year).ok()?, *month, *day)
        }
        [month, day] => {
            let this_year = NaiveDate::from_ymd_opt(today.year(), *month, *day)?;
            if this_year < today {
                NaiveDate::from_ymd_opt(today.year() + 1, *month, *day)
            } else {
                Some(this_year)
            }
        }
        _ => None,
    }
}
