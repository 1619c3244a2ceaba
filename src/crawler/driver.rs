//! Crawl driver
//!
//! Walks the [`CrawlState`] machine for one run: fetch a listing page, parse
//! its cards, then for each card check the dedup index, fetch the detail
//! description and insert the listing. Empty pages are paged past. Every step is validated against
//! [`CrawlState::can_transition_to`] before it is taken.

use crate::config::Config;
use crate::crawler::dedup::DedupIndex;
use crate::crawler::detail::DetailFetcher;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::ListingParser;
use crate::listing::JobListing;
use crate::state::{CrawlState, DoneReason};
use crate::storage::{InsertError, RunTotals, Storage};
use crate::HarvestError;
use chrono::Local;
use std::time::Duration;

/// Outcome of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub reason: DoneReason,
    pub totals: RunTotals,
    /// Listings inserted by this run, in crawl order
    pub saved: Vec<JobListing>,
}

impl CrawlReport {
    pub fn saved_count(&self) -> usize {
        self.saved.len()
    }
}

/// Limits the driver enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlLimits {
    pub max_jobs: u32,
    pub max_pages: u32,
    pub page_delay: Duration,
}

impl CrawlLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_jobs: config.crawler.max_jobs,
            max_pages: config.crawler.max_pages,
            page_delay: config.crawler.page_delay(),
        }
    }
}

/// What happened to a single card
enum CardOutcome {
    Saved(JobListing),
    Duplicate,
    Skipped,
    InsertFailed,
}

pub struct CrawlDriver<'a, S: Storage> {
    pages: PageFetcher,
    parser: ListingParser,
    details: DetailFetcher,
    dedup: DedupIndex,
    store: &'a mut S,
    limits: CrawlLimits,
}

impl<'a, S: Storage> CrawlDriver<'a, S> {
    pub fn new(
        pages: PageFetcher,
        parser: ListingParser,
        details: DetailFetcher,
        dedup: DedupIndex,
        store: &'a mut S,
        limits: CrawlLimits,
    ) -> Self {
        Self {
            pages,
            parser,
            details,
            dedup,
            store,
            limits,
        }
    }

    /// Runs the state machine to a terminal state
    ///
    /// Page and card failures are absorbed into the report; only an illegal
    /// state transition is returned as an error.
    pub async fn run(mut self) -> Result<CrawlReport, HarvestError> {
        let mut state = CrawlState::start();
        let mut totals = RunTotals::default();
        let mut saved: Vec<JobListing> = Vec::new();
        let mut cards: Vec<Option<JobListing>> = Vec::new();

        loop {
            let next = match state {
                CrawlState::Done(reason) => {
                    tracing::info!(
                        "Crawl finished ({}): {} saved, {} duplicates, {} skipped, {} insert failures over {} page(s)",
                        reason,
                        totals.jobs_saved,
                        totals.duplicates_skipped,
                        totals.cards_skipped,
                        totals.insert_failures,
                        totals.pages_fetched
                    );
                    return Ok(CrawlReport {
                        reason,
                        totals,
                        saved,
                    });
                }

                CrawlState::Paging { page } => {
                    if totals.jobs_saved >= self.limits.max_jobs {
                        CrawlState::Done(DoneReason::QuotaReached)
                    } else if page > self.limits.max_pages {
                        CrawlState::Done(DoneReason::PageLimitReached)
                    } else {
                        if page > 1 {
                            tokio::time::sleep(self.limits.page_delay).await;
                        }

                        match self.pages.fetch_page(page).await {
                            Ok(body) => {
                                totals.pages_fetched += 1;
                                cards = self.parser.parse_page(&body, Local::now().naive_local());
                                tracing::info!("Page {}: {} job card(s)", page, cards.len());
                                CrawlState::PageFetched {
                                    page,
                                    cards: cards.len(),
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Stopping pagination: {}", e);
                                CrawlState::Done(DoneReason::PageFetchExhausted)
                            }
                        }
                    }
                }

                CrawlState::PageFetched { page, cards: 0 } => {
                    tracing::info!("Page {} has no listings", page);
                    self.next_page(page)
                }

                CrawlState::PageFetched { page, .. } => CrawlState::PerCard { page, index: 0 },

                CrawlState::PerCard { page, index } => {
                    let card = cards.get_mut(index).and_then(Option::take);
                    match self.process_card(card).await {
                        CardOutcome::Saved(listing) => {
                            saved.push(listing);
                            totals.jobs_saved += 1;
                        }
                        CardOutcome::Duplicate => totals.duplicates_skipped += 1,
                        CardOutcome::Skipped => totals.cards_skipped += 1,
                        CardOutcome::InsertFailed => totals.insert_failures += 1,
                    }

                    if totals.jobs_saved >= self.limits.max_jobs {
                        CrawlState::Done(DoneReason::QuotaReached)
                    } else if index + 1 < cards.len() {
                        CrawlState::PerCard {
                            page,
                            index: index + 1,
                        }
                    } else {
                        self.next_page(page)
                    }
                }
            };

            if !state.can_transition_to(&next) {
                return Err(HarvestError::InvalidTransition {
                    from: state,
                    to: next,
                });
            }
            tracing::trace!("{} -> {}", state, next);
            state = next;
        }
    }

    /// State after the last card of `page` (or an empty `page`)
    fn next_page(&self, page: u32) -> CrawlState {
        if page >= self.limits.max_pages {
            CrawlState::Done(DoneReason::PageLimitReached)
        } else {
            CrawlState::Paging { page: page + 1 }
        }
    }

    /// Dedup check, detail fetch and insert for one parsed card
    ///
    /// A listing without a detail URL has nothing to deduplicate on or fetch,
    /// so it is inserted as is with an empty description.
    async fn process_card(&mut self, card: Option<JobListing>) -> CardOutcome {
        let Some(mut listing) = card else {
            return CardOutcome::Skipped;
        };

        let url = listing.url.clone();
        match &url {
            Some(url) if self.dedup.contains(url) => {
                tracing::debug!("Already stored: {}", url);
                return CardOutcome::Duplicate;
            }
            Some(url) => listing.description = self.details.fetch_description(url).await,
            None => tracing::debug!("No detail URL for '{}'", listing.label()),
        }

        match self.store.insert_job(&listing) {
            Ok(id) => {
                tracing::info!("Saved job {}: {}", id, listing.label());
                if let Some(url) = url {
                    self.dedup.add(url);
                }
                CardOutcome::Saved(listing)
            }
            Err(InsertError::Duplicate { url }) => {
                tracing::debug!("Rejected by storage as duplicate: {}", url);
                self.dedup.add(url);
                CardOutcome::Duplicate
            }
            Err(e) => {
                tracing::error!("Failed to save '{}': {}", listing.label(), e);
                CardOutcome::InsertFailed
            }
        }
    }
}
