/// Crawl driver states and stop reasons
use serde::Serialize;
use std::fmt;

/// Why a crawl run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    /// The run saved `max-jobs` new listings
    QuotaReached,

    /// A listing page failed on every attempt
    PageFetchExhausted,

    /// `max-pages` listing pages were processed
    PageLimitReached,
}

impl DoneReason {
    /// Converts the reason to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::QuotaReached => "quota_reached",
            Self::PageFetchExhausted => "page_fetch_exhausted",
            Self::PageLimitReached => "page_limit_reached",
        }
    }

    /// Parses a reason from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "quota_reached" => Some(Self::QuotaReached),
            "page_fetch_exhausted" => Some(Self::PageFetchExhausted),
            "page_limit_reached" => Some(Self::PageLimitReached),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [
            Self::QuotaReached,
            Self::PageFetchExhausted,
            Self::PageLimitReached,
        ]
    }
}

impl fmt::Display for DoneReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Position of the crawl driver
///
/// ```text
/// Paging(p) -> PageFetched(p) -> PerCard(p, 0) -> ... -> Paging(p + 1)
///     \              \                \
///      `-> Done       `-> Done         `-> Done
/// ```
///
/// An empty page goes straight from `PageFetched(p, 0)` to `Paging(p + 1)`,
/// or to `Done(PageLimitReached)` on the last allowed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// About to fetch listing page `page`
    Paging { page: u32 },

    /// Page `page` was fetched and split into `cards` job cards
    PageFetched { page: u32, cards: usize },

    /// Processing card `index` of page `page`
    PerCard { page: u32, index: usize },

    /// Terminal state
    Done(DoneReason),
}

impl CrawlState {
    /// Initial state of every run
    pub fn start() -> Self {
        Self::Paging { page: 1 }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Returns true if the driver may move from `self` to `next`
    pub fn can_transition_to(&self, next: &CrawlState) -> bool {
        use CrawlState::*;

        match (*self, *next) {
            (Done(_), _) => false,
            (Paging { page }, PageFetched { page: fetched, .. }) => page == fetched,
            (Paging { .. }, Done(reason)) => matches!(
                reason,
                DoneReason::PageFetchExhausted
                    | DoneReason::QuotaReached
                    | DoneReason::PageLimitReached
            ),
            (PageFetched { page, cards }, PerCard { page: card_page, index }) => {
                page == card_page && index == 0 && cards > 0
            }
            (PageFetched { page, cards }, Paging { page: next_page }) => {
                cards == 0 && next_page == page + 1
            }
            (PageFetched { cards, .. }, Done(DoneReason::PageLimitReached)) => cards == 0,
            (PerCard { page, index }, PerCard { page: card_page, index: next_index }) => {
                page == card_page && next_index == index + 1
            }
            (PerCard { page, .. }, Paging { page: next_page }) => next_page == page + 1,
            (PerCard { .. }, Done(reason)) => {
                matches!(reason, DoneReason::QuotaReached | DoneReason::PageLimitReached)
            }
            _ => false,
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paging { page } => write!(f, "paging({})", page),
            Self::PageFetched { page, cards } => write!(f, "page_fetched({}, {} cards)", page, cards),
            Self::PerCard { page, index } => write!(f, "per_card({}, {})", page, index),
            Self::Done(reason) => write!(f, "done({})", reason),
        }
    }
}
