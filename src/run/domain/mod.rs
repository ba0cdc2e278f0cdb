//! Domain model for exclusive, config-scoped watch runs.

mod expansion;
mod filter_document;
mod ranking;
mod request;
mod result;
mod settings;
mod slot;

pub use expansion::{ExpandedKeywords, KeywordExpansion, MAX_TERMS_PER_SEED};
pub use filter_document::{FilterDocument, GLOBAL_FILTER_SECTION, WORD_GROUPS_SECTION};
pub use ranking::{
    KeywordMatcher, MAX_MATCHED_ITEMS, MatchedItem, ResultItem, SourceKind, SourceResults,
    compare_matches, match_and_rank,
};
pub use request::{AdHocRunRequest, RunOutput, RunRequest, RunRequestError};
pub use result::{RunOutcome, RunResult, RunStats};
pub use settings::{
    PlatformSettings, PlatformSource, ReportSettings, ScheduleSettings, SettingsError,
    WatchSettings,
};
pub use slot::{RunPermit, RunSlot};
