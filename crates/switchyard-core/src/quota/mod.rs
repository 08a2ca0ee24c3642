//! Quota admission, usage accounting, and asynchronous recording
//!
//! The split mirrors the data flow: `window` says what a caller is allowed,
//! `usage` is the append-only ledger of what they consumed, `admission`
//! projects one against the other before dispatch, and `recorder` persists
//! actual consumption off the request path.

mod admission;
mod recorder;
mod usage;
mod window;

pub use admission::{estimate_tokens, QuotaAdmissionController, QuotaDecision, QuotaStatusReport};
pub use recorder::{UsageRecorder, DEFAULT_QUEUE_CAPACITY};
pub use usage::{MemoryUsageStore, QuotaUsageRecord, UsageStore, UsageTotals};
pub use window::{
    QuotaPolicy, QuotaWindow, StaticQuotaPolicy, DEFAULT_MONTHLY_TOKEN_LIMIT, DEFAULT_ROLE,
};
