//! Shared types and pure-logic utilities for the Grantforge platform.
//! Zero network or chain-SDK dependency, usable by the pipeline and by hosts.

mod chain;
mod currency;
mod error;
mod grant;
mod review;
mod time;
mod workspace;

pub use chain::{Address, ChainId, ContentHash, TxHash};
pub use currency::{CurrencyInfo, format_amount, parse_amount};
pub use error::TypeError;
pub use grant::{
    FieldKind, FieldMap, GrantField, GrantPayload, Reward, Rubric, RubricCriterion,
    custom_field_key, default_milestone_key, insert_field, mark_pii_fields,
};
pub use review::{FeedbackItem, ReviewSet, ReviewSubmission};
pub use time::{average_turnaround, relative_time};
pub use workspace::{AccessLevel, Member, Workspace, WorkspaceId};
