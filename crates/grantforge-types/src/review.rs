//! Review documents. A review set is scored against the grant's rubric; the
//! submission wrapper says where the (possibly sealed) document lives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Address, ContentHash};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    /// Index key of the rubric criterion this item scores.
    pub rubric_item: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSet {
    pub items: Vec<FeedbackItem>,
}

/// What gets registered for one submitted review: where the public document
/// lives (absent for private reviews) and, per recipient, where their sealed
/// copy lives.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSubmission {
    pub reviewer: Address,
    pub public_data_hash: Option<ContentHash>,
    pub encrypted: BTreeMap<Address, ContentHash>,
}

impl ReviewSubmission {
    pub fn is_private(&self) -> bool {
        self.public_data_hash.is_none()
    }
}
