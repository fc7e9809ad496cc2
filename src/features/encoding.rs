//! Bidirectional label <-> code mapping for categorical columns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Maps category labels to dense codes `0..len` in sorted label order.
///
/// Serialized as its label list; codes are recovered from position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoryEncoder {
    labels: Vec<String>,
    codes: BTreeMap<String, u32>,
}

impl CategoryEncoder {
    /// Build an encoder from any labels (duplicates collapse).
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort();
        labels.dedup();
        let codes = labels
            .iter()
            .enumerate()
            .map(|(code, label)| (label.clone(), code as u32))
            .collect();
        Self { labels, codes }
    }

    pub fn encode(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.labels.get(code as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in code order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl From<Vec<String>> for CategoryEncoder {
    fn from(labels: Vec<String>) -> Self {
        Self::from_labels(labels)
    }
}

impl From<CategoryEncoder> for Vec<String> {
    fn from(encoder: CategoryEncoder) -> Self {
        encoder.labels
    }
}
