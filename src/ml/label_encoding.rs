use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Bijection between emotion names and class indices, in sorted name order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLabelEncoding", into = "RawLabelEncoding")]
pub struct LabelEncoding {
    classes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct RawLabelEncoding {
    classes: Vec<String>,
}

impl LabelEncoding {
    /// Build the encoding from every label observed in training.
    pub fn fit<I, S>(labels: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        Self::from_classes(classes.into_iter().collect())
    }

    /// Accept a stored class list, which must be non-empty, sorted and unique.
    pub fn from_classes(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("Label encoding has no classes".to_string());
        }
        if classes.iter().any(|class| class.is_empty()) {
            return Err("Label encoding contains an empty class name".to_string());
        }
        if classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err("Label encoding classes must be sorted and unique".to_string());
        }
        Ok(Self { classes })
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl TryFrom<RawLabelEncoding> for LabelEncoding {
    type Error = String;

    fn try_from(raw: RawLabelEncoding) -> Result<Self, Self::Error> {
        Self::from_classes(raw.classes)
    }
}

impl From<LabelEncoding> for RawLabelEncoding {
    fn from(encoding: LabelEncoding) -> Self {
        Self {
            classes: encoding.classes,
        }
    }
}
