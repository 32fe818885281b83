//! Label encoder: fitted vocabulary of category labels.
//!
//! The code of a label is its position in the fitted `classes` list. Lookup of a label that
//! was not seen during fitting returns `None`; the caller decides the
//! fallback.

use std::collections::HashMap;

use serde::Deserialize;

use crate::ports::CategoryEncoder;

#[derive(Debug, Deserialize)]
struct LabelEncoderParams {
    classes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LabelEncoderParams")]
pub struct LabelEncoder {
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    /// # Errors
    /// Returns a description of the problem on an empty or duplicated vocabulary.
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("label encoder has no classes".into());
        }

        let mut index = HashMap::with_capacity(classes.len());
        for (code, label) in classes.iter().enumerate() {
            if index.insert(label.clone(), code).is_some() {
                return Err(format!("duplicate class {label:?}"));
            }
        }
        Ok(Self { index })
    }
}

impl TryFrom<LabelEncoderParams> for LabelEncoder {
    type Error = String;

    fn try_from(params: LabelEncoderParams) -> Result<Self, Self::Error> {
        Self::new(params.classes)
    }
}

impl CategoryEncoder for LabelEncoder {
    fn encode(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }
}
