//! Fitted label encoders: string category -> integer code.
//!
//! The artifact is an object keyed by column. Each entry is accepted in two shapes:
//! - a class list (`LabelEncoder.classes_` at training time); code = position
//! - an explicit `{category: code}` table

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EncoderRepr {
    Classes(Vec<String>),
    Table(HashMap<String, u32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "EncoderRepr")]
pub struct LabelEncoder {
    codes: HashMap<String, u32>,
}

impl From<EncoderRepr> for LabelEncoder {
    fn from(r: EncoderRepr) -> Self {
        match r {
            EncoderRepr::Classes(classes) => Self::from_classes(classes),
            EncoderRepr::Table(codes) => Self { codes },
        }
    }
}

impl LabelEncoder {
    pub fn from_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes = HashMap::new();
        for (i, c) in classes.into_iter().enumerate() {
            // first occurrence keeps its position
            codes.entry(c.into()).or_insert(i as u32);
        }
        Self { codes }
    }

    pub fn transform(&self, label: &str) -> Result<u32> {
        self.codes
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("previously unseen label {label:?}"))
    }

    /// Known categories ordered by code.
    pub fn classes(&self) -> Vec<&str> {
        let mut v: Vec<(&str, u32)> = self.codes.iter().map(|(k, c)| (k.as_str(), *c)).collect();
        v.sort_by_key(|(_, c)| *c);
        v.into_iter().map(|(k, _)| k).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LabelEncoders {
    by_column: HashMap<String, LabelEncoder>,
}

impl LabelEncoders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, encoder: LabelEncoder) {
        self.by_column.insert(column.into(), encoder);
    }

    #[inline]
    pub fn get(&self, column: &str) -> Option<&LabelEncoder> {
        self.by_column.get(column)
    }

    #[inline]
    pub fn contains(&self, column: &str) -> bool {
        self.by_column.contains_key(column)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_column.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_column.is_empty()
    }
}
