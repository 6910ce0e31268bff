//! Canonical report representation and inbound payload adapters.
//!
//! The wire format went through two generations: a list of
//! `{name, qty, expiry, notes?}` objects, and an older shape keyed by item
//! name. Both are still accepted; [`ReportPayload::into_report`] normalizes
//! either into the one [`Report`] the projector understands.

use crate::error::{TallyError, TallyResult};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// A validated, normalized field report.
#[derive(Debug, Clone)]
pub struct Report {
    pub merchandiser: String,
    pub outlet: String,
    pub date: String,
    /// Submission-level notes; `None` when absent from the payload.
    pub notes: Option<String>,
    pub items: Vec<ReportItem>,
}

impl Report {
    /// Whether any item carries its own notes text. Decides the column
    /// layout: per-item notes get a dedicated third column.
    #[must_use]
    pub fn has_item_notes(&self) -> bool {
        self.items.iter().any(|i| i.notes.is_some())
    }
}

/// One inventory line item, already coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportItem {
    pub name: String,
    pub qty: i64,
    pub expiry: String,
    pub notes: Option<String>,
}

impl ReportItem {
    /// Matching key: trimmed and lower-cased name.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Trim surrounding whitespace and lower-case, for case-insensitive matching.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The raw `POST /report` body. Every field is optional at this stage so the
/// boundary can reject missing ones with a message instead of a serde error.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportPayload {
    pub merchandiser: Option<String>,
    pub outlet: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<JsonValue>,
    pub items: Option<ItemsPayload>,
}

/// The two accepted shapes of the `items` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemsPayload {
    /// Current shape: a list of items, each naming itself.
    List(Vec<RawItem>),
    /// Legacy shape: an object keyed by item name.
    Named(IndexMap<String, RawItem>),
}

/// An item as it arrives on the wire, before coercion. `qty`, `expiry` and
/// `notes` are kept as raw JSON because clients send numbers, strings,
/// `null`, and the literal string `"null"` interchangeably.
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub qty: Option<JsonValue>,
    #[serde(default)]
    pub expiry: Option<JsonValue>,
    #[serde(default)]
    pub notes: Option<JsonValue>,
}

impl ReportPayload {
    /// Validate the payload shape and normalize it into a [`Report`].
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::Validation`] when `merchandiser`, `outlet` or
    /// `date` is missing or blank, when `items` is absent, or when a list
    /// item has no name.
    pub fn into_report(self) -> TallyResult<Report> {
        let merchandiser = require_text(self.merchandiser, "merchandiser")?;
        let outlet = require_text(self.outlet, "outlet")?;
        let date = require_text(self.date, "date")?;

        let items = match self.items {
            Some(ItemsPayload::List(raw)) => {
                let mut items = Vec::with_capacity(raw.len());
                for item in raw {
                    let name = item
                        .name
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .ok_or_else(|| TallyError::validation("item without a name"))?
                        .to_string();
                    items.push(coerce_item(name, &item));
                }
                items
            }
            Some(ItemsPayload::Named(raw)) => raw
                .into_iter()
                .map(|(name, item)| coerce_item(name, &item))
                .collect(),
            None => return Err(TallyError::validation("items must be present")),
        };

        Ok(Report {
            merchandiser,
            outlet,
            date,
            notes: coerce_optional_text(self.notes.as_ref()),
            items,
        })
    }
}

fn require_text(value: Option<String>, field: &str) -> TallyResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| TallyError::Validation(format!("missing required field: {field}")))
}

fn coerce_item(name: String, raw: &RawItem) -> ReportItem {
    ReportItem {
        name,
        qty: coerce_qty(raw.qty.as_ref()),
        expiry: coerce_text(raw.expiry.as_ref()),
        notes: coerce_optional_text(raw.notes.as_ref()),
    }
}

/// Quantity coercion: numbers pass through (floats truncate), strings are
/// parsed by their leading integer prefix ("7.5" and "7abc" are both 7, as
/// existing clients expect), everything else (`null`, `"null"`, `""`,
/// garbage) is 0.
fn coerce_qty(value: Option<&JsonValue>) -> i64 {
    match value {
        Some(JsonValue::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(JsonValue::String(s)) => parse_int_prefix(s.trim()),
        _ => 0,
    }
}

/// Parse the leading `[+-]?[0-9]+` prefix of a string, 0 when none leads.
fn parse_int_prefix(s: &str) -> i64 {
    let bytes = s.as_bytes();
    let start = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return 0;
    }
    s[..start + digits].parse().unwrap_or(0)
}

/// Text coercion for expiry: `null`/`"null"`/absent become the empty string.
fn coerce_text(value: Option<&JsonValue>) -> String {
    coerce_optional_text(value).unwrap_or_default()
}

fn coerce_optional_text(value: Option<&JsonValue>) -> Option<String> {
    match value {
        Some(JsonValue::String(s)) if !s.eq_ignore_ascii_case("null") => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        Some(JsonValue::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}
