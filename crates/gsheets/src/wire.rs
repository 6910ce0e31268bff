//! Wire types and request builders for the Sheets v4 API.

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tallysheet_store::{FormatOp, TabMeta};

/// `values.get` / `values.update` payload.
#[derive(Debug, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub values: Vec<Vec<JsonValue>>,
}

impl ValueRange {
    /// Cells arrive as arbitrary JSON scalars; the projector works in
    /// strings.
    pub fn into_strings(self) -> Vec<Vec<String>> {
        self.values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect()
    }
}

fn cell_to_string(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SpreadsheetMeta {
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SheetEntry {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub title: String,
    pub sheet_id: i64,
    #[serde(default)]
    pub grid_properties: Option<GridProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub column_count: u32,
}

impl SpreadsheetMeta {
    pub fn into_tabs(self) -> Vec<TabMeta> {
        self.sheets
            .into_iter()
            .map(|s| TabMeta {
                title: s.properties.title,
                tab_id: s.properties.sheet_id,
                column_count: s.properties.grid_properties.unwrap_or_default().column_count,
            })
            .collect()
    }
}

/// Quote the tab name when it needs it ('Acacia Market'!A1:A7) and join
/// with the range, per the A1 grammar the API expects.
pub fn qualified_range(tab: &str, range: &str) -> String {
    let plain = tab.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if plain {
        format!("{tab}!{range}")
    } else {
        format!("'{}'!{range}", tab.replace('\'', "''"))
    }
}

/// A `batchUpdate` request for one formatting op.
pub fn format_request(op: &FormatOp) -> JsonValue {
    match op {
        FormatOp::HeaderStyle {
            tab_id,
            row,
            start_col,
            end_col,
            background,
        } => json!({
            "repeatCell": {
                "range": grid_range(*tab_id, *row, *row, *start_col, *end_col),
                "cell": {
                    "userEnteredFormat": {
                        "textFormat": { "bold": true },
                        "backgroundColor": hex_color(background)
                    }
                },
                "fields": "userEnteredFormat(textFormat.bold,backgroundColor)"
            }
        }),
        FormatOp::TextWrap {
            tab_id,
            start_row,
            end_row,
            start_col,
            end_col,
        } => json!({
            "repeatCell": {
                "range": grid_range(*tab_id, *start_row, *end_row, *start_col, *end_col),
                "cell": { "userEnteredFormat": { "wrapStrategy": "WRAP" } },
                "fields": "userEnteredFormat.wrapStrategy"
            }
        }),
        FormatOp::RowHeight { tab_id, row, pixels } => json!({
            "updateDimensionProperties": {
                "range": {
                    "sheetId": tab_id,
                    "dimension": "ROWS",
                    "startIndex": row - 1,
                    "endIndex": row
                },
                "properties": { "pixelSize": pixels },
                "fields": "pixelSize"
            }
        }),
        FormatOp::CellNote { tab_id, row, col, note } => json!({
            "repeatCell": {
                "range": grid_range(*tab_id, *row, *row, *col, *col),
                "cell": { "note": note },
                "fields": "note"
            }
        }),
    }
}

/// 1-based inclusive rows/cols to the API's 0-based half-open GridRange.
fn grid_range(tab_id: i64, start_row: u32, end_row: u32, start_col: u32, end_col: u32) -> JsonValue {
    json!({
        "sheetId": tab_id,
        "startRowIndex": start_row - 1,
        "endRowIndex": end_row,
        "startColumnIndex": start_col - 1,
        "endColumnIndex": end_col
    })
}

fn hex_color(hex: &str) -> JsonValue {
    let channel = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 2).unwrap_or("00"), 16).unwrap_or(0) as f64 / 255.0
    };
    json!({ "red": channel(0), "green": channel(2), "blue": channel(4) })
}
