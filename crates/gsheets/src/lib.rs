//! # tallysheet-gsheets
//!
//! [`TabularStore`](tallysheet_store::TabularStore) implementation backed
//! by the Google Sheets v4 REST API.

mod client;
mod wire;

pub use client::SheetsClient;
