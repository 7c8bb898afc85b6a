//! Pipeline stages for one submission.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ backend ──▶ response ──▶ extract ──▶ spreadsheet
//! (PDF)     (POST)      (decode)     (table)     (XLSX)
//! ```
//!
//! 1. [`input`]   — stage the PDF, checking its magic bytes
//! 2. [`backend`] — the only stage with network I/O; returns the raw reply
//! 3. [`response`] — status handling, error-message resolution, body decoding
//! 4. [`extract`] — pipe-delimited text to a [`extract::TableDocument`]
//! 5. [`spreadsheet`] — serialise the document; CPU-bound, run in
//!    `spawn_blocking` by the workflow

pub mod backend;
pub mod extract;
pub mod input;
pub mod response;
pub mod spreadsheet;
