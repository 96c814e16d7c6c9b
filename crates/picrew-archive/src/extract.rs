//! State extractor — locate and decode the embedded state blob.
//!
//! The maker page carries its whole client state in one inline script:
//! `<script>window.__NUXT__={...};</script>`. Everything between the
//! assignment and the closing `;</script>` is a single object-literal
//! expression, decoded by [`crate::literal`] and mapped into [`RawState`].

use crate::error::ExtractionError;
use crate::literal;
use crate::state::RawState;
use serde::Deserialize;

/// Opens the embedded state expression.
pub const START_MARKER: &str = "<script>window.__NUXT__=";

/// Closes the embedded state expression.
pub const END_MARKER: &str = ";</script>";

#[derive(Deserialize)]
struct NuxtPayload {
    #[serde(default)]
    state: Option<RawState>,
}

/// Extract the [`RawState`] from raw page markup.
///
/// Fatal when the delimiter pair is missing or the bracketed expression is
/// not a decodable literal — no partial result is meaningful without a
/// state root.
pub fn extract_state(html: &str) -> Result<RawState, ExtractionError> {
    let start = html
        .find(START_MARKER)
        .ok_or(ExtractionError::MarkerNotFound)?;
    let expr_start = start + START_MARKER.len();
    let expr_end = html[expr_start..]
        .find(END_MARKER)
        .ok_or(ExtractionError::MarkerNotFound)?
        + expr_start;

    let value = literal::parse(html[expr_start..expr_end].trim())?;
    let payload: NuxtPayload = serde_json::from_value(value)?;
    Ok(payload.state.unwrap_or_default())
}
