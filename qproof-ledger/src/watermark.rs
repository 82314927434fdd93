//! Synthetic-data watermark

use crate::ExecutionMode;
use serde_json::{json, Value};

/// Marker embedded in every DEV result
pub const SYNTHETIC_MARKER: &str = "qproof.synthetic.v1";

/// Key wrapping the watermark record
pub const WATERMARK_KEY: &str = "synthetic_watermark";

/// Stamp a synthetic marker into `result`
///
/// In `DEV` mode the result is always wrapped, even if it already carries a
/// watermark, so the canonical form of a synthetic result can never equal the
/// canonical form of the same counts recorded as hardware output. In `QPU` mode
/// the value is returned unchanged.
///
/// # Example
/// ```
/// use qproof_ledger::{apply_watermark, is_watermarked, ExecutionMode};
/// use serde_json::json;
///
/// let stamped = apply_watermark(json!({"00": 10}), ExecutionMode::Dev);
/// assert!(is_watermarked(&stamped));
/// assert_eq!(stamped["payload"], json!({"00": 10}));
/// ```
pub fn apply_watermark(result: Value, mode: ExecutionMode) -> Value {
    match mode {
        ExecutionMode::Dev => json!({
            "synthetic_watermark": {
                "marker": SYNTHETIC_MARKER,
                "mode": mode.as_str(),
            },
            "payload": result,
        }),
        ExecutionMode::Qpu => result,
    }
}

/// True if `value` carries the synthetic watermark at its top level
pub fn is_watermarked(value: &Value) -> bool {
    value
        .get(WATERMARK_KEY)
        .and_then(|w| w.get("marker"))
        .and_then(Value::as_str)
        == Some(SYNTHETIC_MARKER)
}
