//! Cross-field validation of export requests
//!
//! Validation works on the JSON form of a request so that arbitrary and
//! partially built inputs can be checked without failing. Every rule runs
//! (an invalid mode does not stop the remaining checks) and all violations
//! are collected in rule order.

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use std::fmt;
use crate::error::ValidationError;
use crate::types::{ExportRequest, Mode};

/// Stable identifier for each kind of violation, ordered by rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    InvalidRequest,
    InvalidMode,
    ZSliceRequired,
    ZHeightForbidden,
    ZSliceForbidden,
    ZHeightNotNumber,
    ColorRangeShape,
    ColorRangeOrder,
    ThresholdMinOutOfRange,
    ThresholdMaxOutOfRange,
    ThresholdOrder,
    ApSelectionType,
    SingleApTooMany,
    MultiApTooFew,
    MultiApModeMissing,
    UnitsIncomplete,
    CrsMissing,
    SeedNotInteger,
}

/// One advisory validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub code: ViolationCode,
    pub message: String,
}

impl Violation {
    pub fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

type Rule = fn(&Map<String, Value>, &Validator, &mut Vec<Violation>);

/// Rules in evaluation order
const RULES: &[Rule] = &[
    check_mode,
    check_slicing,
    check_color_range,
    check_ap_selection,
    check_units,
    check_crs,
    check_seed,
];

const AP_SELECTION_TYPES: [&str; 2] = ["single", "multi"];
const MULTI_AP_MODES: [&str; 3] = ["max_rssi", "coverage", "overlap_dB"];

/// Export request validator
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    strict_color_range: bool,
}

impl Validator {
    /// Validator with the reference rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Additionally requires `color_range[0] <= color_range[1]`
    pub fn strict() -> Self {
        Self {
            strict_color_range: true,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict_color_range
    }

    /// Validate any JSON value. Never panics; non-objects yield one violation.
    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        let Some(request) = value.as_object() else {
            return vec![Violation::new(ViolationCode::InvalidRequest, "Invalid request")];
        };

        let mut violations = Vec::new();
        for rule in RULES {
            rule(request, self, &mut violations);
        }
        violations
    }

    /// Validate a typed request
    pub fn validate_request(&self, request: &ExportRequest) -> Vec<Violation> {
        let value = match serde_json::to_value(request) {
            Ok(value) => value,
            Err(_) => {
                return vec![Violation::new(ViolationCode::InvalidRequest, "Invalid request")]
            }
        };
        let mut violations = self.validate(&value);

        // Non-finite heights serialize as null and would otherwise read as absent
        if request.mode == Mode::ThreeD
            && request.z_height.is_some_and(|h| !h.is_finite())
        {
            let at = violations
                .iter()
                .position(|v| v.code > ViolationCode::ZHeightNotNumber)
                .unwrap_or(violations.len());
            violations.insert(
                at,
                Violation::new(
                    ViolationCode::ZHeightNotNumber,
                    "z_height must be a number when provided in 3D mode",
                ),
            );
        }
        violations
    }

    /// `Ok(())` when the request has no violations
    ///
    /// # Errors
    /// Returns every violation found.
    pub fn ensure_valid(&self, request: &ExportRequest) -> Result<(), ValidationError> {
        let violations = self.validate_request(request);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}

/// Validate with the reference rule set
pub fn validate(value: &Value) -> Vec<Violation> {
    Validator::new().validate(value)
}

/// Violation messages only, in rule order
pub fn validate_messages(value: &Value) -> Vec<String> {
    validate(value).into_iter().map(|v| v.message).collect()
}

fn push(violations: &mut Vec<Violation>, code: ViolationCode, message: &str) {
    violations.push(Violation::new(code, message));
}

/// JavaScript-style truthiness of an optional JSON field
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn is_integer(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(n)) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

fn mode_of(request: &Map<String, Value>) -> Option<&str> {
    request.get("mode").and_then(Value::as_str)
}

fn check_mode(request: &Map<String, Value>, _: &Validator, violations: &mut Vec<Violation>) {
    if !matches!(mode_of(request), Some("2d") | Some("3d")) {
        push(violations, ViolationCode::InvalidMode, r#"mode must be "2d" or "3d""#);
    }
}

fn check_slicing(request: &Map<String, Value>, _: &Validator, violations: &mut Vec<Violation>) {
    let z_slice = request.get("z_slice");
    let z_height = request.get("z_height");
    let has_z_slice = is_integer(z_slice);
    let has_z_height = matches!(z_height, Some(Value::Number(_)));

    match mode_of(request) {
        Some("2d") => {
            if !has_z_slice {
                push(violations, ViolationCode::ZSliceRequired, "z_slice is required for 2D mode");
            }
            if has_z_height {
                push(
                    violations,
                    ViolationCode::ZHeightForbidden,
                    "z_height must not be provided for 2D mode",
                );
            }
        }
        Some("3d") => {
            if has_z_slice {
                push(
                    violations,
                    ViolationCode::ZSliceForbidden,
                    "z_slice must not be provided for 3D mode",
                );
            }
            if is_present(z_height) && !has_z_height {
                push(
                    violations,
                    ViolationCode::ZHeightNotNumber,
                    "z_height must be a number when provided in 3D mode",
                );
            }
        }
        _ => {}
    }
}

fn check_color_range(request: &Map<String, Value>, validator: &Validator, violations: &mut Vec<Violation>) {
    let range = match request.get("color_range").and_then(Value::as_array) {
        Some(items) if items.len() == 2 => match (items[0].as_f64(), items[1].as_f64()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => {
                push(violations, ViolationCode::ColorRangeShape, "color_range must be a [min,max] array");
                return;
            }
        },
        _ => {
            push(violations, ViolationCode::ColorRangeShape, "color_range must be a [min,max] array");
            return;
        }
    };
    let (lo, hi) = range;

    if validator.strict_color_range && lo > hi {
        push(
            violations,
            ViolationCode::ColorRangeOrder,
            "color_range min must be <= color_range max",
        );
    }

    let Some(thresholds) = request.get("thresholds").filter(|t| is_truthy(Some(*t))) else {
        return;
    };
    let min = thresholds.get("min").filter(|v| !v.is_null());
    let max = thresholds.get("max").filter(|v| !v.is_null());
    let within = |bound: &Value| bound.as_f64().is_some_and(|b| lo <= b && b <= hi);

    if let Some(min) = min {
        if !within(min) {
            push(
                violations,
                ViolationCode::ThresholdMinOutOfRange,
                "thresholds.min must be within color_range",
            );
        }
    }
    if let Some(max) = max {
        if !within(max) {
            push(
                violations,
                ViolationCode::ThresholdMaxOutOfRange,
                "thresholds.max must be within color_range",
            );
        }
    }
    if let (Some(min), Some(max)) = (min.and_then(Value::as_f64), max.and_then(Value::as_f64)) {
        if min > max {
            push(
                violations,
                ViolationCode::ThresholdOrder,
                "thresholds.min must be <= thresholds.max",
            );
        }
    }
}

fn check_ap_selection(request: &Map<String, Value>, _: &Validator, violations: &mut Vec<Violation>) {
    let selection = request.get("ap_selection").filter(|s| is_truthy(Some(*s)));
    let selection_type = selection
        .and_then(|s| s.get("type"))
        .and_then(Value::as_str)
        .filter(|t| AP_SELECTION_TYPES.contains(t));
    let ap_ids = selection
        .and_then(|s| s.get("ap_ids"))
        .and_then(Value::as_array);

    match selection_type {
        None => push(
            violations,
            ViolationCode::ApSelectionType,
            r#"ap_selection.type must be "single" or "multi""#,
        ),
        Some("single") => {
            if ap_ids.is_some_and(|ids| ids.len() > 1) {
                push(
                    violations,
                    ViolationCode::SingleApTooMany,
                    "Single AP selection must not include more than one ap_id",
                );
            }
        }
        Some(_) => {
            if !ap_ids.is_some_and(|ids| ids.len() >= 2) {
                push(
                    violations,
                    ViolationCode::MultiApTooFew,
                    "Multi AP selection requires at least two ap_ids",
                );
            }
            let mode = request.get("multi_ap_mode").and_then(Value::as_str);
            if !mode.is_some_and(|m| MULTI_AP_MODES.contains(&m)) {
                push(
                    violations,
                    ViolationCode::MultiApModeMissing,
                    "multi_ap_mode required for multi selection (max_rssi | coverage | overlap_dB)",
                );
            }
        }
    }
}

fn check_units(request: &Map<String, Value>, _: &Validator, violations: &mut Vec<Violation>) {
    let units = request.get("units").filter(|u| is_truthy(Some(*u)));
    let complete = units.is_some_and(|u| {
        ["freq", "distance", "power", "gain"]
            .iter()
            .all(|field| is_truthy(u.get(*field)))
    });
    if !complete {
        push(
            violations,
            ViolationCode::UnitsIncomplete,
            "units with freq, distance, power, gain are required",
        );
    }
}

fn check_crs(request: &Map<String, Value>, _: &Validator, violations: &mut Vec<Violation>) {
    if !is_truthy(request.get("crs")) {
        push(violations, ViolationCode::CrsMissing, "crs is required");
    }
}

fn check_seed(request: &Map<String, Value>, _: &Validator, violations: &mut Vec<Violation>) {
    if !is_integer(request.get("seed")) {
        push(violations, ViolationCode::SeedNotInteger, "seed must be an integer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_2d() -> Value {
        json!({
            "mode": "2d",
            "z_slice": 0,
            "color_map": "Viridis",
            "color_range": [-90, -30],
            "thresholds": {"min": -85, "max": -45},
            "ap_selection": {"type": "single", "ap_ids": ["ap-1"]},
            "seed": 42,
            "crs": "EPSG:3857",
            "units": {"freq": "MHz", "distance": "m", "power": "dBm", "gain": "dBi"}
        })
    }

    fn codes(violations: &[Violation]) -> Vec<ViolationCode> {
        violations.iter().map(|v| v.code).collect()
    }

    #[test]
    fn test_valid_request_has_no_violations() {
        assert!(validate(&valid_2d()).is_empty());
    }

    #[test]
    fn test_non_object_input() {
        for input in [json!(null), json!([1, 2]), json!("2d"), json!(7)] {
            let violations = validate(&input);
            assert_eq!(codes(&violations), vec![ViolationCode::InvalidRequest]);
            assert_eq!(violations[0].message, "Invalid request");
        }
    }

    #[test]
    fn test_invalid_mode_does_not_short_circuit() {
        let mut request = valid_2d();
        request["mode"] = json!("4d");
        request["seed"] = json!(1.5);
        let violations = validate(&request);
        assert_eq!(
            codes(&violations),
            vec![ViolationCode::InvalidMode, ViolationCode::SeedNotInteger]
        );
    }

    #[test]
    fn test_integral_float_counts_as_integer() {
        let mut request = valid_2d();
        request["seed"] = json!(42.0);
        request["z_slice"] = json!(3.0);
        assert!(validate(&request).is_empty());
    }

    #[test]
    fn test_3d_rejects_non_numeric_height() {
        let mut request = valid_2d();
        request["mode"] = json!("3d");
        request.as_object_mut().unwrap().remove("z_slice");
        request["z_height"] = json!("tall");
        assert_eq!(codes(&validate(&request)), vec![ViolationCode::ZHeightNotNumber]);

        request["z_height"] = json!(null);
        assert!(validate(&request).is_empty());
    }

    #[test]
    fn test_threshold_order() {
        let mut request = valid_2d();
        request["thresholds"] = json!({"min": -40, "max": -60});
        assert_eq!(codes(&validate(&request)), vec![ViolationCode::ThresholdOrder]);
    }

    #[test]
    fn test_non_numeric_threshold_is_out_of_range() {
        let mut request = valid_2d();
        request["thresholds"] = json!({"min": "low"});
        assert_eq!(codes(&validate(&request)), vec![ViolationCode::ThresholdMinOutOfRange]);
    }

    #[test]
    fn test_color_range_shape() {
        let mut request = valid_2d();
        request["color_range"] = json!([-90]);
        assert_eq!(codes(&validate(&request)), vec![ViolationCode::ColorRangeShape]);
    }

    #[test]
    fn test_inverted_color_range_only_flagged_when_strict() {
        let mut request = valid_2d();
        request["color_range"] = json!([-30, -90]);
        request.as_object_mut().unwrap().remove("thresholds");
        assert!(Validator::new().validate(&request).is_empty());
        assert_eq!(
            codes(&Validator::strict().validate(&request)),
            vec![ViolationCode::ColorRangeOrder]
        );
    }

    #[test]
    fn test_single_selection_allows_no_ids() {
        let mut request = valid_2d();
        request["ap_selection"] = json!({"type": "single"});
        assert!(validate(&request).is_empty());
        request["ap_selection"] = json!({"type": "single", "ap_ids": ["a", "b"]});
        assert_eq!(codes(&validate(&request)), vec![ViolationCode::SingleApTooMany]);
    }

    #[test]
    fn test_units_require_every_field() {
        let mut request = valid_2d();
        request["units"]["gain"] = json!("");
        assert_eq!(codes(&validate(&request)), vec![ViolationCode::UnitsIncomplete]);
    }

    #[test]
    fn test_all_violations_are_collected_in_order() {
        let violations = validate(&json!({}));
        assert_eq!(
            codes(&violations),
            vec![
                ViolationCode::InvalidMode,
                ViolationCode::ColorRangeShape,
                ViolationCode::ApSelectionType,
                ViolationCode::UnitsIncomplete,
                ViolationCode::CrsMissing,
                ViolationCode::SeedNotInteger,
            ]
        );
    }

    #[test]
    fn test_typed_request_with_nan_height() {
        let request = ExportRequest {
            mode: Mode::ThreeD,
            z_slice: None,
            z_height: Some(f64::NAN),
            ..ExportRequest::default()
        };
        let violations = Validator::new().validate_request(&request);
        assert_eq!(codes(&violations), vec![ViolationCode::ZHeightNotNumber]);
    }

    #[test]
    fn test_ensure_valid() {
        assert!(Validator::new().ensure_valid(&ExportRequest::default()).is_ok());
        let request = ExportRequest {
            crs: String::new(),
            ..ExportRequest::default()
        };
        let err = Validator::new().ensure_valid(&request).unwrap_err();
        assert_eq!(err.messages(), vec!["crs is required".to_string()]);
    }
}
