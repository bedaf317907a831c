//! Core data types for coverage exports

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Visualization mode. Selects which slicing field is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TwoD => "2d",
            Self::ThreeD => "3d",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named color scale. Unknown names are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorMap {
    Viridis,
    Plasma,
    Cividis,
    Jet,
    Hot,
    Other(String),
}

impl ColorMap {
    /// Palettes offered by the controls
    pub const PALETTE: [ColorMap; 5] = [
        ColorMap::Viridis,
        ColorMap::Plasma,
        ColorMap::Cividis,
        ColorMap::Jet,
        ColorMap::Hot,
    ];

    pub fn name(&self) -> &str {
        match self {
            Self::Viridis => "Viridis",
            Self::Plasma => "Plasma",
            Self::Cividis => "Cividis",
            Self::Jet => "Jet",
            Self::Hot => "Hot",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ColorMap {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Viridis" => Self::Viridis,
            "Plasma" => Self::Plasma,
            "Cividis" => Self::Cividis,
            "Jet" => Self::Jet,
            "Hot" => Self::Hot,
            _ => Self::Other(value),
        }
    }
}

impl From<ColorMap> for String {
    fn from(value: ColorMap) -> Self {
        match value {
            ColorMap::Other(name) => name,
            known => known.name().to_string(),
        }
    }
}

/// Optional clamp bounds, each expected to lie within `color_range`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApSelectionType {
    Single,
    Multi,
}

/// Access points contributing to the view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApSelection {
    #[serde(rename = "type")]
    pub selection_type: ApSelectionType,
    #[serde(default)]
    pub ap_ids: Vec<String>,
}

impl ApSelection {
    pub fn single(ap_id: impl Into<String>) -> Self {
        Self {
            selection_type: ApSelectionType::Single,
            ap_ids: vec![ap_id.into()],
        }
    }

    pub fn multi<I, S>(ap_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selection_type: ApSelectionType::Multi,
            ap_ids: ap_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// How several access points are combined into one surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultiApMode {
    #[serde(rename = "max_rssi")]
    MaxRssi,
    #[serde(rename = "coverage")]
    Coverage,
    #[serde(rename = "overlap_dB")]
    OverlapDb,
}

impl MultiApMode {
    pub const ALL: [MultiApMode; 3] = [Self::MaxRssi, Self::Coverage, Self::OverlapDb];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxRssi => "max_rssi",
            Self::Coverage => "coverage",
            Self::OverlapDb => "overlap_dB",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlays {
    #[serde(default)]
    pub kriging_variance: bool,
}

/// Unit names for each physical quantity. Presence is validated, values are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Units {
    pub freq: String,
    pub distance: String,
    pub power: String,
    pub gain: String,
}

/// Units selectable for each field
pub const FREQ_UNITS: &[&str] = &["Hz", "MHz"];
pub const DISTANCE_UNITS: &[&str] = &["m"];
pub const POWER_UNITS: &[&str] = &["dBm"];
pub const GAIN_UNITS: &[&str] = &["dBi"];

/// One-line description of a unit set, e.g. `freq: MHz, distance: m, power: dBm, gain: dBi`
pub fn describe_units(units: &Units) -> String {
    format!(
        "freq: {}, distance: {}, power: {}, gain: {}",
        units.freq, units.distance, units.power, units.gain
    )
}

impl Units {
    /// `true` when every unit is one the controls offer
    pub fn is_standard(&self) -> bool {
        FREQ_UNITS.contains(&self.freq.as_str())
            && DISTANCE_UNITS.contains(&self.distance.as_str())
            && POWER_UNITS.contains(&self.power.as_str())
            && GAIN_UNITS.contains(&self.gain.as_str())
    }
}

impl Default for Units {
    fn default() -> Self {
        Self {
            freq: "MHz".to_string(),
            distance: "m".to_string(),
            power: "dBm".to_string(),
            gain: "dBi".to_string(),
        }
    }
}

/// Backend identifiers. Opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRefs {
    #[serde(default)]
    pub grid_ids: Vec<String>,
    #[serde(default)]
    pub mask_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Downsampling {
    #[serde(default)]
    pub factor: f64,
}

/// A fully specified visualization export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_slice: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_height: Option<f64>,
    pub color_map: ColorMap,
    pub color_range: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    pub ap_selection: ApSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_ap_mode: Option<MultiApMode>,
    #[serde(default)]
    pub overlays: Overlays,
    pub seed: i64,
    pub crs: String,
    pub units: Units,
    #[serde(default)]
    pub data_refs: DataRefs,
    #[serde(default)]
    pub downsampling: Downsampling,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            mode: Mode::TwoD,
            z_slice: Some(0),
            z_height: None,
            color_map: ColorMap::Viridis,
            color_range: [-90.0, -30.0],
            thresholds: Some(Thresholds {
                min: Some(-85.0),
                max: Some(-45.0),
            }),
            ap_selection: ApSelection::single("ap-1"),
            multi_ap_mode: None,
            overlays: Overlays::default(),
            seed: 42,
            crs: "EPSG:3857".to_string(),
            units: Units::default(),
            data_refs: DataRefs {
                grid_ids: vec!["grid-1".to_string()],
                mask_ids: Vec::new(),
                variance_id: None,
            },
            downsampling: Downsampling::default(),
        }
    }
}

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Png,
    Html,
}

impl ExportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Html => "html",
        }
    }

    /// Upper-case label used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Html => "HTML",
        }
    }

    /// Service path for this export kind
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Self::Png => "/api/v1/export/png",
            Self::Html => "/api/v1/export/html",
        }
    }

    /// Name of the response field holding the artifact path
    pub fn artifact_field(&self) -> &'static str {
        match self {
            Self::Png => "png_path",
            Self::Html => "html_path",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 32-bit reproducibility fingerprint, rendered as 8 lowercase hex digits.
///
/// Not a cryptographic digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfigHash(pub u32);

impl ConfigHash {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.to_be_bytes()))
    }
}

impl FromStr for ConfigHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 4];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(u32::from_be_bytes(bytes)))
    }
}

impl TryFrom<String> for ConfigHash {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConfigHash> for String {
    fn from(value: ConfigHash) -> Self {
        value.to_string()
    }
}

/// Seed and fingerprint attached to every outbound export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReproducibilitySidecar {
    pub seed: i64,
    pub config_hash: ConfigHash,
}

/// Client-side render measurements forwarded for server logging. Never validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_mem_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downsampling_factor: Option<f64>,
}

impl PerformanceSidecar {
    pub fn with_render_ms(render_ms: f64) -> Self {
        Self {
            render_ms: Some(render_ms),
            ..Self::default()
        }
    }
}

/// Request body actually sent to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRequest {
    #[serde(flatten)]
    pub request: ExportRequest,
    pub reproducibility: ReproducibilitySidecar,
    pub performance: PerformanceSidecar,
}

/// Server-side measurements reported with an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_ms: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Successful export response plus the measured client round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_path: Option<String>,
    pub json_sidecar_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ExportMetrics>,
    #[serde(default)]
    pub client_timing_ms: u64,
    /// Fields the service returned beyond the documented ones
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExportResult {
    /// Path of the rendered artifact for the given kind
    pub fn artifact_path(&self, kind: ExportKind) -> Option<&str> {
        match kind {
            ExportKind::Png => self.png_path.as_deref(),
            ExportKind::Html => self.html_path.as_deref(),
        }
    }

    pub fn server_render_ms(&self) -> Option<f64> {
        self.metrics.as_ref().and_then(|m| m.render_ms)
    }
}
