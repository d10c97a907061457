//! System-wide default constants.
//!
//! Centralises names and magic numbers shared by the config layer, the
//! dataset loader and the CLI. Grouped by subsystem for easy discovery.

// ============================================================================
// Config discovery
// ============================================================================

/// Environment variable holding an explicit config file path.
pub const CONFIG_ENV_VAR: &str = "PIPEGUARD_CONFIG";

/// Config file picked up from the working directory when present.
pub const LOCAL_CONFIG_FILE: &str = "pipeguard.toml";

// ============================================================================
// Model artifacts
// ============================================================================

/// Directory searched for model artifacts.
pub const MODEL_DIR: &str = "models";

/// Leak/no-leak classifier artifact (required for inference).
pub const CLASSIFIER_FILE: &str = "leak_detector.json";

/// Leak-location regressor artifact (optional).
pub const REGRESSOR_FILE: &str = "leak_locator.json";

/// Artifact format version written by [`crate::models::ModelStore`].
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// Inference
// ============================================================================

/// Probability above which a row is labelled a leak.
///
/// Strictly greater: a 50/50 vote resolves to no-leak, matching argmax over
/// `[p_no_leak, p_leak]` with ties going to the first class.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Fewest acoustic sensors the centroid estimator will work from.
pub const MIN_ACOUSTIC_SENSORS: usize = 2;

// ============================================================================
// Physics screening
// ============================================================================

/// Peak acoustic amplitude (V) above which the screening rule can fire.
pub const SCREEN_ACOUSTIC_THRESHOLD_V: f64 = 0.2;

/// Local pressure drop must exceed this multiple of the baseline drop.
pub const SCREEN_PRESSURE_DROP_FACTOR: f64 = 2.0;

// ============================================================================
// Dataset columns
// ============================================================================

/// Pressure sensor column prefix.
pub const PRESSURE_PREFIX: &str = "P_";

/// Acoustic sensor column prefix.
pub const ACOUSTIC_PREFIX: &str = "A_";

/// Pressure first-difference feature prefix.
pub const PRESSURE_DIFF_PREFIX: &str = "dP_";

/// Acoustic first-difference feature prefix.
pub const ACOUSTIC_DIFF_PREFIX: &str = "dA_";

/// Opaque run identifier column.
pub const RUN_ID_COLUMN: &str = "Run_ID";

/// Ground-truth leak label column.
pub const LABEL_COLUMN: &str = "LeakLabel";

/// Ground-truth leak position column (meters).
pub const LOCATION_COLUMN: &str = "Leak_Location";

/// Label spellings that mean "leak" (compared trimmed, lowercase).
pub const POSITIVE_LABELS: [&str; 4] = ["leak", "yes", "true", "1"];
