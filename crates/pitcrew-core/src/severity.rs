use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::warn;

/// Canonical severity scale, totally ordered by ordinal.
///
/// Every analyzer's native vocabulary is mapped onto this scale before a
/// finding leaves its adapter. Comparisons are by ordinal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 5] = [
        Severity::Informational,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    /// Position on the scale, `Informational = 0` through `Critical = 4`.
    pub fn ordinal(self) -> u8 {
        match self {
            Severity::Informational => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    /// True iff `self >= floor`.
    pub fn at_least(self, floor: Severity) -> bool {
        self >= floor
    }

    /// Lenient parse for analyzer-native vocabularies.
    ///
    /// Case-insensitive; unknown input falls back to `Low` with a warning
    /// rather than dropping the finding on the floor.
    pub fn parse(input: &str) -> Severity {
        match Severity::try_parse(input) {
            Some(sev) => sev,
            None => {
                warn!(input, "unknown severity, defaulting to Low");
                Severity::Low
            }
        }
    }

    /// Strict case-insensitive parse; `None` on unknown input.
    pub fn try_parse(input: &str) -> Option<Severity> {
        match input.trim().to_ascii_lowercase().as_str() {
            "informational" | "info" => Some(Severity::Informational),
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Canonical display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Informational => "Informational",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Manifest deserialization is strict: an unknown severity name is a schema
// violation, not a silent Low.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Severity::try_parse(&raw).ok_or_else(|| {
            de::Error::custom(format!(
                "invalid severity '{raw}' (expected one of Informational, Low, Medium, High, Critical)"
            ))
        })
    }
}
