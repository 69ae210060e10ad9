use serde::{Deserialize, Serialize};

/// Error returned when a label does not match any variant of a label enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {field} label: '{value}'")]
pub struct ParseLabelError {
    pub field: String,
    pub value: String,
}

/// Macro to generate a label enum with as_str + Display + std::str::FromStr.
///
/// Labels serialize as their human-readable form ("Vessel Certificate"), which
/// is also the vocabulary the inference service is asked to answer with.
/// Parsing is case-insensitive and ignores surrounding whitespace.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::all()
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| ParseLabelError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    })
            }
        }
    };
}

label_enum!(
    /// Top-level classification bucket. `Uncertain` is only produced when the
    /// model's answer cannot be mapped onto the taxonomy.
    PrimaryCategory {
        VesselCertificate => "Vessel Certificate",
        CrewDocument => "Crew Document",
        SurveyReport => "Survey Report",
        CommercialDocument => "Commercial Document",
        OperationalRecord => "Operational Record",
        Correspondence => "Correspondence",
        Uncertain => "Uncertain",
    }
);

label_enum!(
    /// Sub-classification, only meaningful under `PrimaryCategory::VesselCertificate`.
    SecondaryCategory {
        SafetyCertificate => "Safety Certificate",
        PollutionPreventionCertificate => "Pollution Prevention Certificate",
        LoadLineTonnageCertificate => "Load Line & Tonnage Certificate",
        ClassificationCertificate => "Classification Certificate",
        RegistrationCertificate => "Registration Certificate",
    }
);

label_enum!(Confidence {
    High => "High",
    Medium => "Medium",
    Low => "Low",
});

impl PrimaryCategory {
    /// The six taxonomy categories, excluding the `Uncertain` fallback.
    pub fn taxonomy() -> impl Iterator<Item = PrimaryCategory> {
        Self::all().iter().copied().filter(|c| *c != Self::Uncertain)
    }

    pub fn accepts_secondary(&self) -> bool {
        matches!(self, Self::VesselCertificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn primary_parses_case_insensitively() {
        assert_eq!(
            PrimaryCategory::from_str("  vessel certificate "),
            Ok(PrimaryCategory::VesselCertificate)
        );
        assert_eq!(
            PrimaryCategory::from_str("CREW DOCUMENT"),
            Ok(PrimaryCategory::CrewDocument)
        );
    }

    #[test]
    fn unknown_label_reports_field() {
        let err = SecondaryCategory::from_str("Fishing Licence").unwrap_err();
        assert_eq!(err.field, "SecondaryCategory");
        assert_eq!(err.value, "Fishing Licence");
    }

    #[test]
    fn taxonomy_excludes_uncertain() {
        let cats: Vec<_> = PrimaryCategory::taxonomy().collect();
        assert_eq!(cats.len(), 6);
        assert!(!cats.contains(&PrimaryCategory::Uncertain));
    }

    #[test]
    fn serializes_as_display_label() {
        let json = serde_json::to_string(&SecondaryCategory::LoadLineTonnageCertificate).unwrap();
        assert_eq!(json, "\"Load Line & Tonnage Certificate\"");
        let back: Confidence = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(back, Confidence::Medium);
    }

    #[test]
    fn only_certificates_accept_secondary() {
        for cat in PrimaryCategory::all() {
            assert_eq!(
                cat.accepts_secondary(),
                *cat == PrimaryCategory::VesselCertificate
            );
        }
    }
}
