use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
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
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(AppointmentType {
    Routine => "routine",
    FollowUp => "follow-up",
    Specialist => "specialist",
});

impl Default for AppointmentType {
    fn default() -> Self {
        Self::Routine
    }
}

impl AppointmentType {
    /// Upper-case badge label shown next to an appointment.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Routine => "ROUTINE",
            Self::FollowUp => "FOLLOW-UP",
            Self::Specialist => "SPECIALIST",
        }
    }

    /// Lenient parse for form and stored input: trimmed, case-insensitive,
    /// anything unrecognised is a routine visit.
    pub fn parse_lenient(s: &str) -> Self {
        s.trim().to_ascii_lowercase().parse().unwrap_or_default()
    }
}
