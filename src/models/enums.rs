use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// Macro to generate enum with as_str + std::str::FromStr + SQL column pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
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

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: DatabaseError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

str_enum!(Role {
    Doctor => "doctor",
    Receptionist => "receptionist",
    Pharmacist => "pharmacist",
    LabTechnician => "lab_technician",
});

impl Role {
    /// Human-readable label used in account listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Doctor => "Doctor",
            Self::Receptionist => "Receptionist",
            Self::Pharmacist => "Pharmacist",
            Self::LabTechnician => "Lab Technician",
        }
    }
}

str_enum!(Gender {
    Male => "M",
    Female => "F",
    Other => "O",
});

impl Default for Gender {
    fn default() -> Self {
        Self::Other
    }
}

str_enum!(AppointmentStatus {
    Scheduled => "SCHEDULED",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

str_enum!(BillType {
    Lab => "LAB",
    Pharmacy => "PHARMACY",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), *role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = Role::from_str("surgeon").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn role_serializes_as_wire_string() {
        let json = serde_json::to_string(&Role::LabTechnician).unwrap();
        assert_eq!(json, "\"lab_technician\"");
        let back: Role = serde_json::from_str("\"doctor\"").unwrap();
        assert_eq!(back, Role::Doctor);
    }

    #[test]
    fn role_display_names() {
        assert_eq!(Role::Doctor.display_name(), "Doctor");
        assert_eq!(Role::LabTechnician.display_name(), "Lab Technician");
    }

    #[test]
    fn gender_defaults_to_other() {
        assert_eq!(Gender::default(), Gender::Other);
        assert_eq!(Gender::default().as_str(), "O");
    }

    #[test]
    fn status_uses_upper_case() {
        assert_eq!(AppointmentStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(BillType::Pharmacy.as_str(), "PHARMACY");
    }
}
