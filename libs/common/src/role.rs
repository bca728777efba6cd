use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Platform role of a user.
///
/// The backend speaks `etudiant` / `enseignant` / `admin`; the English names
/// are accepted as well. Parsing ignores case and surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Admin];

    /// English name, used in logs and route paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }

    /// Name the backend uses on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::Student => "etudiant",
            Role::Teacher => "enseignant",
            Role::Admin => "admin",
        }
    }

    /// Default dashboard for this role.
    pub fn home_path(self) -> &'static str {
        match self {
            Role::Student => "/student",
            Role::Teacher => "/teacher",
            Role::Admin => "/admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role `{}`", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "etudiant" | "student" => Ok(Role::Student),
            "enseignant" | "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_and_english_names() {
        assert_eq!("etudiant".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!("enseignant".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn parsing_normalizes_case_and_whitespace() {
        assert_eq!(" Enseignant ".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = "janitor".parse::<Role>().unwrap_err();
        assert_eq!(err, UnknownRole("janitor".to_string()));
        assert!(serde_json::from_str::<Role>("\"janitor\"").is_err());
    }

    #[test]
    fn serializes_with_wire_name() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"enseignant\"");
        let back: Role = serde_json::from_str("\"enseignant\"").unwrap();
        assert_eq!(back, Role::Teacher);
    }

    #[test]
    fn home_paths_are_distinct() {
        assert_eq!(Role::Student.home_path(), "/student");
        assert_eq!(Role::Teacher.home_path(), "/teacher");
        assert_eq!(Role::Admin.home_path(), "/admin");
    }
}
