use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Kind of relationship an edge records between two people.
///
/// Only [`Relationship::Child`] is directed. Strings outside the known taxonomy are kept
/// verbatim in [`Relationship::Other`] so newer snapshots still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Relationship {
    Married,
    Child,
    Separated,
    Cohabitation,
    Distant,
    Friend,
    Hostile,
    Abuse,
    Other(String),
}

impl Relationship {
    pub const KNOWN: [Relationship; 8] = [
        Relationship::Married,
        Relationship::Child,
        Relationship::Separated,
        Relationship::Cohabitation,
        Relationship::Distant,
        Relationship::Friend,
        Relationship::Hostile,
        Relationship::Abuse,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Relationship::Married => "married",
            Relationship::Child => "child",
            Relationship::Separated => "separated",
            Relationship::Cohabitation => "cohabitation",
            Relationship::Distant => "distant",
            Relationship::Friend => "friend",
            Relationship::Hostile => "hostile",
            Relationship::Abuse => "abuse",
            Relationship::Other(raw) => raw,
        }
    }

    pub fn is_directed(&self) -> bool {
        matches!(self, Relationship::Child)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Relationship::Other(_))
    }
}

impl FromStr for Relationship {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let relationship = match raw.trim().to_ascii_lowercase().as_str() {
            "married" => Relationship::Married,
            "child" => Relationship::Child,
            "separated" => Relationship::Separated,
            // older saves carry the misspelled token
            "cohabitation" | "cohabatiation" => Relationship::Cohabitation,
            "distant" => Relationship::Distant,
            "friend" => Relationship::Friend,
            "hostile" => Relationship::Hostile,
            "abuse" => Relationship::Abuse,
            _ => Relationship::Other(raw.to_string()),
        };
        Ok(relationship)
    }
}

impl From<String> for Relationship {
    fn from(raw: String) -> Self {
        match raw.parse() {
            Ok(relationship) => relationship,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Relationship {
    fn from(raw: &str) -> Self {
        Relationship::from(raw.to_string())
    }
}

impl From<Relationship> for String {
    fn from(relationship: Relationship) -> Self {
        relationship.as_str().to_string()
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_child_is_directed() {
        for relationship in Relationship::KNOWN {
            assert_eq!(
                relationship.is_directed(),
                relationship == Relationship::Child,
                "{relationship}"
            );
        }
        assert!(!Relationship::from("godparent").is_directed());
    }

    #[test]
    fn parses_legacy_cohabitation_spelling() {
        assert_eq!(Relationship::from("cohabatiation"), Relationship::Cohabitation);
        assert_eq!(Relationship::from("Married"), Relationship::Married);
    }

    #[test]
    fn unknown_kinds_keep_their_text() {
        let relationship = Relationship::from("Godparent");
        assert_eq!(relationship, Relationship::Other("Godparent".to_string()));
        assert_eq!(relationship.to_string(), "Godparent");
        assert!(!relationship.is_known());
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Relationship::Hostile).unwrap();
        assert_eq!(json, "\"hostile\"");
        let back: Relationship = serde_json::from_str("\"child\"").unwrap();
        assert_eq!(back, Relationship::Child);
    }
}
