use serde::Serialize;
use std::fmt;

/// Opaque user identifier handed to us by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgeBracket {
    #[serde(rename = "under_18")]
    Under18,
    #[serde(rename = "18_plus")]
    Adult,
}

/// A completed intake questionnaire. Only users holding one may search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub gender: Gender,
    pub age: AgeBracket,
}

impl Profile {
    pub fn new(gender: Gender, age: AgeBracket) -> Self {
        Self { gender, age }
    }

    /// Two users are matchable only on identical gender and age bracket.
    pub fn is_compatible(&self, other: &Profile) -> bool {
        self.gender == other.gender && self.age == other.age
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gender = match self.gender {
            Gender::Male => "male",
            Gender::Female => "female",
        };
        let age = match self.age {
            AgeBracket::Under18 => "under_18",
            AgeBracket::Adult => "18_plus",
        };
        write!(f, "{}/{}", gender, age)
    }
}
