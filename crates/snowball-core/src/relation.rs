//! Fixed relation table
//!
//! Each relation has a numeric id (the CLI selector), a display name, the
//! internal label the oracle predicts, and the entity labels allowed on
//! either side.

use serde::{Deserialize, Serialize};

use crate::EntityLabel;

const PERSON: &[EntityLabel] = &[EntityLabel::Person];
const ORGANIZATION: &[EntityLabel] = &[EntityLabel::Organization];
const RESIDENCE: &[EntityLabel] = &[
    EntityLabel::Location,
    EntityLabel::City,
    EntityLabel::StateOrProvince,
    EntityLabel::Country,
];

/// Relations the system can extract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// PERSON -> ORGANIZATION
    #[serde(rename = "per:schools_attended")]
    SchoolsAttended,
    /// PERSON -> ORGANIZATION
    #[serde(rename = "per:employee_of")]
    WorkFor,
    /// PERSON -> LOCATION/CITY/STATE_OR_PROVINCE/COUNTRY
    #[serde(rename = "per:cities_of_residence")]
    LiveIn,
    /// ORGANIZATION -> PERSON
    #[serde(rename = "org:top_members/employees")]
    TopMemberEmployees,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Self::SchoolsAttended,
        Self::WorkFor,
        Self::LiveIn,
        Self::TopMemberEmployees,
    ];

    /// Look up a relation by its CLI id (1-4)
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::SchoolsAttended),
            2 => Some(Self::WorkFor),
            3 => Some(Self::LiveIn),
            4 => Some(Self::TopMemberEmployees),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::SchoolsAttended => 1,
            Self::WorkFor => 2,
            Self::LiveIn => 3,
            Self::TopMemberEmployees => 4,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SchoolsAttended => "Schools_Attended",
            Self::WorkFor => "Work_For",
            Self::LiveIn => "Live_In",
            Self::TopMemberEmployees => "Top_Member_Employees",
        }
    }

    /// Internal relation label, as predicted by the oracle
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchoolsAttended => "per:schools_attended",
            Self::WorkFor => "per:employee_of",
            Self::LiveIn => "per:cities_of_residence",
            Self::TopMemberEmployees => "org:top_members/employees",
        }
    }

    pub fn subject_labels(&self) -> &'static [EntityLabel] {
        match self {
            Self::SchoolsAttended | Self::WorkFor | Self::LiveIn => PERSON,
            Self::TopMemberEmployees => ORGANIZATION,
        }
    }

    pub fn object_labels(&self) -> &'static [EntityLabel] {
        match self {
            Self::SchoolsAttended | Self::WorkFor => ORGANIZATION,
            Self::LiveIn => RESIDENCE,
            Self::TopMemberEmployees => PERSON,
        }
    }

    pub fn is_subject(&self, label: EntityLabel) -> bool {
        self.subject_labels().contains(&label)
    }

    pub fn is_object(&self, label: EntityLabel) -> bool {
        self.object_labels().contains(&label)
    }

    /// Whether an entity with this label can take part in any pair
    pub fn is_of_interest(&self, label: EntityLabel) -> bool {
        self.is_subject(label) || self.is_object(label)
    }

    /// Case-insensitive match against an oracle label
    pub fn matches(&self, predicted: &str) -> bool {
        predicted.to_lowercase() == self.as_str().to_lowercase()
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
