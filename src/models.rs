use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{LibError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct PersonId(pub Uuid);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PersonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for PersonId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct FamilyTreeId(pub Uuid);

impl fmt::Display for FamilyTreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FamilyTreeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

/// Account identity of a signed-in user, distinct from the person node they claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

/// Whether a person node has been claimed by a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    None,
    Pending,
    Active,
}

impl AccountStatus {
    pub const fn is_active(self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonAttributes {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_blood_related: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<UserId>,
    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default)]
    pub metadata: Value,
}

impl PersonAttributes {
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            birth_date: None,
            death_date: None,
            bio: None,
            is_blood_related: true,
            owner_user_id: None,
            account_status: AccountStatus::None,
            metadata: json!({}),
        }
    }
}

/// A single person record in a snapshot. Relatives are id references into the same snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    #[serde(default)]
    pub gender: Gender,
    pub attributes: PersonAttributes,
    #[serde(default)]
    pub parents: Vec<PersonId>,
    #[serde(default)]
    pub children: Vec<PersonId>,
    #[serde(default)]
    pub spouses: Vec<PersonId>,
    #[serde(default)]
    pub siblings: Vec<PersonId>,
}

impl Person {
    pub fn new(id: PersonId, gender: Gender, attributes: PersonAttributes) -> Self {
        Self {
            id,
            gender,
            attributes,
            parents: Vec::new(),
            children: Vec::new(),
            spouses: Vec::new(),
            siblings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Parent,
    Spouse,
    Child,
    Sibling,
}

impl RelationType {
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationType::Parent => "parent",
            RelationType::Spouse => "spouse",
            RelationType::Child => "child",
            RelationType::Sibling => "sibling",
        }
    }
}

/// Collateral links applied when adding a relative. Each flag only matters for one relation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionOptions {
    /// Spouse addition: the new spouse also becomes a parent of the selected node's children.
    pub connect_to_children: bool,
    /// Child addition: the new child also becomes a child of the selected node's spouse.
    pub connect_to_spouse: bool,
    /// Parent addition: the new parent also becomes a spouse of the existing parent.
    pub connect_to_existing_parent: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            connect_to_children: true,
            connect_to_spouse: true,
            connect_to_existing_parent: true,
        }
    }
}

impl ConnectionOptions {
    pub const fn none() -> Self {
        Self {
            connect_to_children: false,
            connect_to_spouse: false,
            connect_to_existing_parent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Degree {
    pub parents: usize,
    pub children: usize,
    pub spouses: usize,
}

/// Core attributes for a person that does not exist yet.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMemberDraft {
    pub display_name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_blood_related: Option<bool>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl NewMemberDraft {
    pub fn named(display_name: impl Into<String>, gender: Gender) -> Self {
        Self {
            display_name: display_name.into(),
            gender,
            birth_date: None,
            death_date: None,
            bio: None,
            is_blood_related: None,
            metadata: None,
        }
    }

    /// Spouses default to not blood related; every other relation defaults to blood related.
    pub fn normalize(self, relation: RelationType) -> Result<PersonAttributes> {
        let display_name = self.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(LibError::invalid(
                "Display name is required",
                anyhow!("new {} had empty display name", relation.as_str()),
            ));
        }
        if let (Some(born), Some(died)) = (self.birth_date, self.death_date) {
            if died < born {
                return Err(LibError::invalid(
                    "Date of death cannot precede date of birth",
                    anyhow!("born {born}, died {died}"),
                ));
            }
        }

        Ok(PersonAttributes {
            display_name,
            birth_date: self.birth_date,
            death_date: self.death_date,
            bio: self.bio.filter(|bio| !bio.trim().is_empty()),
            is_blood_related: self
                .is_blood_related
                .unwrap_or(relation != RelationType::Spouse),
            owner_user_id: None,
            account_status: AccountStatus::None,
            metadata: self.metadata.unwrap_or_else(|| json!({})),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberPayload {
    pub family_tree_id: FamilyTreeId,
    pub selected_node_id: PersonId,
    pub relation_type: RelationType,
    pub member: NewMemberDraft,
    #[serde(default)]
    pub options: ConnectionOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMemberPayload {
    pub member_id: PersonId,
    pub family_tree_id: FamilyTreeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCreated {
    pub member_id: PersonId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KinshipViolation {
    DuplicatePersonId {
        person_id: PersonId,
    },
    UnknownRelative {
        person_id: PersonId,
        missing_id: PersonId,
    },
    SelfReference {
        person_id: PersonId,
    },
    DuplicateRelative {
        person_id: PersonId,
        relative_id: PersonId,
    },
    AsymmetricParentChild {
        parent_id: PersonId,
        child_id: PersonId,
    },
    AsymmetricSpouse {
        person_id: PersonId,
        spouse_id: PersonId,
    },
    TooManyParents {
        person_id: PersonId,
        parent_count: usize,
    },
}

impl KinshipViolation {
    pub const fn error_code(&self) -> &'static str {
        match self {
            KinshipViolation::DuplicatePersonId { .. } => "kinship_duplicate_person",
            KinshipViolation::UnknownRelative { .. } => "kinship_unknown_relative",
            KinshipViolation::SelfReference { .. } => "kinship_self_reference",
            KinshipViolation::DuplicateRelative { .. } => "kinship_duplicate_relative",
            KinshipViolation::AsymmetricParentChild { .. } => "kinship_asymmetric_parent_child",
            KinshipViolation::AsymmetricSpouse { .. } => "kinship_asymmetric_spouse",
            KinshipViolation::TooManyParents { .. } => "kinship_too_many_parents",
        }
    }

    pub const fn public_message(&self) -> &'static str {
        match self {
            KinshipViolation::DuplicatePersonId { .. } => "Person IDs must be unique within a tree",
            KinshipViolation::UnknownRelative { .. } => {
                "Relationship references a person that does not exist"
            }
            KinshipViolation::SelfReference { .. } => "A person cannot be their own relative",
            KinshipViolation::DuplicateRelative { .. } => "Relationship is listed more than once",
            KinshipViolation::AsymmetricParentChild { .. } => {
                "Parent and child links must point at each other"
            }
            KinshipViolation::AsymmetricSpouse { .. } => "Spouse links must point at each other",
            KinshipViolation::TooManyParents { .. } => "A person can have at most two parents",
        }
    }
}
