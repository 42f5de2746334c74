//! Member record.
//!
//! # Invariants
//! - `username` is non-blank and free of control characters.
//! - `age` is never negative.
//! - `team_id` is a non-owning reference; the team may be deleted
//!   independently and readers must tolerate a dangling id.

use crate::model::entity::{
    builtin_attribute, read_only_or_unknown, AttrKind, AttrValue, AttributeDef, Audit, Entity,
    EntityId, BUILTIN_ATTRIBUTES,
};
use crate::model::team::Team;
use crate::model::validation::{
    expect_int, expect_optional_int, expect_text, validate_label, validate_non_negative,
    ValidationError,
};
use serde::{Deserialize, Serialize};

pub const ATTR_USERNAME: &str = "username";
pub const ATTR_AGE: &str = "age";
pub const ATTR_TEAM_ID: &str = "team_id";

const MEMBER_SCHEMA: &[AttributeDef] = &[
    BUILTIN_ATTRIBUTES[0],
    BUILTIN_ATTRIBUTES[1],
    BUILTIN_ATTRIBUTES[2],
    AttributeDef::new(ATTR_USERNAME, AttrKind::Text),
    AttributeDef::new(ATTR_AGE, AttrKind::Int),
    AttributeDef::new(ATTR_TEAM_ID, AttrKind::Int).nullable(),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// `None` until the first save.
    pub id: Option<EntityId>,
    pub username: String,
    pub age: i64,
    pub team_id: Option<EntityId>,
    pub audit: Option<Audit>,
}

impl Member {
    /// Creates an unsaved member with age `0` and no team.
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_age(username, 0)
    }

    pub fn with_age(username: impl Into<String>, age: i64) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team_id: None,
            audit: None,
        }
    }

    /// Creates an unsaved member that already points at a team.
    pub fn in_team(username: impl Into<String>, age: i64, team_id: Option<EntityId>) -> Self {
        Self {
            team_id,
            ..Self::with_age(username, age)
        }
    }

    /// Points this member at `team`.
    ///
    /// The team must have been saved; only its id is kept.
    pub fn change_team(&mut self, team: &Team) -> Result<(), ValidationError> {
        let team_id = team.id.ok_or(ValidationError::UnsavedReference {
            entity: Self::ENTITY_NAME,
            field: ATTR_TEAM_ID,
        })?;
        self.team_id = Some(team_id);
        Ok(())
    }
}

impl Entity for Member {
    const ENTITY_NAME: &'static str = "member";

    fn schema() -> &'static [AttributeDef] {
        MEMBER_SCHEMA
    }

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn assign_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn audit(&self) -> Option<Audit> {
        self.audit
    }

    fn set_audit(&mut self, audit: Audit) {
        self.audit = Some(audit);
    }

    fn attribute(&self, name: &str) -> Option<AttrValue> {
        match name {
            ATTR_USERNAME => Some(AttrValue::Text(self.username.clone())),
            ATTR_AGE => Some(AttrValue::Int(self.age)),
            ATTR_TEAM_ID => Some(self.team_id.into()),
            other => builtin_attribute(self.id, self.audit, other),
        }
    }

    fn set_attribute(&mut self, name: &str, value: AttrValue) -> Result<(), ValidationError> {
        match name {
            ATTR_USERNAME => self.username = expect_text(Self::ENTITY_NAME, ATTR_USERNAME, value)?,
            ATTR_AGE => self.age = expect_int(Self::ENTITY_NAME, ATTR_AGE, value)?,
            ATTR_TEAM_ID => {
                self.team_id = expect_optional_int(Self::ENTITY_NAME, ATTR_TEAM_ID, value)?
            }
            other => return Err(read_only_or_unknown::<Self>(other)),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_label(Self::ENTITY_NAME, ATTR_USERNAME, &self.username)?;
        validate_non_negative(Self::ENTITY_NAME, ATTR_AGE, self.age)
    }
}
