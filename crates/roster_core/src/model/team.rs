//! Team record: a named group referenced by members.

use crate::model::entity::{
    builtin_attribute, read_only_or_unknown, AttrKind, AttrValue, AttributeDef, Audit, Entity,
    EntityId, BUILTIN_ATTRIBUTES,
};
use crate::model::validation::{expect_text, validate_label, ValidationError};
use serde::{Deserialize, Serialize};

pub const ATTR_NAME: &str = "name";

const TEAM_SCHEMA: &[AttributeDef] = &[
    BUILTIN_ATTRIBUTES[0],
    BUILTIN_ATTRIBUTES[1],
    BUILTIN_ATTRIBUTES[2],
    AttributeDef::new(ATTR_NAME, AttrKind::Text),
];

/// Named group. Members point at a team; a team never owns its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Option<EntityId>,
    pub name: String,
    pub audit: Option<Audit>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            audit: None,
        }
    }
}

impl Entity for Team {
    const ENTITY_NAME: &'static str = "team";

    fn schema() -> &'static [AttributeDef] {
        TEAM_SCHEMA
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
            ATTR_NAME => Some(AttrValue::Text(self.name.clone())),
            other => builtin_attribute(self.id, self.audit, other),
        }
    }

    fn set_attribute(&mut self, name: &str, value: AttrValue) -> Result<(), ValidationError> {
        match name {
            ATTR_NAME => self.name = expect_text(Self::ENTITY_NAME, ATTR_NAME, value)?,
            other => return Err(read_only_or_unknown::<Self>(other)),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_label(Self::ENTITY_NAME, ATTR_NAME, &self.name)
    }
}
