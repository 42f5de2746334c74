//! Read-only projections returned by `RosterService`.

use crate::model::entity::EntityId;
use crate::model::member::Member;
use crate::model::team::Team;
use serde::Serialize;

/// How much of a member's surroundings a lookup resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fetch {
    /// Member row only; `MemberView::team` stays `None`.
    #[default]
    MemberOnly,
    /// Resolve the referenced team in the same call.
    WithTeam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberView {
    pub member: Member,
    /// `None` when not fetched, when the member has no team, or when the
    /// referenced team no longer exists.
    pub team: Option<Team>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDto {
    pub id: EntityId,
    pub username: String,
    pub team_name: String,
}
