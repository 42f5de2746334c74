//! Roster use-case service.
//!
//! # Responsibility
//! - Register members and teams and move members between teams.
//! - Provide the named member lookups, projections and paging used by
//!   callers, built on structured predicates.
//!
//! # Invariants
//! - A member is only written with a `team_id` that exists at write time.
//! - Paging by age defaults to `username` descending when no sort is given.

use crate::model::entity::{AttrValue, EntityId};
use crate::model::member::{Member, ATTR_AGE, ATTR_TEAM_ID, ATTR_USERNAME};
use crate::model::team::Team;
use crate::query::{Mutation, Page, PageRequest, Predicate, Query, Sort};
use crate::repo::{RepoError, RepoResult, Repository};
use crate::service::read_model::{Fetch, MemberDto, MemberView};
use crate::store::memory::MemoryRecordStore;
use crate::store::sqlite::SqliteRecordStore;
use crate::store::RecordStore;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

/// Roster facade over a member repository and a team repository.
pub struct RosterService<MS, TS>
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    members: Repository<Member, MS>,
    teams: Repository<Team, TS>,
}

impl RosterService<MemoryRecordStore<Member>, MemoryRecordStore<Team>> {
    /// Roster backed by two fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Repository::new(Arc::new(MemoryRecordStore::new())),
            Repository::new(Arc::new(MemoryRecordStore::new())),
        )
    }
}

impl RosterService<SqliteRecordStore, SqliteRecordStore> {
    /// Roster whose members and teams share one SQLite store.
    pub fn with_sqlite(store: Arc<SqliteRecordStore>) -> Self {
        Self::new(Repository::new(Arc::clone(&store)), Repository::new(store))
    }
}

impl<MS, TS> RosterService<MS, TS>
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    pub fn new(members: Repository<Member, MS>, teams: Repository<Team, TS>) -> Self {
        Self { members, teams }
    }

    pub fn members(&self) -> &Repository<Member, MS> {
        &self.members
    }

    pub fn teams(&self) -> &Repository<Team, TS> {
        &self.teams
    }

    pub fn create_team(&self, name: impl Into<String>) -> RepoResult<Team> {
        let team = self.teams.save(Team::new(name))?;
        info!(
            "event=team_create module=service status=ok team_id={}",
            team.id.unwrap_or_default()
        );
        Ok(team)
    }

    /// Registers a member, optionally in an existing team.
    pub fn register_member(
        &self,
        username: impl Into<String>,
        age: i64,
        team_id: Option<EntityId>,
    ) -> RepoResult<Member> {
        if let Some(team_id) = team_id {
            self.require_team(team_id)?;
        }
        let member = self
            .members
            .save(Member::in_team(username, age, team_id))?;
        info!(
            "event=member_register module=service status=ok member_id={} team_id={}",
            member.id.unwrap_or_default(),
            team_id.map_or_else(|| "none".to_string(), |id| id.to_string())
        );
        Ok(member)
    }

    pub fn change_team(&self, member_id: EntityId, team_id: EntityId) -> RepoResult<Member> {
        let mut member = self.require_member(member_id)?;
        let team = self.require_team(team_id)?;
        member.change_team(&team)?;
        self.members.save(member)
    }

    fn require_member(&self, id: EntityId) -> RepoResult<Member> {
        self.members.find_by_id(id)?.ok_or(RepoError::NotFound {
            entity: "member",
            id,
        })
    }

    fn require_team(&self, id: EntityId) -> RepoResult<Team> {
        self.teams
            .find_by_id(id)?
            .ok_or(RepoError::NotFound { entity: "team", id })
    }

    pub fn find_member(&self, id: EntityId, fetch: Fetch) -> RepoResult<Option<MemberView>> {
        let Some(member) = self.members.find_by_id(id)? else {
            return Ok(None);
        };
        let team = match (fetch, member.team_id) {
            (Fetch::WithTeam, Some(team_id)) => self.teams.find_by_id(team_id)?,
            _ => None,
        };
        Ok(Some(MemberView { member, team }))
    }

    /// Every member with its team, resolved from a single team scan.
    pub fn find_all_with_teams(&self) -> RepoResult<Vec<MemberView>> {
        let teams = self.team_index()?;
        let members = self.members.find_all(None)?;
        Ok(members
            .into_iter()
            .map(|member| {
                let team = member.team_id.and_then(|id| teams.get(&id).cloned());
                MemberView { member, team }
            })
            .collect())
    }

    fn team_index(&self) -> RepoResult<HashMap<EntityId, Team>> {
        Ok(self
            .teams
            .find_all(None)?
            .into_iter()
            .filter_map(|team| team.id.map(|id| (id, team)))
            .collect())
    }

    pub fn members_of_team(&self, team_id: EntityId) -> RepoResult<Vec<Member>> {
        self.members.find_by_attribute(ATTR_TEAM_ID, team_id)
    }

    pub fn find_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.members.find_by_attribute(ATTR_USERNAME, username)
    }

    pub fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i64,
    ) -> RepoResult<Vec<Member>> {
        let predicate = Predicate::eq(ATTR_USERNAME, username).and(Predicate::gt(ATTR_AGE, age));
        self.members.find(&Query::new(predicate))
    }

    /// Exact match on both username and age.
    pub fn find_user(&self, username: &str, age: i64) -> RepoResult<Vec<Member>> {
        let predicate = Predicate::eq(ATTR_USERNAME, username).and(Predicate::eq(ATTR_AGE, age));
        self.members.find(&Query::new(predicate))
    }

    pub fn find_by_names(&self, names: &[&str]) -> RepoResult<Vec<Member>> {
        let predicate = Predicate::is_in(ATTR_USERNAME, names.iter().copied());
        self.members.find(&Query::new(predicate))
    }

    /// Fails with `NonUniqueResult` when the username is shared.
    pub fn find_unique_by_username(&self, username: &str) -> RepoResult<Option<Member>> {
        self.members
            .find_unique(&Predicate::eq(ATTR_USERNAME, username))
    }

    pub fn find_usernames(&self) -> RepoResult<Vec<String>> {
        Ok(self
            .members
            .find_all(None)?
            .into_iter()
            .map(|member| member.username)
            .collect())
    }

    /// Members joined with their team; members without a resolvable team are
    /// left out.
    pub fn find_member_dtos(&self) -> RepoResult<Vec<MemberDto>> {
        let teams = self.team_index()?;
        let members = self
            .members
            .find(&Query::new(Predicate::is_null(ATTR_TEAM_ID).negate()))?;
        Ok(members
            .into_iter()
            .filter_map(|member| {
                let id = member.id?;
                let team = teams.get(&member.team_id?)?;
                Some(MemberDto {
                    id,
                    username: member.username,
                    team_name: team.name.clone(),
                })
            })
            .collect())
    }

    pub fn find_by_age(&self, age: i64, request: PageRequest) -> RepoResult<Page<Member>> {
        let request = if request.sort.is_some() {
            request
        } else {
            request.with_sort(Sort::desc(ATTR_USERNAME))
        };
        self.members
            .find_page(&Query::new(Predicate::eq(ATTR_AGE, age)), &request)
    }

    /// Increments the age of every member at least `age` years old.
    pub fn bulk_age_plus(&self, age: i64) -> RepoResult<usize> {
        self.members.bulk_update(
            &Predicate::ge(ATTR_AGE, AttrValue::Int(age)),
            &Mutation::increment(ATTR_AGE, 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RosterService;
    use crate::model::member::Member;
    use crate::model::team::Team;
    use crate::service::read_model::Fetch;
    use crate::store::memory::MemoryRecordStore;

    fn service() -> RosterService<MemoryRecordStore<Member>, MemoryRecordStore<Team>> {
        RosterService::in_memory()
    }

    #[test]
    fn register_member_requires_existing_team() {
        let roster = service();
        let err = roster
            .register_member("member1", 10, Some(42))
            .expect_err("unknown team should be refused");
        assert!(err.is_not_found());
        assert_eq!(roster.members().count().expect("count"), 0);
    }

    #[test]
    fn member_only_fetch_never_resolves_team() {
        let roster = service();
        let team = roster.create_team("teamA").expect("create team");
        let member = roster.register_member("member1", 10, team.id).expect("register member");
        let id = member.id.expect("assigned id");

        let lazy = roster
            .find_member(id, Fetch::MemberOnly)
            .expect("lazy find")
            .expect("member exists");
        assert!(lazy.team.is_none());
        let eager = roster
            .find_member(id, Fetch::WithTeam)
            .expect("eager find")
            .expect("member exists");
        assert_eq!(eager.team.map(|t| t.name), Some("teamA".to_string()));
    }
}
