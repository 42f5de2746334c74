use roster_core::{
    Fetch, Member, PageRequest, RecordStore, RepoError, RosterService, Sort, SqliteRecordStore,
    StoreConfig, Team,
};
use std::sync::Arc;

fn sqlite_roster() -> RosterService<SqliteRecordStore, SqliteRecordStore> {
    let store = SqliteRecordStore::open_in_memory(&StoreConfig::default()).unwrap();
    RosterService::with_sqlite(Arc::new(store))
}

/// teamA: member1 (10), member2 (20); teamB: member3 (30); member4 (40) has no team.
fn seed<MS, TS>(roster: &RosterService<MS, TS>) -> (Team, Team)
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    let team_a = roster.create_team("teamA").unwrap();
    let team_b = roster.create_team("teamB").unwrap();
    roster.register_member("member1", 10, team_a.id).unwrap();
    roster.register_member("member2", 20, team_a.id).unwrap();
    roster.register_member("member3", 30, team_b.id).unwrap();
    roster.register_member("member4", 40, None).unwrap();
    (team_a, team_b)
}

fn derived_lookups<MS, TS>(roster: RosterService<MS, TS>)
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    seed(&roster);
    roster.register_member("member1", 50, None).unwrap();

    assert_eq!(roster.find_by_username("member1").unwrap().len(), 2);

    let older = roster
        .find_by_username_and_age_greater_than("member1", 15)
        .unwrap();
    assert_eq!(older.len(), 1);
    assert_eq!(older[0].age, 50);

    assert_eq!(roster.find_user("member2", 20).unwrap().len(), 1);
    assert!(roster.find_user("member2", 21).unwrap().is_empty());

    let named = roster.find_by_names(&["member2", "member3", "nobody"]).unwrap();
    let names: Vec<_> = named.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member2", "member3"]);

    assert!(roster.find_unique_by_username("member3").unwrap().is_some());
    assert!(roster.find_unique_by_username("nobody").unwrap().is_none());
    assert!(matches!(
        roster.find_unique_by_username("member1"),
        Err(RepoError::NonUniqueResult { count: 2 })
    ));

    assert_eq!(
        roster.find_usernames().unwrap(),
        vec!["member1", "member2", "member3", "member4", "member1"]
    );
}

#[test]
fn derived_lookups_memory() {
    derived_lookups(RosterService::in_memory());
}

#[test]
fn derived_lookups_sqlite() {
    derived_lookups(sqlite_roster());
}

fn team_joins_and_projections<MS, TS>(roster: RosterService<MS, TS>)
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    let (team_a, team_b) = seed(&roster);

    let views = roster.find_all_with_teams().unwrap();
    let pairs: Vec<_> = views
        .iter()
        .map(|view| {
            (
                view.member.username.as_str(),
                view.team.as_ref().map(|team| team.name.as_str()),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("member1", Some("teamA")),
            ("member2", Some("teamA")),
            ("member3", Some("teamB")),
            ("member4", None),
        ]
    );

    let dtos = roster.find_member_dtos().unwrap();
    assert_eq!(dtos.len(), 3);
    assert_eq!(dtos[2].username, "member3");
    assert_eq!(dtos[2].team_name, "teamB");

    let team_a_members = roster.members_of_team(team_a.id.unwrap()).unwrap();
    assert_eq!(team_a_members.len(), 2);

    // A deleted team leaves a dangling reference that readers tolerate.
    assert!(roster.teams().delete(&team_b).unwrap());
    assert_eq!(roster.find_member_dtos().unwrap().len(), 2);
    let member3 = roster.find_by_username("member3").unwrap().remove(0);
    let view = roster
        .find_member(member3.id.unwrap(), Fetch::WithTeam)
        .unwrap()
        .unwrap();
    assert_eq!(view.member.team_id, team_b.id);
    assert!(view.team.is_none());
}

#[test]
fn team_joins_and_projections_memory() {
    team_joins_and_projections(RosterService::in_memory());
}

#[test]
fn team_joins_and_projections_sqlite() {
    team_joins_and_projections(sqlite_roster());
}

fn change_team_requires_both_records<MS, TS>(roster: RosterService<MS, TS>)
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    let (_, team_b) = seed(&roster);
    let member1 = roster.find_by_username("member1").unwrap().remove(0);
    let member_id = member1.id.unwrap();
    let team_b_id = team_b.id.unwrap();

    let moved = roster.change_team(member_id, team_b_id).unwrap();
    assert_eq!(moved.team_id, Some(team_b_id));
    assert_eq!(roster.members_of_team(team_b_id).unwrap().len(), 2);

    assert!(matches!(
        roster.change_team(member_id, 999),
        Err(RepoError::NotFound { entity: "team", id: 999 })
    ));
    assert!(matches!(
        roster.change_team(999, team_b_id),
        Err(RepoError::NotFound { entity: "member", id: 999 })
    ));
    assert!(roster.register_member("member9", 1, Some(999)).unwrap_err().is_not_found());
}

#[test]
fn change_team_requires_both_records_memory() {
    change_team_requires_both_records(RosterService::in_memory());
}

#[test]
fn change_team_requires_both_records_sqlite() {
    change_team_requires_both_records(sqlite_roster());
}

fn paging_by_age_and_bulk_increment<MS, TS>(roster: RosterService<MS, TS>)
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    for index in 1..=5 {
        roster
            .register_member(format!("member{index}"), 10, None)
            .unwrap();
    }
    roster.register_member("member6", 9, None).unwrap();

    let first = roster.find_by_age(10, PageRequest::of(0, 3)).unwrap();
    let names: Vec<_> = first.content().iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member5", "member4", "member3"]);
    assert_eq!(first.total_elements(), Some(5));
    assert!(first.has_next());

    let ascending = roster
        .find_by_age(10, PageRequest::sorted(1, 3, Sort::asc("username")))
        .unwrap();
    let names: Vec<_> = ascending
        .map(|m| m.username)
        .into_content();
    assert_eq!(names, vec!["member4", "member5"]);

    assert_eq!(roster.bulk_age_plus(10).unwrap(), 5);
    assert_eq!(roster.find_by_age(11, PageRequest::of(0, 10)).unwrap().content().len(), 5);
    assert_eq!(roster.find_user("member6", 9).unwrap().len(), 1);
}

#[test]
fn paging_by_age_and_bulk_increment_memory() {
    paging_by_age_and_bulk_increment(RosterService::in_memory());
}

#[test]
fn paging_by_age_and_bulk_increment_sqlite() {
    paging_by_age_and_bulk_increment(sqlite_roster());
}
