//! CLI smoke entry point.
//!
//! # Responsibility
//! - Load an optional JSON config, open the configured store and seed a
//!   small roster.
//! - Print one page of members and the result of a bulk age increment.
//!
//! Usage: `roster_cli [config.json]`

use log::info;
use roster_core::{
    init_logging, Member, PageRequest, RecordStore, RosterConfig, RosterService,
    SqliteRecordStore, Team,
};
use std::error::Error;
use std::sync::Arc;

const SEED_AGE: i64 = 10;

fn main() {
    if let Err(err) = run() {
        eprintln!("roster_cli error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => RosterConfig::load(path)?,
        None => RosterConfig::default(),
    };
    if let Some(log) = &config.log {
        init_logging(log)?;
    }
    println!("roster_core version={}", roster_core::core_version());

    match &config.database_path {
        Some(path) => {
            let store = Arc::new(SqliteRecordStore::open(path, &config.store)?);
            println!("store=sqlite path={}", path.display());
            demo(&RosterService::with_sqlite(store), &config)
        }
        None => {
            println!("store=memory");
            demo(&RosterService::in_memory(), &config)
        }
    }
}

fn demo<MS, TS>(roster: &RosterService<MS, TS>, config: &RosterConfig) -> Result<(), Box<dyn Error>>
where
    MS: RecordStore<Member> + ?Sized,
    TS: RecordStore<Team> + ?Sized,
{
    let team = roster.create_team("teamA")?;
    for index in 1..=5 {
        roster.register_member(format!("member{index}"), SEED_AGE, team.id)?;
    }

    let page = roster.find_by_age(SEED_AGE, PageRequest::of(0, config.default_page_size))?;
    println!(
        "page number={} size={} total={} has_next={}",
        page.number(),
        page.size(),
        page.total_elements().unwrap_or_default(),
        page.has_next()
    );
    for member in page.content() {
        println!(
            "member id={} username={} age={}",
            member.id.unwrap_or_default(),
            member.username,
            member.age
        );
    }

    let affected = roster.bulk_age_plus(SEED_AGE)?;
    println!("bulk_age_plus affected={affected}");
    info!("event=cli_demo module=cli status=ok affected={affected}");
    Ok(())
}
