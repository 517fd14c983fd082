use std::env;

use anyhow::{Context, anyhow};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use kinship_graph::prelude::*;

fn person(n: u128, name: &str, gender: Gender) -> Person {
    Person::new(
        PersonId(Uuid::from_u128(n)),
        gender,
        PersonAttributes::named(name),
    )
}

fn link_parent(people: &mut [Person], parent: usize, child: usize) {
    let (parent_id, child_id) = (people[parent].id, people[child].id);
    people[parent].children.push(child_id);
    people[child].parents.push(parent_id);
}

fn link_spouses(people: &mut [Person], a: usize, b: usize) {
    let (a_id, b_id) = (people[a].id, people[b].id);
    people[a].spouses.push(b_id);
    people[b].spouses.push(a_id);
}

fn sample_family() -> Vec<Person> {
    let mut people = vec![
        person(1, "Ada", Gender::Female),
        person(2, "Bruno", Gender::Male),
        person(3, "Clara", Gender::Female),
        person(4, "Dmitri", Gender::Male),
        person(5, "Elena", Gender::Female),
        person(6, "Felix", Gender::Male),
    ];
    link_spouses(&mut people, 0, 1);
    link_parent(&mut people, 0, 2);
    link_parent(&mut people, 1, 2);
    link_spouses(&mut people, 2, 3);
    link_parent(&mut people, 2, 4);
    link_parent(&mut people, 3, 4);
    link_parent(&mut people, 2, 5);
    link_parent(&mut people, 3, 5);
    people
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env().context("invalid viewport configuration")?;
    let width = env::var("KINSHIP_DEMO_WIDTH")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1280.0);
    let height = env::var("KINSHIP_DEMO_HEIGHT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(800.0);

    let family_tree_id = FamilyTreeId(Uuid::from_u128(100));
    let people = sample_family();
    let me = people[2].id;
    let session = SessionContext {
        actor: ActingUser {
            user_id: UserId(Uuid::from_u128(200)),
            person_id: Some(me),
            is_tree_owner: true,
        },
        family_tree_id: Some(family_tree_id),
    };

    let mut tree = TreeController::new(
        InMemoryGateway::with_tree(family_tree_id, people),
        session,
        config,
        ViewportSize { width, height },
    );
    tree.refresh().await;

    tree.select_node(people_id(5))?;
    let created = tree
        .request_add(
            RelationType::Spouse,
            NewMemberDraft::named("Greta", Gender::Female),
            ConnectionOptions::default(),
        )
        .await?;
    tracing::info!(member_id = %created.member_id, "added spouse");

    tree.select_node(me)?;
    tree.zoom_out();

    let state = tree.state();
    let layout = state
        .layout
        .ok_or_else(|| anyhow!("no layout after refresh: {:?}", state.status))?;
    let output = json!({
        "scale": state.scale,
        "position": state.position,
        "rootId": state.root_id,
        "layout": layout,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn people_id(n: u128) -> PersonId {
    PersonId(Uuid::from_u128(n))
}
