use anyhow::anyhow;
use serde::Serialize;

use crate::error::{LibError, Result};
use crate::graph::FamilyGraph;
use crate::invariants::MAX_PARENTS;
use crate::models::{
    ConnectionOptions, Gender, NewMemberDraft, Person, PersonAttributes, PersonId, RelationType,
};
use crate::permissions::ActingUser;

/// Why a delete was refused. Each reason has its own code and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteRefusal {
    OwnNode,
    ActiveAccount,
    HasDescendants,
}

impl DeleteRefusal {
    pub const fn code(self) -> &'static str {
        match self {
            DeleteRefusal::OwnNode => "delete_own_node",
            DeleteRefusal::ActiveAccount => "delete_active_account",
            DeleteRefusal::HasDescendants => "delete_has_descendants",
        }
    }

    pub const fn public_message(self) -> &'static str {
        match self {
            DeleteRefusal::OwnNode => "You cannot remove yourself from the family tree",
            DeleteRefusal::ActiveAccount => {
                "Only the tree owner can remove a member with an active account"
            }
            DeleteRefusal::HasDescendants => "Remove this member's descendants first",
        }
    }

    pub fn into_error(self, person_id: PersonId) -> LibError {
        let source = anyhow!("delete of {} refused: {:?}", person_id, self);
        match self {
            DeleteRefusal::OwnNode | DeleteRefusal::ActiveAccount => {
                LibError::forbidden_with_code(self.code(), self.public_message(), source)
            }
            DeleteRefusal::HasDescendants => {
                LibError::invalid_with_code(self.code(), self.public_message(), source)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum DeleteDecision {
    Allowed,
    Refused(DeleteRefusal),
}

impl DeleteDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, DeleteDecision::Allowed)
    }

    pub fn refusal(self) -> Option<DeleteRefusal> {
        match self {
            DeleteDecision::Allowed => None,
            DeleteDecision::Refused(reason) => Some(reason),
        }
    }
}

/// Delete rules, first failure wins: never yourself, active accounts only by the owner,
/// and never anyone with descendants.
pub fn can_delete(graph: &FamilyGraph, actor: &ActingUser, id: PersonId) -> Result<DeleteDecision> {
    let person = graph.find(id)?;
    if actor.is_self(person) {
        return Ok(DeleteDecision::Refused(DeleteRefusal::OwnNode));
    }
    if person.attributes.account_status.is_active() && !actor.may_remove_claimed_account() {
        return Ok(DeleteDecision::Refused(DeleteRefusal::ActiveAccount));
    }
    if !graph.is_leaf(id)? {
        return Ok(DeleteDecision::Refused(DeleteRefusal::HasDescendants));
    }
    Ok(DeleteDecision::Allowed)
}

/// Delete check as an error, for callers that want to short-circuit with `?`.
pub fn ensure_can_delete(graph: &FamilyGraph, actor: &ActingUser, id: PersonId) -> Result<()> {
    match can_delete(graph, actor, id)? {
        DeleteDecision::Allowed => Ok(()),
        DeleteDecision::Refused(reason) => {
            tracing::info!(person_id = %id, reason = reason.code(), "delete refused");
            Err(reason.into_error(id))
        }
    }
}

/// A link from the not-yet-created member to an existing person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "link", content = "personId", rename_all = "snake_case")]
pub enum PlannedLink {
    ParentOf(PersonId),
    ChildOf(PersonId),
    SpouseOf(PersonId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPlan {
    pub relation: RelationType,
    pub selected: PersonId,
    pub gender: Gender,
    pub attributes: PersonAttributes,
    /// Primary link first, collateral links after.
    pub links: Vec<PlannedLink>,
}

/// Works out every edge a new relative of `selected` implies under the given options.
pub fn plan_add_member(
    graph: &FamilyGraph,
    selected: PersonId,
    relation: RelationType,
    draft: NewMemberDraft,
    options: ConnectionOptions,
) -> Result<MemberPlan> {
    graph.find(selected)?;
    let gender = draft.gender;
    let attributes = draft.normalize(relation)?;

    let mut links = Vec::new();
    match relation {
        RelationType::Parent => {
            let parents = graph.parents_of(selected);
            if parents.len() >= MAX_PARENTS {
                return Err(LibError::invalid_with_code(
                    "parent_limit_reached",
                    "This person already has two parents",
                    anyhow!("{} has parents {:?}", selected, parents),
                ));
            }
            links.push(PlannedLink::ParentOf(selected));
            if options.connect_to_existing_parent {
                if let Some(existing) = parents.first() {
                    links.push(PlannedLink::SpouseOf(*existing));
                }
            }
        }
        RelationType::Spouse => {
            links.push(PlannedLink::SpouseOf(selected));
            if options.connect_to_children {
                for child in graph.children_of(selected) {
                    if graph.parents_of(child).len() >= MAX_PARENTS {
                        tracing::debug!(child_id = %child, "child already has two parents, skipping");
                        continue;
                    }
                    links.push(PlannedLink::ParentOf(child));
                }
            }
        }
        RelationType::Child => {
            links.push(PlannedLink::ChildOf(selected));
            if options.connect_to_spouse {
                if let Some(spouse) = graph.spouses_of(selected).first() {
                    links.push(PlannedLink::ChildOf(*spouse));
                }
            }
        }
        RelationType::Sibling => {
            let parents = graph.parents_of(selected);
            if parents.is_empty() {
                return Err(LibError::invalid_with_code(
                    "sibling_requires_parent",
                    "Add a parent before adding a sibling",
                    anyhow!("{} has no parents to share", selected),
                ));
            }
            links.extend(parents.into_iter().map(PlannedLink::ChildOf));
        }
    }

    Ok(MemberPlan {
        relation,
        selected,
        gender,
        attributes,
        links,
    })
}

/// Next snapshot with the planned member inserted under `new_id` and every link mirrored on
/// both sides.
pub fn apply_member_plan(
    graph: &FamilyGraph,
    new_id: PersonId,
    plan: &MemberPlan,
) -> Result<Vec<Person>> {
    if graph.contains(new_id) {
        return Err(LibError::invalid_with_code(
            "kinship_duplicate_person",
            "Person IDs must be unique within a tree",
            anyhow!("new member id {} already exists", new_id),
        ));
    }

    let mut people = graph.people().to_vec();
    let mut member = Person::new(new_id, plan.gender, plan.attributes.clone());
    for link in &plan.links {
        let (other_id, mine, theirs) = match *link {
            PlannedLink::ParentOf(child) => (child, Relatives::Children, Relatives::Parents),
            PlannedLink::ChildOf(parent) => (parent, Relatives::Parents, Relatives::Children),
            PlannedLink::SpouseOf(spouse) => (spouse, Relatives::Spouses, Relatives::Spouses),
        };
        let Some(other) = people.iter_mut().find(|person| person.id == other_id) else {
            return Err(LibError::not_found(
                "Person not found in family tree",
                anyhow!("planned link target {}", other_id),
            ));
        };
        push_unique(theirs.of(other), new_id);
        push_unique(mine.of(&mut member), other_id);
    }
    people.push(member);
    Ok(people)
}

#[derive(Clone, Copy)]
enum Relatives {
    Parents,
    Children,
    Spouses,
}

impl Relatives {
    fn of(self, person: &mut Person) -> &mut Vec<PersonId> {
        match self {
            Relatives::Parents => &mut person.parents,
            Relatives::Children => &mut person.children,
            Relatives::Spouses => &mut person.spouses,
        }
    }
}

fn push_unique(list: &mut Vec<PersonId>, id: PersonId) {
    if !list.contains(&id) {
        list.push(id);
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::fixtures::{FamilyBuilder, pid, three_generations};
    use crate::invariants::ensure_kinship_invariants;
    use crate::models::{AccountStatus, UserId};

    fn actor(person_id: PersonId, is_tree_owner: bool) -> ActingUser {
        ActingUser {
            user_id: UserId(Uuid::from_u128(900)),
            person_id: Some(person_id),
            is_tree_owner,
        }
    }

    fn draft(name: &str) -> NewMemberDraft {
        NewMemberDraft::named(name, Gender::Other)
    }

    #[test]
    fn own_node_is_never_deletable() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let me = actor(family.grandson, true);
        assert_eq!(
            can_delete(&graph, &me, family.grandson).expect("decision"),
            DeleteDecision::Refused(DeleteRefusal::OwnNode)
        );
        let err = ensure_can_delete(&graph, &me, family.grandson).expect_err("refused");
        assert_eq!(err.code, "delete_own_node");
    }

    #[test]
    fn active_account_needs_owner() {
        let mut family = FamilyBuilder::new();
        let me = family.person("Me");
        let cousin = family.person("Cousin");
        family
            .parent_child(me, cousin)
            .account(cousin, AccountStatus::Active, Some(UserId(Uuid::from_u128(7))));
        let graph = FamilyGraph::new(family.build()).expect("graph");

        let decision = can_delete(&graph, &actor(me, false), cousin).expect("decision");
        assert_eq!(decision, DeleteDecision::Refused(DeleteRefusal::ActiveAccount));
        assert_eq!(
            decision.refusal().map(DeleteRefusal::public_message),
            Some("Only the tree owner can remove a member with an active account")
        );

        assert!(can_delete(&graph, &actor(me, true), cousin).expect("decision").is_allowed());
    }

    #[test]
    fn pending_account_leaf_is_deletable_by_anyone() {
        let mut family = FamilyBuilder::new();
        let me = family.person("Me");
        let invited = family.person("Invited");
        family
            .parent_child(me, invited)
            .account(invited, AccountStatus::Pending, None);
        let graph = FamilyGraph::new(family.build()).expect("graph");
        assert!(can_delete(&graph, &actor(me, false), invited).expect("decision").is_allowed());
    }

    #[test]
    fn any_descendant_blocks_delete_even_for_owner() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let owner = actor(family.daughter, true);
        assert_eq!(
            can_delete(&graph, &owner, family.grandpa).expect("decision"),
            DeleteDecision::Refused(DeleteRefusal::HasDescendants)
        );
        let err = ensure_can_delete(&graph, &owner, family.son).expect_err("refused");
        assert_eq!(err.code, "delete_has_descendants");
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidInput);
        assert!(can_delete(&graph, &owner, family.grandson).expect("decision").is_allowed());
    }

    #[test]
    fn unknown_person_is_not_found() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let err = can_delete(&graph, &actor(family.son, true), pid(404)).expect_err("missing");
        assert!(err.is_not_found());
    }

    fn parent_with_two_children() -> (FamilyGraph, PersonId, PersonId, PersonId) {
        let mut family = FamilyBuilder::new();
        let parent = family.person("Parent");
        let first = family.person("First");
        let second = family.person("Second");
        family.parent_child(parent, first).parent_child(parent, second);
        (FamilyGraph::new(family.build()).expect("graph"), parent, first, second)
    }

    #[test]
    fn spouse_joins_existing_children_when_asked() {
        let (graph, parent, first, second) = parent_with_two_children();
        let plan = plan_add_member(
            &graph,
            parent,
            RelationType::Spouse,
            draft("Partner"),
            ConnectionOptions::default(),
        )
        .expect("plan");
        let new_id = pid(100);
        let people = apply_member_plan(&graph, new_id, &plan).expect("apply");
        ensure_kinship_invariants(&people).expect("consistent");

        let next = FamilyGraph::new(people).expect("graph");
        assert!(next.find(first).expect("first").parents.contains(&new_id));
        assert!(next.find(second).expect("second").parents.contains(&new_id));
        assert_eq!(next.find(new_id).expect("new").spouses, vec![parent]);
        assert!(!next.find(new_id).expect("new").attributes.is_blood_related);
    }

    #[test]
    fn spouse_stays_off_children_when_not_asked() {
        let (graph, parent, first, second) = parent_with_two_children();
        let options = ConnectionOptions {
            connect_to_children: false,
            ..ConnectionOptions::default()
        };
        let plan = plan_add_member(&graph, parent, RelationType::Spouse, draft("Step"), options)
            .expect("plan");
        assert_eq!(plan.links, vec![PlannedLink::SpouseOf(parent)]);

        let new_id = pid(100);
        let next = FamilyGraph::new(apply_member_plan(&graph, new_id, &plan).expect("apply"))
            .expect("graph");
        assert!(!next.find(first).expect("first").parents.contains(&new_id));
        assert!(!next.find(second).expect("second").parents.contains(&new_id));
    }

    #[test]
    fn spouse_skips_children_with_two_parents() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let plan = plan_add_member(
            &graph,
            family.father,
            RelationType::Spouse,
            draft("Second wife"),
            ConnectionOptions::default(),
        )
        .expect("plan");
        assert_eq!(plan.links, vec![PlannedLink::SpouseOf(family.father)]);
    }

    #[test]
    fn child_joins_selected_spouse_when_asked() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let plan = plan_add_member(
            &graph,
            family.mother,
            RelationType::Child,
            draft("Baby"),
            ConnectionOptions::default(),
        )
        .expect("plan");
        assert_eq!(
            plan.links,
            vec![
                PlannedLink::ChildOf(family.mother),
                PlannedLink::ChildOf(family.father)
            ]
        );

        let solo = plan_add_member(
            &graph,
            family.mother,
            RelationType::Child,
            draft("Baby"),
            ConnectionOptions::none(),
        )
        .expect("plan");
        assert_eq!(solo.links, vec![PlannedLink::ChildOf(family.mother)]);
    }

    #[test]
    fn parent_joins_existing_parent_when_asked() {
        let (graph, parent, first, _) = parent_with_two_children();
        let plan = plan_add_member(
            &graph,
            first,
            RelationType::Parent,
            draft("Other parent"),
            ConnectionOptions::default(),
        )
        .expect("plan");
        assert_eq!(
            plan.links,
            vec![PlannedLink::ParentOf(first), PlannedLink::SpouseOf(parent)]
        );
        let people = apply_member_plan(&graph, pid(100), &plan).expect("apply");
        ensure_kinship_invariants(&people).expect("consistent");
    }

    #[test]
    fn third_parent_is_refused() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let err = plan_add_member(
            &graph,
            family.son,
            RelationType::Parent,
            draft("Extra"),
            ConnectionOptions::default(),
        )
        .expect_err("two parents already");
        assert_eq!(err.code, "parent_limit_reached");
    }

    #[test]
    fn sibling_shares_all_parents() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let plan = plan_add_member(
            &graph,
            family.son,
            RelationType::Sibling,
            draft("Twin"),
            ConnectionOptions::default(),
        )
        .expect("plan");
        let new_id = pid(100);
        let next = FamilyGraph::new(apply_member_plan(&graph, new_id, &plan).expect("apply"))
            .expect("graph");
        let siblings = next.siblings(family.son).expect("siblings");
        assert!(siblings.contains(&new_id));
        assert_eq!(next.parents_of(new_id), vec![family.father, family.mother]);
    }

    #[test]
    fn sibling_without_parents_is_refused() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let err = plan_add_member(
            &graph,
            family.grandpa,
            RelationType::Sibling,
            draft("Great uncle"),
            ConnectionOptions::default(),
        )
        .expect_err("no parents");
        assert_eq!(err.code, "sibling_requires_parent");
    }

    #[test]
    fn planning_for_unknown_person_is_not_found() {
        let family = three_generations();
        let graph = FamilyGraph::new(family.people).expect("graph");
        let err = plan_add_member(
            &graph,
            pid(404),
            RelationType::Child,
            draft("Ghost"),
            ConnectionOptions::default(),
        )
        .expect_err("missing");
        assert!(err.is_not_found());
    }
}
