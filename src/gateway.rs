use std::collections::HashMap;
use std::future::Future;

use anyhow::anyhow;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{LibError, Result};
use crate::graph::FamilyGraph;
use crate::invariants;
use crate::models::{
    CreateMemberPayload, DeleteMemberPayload, FamilyTreeId, MemberCreated, Person, PersonId,
};
use crate::validator;

/// Backend collaborator that owns persisted family trees.
///
/// Every mutation is followed by a full `fetch_graph`; implementations never need to
/// return partial graph updates.
pub trait FamilyTreeGateway: Send + Sync {
    fn fetch_graph(
        &self,
        family_tree_id: FamilyTreeId,
        root_id: Option<PersonId>,
    ) -> impl Future<Output = Result<Vec<Person>>> + Send;

    fn create_member(
        &self,
        payload: CreateMemberPayload,
    ) -> impl Future<Output = Result<MemberCreated>> + Send;

    fn delete_member(&self, payload: DeleteMemberPayload) -> impl Future<Output = Result<()>> + Send;
}

/// Gateway backed by process memory. Mutations go through the same planning rules the
/// controller uses, and the stored snapshot is kept consistent.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    trees: RwLock<HashMap<FamilyTreeId, Vec<Person>>>,
    reject_next: Mutex<Option<String>>,
    fetch_count: Mutex<usize>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tree(family_tree_id: FamilyTreeId, people: Vec<Person>) -> Self {
        let mut trees = HashMap::new();
        trees.insert(family_tree_id, people);
        Self {
            trees: RwLock::new(trees),
            ..Self::default()
        }
    }

    pub async fn insert_tree(&self, family_tree_id: FamilyTreeId, people: Vec<Person>) {
        self.trees.write().await.insert(family_tree_id, people);
    }

    /// The next gateway call fails with this message.
    pub async fn reject_next(&self, message: impl Into<String>) {
        *self.reject_next.lock().await = Some(message.into());
    }

    pub async fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().await
    }

    pub async fn snapshot(&self, family_tree_id: FamilyTreeId) -> Option<Vec<Person>> {
        self.trees.read().await.get(&family_tree_id).cloned()
    }

    async fn take_rejection(&self) -> Result<()> {
        match self.reject_next.lock().await.take() {
            Some(message) => Err(LibError::rejected(message)),
            None => Ok(()),
        }
    }
}

fn tree_not_found(family_tree_id: FamilyTreeId) -> LibError {
    LibError::not_found(
        "Family tree not found",
        anyhow!("family tree {}", family_tree_id),
    )
}

impl FamilyTreeGateway for InMemoryGateway {
    fn fetch_graph(
        &self,
        family_tree_id: FamilyTreeId,
        root_id: Option<PersonId>,
    ) -> impl Future<Output = Result<Vec<Person>>> + Send {
        async move {
            *self.fetch_count.lock().await += 1;
            self.take_rejection().await?;
            let trees = self.trees.read().await;
            let people = trees
                .get(&family_tree_id)
                .ok_or_else(|| tree_not_found(family_tree_id))?;
            if let Some(root_id) = root_id {
                if !people.iter().any(|person| person.id == root_id) {
                    tracing::debug!(%family_tree_id, %root_id, "requested root is not in tree");
                }
            }
            Ok(people.clone())
        }
    }

    fn create_member(
        &self,
        payload: CreateMemberPayload,
    ) -> impl Future<Output = Result<MemberCreated>> + Send {
        async move {
            self.take_rejection().await?;
            let mut trees = self.trees.write().await;
            let people = trees
                .get_mut(&payload.family_tree_id)
                .ok_or_else(|| tree_not_found(payload.family_tree_id))?;

            let graph = FamilyGraph::new(people.clone())?;
            let plan = validator::plan_add_member(
                &graph,
                payload.selected_node_id,
                payload.relation_type,
                payload.member,
                payload.options,
            )?;
            let member_id = PersonId(Uuid::new_v4());
            let next = validator::apply_member_plan(&graph, member_id, &plan)?;
            invariants::ensure_kinship_invariants(&next)?;
            *people = next;

            tracing::info!(
                family_tree_id = %payload.family_tree_id,
                %member_id,
                relation = payload.relation_type.as_str(),
                links = plan.links.len(),
                "member created"
            );
            Ok(MemberCreated { member_id })
        }
    }

    fn delete_member(&self, payload: DeleteMemberPayload) -> impl Future<Output = Result<()>> + Send {
        async move {
            self.take_rejection().await?;
            let mut trees = self.trees.write().await;
            let people = trees
                .get_mut(&payload.family_tree_id)
                .ok_or_else(|| tree_not_found(payload.family_tree_id))?;

            let before = people.len();
            people.retain(|person| person.id != payload.member_id);
            if people.len() == before {
                return Err(LibError::not_found(
                    "Person not found in family tree",
                    anyhow!("member {}", payload.member_id),
                ));
            }
            for person in people.iter_mut() {
                for list in [
                    &mut person.parents,
                    &mut person.children,
                    &mut person.spouses,
                    &mut person.siblings,
                ] {
                    list.retain(|id| *id != payload.member_id);
                }
            }

            tracing::info!(
                family_tree_id = %payload.family_tree_id,
                member_id = %payload.member_id,
                "member deleted"
            );
            Ok(())
        }
    }
}
