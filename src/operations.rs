use std::collections::HashSet;

use anyhow::anyhow;

use crate::config::EngineConfig;
use crate::error::{ErrorKind, LibError, Result};
use crate::gateway::FamilyTreeGateway;
use crate::graph::FamilyGraph;
use crate::layout::{self, TreeLayout};
use crate::models::{
    ConnectionOptions, CreateMemberPayload, DeleteMemberPayload, FamilyTreeId, MemberCreated,
    NewMemberDraft, Person, PersonId, RelationType,
};
use crate::permissions::ActingUser;
use crate::validator::{self, DeleteDecision};
use crate::viewport::{ScreenPoint, Viewport, ViewportSize};

/// Who is looking at which tree. `family_tree_id` is `None` when the user has no tree yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub actor: ActingUser,
    pub family_tree_id: Option<FamilyTreeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// Nothing fetched yet.
    Idle,
    /// First fetch in flight; later re-fetches keep the previous status.
    Loading,
    Ready,
    /// The tree exists but has no people.
    NoData,
    /// The user has no family tree to show.
    NoTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
}

impl From<&LibError> for ViewError {
    fn from(value: &LibError) -> Self {
        Self {
            kind: value.kind,
            code: value.code,
            message: value.user_message().to_string(),
        }
    }
}

/// Everything the UI needs to render one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeViewState {
    pub layout: Option<TreeLayout>,
    pub scale: f64,
    pub position: ScreenPoint,
    pub selected_node_id: Option<PersonId>,
    pub root_id: Option<PersonId>,
    pub loading: bool,
    pub status: ViewStatus,
    pub error: Option<ViewError>,
}

/// Issued for each fetch. Only the ticket from the latest `begin_fetch` may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub family_tree_id: FamilyTreeId,
    pub root_id: Option<PersonId>,
}

#[derive(Debug, Clone)]
pub enum MutationRequest {
    Create(CreateMemberPayload),
    Delete(DeleteMemberPayload),
}

/// An accepted mutation awaiting the gateway. The target person stays locked until the
/// ticket is finished.
#[derive(Debug, Clone)]
pub struct MutationTicket {
    pub target: PersonId,
    pub request: MutationRequest,
}

/// Orchestrates one tree view: snapshot, layout, viewport, selection and edits.
///
/// All transitions are named commands. Gateway calls are the only awaits; the graph is never
/// changed locally, every confirmed mutation is followed by a full re-fetch.
pub struct TreeController<G> {
    gateway: G,
    session: SessionContext,
    viewport: Viewport,
    viewport_size: ViewportSize,
    graph: Option<FamilyGraph>,
    layout: Option<TreeLayout>,
    root_id: Option<PersonId>,
    selected: Option<PersonId>,
    status: ViewStatus,
    error: Option<ViewError>,
    generation: u64,
    loading: bool,
    pending: HashSet<PersonId>,
}

impl<G: FamilyTreeGateway> TreeController<G> {
    pub fn new(
        gateway: G,
        session: SessionContext,
        config: EngineConfig,
        viewport_size: ViewportSize,
    ) -> Self {
        Self {
            gateway,
            session,
            viewport: Viewport::new(config.viewport),
            viewport_size,
            graph: None,
            layout: None,
            root_id: None,
            selected: None,
            status: ViewStatus::Idle,
            error: None,
            generation: 0,
            loading: false,
            pending: HashSet::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn graph(&self) -> Option<&FamilyGraph> {
        self.graph.as_ref()
    }

    pub fn state(&self) -> TreeViewState {
        TreeViewState {
            layout: self.layout.clone(),
            scale: self.viewport.scale(),
            position: self.viewport.position(),
            selected_node_id: self.selected,
            root_id: self.root_id,
            loading: self.loading,
            status: self.status,
            error: self.error.clone(),
        }
    }

    pub fn is_mutation_pending(&self, id: PersonId) -> bool {
        self.pending.contains(&id)
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Starts a fetch and supersedes any earlier one still in flight.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        let Some(family_tree_id) = self.session.family_tree_id else {
            let err = LibError::missing_context(
                "No family tree is linked to your account",
                anyhow!("session for user {} has no family tree", self.session.actor.user_id),
            );
            self.graph = None;
            self.layout = None;
            self.status = ViewStatus::NoTree;
            self.record(&err);
            return None;
        };

        self.generation += 1;
        self.loading = true;
        if matches!(self.status, ViewStatus::Idle | ViewStatus::NoTree) {
            self.status = ViewStatus::Loading;
        }
        Some(FetchTicket {
            generation: self.generation,
            family_tree_id,
            root_id: self.root_id,
        })
    }

    /// Applies a fetch result. Returns `false` when the ticket was superseded; stale results
    /// are dropped without touching state.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<Vec<Person>>) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping superseded fetch"
            );
            return false;
        }
        self.loading = false;

        let graph = match result.and_then(FamilyGraph::new) {
            Ok(graph) => graph,
            Err(err) => {
                // Last good layout stays on screen.
                if self.status == ViewStatus::Loading {
                    self.status = ViewStatus::Idle;
                }
                self.record(&err);
                return true;
            }
        };
        let violations = graph.violations();
        if !violations.is_empty() {
            tracing::warn!(
                family_tree_id = %ticket.family_tree_id,
                count = violations.len(),
                first = violations[0].error_code(),
                "snapshot has kinship inconsistencies"
            );
        }

        self.error = None;
        if graph.is_empty() {
            self.graph = Some(graph);
            self.layout = None;
            self.root_id = None;
            self.selected = None;
            self.status = ViewStatus::NoData;
            return true;
        }

        // A selection made while this fetch was in flight wins over the ticket's root.
        let root = [self.root_id, ticket.root_id, self.session.actor.person_id]
            .into_iter()
            .flatten()
            .find(|id| graph.contains(*id))
            .or_else(|| graph.people().first().map(|person| person.id));
        self.root_id = root;
        if self.selected.is_some_and(|id| !graph.contains(id)) {
            self.selected = None;
        }
        self.graph = Some(graph);
        self.status = ViewStatus::Ready;
        if let Err(err) = self.relayout() {
            self.record(&err);
        }
        tracing::info!(
            family_tree_id = %ticket.family_tree_id,
            people = self.graph.as_ref().map_or(0, FamilyGraph::len),
            laid_out = self.layout.as_ref().map_or(0, TreeLayout::len),
            "snapshot applied"
        );
        true
    }

    /// Fetches the current tree and replaces all graph state with it.
    pub async fn refresh(&mut self) {
        let Some(ticket) = self.begin_fetch() else {
            return;
        };
        let result = self
            .gateway
            .fetch_graph(ticket.family_tree_id, ticket.root_id)
            .await;
        self.apply_fetch(ticket, result);
    }

    /// Makes `id` the selection and the layout root. Unknown ids leave state untouched.
    pub fn select_node(&mut self, id: PersonId) -> Result<()> {
        let known = self.graph.as_ref().is_some_and(|graph| graph.contains(id));
        if !known {
            let err = LibError::not_found(
                "Person not found in family tree",
                anyhow!("select {}", id),
            );
            self.record(&err);
            return Err(err);
        }
        let previous_root = self.root_id;
        self.selected = Some(id);
        self.root_id = Some(id);
        if let Err(err) = self.relayout() {
            self.root_id = previous_root;
            self.record(&err);
            return Err(err);
        }
        Ok(())
    }

    /// Selects whoever is under the pointer, if anyone.
    pub fn click(&mut self, point: ScreenPoint) -> Option<PersonId> {
        let id = self
            .layout
            .as_ref()
            .and_then(|layout| self.viewport.node_at(layout, point))?;
        self.select_node(id).ok()?;
        Some(id)
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.viewport.zoom_out()
    }

    /// Scrolling up zooms in, scrolling down zooms out.
    pub fn wheel(&mut self, delta_y: f64) -> f64 {
        if delta_y < 0.0 {
            self.viewport.zoom_in()
        } else if delta_y > 0.0 {
            self.viewport.zoom_out()
        } else {
            self.viewport.scale()
        }
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
    }

    /// Re-centres at the current scale on a person, or on the whole tree.
    pub fn recenter(&mut self, focus: Option<PersonId>) -> Result<()> {
        let Some(layout) = self.layout.as_ref() else {
            return Ok(());
        };
        let centred =
            self.viewport
                .center_on(focus, layout, self.viewport_size, self.viewport.scale());
        match centred {
            Ok(position) => {
                let current = self.viewport.position();
                self.viewport
                    .pan(position.x - current.x, position.y - current.y);
                Ok(())
            }
            Err(err) => {
                self.record(&err);
                Err(err)
            }
        }
    }

    /// New viewport size; fit and centring are recomputed.
    pub fn resize(&mut self, viewport_size: ViewportSize) {
        self.viewport_size = viewport_size;
        if let Some(layout) = self.layout.as_ref() {
            if let Err(err) = self.viewport.fit(layout, viewport_size, self.root_id) {
                self.record(&err);
            }
        }
    }

    pub fn can_delete_selected(&self) -> Result<DeleteDecision> {
        let (graph, selected) = self.selection()?;
        validator::can_delete(graph, &self.session.actor, selected)
    }

    /// Validates an add against the current snapshot and locks the selected person.
    pub fn begin_add(
        &mut self,
        relation: RelationType,
        member: NewMemberDraft,
        options: ConnectionOptions,
    ) -> Result<MutationTicket> {
        let payload = self.prepare_add(relation, member, options);
        let payload = self.surface(payload)?;
        self.lock(payload.selected_node_id, MutationRequest::Create(payload))
    }

    /// Validates a delete of the selected person and locks it.
    pub fn begin_delete(&mut self) -> Result<MutationTicket> {
        let payload = self.prepare_delete();
        let payload = self.surface(payload)?;
        self.lock(payload.member_id, MutationRequest::Delete(payload))
    }

    /// Releases the lock. On success the caller must re-fetch; on failure the error is
    /// surfaced and nothing else changes.
    pub fn finish_mutation<T>(&mut self, ticket: &MutationTicket, outcome: &Result<T>) {
        self.pending.remove(&ticket.target);
        match outcome {
            Ok(_) => {
                tracing::info!(target_id = %ticket.target, "mutation confirmed");
                if let MutationRequest::Delete(payload) = &ticket.request {
                    if self.selected == Some(payload.member_id) {
                        self.selected = None;
                    }
                    if self.root_id == Some(payload.member_id) {
                        self.root_id = None;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(target_id = %ticket.target, code = err.code, "mutation rejected");
                self.record(err);
            }
        }
    }

    pub async fn request_add(
        &mut self,
        relation: RelationType,
        member: NewMemberDraft,
        options: ConnectionOptions,
    ) -> Result<MemberCreated> {
        let payload = self.prepare_add(relation, member, options);
        let payload = self.surface(payload)?;
        let ticket = self.lock(
            payload.selected_node_id,
            MutationRequest::Create(payload.clone()),
        )?;
        let outcome = self.gateway.create_member(payload).await;
        self.finish_mutation(&ticket, &outcome);
        let created = outcome?;
        self.refresh().await;
        Ok(created)
    }

    pub async fn request_delete(&mut self) -> Result<()> {
        let payload = self.prepare_delete();
        let payload = self.surface(payload)?;
        let ticket = self.lock(payload.member_id, MutationRequest::Delete(payload))?;
        let outcome = self.gateway.delete_member(payload).await;
        self.finish_mutation(&ticket, &outcome);
        outcome?;
        self.refresh().await;
        Ok(())
    }

    fn prepare_add(
        &self,
        relation: RelationType,
        member: NewMemberDraft,
        options: ConnectionOptions,
    ) -> Result<CreateMemberPayload> {
        let (graph, selected) = self.selection()?;
        let family_tree_id = self.tree_id()?;
        // Same planning the backend applies; rejects impossible edits before any request.
        validator::plan_add_member(graph, selected, relation, member.clone(), options)?;
        Ok(CreateMemberPayload {
            family_tree_id,
            selected_node_id: selected,
            relation_type: relation,
            member,
            options,
        })
    }

    fn prepare_delete(&self) -> Result<DeleteMemberPayload> {
        let (graph, selected) = self.selection()?;
        let family_tree_id = self.tree_id()?;
        validator::ensure_can_delete(graph, &self.session.actor, selected)?;
        Ok(DeleteMemberPayload {
            member_id: selected,
            family_tree_id,
        })
    }

    fn surface<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if let Err(err) = &outcome {
            self.record(err);
        }
        outcome
    }

    fn lock(&mut self, target: PersonId, request: MutationRequest) -> Result<MutationTicket> {
        if !self.pending.insert(target) {
            let err = LibError::conflict(
                "A change for this person is already in progress",
                anyhow!("mutation already pending for {}", target),
            );
            self.record(&err);
            return Err(err);
        }
        tracing::debug!(target_id = %target, "mutation submitted");
        Ok(MutationTicket { target, request })
    }

    fn selection(&self) -> Result<(&FamilyGraph, PersonId)> {
        let graph = self.graph.as_ref().ok_or_else(|| {
            LibError::not_found("Family tree has not been loaded", anyhow!("no snapshot"))
        })?;
        let selected = self.selected.ok_or_else(|| {
            LibError::invalid("Select a person first", anyhow!("no selection"))
        })?;
        graph.find(selected)?;
        Ok((graph, selected))
    }

    fn tree_id(&self) -> Result<FamilyTreeId> {
        self.session.family_tree_id.ok_or_else(|| {
            LibError::missing_context(
                "No family tree is linked to your account",
                anyhow!("no family tree in session"),
            )
        })
    }

    fn relayout(&mut self) -> Result<()> {
        let (Some(graph), Some(root)) = (self.graph.as_ref(), self.root_id) else {
            self.layout = None;
            return Ok(());
        };
        let layout = layout::compute_layout(graph, root)?;
        self.viewport.fit(&layout, self.viewport_size, Some(root))?;
        self.layout = Some(layout);
        Ok(())
    }

    fn record(&mut self, err: &LibError) {
        tracing::warn!(kind = ?err.kind, code = err.code, error = %err.source, "tree view error");
        self.error = Some(ViewError::from(err));
    }
}
