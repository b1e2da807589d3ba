//! Entity collection and the finalize queue.
//!
//! Entities can be created from any thread. Creation only enqueues; the render
//! thread drains the queue once per frame at a fixed point, uploads the
//! entity's model and appends it to the live collection. Both collections sit
//! behind a single coarse lock each.

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{data_structures::model::ModelDescriptor, physics::body::Body, sync::lock};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A simulated body paired with the geometry drawn at its transform.
///
/// Models are shared between entities, bodies are not.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    pub body: Body,
    model: Arc<ModelDescriptor>,
}

impl Entity {
    pub fn new(model: Arc<ModelDescriptor>, body: Body) -> Self {
        Self {
            id: EntityId::next(),
            body,
            model,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn model(&self) -> &Arc<ModelDescriptor> {
        &self.model
    }
}

#[derive(Debug, Default)]
pub struct World {
    entities: Mutex<Vec<Entity>>,
    pending: Mutex<VecDeque<Entity>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entity for the next frame and return its id right away.
    pub fn enqueue(&self, entity: Entity) -> EntityId {
        let id = entity.id();
        lock(&self.pending).push_back(entity);
        id
    }

    /// Move every queued entity into the live collection.
    ///
    /// `prepare` runs on a copy of each queued entity before it becomes
    /// visible to physics and rendering; the renderer uses it to upload the
    /// model. Entities stay in the queue until they are published, so
    /// `remove` and `with_body` see them throughout, and an entity removed
    /// while `prepare` runs never goes live.
    pub fn finalize_pending(&self, mut prepare: impl FnMut(&Entity)) -> usize {
        let snapshot: Vec<Entity> = lock(&self.pending).iter().cloned().collect();
        if snapshot.is_empty() {
            return 0;
        }
        for entity in &snapshot {
            prepare(entity);
        }
        let prepared: HashSet<EntityId> = snapshot.iter().map(Entity::id).collect();

        // entities before pending, as in `remove`
        let mut entities = lock(&self.entities);
        let mut pending = lock(&self.pending);
        let mut count = 0;
        let mut waiting = VecDeque::with_capacity(pending.len());
        for entity in pending.drain(..) {
            if prepared.contains(&entity.id) {
                entities.push(entity);
                count += 1;
            } else {
                waiting.push_back(entity);
            }
        }
        *pending = waiting;
        log::debug!("finalized {} entities", count);
        count
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn len(&self) -> usize {
        lock(&self.entities).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the live entities with the collection locked.
    pub fn with_entities<R>(&self, f: impl FnOnce(&mut [Entity]) -> R) -> R {
        let mut entities = lock(&self.entities);
        f(&mut entities)
    }

    /// Run `f` on one live or still queued body.
    pub fn with_body<R>(&self, id: EntityId, f: impl FnOnce(&mut Body) -> R) -> Option<R> {
        let mut entities = lock(&self.entities);
        if let Some(entity) = entities.iter_mut().find(|e| e.id == id) {
            return Some(f(&mut entity.body));
        }
        let mut pending = lock(&self.pending);
        pending
            .iter_mut()
            .find(|e| e.id == id)
            .map(|entity| f(&mut entity.body))
    }

    /// Drop an entity, live or queued. Returns whether it existed.
    pub fn remove(&self, id: EntityId) -> bool {
        let mut entities = lock(&self.entities);
        let before = entities.len();
        entities.retain(|e| e.id != id);
        if entities.len() != before {
            return true;
        }
        let mut pending = lock(&self.pending);
        let before = pending.len();
        pending.retain(|e| e.id != id);
        pending.len() != before
    }
}
