use super::{StoreError, StoreResult};
use crate::model::Entity;
use std::collections::HashMap;

/// Keyed, insertion-ordered collection of one entity kind.
///
/// Layout follows the entity-adapter shape: an ordered id list plus an
/// id -> record map. Enumeration always walks `ids`.
#[derive(Debug, Clone)]
pub struct EntityCollection<E: Entity> {
    ids: Vec<E::Id>,
    entities: HashMap<E::Id, E>,
    revision: u64,
}

impl<E: Entity> Default for EntityCollection<E> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
            revision: 0,
        }
    }
}

impl<E: Entity> EntityCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entity at the end of iteration order.
    pub fn add(&mut self, entity: E) -> StoreResult<()> {
        let id = entity.id().clone();
        if self.entities.contains_key(&id) {
            return Err(StoreError::DuplicateId {
                kind: E::KIND,
                id: id.to_string(),
            });
        }
        self.ids.push(id.clone());
        self.entities.insert(id, entity);
        self.bump();
        Ok(())
    }

    /// Merges a partial patch into an existing entity.
    pub fn update_by_id(&mut self, id: &E::Id, patch: E::Patch) -> StoreResult<()> {
        let entity = self.entities.get_mut(id).ok_or_else(|| not_found::<E>(id))?;
        entity.merge(patch);
        self.bump();
        Ok(())
    }

    /// Removes one entity. Does not cascade.
    pub fn remove_by_id(&mut self, id: &E::Id) -> StoreResult<E> {
        let entity = self.entities.remove(id).ok_or_else(|| not_found::<E>(id))?;
        self.ids.retain(|current| current != id);
        self.bump();
        Ok(entity)
    }

    /// Removes every present id and returns removed records in request order.
    ///
    /// Absent ids are skipped.
    pub fn remove_many<'a, I>(&mut self, ids: I) -> Vec<E>
    where
        I: IntoIterator<Item = &'a E::Id>,
        E::Id: 'a,
    {
        let removed = ids
            .into_iter()
            .filter_map(|id| self.entities.remove(id))
            .collect::<Vec<_>>();
        if !removed.is_empty() {
            let entities = &self.entities;
            self.ids.retain(|id| entities.contains_key(id));
            self.bump();
        }
        removed
    }

    pub fn get_by_id(&self, id: &E::Id) -> Option<&E> {
        self.entities.get(id)
    }

    /// Mutable access for the engine's order-array maintenance.
    ///
    /// Callers must bump the revision with [`Self::touch`] once done.
    pub(crate) fn get_mut(&mut self, id: &E::Id) -> Option<&mut E> {
        self.entities.get_mut(id)
    }

    pub(crate) fn touch(&mut self) {
        self.bump();
    }

    /// All entities in insertion order.
    pub fn get_all(&self) -> Vec<&E> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }

    pub fn ids(&self) -> &[E::Id] {
        &self.ids
    }

    pub fn contains(&self, id: &E::Id) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

fn not_found<E: Entity>(id: &E::Id) -> StoreError {
    StoreError::NotFound {
        kind: E::KIND,
        id: id.to_string(),
    }
}
