//! Per-actor inversion of reconstructed task states.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ReportError;
use crate::model::{EntityId, ObjectId};
use crate::replay::EntityState;

/// Someone attributed with at least one task in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: ObjectId,
    /// Tasks in the order they were indexed.
    pub entities: Vec<EntityId>,
}

/// Invert per-task actor sets into per-actor task lists.
///
/// Must run after every state is complete. Task ids are appended in the
/// iteration order of `states`.
///
/// # Errors
///
/// Returns [`ReportError::EmptyActorId`] if any actor set holds an empty id.
/// Replay never produces one, so this is treated as a broken contract and
/// the whole index fails.
pub fn index_by_actor<'a, I>(states: I) -> Result<BTreeMap<ObjectId, Actor>, ReportError>
where
    I: IntoIterator<Item = (&'a EntityId, &'a EntityState)>,
{
    let mut index: BTreeMap<ObjectId, Actor> = BTreeMap::new();

    for (entity, state) in states {
        for actor in &state.actors {
            if actor.is_empty() {
                return Err(ReportError::EmptyActorId {
                    entity: entity.clone(),
                });
            }
            index
                .entry(actor.clone())
                .or_insert_with(|| Actor {
                    id: actor.clone(),
                    entities: Vec::new(),
                })
                .entities
                .push(entity.clone());
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn state_with(actors: &[&str]) -> EntityState {
        EntityState {
            actors: actors
                .iter()
                .map(|a| ObjectId::new_unchecked(*a))
                .collect::<BTreeSet<_>>(),
            ..EntityState::default()
        }
    }

    fn task(id: &str) -> EntityId {
        EntityId::new_unchecked(id)
    }

    #[test]
    fn inverts_actor_sets_in_processing_order() {
        let mut states = BTreeMap::new();
        states.insert(task("T1"), state_with(&["alice", "bob"]));
        states.insert(task("T2"), state_with(&["bob"]));
        states.insert(task("T3"), state_with(&[]));

        let index = index_by_actor(&states).expect("index");

        assert_eq!(index.len(), 2);
        assert_eq!(index[&ObjectId::new_unchecked("alice")].entities, vec![task("T1")]);
        assert_eq!(
            index[&ObjectId::new_unchecked("bob")].entities,
            vec![task("T1"), task("T2")]
        );
    }

    #[test]
    fn empty_actor_id_fails_fast() {
        let mut states = BTreeMap::new();
        states.insert(task("T7"), state_with(&[""]));

        let err = index_by_actor(&states).unwrap_err();
        assert!(matches!(
            err,
            ReportError::EmptyActorId { ref entity } if entity == &task("T7")
        ));
    }

    #[test]
    fn no_states_no_actors() {
        let states: BTreeMap<EntityId, EntityState> = BTreeMap::new();
        assert!(index_by_actor(&states).expect("index").is_empty());
    }
}
