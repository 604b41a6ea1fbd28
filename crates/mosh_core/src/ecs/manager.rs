//! Entity ownership and the per-frame sweep.

use crate::ecs::{ConfigError, Dispatch, Entity, EntityId, LookupError, Message, Pose, UpdateError};
use mosh_metrics::{SweepProfile, SweepSample};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

/// Outcome of one [`EntityManager::update`] sweep.
pub type SweepReport = SweepSample;

/// Cross-entity deliveries allowed per entity update before the rest of the
/// chain is discarded.
const MAX_CROSS_DELIVERIES: usize = 4096;

struct EntitySlot {
    generation: u32,
    entity: Option<Entity>,
}

/// Table of live entities, keyed by generational id and by name.
///
/// Components see this table through their context during a sweep; the
/// entity currently being updated is checked out of it and does not resolve.
#[derive(Default)]
pub struct Entities {
    slots: Vec<EntitySlot>,
    free: Vec<u32>,
    names: HashMap<String, EntityId>,
    order: Vec<EntityId>,
}

impl Entities {
    /// Resolve an id. `None` for stale ids and for the entity being updated.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entity.as_ref()
    }

    pub fn find(&self, name: &str) -> Option<&Entity> {
        self.get(*self.names.get(name)?)
    }

    pub fn id_of(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entity.as_mut()
    }

    fn allocate(&mut self) -> EntityId {
        match self.free.pop() {
            Some(index) => EntityId::new(index, self.slots[index as usize].generation),
            None => {
                self.slots.push(EntitySlot {
                    generation: 0,
                    entity: None,
                });
                EntityId::new((self.slots.len() - 1) as u32, 0)
            }
        }
    }

    fn release(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let entity = slot.entity.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        entity
    }

    fn take(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entity.take()
    }

    fn restore(&mut self, id: EntityId, entity: Entity) {
        if let Some(slot) = self.slots.get_mut(id.index() as usize) {
            slot.entity = Some(entity);
        }
    }
}

/// Owns every live entity and drives `update` in insertion order.
pub struct EntityManager {
    entities: Entities,
    profile: SweepProfile,
}

impl EntityManager {
    pub fn new() -> Self {
        Self {
            entities: Entities::default(),
            profile: SweepProfile::default(),
        }
    }

    /// Register `entity` under a unique `name` and initialize its components.
    ///
    /// Fails fast on a duplicate name, on an entity that was already
    /// initialized elsewhere, or when a component rejects its setup; in every
    /// case nothing is registered.
    pub fn add(&mut self, mut entity: Entity, name: &str) -> Result<EntityId, ConfigError> {
        if self.entities.names.contains_key(name) {
            return Err(ConfigError::DuplicateEntity {
                name: name.to_string(),
            });
        }
        if entity.is_initialized() {
            return Err(ConfigError::AlreadyInitialized {
                entity: name.to_string(),
            });
        }

        let id = self.entities.allocate();
        entity.assign(id, name);
        if let Err(error) = entity.init_entity() {
            // Drop the half-initialized entity before releasing its slot.
            drop(entity);
            self.entities.release(id);
            return Err(error);
        }

        self.entities.slots[id.index() as usize].entity = Some(entity);
        self.entities.names.insert(name.to_string(), id);
        self.entities.order.push(id);
        debug!(entity = name, %id, "entity added");
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Result<&Entity, LookupError> {
        self.entities
            .find(name)
            .ok_or_else(|| LookupError::UnknownEntity {
                name: name.to_string(),
            })
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Entity, LookupError> {
        let id = self
            .entities
            .id_of(name)
            .ok_or_else(|| LookupError::UnknownEntity {
                name: name.to_string(),
            })?;
        self.entities
            .get_mut(id)
            .ok_or(LookupError::StaleEntity { id })
    }

    pub fn get_by_id(&self, id: EntityId) -> Result<&Entity, LookupError> {
        self.entities.get(id).ok_or(LookupError::StaleEntity { id })
    }

    /// Unregister the entity and tear its components down (grid clients
    /// leave the grid), then hand it back.
    pub fn remove(&mut self, name: &str) -> Result<Entity, LookupError> {
        let id = self
            .entities
            .names
            .remove(name)
            .ok_or_else(|| LookupError::UnknownEntity {
                name: name.to_string(),
            })?;
        self.entities.order.retain(|other| *other != id);
        let mut entity = self
            .entities
            .release(id)
            .ok_or(LookupError::StaleEntity { id })?;
        entity.teardown();
        debug!(entity = name, %id, "entity removed");
        Ok(entity)
    }

    /// Deliver an external message (asset-loaded signal, scripted damage)
    /// to one entity, then flush whatever it sends to other entities.
    pub fn broadcast_to(&mut self, name: &str, message: Message) -> Result<(), UpdateError> {
        let id = self
            .entities
            .id_of(name)
            .ok_or_else(|| LookupError::UnknownEntity {
                name: name.to_string(),
            })?;
        let mut entity = self
            .entities
            .take(id)
            .ok_or(LookupError::StaleEntity { id })?;
        let mut outbox = VecDeque::new();
        let result = entity.receive(message, &self.entities, &mut outbox);
        self.entities.restore(id, entity);
        self.flush(&mut outbox);
        result
    }

    /// Run one frame: every entity in insertion order, each followed by the
    /// delivery of the messages it addressed to other entities.
    ///
    /// A failing entity is logged and skipped; the sweep always completes.
    pub fn update(&mut self, dt: f32) -> SweepReport {
        self.profile.begin();
        let mut report = SweepReport::default();
        let mut outbox = VecDeque::new();

        for position in 0..self.entities.order.len() {
            let id = self.entities.order[position];
            let Some(mut entity) = self.entities.take(id) else {
                continue;
            };
            let result = entity.run_update(dt, &self.entities, &mut outbox);
            let name = entity.name().to_string();
            self.entities.restore(id, entity);

            report.entities += 1;
            if let Err(error) = result {
                report.failures += 1;
                warn!(entity = %name, %error, "entity update failed");
            }

            let (delivered, failures) = self.flush(&mut outbox);
            report.messages += delivered;
            report.failures += failures;
        }

        self.profile.end(report);
        report
    }

    /// Deliver queued cross-entity messages, including the ones produced
    /// while delivering. Returns `(delivered, failures)`.
    fn flush(&mut self, outbox: &mut VecDeque<Dispatch>) -> (usize, usize) {
        let mut delivered = 0;
        let mut failures = 0;
        while let Some(dispatch) = outbox.pop_front() {
            if delivered == MAX_CROSS_DELIVERIES {
                warn!(
                    dropped = outbox.len() + 1,
                    "cross-entity message chain cut off"
                );
                outbox.clear();
                break;
            }
            let Some(mut target) = self.entities.take(dispatch.target) else {
                debug!(
                    recipient = %dispatch.target,
                    topic = dispatch.message.topic(),
                    "dropping message for missing entity"
                );
                continue;
            };
            let result = target.receive(dispatch.message, &self.entities, outbox);
            let name = target.name().to_string();
            self.entities.restore(dispatch.target, target);
            delivered += 1;
            if let Err(error) = result {
                failures += 1;
                warn!(entity = %name, %error, "message delivery failed");
            }
        }
        (delivered, failures)
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    /// Pose sink for the presentation layer: read once per frame, after
    /// `update`.
    pub fn poses(&self) -> impl Iterator<Item = (&str, Pose)> + '_ {
        self.entities.iter().map(|entity| (entity.name(), entity.pose()))
    }

    pub fn profile(&self) -> &SweepProfile {
        &self.profile
    }

    /// Drop every entity, in insertion order.
    pub fn clear(&mut self) {
        let names: Vec<String> = self.iter().map(|e| e.name().to_string()).collect();
        for name in names {
            let _ = self.remove(&name);
        }
        info!("entity manager cleared");
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::ecs::testing::MessageLog;
    use crate::ecs::{Component, ComponentContext};
    use glam::Vec3;

    /// Drifts along +X at a fixed speed.
    struct Drift {
        speed: f32,
    }
    impl Component for Drift {
        fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f32) -> Result<(), UpdateError> {
            let next = ctx.position() + Vec3::X * self.speed * dt;
            ctx.set_position(next);
            Ok(())
        }
    }
    define_component!(Drift, "Drift");

    /// Fails every frame.
    struct Broken;
    impl Component for Broken {
        fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<(), UpdateError> {
            Err(LookupError::UnknownState {
                name: "missing".into(),
            }
            .into())
        }
    }
    define_component!(Broken, "Broken");

    /// Sends a custom message to the entity named `target` every frame.
    struct Shout {
        target: &'static str,
    }
    impl Component for Shout {
        fn update(&mut self, ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<(), UpdateError> {
            if let Some(id) = ctx.world().id_of(self.target) {
                ctx.send_to(id, Message::custom("shout", serde_json::Value::Null));
            }
            Ok(())
        }
    }
    define_component!(Shout, "Shout");

    fn drifting(speed: f32) -> Entity {
        let mut entity = Entity::new();
        entity.add_component(Drift { speed }).unwrap();
        entity
    }

    #[test]
    fn duplicate_names_fail_fast() {
        let mut manager = EntityManager::new();
        manager.add(drifting(1.0), "npc").unwrap();
        let err = manager.add(drifting(2.0), "npc").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntity { name } if name == "npc"));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn unknown_names_are_lookup_errors() {
        let mut manager = EntityManager::new();
        assert_eq!(
            manager.get("ghost").unwrap_err(),
            LookupError::UnknownEntity {
                name: "ghost".into()
            }
        );
        assert!(manager.remove("ghost").is_err());
        assert!(manager
            .broadcast_to("ghost", Message::ResourcesLoaded)
            .is_err());
    }

    #[test]
    fn removed_ids_go_stale() {
        let mut manager = EntityManager::new();
        let id = manager.add(drifting(1.0), "a").unwrap();
        manager.remove("a").unwrap();
        assert!(manager.get_by_id(id).is_err());

        let reused = manager.add(drifting(1.0), "b").unwrap();
        assert_eq!(reused.index(), id.index());
        assert_ne!(reused.generation(), id.generation());
        assert_eq!(manager.get_by_id(reused).unwrap().name(), "b");
    }

    #[test]
    fn a_failing_entity_does_not_stop_the_sweep() {
        let mut manager = EntityManager::new();
        manager.add(drifting(1.0), "before").unwrap();
        let mut broken = Entity::new();
        broken.add_component(Broken).unwrap();
        manager.add(broken, "broken").unwrap();
        manager.add(drifting(1.0), "after").unwrap();

        let report = manager.update(1.0);
        assert_eq!(report.entities, 3);
        assert_eq!(report.failures, 1);
        assert_eq!(manager.get("before").unwrap().position(), Vec3::X);
        assert_eq!(manager.get("after").unwrap().position(), Vec3::X);
    }

    #[test]
    fn cross_entity_messages_arrive_in_the_same_sweep() {
        let mut manager = EntityManager::new();
        let mut shouter = Entity::new();
        shouter.add_component(Shout { target: "listener" }).unwrap();
        manager.add(shouter, "shouter").unwrap();
        let mut listener = Entity::new();
        listener
            .add_component(MessageLog::subscribed(&["shout"]))
            .unwrap();
        manager.add(listener, "listener").unwrap();

        let report = manager.update(0.016);
        assert_eq!(report.messages, 1);
        let log = manager
            .get("listener")
            .unwrap()
            .component::<MessageLog>()
            .unwrap();
        assert_eq!(log.count("shout"), 1);
    }

    #[test]
    fn sweep_follows_insertion_order() {
        let mut manager = EntityManager::new();
        for name in ["c", "a", "b"] {
            manager.add(drifting(1.0), name).unwrap();
        }
        manager.update(0.5);
        let names: Vec<&str> = manager.poses().map(|(name, _)| name).collect();
        assert_eq!(names, ["c", "a", "b"]);
        assert!(manager
            .poses()
            .all(|(_, pose)| pose.position == Vec3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn clear_removes_everything() {
        let mut manager = EntityManager::new();
        manager.add(drifting(1.0), "a").unwrap();
        manager.add(drifting(1.0), "b").unwrap();
        manager.clear();
        assert!(manager.is_empty());
        assert!(manager.get("a").is_err());
    }
}
