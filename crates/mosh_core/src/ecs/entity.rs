//! Entities: a name, a pose and an ordered set of components.

use crate::ecs::component::{downcast, downcast_mut};
use crate::ecs::{
    Component, ComponentContext, ComponentKind, ComponentType, ConfigError, Dispatch, Entities,
    Envelope, InitContext, Message, Siblings, Slot, UpdateError,
};
use glam::{Quat, Vec3};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{trace, warn};

/// Upper bound on deliveries triggered by a single update or external
/// message, so a pair of components echoing each other cannot hang a frame.
const MAX_DELIVERIES: usize = 1024;

/// Entity handle (generation-indexed for safety)
///
/// - Index: slot in the manager's entity table
/// - Generation: bumped when the slot is freed, so handles kept across a
///   removal stop resolving instead of aliasing a newer entity
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Id carried by entities that were never registered with a manager.
    pub const DETACHED: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Pack into a 64-bit integer (for logs and presentation-side maps)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Position and orientation of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// A named aggregate of components.
///
/// Components are attached with [`Entity::add_component`] and initialized
/// together by [`Entity::init_entity`] (the manager does this on `add`).
pub struct Entity {
    id: EntityId,
    name: String,
    pose: Pose,
    slots: Vec<Slot>,
    index: HashMap<ComponentKind, usize>,
    handlers: HashMap<String, Vec<usize>>,
    initialized: bool,
}

impl Entity {
    pub fn new() -> Self {
        Self {
            id: EntityId::DETACHED,
            name: String::new(),
            pose: Pose::default(),
            slots: Vec::new(),
            index: HashMap::new(),
            handlers: HashMap::new(),
            initialized: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn rotation(&self) -> Quat {
        self.pose.rotation
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Move the entity. Once initialized, subscribers of `update.position`
    /// (the spatial grid controller among them) hear about it immediately.
    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
        if self.initialized {
            self.announce(Message::PositionUpdate { value: position });
        }
    }

    /// Turn the entity, announcing it on `update.rotation` once initialized.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.pose.rotation = rotation;
        if self.initialized {
            self.announce(Message::RotationUpdate { value: rotation });
        }
    }

    /// Attach a component. At most one component per kind, and only before
    /// the entity is initialized.
    pub fn add_component<T: ComponentType>(&mut self, component: T) -> Result<(), ConfigError> {
        self.add_boxed(T::KIND, Box::new(component))
    }

    /// Attach a type-erased component under an explicit kind.
    pub fn add_boxed(
        &mut self,
        kind: ComponentKind,
        component: Box<dyn Component>,
    ) -> Result<(), ConfigError> {
        if self.initialized {
            return Err(ConfigError::AlreadyInitialized {
                entity: self.name.clone(),
            });
        }
        if self.index.contains_key(&kind) {
            return Err(ConfigError::DuplicateComponent {
                entity: self.name.clone(),
                kind,
            });
        }
        self.index.insert(kind, self.slots.len());
        self.slots.push(Slot {
            kind,
            component: Some(component),
        });
        Ok(())
    }

    /// Run every component's `init_component` in attachment order.
    pub fn init_entity(&mut self) -> Result<(), ConfigError> {
        if self.initialized {
            return Err(ConfigError::AlreadyInitialized {
                entity: self.name.clone(),
            });
        }
        for slot in 0..self.slots.len() {
            let Some(mut component) = self.slots[slot].component.take() else {
                continue;
            };
            let result = {
                let mut ctx = InitContext {
                    entity: self.id,
                    name: &self.name,
                    pose: &self.pose,
                    siblings: Siblings::new(&self.slots, &self.index),
                    slot,
                    handlers: &mut self.handlers,
                };
                component.init_component(&mut ctx)
            };
            self.slots[slot].component = Some(component);
            result?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Look up a component by kind.
    pub fn get_component(&self, kind: ComponentKind) -> Option<&dyn Component> {
        Siblings::new(&self.slots, &self.index).get(kind)
    }

    /// Typed lookup.
    pub fn component<T: ComponentType>(&self) -> Option<&T> {
        self.get_component(T::KIND).and_then(downcast::<T>)
    }

    pub fn component_mut<T: ComponentType>(&mut self) -> Option<&mut T> {
        let slot = *self.index.get(&T::KIND)?;
        let component = self.slots.get_mut(slot)?.component.as_deref_mut()?;
        downcast_mut::<T>(component)
    }

    pub fn has_component(&self, kind: ComponentKind) -> bool {
        self.index.contains_key(&kind)
    }

    /// Attached kinds in attachment order.
    pub fn component_kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.slots.iter().map(|slot| slot.kind)
    }

    /// Deliver `message` to every subscribed component, outside of any
    /// manager. Messages the handlers address to other entities are dropped.
    pub fn broadcast(&mut self, message: Message) -> Result<(), UpdateError> {
        let world = Entities::default();
        let mut outbox = VecDeque::new();
        let result = self.receive(message, &world, &mut outbox);
        self.warn_dropped(&outbox);
        result
    }

    /// Update every component once, outside of any manager.
    pub fn update(&mut self, dt: f32) -> Result<(), UpdateError> {
        let world = Entities::default();
        let mut outbox = VecDeque::new();
        let result = self.run_update(dt, &world, &mut outbox);
        self.warn_dropped(&outbox);
        result
    }

    /// Run every component's teardown hook, in attachment order.
    pub(crate) fn teardown(&mut self) {
        for component in self.slots.iter_mut().filter_map(|slot| slot.component.as_mut()) {
            component.teardown();
        }
    }

    pub(crate) fn assign(&mut self, id: EntityId, name: &str) {
        self.id = id;
        self.name = name.to_string();
    }

    pub(crate) fn run_update(
        &mut self,
        dt: f32,
        world: &Entities,
        outbox: &mut VecDeque<Dispatch>,
    ) -> Result<(), UpdateError> {
        for slot in 0..self.slots.len() {
            let mut mailbox = VecDeque::new();
            let result = self
                .with_component(slot, world, outbox, &mut mailbox, |component, ctx| {
                    component.update(ctx, dt)
                })
                .unwrap_or(Ok(()));
            self.drain(&mut mailbox, world, outbox)?;
            result?;
        }
        Ok(())
    }

    pub(crate) fn receive(
        &mut self,
        message: Message,
        world: &Entities,
        outbox: &mut VecDeque<Dispatch>,
    ) -> Result<(), UpdateError> {
        let mut mailbox = VecDeque::from([Envelope {
            sender: None,
            message,
        }]);
        self.drain(&mut mailbox, world, outbox)
    }

    /// Deliver queued messages in FIFO order. Handlers that broadcast append
    /// to the queue, so a nested broadcast starts only after the current
    /// message has reached all of its handlers.
    fn drain(
        &mut self,
        mailbox: &mut VecDeque<Envelope>,
        world: &Entities,
        outbox: &mut VecDeque<Dispatch>,
    ) -> Result<(), UpdateError> {
        let mut delivered = 0;
        while let Some(envelope) = mailbox.pop_front() {
            let Some(targets) = self.handlers.get(envelope.message.topic()).cloned() else {
                continue;
            };
            for slot in targets {
                if envelope.sender == Some(slot) {
                    continue;
                }
                delivered += 1;
                if delivered > MAX_DELIVERIES {
                    return Err(UpdateError::DispatchOverflow {
                        entity: self.name.clone(),
                        limit: MAX_DELIVERIES,
                    });
                }
                trace!(
                    entity = %self.name,
                    topic = envelope.message.topic(),
                    component = %self.slots[slot].kind,
                    "deliver"
                );
                if let Some(result) =
                    self.with_component(slot, world, outbox, mailbox, |component, ctx| {
                        component.on_message(ctx, &envelope.message)
                    })
                {
                    result?;
                }
            }
        }
        Ok(())
    }

    /// Take the component out of its slot, run `f` with a context over the
    /// rest of the entity, then put it back. `None` if the slot is empty.
    fn with_component<R>(
        &mut self,
        slot: usize,
        world: &Entities,
        outbox: &mut VecDeque<Dispatch>,
        mailbox: &mut VecDeque<Envelope>,
        f: impl FnOnce(&mut dyn Component, &mut ComponentContext<'_>) -> R,
    ) -> Option<R> {
        let entry = self.slots.get_mut(slot)?;
        let kind = entry.kind;
        let mut component = entry.component.take()?;
        let result = {
            let mut ctx = ComponentContext {
                entity: self.id,
                name: &self.name,
                kind,
                pose: &mut self.pose,
                siblings: Siblings::new(&self.slots, &self.index),
                slot,
                mailbox,
                world,
                outbox,
            };
            f(&mut *component, &mut ctx)
        };
        self.slots[slot].component = Some(component);
        Some(result)
    }

    fn announce(&mut self, message: Message) {
        let topic = message.topic().to_string();
        if let Err(error) = self.broadcast(message) {
            warn!(entity = %self.name, topic = %topic, %error, "pose announcement failed");
        }
    }

    fn warn_dropped(&self, outbox: &VecDeque<Dispatch>) {
        if !outbox.is_empty() {
            warn!(
                entity = %self.name,
                dropped = outbox.len(),
                "cross-entity messages dropped outside an entity manager"
            );
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pose", &self.pose)
            .field("components", &self.slots.iter().map(|s| s.kind).collect::<Vec<_>>())
            .finish()
    }
}
