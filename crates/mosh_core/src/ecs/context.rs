//! Views handed to component hooks.
//!
//! While a hook runs, its component is taken out of the entity's slot list,
//! so the context can lend out the remaining siblings immutably and the pose
//! mutably without aliasing the running component.

use crate::ecs::component::downcast;
use crate::ecs::{
    Component, ComponentKind, ComponentType, Entities, EntityId, Message, Pose, UpdateError,
};
use glam::{Quat, Vec3};
use std::collections::{HashMap, VecDeque};

/// One attached component. `component` is `None` while its hook is running.
pub(crate) struct Slot {
    pub(crate) kind: ComponentKind,
    pub(crate) component: Option<Box<dyn Component>>,
}

/// A message waiting for delivery inside one entity.
pub(crate) struct Envelope {
    /// Slot index of the broadcasting component; `None` for messages that
    /// originate from the entity itself or from outside.
    pub(crate) sender: Option<usize>,
    pub(crate) message: Message,
}

/// A message addressed to another entity, delivered by the manager.
pub(crate) struct Dispatch {
    pub(crate) target: EntityId,
    pub(crate) message: Message,
}

/// Read-only view of an entity's components.
#[derive(Clone, Copy)]
pub struct Siblings<'a> {
    slots: &'a [Slot],
    index: &'a HashMap<ComponentKind, usize>,
}

impl<'a> Siblings<'a> {
    pub(crate) fn new(slots: &'a [Slot], index: &'a HashMap<ComponentKind, usize>) -> Self {
        Self { slots, index }
    }

    /// Look up a component by kind. Returns `None` when nothing of that kind
    /// is attached, or when asking for the component that is currently running.
    pub fn get(&self, kind: ComponentKind) -> Option<&'a dyn Component> {
        let slot = self.slots.get(*self.index.get(&kind)?)?;
        slot.component.as_deref()
    }

    /// Typed lookup.
    pub fn get_as<T: ComponentType>(&self) -> Option<&'a T> {
        self.get(T::KIND).and_then(downcast::<T>)
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.index.contains_key(&kind)
    }
}

/// Context for [`Component::init_component`].
pub struct InitContext<'a> {
    pub(crate) entity: EntityId,
    pub(crate) name: &'a str,
    pub(crate) pose: &'a Pose,
    pub(crate) siblings: Siblings<'a>,
    pub(crate) slot: usize,
    pub(crate) handlers: &'a mut HashMap<String, Vec<usize>>,
}

impl<'a> InitContext<'a> {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn rotation(&self) -> Quat {
        self.pose.rotation
    }

    pub fn sibling<T: ComponentType>(&self) -> Option<&'a T> {
        self.siblings.get_as::<T>()
    }

    pub fn siblings(&self) -> Siblings<'a> {
        self.siblings
    }

    /// Register the running component as a handler for `topic`.
    pub fn subscribe(&mut self, topic: &str) {
        let handlers = self.handlers.entry(topic.to_string()).or_default();
        if !handlers.contains(&self.slot) {
            handlers.push(self.slot);
            handlers.sort_unstable();
        }
    }
}

/// Context for [`Component::update`] and [`Component::on_message`].
pub struct ComponentContext<'a> {
    pub(crate) entity: EntityId,
    pub(crate) name: &'a str,
    pub(crate) kind: ComponentKind,
    pub(crate) pose: &'a mut Pose,
    pub(crate) siblings: Siblings<'a>,
    pub(crate) slot: usize,
    pub(crate) mailbox: &'a mut VecDeque<Envelope>,
    pub(crate) world: &'a Entities,
    pub(crate) outbox: &'a mut VecDeque<Dispatch>,
}

impl<'a> ComponentContext<'a> {
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn rotation(&self) -> Quat {
        self.pose.rotation
    }

    /// Move the entity and announce it on `update.position`.
    pub fn set_position(&mut self, position: Vec3) {
        self.pose.position = position;
        self.mailbox.push_back(Envelope {
            sender: None,
            message: Message::PositionUpdate { value: position },
        });
    }

    /// Turn the entity and announce it on `update.rotation`.
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.pose.rotation = rotation;
        self.mailbox.push_back(Envelope {
            sender: None,
            message: Message::RotationUpdate { value: rotation },
        });
    }

    /// Queue `message` for every other sibling subscribed to its topic.
    ///
    /// Delivery happens as soon as the running hook returns, in attachment
    /// order, before the entity moves on.
    pub fn broadcast(&mut self, message: Message) {
        self.mailbox.push_back(Envelope {
            sender: Some(self.slot),
            message,
        });
    }

    /// Address a message to another entity. The manager delivers it once
    /// this entity's update has finished.
    pub fn send_to(&mut self, target: EntityId, message: Message) {
        self.outbox.push_back(Dispatch { target, message });
    }

    pub fn sibling<T: ComponentType>(&self) -> Option<&'a T> {
        self.siblings.get_as::<T>()
    }

    /// Like [`ComponentContext::sibling`], but a missing sibling is an error
    /// attributed to the running component.
    pub fn require_sibling<T: ComponentType>(&self) -> Result<&'a T, UpdateError> {
        self.sibling::<T>().ok_or_else(|| UpdateError::MissingSibling {
            entity: self.name.to_string(),
            component: self.kind,
            kind: T::KIND,
        })
    }

    pub fn siblings(&self) -> Siblings<'a> {
        self.siblings
    }

    /// Every other live entity. The entity being updated is not visible here.
    pub fn world(&self) -> &'a Entities {
        self.world
    }
}
