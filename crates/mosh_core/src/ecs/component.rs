// component.rs - Component capability and type tags
//
// Components are identified by a stable string tag rather than a Rust
// TypeId so the tag can appear in logs, errors and configuration.

use crate::ecs::{ComponentContext, ConfigError, InitContext, Message, UpdateError};
use std::any::Any;
use std::fmt;

/// Stable type tag identifying a component kind. An entity holds at most one
/// component per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentKind(&'static str);

impl ComponentKind {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Object-safe access to `Any` for downcasting boxed components.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of per-entity behavior.
///
/// Every hook is optional. `init_component` runs exactly once, after all
/// siblings are attached; it is the only place a component may subscribe to
/// topics. `on_message` only sees topics the component subscribed to.
/// `teardown` runs once when the entity leaves its manager and must release
/// anything the component registered outside the entity.
pub trait Component: AsAny {
    fn init_component(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        Ok(())
    }

    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<(), UpdateError> {
        Ok(())
    }

    fn on_message(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        _message: &Message,
    ) -> Result<(), UpdateError> {
        Ok(())
    }

    fn teardown(&mut self) {}
}

/// Components with a compile-time kind, usable with typed lookups.
pub trait ComponentType: Component + Sized {
    const KIND: ComponentKind;
}

/// Downcast a type-erased component to its concrete type.
pub(crate) fn downcast<T: ComponentType>(component: &dyn Component) -> Option<&T> {
    AsAny::as_any(component).downcast_ref::<T>()
}

pub(crate) fn downcast_mut<T: ComponentType>(component: &mut dyn Component) -> Option<&mut T> {
    AsAny::as_any_mut(component).downcast_mut::<T>()
}

/// Helper macro to implement [`ComponentType`].
///
/// # Example
/// ```ignore
/// struct Lantern { lit: bool }
/// impl Component for Lantern {}
///
/// define_component!(Lantern, "Lantern");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::ComponentType for $ty {
            const KIND: $crate::ecs::ComponentKind = $crate::ecs::ComponentKind::new($name);
        }
    };
}
