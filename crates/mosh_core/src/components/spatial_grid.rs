//! Keeps an entity's grid client in step with its pose.

use crate::define_component;
use crate::ecs::query::{ClientHandle, SharedGrid};
use crate::ecs::{
    topics, Component, ComponentContext, ConfigError, EntityId, InitContext, Message, UpdateError,
};
use crate::math::{planar, Vec2, Vec3};
use tracing::warn;

/// One result of [`SpatialGridController::find_nearby_entities`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearby {
    pub entity: EntityId,
    /// Last position recorded in the grid (x/z plane).
    pub position: Vec2,
    /// Planar distance from the querying entity.
    pub distance: f32,
}

pub struct SpatialGridController {
    grid: SharedGrid,
    footprint: Vec2,
    client: Option<ClientHandle>,
}

impl SpatialGridController {
    pub fn new(grid: SharedGrid) -> Self {
        Self {
            grid,
            footprint: Vec2::ONE,
            client: None,
        }
    }

    pub fn client(&self) -> Option<ClientHandle> {
        self.client
    }

    /// Entities whose grid position lies within `radius` of this one,
    /// excluding itself. Empty before initialization.
    pub fn find_nearby_entities(&self, radius: f32) -> Vec<Nearby> {
        let Some(own) = self.client else {
            return Vec::new();
        };
        let mut grid = self.grid.borrow_mut();
        let Some(center) = grid.client(own).map(|view| view.position) else {
            return Vec::new();
        };
        let handles = grid.find_near(center, radius);
        handles
            .into_iter()
            .filter(|handle| *handle != own)
            .filter_map(|handle| grid.client(handle))
            .map(|view| Nearby {
                entity: view.entity,
                position: view.position,
                distance: view.position.distance(center),
            })
            .collect()
    }

    fn release(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        match self.grid.try_borrow_mut() {
            Ok(mut grid) => {
                grid.remove(client);
            }
            Err(_) => warn!("spatial grid busy, client leaked"),
        }
    }

    fn push(&self, position: Vec3) {
        if let Some(client) = self.client {
            self.grid.borrow_mut().update_client(client, planar(position));
        }
    }
}

impl Component for SpatialGridController {
    fn init_component(&mut self, ctx: &mut InitContext<'_>) -> Result<(), ConfigError> {
        let handle =
            self.grid
                .borrow_mut()
                .new_client(ctx.entity(), planar(ctx.position()), self.footprint);
        self.client = Some(handle);
        ctx.subscribe(topics::UPDATE_POSITION);
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, _dt: f32) -> Result<(), UpdateError> {
        self.push(ctx.position());
        Ok(())
    }

    fn on_message(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        message: &Message,
    ) -> Result<(), UpdateError> {
        if let Message::PositionUpdate { value } = message {
            self.push(*value);
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.release();
    }
}
define_component!(SpatialGridController, "SpatialGridController");

impl Drop for SpatialGridController {
    fn drop(&mut self) {
        self.release();
    }
}
