//! Uniform spatial hash grid over a bounded rectangle of the x/z plane.
//!
//! Each client covers a rectangular footprint and is stored in every cell the
//! footprint overlaps. Clients remember which slot they occupy in each cell,
//! so removal is a swap-remove plus one back-pointer fix per cell.

use crate::ecs::{ConfigError, EntityId};
use glam::Vec2;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

new_key_type! {
    /// Handle to a grid client. Stale handles are ignored by every operation.
    pub struct ClientHandle;
}

/// Grid shared between the scene and every `SpatialGridController`.
pub type SharedGrid = Rc<RefCell<SpatialHashGrid>>;

/// Domain of the grid: `min` and `max` corners on the x/z plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl GridBounds {
    pub fn extent(&self) -> Vec2 {
        self.max - self.min
    }
}

/// Inclusive range of cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min: (usize, usize),
    max: (usize, usize),
}

impl CellRange {
    fn cells(self) -> impl Iterator<Item = (usize, usize)> {
        (self.min.1..=self.max.1)
            .flat_map(move |z| (self.min.0..=self.max.0).map(move |x| (x, z)))
    }
}

#[derive(Debug)]
struct Client {
    entity: EntityId,
    position: Vec2,
    size: Vec2,
    range: CellRange,
    /// `(cell index, slot within that cell)` for every occupied cell.
    slots: Vec<(usize, usize)>,
    /// Last query that returned this client.
    stamp: u64,
}

/// Read-only snapshot of a client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientView {
    pub entity: EntityId,
    pub position: Vec2,
    pub size: Vec2,
}

pub struct SpatialHashGrid {
    bounds: GridBounds,
    dims: (usize, usize),
    cell_size: Vec2,
    /// Row-major: `z * nx + x`.
    cells: Vec<Vec<ClientHandle>>,
    clients: SlotMap<ClientHandle, Client>,
    query_stamp: u64,
}

impl SpatialHashGrid {
    /// Build a grid over `[[min_x, min_z], [max_x, max_z]]` with `[nx, nz]`
    /// cells.
    pub fn new(bounds: [[f32; 2]; 2], dimensions: [usize; 2]) -> Result<Self, ConfigError> {
        let [[min_x, min_z], [max_x, max_z]] = bounds;
        let [nx, nz] = dimensions;
        if nx == 0 || nz == 0 {
            return Err(ConfigError::InvalidGrid {
                reason: format!("cell counts must be positive, got [{nx}, {nz}]"),
            });
        }
        let values = [min_x, min_z, max_x, max_z];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidGrid {
                reason: "bounds must be finite".to_string(),
            });
        }
        if max_x <= min_x || max_z <= min_z {
            return Err(ConfigError::InvalidGrid {
                reason: format!(
                    "empty extent [[{min_x}, {min_z}], [{max_x}, {max_z}]]"
                ),
            });
        }

        let bounds = GridBounds {
            min: Vec2::new(min_x, min_z),
            max: Vec2::new(max_x, max_z),
        };
        let cell_size = bounds.extent() / Vec2::new(nx as f32, nz as f32);
        debug!(?bounds, nx, nz, ?cell_size, "spatial grid created");
        Ok(Self {
            bounds,
            dims: (nx, nz),
            cell_size,
            cells: vec![Vec::new(); nx * nz],
            clients: SlotMap::with_key(),
            query_stamp: 0,
        })
    }

    /// Wrap in the shared handle components hold on to.
    pub fn shared(self) -> SharedGrid {
        Rc::new(RefCell::new(self))
    }

    /// Insert a client centered on `position` with footprint `size`.
    pub fn new_client(&mut self, entity: EntityId, position: Vec2, size: Vec2) -> ClientHandle {
        let size = size.max(Vec2::ZERO);
        let range = self.cell_range(position, size * 0.5);
        let handle = self.clients.insert(Client {
            entity,
            position,
            size,
            range,
            slots: Vec::new(),
            stamp: 0,
        });
        self.insert(handle);
        handle
    }

    /// Move a client. Cell membership is only rebuilt when the covered cell
    /// range changed. Returns `false` for stale handles.
    pub fn update_client(&mut self, handle: ClientHandle, position: Vec2) -> bool {
        let Some(client) = self.clients.get(handle) else {
            return false;
        };
        let range = self.cell_range(position, client.size * 0.5);
        let unchanged = client.range == range;

        if let Some(client) = self.clients.get_mut(handle) {
            client.position = position;
        }
        if unchanged {
            return true;
        }

        self.unlink(handle);
        if let Some(client) = self.clients.get_mut(handle) {
            client.range = range;
        }
        self.insert(handle);
        true
    }

    /// Remove a client from every cell it occupies. Returns `false` for
    /// stale handles.
    pub fn remove(&mut self, handle: ClientHandle) -> bool {
        if !self.clients.contains_key(handle) {
            return false;
        }
        self.unlink(handle);
        self.clients.remove(handle);
        true
    }

    /// Clients whose position lies within `radius` of `position`.
    ///
    /// Scans the cells covering `position ± radius` (clamped into the grid),
    /// then filters by exact distance. Each client appears once.
    pub fn find_near(&mut self, position: Vec2, radius: f32) -> Vec<ClientHandle> {
        let radius = if radius.is_nan() { 0.0 } else { radius.max(0.0) };
        let range = self.cell_range(position, Vec2::splat(radius));
        self.query_stamp += 1;
        let stamp = self.query_stamp;
        let radius_sq = radius * radius;

        let mut found = Vec::new();
        for (x, z) in range.cells() {
            let cell = z * self.dims.0 + x;
            for &handle in &self.cells[cell] {
                let Some(client) = self.clients.get_mut(handle) else {
                    continue;
                };
                if client.stamp == stamp {
                    continue;
                }
                client.stamp = stamp;
                if client.position.distance_squared(position) <= radius_sq {
                    found.push(handle);
                }
            }
        }
        found
    }

    pub fn client(&self, handle: ClientHandle) -> Option<ClientView> {
        self.clients.get(handle).map(|client| ClientView {
            entity: client.entity,
            position: client.position,
            size: client.size,
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /// `[nx, nz]`
    pub fn dims(&self) -> [usize; 2] {
        [self.dims.0, self.dims.1]
    }

    pub fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    /// Number of clients stored in cell `(x, z)`; 0 outside the grid.
    pub fn occupancy(&self, x: usize, z: usize) -> usize {
        if x >= self.dims.0 || z >= self.dims.1 {
            return 0;
        }
        self.cells[z * self.dims.0 + x].len()
    }

    /// Cells covering `center ± half_extent`, clamped into the grid.
    fn cell_range(&self, center: Vec2, half_extent: Vec2) -> CellRange {
        let lo = center - half_extent;
        let hi = center + half_extent;
        CellRange {
            min: (
                self.clamp_axis(lo.x, 0),
                self.clamp_axis(lo.y, 1),
            ),
            max: (
                self.clamp_axis(hi.x, 0),
                self.clamp_axis(hi.y, 1),
            ),
        }
    }

    fn clamp_axis(&self, value: f32, axis: usize) -> usize {
        let (origin, size, count) = match axis {
            0 => (self.bounds.min.x, self.cell_size.x, self.dims.0),
            _ => (self.bounds.min.y, self.cell_size.y, self.dims.1),
        };
        let cell = ((value - origin) / size).floor();
        if cell.is_nan() || cell <= 0.0 {
            0
        } else {
            (cell as usize).min(count - 1)
        }
    }

    fn insert(&mut self, handle: ClientHandle) {
        let Some(client) = self.clients.get_mut(handle) else {
            return;
        };
        let nx = self.dims.0;
        client.slots.clear();
        for (x, z) in client.range.cells() {
            let cell = z * nx + x;
            client.slots.push((cell, self.cells[cell].len()));
            self.cells[cell].push(handle);
        }
    }

    fn unlink(&mut self, handle: ClientHandle) {
        let Some(client) = self.clients.get_mut(handle) else {
            return;
        };
        let slots = std::mem::take(&mut client.slots);
        for (cell, slot) in slots {
            let members = &mut self.cells[cell];
            members.swap_remove(slot);
            // The former last member now lives at `slot`; fix its back-pointer.
            if let Some(&moved) = members.get(slot) {
                if let Some(moved) = self.clients.get_mut(moved) {
                    if let Some(entry) = moved.slots.iter_mut().find(|(c, _)| *c == cell) {
                        entry.1 = slot;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let mut stored = 0;
        for (cell, members) in self.cells.iter().enumerate() {
            for (slot, &handle) in members.iter().enumerate() {
                let client = self.clients.get(handle).expect("dangling handle in cell");
                assert!(client.slots.contains(&(cell, slot)));
                stored += 1;
            }
        }
        let expected: usize = self.clients.values().map(|c| c.slots.len()).sum();
        assert_eq!(stored, expected);
        for client in self.clients.values() {
            let range = self.cell_range(client.position, client.size * 0.5);
            assert_eq!(client.range, range, "membership out of date");
            assert_eq!(client.slots.len(), range.cells().count());
        }
    }
}

impl std::fmt::Debug for SpatialHashGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialHashGrid")
            .field("bounds", &self.bounds)
            .field("dims", &self.dims)
            .field("clients", &self.clients.len())
            .finish()
    }
}
