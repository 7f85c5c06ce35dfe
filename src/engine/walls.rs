use crate::engine::geometry::{Point, WALL_ERASE_PX, wall_distance};
use crate::models::mapping::WallSegment;

/// Wall segments of one floor, in drawing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WallModel {
    walls: Vec<WallSegment>,
}

impl WallModel {
    pub fn from_walls(walls: Vec<WallSegment>) -> Self {
        WallModel { walls }
    }

    pub fn walls(&self) -> &[WallSegment] {
        &self.walls
    }

    pub fn len(&self) -> usize {
        self.walls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }

    /// No geometric validation; zero-length walls are kept.
    pub fn add(&mut self, wall: WallSegment) {
        self.walls.push(wall);
    }

    /// First wall in list order closer than the erase threshold, if any.
    pub fn nearest_index(&self, p: Point) -> Option<usize> {
        self.walls.iter().position(|w| wall_distance(w, p) < WALL_ERASE_PX)
    }

    /// Remove the first wall within the erase threshold of `(mx, my)`.
    pub fn remove_nearest(&mut self, mx: f64, my: f64) -> Option<WallSegment> {
        let index = self.nearest_index(Point::new(mx, my))?;
        Some(self.walls.remove(index))
    }

    pub fn remove(&mut self, index: usize) -> Option<WallSegment> {
        (index < self.walls.len()).then(|| self.walls.remove(index))
    }
}
