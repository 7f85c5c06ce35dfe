//! Placement math for the floorplan canvas. All values are canvas pixels.

use crate::models::mapping::WallSegment;

/// Canvas grid spacing; room cells are one grid step wide.
pub const GRID_PX: f64 = 20.0;
/// 20 px on the canvas is one foot.
pub const PIXELS_PER_FOOT: f64 = 20.0;
/// A dragged device within this distance of a room edge lands on the edge.
pub const EDGE_SNAP_PX: f64 = 12.0;
/// An erase click removes a wall closer than this.
pub const WALL_ERASE_PX: f64 = 10.0;
/// Press radius for picking up a device.
pub const DEVICE_HIT_PX: f64 = 16.0;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Inclusive on every edge.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }
}

/// Round to the nearest grid line; halves go up, like `Math.round` on the canvas.
pub fn snap_to_grid(value: f64, grid: f64) -> f64 {
    (value / grid + 0.5).floor() * grid
}

pub fn snap_point_to_grid(p: Point, grid: f64) -> Point {
    Point::new(snap_to_grid(p.x, grid), snap_to_grid(p.y, grid))
}

/// Perpendicular distance from `p` to the infinite line through the wall.
///
/// A zero-length wall has no direction; its distance is the distance to its
/// single endpoint instead of a division by zero.
pub fn wall_distance(wall: &WallSegment, p: Point) -> f64 {
    let dx = wall.x2 - wall.x1;
    let dy = wall.y2 - wall.y1;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return Point::new(wall.x1, wall.y1).distance(p);
    }
    (dx * (wall.y1 - p.y) - (wall.x1 - p.x) * dy).abs() / len
}

/// Pull a device position onto nearby room edges.
///
/// Rooms are checked in order and each check sees the result of the previous
/// one, so a later room overrides an earlier snap.
pub fn snap_to_room_edges(p: Point, rooms: &[Rect], threshold: f64) -> Point {
    let (mut nx, mut ny) = (p.x, p.y);
    for r in rooms {
        let in_vertical_span = |y: f64| y >= r.y && y <= r.bottom();
        let in_horizontal_span = |x: f64| x >= r.x && x <= r.right();

        if (nx - r.x).abs() < threshold && in_vertical_span(ny) {
            nx = r.x;
        }
        if (nx - r.right()).abs() < threshold && in_vertical_span(ny) {
            nx = r.right();
        }
        if (ny - r.y).abs() < threshold && in_horizontal_span(nx) {
            ny = r.y;
        }
        if (ny - r.bottom()).abs() < threshold && in_horizontal_span(nx) {
            ny = r.bottom();
        }
    }
    Point::new(nx, ny)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect { x, y, w, h }
    }

    #[test]
    fn grid_snap_rounds_halves_up() {
        assert_eq!(snap_to_grid(29.0, GRID_PX), 20.0);
        assert_eq!(snap_to_grid(30.0, GRID_PX), 40.0);
        assert_eq!(snap_to_grid(-30.0, GRID_PX), -20.0);
        assert_eq!(snap_to_grid(-31.0, GRID_PX), -40.0);
    }

    #[test]
    fn wall_distance_is_perpendicular() {
        let wall = WallSegment::new(0.0, 0.0, 100.0, 0.0);
        assert_eq!(wall_distance(&wall, Point::new(50.0, 7.0)), 7.0);
        // infinite line, not the segment
        assert_eq!(wall_distance(&wall, Point::new(500.0, -3.0)), 3.0);
    }

    #[test]
    fn zero_length_wall_uses_point_distance() {
        let wall = WallSegment::new(10.0, 10.0, 10.0, 10.0);
        let d = wall_distance(&wall, Point::new(13.0, 14.0));
        assert_eq!(d, 5.0);
    }

    #[test]
    fn device_snaps_exactly_to_left_edge() {
        let rooms = [rect(100.0, 100.0, 120.0, 80.0)];
        let p = snap_to_room_edges(Point::new(109.0, 140.0), &rooms, EDGE_SNAP_PX);
        assert_eq!(p, Point::new(100.0, 140.0));
    }

    #[test]
    fn device_snaps_to_bottom_edge_within_span() {
        let rooms = [rect(100.0, 100.0, 120.0, 80.0)];
        let p = snap_to_room_edges(Point::new(160.0, 191.0), &rooms, EDGE_SNAP_PX);
        assert_eq!(p, Point::new(160.0, 180.0));
    }

    #[test]
    fn no_snap_outside_edge_span() {
        let rooms = [rect(100.0, 100.0, 120.0, 80.0)];
        let p = Point::new(105.0, 300.0);
        assert_eq!(snap_to_room_edges(p, &rooms, EDGE_SNAP_PX), p);
    }

    #[test]
    fn later_room_overrides_earlier_snap() {
        // shared vertical line region: first room's right edge at 200, second room's left edge at 206
        let rooms = [rect(100.0, 0.0, 100.0, 100.0), rect(206.0, 0.0, 100.0, 100.0)];
        let p = snap_to_room_edges(Point::new(203.0, 50.0), &rooms, EDGE_SNAP_PX);
        assert_eq!(p.x, 206.0);
    }

    #[test]
    fn vertical_checks_see_horizontal_snap() {
        let rooms = [rect(0.0, 0.0, 100.0, 100.0)];
        // x snaps to the right edge first, which puts it inside the bottom edge's span
        let p = snap_to_room_edges(Point::new(104.0, 95.0), &rooms, EDGE_SNAP_PX);
        assert_eq!(p, Point::new(100.0, 100.0));

        // y snaps last, so x is judged against the unsnapped y
        let p = snap_to_room_edges(Point::new(95.0, 104.0), &rooms, EDGE_SNAP_PX);
        assert_eq!(p, Point::new(95.0, 100.0));
    }
}
