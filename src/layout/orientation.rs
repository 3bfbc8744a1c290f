use crate::ir::Direction;

use super::tree::Geometry;
use super::types::Handle;

/// A node side expressed relative to the flow direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AxisSide {
    PrimaryStart,
    PrimaryEnd,
    CrossStart,
    CrossEnd,
}

/// Maps primary/cross coordinates onto x/y. Vertical layouts flow down the
/// y axis and spread along x; horizontal layouts swap the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Orientation {
    horizontal: bool,
}

impl Orientation {
    pub(super) fn new(direction: Direction) -> Self {
        Self {
            horizontal: direction.is_horizontal(),
        }
    }

    pub(super) fn primary_size(&self, g: &Geometry) -> f32 {
        if self.horizontal { g.width } else { g.height }
    }

    pub(super) fn cross_size(&self, g: &Geometry) -> f32 {
        if self.horizontal { g.height } else { g.width }
    }

    /// Leading edge along the primary axis.
    pub(super) fn primary(&self, g: &Geometry) -> f32 {
        if self.horizontal { g.x } else { g.y }
    }

    /// Leading edge along the cross axis.
    pub(super) fn cross(&self, g: &Geometry) -> f32 {
        if self.horizontal { g.y } else { g.x }
    }

    pub(super) fn cross_center(&self, g: &Geometry) -> f32 {
        self.cross(g) + self.cross_size(g) / 2.0
    }

    pub(super) fn set_position(&self, g: &mut Geometry, primary: f32, cross: f32) {
        if self.horizontal {
            g.x = primary;
            g.y = cross;
        } else {
            g.x = cross;
            g.y = primary;
        }
    }

    pub(super) fn subtree_cross(&self, g: &Geometry) -> f32 {
        if self.horizontal { g.subtree_height } else { g.subtree_width }
    }

    pub(super) fn set_subtree(&self, g: &mut Geometry, primary: f32, cross: f32) {
        if self.horizontal {
            g.subtree_width = primary;
            g.subtree_height = cross;
        } else {
            g.subtree_width = cross;
            g.subtree_height = primary;
        }
    }

    /// Splits a `(width, height)` pair into `(primary, cross)`.
    pub(super) fn split_size(&self, size: (f32, f32)) -> (f32, f32) {
        if self.horizontal { size } else { (size.1, size.0) }
    }

    pub(super) fn point(&self, primary: f32, cross: f32) -> (f32, f32) {
        if self.horizontal {
            (primary, cross)
        } else {
            (cross, primary)
        }
    }

    pub(super) fn handle(&self, side: AxisSide) -> Handle {
        match (side, self.horizontal) {
            (AxisSide::PrimaryStart, false) => Handle::Top,
            (AxisSide::PrimaryEnd, false) => Handle::Bottom,
            (AxisSide::CrossStart, false) => Handle::Left,
            (AxisSide::CrossEnd, false) => Handle::Right,
            (AxisSide::PrimaryStart, true) => Handle::Left,
            (AxisSide::PrimaryEnd, true) => Handle::Right,
            (AxisSide::CrossStart, true) => Handle::Top,
            (AxisSide::CrossEnd, true) => Handle::Bottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_maps_primary_to_y() {
        let orient = Orientation::new(Direction::TopDown);
        let mut g = Geometry {
            width: 180.0,
            height: 56.0,
            ..Default::default()
        };
        orient.set_position(&mut g, 100.0, -90.0);
        assert_eq!((g.x, g.y), (-90.0, 100.0));
        assert_eq!(orient.primary_size(&g), 56.0);
        assert_eq!(orient.cross_center(&g), 0.0);
        assert_eq!(orient.point(1.0, 2.0), (2.0, 1.0));
        assert_eq!(orient.handle(AxisSide::PrimaryEnd), Handle::Bottom);
    }

    #[test]
    fn horizontal_maps_primary_to_x() {
        let orient = Orientation::new(Direction::LeftRight);
        let mut g = Geometry {
            width: 180.0,
            height: 56.0,
            ..Default::default()
        };
        orient.set_position(&mut g, 100.0, -28.0);
        assert_eq!((g.x, g.y), (100.0, -28.0));
        assert_eq!(orient.primary_size(&g), 180.0);
        assert_eq!(orient.split_size((180.0, 56.0)), (180.0, 56.0));
        assert_eq!(orient.handle(AxisSide::CrossEnd), Handle::Bottom);
    }
}
