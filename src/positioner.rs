// Window movement hysteresis.
//
// The overlay only moves (and the region is only recaptured) when the target
// top-left has drifted past `move_dead_zone` on some axis since the last
// committed placement. Recapture work therefore scales with dead-zone
// crossings, not with ticks.
//
// Placement is two-phase: `WindowPositioner::propose` decides, the caller
// captures while the window is still where it was, and only a successful
// capture is followed by `WindowPositioner::commit` and the actual move.

use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Nothing committed yet: place right away.
    Initial { to: Point },
    /// Target crossed the dead zone.
    Move { from: Point, to: Point },
}

impl Placement {
    pub fn target(&self) -> Point {
        match *self {
            Placement::Initial { to } | Placement::Move { to, .. } => to,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WindowPositioner {
    move_dead_zone: u32,
    last: Option<Point>,
}

impl WindowPositioner {
    pub fn new(move_dead_zone: u32) -> Self {
        Self { move_dead_zone, last: None }
    }

    /// `Some` iff the window should be repositioned to `target` this tick.
    pub fn propose(&self, target: Point) -> Option<Placement> {
        let Some(last) = self.last else {
            return Some(Placement::Initial { to: target });
        };
        let dz = i64::from(self.move_dead_zone);
        let dx = (i64::from(target.x) - i64::from(last.x)).abs();
        let dy = (i64::from(target.y) - i64::from(last.y)).abs();
        (dx > dz || dy > dz).then_some(Placement::Move { from: last, to: target })
    }

    pub fn commit(&mut self, placement: Placement) {
        self.last = Some(placement.target());
    }

    /// Last committed top-left.
    #[cfg(test)]
    pub fn last(&self) -> Option<Point> {
        self.last
    }

    /// Forget the committed position so the next proposal is `Initial`.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_target_is_placed_immediately() {
        let pos = WindowPositioner::new(20);
        assert_eq!(pos.propose(Point::new(5, 5)), Some(Placement::Initial { to: Point::new(5, 5) }));
    }

    #[test]
    fn moves_iff_an_axis_exceeds_dead_zone() {
        let mut pos = WindowPositioner::new(20);
        pos.commit(Placement::Initial { to: Point::new(100, 100) });

        for (x, y, expect_move) in [
            (120, 100, false),
            (80, 120, false),
            (121, 100, true),
            (100, 79, true),
            (100, 100, false),
            (300, 300, true),
        ] {
            let target = Point::new(x, y);
            assert_eq!(pos.propose(target).is_some(), expect_move, "target {target:?}");
        }
    }

    #[test]
    fn hysteresis_is_measured_from_last_commit() {
        let mut pos = WindowPositioner::new(20);
        pos.commit(Placement::Initial { to: Point::new(0, 0) });

        // 15px is inside the zone, 30px from the committed spot is not
        assert_eq!(pos.propose(Point::new(15, 0)), None);
        let step = pos.propose(Point::new(30, 0)).unwrap();
        assert_eq!(step, Placement::Move { from: Point::new(0, 0), to: Point::new(30, 0) });

        pos.commit(step);
        assert_eq!(pos.last(), Some(Point::new(30, 0)));
        assert_eq!(pos.propose(Point::new(45, 0)), None);
    }

    #[test]
    fn uncommitted_proposal_leaves_state_alone() {
        let mut pos = WindowPositioner::new(20);
        pos.commit(Placement::Initial { to: Point::new(0, 0) });
        assert!(pos.propose(Point::new(500, 0)).is_some());
        assert_eq!(pos.last(), Some(Point::new(0, 0)));

        pos.reset();
        assert_eq!(pos.last(), None);
        assert_eq!(pos.propose(Point::new(1, 1)), Some(Placement::Initial { to: Point::new(1, 1) }));
    }
}
