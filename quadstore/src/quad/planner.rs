//! The 2-bound tie-break planner (Design Notes §9: "Decision of index for
//! 2-bound lookups ... fixes it as a static table `[s, o, p]` ... a test
//! hook must allow runtime override for empirical tuning").

/// A triple position, also naming which compound index owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    S,
    P,
    O,
}

/// Holds the rank order used to break ties between two bound positions.
/// Lower index in `order` wins. The default is `[S, O, P]`.
#[derive(Debug, Clone)]
pub struct Planner {
    order: [Position; 3],
}

impl Default for Planner {
    fn default() -> Self {
        Self { order: [Position::S, Position::O, Position::P] }
    }
}

impl Planner {
    /// Constructs a planner with an explicit rank order, for empirical
    /// tuning against DB statistics offline.
    pub fn with_order(order: [Position; 3]) -> Self {
        Self { order }
    }

    fn rank(&self, pos: Position) -> usize {
        self.order.iter().position(|&p| p == pos).expect("order always contains all positions")
    }

    /// Given the two bound positions of a 2-bound pattern, returns the one
    /// whose compound index should drive the scan.
    pub fn pick_driver(&self, a: Position, b: Position) -> Position {
        if self.rank(a) <= self.rank(b) {
            a
        } else {
            b
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_prefers_s_then_o_then_p() {
        let planner = Planner::default();
        assert_eq!(planner.pick_driver(Position::S, Position::P), Position::S);
        assert_eq!(planner.pick_driver(Position::O, Position::P), Position::O);
        assert_eq!(planner.pick_driver(Position::S, Position::O), Position::S);
    }

    #[test]
    fn override_order_is_honoured() {
        let planner = Planner::with_order([Position::P, Position::S, Position::O]);
        assert_eq!(planner.pick_driver(Position::S, Position::P), Position::P);
    }
}
