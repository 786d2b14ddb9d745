//! Pure step navigation.
//!
//! Same inputs always yield the same output; boundary violations never
//! mutate anything because there is nothing here to mutate. Step counts
//! come from the catalog adapters and must be derived the same way
//! wherever bounds are checked.

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Compute the next step index, or signal the boundary that blocks it.
pub fn advance(current: usize, total: usize, direction: Direction) -> Result<usize, SessionError> {
    match direction {
        Direction::Forward => {
            if current + 1 < total {
                Ok(current + 1)
            } else {
                Err(SessionError::AtLastStep)
            }
        }
        Direction::Backward => {
            if current > 0 {
                Ok(current - 1)
            } else {
                Err(SessionError::AtFirstStep)
            }
        }
    }
}

pub fn in_bounds(index: usize, total: usize) -> bool {
    index < total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_within_bounds() {
        assert_eq!(advance(0, 3, Direction::Forward), Ok(1));
        assert_eq!(advance(1, 3, Direction::Forward), Ok(2));
    }

    #[test]
    fn forward_at_last_step_fails() {
        assert_eq!(advance(2, 3, Direction::Forward), Err(SessionError::AtLastStep));
        // single-step activity is already at its last step
        assert_eq!(advance(0, 1, Direction::Forward), Err(SessionError::AtLastStep));
    }

    #[test]
    fn backward_within_bounds() {
        assert_eq!(advance(2, 3, Direction::Backward), Ok(1));
    }

    #[test]
    fn backward_at_first_step_fails() {
        assert_eq!(advance(0, 3, Direction::Backward), Err(SessionError::AtFirstStep));
    }

    #[test]
    fn same_inputs_same_outputs() {
        for _ in 0..3 {
            assert_eq!(advance(1, 5, Direction::Forward), Ok(2));
        }
    }

    #[test]
    fn bounds_check() {
        assert!(in_bounds(0, 1));
        assert!(in_bounds(2, 3));
        assert!(!in_bounds(3, 3));
        assert!(!in_bounds(0, 0));
    }
}
