use geo::{CoordNum, Rect};

use crate::errors::{InputDataError, Result};

pub trait Intersection {
    type Output;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output>;
}

/// Rectangles that only touch along an edge have no intersection.
impl<T: CoordNum> Intersection for Rect<T> {
    type Output = Rect<T>;
    fn intersection(&self, rhs: &Self) -> Result<Rect<T>> {
        let lhs_max = self.max();
        let rhs_min = rhs.min();
        if (lhs_max.x <= rhs_min.x) | (lhs_max.y <= rhs_min.y) {
            return Err(InputDataError::NoIntersection.into());
        }

        let lhs_min = self.min();
        let rhs_max = rhs.max();
        if (lhs_min.x >= rhs_max.x) | (lhs_min.y >= rhs_max.y) {
            return Err(InputDataError::NoIntersection.into());
        }

        let max_of = |x: T, y: T| if x > y { x } else { y };
        let min_of = |x: T, y: T| if x < y { x } else { y };
        let min = (max_of(lhs_min.x, rhs_min.x), max_of(lhs_min.y, rhs_min.y));
        let max = (min_of(lhs_max.x, rhs_max.x), min_of(lhs_max.y, rhs_max.y));

        Ok(Self::new(min, max))
    }
}
