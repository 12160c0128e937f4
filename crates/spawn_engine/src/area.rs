/// Inclusive pixel extents of an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Saturates at `i32::MAX` for extents that span most of the `i32` range.
    pub fn width(&self) -> i32 {
        inclusive_extent(self.min_x, self.max_x)
    }

    pub fn height(&self) -> i32 {
        inclusive_extent(self.min_y, self.max_y)
    }
}

fn inclusive_extent(min: i32, max: i32) -> i32 {
    let extent = i64::from(max) - i64::from(min) + 1;
    extent.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Read-only geometry the spawn planner needs from whatever region it plans for.
pub trait AreaBounds {
    fn bounds(&self) -> Bounds;
}

impl AreaBounds for Bounds {
    fn bounds(&self) -> Bounds {
        *self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Area {
    name: String,
    points: Vec<(i32, i32)>,
}

impl Area {
    pub fn from_points(name: impl Into<String>, points: Vec<(i32, i32)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Axis-aligned rectangle centered on `(cx, cy)`.
    pub fn rect(name: impl Into<String>, cx: i32, cy: i32, width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let left = cx.saturating_sub(width / 2);
        let top = cy.saturating_sub(height / 2);
        let right = left.saturating_add(width - 1);
        let bottom = top.saturating_add(height - 1);
        Self::from_points(
            name,
            vec![(left, top), (right, top), (right, bottom), (left, bottom)],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AreaBounds for Area {
    fn bounds(&self) -> Bounds {
        let mut iter = self.points.iter();
        let Some(&(first_x, first_y)) = iter.next() else {
            return Bounds::default();
        };
        iter.fold(
            Bounds::new(first_x, first_y, first_x, first_y),
            |acc, &(x, y)| Bounds {
                min_x: acc.min_x.min(x),
                min_y: acc.min_y.min(y),
                max_x: acc.max_x.max(x),
                max_y: acc.max_y.max(y),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_bounds_cover_all_points() {
        let area = Area::from_points("room", vec![(10, 5), (-3, 20), (7, -8)]);
        assert_eq!(area.bounds(), Bounds::new(-3, -8, 10, 20));
        assert_eq!(area.bounds().width(), 14);
        assert_eq!(area.bounds().height(), 29);
    }

    #[test]
    fn empty_polygon_has_zero_bounds() {
        let area = Area::from_points("empty", Vec::new());
        assert_eq!(area.bounds(), Bounds::default());
    }

    #[test]
    fn rect_spans_requested_size() {
        let area = Area::rect("room", 50, 25, 100, 50);
        let bounds = area.bounds();
        assert_eq!(bounds, Bounds::new(0, 0, 99, 49));
        assert_eq!(bounds.width(), 100);
        assert_eq!(bounds.height(), 50);
        assert_eq!(area.name(), "room");
    }

    #[test]
    fn extents_saturate_instead_of_overflowing() {
        let widest = Bounds::new(i32::MIN, 0, i32::MAX, -1);
        assert_eq!(widest.width(), i32::MAX);
        assert_eq!(widest.height(), 0);
        let rect = Area::rect("huge", i32::MAX, i32::MIN, i32::MAX, i32::MAX).bounds();
        assert_eq!(rect.max_x, i32::MAX);
        assert_eq!(rect.min_y, i32::MIN);
    }
}
