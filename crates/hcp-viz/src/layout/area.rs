//! Plot area geometry.

/// Rectangular plot area within the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    /// Left edge (pt)
    pub left: f64,
    /// Top edge (pt)
    pub top: f64,
    /// Width (pt)
    pub width: f64,
    /// Height (pt)
    pub height: f64,
}

impl PlotArea {
    /// Area from explicit margins; never smaller than 50pt a side.
    pub fn from_margins(
        canvas_w: f64,
        canvas_h: f64,
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    ) -> Self {
        Self {
            left,
            top,
            width: (canvas_w - left - right).max(50.0),
            height: (canvas_h - top - bottom).max(50.0),
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margins_are_subtracted() {
        let a = PlotArea::from_margins(500.0, 400.0, 60.0, 40.0, 20.0, 50.0);
        assert_eq!(a.right(), 480.0);
        assert_eq!(a.bottom(), 350.0);
        let tiny = PlotArea::from_margins(80.0, 80.0, 60.0, 40.0, 20.0, 50.0);
        assert_eq!(tiny.width, 50.0);
    }
}
