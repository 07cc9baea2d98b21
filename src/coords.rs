use eframe::egui;

/// Pixel coordinates further than this from the pane origin are treated as
/// unrepresentable.
pub const MAX_COORDINATE: f32 = 1.0e6;

/// The chart engine's viewport as seen from the drawing layer. Coordinates are
/// pane-local pixels; every conversion may be unavailable.
pub trait Viewport {
    fn time_to_coordinate(&self, time_ms: i64) -> Option<f32>;
    fn coordinate_to_time(&self, x: f32) -> Option<i64>;
    fn price_to_coordinate(&self, price: f64) -> Option<f32>;
    fn coordinate_to_price(&self, y: f32) -> Option<f64>;
    /// `None` until the pane has been laid out.
    fn pane_size(&self) -> Option<egui::Vec2>;
}

/// Guarded, non-blocking conversions between domain and pixel space.
#[derive(Clone, Copy)]
pub struct CoordinateMapper<'a> {
    viewport: &'a dyn Viewport,
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(viewport: &'a dyn Viewport) -> Self {
        Self { viewport }
    }

    /// Laid-out pane size, or `None` while the pane is unmounted or empty.
    pub fn pane(&self) -> Option<egui::Vec2> {
        self.viewport
            .pane_size()
            .filter(|s| s.x.is_finite() && s.y.is_finite() && s.x > 0.0 && s.y > 0.0)
    }

    pub fn time_to_x(&self, time_ms: i64) -> Option<f32> {
        self.pane()?;
        self.viewport
            .time_to_coordinate(time_ms)
            .filter(|x| representable(*x))
    }

    pub fn x_to_time(&self, x: f32) -> Option<i64> {
        self.pane()?;
        if !representable(x) {
            return None;
        }
        self.viewport.coordinate_to_time(x)
    }

    pub fn price_to_y(&self, price: f64) -> Option<f32> {
        self.pane()?;
        if !price.is_finite() {
            return None;
        }
        self.viewport
            .price_to_coordinate(price)
            .filter(|y| representable(*y))
    }

    pub fn y_to_price(&self, y: f32) -> Option<f64> {
        self.pane()?;
        if !representable(y) {
            return None;
        }
        self.viewport
            .coordinate_to_price(y)
            .filter(|p| p.is_finite())
    }

    pub fn to_screen(&self, time_ms: i64, price: f64) -> Option<egui::Pos2> {
        Some(egui::pos2(self.time_to_x(time_ms)?, self.price_to_y(price)?))
    }

    pub fn to_domain(&self, pos: egui::Pos2) -> Option<crate::model::AnchorPoint> {
        Some(crate::model::AnchorPoint::new(
            self.x_to_time(pos.x)?,
            self.y_to_price(pos.y)?,
        ))
    }
}

fn representable(v: f32) -> bool {
    v.is_finite() && v.abs() <= MAX_COORDINATE
}

/// A linear time/price viewport. Stands in for the embedded chart engine in
/// the desktop host and in tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearViewport {
    size: egui::Vec2,
    time_start: i64,
    time_end: i64,
    price_low: f64,
    price_high: f64,
}

impl LinearViewport {
    pub fn new(time_start: i64, time_end: i64, price_low: f64, price_high: f64) -> Self {
        Self {
            size: egui::Vec2::ZERO,
            time_start,
            time_end,
            price_low,
            price_high,
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.set_size(egui::vec2(width, height));
        self
    }

    /// Returns true when the size actually changed.
    pub fn set_size(&mut self, size: egui::Vec2) -> bool {
        if self.size == size {
            return false;
        }
        self.size = size;
        true
    }

    pub fn time_range(&self) -> (i64, i64) {
        (self.time_start, self.time_end)
    }

    pub fn price_range(&self) -> (f64, f64) {
        (self.price_low, self.price_high)
    }

    fn time_span(&self) -> f64 {
        self.time_end as f64 - self.time_start as f64
    }

    fn price_span(&self) -> f64 {
        self.price_high - self.price_low
    }

    fn ready(&self) -> bool {
        self.size.x > 0.0 && self.size.y > 0.0 && self.time_span() > 0.0 && self.price_span() > 0.0
    }

    /// Drags the visible window by a pixel delta, like grabbing the chart.
    pub fn pan_by(&mut self, delta: egui::Vec2) {
        if !self.ready() {
            return;
        }
        let dt = (f64::from(delta.x) / f64::from(self.size.x) * self.time_span()).round() as i64;
        let dp = f64::from(delta.y) / f64::from(self.size.y) * self.price_span();
        self.time_start = self.time_start.saturating_sub(dt);
        self.time_end = self.time_end.saturating_sub(dt);
        self.price_low += dp;
        self.price_high += dp;
    }

    /// Zooms the time axis keeping the instant under `x` fixed. `factor > 1` zooms in.
    pub fn zoom_time_about(&mut self, x: f32, factor: f32) {
        if !self.ready() || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let Some(anchor) = self.coordinate_to_time(x) else {
            return;
        };
        let anchor = anchor as f64;
        let factor = f64::from(factor);
        let start = anchor - (anchor - self.time_start as f64) / factor;
        let end = anchor + (self.time_end as f64 - anchor) / factor;
        if end - start < 1.0 {
            return;
        }
        self.time_start = start.round() as i64;
        self.time_end = end.round() as i64;
    }

    /// Zooms the price axis keeping the price under `y` fixed.
    pub fn zoom_price_about(&mut self, y: f32, factor: f32) {
        if !self.ready() || !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let Some(anchor) = self.coordinate_to_price(y) else {
            return;
        };
        let factor = f64::from(factor);
        let low = anchor - (anchor - self.price_low) / factor;
        let high = anchor + (self.price_high - anchor) / factor;
        if high - low <= f64::EPSILON {
            return;
        }
        self.price_low = low;
        self.price_high = high;
    }

    /// Moves the visible window so it spans the given ranges.
    pub fn fit(&mut self, time: (i64, i64), price: (f64, f64)) {
        if time.1 > time.0 {
            self.time_start = time.0;
            self.time_end = time.1;
        }
        if price.1 > price.0 && price.0.is_finite() && price.1.is_finite() {
            self.price_low = price.0;
            self.price_high = price.1;
        }
    }
}

impl Viewport for LinearViewport {
    fn time_to_coordinate(&self, time_ms: i64) -> Option<f32> {
        if !self.ready() {
            return None;
        }
        let offset = time_ms.checked_sub(self.time_start)?;
        let x = offset as f64 / self.time_span() * f64::from(self.size.x);
        Some(x as f32)
    }

    fn coordinate_to_time(&self, x: f32) -> Option<i64> {
        if !self.ready() {
            return None;
        }
        let t = self.time_start as f64 + f64::from(x) / f64::from(self.size.x) * self.time_span();
        if !t.is_finite() || t.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(t.round() as i64)
    }

    fn price_to_coordinate(&self, price: f64) -> Option<f32> {
        if !self.ready() {
            return None;
        }
        let y = (self.price_high - price) / self.price_span() * f64::from(self.size.y);
        Some(y as f32)
    }

    fn coordinate_to_price(&self, y: f32) -> Option<f64> {
        if !self.ready() {
            return None;
        }
        Some(self.price_high - f64::from(y) / f64::from(self.size.y) * self.price_span())
    }

    fn pane_size(&self) -> Option<egui::Vec2> {
        self.ready().then_some(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlaid_out_viewport_is_unavailable() {
        let viewport = LinearViewport::new(0, 1_000, 0.0, 100.0);
        let mapper = CoordinateMapper::new(&viewport);
        assert_eq!(mapper.time_to_x(500), None);
        assert_eq!(mapper.y_to_price(10.0), None);
        assert_eq!(mapper.pane(), None);
    }

    #[test]
    fn linear_mapping_round_trips() {
        let viewport = LinearViewport::new(0, 1_000, 0.0, 100.0).with_size(500.0, 200.0);
        let mapper = CoordinateMapper::new(&viewport);
        assert_eq!(mapper.time_to_x(500), Some(250.0));
        assert_eq!(mapper.x_to_time(250.0), Some(500));
        assert_eq!(mapper.price_to_y(75.0), Some(50.0));
        assert_eq!(mapper.y_to_price(50.0), Some(75.0));
    }

    #[test]
    fn non_finite_and_far_values_are_unavailable() {
        let viewport = LinearViewport::new(0, 1_000, 0.0, 100.0).with_size(500.0, 200.0);
        let mapper = CoordinateMapper::new(&viewport);
        assert_eq!(mapper.price_to_y(f64::NAN), None);
        assert_eq!(mapper.price_to_y(1.0e12), None);
        assert_eq!(mapper.x_to_time(f32::INFINITY), None);
    }

    #[test]
    fn extreme_times_are_unavailable() {
        let viewport = LinearViewport::new(1_000, 2_000, 0.0, 100.0).with_size(500.0, 200.0);
        let mapper = CoordinateMapper::new(&viewport);
        assert_eq!(mapper.time_to_x(i64::MIN), None);
        assert_eq!(mapper.time_to_x(i64::MAX), None);

        let wide = LinearViewport::new(-1_000, 1_000, 0.0, 100.0).with_size(500.0, 200.0);
        let mapper = CoordinateMapper::new(&wide);
        assert_eq!(mapper.time_to_x(i64::MAX), None);
        assert_eq!(mapper.time_to_x(0), Some(250.0));
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut viewport = LinearViewport::new(0, 1_000, 0.0, 100.0).with_size(500.0, 200.0);
        viewport.zoom_time_about(250.0, 2.0);
        assert_eq!(viewport.time_range(), (250, 750));
        viewport.pan_by(egui::vec2(50.0, 0.0));
        assert_eq!(viewport.time_range(), (200, 700));
    }
}
