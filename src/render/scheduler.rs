use eframe::egui;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepaintReason {
    Data,
    Viewport,
    Resize,
    Hover,
    Interaction,
}

impl RepaintReason {
    fn bit(self) -> u8 {
        match self {
            RepaintReason::Data => 1,
            RepaintReason::Viewport => 1 << 1,
            RepaintReason::Resize => 1 << 2,
            RepaintReason::Hover => 1 << 3,
            RepaintReason::Interaction => 1 << 4,
        }
    }
}

/// The set of reasons merged into one pending paint.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Reasons(u8);

impl Reasons {
    pub fn contains(self, reason: RepaintReason) -> bool {
        self.0 & reason.bit() != 0
    }

    pub fn insert(&mut self, reason: RepaintReason) {
        self.0 |= reason.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Reasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all = [
            RepaintReason::Data,
            RepaintReason::Viewport,
            RepaintReason::Resize,
            RepaintReason::Hover,
            RepaintReason::Interaction,
        ];
        f.debug_set()
            .entries(all.into_iter().filter(|r| self.contains(*r)))
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTicket {
    pub id: u64,
    pub reasons: Reasons,
}

/// Single-slot paint scheduler. A new request cancels the pending ticket and
/// replaces it, so any burst of triggers within a frame yields one paint.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: Option<FrameTicket>,
    next_id: u64,
    last_frame: Option<u64>,
    cancelled: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, reason: RepaintReason) -> u64 {
        let mut reasons = match self.pending.take() {
            Some(previous) => {
                self.cancelled += 1;
                previous.reasons
            }
            None => Reasons::default(),
        };
        reasons.insert(reason);
        self.next_id += 1;
        self.pending = Some(FrameTicket {
            id: self.next_id,
            reasons,
        });
        self.next_id
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<FrameTicket> {
        self.pending
    }

    /// Tickets replaced before they were painted.
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }

    /// Hands out the pending ticket, at most once per frame number.
    pub fn begin_frame(&mut self, frame: u64) -> Option<FrameTicket> {
        if self.last_frame == Some(frame) {
            return None;
        }
        let ticket = self.pending.take()?;
        self.last_frame = Some(frame);
        Some(ticket)
    }
}

/// Canvas dimensions in CSS (logical) pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    css: egui::Vec2,
    pixel_ratio: f32,
}

impl CanvasSize {
    pub fn new(width: f32, height: f32, pixel_ratio: f32) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        let clamp = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
        Self {
            css: egui::vec2(clamp(width), clamp(height)),
            pixel_ratio,
        }
    }

    pub fn css(&self) -> egui::Vec2 {
        self.css
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Backing-store size in physical pixels.
    pub fn physical(&self) -> [u32; 2] {
        [
            (self.css.x * self.pixel_ratio).round() as u32,
            (self.css.y * self.pixel_ratio).round() as u32,
        ]
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_of_requests_paints_once() {
        let mut s = FrameScheduler::new();
        s.request(RepaintReason::Data);
        s.request(RepaintReason::Hover);
        let last = s.request(RepaintReason::Viewport);
        assert_eq!(s.cancelled(), 2);

        let ticket = s.begin_frame(1).unwrap();
        assert_eq!(ticket.id, last);
        assert!(ticket.reasons.contains(RepaintReason::Data));
        assert!(ticket.reasons.contains(RepaintReason::Hover));
        assert!(!ticket.reasons.contains(RepaintReason::Resize));
        assert!(s.begin_frame(2).is_none());
    }

    #[test]
    fn one_paint_per_frame_number() {
        let mut s = FrameScheduler::new();
        s.request(RepaintReason::Data);
        assert!(s.begin_frame(7).is_some());
        s.request(RepaintReason::Interaction);
        assert!(s.begin_frame(7).is_none());
        assert!(s.begin_frame(8).is_some());
    }

    #[test]
    fn bad_pixel_ratio_falls_back_to_one() {
        assert_eq!(CanvasSize::new(100.0, 50.0, 0.0).pixel_ratio(), 1.0);
        assert_eq!(CanvasSize::new(100.0, 50.0, f32::NAN).pixel_ratio(), 1.0);
        assert_eq!(CanvasSize::new(100.5, 50.0, 2.0).physical(), [201, 100]);
    }
}
