//! Multi-point technical patterns and their informational rule checks.
//!
//! Rule violations never block creation; they are surfaced next to the
//! drawing so the user can judge the count.

use crate::coords::CoordinateMapper;
use crate::model::{AnchorPoint, Drawing, DrawingKind};
use eframe::egui;

use super::{Geometry, KindHandler, anchor_handles, project_all};

pub(super) static ELLIOTT_WAVE: KindHandler = KindHandler {
    labels: &["0", "1", "2", "3", "4", "5"],
    phases: &[],
    fill: false,
    handles: anchor_handles,
    build: elliott_wave,
    validate: Some(elliott_violations),
};

pub(super) static HEAD_AND_SHOULDERS: KindHandler = KindHandler {
    labels: &["LS", "Head", "RS", "NL1", "NL2"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: head_and_shoulders,
    validate: Some(head_and_shoulders_violations),
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Wave2Retrace,
    Wave4Overlap,
    Wave3Shortest,
    HeadNotExtreme,
    StopOnWrongSide,
    TargetOnWrongSide,
}

impl Rule {
    pub fn message(self) -> &'static str {
        match self {
            Rule::Wave2Retrace => "Wave 2 retraces beyond the start of wave 1",
            Rule::Wave4Overlap => "Wave 4 overlaps the price territory of wave 1",
            Rule::Wave3Shortest => "Wave 3 is the shortest of waves 1, 3 and 5",
            Rule::HeadNotExtreme => "Head does not exceed both shoulders",
            Rule::StopOnWrongSide => "Stop is on the profit side of the entry",
            Rule::TargetOnWrongSide => "Target is on the loss side of the entry",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuleViolation {
    pub rule: Rule,
    pub message: String,
}

impl From<Rule> for RuleViolation {
    fn from(rule: Rule) -> Self {
        Self {
            rule,
            message: rule.message().to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Bullish,
    Bearish,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PatternAnalysis {
    ElliottWave {
        direction: Direction,
        violations: Vec<RuleViolation>,
    },
    HeadAndShoulders {
        inverse: bool,
        violations: Vec<RuleViolation>,
    },
}

/// Pattern summary for pattern kinds with the right number of points.
pub fn analyze(kind: DrawingKind, points: &[AnchorPoint]) -> Option<PatternAnalysis> {
    match kind {
        DrawingKind::ElliottWave if points.len() == 6 => Some(PatternAnalysis::ElliottWave {
            direction: elliott_direction(points)?,
            violations: elliott_violations(points),
        }),
        DrawingKind::HeadAndShoulders if points.len() == 5 => {
            Some(PatternAnalysis::HeadAndShoulders {
                inverse: is_inverse(points)?,
                violations: head_and_shoulders_violations(points),
            })
        }
        _ => None,
    }
}

pub fn elliott_direction(points: &[AnchorPoint]) -> Option<Direction> {
    let (p0, p1) = (points.first()?, points.get(1)?);
    Some(if p1.price > p0.price {
        Direction::Bullish
    } else {
        Direction::Bearish
    })
}

pub fn elliott_violations(points: &[AnchorPoint]) -> Vec<RuleViolation> {
    let [p0, p1, p2, p3, p4, p5] = match points {
        [a, b, c, d, e, f] => [a.price, b.price, c.price, d.price, e.price, f.price],
        _ => return Vec::new(),
    };
    let bullish = p1 > p0;
    let mut out = Vec::new();
    let retraced = if bullish { p2 < p0 } else { p2 > p0 };
    if retraced {
        out.push(Rule::Wave2Retrace.into());
    }
    let overlapped = if bullish { p4 < p1 } else { p4 > p1 };
    if overlapped {
        out.push(Rule::Wave4Overlap.into());
    }
    let (w1, w3, w5) = ((p1 - p0).abs(), (p3 - p2).abs(), (p5 - p4).abs());
    if w3 < w1 && w3 < w5 {
        out.push(Rule::Wave3Shortest.into());
    }
    out
}

/// `Head < LS && Head < RS`.
pub fn is_inverse(points: &[AnchorPoint]) -> Option<bool> {
    let (ls, head, rs) = (points.first()?, points.get(1)?, points.get(2)?);
    Some(head.price < ls.price && head.price < rs.price)
}

pub fn head_and_shoulders_violations(points: &[AnchorPoint]) -> Vec<RuleViolation> {
    let [ls, head, rs] = match points {
        [ls, head, rs, _, _] => [ls.price, head.price, rs.price],
        _ => return Vec::new(),
    };
    let top = head > ls && head > rs;
    let bottom = head < ls && head < rs;
    if top || bottom {
        Vec::new()
    } else {
        vec![Rule::HeadNotExtreme.into()]
    }
}

fn elliott_wave(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let pts = project_all::<6>(mapper, &drawing.points)?;
    let bullish = matches!(elliott_direction(&drawing.points), Some(Direction::Bullish));
    let mut g = Geometry::default();
    g.polyline(&pts);
    for (i, p) in pts.iter().enumerate() {
        // Peaks get captions above, troughs below.
        let peak = (i % 2 == 1) == bullish;
        let dy = if peak { -18.0 } else { 4.0 };
        g.text(*p + egui::vec2(-3.0, dy), i.to_string());
    }
    Some(g)
}

fn head_and_shoulders(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [ls, head, rs, nl1, nl2] = project_all::<5>(mapper, &drawing.points)?;
    let inverse = is_inverse(&drawing.points)?;
    let mut g = Geometry::default();
    g.fill(vec![nl1, head, nl2], drawing.fill());
    g.polyline(&[ls, nl1, head, nl2, rs]);

    let dx = nl2.x - nl1.x;
    if dx.abs() > f32::EPSILON {
        let slope = (nl2.y - nl1.y) / dx;
        let at = |x: f32| egui::pos2(x, nl1.y + slope * (x - nl1.x));
        g.dashed(at(ls.x.min(nl1.x)), at(rs.x.max(nl2.x)));
    } else {
        g.dashed(nl1, nl2);
    }

    let dy = if inverse { 4.0 } else { -18.0 };
    g.text(ls + egui::vec2(-6.0, dy), "LS");
    g.text(rs + egui::vec2(-6.0, dy), "RS");
    let caption = if inverse { "Inverse H&S" } else { "H&S" };
    g.text(head + egui::vec2(-12.0, dy), caption);
    Some(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(values: &[f64]) -> Vec<AnchorPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, p)| AnchorPoint::new(i as i64 * 60_000, *p))
            .collect()
    }

    #[test]
    fn textbook_impulse_has_no_violations() {
        let pts = prices(&[100.0, 110.0, 104.0, 125.0, 115.0, 130.0]);
        assert_eq!(elliott_direction(&pts), Some(Direction::Bullish));
        assert!(elliott_violations(&pts).is_empty());
    }

    #[test]
    fn bearish_rules_are_mirrored() {
        let pts = prices(&[100.0, 90.0, 102.0, 80.0, 92.0, 70.0]);
        let rules: Vec<Rule> = elliott_violations(&pts).iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![Rule::Wave2Retrace, Rule::Wave4Overlap]);
    }

    #[test]
    fn short_wave_three_is_flagged() {
        let pts = prices(&[100.0, 110.0, 105.0, 108.0, 107.0, 120.0]);
        let rules: Vec<Rule> = elliott_violations(&pts).iter().map(|v| v.rule).collect();
        assert!(rules.contains(&Rule::Wave3Shortest));
    }

    #[test]
    fn flat_head_is_not_extreme() {
        let pts = prices(&[100.0, 105.0, 110.0, 95.0, 95.0]);
        assert_eq!(
            head_and_shoulders_violations(&pts),
            vec![RuleViolation::from(Rule::HeadNotExtreme)]
        );
    }
}
