use crate::coords::CoordinateMapper;
use crate::model::{AnchorPoint, Drawing, Rgba};
use eframe::egui;

use super::patterns::{Rule, RuleViolation};
use super::{Geometry, KindHandler, anchor_handles, project_all};

const PROFIT: Rgba = Rgba::rgb(8, 153, 129);
const LOSS: Rgba = Rgba::rgb(242, 54, 69);
const DEFAULT_ZONE_OPACITY: f32 = 0.2;
const MIN_ZONE_WIDTH: f32 = 80.0;

pub(super) static LONG_POSITION: KindHandler = KindHandler {
    labels: &["entry", "stop", "target"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: long_position,
    validate: Some(long_violations),
};

pub(super) static SHORT_POSITION: KindHandler = KindHandler {
    labels: &["entry", "stop", "target"],
    phases: &[],
    fill: true,
    handles: anchor_handles,
    build: short_position,
    validate: Some(short_violations),
};

fn long_violations(points: &[AnchorPoint]) -> Vec<RuleViolation> {
    side_violations(points, true)
}

fn short_violations(points: &[AnchorPoint]) -> Vec<RuleViolation> {
    side_violations(points, false)
}

fn side_violations(points: &[AnchorPoint], long: bool) -> Vec<RuleViolation> {
    let [entry, stop, target] = match points {
        [e, s, t] => [e.price, s.price, t.price],
        _ => return Vec::new(),
    };
    let mut out = Vec::new();
    let stop_ok = if long { stop < entry } else { stop > entry };
    if !stop_ok {
        out.push(Rule::StopOnWrongSide.into());
    }
    let target_ok = if long { target > entry } else { target < entry };
    if !target_ok {
        out.push(Rule::TargetOnWrongSide.into());
    }
    out
}

/// Reward over risk, `None` when the stop sits on the entry.
pub fn risk_reward(points: &[AnchorPoint]) -> Option<f64> {
    let [entry, stop, target] = match points {
        [e, s, t] => [e.price, s.price, t.price],
        _ => return None,
    };
    let risk = (entry - stop).abs();
    if risk <= f64::EPSILON {
        return None;
    }
    Some((target - entry).abs() / risk)
}

fn long_position(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    position(drawing, mapper)
}

fn short_position(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    position(drawing, mapper)
}

fn position(drawing: &Drawing, mapper: &CoordinateMapper) -> Option<Geometry> {
    let [entry, stop, target] = project_all::<3>(mapper, &drawing.points)?;
    let x0 = entry.x;
    let x1 = if (target.x - x0).abs() < 1.0 {
        x0 + MIN_ZONE_WIDTH
    } else {
        target.x
    };
    let opacity = drawing.fill_opacity.unwrap_or(DEFAULT_ZONE_OPACITY);
    let zone = |y: f32| {
        vec![
            egui::pos2(x0, entry.y),
            egui::pos2(x1, entry.y),
            egui::pos2(x1, y),
            egui::pos2(x0, y),
        ]
    };

    let mut g = Geometry::default();
    g.fill(zone(target.y), Some(PROFIT.with_opacity(opacity)));
    g.fill(zone(stop.y), Some(LOSS.with_opacity(opacity)));
    g.line(egui::pos2(x0, entry.y), egui::pos2(x1, entry.y));
    g.dashed(egui::pos2(x0, target.y), egui::pos2(x1, target.y));
    g.dashed(egui::pos2(x0, stop.y), egui::pos2(x1, stop.y));
    let caption = match risk_reward(&drawing.points) {
        Some(rr) => format!("R:R {rr:.2}"),
        None => "R:R n/a".to_string(),
    };
    g.text(egui::pos2(x0.min(x1) + 4.0, entry.y + 4.0), caption);
    Some(g)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_requires_stop_below_and_target_above() {
        let ok = [
            AnchorPoint::new(0, 100.0),
            AnchorPoint::new(0, 95.0),
            AnchorPoint::new(0, 110.0),
        ];
        assert!(long_violations(&ok).is_empty());
        assert_eq!(risk_reward(&ok), Some(2.0));
        let rules: Vec<Rule> = short_violations(&ok).iter().map(|v| v.rule).collect();
        assert_eq!(rules, vec![Rule::StopOnWrongSide, Rule::TargetOnWrongSide]);
    }
}
