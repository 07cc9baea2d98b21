//! Band fills between two indicator lines (e.g. volatility bands).
//!
//! Only timestamps where both lines are defined take part. A run is broken
//! wherever consecutive included timestamps are more than one bar apart, so a
//! polygon never bridges a data gap.

use crate::coords::CoordinateMapper;
use crate::model::{BandFill, LineSeries};
use std::collections::{BTreeMap, BTreeSet};

use super::FillPolygon;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandPoint {
    pub time: i64,
    pub upper: f64,
    pub lower: f64,
}

/// One contiguous overlapping run, in domain space.
#[derive(Clone, Debug, PartialEq)]
pub struct FillSegment {
    pub points: Vec<BandPoint>,
}

/// How timestamps are turned into bar indices.
#[derive(Clone, Copy, Debug)]
pub enum BarTimeline<'a> {
    /// Sorted bar open times of the chart; timestamps off the timeline are dropped.
    Bars(&'a [i64]),
    /// Bar spacing is the smallest positive gap between any two timestamps of
    /// either series.
    Inferred,
}

pub fn fill_segments(upper: &LineSeries, lower: &LineSeries, timeline: BarTimeline) -> Vec<FillSegment> {
    let upper_values: BTreeMap<i64, f64> = upper.defined().collect();
    let lower_values: BTreeMap<i64, f64> = lower.defined().collect();

    let indexer = match timeline {
        BarTimeline::Bars(bars) => Indexer::Bars(bars),
        BarTimeline::Inferred => {
            let all: BTreeSet<i64> = upper
                .values
                .iter()
                .chain(&lower.values)
                .map(|v| v.time)
                .collect();
            let step = all
                .iter()
                .zip(all.iter().skip(1))
                .filter_map(|(a, b)| b.checked_sub(*a))
                .filter(|d| *d > 0)
                .min()
                .unwrap_or(1);
            Indexer::Step {
                origin: all.first().copied().unwrap_or(0),
                step,
            }
        }
    };

    let mut segments = Vec::new();
    let mut current: Vec<BandPoint> = Vec::new();
    let mut prev_index: Option<i64> = None;
    for (time, up) in &upper_values {
        let Some(low) = lower_values.get(time) else {
            continue;
        };
        let Some(index) = indexer.index(*time) else {
            continue;
        };
        if let Some(prev) = prev_index {
            if index.saturating_sub(prev) > 1 {
                flush(&mut segments, &mut current);
            }
        }
        prev_index = Some(index);
        current.push(BandPoint {
            time: *time,
            upper: *up,
            lower: *low,
        });
    }
    flush(&mut segments, &mut current);
    segments
}

enum Indexer<'a> {
    Bars(&'a [i64]),
    Step { origin: i64, step: i64 },
}

impl Indexer<'_> {
    fn index(&self, time: i64) -> Option<i64> {
        match self {
            Indexer::Bars(bars) => bars
                .binary_search(&time)
                .ok()
                .and_then(|i| i64::try_from(i).ok()),
            Indexer::Step { origin, step } => {
                let offset = time.checked_sub(*origin)?;
                Some((offset as f64 / *step as f64).round() as i64)
            }
        }
    }
}

fn flush(segments: &mut Vec<FillSegment>, current: &mut Vec<BandPoint>) {
    let points = std::mem::take(current);
    if points.len() >= 2 {
        segments.push(FillSegment { points });
    }
}

/// Upper line left to right, then lower line right to left. A bar the
/// viewport cannot place on either line splits the polygon there, so the
/// two halves always pair up bar for bar.
pub fn segment_polygons(segment: &FillSegment, mapper: &CoordinateMapper) -> Vec<Vec<eframe::egui::Pos2>> {
    let mut out = Vec::new();
    let mut run: Vec<(eframe::egui::Pos2, eframe::egui::Pos2)> = Vec::new();
    let mut close = |run: &mut Vec<(eframe::egui::Pos2, eframe::egui::Pos2)>| {
        let pairs = std::mem::take(run);
        if pairs.len() >= 2 {
            let upper = pairs.iter().map(|(u, _)| *u);
            let lower = pairs.iter().rev().map(|(_, l)| *l);
            out.push(upper.chain(lower).collect());
        }
    };
    for p in &segment.points {
        match (mapper.to_screen(p.time, p.upper), mapper.to_screen(p.time, p.lower)) {
            (Some(u), Some(l)) => run.push((u, l)),
            _ => close(&mut run),
        }
    }
    close(&mut run);
    out
}

pub fn band_polygons(
    bands: &[BandFill],
    series: &[&LineSeries],
    timeline: BarTimeline,
    mapper: &CoordinateMapper,
) -> Vec<FillPolygon> {
    let find = |id: &str| series.iter().copied().find(|s| s.id == id);
    let mut out = Vec::new();
    for band in bands {
        let (Some(upper), Some(lower)) = (find(&band.upper), find(&band.lower)) else {
            tracing::debug!(upper = %band.upper, lower = %band.lower, "band fill references a missing series");
            continue;
        };
        for segment in fill_segments(upper, lower, timeline) {
            for points in segment_polygons(&segment, mapper) {
                out.push(FillPolygon {
                    points,
                    color: band.color,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeriesValue;

    fn series(id: &str, points: &[(i64, Option<f64>)]) -> LineSeries {
        LineSeries::new(
            id,
            points
                .iter()
                .map(|(time, value)| SeriesValue {
                    time: *time,
                    value: *value,
                })
                .collect(),
        )
    }

    #[test]
    fn undefined_values_break_the_run() {
        let upper = series(
            "upper",
            &[(1, Some(5.0)), (2, Some(5.0)), (3, None), (4, Some(5.0)), (5, Some(5.0))],
        );
        let lower = series(
            "lower",
            &[(1, Some(1.0)), (2, Some(1.0)), (3, Some(1.0)), (4, Some(1.0)), (5, Some(1.0))],
        );
        let segments = fill_segments(&upper, &lower, BarTimeline::Inferred);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].points.len(), 2);
    }

    #[test]
    fn single_point_runs_are_dropped() {
        let upper = series("u", &[(1, Some(5.0)), (3, Some(5.0)), (4, Some(5.0))]);
        let lower = series("l", &[(1, Some(1.0)), (3, Some(1.0)), (4, Some(1.0))]);
        let segments = fill_segments(&upper, &lower, BarTimeline::Inferred);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].points[0].time, 3);
    }

    #[test]
    fn unplaceable_bar_splits_the_polygon() {
        use crate::coords::LinearViewport;

        let viewport = LinearViewport::new(0, 500, 0.0, 200.0).with_size(500.0, 200.0);
        let mapper = CoordinateMapper::new(&viewport);
        let upper = series(
            "u",
            &[(0, Some(150.0)), (100, Some(150.0)), (200, Some(1.0e9)), (300, Some(150.0)), (400, Some(150.0))],
        );
        let lower = series("l", &[(0, Some(50.0)), (100, Some(50.0)), (200, Some(50.0)), (300, Some(50.0)), (400, Some(50.0))]);
        let segments = fill_segments(&upper, &lower, BarTimeline::Inferred);
        assert_eq!(segments.len(), 1);

        let polygons = segment_polygons(&segments[0], &mapper);
        assert_eq!(polygons.len(), 2);
        for polygon in &polygons {
            assert_eq!(polygon.len(), 4);
            assert!(polygon[..2].iter().all(|p| p.y == 50.0));
            assert!(polygon[2..].iter().all(|p| p.y == 150.0));
            assert_eq!(polygon[0].x, polygon[3].x);
            assert_eq!(polygon[1].x, polygon[2].x);
        }
    }

    #[test]
    fn explicit_timeline_spans_weekend_gaps() {
        let upper = series("u", &[(10, Some(5.0)), (20, Some(5.0)), (50, Some(5.0))]);
        let lower = series("l", &[(10, Some(1.0)), (20, Some(1.0)), (50, Some(1.0))]);
        let bars = [10, 20, 50];
        let segments = fill_segments(&upper, &lower, BarTimeline::Bars(&bars));
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].points.len(), 3);
    }
}
