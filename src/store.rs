use crate::model::{AnchorPoint, Drawing, DrawingStyle, Rgba, now_ms};
use std::collections::HashSet;
use tracing::debug;

/// Field-wise update for [`DrawingStore::update`]. `None` leaves a field alone;
/// the nested options clear optional fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawingPatch {
    pub points: Option<Vec<AnchorPoint>>,
    pub style: Option<DrawingStyle>,
    pub fill_color: Option<Option<Rgba>>,
    pub fill_opacity: Option<Option<f32>>,
    pub label: Option<Option<String>>,
    pub locked: Option<bool>,
    pub hidden: Option<bool>,
}

impl DrawingPatch {
    pub fn points(points: Vec<AnchorPoint>) -> Self {
        Self {
            points: Some(points),
            ..Self::default()
        }
    }

    pub fn style(style: DrawingStyle) -> Self {
        Self {
            style: Some(style),
            ..Self::default()
        }
    }

    pub fn label(label: Option<String>) -> Self {
        Self {
            label: Some(label),
            ..Self::default()
        }
    }
}

/// The canonical drawing collection of the active chart.
///
/// Every mutation is synchronous and total; ids that do not exist turn the
/// call into a no-op. `revision` counts mutations of persisted fields, which
/// is what the persistence layer watches.
#[derive(Clone, Debug, Default)]
pub struct DrawingStore {
    drawings: Vec<Drawing>,
    revision: u64,
}

impl DrawingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drawings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawings.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &str) -> Option<&Drawing> {
        self.drawings.iter().find(|d| d.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.drawings.iter().position(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Drawing> {
        self.drawings.iter()
    }

    /// Drawings ascending by z, ties broken by id so the order is deterministic.
    pub fn sorted_by_z(&self) -> Vec<&Drawing> {
        let mut out: Vec<&Drawing> = self.drawings.iter().collect();
        out.sort_by(|a, b| a.z.cmp(&b.z).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn selected(&self) -> Option<&Drawing> {
        self.drawings.iter().find(|d| d.selected)
    }

    pub fn selected_id(&self) -> Option<String> {
        self.selected().map(|d| d.id.clone())
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Inserts a new drawing on top and selects it. Returns `None` (and stores
    /// nothing) when the point count does not match the kind.
    pub fn add(&mut self, mut drawing: Drawing) -> Option<String> {
        if drawing.points.len() != drawing.kind.point_count() {
            debug!(kind = ?drawing.kind, points = drawing.points.len(), "refusing drawing with wrong point count");
            return None;
        }
        let now = now_ms();
        drawing.id = uuid::Uuid::new_v4().to_string();
        drawing.z = self.drawings.iter().map(|d| d.z).max().map_or(0, |z| z + 1);
        drawing.created_at = now;
        drawing.updated_at = now;
        if !drawing.kind.has_fill() {
            drawing.fill_color = None;
            drawing.fill_opacity = None;
        }
        for d in &mut self.drawings {
            d.selected = false;
        }
        drawing.selected = true;
        let id = drawing.id.clone();
        debug!(%id, kind = ?drawing.kind, z = drawing.z, "drawing added");
        self.drawings.push(drawing);
        self.touch();
        Some(id)
    }

    pub fn update(&mut self, id: &str, patch: DrawingPatch) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        let d = &mut self.drawings[idx];
        if let Some(points) = patch.points {
            if points.len() == d.kind.point_count() && points.iter().all(|p| p.is_finite()) {
                d.points = points;
            } else {
                debug!(%id, "ignoring points patch of the wrong shape");
            }
        }
        if let Some(style) = patch.style {
            d.style = style;
        }
        if d.kind.has_fill() {
            if let Some(fill_color) = patch.fill_color {
                d.fill_color = fill_color;
            }
            if let Some(fill_opacity) = patch.fill_opacity {
                d.fill_opacity = fill_opacity;
            }
        }
        if let Some(label) = patch.label {
            d.label = label;
        }
        if let Some(locked) = patch.locked {
            d.locked = locked;
        }
        if let Some(hidden) = patch.hidden {
            d.hidden = hidden;
        }
        d.updated_at = now_ms().max(d.updated_at + 1);
        self.touch();
    }

    /// Moves one anchor; used when a handle drag is committed.
    pub fn set_point(&mut self, id: &str, index: usize, point: AnchorPoint) {
        let Some(d) = self.get(id) else {
            return;
        };
        if index >= d.points.len() {
            return;
        }
        let mut points = d.points.clone();
        points[index] = point;
        self.update(id, DrawingPatch::points(points));
    }

    pub fn remove(&mut self, id: &str) -> Option<Drawing> {
        let idx = self.index_of(id)?;
        let removed = self.drawings.remove(idx);
        debug!(%id, "drawing removed");
        self.touch();
        Some(removed)
    }

    pub fn clear(&mut self) {
        if self.drawings.is_empty() {
            return;
        }
        self.drawings.clear();
        self.touch();
    }

    /// Moves `id` to `target_index` in z order and renumbers z contiguously from 0.
    pub fn reorder(&mut self, id: &str, target_index: usize) {
        if self.index_of(id).is_none() {
            return;
        }
        let mut order: Vec<String> = self.sorted_by_z().iter().map(|d| d.id.clone()).collect();
        let Some(from) = order.iter().position(|o| o == id) else {
            return;
        };
        let moved = order.remove(from);
        let to = target_index.min(order.len());
        order.insert(to, moved);
        for (z, oid) in order.iter().enumerate() {
            if let Some(d) = self.drawings.iter_mut().find(|d| &d.id == oid) {
                d.z = z as i64;
            }
        }
        self.touch();
    }

    pub fn bring_to_front(&mut self, id: &str) {
        self.reorder(id, self.drawings.len());
    }

    pub fn send_to_back(&mut self, id: &str) {
        self.reorder(id, 0);
    }

    /// Selects exactly one drawing, or none. Selection is transient and does not
    /// bump the revision. An unknown id leaves the selection unchanged.
    pub fn select(&mut self, id: Option<&str>) {
        match id {
            Some(id) => {
                if self.index_of(id).is_none() {
                    return;
                }
                for d in &mut self.drawings {
                    d.selected = d.id == id;
                }
            }
            None => {
                for d in &mut self.drawings {
                    d.selected = false;
                }
            }
        }
    }

    pub fn set_locked(&mut self, id: &str, locked: bool) {
        self.update(
            id,
            DrawingPatch {
                locked: Some(locked),
                ..DrawingPatch::default()
            },
        );
    }

    pub fn set_hidden(&mut self, id: &str, hidden: bool) {
        self.update(
            id,
            DrawingPatch {
                hidden: Some(hidden),
                ..DrawingPatch::default()
            },
        );
    }

    pub fn toggle_locked(&mut self, id: &str) {
        if let Some(locked) = self.get(id).map(|d| d.locked) {
            self.set_locked(id, !locked);
        }
    }

    pub fn toggle_hidden(&mut self, id: &str) {
        if let Some(hidden) = self.get(id).map(|d| d.hidden) {
            self.set_hidden(id, !hidden);
        }
    }

    /// Replaces the whole collection, as a load does. Ids are kept unless
    /// empty or repeated; z is renumbered only when it is not unique.
    pub fn replace_all(&mut self, drawings: Vec<Drawing>) {
        self.drawings = drawings;
        let mut seen = HashSet::new();
        for d in &mut self.drawings {
            d.selected = false;
            if d.id.is_empty() || !seen.insert(d.id.clone()) {
                let fresh = uuid::Uuid::new_v4().to_string();
                debug!(old = %d.id, new = %fresh, "reassigning drawing id");
                d.id = fresh.clone();
                seen.insert(fresh);
            }
        }
        let mut zs: Vec<i64> = self.drawings.iter().map(|d| d.z).collect();
        zs.sort_unstable();
        zs.dedup();
        if zs.len() != self.drawings.len() {
            self.drawings
                .sort_by(|a, b| a.z.cmp(&b.z).then_with(|| a.id.cmp(&b.id)));
            for (z, d) in self.drawings.iter_mut().enumerate() {
                d.z = z as i64;
            }
        }
        self.touch();
    }

    /// Persisted view of the collection, z-ascending.
    pub fn snapshot(&self) -> Vec<Drawing> {
        self.sorted_by_z().into_iter().cloned().collect()
    }
}

pub fn drawing_label(drawing: &Drawing) -> String {
    let mut flags = String::new();
    if drawing.locked {
        flags.push_str(" [locked]");
    }
    if drawing.hidden {
        flags.push_str(" [hidden]");
    }
    format!("{} z{}{}", drawing.caption(), drawing.z, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DrawingKind;

    fn hline(price: f64) -> Drawing {
        Drawing::new(
            DrawingKind::HorizontalLine,
            vec![AnchorPoint::new(0, price)],
            DrawingStyle::default(),
        )
    }

    #[test]
    fn add_stacks_on_top_and_selects() {
        let mut store = DrawingStore::new();
        let a = store.add(hline(1.0)).unwrap();
        let b = store.add(hline(2.0)).unwrap();
        assert_eq!(store.get(&a).unwrap().z, 0);
        assert_eq!(store.get(&b).unwrap().z, 1);
        assert_eq!(store.selected_id(), Some(b));
        assert!(!store.get(&a).unwrap().selected);
    }

    #[test]
    fn wrong_point_count_is_refused() {
        let mut store = DrawingStore::new();
        let bad = Drawing::new(DrawingKind::TrendLine, vec![AnchorPoint::new(0, 1.0)], DrawingStyle::default());
        assert!(store.add(bad).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn fill_is_stripped_from_non_fill_kinds() {
        let mut store = DrawingStore::new();
        let id = store.add(hline(1.0).with_fill(Rgba::rgb(1, 2, 3), 0.5)).unwrap();
        assert_eq!(store.get(&id).unwrap().fill_color, None);
    }

    #[test]
    fn selection_does_not_bump_revision() {
        let mut store = DrawingStore::new();
        let id = store.add(hline(1.0)).unwrap();
        let rev = store.revision();
        store.select(None);
        store.select(Some(&id));
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn update_bumps_updated_at() {
        let mut store = DrawingStore::new();
        let id = store.add(hline(1.0)).unwrap();
        let before = store.get(&id).unwrap().updated_at;
        store.update(&id, DrawingPatch::label(Some("support".into())));
        let d = store.get(&id).unwrap();
        assert!(d.updated_at > before);
        assert_eq!(d.label.as_deref(), Some("support"));
    }
}
