use chartscribe::model::{AnchorPoint, Drawing, DrawingKind, DrawingStyle, Rgba};
use chartscribe::store::{DrawingPatch, DrawingStore};
use std::collections::HashSet;

fn trend(offset: f64) -> Drawing {
    Drawing::new(
        DrawingKind::TrendLine,
        vec![
            AnchorPoint::new(0, 100.0 + offset),
            AnchorPoint::new(60_000, 110.0 + offset),
        ],
        DrawingStyle::default(),
    )
}

fn z_values(store: &DrawingStore) -> Vec<i64> {
    store.sorted_by_z().iter().map(|d| d.z).collect()
}

#[test]
fn z_stays_unique_through_reordering_and_removal() {
    let mut store = DrawingStore::new();
    let ids: Vec<String> = (0..5).map(|i| store.add(trend(i as f64)).unwrap()).collect();

    store.send_to_back(&ids[4]);
    store.bring_to_front(&ids[0]);
    store.reorder(&ids[2], 1);
    store.remove(&ids[3]);
    store.add(trend(9.0));

    let zs = z_values(&store);
    let unique: HashSet<i64> = zs.iter().copied().collect();
    assert_eq!(unique.len(), zs.len());
    assert_eq!(store.sorted_by_z().first().unwrap().id, ids[4]);
}

#[test]
fn reorder_renumbers_contiguously() {
    let mut store = DrawingStore::new();
    let a = store.add(trend(0.0)).unwrap();
    let b = store.add(trend(1.0)).unwrap();
    let c = store.add(trend(2.0)).unwrap();
    store.reorder(&c, 0);
    let order: Vec<&str> = store.sorted_by_z().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(order, vec![c.as_str(), a.as_str(), b.as_str()]);
    assert_eq!(z_values(&store), vec![0, 1, 2]);
}

#[test]
fn lock_and_hide_toggles_are_involutions() {
    let mut store = DrawingStore::new();
    let id = store.add(trend(0.0)).unwrap();
    let before = store.get(&id).unwrap().clone();

    store.toggle_locked(&id);
    store.toggle_locked(&id);
    store.toggle_hidden(&id);
    store.toggle_hidden(&id);

    let after = store.get(&id).unwrap();
    assert_eq!(after.locked, before.locked);
    assert_eq!(after.hidden, before.hidden);
    assert_eq!(after.points, before.points);
}

#[test]
fn unknown_ids_are_ignored() {
    let mut store = DrawingStore::new();
    let id = store.add(trend(0.0)).unwrap();
    let revision = store.revision();

    store.update("missing", DrawingPatch::label(Some("x".into())));
    store.set_point("missing", 0, AnchorPoint::new(1, 1.0));
    store.toggle_locked("missing");
    store.reorder("missing", 0);
    assert!(store.remove("missing").is_none());
    store.select(Some("missing"));

    assert_eq!(store.revision(), revision);
    assert_eq!(store.selected_id(), Some(id));
}

#[test]
fn points_patch_of_wrong_length_is_ignored() {
    let mut store = DrawingStore::new();
    let id = store.add(trend(0.0)).unwrap();
    store.update(&id, DrawingPatch::points(vec![AnchorPoint::new(0, 1.0)]));
    assert_eq!(store.get(&id).unwrap().points.len(), 2);
    store.set_point(&id, 5, AnchorPoint::new(0, 1.0));
    assert_eq!(store.get(&id).unwrap().points[1].price, 110.0);
}

#[test]
fn fill_only_sticks_to_fill_capable_kinds() {
    let mut store = DrawingStore::new();
    let rect = store
        .add(Drawing::new(
            DrawingKind::Rectangle,
            vec![AnchorPoint::new(0, 1.0), AnchorPoint::new(10, 2.0)],
            DrawingStyle::default(),
        ))
        .unwrap();
    let line = store.add(trend(0.0)).unwrap();
    let patch = DrawingPatch {
        fill_color: Some(Some(Rgba::rgb(1, 2, 3))),
        fill_opacity: Some(Some(0.5)),
        ..DrawingPatch::default()
    };
    store.update(&rect, patch.clone());
    store.update(&line, patch);
    assert_eq!(store.get(&rect).unwrap().fill_color, Some(Rgba::rgb(1, 2, 3)));
    assert_eq!(store.get(&line).unwrap().fill_color, None);
}

#[test]
fn replace_all_normalizes_duplicate_z_and_clears_selection() {
    let mut loaded: Vec<Drawing> = (0..3).map(|i| trend(i as f64)).collect();
    for (i, d) in loaded.iter_mut().enumerate() {
        d.id = format!("d{i}");
        d.z = 4;
        d.selected = true;
    }
    let mut store = DrawingStore::new();
    store.replace_all(loaded);
    assert_eq!(z_values(&store), vec![0, 1, 2]);
    assert_eq!(store.selected(), None);
    assert_eq!(store.get("d1").unwrap().z, 1);
}

#[test]
fn replace_all_gives_repeated_ids_fresh_ones() {
    let mut loaded: Vec<Drawing> = (0..3).map(|i| trend(i as f64)).collect();
    for (i, d) in loaded.iter_mut().enumerate() {
        d.id = "a".to_string();
        d.z = i as i64;
    }
    let mut store = DrawingStore::new();
    store.replace_all(loaded);

    let ids: HashSet<String> = store.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(store.get("a").unwrap().z, 0);

    store.select(Some("a"));
    assert_eq!(store.iter().filter(|d| d.selected).count(), 1);
    store.remove("a");
    assert_eq!(store.len(), 2);
    assert!(store.get("a").is_none());
}

#[test]
fn snapshot_is_z_ascending() {
    let mut store = DrawingStore::new();
    let a = store.add(trend(0.0)).unwrap();
    let b = store.add(trend(1.0)).unwrap();
    store.send_to_back(&b);
    let ids: Vec<String> = store.snapshot().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![b, a]);
}
