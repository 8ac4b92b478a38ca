//! Tests for structure lifecycle: add, reset, reclaim and removal of unused containers.

use flatview::{path, FlatView, Path, RangeSpec, Seg, Structure, ViewConfig, ViewError};
use serde_json::json;
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn base_view() -> FlatView {
    init_tracing();
    let mut view = FlatView::new();
    view.set_values([11, 12, 13, 14, 15, 16]);
    view
}

fn unused(view: &FlatView) -> Vec<String> {
    view.unused_paths().iter().map(|p| p.to_string()).collect()
}

// ============================================================================
// Reset and replace
// ============================================================================

#[test]
fn test_reset_then_disjoint_add_shows_only_new_fields() {
    let mut view = base_view();
    view.add_structure(
        &Structure::new()
            .field("a", RangeSpec::index(0))
            .field("b", RangeSpec::index(1)),
    )
    .unwrap();

    view.reset_structure().unwrap();
    view.add_structure(&Structure::new().field("z", RangeSpec::index(5)))
        .unwrap();

    assert_eq!(view.export(), json!({"z": 16}));
    assert_eq!(view.fields(), vec![path!("z")]);
}

#[test]
fn test_set_structure_drops_disjoint_nested_containers() {
    let mut view = base_view();
    view.set_structure(
        &Structure::new()
            .field("position.x", RangeSpec::index(0))
            .field("deep.a.b", RangeSpec::index(1)),
    )
    .unwrap();

    view.set_structure(&Structure::new().field("speed", RangeSpec::index(2)))
        .unwrap();

    assert_eq!(view.export(), json!({"speed": 13}));
    assert!(view.unused_paths().is_empty());
    assert!(view.container("position").is_none());
    assert!(view.container("deep").is_none());
}

#[test]
fn test_reset_keeps_containers_until_removed() {
    let mut view = base_view();
    view.add_structure(&Structure::new().field("position.x", RangeSpec::index(0)))
        .unwrap();
    let position = view.container("position").unwrap();

    view.reset_structure().unwrap();
    assert_eq!(unused(&view), vec!["position"]);
    assert!(view.container("position").unwrap().ptr_eq(&position));
    assert!(position.is_empty());

    view.remove_unused_structure().unwrap();
    assert!(view.container("position").is_none());
    assert_eq!(view.export(), json!({}));
}

#[test]
fn test_reset_twice_is_harmless() {
    let mut view = base_view();
    view.add_structure(&Structure::new().field("p.x", RangeSpec::index(0)))
        .unwrap();
    view.reset_structure().unwrap();
    view.reset_structure().unwrap();
    view.remove_unused_structure().unwrap();
    assert_eq!(view.export(), json!({}));
}

// ============================================================================
// Container identity across reset/add
// ============================================================================

#[test]
fn test_reused_prefix_preserves_container_identity() {
    let mut view = base_view();
    view.set_structure(&Structure::new().field("position.x", RangeSpec::index(0)))
        .unwrap();
    let held = view.container("position").unwrap();

    view.set_structure(
        &Structure::new()
            .field("position.x", RangeSpec::index(2))
            .field("position.y", RangeSpec::index(3)),
    )
    .unwrap();

    let current = view.container("position").unwrap();
    assert!(held.ptr_eq(&current));
    assert_eq!(*held.read("y").unwrap(), json!(14));
    assert_eq!(view.export(), json!({"position": {"x": 13, "y": 14}}));
}

#[test]
fn test_nested_reuse_reclaims_every_prefix() {
    let mut view = base_view();
    view.add_structure(&Structure::new().field("a.b.c", RangeSpec::index(0)))
        .unwrap();
    let a = view.container("a").unwrap();
    let ab = view.container("a.b").unwrap();

    view.reset_structure().unwrap();
    assert_eq!(unused(&view), vec!["a", "a.b"]);

    view.add_structure(&Structure::new().field("a.b.d", RangeSpec::index(1)))
        .unwrap();
    assert!(view.unused_paths().is_empty());

    view.remove_unused_structure().unwrap();
    assert!(view.container("a").unwrap().ptr_eq(&a));
    assert!(view.container("a.b").unwrap().ptr_eq(&ab));
    assert_eq!(view.export(), json!({"a": {"b": {"d": 12}}}));
}

#[test]
fn test_partial_reuse_removes_only_unclaimed_branch() {
    let mut view = base_view();
    view.set_structure(
        &Structure::new()
            .field("a.keep.x", RangeSpec::index(0))
            .field("a.drop.y", RangeSpec::index(1)),
    )
    .unwrap();
    let keep = view.container("a.keep").unwrap();

    view.set_structure(&Structure::new().field("a.keep.x", RangeSpec::index(4)))
        .unwrap();

    assert!(view.container("a.keep").unwrap().ptr_eq(&keep));
    assert!(view.container("a.drop").is_none());
    assert_eq!(view.export(), json!({"a": {"keep": {"x": 15}}}));
}

#[test]
fn test_list_container_survives_reuse() {
    let mut view = base_view();
    view.set_structure(&Structure::new().field("items.0", RangeSpec::index(0)))
        .unwrap();
    let items = view.container("items").unwrap();

    view.set_structure(&Structure::new().field("items.1", RangeSpec::index(1)))
        .unwrap();

    assert!(view.container("items").unwrap().ptr_eq(&items));
    // The slot vacated by the reset stays as a hole.
    assert_eq!(view.export(), json!({"items": [null, 12]}));
}

#[test]
fn test_field_replacing_container_survives_remove_unused() {
    let mut view = base_view();
    view.set_structure(&Structure::new().field("pos.x", RangeSpec::index(0)))
        .unwrap();
    view.set_structure(&Structure::new().field("pos", RangeSpec::index(1)))
        .unwrap();

    assert_eq!(view.export(), json!({"pos": 12}));
}

#[test]
fn test_reset_after_derive_over_container() {
    let mut view = base_view();
    view.add_structure(
        &Structure::new()
            .field("position.x", RangeSpec::index(0))
            .field("position", RangeSpec::derive(|prev| prev.clone())),
    )
    .unwrap();
    assert_eq!(*view.get("position").unwrap(), json!({"x": 11}));

    view.set_structure(&Structure::new().field("other", RangeSpec::index(1)))
        .unwrap();
    assert_eq!(view.export(), json!({"other": 12}));
}

#[test]
fn test_field_replacing_container_drops_fields_below_it() {
    let mut view = base_view();
    view.set_structure(
        &Structure::new()
            .field("pos.x", RangeSpec::index(0))
            .field("pos", RangeSpec::index(1)),
    )
    .unwrap();

    assert_eq!(view.export(), json!({"pos": 12}));
    assert_eq!(view.fields(), vec![path!("pos")]);
    assert!(view.get("pos.x").is_none());
    assert!(!view.contains_field("pos.x"));
    assert_eq!(*view.get("pos").unwrap(), json!(12));
}

// ============================================================================
// Install order
// ============================================================================

#[test]
fn test_deeper_path_installed_before_shared_prefix() {
    let mut view = base_view();
    // "position.x" sorts after "position", so it installs first and the
    // derived field then sees the container it built.
    view.set_structure(
        &Structure::new()
            .field("position", RangeSpec::derive(|prev| json!(prev.is_object())))
            .field("position.x", RangeSpec::index(0)),
    )
    .unwrap();
    assert_eq!(*view.get("position").unwrap(), json!(true));
}

#[test]
fn test_shared_spec_shares_cache_entry() {
    let mut view = base_view();
    let spec = Rc::new(RangeSpec::slice(0, 2).with(|v| v.clone()));
    view.set_structure(
        &Structure::new()
            .shared_field("first", spec.clone())
            .shared_field("second", spec),
    )
    .unwrap();

    let first = view.get("first").unwrap();
    let second = view.get("second").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(view.cached_len(), 1);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_nesting_under_a_field_fails() {
    let mut view = base_view();
    view.add_structure(&Structure::new().field("a", RangeSpec::index(0)))
        .unwrap();

    let err = view
        .add_structure(&Structure::new().field("a.b", RangeSpec::index(1)))
        .unwrap_err();
    match err {
        ViewError::PathResolution { cursor, segment } => {
            assert_eq!(cursor, Path::root());
            assert_eq!(segment, Seg::key("a"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_key_segment_on_list_fails() {
    let mut view = base_view();
    view.add_structure(&Structure::new().field("items.0", RangeSpec::index(0)))
        .unwrap();
    let err = view
        .add_structure(&Structure::new().field("items.name", RangeSpec::index(1)))
        .unwrap_err();
    assert!(matches!(err, ViewError::PathResolution { .. }));
}

#[test]
fn test_huge_numeric_segment_is_key() {
    let mut view = base_view();
    view.set_structure(
        &Structure::new()
            .field("a.18446744073709551615", RangeSpec::index(0))
            .field("b.100000000000", RangeSpec::index(1)),
    )
    .unwrap();

    assert!(!view.container("a").unwrap().is_list());
    assert!(!view.container("b").unwrap().is_list());
    assert_eq!(
        view.export(),
        json!({"a": {"18446744073709551615": 11}, "b": {"100000000000": 12}})
    );
}

#[test]
fn test_list_index_limit_from_config() {
    let config = ViewConfig {
        max_list_index: 3,
        ..ViewConfig::default()
    };
    let mut view = FlatView::with_config(config);
    view.set_values([1, 2]);
    view.set_structure(
        &Structure::new()
            .field("low.3", RangeSpec::index(0))
            .field("high.4", RangeSpec::index(1)),
    )
    .unwrap();

    assert_eq!(view.container("low").unwrap().len(), 4);
    assert!(!view.container("high").unwrap().is_list());
    assert_eq!(view.export(), json!({"high": {"4": 2}, "low": [null, null, null, 1]}));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_custom_separator() {
    let config = ViewConfig {
        separator: '/',
        ..ViewConfig::default()
    };
    let mut view = FlatView::with_config(config);
    view.set_values([1, 2]);
    view.set_structure(
        &Structure::new()
            .field("pose/x", RangeSpec::index(0))
            .field("pose/y", RangeSpec::index(1)),
    )
    .unwrap();

    assert_eq!(*view.get("pose/y").unwrap(), json!(2));
    assert_eq!(view.export(), json!({"pose": {"x": 1, "y": 2}}));

    let separator = view.config().separator;
    let fields: Vec<String> = view.fields().iter().map(|p| p.display_with(separator)).collect();
    assert_eq!(fields, vec!["pose/x", "pose/y"]);
    // Display stays canonical.
    assert_eq!(view.fields()[0].to_string(), "pose.x");
}

#[test]
fn test_numeric_segments_as_keys() {
    let config = ViewConfig {
        numeric_segments_as_indices: false,
        ..ViewConfig::default()
    };
    let mut view = FlatView::with_config(config);
    view.set_values([1]);
    view.set_structure(&Structure::new().field("row.0", RangeSpec::index(0)))
        .unwrap();

    assert!(!view.container("row").unwrap().is_list());
    assert_eq!(view.export(), json!({"row": {"0": 1}}));
}
