//! Cross-component scenarios exercising the view facade end to end.

use annotink_canvas::{
    CanvasEvent, CanvasView, Configuration, DrawData, DrawnDetail, GestureHandler, GroupData,
    HandlerPayload, InteractionData, MergeData, Mode, ModelSnapshot, SelectRegionData, SplitData,
    UpdateReason,
};
use annotink_core::{ActiveElement, Geometry, ObjectState, ShapeType};
use kurbo::{Size, Vec2};
use std::cell::RefCell;
use std::rc::Rc;

/// Handler double that records every call it receives.
struct RecordingHandler {
    calls: Rc<RefCell<Vec<String>>>,
    tag: &'static str,
}

impl GestureHandler for RecordingHandler {
    fn configure(&mut self, _configuration: &Configuration) {
        self.calls.borrow_mut().push(format!("{}:configure", self.tag));
    }
    fn transform(&mut self, _geometry: &Geometry) {
        self.calls.borrow_mut().push(format!("{}:transform", self.tag));
    }
    fn enable(&mut self, payload: &HandlerPayload) {
        let state = if payload.enabled() { "enable" } else { "disable" };
        self.calls.borrow_mut().push(format!("{}:{state}", self.tag));
    }
    fn cancel(&mut self) {
        self.calls.borrow_mut().push(format!("{}:cancel", self.tag));
    }
}

fn view_with_handlers() -> (CanvasView, Rc<RefCell<Vec<String>>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut view = CanvasView::new();
    for (mode, tag) in [
        (Mode::Draw, "draw"),
        (Mode::Edit, "edit"),
        (Mode::Merge, "merge"),
        (Mode::Split, "split"),
        (Mode::Group, "group"),
        (Mode::Interact, "interact"),
        (Mode::SelectRegion, "region"),
        (Mode::ZoomCanvas, "zoom"),
        (Mode::DragCanvas, "drag"),
    ] {
        view.set_handler(
            mode,
            Box::new(RecordingHandler {
                calls: calls.clone(),
                tag,
            }),
        );
    }
    let snapshot = ModelSnapshot {
        geometry: Geometry::for_image(Size::new(640.0, 480.0)),
        ..ModelSnapshot::default()
    };
    view.notify(UpdateReason::ImageChanged, &snapshot).unwrap();
    view.poll_events();
    calls.borrow_mut().clear();
    (view, calls)
}

fn rectangle(id: u64, updated: u64) -> ObjectState {
    let mut state = ObjectState::new(id, ShapeType::Rectangle, vec![0.0, 0.0, 10.0, 10.0]);
    state.updated = updated;
    state
}

fn objects_snapshot(objects: Vec<ObjectState>) -> ModelSnapshot {
    ModelSnapshot {
        objects,
        ..ModelSnapshot::default()
    }
}

#[test]
fn scenario_a_single_creation() {
    let (mut view, _calls) = view_with_handlers();

    view.notify(UpdateReason::ObjectsUpdated, &objects_snapshot(vec![]))
        .unwrap();
    assert!(view.scene().is_empty());

    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 0)]),
    )
    .unwrap();

    assert_eq!(view.scene().len(), 1);
    assert!(view.scene().contains(1));
    assert!(view.drawn_state(1).is_some());
}

#[test]
fn scenario_b_version_unchanged_means_no_mutation() {
    let (mut view, _calls) = view_with_handlers();
    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 0)]),
    )
    .unwrap();

    let revision = view.scene().revision();
    let drawn_points = view.drawn_state(1).unwrap().points.clone();

    // Same `updated` version, different raw points: the version is the sync
    // key, so nothing may change.
    let mut moved = rectangle(1, 0);
    moved.points = vec![0.0, 0.0, 20.0, 20.0];
    view.notify(UpdateReason::ObjectsUpdated, &objects_snapshot(vec![moved]))
        .unwrap();

    assert_eq!(view.scene().revision(), revision);
    assert_eq!(view.drawn_state(1).unwrap().points, drawn_points);
}

#[test]
fn scenario_c_deactivation_precedes_deletion() {
    let (mut view, _calls) = view_with_handlers();
    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 0)]),
    )
    .unwrap();

    let mut snapshot = objects_snapshot(vec![rectangle(1, 0)]);
    snapshot.active_element = ActiveElement::new(1);
    view.notify(UpdateReason::ShapeActivated, &snapshot).unwrap();
    assert_eq!(view.active_element().client_id, Some(1));

    view.notify(UpdateReason::ObjectsUpdated, &objects_snapshot(vec![]))
        .unwrap();

    assert_eq!(view.active_element(), ActiveElement::default());
    assert!(view.scene().is_empty());
}

#[test]
fn scenario_d_null_draw_completion_cancels() {
    let (mut view, calls) = view_with_handlers();

    let mut snapshot = ModelSnapshot::default();
    snapshot.draw_data = Some(DrawData {
        enabled: true,
        shape_type: Some(ShapeType::Rectangle),
        ..DrawData::default()
    });
    view.notify(UpdateReason::Draw, &snapshot).unwrap();
    assert_eq!(view.mode(), Mode::Draw);

    view.on_draw_done(None, false).unwrap();

    assert_eq!(view.mode(), Mode::Idle);
    assert_eq!(view.poll_events(), vec![CanvasEvent::Canceled]);
    // The handler received its disable notification after the cancellation.
    assert_eq!(
        calls.borrow().as_slice(),
        ["draw:enable", "draw:disable"]
    );
}

#[test]
fn scenario_e_skeleton_drag_propagates_to_elements() {
    let (mut view, _calls) = view_with_handlers();

    let mut skeleton = ObjectState::new(10, ShapeType::Skeleton, vec![]);
    skeleton
        .elements
        .push(ObjectState::new(11, ShapeType::Points, vec![10.0, 10.0]));
    skeleton
        .elements
        .push(ObjectState::new(12, ShapeType::Points, vec![50.0, 30.0]));
    view.notify(UpdateReason::ObjectsUpdated, &objects_snapshot(vec![skeleton]))
        .unwrap();

    let mut snapshot = ModelSnapshot::default();
    snapshot.active_element = ActiveElement::new(10);
    view.notify(UpdateReason::ShapeActivated, &snapshot).unwrap();
    view.poll_events();

    assert!(view.begin_shape_drag(10));
    assert_eq!(view.mode(), Mode::Drag);
    assert!(view.drag_shape_by(Vec2::new(7.0, -2.0)));
    assert!(view.finish_shape_drag(120));
    assert_eq!(view.mode(), Mode::Idle);

    // Both element primitives shifted by exactly the drag delta.
    let primitive = view.scene().get(10).unwrap();
    assert_eq!(primitive.elements[0].points, vec![117.0, 108.0]);
    assert_eq!(primitive.elements[1].points, vec![157.0, 128.0]);
    // The wrapping box extrema track the union of element positions.
    assert_eq!(primitive.points, vec![117.0, 108.0, 157.0, 128.0]);

    // The emitted event carries image-space points.
    let events = view.poll_events();
    assert_eq!(
        events,
        vec![CanvasEvent::ShapeDragged {
            client_id: 10,
            points: vec![17.0, 8.0, 57.0, 28.0],
            duration_ms: 120,
        }]
    );
}

#[test]
fn completeness_rendered_ids_match_non_skipped() {
    let (mut view, _calls) = view_with_handlers();

    let broken = ObjectState::new(3, ShapeType::Cuboid, vec![1.0, 2.0]);
    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 0), rectangle(2, 0), broken]),
    )
    .unwrap();

    let mut rendered: Vec<u64> = view.scene().ids().collect();
    rendered.sort_unstable();
    assert_eq!(rendered, vec![1, 2]);
    assert!(view.drawn_state(3).is_none());
}

#[test]
fn idempotence_second_reconcile_mutates_nothing() {
    let (mut view, _calls) = view_with_handlers();
    let snapshot = objects_snapshot(vec![rectangle(1, 5), rectangle(2, 9)]);

    view.notify(UpdateReason::ObjectsUpdated, &snapshot).unwrap();
    let revision = view.scene().revision();

    view.notify(UpdateReason::ObjectsUpdated, &snapshot).unwrap();
    assert_eq!(view.scene().revision(), revision);
}

#[test]
fn single_active_mode_is_invariant() {
    let (mut view, calls) = view_with_handlers();

    let mut snapshot = ModelSnapshot::default();
    snapshot.draw_data = Some(DrawData {
        enabled: true,
        ..DrawData::default()
    });
    view.notify(UpdateReason::Draw, &snapshot).unwrap();
    assert_eq!(view.mode(), Mode::Draw);

    // Every other family is refused while draw is busy.
    let mut busy = ModelSnapshot::default();
    busy.merge_data = Some(MergeData { enabled: true });
    busy.split_data = Some(SplitData { enabled: true });
    busy.group_data = Some(GroupData {
        enabled: true,
        reset_group: false,
    });
    busy.interaction_data = Some(InteractionData {
        enabled: true,
        ..InteractionData::default()
    });
    busy.select_region_data = Some(SelectRegionData { enabled: true });
    for reason in [
        UpdateReason::Merge,
        UpdateReason::Split,
        UpdateReason::Group,
        UpdateReason::Interact,
        UpdateReason::SelectRegion,
    ] {
        view.notify(reason, &busy).unwrap();
        assert_eq!(view.mode(), Mode::Draw);
    }
    // No foreign handler was enabled.
    assert!(calls
        .borrow()
        .iter()
        .all(|call| !call.ends_with(":enable") || call.starts_with("draw")));

    // Gestures never nest inside a busy mode either.
    assert!(!view.begin_shape_drag(1));
}

#[test]
fn cancel_notification_restores_idle_with_one_event() {
    let (mut view, calls) = view_with_handlers();

    let mut snapshot = ModelSnapshot::default();
    snapshot.merge_data = Some(MergeData { enabled: true });
    view.notify(UpdateReason::Merge, &snapshot).unwrap();
    assert_eq!(view.mode(), Mode::Merge);

    view.notify(UpdateReason::Cancel, &ModelSnapshot::default())
        .unwrap();

    assert_eq!(view.mode(), Mode::Idle);
    assert_eq!(view.poll_events(), vec![CanvasEvent::Canceled]);
    assert_eq!(calls.borrow().last().unwrap(), "merge:cancel");

    // A second cancel is a no-op and emits nothing.
    view.notify(UpdateReason::Cancel, &ModelSnapshot::default())
        .unwrap();
    assert!(view.poll_events().is_empty());
}

#[test]
fn draw_continuation_keeps_mode_busy() {
    let (mut view, calls) = view_with_handlers();

    let mut snapshot = ModelSnapshot::default();
    snapshot.draw_data = Some(DrawData {
        enabled: true,
        continue_session: true,
        ..DrawData::default()
    });
    view.notify(UpdateReason::Draw, &snapshot).unwrap();

    let detail = DrawnDetail {
        shape_type: ShapeType::Rectangle,
        points: vec![100.0, 100.0, 150.0, 150.0],
        rotation: 0.0,
        label_id: Some(1),
        duration_ms: 900,
    };
    view.on_draw_done(Some(detail), true).unwrap();

    // Still drawing: no disable was sent and the mode stayed busy.
    assert_eq!(view.mode(), Mode::Draw);
    assert!(!calls.borrow().iter().any(|call| call == "draw:disable"));

    let events = view.poll_events();
    match &events[..] {
        [CanvasEvent::Drawn { detail }] => {
            // Canvas-space input was translated back to image space.
            assert_eq!(detail.points, vec![0.0, 0.0, 50.0, 50.0]);
        }
        other => panic!("expected a single drawn event, got {other:?}"),
    }

    // The next completion ends the session.
    view.on_draw_done(None, false).unwrap();
    assert_eq!(view.mode(), Mode::Idle);
}

#[test]
fn merge_completion_emits_once_and_idles() {
    let (mut view, _calls) = view_with_handlers();

    let mut snapshot = ModelSnapshot::default();
    snapshot.merge_data = Some(MergeData { enabled: true });
    view.notify(UpdateReason::Merge, &snapshot).unwrap();

    view.on_merge_done(Some(vec![4, 9]), 2500).unwrap();

    assert_eq!(view.mode(), Mode::Idle);
    assert_eq!(
        view.poll_events(),
        vec![CanvasEvent::Merged {
            client_ids: vec![4, 9],
            duration_ms: 2500,
        }]
    );

    // A completion without a running operation is a typed error, not a panic.
    assert!(view.on_merge_done(Some(vec![1]), 0).is_err());
}

#[test]
fn select_forwards_to_busy_handler_and_finds_when_idle() {
    let (mut view, calls) = view_with_handlers();
    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 0)]),
    )
    .unwrap();

    // Idle: a select resolves to a find event.
    let mut snapshot = objects_snapshot(vec![rectangle(1, 0)]);
    snapshot.selected = Some(1);
    view.notify(UpdateReason::Select, &snapshot).unwrap();
    assert_eq!(view.poll_events(), vec![CanvasEvent::Find { client_id: 1 }]);

    // Busy: the same notification is forwarded to the active handler.
    let mut merge = ModelSnapshot::default();
    merge.merge_data = Some(MergeData { enabled: true });
    view.notify(UpdateReason::Merge, &merge).unwrap();
    view.notify(UpdateReason::Select, &snapshot).unwrap();

    assert!(view.poll_events().is_empty());
    assert_eq!(calls.borrow().last().unwrap(), "merge:enable");
}

#[test]
fn zoom_and_drag_canvas_emit_start_stop() {
    let (mut view, _calls) = view_with_handlers();

    let mut snapshot = ModelSnapshot::default();
    snapshot.zoom_canvas_data = Some(annotink_canvas::ZoomCanvasData { enabled: true });
    view.notify(UpdateReason::ZoomCanvas, &snapshot).unwrap();
    assert_eq!(view.mode(), Mode::ZoomCanvas);

    snapshot.zoom_canvas_data = Some(annotink_canvas::ZoomCanvasData { enabled: false });
    view.notify(UpdateReason::ZoomCanvas, &snapshot).unwrap();
    assert_eq!(view.mode(), Mode::Idle);
    assert_eq!(
        view.poll_events(),
        vec![CanvasEvent::ZoomStart, CanvasEvent::ZoomStop]
    );

    let mut snapshot = ModelSnapshot::default();
    snapshot.drag_canvas_data = Some(annotink_canvas::DragCanvasData { enabled: true });
    view.notify(UpdateReason::DragCanvas, &snapshot).unwrap();
    snapshot.drag_canvas_data = Some(annotink_canvas::DragCanvasData { enabled: false });
    view.notify(UpdateReason::DragCanvas, &snapshot).unwrap();
    assert_eq!(
        view.poll_events(),
        vec![CanvasEvent::DragStart, CanvasEvent::DragStop]
    );
}

#[test]
fn gesture_interruption_resolves_to_cancellation() {
    let (mut view, _calls) = view_with_handlers();
    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 0)]),
    )
    .unwrap();

    let mut snapshot = objects_snapshot(vec![rectangle(1, 0)]);
    snapshot.active_element = ActiveElement::new(1);
    view.notify(UpdateReason::ShapeActivated, &snapshot).unwrap();
    view.poll_events();

    let before = view.scene().get(1).unwrap().points.clone();
    assert!(view.begin_shape_drag(1));
    assert!(view.drag_shape_by(Vec2::new(30.0, 30.0)));

    // Pointer released outside the expected target: the gesture cancels,
    // the shape snaps back, and the mode is idle again.
    assert!(view.cancel_shape_gesture());
    assert_eq!(view.mode(), Mode::Idle);
    assert_eq!(view.scene().get(1).unwrap().points, before);
    assert_eq!(view.poll_events(), vec![CanvasEvent::Canceled]);
}

#[test]
fn config_update_reaches_every_handler() {
    let (mut view, calls) = view_with_handlers();

    let mut snapshot = ModelSnapshot::default();
    snapshot.configuration.display_all_text = true;
    view.notify(UpdateReason::ConfigUpdated, &snapshot).unwrap();

    let configure_calls = calls
        .borrow()
        .iter()
        .filter(|call| call.ends_with(":configure"))
        .count();
    assert_eq!(configure_calls, 9);
}

#[test]
fn reactivation_survives_object_update() {
    let (mut view, _calls) = view_with_handlers();
    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 0)]),
    )
    .unwrap();

    let mut snapshot = objects_snapshot(vec![rectangle(1, 0)]);
    snapshot.active_element = ActiveElement::new(1);
    view.notify(UpdateReason::ShapeActivated, &snapshot).unwrap();
    view.poll_events();

    view.notify(
        UpdateReason::ObjectsUpdated,
        &objects_snapshot(vec![rectangle(1, 1)]),
    )
    .unwrap();

    assert_eq!(view.active_element().client_id, Some(1));
    assert_eq!(
        view.poll_events(),
        vec![CanvasEvent::Activated {
            client_id: 1,
            attribute_id: None
        }]
    );
}
