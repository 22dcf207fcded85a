//! Window attributes, identities and drawing, run headless.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use charmy::frameworks::{StubCall, StubLog};
use charmy::prelude::*;

fn headless(log: &StubLog) -> Manager {
    ManagerBuilder::from_config(ManagerConfig::default())
        .headless(log.clone())
        .build()
        .unwrap()
}

#[test]
fn test_auto_ids_recompact_after_destroy() {
    let log = StubLog::new();
    let manager = headless(&log);

    let first = Window::new(&manager, WindowDescriptor::new()).unwrap();
    let second = Window::new(&manager, WindowDescriptor::new()).unwrap();
    assert_eq!(first.id(), Some("Window0"));
    assert_eq!(second.id(), Some("Window1"));
    assert_eq!(manager.object().id(), Some("manager0"));

    first.destroy();
    second.destroy();
    let third = Window::new(&manager, WindowDescriptor::new()).unwrap();
    assert_eq!(third.id(), Some("Window0"));
    assert!(manager.runtime().lookup("Window1").is_none());
}

#[test]
fn test_named_window_collision_leaves_no_trace() {
    let log = StubLog::new();
    let manager = headless(&log);
    let _main = Window::new(&manager, WindowDescriptor::new().with_id("main")).unwrap();

    let err = Window::new(&manager, WindowDescriptor::new().with_id("main")).unwrap_err();

    assert!(matches!(err, CharmyError::DuplicateIdentity { ref id } if id == "main"));
    assert_eq!(log.created(), 1);
    assert_eq!(manager.window_count(), 1);
    assert_eq!(manager.runtime().live_count("Window"), 1);
}

#[test]
fn test_failed_native_creation_releases_the_object() {
    let log = StubLog::new();
    let manager = headless(&log);
    log.fail_window_creation(true);

    let err = Window::new(&manager, WindowDescriptor::new()).unwrap_err();

    assert!(matches!(err, CharmyError::Native { code: 65543, .. }));
    assert_eq!(manager.runtime().live_count("Window"), 0);
    assert!(manager.runtime().lookup("Window0").is_none());
    assert_eq!(manager.window_count(), 0);
}

#[test]
fn test_size_and_root_pos_proxy_the_native_window() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(
        &manager,
        WindowDescriptor::new().with_size(300, 160).with_position(10, 20),
    )
    .unwrap();
    let object = window.object();

    assert!(object.attributes().is_virtual("size"));
    assert_eq!(object.get("size", Value::Null).unwrap(), Value::from(vec![300, 160]));
    assert_eq!(object.get("root_pos", Value::Null).unwrap(), Value::from(vec![10, 20]));

    let resizes = Arc::new(AtomicUsize::new(0));
    let seen = resizes.clone();
    window.bind("resize", move |event| {
        assert_eq!(event["width"], Value::from(640));
        assert_eq!(event["height"], Value::from(480));
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    window.resize(640, 480).unwrap();
    assert_eq!(resizes.load(Ordering::SeqCst), 1);
    assert_eq!(window.size().unwrap(), Size::new(640, 480));
    assert!(log.calls().contains(&StubCall::SetSize {
        handle: window.handle(),
        size: Size::new(640, 480),
    }));
    window.with_canvas(|canvas| assert_eq!((canvas.width(), canvas.height()), (640, 480)));

    object.set("root_pos", vec![-5, 7]).unwrap();
    assert_eq!(window.position().unwrap(), Pos::new(-5, 7));

    assert!(matches!(
        object.set("size", "big"),
        Err(CharmyError::AttributeCoercion { .. })
    ));
}

#[test]
fn test_manager_attributes_are_shared_through_windows() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();
    let object = window.object();

    assert_eq!(object.get("ui.framework.name", Value::Null).unwrap(), Value::from("STUB"));
    assert_eq!(
        object.get("drawing.framework.name", Value::Null).unwrap(),
        Value::from("SOFTWARE")
    );
    assert_eq!(object.get("backend.framework.name", Value::Null).unwrap(), Value::from("STUB"));
    assert_eq!(object.get("ui.samples", Value::Null).unwrap(), Value::from(4));

    object.set("ui.is_vsync", false).unwrap();
    assert!(!manager.is_vsync());
    assert_eq!(
        manager.object().get("ui.is_vsync", true).unwrap(),
        Value::from(false)
    );
}

#[test]
fn test_manager_lists_its_windows() {
    let log = StubLog::new();
    let manager = headless(&log);
    let first = Window::new(&manager, WindowDescriptor::new()).unwrap();
    let second = Window::new(&manager, WindowDescriptor::new()).unwrap();

    assert!(!manager.add_window(&first));
    assert_eq!(manager.find_window("Window1"), Some(second.clone()));

    let listed = manager.object().get("ui.windows", Value::Null).unwrap();
    assert_eq!(
        listed,
        Value::List(vec![
            Value::Object(first.object().clone()),
            Value::Object(second.object().clone()),
        ])
    );

    first.destroy();
    assert_eq!(manager.windows(), [second]);
}

#[test]
fn test_destroyed_window_refuses_native_operations() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();
    let object = window.object().clone();
    assert_eq!(object.get("is_alive", false).unwrap(), Value::from(true));

    window.destroy();

    assert!(!window.is_alive());
    assert_eq!(object.get("is_alive", true).unwrap(), Value::from(false));
    assert!(matches!(window.update(), Err(CharmyError::WindowDestroyed { .. })));
    assert!(matches!(window.resize(1, 1), Err(CharmyError::WindowDestroyed { .. })));
    assert!(matches!(
        object.get("size", Value::Null),
        Err(CharmyError::WindowDestroyed { .. })
    ));
    assert!(!window.should_close());
    assert_eq!(log.destroyed(), 1);
    assert_eq!(window.native_handle(), None);
    assert_eq!(object.get("native_handle", 0).unwrap(), Value::Null);
    // The creation handle still names the window in logs.
    assert_eq!(log.destroyed_handle(window.handle()), 1);
}

#[test]
fn test_native_handle_attribute_tracks_the_live_window() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let handle = window.native_handle().unwrap();
    assert_eq!(handle, window.handle());
    assert_eq!(
        window.object().get("native_handle", Value::Null).unwrap(),
        Value::Int(handle.0 as i64)
    );
}

#[test]
fn test_out_of_range_geometry_is_rejected_without_side_effects() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(
        &manager,
        WindowDescriptor::new().with_size(300, 160).with_position(1, 2),
    )
    .unwrap();
    let object = window.object();
    log.clear();

    for size in [vec![4_294_967_306i64, 20], vec![-1, -1], vec![10, -3]] {
        assert!(matches!(
            object.set("size", size),
            Err(CharmyError::AttributeCoercion { expected: ValueKind::List, .. })
        ));
    }
    assert!(matches!(
        object.set("root_pos", vec![4_294_967_303i64, 3]),
        Err(CharmyError::AttributeCoercion { .. })
    ));

    assert_eq!(window.size().unwrap(), Size::new(300, 160));
    assert_eq!(window.position().unwrap(), Pos::new(1, 2));
    window.with_canvas(|canvas| assert_eq!((canvas.width(), canvas.height()), (300, 160)));
    assert!(log.calls().is_empty());
}

#[test]
fn test_unallocatable_canvas_size_is_an_error() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new().with_size(300, 160)).unwrap();
    log.clear();

    let err = window.resize(u32::MAX, u32::MAX).unwrap_err();

    assert!(matches!(err, CharmyError::CanvasTooLarge { .. }));
    assert_eq!(window.size().unwrap(), Size::new(300, 160));
    assert!(log.calls().is_empty());

    let err = Window::new(&manager, WindowDescriptor::new().with_size(70_000, 70_000)).unwrap_err();
    assert!(matches!(err, CharmyError::CanvasTooLarge { width: 70_000, height: 70_000 }));
    assert_eq!(log.destroyed(), 1);
    assert_eq!(manager.window_count(), 1);
    assert_eq!(manager.runtime().live_count("Window"), 1);
}

#[test]
fn test_update_raises_event_and_redraws() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let updates = Arc::new(AtomicUsize::new(0));
    let seen = updates.clone();
    window.bind("update", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    window.update().unwrap();
    window.update().unwrap();

    assert_eq!(updates.load(Ordering::SeqCst), 2);
    assert_eq!(log.redraws(window.handle()), 2);
}

#[test]
fn test_draw_rect_paints_the_canvas() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new().with_size(40, 30)).unwrap();

    window.clear(Color::WHITE);
    window
        .draw_rect(Rect::new(10.0, 10.0, 20.0, 10.0), 0.0, &Paint::fill(Color::BLUE))
        .unwrap();

    window.with_canvas(|canvas| {
        assert_eq!(canvas.pixel(15, 15), Some(Color::BLUE));
        assert_eq!(canvas.pixel(5, 5), Some(Color::WHITE));
    });
}

#[test]
fn test_stub_drawing_records_rects() {
    let log = StubLog::new();
    let manager = ManagerBuilder::from_config(ManagerConfig::default())
        .headless(log.clone())
        .with_drawing_framework("stub")
        .build()
        .unwrap();
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let rect = Rect::new(0.0, 0.0, 50.0, 50.0);
    window.draw_rect(rect, 8.0, &Paint::default()).unwrap();

    assert!(log.calls().contains(&StubCall::DrawRect { rect, radius: 8.0 }));
}

#[test]
fn test_window_display_uses_identity() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new().with_title("Demo")).unwrap();

    assert_eq!(window.to_string(), "Window[Window0]");
    assert_eq!(window.title(), "Demo");
    assert!(log.calls().iter().any(|call| matches!(
        call,
        StubCall::CreateWindow { title, .. } if title == "Demo"
    )));
}
