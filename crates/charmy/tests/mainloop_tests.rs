//! Main loop behavior against the recording stub frameworks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use charmy::core::framework::{FrameworkKind, NativeHandle};
use charmy::frameworks::{StubCall, StubLog};
use charmy::prelude::*;

fn headless(log: &StubLog) -> Manager {
    ManagerBuilder::from_config(ManagerConfig::default())
        .headless(log.clone())
        .with_poll_timeout(Some(Duration::from_millis(1)))
        .build()
        .unwrap()
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

#[test]
fn test_mainloop_without_windows_only_cleans_up() {
    let log = StubLog::new();
    let manager = headless(&log);

    manager.mainloop().unwrap();

    assert_eq!(manager.cleanup_count(), 1);
    assert_eq!(manager.tick_count(), 0);
    assert_eq!(log.terminated(), 1);
    assert_eq!(log.waits(), 0);
    assert_eq!(manager.state(), ManagerState::Stopped);
}

#[test]
fn test_quit_from_update_ends_after_that_tick() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();
    let handle = window.handle();

    let updates = counter();
    let quit = manager.quit_handle();
    let seen = updates.clone();
    window.bind("update", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        quit.quit();
        Ok(())
    });

    manager.mainloop().unwrap();

    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert_eq!(manager.tick_count(), 1);
    assert_eq!(log.destroyed_handle(handle), 1);
    assert_eq!(log.destroyed(), 1);
    assert_eq!(log.terminated(), 1);
    assert!(!window.is_alive());
    assert_eq!(manager.window_count(), 0);
}

#[test]
fn test_destroyed_window_is_not_destroyed_again_at_shutdown() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    window.destroy();
    window.destroy();
    manager.mainloop().unwrap();

    assert_eq!(log.destroyed(), 1);
    assert_eq!(manager.cleanup_count(), 1);
}

#[test]
fn test_native_error_fails_the_loop_after_cleanup() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let updates = counter();
    let seen = updates.clone();
    window.bind("update", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    log.sink().unwrap().error(65544, "The X11 connection broke");
    let err = manager.mainloop().unwrap_err();

    assert!(matches!(err, CharmyError::LoopFailure(_)));
    assert!(matches!(err.root_cause(), CharmyError::Native { code: 65544, .. }));
    assert_eq!(updates.load(Ordering::SeqCst), 0);
    assert_eq!(log.destroyed(), 1);
    assert_eq!(log.terminated(), 1);
    assert_eq!(manager.state(), ManagerState::Stopped);
}

#[test]
fn test_handler_error_fails_the_loop() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();
    window.bind("update", |_| Err(CharmyError::custom("boom")));

    let err = manager.mainloop().unwrap_err();

    assert_eq!(err.root_cause().to_string(), "boom");
    assert_eq!(manager.cleanup_count(), 1);
}

#[test]
fn test_close_request_destroys_window_and_ends_loop() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let deletes = counter();
    let seen = deletes.clone();
    window.bind("delete_window", move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    log.sink().unwrap().close_requested(window.handle());
    manager.mainloop().unwrap();

    assert_eq!(deletes.load(Ordering::SeqCst), 1);
    assert_eq!(log.destroyed_handle(window.handle()), 1);
    assert!(!window.is_alive());
    assert_eq!(manager.window_count(), 0);
}

#[test]
fn test_delete_window_handler_can_veto_close() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let deletes = counter();
    let seen = deletes.clone();
    let target = window.clone();
    window.bind("delete_window", move |_| {
        // Refuse the first request only.
        let first = seen.fetch_add(1, Ordering::SeqCst) == 0;
        target.set_closable(!first)
    });

    let updates = counter();
    let seen = updates.clone();
    let target = window.clone();
    window.bind("update", move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            assert!(target.is_alive());
            assert!(!target.should_close());
            target.request_close()?;
        }
        Ok(())
    });

    window.request_close().unwrap();
    manager.mainloop().unwrap();

    assert_eq!(deletes.load(Ordering::SeqCst), 2);
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert_eq!(log.destroyed(), 1);
    assert_eq!(
        log.count(|c| matches!(c, StubCall::SetShouldClose { value: false, .. })),
        1
    );
}

#[test]
fn test_native_resize_and_move_reach_the_window() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new().with_size(300, 160)).unwrap();

    let (tx, rx) = mpsc::channel();
    let resized = tx.clone();
    window.bind("resize", move |event| {
        resized
            .send(format!("resize {}x{}", event["width"], event["height"]))
            .unwrap();
        Ok(())
    });
    window.bind("move", move |event| {
        tx.send(format!("move {},{}", event["x_root"], event["y_root"]))
            .unwrap();
        Ok(())
    });
    let quit = manager.quit_handle();
    window.bind("update", move |_| {
        quit.quit();
        Ok(())
    });

    let sink = manager.native_events();
    sink.resized(window.handle(), 640, 480);
    sink.moved(window.handle(), 12, 34);
    // Unknown handles are ignored.
    sink.resized(NativeHandle(999), 1, 1);
    manager.mainloop().unwrap();

    let events: Vec<String> = rx.try_iter().collect();
    assert_eq!(events, ["resize 640x480", "move 12,34"]);
    assert!(manager.tick_count() >= 1);
}

#[test]
fn test_worker_jobs_report_back_through_the_dispatcher() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let ui_thread = thread::current().id();
    let quit = manager.quit_handle();
    let (tx, rx) = mpsc::channel();
    window.bind("done", move |event| {
        assert_eq!(thread::current().id(), ui_thread);
        tx.send(event["answer"].as_int()).unwrap();
        quit.quit();
        Ok(())
    });

    let scheduled = counter();
    let worker = manager.worker_handle();
    let dispatcher = manager.dispatcher().clone();
    let target = window.object().clone();
    window.bind("update", move |_| {
        if scheduled.fetch_add(1, Ordering::SeqCst) > 0 {
            return Ok(());
        }
        let dispatcher = dispatcher.clone();
        let target = target.clone();
        worker.post(move || {
            dispatcher.post(&target, "done", payload! { "answer" => 42 });
        })
    });

    manager.mainloop().unwrap();

    assert_eq!(rx.try_recv().unwrap(), Some(42));
    assert!(!manager.worker().is_running());
}

#[test]
fn test_quit_from_another_thread() {
    let log = StubLog::new();
    let manager = headless(&log);
    let _window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let quit = manager.quit_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        quit.quit();
    });

    manager.mainloop().unwrap();
    stopper.join().unwrap();

    assert!(!manager.is_alive());
    assert_eq!(log.destroyed(), 1);
}

#[test]
fn test_swap_interval_follows_vsync() {
    let log = StubLog::new();
    let manager = headless(&log);
    let window = Window::new(&manager, WindowDescriptor::new()).unwrap();

    let ticks = counter();
    let quit = manager.quit_handle();
    let target = window.clone();
    window.bind("update", move |_| {
        match ticks.fetch_add(1, Ordering::SeqCst) {
            0 => target.object().set("ui.is_vsync", false)?,
            _ => quit.quit(),
        }
        Ok(())
    });

    manager.mainloop().unwrap();

    assert_eq!(log.swap_intervals(), [0, 0]);
    assert!(!manager.is_vsync());
}

#[test]
fn test_mainloop_can_run_again() {
    let log = StubLog::new();
    let manager = headless(&log);

    for _ in 0..2 {
        let window = Window::new(&manager, WindowDescriptor::new()).unwrap();
        let quit = manager.quit_handle();
        window.bind("update", move |_| {
            quit.quit();
            Ok(())
        });
        manager.mainloop().unwrap();
    }

    assert_eq!(manager.cleanup_count(), 2);
    assert_eq!(manager.tick_count(), 2);
    assert_eq!(log.destroyed(), 2);
}

#[test]
fn test_unknown_framework_is_rejected() {
    let err = ManagerBuilder::from_config(ManagerConfig::default())
        .with_ui_framework("glfw")
        .build()
        .unwrap_err();

    match err {
        CharmyError::UnknownFramework { kind, name } => {
            assert_eq!(kind, FrameworkKind::Ui);
            assert_eq!(name, "GLFW");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_frameworks_are_initialized_in_order() {
    let log = StubLog::new();
    let _manager = ManagerBuilder::from_config(ManagerConfig::default())
        .headless(log.clone())
        .with_samples(8)
        .build()
        .unwrap();

    assert_eq!(
        log.calls(),
        [
            StubCall::Init {
                samples: 8,
                vsync: true
            },
            StubCall::BackendInit {
                ui_framework: "STUB".to_string(),
                samples: 8
            },
        ]
    );
}
