//! Headless run: a worker job counts down and reports back through the
//! dispatcher; the loop quits when the count reaches zero.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use charmy::frameworks::StubLog;
use charmy::prelude::*;

fn main() -> charmy::Result<()> {
    charmy::core::logging::init();

    let log = StubLog::new();
    let manager = ManagerBuilder::from_config(ManagerConfig::default())
        .headless(log.clone())
        .build()?;
    let window = Window::new(&manager, WindowDescriptor::new().with_title("countdown"))?;

    let quit = manager.quit_handle();
    window.bind("countdown", move |event| {
        let left = event["left"].as_int().unwrap_or(0);
        println!("{left}...");
        if left == 0 {
            quit.quit();
        }
        Ok(())
    });

    // Jobs can only be posted once the loop runs, so the first tick schedules them.
    let dispatcher = manager.dispatcher().clone();
    let target = window.object().clone();
    let scheduled = AtomicBool::new(false);
    let worker = manager.worker_handle();
    window.bind("update", move |_| {
        if scheduled.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for left in (0..3).rev() {
            let dispatcher = dispatcher.clone();
            let target = target.clone();
            let delay = Duration::from_millis(100 * (3 - left) as u64);
            worker.post_after(delay, move || {
                dispatcher.post(&target, "countdown", payload! { "left" => left });
            })?;
        }
        Ok(())
    });

    manager.mainloop()?;
    println!("native windows destroyed: {}", log.destroyed());
    Ok(())
}
