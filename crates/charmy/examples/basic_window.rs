//! One window printing its resize and move events.
//!
//! Run with `RUST_LOG=debug` to see the runtime lifecycle.

use charmy::prelude::*;

fn main() -> charmy::Result<()> {
    charmy::core::logging::init();

    let manager = Manager::new(ManagerConfig::from_env())?;
    let window = Window::new(&manager, WindowDescriptor::new().with_size(300, 160))?;

    window.bind("resize", |event| {
        println!("<{}>: {}x{}", event.kind(), event["width"], event["height"]);
        Ok(())
    });
    window.bind("move", |event| {
        println!("<{}>: {}+{}", event.kind(), event["x_root"], event["y_root"]);
        Ok(())
    });

    println!("{window}");

    manager.mainloop()
}
