//! # Nested Frames Example
//!
//! Builds a small frame tree and shows which frames observe an emission:
//!
//! ```text
//!   shell (https://shell.example)
//!     ├── cart   (https://cart.example)
//!     └── search (https://search.example)   ← embedded after the buses exist
//! ```
//!
//! - `shell` emits `cart/refresh`: both children receive it (shell too, via the
//!   same-origin path).
//! - `cart` emits `cart/updated` with child propagation disabled: only `cart`
//!   and its parent `shell` receive it.
//!
//! ## Run
//! ```bash
//! RUST_LOG=framebus=trace cargo run --example nested_frames --features logging
//! ```

use std::time::Duration;

use framebus::{Config, FrameBus, Subscription, Window, logging};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CartEvent {
    items: u32,
}

fn attach(frame: &Window, bus: &FrameBus<CartEvent>) -> Subscription<CartEvent> {
    let name = frame.origin().to_string();
    bus.listen(["cart/refresh", "cart/updated"], move |ev: &CartEvent| {
        println!("[{name}] received items={}", ev.items);
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let shell = Window::top("https://shell.example");
    let cart = shell.embed("https://cart.example");

    let shell_bus: FrameBus<CartEvent> = FrameBus::new(shell.clone());
    let cart_bus: FrameBus<CartEvent> =
        FrameBus::with_config(cart.clone(), Config::default().with_child_frames(false));
    let _shell_sub = attach(&shell, &shell_bus);
    let _cart_sub = attach(&cart, &cart_bus);

    // A frame that appears later is picked up by the next emit.
    let search = shell.embed("https://search.example");
    let search_bus: FrameBus<CartEvent> = FrameBus::new(search.clone());
    let _search_sub = attach(&search, &search_bus);

    println!("-- shell emits cart/refresh");
    shell_bus.emit(["cart/refresh"], &CartEvent { items: 0 })?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("-- cart emits cart/updated");
    cart_bus.emit(["cart/updated"], &CartEvent { items: 3 })?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("-- search frame closed");
    search.close();
    shell_bus.emit(["cart/refresh"], &CartEvent { items: 3 })?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    Ok(())
}
