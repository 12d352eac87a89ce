//! Attach a shared-memory backed device and write a message into it.
//!
//! Keeps running so `reader` can map the same memory:
//! ```bash
//! cargo run --example writer
//! ```

use globalmem_core::{AccessMode, DeviceConfig, Registry, SeekOrigin};
use std::thread;
use std::time::Duration;

const OS_ID: &str = "/globalmem_demo";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DeviceConfig::from_env()?.shared(OS_ID);
    let dev = Registry::global().attach(&config)?;
    println!("Attached {} as {} at {}", dev.name(), dev.devno(), dev.node());

    let mut handle = dev.open(AccessMode::WriteOnly)?;
    let data = b"Hello from writer! This is device memory.";
    let written = handle.write(data)?;
    println!("Written {} bytes, cursor at {}", written, handle.position());

    handle.seek(0, SeekOrigin::Start)?;
    println!("\nDevice is attached. Press Ctrl+C to exit...");

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}
