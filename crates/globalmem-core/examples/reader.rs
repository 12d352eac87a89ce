//! Map the device memory created by `writer` and read it back.
//!
//! ```bash
//! cargo run --example reader
//! ```

use globalmem_core::{AccessMode, FixedBuffer, Handle};
use std::sync::Arc;

const OS_ID: &str = "/globalmem_demo";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let buffer = Arc::new(FixedBuffer::open_shared(OS_ID)?);
    println!("Mapped {} ({} bytes)", OS_ID, buffer.capacity());

    let mut handle = Handle::open_with_mode(&buffer, AccessMode::ReadOnly);
    let data = handle.read_vec(64)?;
    let text_len = data.iter().position(|&b| b == 0).unwrap_or(data.len());

    println!("Read {} bytes, cursor at {}", data.len(), handle.position());
    println!("Content: {}", String::from_utf8_lossy(&data[..text_len]));

    Ok(())
}
