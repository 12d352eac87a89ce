//! globalmem - fixed-size global memory character device

pub mod buffer;
pub mod config;
pub mod devno;
pub mod error;
pub mod handle;
pub mod ops;
pub mod registry;
pub mod shm;
pub mod storage;

pub use buffer::FixedBuffer;
pub use config::{Backing, DeviceConfig};
pub use devno::DevNumber;
pub use error::{Error, Result};
pub use handle::Handle;
pub use ops::{Command, FileOperations, GlobalMem, SeekOrigin};
pub use registry::{AttachedDevice, Registry};
pub use storage::{AccessMode, StorageType};

/// Size of the device memory in bytes
pub const CAPACITY: usize = 0x1000;

/// Control command that zeroes the device memory
pub const MEM_CLEAR: u32 = 0x1;

/// Major number used when none is configured
pub const DEFAULT_MAJOR: u32 = 230;

/// Region name of the device
pub const DEVICE_NAME: &str = "globalmem";
