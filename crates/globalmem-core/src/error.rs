//! Error types for globalmem

use crate::ops::SeekOrigin;
use thiserror::Error;

/// POSIX error numbers reported by [`Error::errno`]
pub mod errno {
    pub const EBADF: i32 = 9;
    pub const ENOMEM: i32 = 12;
    pub const EFAULT: i32 = 14;
    pub const EBUSY: i32 = 16;
    pub const EEXIST: i32 = 17;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("seek target {position} outside [0, {capacity}]")]
    SeekOutOfRange { position: i128, capacity: usize },

    #[error("seek origin {0:?} is not supported")]
    UnsupportedOrigin(SeekOrigin),

    #[error("unknown seek origin: {0}")]
    UnknownOrigin(i32),

    #[error("unsupported control command: {0:#x}")]
    UnsupportedCommand(u32),

    #[error("transfer fault: {0}")]
    TransferFault(#[source] std::io::Error),

    #[error("range {offset}+{len} outside buffer of {capacity} bytes")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("handle not opened for {0}")]
    BadAccess(&'static str),

    #[error("major number {0} already registered")]
    MajorBusy(u32),

    #[error("no free dynamic major number")]
    NoDynamicMajor,

    #[error("device node already exists: {0}")]
    NodeExists(String),

    #[error("no such device: {0}")]
    NoSuchDevice(String),

    #[error("shared memory error: {0}")]
    SharedMemory(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// POSIX error number for this error
    pub fn errno(&self) -> i32 {
        match self {
            Error::SeekOutOfRange { .. }
            | Error::UnsupportedOrigin(_)
            | Error::UnknownOrigin(_)
            | Error::UnsupportedCommand(_)
            | Error::InvalidConfig(_) => errno::EINVAL,
            Error::TransferFault(_) | Error::OutOfBounds { .. } => errno::EFAULT,
            Error::BadAccess(_) => errno::EBADF,
            Error::MajorBusy(_) | Error::NoDynamicMajor => errno::EBUSY,
            Error::NodeExists(_) => errno::EEXIST,
            Error::NoSuchDevice(_) => errno::ENODEV,
            Error::SharedMemory(_) => errno::ENOMEM,
        }
    }

    /// Whether the caller passed an argument the device rejects
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::SeekOutOfRange { .. }
                | Error::UnsupportedOrigin(_)
                | Error::UnknownOrigin(_)
                | Error::UnsupportedCommand(_)
        )
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        use std::io::ErrorKind;
        match e {
            Error::TransferFault(inner) => inner,
            e if e.is_invalid_argument() => std::io::Error::new(ErrorKind::InvalidInput, e),
            e @ Error::BadAccess(_) => std::io::Error::new(ErrorKind::PermissionDenied, e),
            e => std::io::Error::other(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
