//! File operations exposed to the registrar

use crate::buffer::FixedBuffer;
use crate::devno::{DevNumber, MAX_MAJOR};
use crate::handle::Handle;
use crate::storage::AccessMode;
use crate::{Error, Result, MEM_CLEAR};
use log::warn;
use std::sync::Arc;

pub const SEEK_SET: i32 = 0;
pub const SEEK_CUR: i32 = 1;
pub const SEEK_END: i32 = 2;

/// Reference point of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    /// Recognised but not supported by the device
    End,
}

impl SeekOrigin {
    /// Decode a POSIX `whence` value
    pub fn from_raw(whence: i32) -> Result<Self> {
        match whence {
            SEEK_SET => Ok(SeekOrigin::Start),
            SEEK_CUR => Ok(SeekOrigin::Current),
            SEEK_END => Ok(SeekOrigin::End),
            other => Err(Error::UnknownOrigin(other)),
        }
    }
}

/// Out-of-band device command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Zero the whole device memory
    Clear,
}

impl Command {
    pub fn from_raw(cmd: u32) -> Result<Self> {
        match cmd {
            MEM_CLEAR => Ok(Command::Clear),
            other => Err(Error::UnsupportedCommand(other)),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Command::Clear => MEM_CLEAR,
        }
    }
}

/// Entry points a registrar binds to a device number.
///
/// These take the raw integer forms a device node receives; the typed
/// operations live on [`Handle`].
pub trait FileOperations: Send + Sync {
    fn open(&self, minor: u32, mode: AccessMode) -> Result<Handle>;

    fn release(&self, handle: Handle) -> Result<()> {
        handle.close();
        Ok(())
    }

    fn read(&self, handle: &mut Handle, len: usize) -> Result<Vec<u8>>;

    fn write(&self, handle: &mut Handle, data: &[u8]) -> Result<usize>;

    fn llseek(&self, handle: &mut Handle, offset: i64, whence: i32) -> Result<u64>;

    fn ioctl(&self, handle: &mut Handle, cmd: u32, arg: u64) -> Result<()>;
}

/// The global memory device: one [`FixedBuffer`] behind minor 0
#[derive(Debug, Clone)]
pub struct GlobalMem {
    buffer: Arc<FixedBuffer>,
    major: u32,
}

impl GlobalMem {
    /// Bind `buffer` to `major`, which must fit in a [`DevNumber`]
    pub fn new(buffer: Arc<FixedBuffer>, major: u32) -> Result<Self> {
        if major > MAX_MAJOR {
            return Err(Error::InvalidConfig(format!(
                "major {} exceeds {}",
                major, MAX_MAJOR
            )));
        }
        Ok(Self { buffer, major })
    }

    pub fn buffer(&self) -> &Arc<FixedBuffer> {
        &self.buffer
    }

    pub fn devno(&self) -> DevNumber {
        DevNumber::new(self.major, 0)
    }
}

impl FileOperations for GlobalMem {
    fn open(&self, minor: u32, mode: AccessMode) -> Result<Handle> {
        if minor != 0 {
            return Err(Error::NoSuchDevice(
                DevNumber::new(self.major, minor).to_string(),
            ));
        }
        Ok(Handle::new(Arc::clone(&self.buffer), mode, Some(self.devno())))
    }

    fn read(&self, handle: &mut Handle, len: usize) -> Result<Vec<u8>> {
        handle.read_vec(len)
    }

    fn write(&self, handle: &mut Handle, data: &[u8]) -> Result<usize> {
        handle.write(data)
    }

    fn llseek(&self, handle: &mut Handle, offset: i64, whence: i32) -> Result<u64> {
        handle.seek(offset, SeekOrigin::from_raw(whence)?)
    }

    fn ioctl(&self, handle: &mut Handle, cmd: u32, _arg: u64) -> Result<()> {
        let command = Command::from_raw(cmd).inspect_err(|_| {
            warn!("unsupported ioctl {:#x} on {}", cmd, handle.label());
        })?;
        handle.control(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CAPACITY;

    fn device() -> GlobalMem {
        GlobalMem::new(Arc::new(FixedBuffer::new()), 230).unwrap()
    }

    #[test]
    fn test_major_out_of_range_rejected() {
        let buffer = Arc::new(FixedBuffer::new());
        assert!(matches!(
            GlobalMem::new(Arc::clone(&buffer), MAX_MAJOR + 1),
            Err(Error::InvalidConfig(_))
        ));
        assert!(GlobalMem::new(Arc::clone(&buffer), 5000).is_err());

        let dev = GlobalMem::new(buffer, MAX_MAJOR).unwrap();
        assert_eq!(dev.devno().major(), MAX_MAJOR);
    }

    #[test]
    fn test_origin_codes() {
        assert_eq!(SeekOrigin::from_raw(0).unwrap(), SeekOrigin::Start);
        assert_eq!(SeekOrigin::from_raw(1).unwrap(), SeekOrigin::Current);
        assert_eq!(SeekOrigin::from_raw(2).unwrap(), SeekOrigin::End);
        assert!(matches!(SeekOrigin::from_raw(3), Err(Error::UnknownOrigin(3))));
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::from_raw(MEM_CLEAR).unwrap(), Command::Clear);
        assert_eq!(Command::Clear.as_raw(), 0x1);
        assert!(matches!(Command::from_raw(2), Err(Error::UnsupportedCommand(2))));
    }

    #[test]
    fn test_open_minor_zero_only() {
        let dev = device();
        let handle = dev.open(0, AccessMode::ReadWrite).unwrap();
        assert_eq!(handle.devno(), Some(DevNumber::new(230, 0)));
        assert_eq!(handle.label().to_string(), "230:0");
        assert!(matches!(
            dev.open(1, AccessMode::ReadWrite),
            Err(Error::NoSuchDevice(_))
        ));
        dev.release(handle).unwrap();
    }

    #[test]
    fn test_raw_entry_points() {
        let dev = device();
        let mut handle = dev.open(0, AccessMode::ReadWrite).unwrap();

        assert_eq!(dev.write(&mut handle, b"hello").unwrap(), 5);
        assert_eq!(dev.llseek(&mut handle, 0, SEEK_SET).unwrap(), 0);
        assert_eq!(dev.read(&mut handle, 5).unwrap(), b"hello");
        assert_eq!(dev.llseek(&mut handle, -2, SEEK_CUR).unwrap(), 3);

        let err = dev.llseek(&mut handle, 0, SEEK_END).unwrap_err();
        assert!(err.is_invalid_argument());
        let err = dev.llseek(&mut handle, 0, 7).unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(handle.position(), 3);

        let err = dev.ioctl(&mut handle, 0x2, 0).unwrap_err();
        assert_eq!(err.errno(), crate::error::errno::EINVAL);

        dev.ioctl(&mut handle, MEM_CLEAR, 0).unwrap();
        assert_eq!(dev.llseek(&mut handle, 0, SEEK_SET).unwrap(), 0);
        assert_eq!(dev.read(&mut handle, CAPACITY).unwrap(), vec![0u8; CAPACITY]);
    }
}
