//! Open sessions against the device memory

use crate::buffer::FixedBuffer;
use crate::devno::DevNumber;
use crate::ops::{Command, SeekOrigin};
use crate::storage::AccessMode;
use crate::{Error, Result};
use log::{debug, trace, warn};
use std::io;
use std::sync::Arc;

/// Largest chunk staged on the stack when streaming to or from a caller.
const STAGE_SIZE: usize = 512;

/// An open session: a cursor into a shared [`FixedBuffer`].
///
/// The cursor always lies in `[0, capacity]`. A cursor equal to the capacity
/// is a valid position with nothing left to read or write. Handles are not
/// synchronised; give each caller its own.
pub struct Handle {
    /// Shared device memory
    buffer: Arc<FixedBuffer>,
    /// Current file position
    cursor: usize,
    /// Access mode
    mode: AccessMode,
    /// Device number the handle was opened on; `None` for handles opened
    /// straight on a buffer
    devno: Option<DevNumber>,
}

/// Log label of a handle's device
pub(crate) struct DeviceLabel(Option<DevNumber>);

impl std::fmt::Display for DeviceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(devno) => write!(f, "{}", devno),
            None => f.write_str("anonymous"),
        }
    }
}

impl Handle {
    /// Open a read-write handle on `buffer`
    pub fn open(buffer: &Arc<FixedBuffer>) -> Self {
        Self::open_with_mode(buffer, AccessMode::ReadWrite)
    }

    /// Open a handle with an explicit access mode.
    ///
    /// The handle is not bound to a device number.
    pub fn open_with_mode(buffer: &Arc<FixedBuffer>, mode: AccessMode) -> Self {
        Self::new(Arc::clone(buffer), mode, None)
    }

    pub(crate) fn new(
        buffer: Arc<FixedBuffer>,
        mode: AccessMode,
        devno: Option<DevNumber>,
    ) -> Self {
        debug!("open {} ({:?})", DeviceLabel(devno), mode);
        Self {
            buffer,
            cursor: 0,
            mode,
            devno,
        }
    }

    /// Current file position
    pub fn position(&self) -> u64 {
        self.cursor as u64
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Device number, if the handle was opened through a device
    pub fn devno(&self) -> Option<DevNumber> {
        self.devno
    }

    pub(crate) fn label(&self) -> DeviceLabel {
        DeviceLabel(self.devno)
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn buffer(&self) -> &Arc<FixedBuffer> {
        &self.buffer
    }

    /// Bytes that can move at the cursor, at most `len`
    fn span(&self, len: usize) -> usize {
        self.buffer.capacity().saturating_sub(self.cursor).min(len)
    }

    fn check_readable(&self) -> Result<()> {
        if self.mode.readable() {
            Ok(())
        } else {
            Err(Error::BadAccess("reading"))
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.mode.writable() {
            Ok(())
        } else {
            Err(Error::BadAccess("writing"))
        }
    }

    /// Read up to `dst.len()` bytes at the cursor and advance it.
    ///
    /// Returns `Ok(0)` at the end of the buffer.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        self.check_readable()?;
        let count = self.span(dst.len());
        if count == 0 {
            return Ok(0);
        }
        self.buffer.copy_out(self.cursor, &mut dst[..count])?;
        trace!("read {} bytes at {} from {}", count, self.cursor, self.label());
        self.cursor += count;
        Ok(count)
    }

    /// Read up to `len` bytes into a new vector
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.span(len)];
        let count = self.read(&mut out)?;
        out.truncate(count);
        Ok(out)
    }

    /// Deliver up to `len` bytes at the cursor to `sink`.
    ///
    /// A failing sink is reported as [`Error::TransferFault`] and leaves the
    /// cursor where it was.
    pub fn read_to<W: io::Write + ?Sized>(&mut self, sink: &mut W, len: usize) -> Result<usize> {
        self.check_readable()?;
        let count = self.span(len);
        if count == 0 {
            return Ok(0);
        }
        let mut staged = vec![0u8; count];
        self.buffer.copy_out(self.cursor, &mut staged)?;
        sink.write_all(&staged).map_err(Error::TransferFault)?;
        trace!("read {} bytes at {} from {}", count, self.cursor, self.label());
        self.cursor += count;
        Ok(count)
    }

    /// Write `src` at the cursor, clamped to the space left, and advance it.
    ///
    /// Returns the number of bytes accepted; `Ok(0)` at the end of the buffer.
    pub fn write(&mut self, src: &[u8]) -> Result<usize> {
        self.check_writable()?;
        let count = self.span(src.len());
        if count == 0 {
            return Ok(0);
        }
        self.buffer.copy_in(self.cursor, &src[..count])?;
        trace!("wrote {} bytes at {} to {}", count, self.cursor, self.label());
        self.cursor += count;
        Ok(count)
    }

    /// Take up to `len` bytes from `source` and write them at the cursor.
    ///
    /// The clamped count is read from `source` in full before anything is
    /// stored; a failing or short source is [`Error::TransferFault`] and
    /// leaves both the buffer and the cursor untouched.
    pub fn write_from<R: io::Read + ?Sized>(&mut self, source: &mut R, len: usize) -> Result<usize> {
        self.check_writable()?;
        let count = self.span(len);
        if count == 0 {
            return Ok(0);
        }
        let mut staged = Vec::with_capacity(count);
        let mut chunk = [0u8; STAGE_SIZE];
        while staged.len() < count {
            let want = (count - staged.len()).min(STAGE_SIZE);
            source
                .read_exact(&mut chunk[..want])
                .map_err(Error::TransferFault)?;
            staged.extend_from_slice(&chunk[..want]);
        }
        self.buffer.copy_in(self.cursor, &staged)?;
        trace!("wrote {} bytes at {} to {}", count, self.cursor, self.label());
        self.cursor += count;
        Ok(count)
    }

    /// Move the cursor. Positions outside `[0, capacity]` are rejected and
    /// leave the cursor unchanged.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        let candidate = match origin {
            SeekOrigin::Start => i128::from(offset),
            SeekOrigin::Current => self.cursor as i128 + i128::from(offset),
            SeekOrigin::End => {
                warn!("seek from end rejected on {}", self.label());
                return Err(Error::UnsupportedOrigin(origin));
            }
        };
        self.seek_to(candidate)
    }

    fn seek_to(&mut self, candidate: i128) -> Result<u64> {
        let capacity = self.buffer.capacity();
        if candidate < 0 || candidate > capacity as i128 {
            warn!("seek to {} outside [0, {}] on {}", candidate, capacity, self.label());
            return Err(Error::SeekOutOfRange {
                position: candidate,
                capacity,
            });
        }
        self.cursor = candidate as usize;
        Ok(self.cursor as u64)
    }

    /// Run an out-of-band command against the device memory
    pub fn control(&self, command: Command) -> Result<()> {
        match command {
            Command::Clear => {
                self.buffer.clear();
                debug!("{} cleared", self.label());
            }
        }
        Ok(())
    }

    /// Close the handle. The device memory is not affected.
    pub fn close(self) {}
}

impl Drop for Handle {
    fn drop(&mut self) {
        debug!("release {}", self.label());
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("devno", &self.devno)
            .field("cursor", &self.cursor)
            .field("mode", &self.mode)
            .finish()
    }
}

impl io::Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(Handle::read(self, buf)?)
    }
}

impl io::Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(Handle::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for Handle {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let position = match pos {
            io::SeekFrom::Start(n) => self.seek_to(i128::from(n))?,
            io::SeekFrom::Current(n) => Handle::seek(self, n, SeekOrigin::Current)?,
            io::SeekFrom::End(n) => Handle::seek(self, n, SeekOrigin::End)?,
        };
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Seek as _, Write as _};

    fn small() -> Arc<FixedBuffer> {
        Arc::new(FixedBuffer::with_capacity(16))
    }

    #[test]
    fn test_open_starts_at_zero() {
        let buf = small();
        let handle = Handle::open(&buf);
        assert_eq!(handle.position(), 0);
        assert_eq!(handle.mode(), AccessMode::ReadWrite);
        assert_eq!(handle.capacity(), 16);
        assert_eq!(handle.devno(), None);
        assert_eq!(handle.label().to_string(), "anonymous");
    }

    #[test]
    fn test_read_clamps_and_advances() {
        let buf = small();
        let mut handle = Handle::open(&buf);
        handle.seek(10, SeekOrigin::Start).unwrap();

        let mut out = [0xaa; 32];
        assert_eq!(handle.read(&mut out).unwrap(), 6);
        assert_eq!(handle.position(), 16);
        assert_eq!(&out[..6], &[0; 6]);
        assert_eq!(out[6], 0xaa);
        assert_eq!(handle.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_write_clamps() {
        let buf = small();
        let mut handle = Handle::open(&buf);
        handle.seek(12, SeekOrigin::Start).unwrap();
        assert_eq!(handle.write(b"abcdefgh").unwrap(), 4);
        assert_eq!(handle.position(), 16);
        assert_eq!(handle.write(b"x").unwrap(), 0);
        assert_eq!(&buf.snapshot()[12..], b"abcd");
    }

    #[test]
    fn test_seek_bounds() {
        let buf = small();
        let mut handle = Handle::open(&buf);
        assert_eq!(handle.seek(16, SeekOrigin::Start).unwrap(), 16);
        assert!(handle.seek(17, SeekOrigin::Start).is_err());
        assert_eq!(handle.position(), 16);
        assert_eq!(handle.seek(-6, SeekOrigin::Current).unwrap(), 10);
        assert!(handle.seek(-11, SeekOrigin::Current).is_err());
        assert!(handle.seek(i64::MAX, SeekOrigin::Current).is_err());
        assert!(matches!(
            handle.seek(0, SeekOrigin::End),
            Err(Error::UnsupportedOrigin(SeekOrigin::End))
        ));
        assert_eq!(handle.position(), 10);
    }

    #[test]
    fn test_access_mode_enforced() {
        let buf = small();
        let mut reader = Handle::open_with_mode(&buf, AccessMode::ReadOnly);
        assert!(matches!(reader.write(b"x"), Err(Error::BadAccess(_))));
        assert_eq!(reader.position(), 0);

        let mut writer = Handle::open_with_mode(&buf, AccessMode::WriteOnly);
        let mut out = [0u8; 1];
        assert!(matches!(writer.read(&mut out), Err(Error::BadAccess(_))));
        assert_eq!(writer.write(b"x").unwrap(), 1);
    }

    struct BrokenPipe;

    impl io::Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_to_fault_keeps_cursor() {
        let buf = small();
        let mut handle = Handle::open(&buf);
        let err = handle.read_to(&mut BrokenPipe, 4).unwrap_err();
        assert!(matches!(err, Error::TransferFault(_)));
        assert_eq!(handle.position(), 0);

        let mut sink = Vec::new();
        assert_eq!(handle.read_to(&mut sink, 40).unwrap(), 16);
        assert_eq!(sink.len(), 16);
    }

    #[test]
    fn test_write_from_short_source_is_fault() {
        let buf = small();
        let mut handle = Handle::open(&buf);
        let mut source: &[u8] = b"abc";
        let err = handle.write_from(&mut source, 8).unwrap_err();
        assert!(matches!(err, Error::TransferFault(_)));
        assert_eq!(handle.position(), 0);
        assert!(buf.snapshot().iter().all(|&b| b == 0));

        let mut source: &[u8] = b"abcdefgh";
        assert_eq!(handle.write_from(&mut source, 8).unwrap(), 8);
        assert_eq!(&buf.snapshot()[..8], b"abcdefgh");
    }

    #[test]
    fn test_std_io_traits() {
        let buf = small();
        let mut handle = Handle::open(&buf);
        handle.write_all(b"hello").unwrap();
        handle.rewind().unwrap();

        let mut text = [0u8; 5];
        handle.read_exact(&mut text).unwrap();
        assert_eq!(&text, b"hello");

        let err = io::Seek::seek(&mut handle, io::SeekFrom::End(0)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let err = io::Seek::seek(&mut handle, io::SeekFrom::Start(u64::MAX)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(handle.position(), 5);

        let mut rest = Vec::new();
        handle.read_to_end(&mut rest).unwrap();
        assert_eq!(rest.len(), 11);
    }

    #[test]
    fn test_control_clear_shared_across_handles() {
        let buf = small();
        let mut a = Handle::open(&buf);
        let mut b = Handle::open(&buf);
        a.write(b"data").unwrap();
        assert_eq!(b.read_vec(4).unwrap(), b"data");
        a.control(Command::Clear).unwrap();
        b.rewind().unwrap();
        assert_eq!(b.read_vec(4).unwrap(), vec![0u8; 4]);
    }
}
