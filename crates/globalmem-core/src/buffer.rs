//! Fixed-capacity device memory

use crate::shm::SharedMemory;
use crate::storage::{BufferData, StorageType};
use crate::{Error, Result, CAPACITY};
use parking_lot::Mutex;

/// Byte-addressable memory of a fixed size, shared by every open handle.
///
/// The length never changes after creation and starts out all zero. Every
/// access takes the internal lock for the duration of the copy only, so a
/// single `copy_in`/`copy_out`/`clear` is never observed half done by another
/// thread of this process.
#[derive(Debug)]
pub struct FixedBuffer {
    data: Mutex<BufferData>,
    capacity: usize,
}

impl FixedBuffer {
    /// Heap-backed buffer of [`CAPACITY`] bytes
    pub fn new() -> Self {
        Self::with_capacity(CAPACITY)
    }

    /// Heap-backed buffer of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_data(BufferData::zeroed(capacity))
    }

    /// Create a shared memory segment of [`CAPACITY`] bytes named `os_id`
    pub fn create_shared(os_id: &str) -> Result<Self> {
        let shm = SharedMemory::create(os_id, CAPACITY)?;
        Ok(Self::from_data(BufferData::Shared(shm)))
    }

    /// Map a segment created by another process with [`FixedBuffer::create_shared`]
    pub fn open_shared(os_id: &str) -> Result<Self> {
        let shm = SharedMemory::open(os_id)?;
        // The OS may round the mapping up to a page; only CAPACITY is addressable.
        if shm.size() < CAPACITY {
            return Err(Error::SharedMemory(format!(
                "segment {} holds {} bytes, need {}",
                shm.name(),
                shm.size(),
                CAPACITY
            )));
        }
        Ok(Self {
            data: Mutex::new(BufferData::Shared(shm)),
            capacity: CAPACITY,
        })
    }

    fn from_data(data: BufferData) -> Self {
        let capacity = data.size();
        Self {
            data: Mutex::new(data),
            capacity,
        }
    }

    /// Name of the shared memory segment, if the buffer lives in one
    pub fn shared_name(&self) -> Option<String> {
        match &*self.data.lock() {
            BufferData::Heap(_) => None,
            BufferData::Shared(shm) => Some(shm.name().to_string()),
        }
    }

    /// Addressable size in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn storage_type(&self) -> StorageType {
        self.data.lock().storage_type()
    }

    /// Set every byte to zero
    pub fn clear(&self) {
        let mut data = self.data.lock();
        data.as_mut_slice()[..self.capacity].fill(0);
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`
    pub fn copy_out(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        let range = self.checked_range(offset, dst.len())?;
        let data = self.data.lock();
        dst.copy_from_slice(&data.as_slice()[range]);
        Ok(())
    }

    /// Copy `src` into the buffer starting at `offset`
    pub fn copy_in(&self, offset: usize, src: &[u8]) -> Result<()> {
        let range = self.checked_range(offset, src.len())?;
        let mut data = self.data.lock();
        data.as_mut_slice()[range].copy_from_slice(src);
        Ok(())
    }

    /// Copy of the whole addressable contents
    pub fn snapshot(&self) -> Vec<u8> {
        let data = self.data.lock();
        data.as_slice()[..self.capacity].to_vec()
    }

    fn checked_range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.capacity => Ok(offset..end),
            _ => Err(Error::OutOfBounds {
                offset,
                len,
                capacity: self.capacity,
            }),
        }
    }
}

impl Default for FixedBuffer {
    fn default() -> Self {
        Self::new()
    }
}
