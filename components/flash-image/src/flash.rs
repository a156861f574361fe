//! NOR flash emulation on top of a host byte stream.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use littlefs2::{driver::Storage, io::Error as LfsError};

use crate::{
    constants::{ERASE_VALUE, LOOKAHEAD_SIZE, PAGE_SIZE, READ_SIZE, WRITE_SIZE},
    Error, Geometry, Result,
};

/// A byte-addressable NOR flash device backed by a seekable stream.
///
/// Writes are combined with the current contents using a bitwise AND, so
/// a bit that has been cleared stays cleared until the region is erased.
pub struct NorFlash<B = File> {
    backend: B,
    geometry: Geometry,
}

impl NorFlash<File> {
    /// Creates (or truncates) the image file at `path` and erases all of it.
    pub fn create(path: impl AsRef<Path>, geometry: Geometry) -> Result<Self> {
        let path = path.as_ref();
        let create_error = |source| Error::CreateImage {
            path: path.into(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(create_error)?;
        Self::erased(file, geometry).map_err(create_error)
    }

    /// Opens an existing image, its length defines the device size.
    ///
    /// The length must be a block multiple within the supported size range.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_error = |source| Error::OpenImage {
            path: path.into(),
            source,
        };
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(open_error)?;
        let len = file.metadata().map_err(open_error)?.len();
        match Geometry::from_bytes(len) {
            (geometry, None) if geometry.size() as u64 == len => Ok(Self::new(file, geometry)),
            _ => Err(Error::ImageSize {
                path: path.into(),
                len,
            }),
        }
    }

    /// Flushes the image and waits until it has reached the disk.
    pub fn finish(mut self) -> io::Result<()> {
        self.backend.flush()?;
        self.backend.sync_all()
    }
}

impl<B: Read + Write + Seek> NorFlash<B> {
    /// Wraps a backend that already holds an image.
    pub fn new(backend: B, geometry: Geometry) -> Self {
        Self { backend, geometry }
    }

    /// Fills the first `geometry.size()` bytes of `backend` with the erase
    /// value.
    pub fn erased(backend: B, geometry: Geometry) -> io::Result<Self> {
        let mut flash = Self::new(backend, geometry);
        flash.backend.seek(SeekFrom::Start(0))?;
        fill_erased(&mut flash.backend, geometry.size())?;
        flash.backend.flush()?;
        Ok(flash)
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Reads exactly `buf.len()` bytes starting at `address`.
    pub fn read(&mut self, address: usize, buf: &mut [u8]) -> Result<()> {
        self.read_exact_at(address, buf)
            .map_err(|_| Error::NotReadable {
                address,
                length: buf.len(),
            })?;
        debug!("Read {} bytes from offset {:#x}", buf.len(), address);
        Ok(())
    }

    /// Programs `data` at `address`: every stored byte becomes
    /// `stored & data`.
    pub fn write(&mut self, address: usize, data: &[u8]) -> Result<()> {
        let not_writable = |_| Error::NotWritable {
            address,
            length: data.len(),
        };

        let mut buf = vec![0; data.len()];
        self.read_exact_at(address, &mut buf)
            .map_err(not_writable)?;
        trace!("was: {:02x?}", buf);
        trace!("add: {:02x?}", data);

        for (stored, new) in buf.iter_mut().zip(data) {
            *stored &= new;
        }
        trace!("now: {:02x?}", buf);

        self.write_all_at(address, &buf).map_err(not_writable)?;
        debug!("Wrote {} bytes to offset {:#x}", data.len(), address);
        Ok(())
    }

    /// Resets `length` bytes starting at `address` to the erase value.
    pub fn erase(&mut self, address: usize, length: usize) -> Result<()> {
        self.backend
            .seek(SeekFrom::Start(address as u64))
            .and_then(|_| fill_erased(&mut self.backend, length))
            .and_then(|()| self.backend.flush())
            .map_err(|_| Error::NotWritable { address, length })?;
        debug!("Erased {} bytes at offset {:#x}", length, address);
        Ok(())
    }

    pub fn into_inner(self) -> B {
        self.backend
    }

    fn read_exact_at(&mut self, address: usize, buf: &mut [u8]) -> io::Result<()> {
        self.backend.seek(SeekFrom::Start(address as u64))?;
        self.backend.read_exact(buf)
    }

    fn write_all_at(&mut self, address: usize, buf: &[u8]) -> io::Result<()> {
        self.backend.seek(SeekFrom::Start(address as u64))?;
        self.backend.write_all(buf)?;
        self.backend.flush()
    }
}

fn fill_erased(writer: &mut impl Write, length: usize) -> io::Result<()> {
    let block = [ERASE_VALUE; PAGE_SIZE];
    let mut remaining = length;
    while remaining > 0 {
        let n = remaining.min(block.len());
        writer.write_all(&block[..n])?;
        remaining -= n;
    }
    Ok(())
}

/// Presents a [`NorFlash`] to littlefs.
///
/// Storage errors are logged here and reported to littlefs as I/O errors.
pub struct FlashStorage<B = File> {
    flash: NorFlash<B>,
}

impl<B> FlashStorage<B> {
    pub fn new(flash: NorFlash<B>) -> Self {
        Self { flash }
    }

    pub fn geometry(&self) -> Geometry {
        self.flash.geometry
    }

    pub fn into_inner(self) -> NorFlash<B> {
        self.flash
    }
}

fn hal_error(error: Error) -> LfsError {
    error!("{}", error);
    LfsError::IO
}

impl<B: Read + Write + Seek> Storage for FlashStorage<B> {
    type CACHE_BUFFER = [u8; PAGE_SIZE];
    type LOOKAHEAD_BUFFER = [u8; LOOKAHEAD_SIZE * 8];

    fn read_size(&self) -> usize {
        READ_SIZE
    }

    fn write_size(&self) -> usize {
        WRITE_SIZE
    }

    fn block_size(&self) -> usize {
        self.flash.geometry().block_size()
    }

    fn cache_size(&self) -> usize {
        self.flash.geometry().page_size()
    }

    fn lookahead_size(&self) -> usize {
        LOOKAHEAD_SIZE
    }

    fn block_count(&self) -> usize {
        self.flash.geometry().block_count()
    }

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> littlefs2::io::Result<usize> {
        self.flash.read(offset, buffer).map_err(hal_error)?;
        Ok(buffer.len())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> littlefs2::io::Result<usize> {
        self.flash.write(offset, data).map_err(hal_error)?;
        Ok(data.len())
    }

    fn erase(&mut self, offset: usize, len: usize) -> littlefs2::io::Result<usize> {
        self.flash.erase(offset, len).map_err(hal_error)?;
        Ok(len)
    }
}
