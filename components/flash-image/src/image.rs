use std::{
    fs::File,
    io::{Read, Seek, Write},
    path::{Path, PathBuf},
};

use littlefs2::fs::{Allocation, Filesystem};

use crate::{
    constants::{IMAGE_NAME, SOURCE_DIR},
    flash::FlashStorage,
    Error, Geometry, NorFlash, Packager, Result, SourceFiles, Summary,
};

/// Inputs of a single image build.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuildConfig {
    pub source_dir: PathBuf,
    pub image_path: PathBuf,
    /// Requested image size in kilobytes, `None` for the maximum size.
    pub size_kib: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: SOURCE_DIR.into(),
            image_path: IMAGE_NAME.into(),
            size_kib: None,
        }
    }
}

impl BuildConfig {
    /// Runs the whole pipeline: size, erase, format, mount, package, flush.
    pub fn build(&self) -> Result<Report> {
        let (geometry, adjustment) = Geometry::from_kib(self.size_kib);
        if let Some(adjustment) = adjustment {
            info!(
                "Using {} flash size {} kB",
                adjustment,
                geometry.size_kib()
            );
        }

        let mut builder = ImageBuilder::create(&self.image_path, geometry)?;
        info!(
            "Creating image {:?} of size {} kB",
            self.image_path,
            geometry.size_kib()
        );

        let report = builder.package(&Packager::new(&self.source_dir));
        let finished = builder.finish();
        let report = report?;
        finished?;
        Ok(report)
    }
}

/// What a build produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Report {
    pub geometry: Geometry,
    pub summary: Summary,
    /// Unused blocks left in the image, if littlefs could count them.
    pub free_blocks: Option<usize>,
}

/// Owns the emulated flash device for the duration of one build.
pub struct ImageBuilder<B = File> {
    storage: FlashStorage<B>,
    path: Option<PathBuf>,
}

impl ImageBuilder<File> {
    /// Creates the erased image file.
    pub fn create(path: impl AsRef<Path>, geometry: Geometry) -> Result<Self> {
        let path = path.as_ref();
        let flash = NorFlash::create(path, geometry)?;
        Ok(Self {
            storage: FlashStorage::new(flash),
            path: Some(path.into()),
        })
    }

    /// Flushes and closes the image file.
    pub fn finish(self) -> Result<()> {
        let path = self.path.unwrap_or_default();
        self.storage
            .into_inner()
            .finish()
            .map_err(|source| Error::CreateImage { path, source })
    }
}

impl<B: Read + Write + Seek> ImageBuilder<B> {
    pub fn new(flash: NorFlash<B>) -> Self {
        Self {
            storage: FlashStorage::new(flash),
            path: None,
        }
    }

    /// Formats the device and fills it with the files found by `packager`.
    ///
    /// Only formatting and mounting can fail, problems with individual files
    /// are counted in the returned summary.
    pub fn package<F: SourceFiles>(&mut self, packager: &Packager<F>) -> Result<Report> {
        let geometry = self.storage.geometry();

        Filesystem::format(&mut self.storage)?;
        let mut alloc = Allocation::new(&self.storage);
        let mut fs = Filesystem::mount(&mut alloc, &mut self.storage)?;
        debug!("Mounted littlefs on {} blocks", geometry.block_count());

        info!("Adding files in directory {:?}", packager.root());
        let summary = packager.pack(&mut fs);
        let free_blocks = fs.available_blocks().ok();

        Ok(Report {
            geometry,
            summary,
            free_blocks,
        })
    }

    pub fn into_inner(self) -> NorFlash<B> {
        self.storage.into_inner()
    }
}
