/// Value of every byte of an erased flash region.
pub const ERASE_VALUE: u8 = 0xFF;

/// Erase-block size, also used as the littlefs block size.
pub const BLOCK_SIZE: usize = 4096;
/// Logical page size, used as the littlefs cache size.
pub const PAGE_SIZE: usize = BLOCK_SIZE / 8;
pub const READ_SIZE: usize = 4;
pub const WRITE_SIZE: usize = 256;
/// Block allocator lookahead, in multiples of 8 bytes.
pub const LOOKAHEAD_SIZE: usize = 8;

pub const KIB: u64 = 1024;
pub const MIN_SIZE: u64 = 64 * KIB;
pub const MAX_SIZE: u64 = 2048 * KIB;

/// Directory (relative to the working directory) that gets packaged.
pub const SOURCE_DIR: &str = "filesystem";
/// Name of the produced image file.
pub const IMAGE_NAME: &str = "flash_image.bin";

/// Directories whose name starts with this character are not packaged.
pub const HIDDEN_MARKER: char = '.';
/// Separator between the segments of a path inside the image.
pub const PATH_SEPARATOR: &str = "/";
