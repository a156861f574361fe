use std::env;

use anyhow::Context as _;
use clap::Parser;
use flash_image::{constants::KIB, BuildConfig};
use log::{info, LevelFilter};

/// Packages the `filesystem` directory into a littlefs flash image.
///
/// The image is written to `flash_image.bin` in the working directory.  Set `RUST_LOG` to `debug`
/// or `trace` to follow every flash operation.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Image size in kB (default: maximum supported size).
    ///
    /// The size is rounded down to a multiple of the erase block size and limited to the
    /// supported range.
    size: Option<u64>,
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    let config = BuildConfig {
        size_kib: args.size,
        ..Default::default()
    };
    info!(
        "For another image size use \"{} <size_kBytes>\"",
        clap::crate_name!()
    );

    let report = config
        .build()
        .with_context(|| format!("failed to build {:?}", config.image_path))?;

    let summary = report.summary;
    info!(
        "Wrote {} kB image: {} files ({} bytes) added, {} skipped, {} failed",
        report.geometry.size() as u64 / KIB,
        summary.files,
        summary.bytes,
        summary.skipped,
        summary.failed
    );
    if let Some(free_blocks) = report.free_blocks {
        info!(
            "{} of {} blocks free",
            free_blocks,
            report.geometry.block_count()
        );
    }
    Ok(())
}
