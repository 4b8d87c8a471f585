//! async-cog - inspect Cloud-Optimized GeoTIFFs and fetch single tiles.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use async_cog::{
    config::{Cli, Command, InfoArgs, SourceLocation, TileArgs},
    create_s3_client, CogReader, Compression, DecoderRegistry, FileRangeReader, HttpRangeReader,
    RangeReader, S3RangeReader,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let location = match SourceLocation::parse(cli.source()) {
        Ok(location) => location,
        Err(e) => {
            error!("Invalid source: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // CogReader is generic over its transport, so each arm monomorphizes run
    match location {
        SourceLocation::Http(url) => {
            match HttpRangeReader::with_timeout(url.as_str(), cli.http_timeout()).await {
                Ok(reader) => run(reader, &cli).await,
                Err(e) => open_failed(cli.source(), e),
            }
        }
        SourceLocation::S3 { bucket, key } => {
            let client = create_s3_client(cli.s3_endpoint.as_deref(), &cli.s3_region).await;
            match S3RangeReader::new(client, bucket, key).await {
                Ok(reader) => run(reader, &cli).await,
                Err(e) => open_failed(cli.source(), e),
            }
        }
        SourceLocation::File(path) => match FileRangeReader::new(&path).await {
            Ok(reader) => run(reader, &cli).await,
            Err(e) => open_failed(cli.source(), e),
        },
    }
}

fn open_failed(source: &str, e: impl std::fmt::Display) -> ExitCode {
    error!("Failed to open {}: {}", source, e);
    ExitCode::FAILURE
}

async fn run<R: RangeReader>(reader: R, cli: &Cli) -> ExitCode {
    let cog = match CogReader::open_with_options(reader, cli.reader_options()).await {
        Ok(cog) => cog,
        Err(e) => {
            error!("Failed to read COG structure: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match &cli.command {
        Command::Info(args) => run_info(cog, args).await,
        Command::Tile(args) => run_tile(cog, args).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "async_cog=debug"
    } else {
        "async_cog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Info Command
// =============================================================================

async fn run_info<R: RangeReader>(mut cog: CogReader<R>, args: &InfoArgs) -> ExitCode {
    if args.load {
        if let Err(e) = cog.load_all().await {
            error!("Failed to load tags: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if args.json {
        let mappings: Vec<_> = cog.ifds().iter().map(|ifd| ifd.to_mapping()).collect();
        match serde_json::to_string_pretty(&mappings) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize IFDs: {}", e);
                return ExitCode::FAILURE;
            }
        }
        cog.close();
        return ExitCode::SUCCESS;
    }

    println!("Source:     {}", cog.identifier());
    println!("Byte order: {}", cog.byte_order().name());
    println!("BigTIFF:    {}", cog.is_big_tiff());
    println!("IFDs:       {}", cog.ifd_count());

    for (level, ifd) in cog.ifds().iter().enumerate() {
        println!();
        println!(
            "IFD {} @ offset {} ({} tags)",
            level,
            ifd.offset(),
            ifd.tag_count()
        );
        println!("─────────────────────────────────");
        if let Some(code) = ifd.compression() {
            let scheme = Compression::from_u16(code).map_or("Unknown", Compression::name);
            println!("  Compression scheme: {} ({})", scheme, code);
        }
        for tag in ifd.tags() {
            println!("  {}", tag);
        }
        for key in ifd.geo_keys() {
            println!("  {}", key);
        }
        if args.load && ifd.contains("TileWidth") {
            let (cols, rows) = ifd.tile_grid_dimensions();
            println!("  Tile grid: {} x {} ({})", cols, rows, ifd.pixel_dtype());
        }
    }

    cog.close();
    ExitCode::SUCCESS
}

// =============================================================================
// Tile Command
// =============================================================================

async fn run_tile<R: RangeReader>(mut cog: CogReader<R>, args: &TileArgs) -> ExitCode {
    let (level, x, y) = (args.level, args.x, args.y);

    let data = if args.decode {
        let registry = DecoderRegistry::default();
        match cog.read_decoded_tile(level, x, y, &registry).await {
            Ok(grid) => {
                let (width, height, bands) = grid.shape();
                info!(
                    "Decoded tile ({}, {}) at level {}: {} x {} x {} {}",
                    x, y, level, width, height, bands, grid.dtype
                );
                grid.data
            }
            Err(e) => {
                error!("Failed to decode tile: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        match cog.read_tile(level, x, y).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to read tile: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };

    cog.close();

    match &args.output {
        Some(path) => {
            if let Err(e) = tokio::fs::write(path, &data).await {
                error!("Failed to write {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            info!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => println!("{} bytes", data.len()),
    }

    ExitCode::SUCCESS
}
