// Copyright 2025 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drives a [`TilePainter`] over a synthetic three-level tile pyramid and logs
//! how the visible set converges while tiles load.
//!
//! ```text
//! RUST_LOG=tessera=debug,info cargo run -p tessera_demos -- --projection tangent --span 20
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use kurbo::Rect;
use tessera_cache::{CacheConfig, LoadError, PoolError, Retention, WorkerPool};
use tessera_geo::{LatLon, Mercator, PlateCarree, Projection, TangentPlane};
use tessera_index::{KeyError, KeyGrid, SpatialKey, Viewport};
use tessera_painter::{PainterConfig, RefreshMode, TilePainter, TileSource};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Painter(#[from] tessera_painter::Error),
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ProjectionArg {
    PlateCarree,
    Mercator,
    Tangent,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RefreshArg {
    Notify,
    Poll,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Map projection.
    #[arg(long, value_enum, default_value = "plate-carree")]
    projection: ProjectionArg,
    /// How the painter notices arrived tiles.
    #[arg(long, value_enum, default_value = "notify")]
    refresh: RefreshArg,
    /// Latitude of the view center, in degrees.
    #[arg(long, default_value_t = 45.0)]
    lat: f64,
    /// Longitude of the view center, in degrees.
    #[arg(long, default_value_t = 7.0)]
    lon: f64,
    /// Initial width and height of the view, in degrees. Each step halves it.
    #[arg(long, default_value_t = 120.0)]
    span: f64,
    /// Number of zoom steps.
    #[arg(long, default_value_t = 4)]
    steps: u32,
    /// Surface size in pixels.
    #[arg(long, default_value_t = 1024.0)]
    pixels: f64,
    /// Worker threads; defaults to the available parallelism minus two.
    #[arg(long)]
    threads: Option<usize>,
    /// Simulated load latency per tile, in milliseconds.
    #[arg(long, default_value_t = 20)]
    delay_ms: u64,
    /// Make every n-th load fail.
    #[arg(long)]
    fail_every: Option<u64>,
    /// Keep at most this many loaded tiles.
    #[arg(long)]
    lru: Option<usize>,
}

/// Three zoom levels over the whole globe with length scales in meters.
struct Pyramid {
    keys: Vec<SpatialKey>,
    delay: Duration,
    fail_every: Option<u64>,
    loads: AtomicU64,
}

impl Pyramid {
    fn new(delay: Duration, fail_every: Option<u64>) -> Result<Self, KeyError> {
        let mut keys = Vec::new();
        for (length_scale, cell_deg) in [(250_000.0, 2.5), (1_000_000.0, 10.0), (4_000_000.0, 30.0)]
        {
            keys.extend(KeyGrid::new(length_scale, cell_deg).keys()?);
        }
        Ok(Self {
            keys,
            delay,
            fail_every,
            loads: AtomicU64::new(0),
        })
    }
}

/// Synthetic tile payload.
#[derive(Debug)]
struct Tile {
    checksum: u64,
}

impl TileSource<Tile> for Pyramid {
    fn all_keys(&self) -> Vec<SpatialKey> {
        self.keys.clone()
    }

    fn load_tile_data(&self, key: &SpatialKey) -> Result<Tile, LoadError> {
        let n = self.loads.fetch_add(1, Ordering::Relaxed) + 1;
        thread::sleep(self.delay);
        if self.fail_every.is_some_and(|every| every > 0 && n % every == 0) {
            return Err(LoadError::msg(format!("simulated failure #{n}")));
        }
        let checksum = [key.min_lat(), key.max_lat(), key.min_lon(), key.max_lon()]
            .iter()
            .fold(key.length_scale().to_bits(), |acc, v| {
                acc.rotate_left(7) ^ v.to_bits()
            });
        Ok(Tile { checksum })
    }
}

fn projection(arg: ProjectionArg, center: LatLon) -> Arc<dyn Projection> {
    match arg {
        ProjectionArg::PlateCarree => Arc::new(PlateCarree::new()),
        ProjectionArg::Mercator => Arc::new(Mercator::new()),
        ProjectionArg::Tangent => Arc::new(TangentPlane::new(center)),
    }
}

/// Plane bounds of the geographic box `span` degrees wide around `center`.
fn view_bounds(projection: &dyn Projection, center: LatLon, span: f64) -> Rect {
    let half = 0.5 * span;
    let mut bounds: Option<Rect> = None;
    for lat in [center.lat - half, center.lat, center.lat + half] {
        for lon in [center.lon - half, center.lon, center.lon + half] {
            let p = projection.project(LatLon::new(lat, lon).clamped());
            let r = Rect::from_points(p, p);
            bounds = Some(bounds.map_or(r, |b| b.union(r)));
        }
    }
    bounds.unwrap_or_default()
}

fn main() -> Result<(), DemoError> {
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let args = Cli::parse();
    let center = LatLon::new(args.lat, args.lon);
    let projection = projection(args.projection, center);
    let pool = match args.threads {
        Some(threads) => WorkerPool::new(threads)?,
        None => WorkerPool::with_default_size()?,
    };
    info!(threads = pool.threads(), ?projection, "starting demo");

    let source = Arc::new(Pyramid::new(
        Duration::from_millis(args.delay_ms),
        args.fail_every,
    )?);
    let cache = match args.lru {
        Some(capacity) => CacheConfig::default().with_retention(Retention::Lru { capacity }),
        None => CacheConfig::default(),
    };
    let refresh = match args.refresh {
        RefreshArg::Notify => RefreshMode::Notify,
        RefreshArg::Poll => RefreshMode::Poll,
    };
    let config = PainterConfig::default()
        .with_refresh(refresh)
        .with_cache(cache);

    let mut checksum = 0_u64;
    let mut painter = TilePainter::new(
        source,
        |tiles: Vec<(SpatialKey, Arc<Tile>)>| {
            checksum = tiles.iter().fold(0, |acc, (_, t)| acc ^ t.checksum);
        },
        Arc::clone(&projection),
        &pool,
        config,
    )?;

    let mut span = args.span;
    for step in 0..args.steps {
        let bounds = view_bounds(&*projection, center, span);
        let viewport = Viewport::from_pixel_size(bounds, args.pixels, args.pixels);
        let started = Instant::now();
        let mut frames = 0_u32;
        let report = loop {
            frames += 1;
            let report = painter.paint(&viewport);
            if report.is_complete() || started.elapsed() > Duration::from_secs(30) {
                break report;
            }
            thread::sleep(Duration::from_millis(16));
        };
        if !report.is_complete() {
            warn!(step, missing = report.missing, "gave up waiting for tiles");
        }
        info!(
            step,
            span,
            length_scale = ?report.length_scale,
            visible = report.visible,
            delivered = report.delivered,
            frames,
            elapsed_ms = started.elapsed().as_millis(),
            "view settled"
        );
        span *= 0.5;
    }

    let stats = painter.cache().stats();
    info!(?stats, cached = painter.cache().len(), "done");
    drop(painter);
    info!(checksum = format_args!("{checksum:016x}"), "last frame checksum");
    Ok(())
}
