//! Headless walkthrough: builds a viewport with every layer kind, loads an
//! image through a background fetcher, drags and zooms, and logs the grid.
//!
//! Usage: `heliotile-demo [config.json]`. Set `RUST_LOG=debug` for engine
//! internals.

use anyhow::Context;
use crossbeam_channel::Sender;
use heliotile::layers::content::DisplayKind;
use heliotile::prelude::*;
use log::info;
use std::{env, fs, thread, time::Duration};

const DEFAULT_CONFIG: &str = r#"{
    "grid": { "tile_size": 256, "viewport_width": 1024, "viewport_height": 768 },
    "zoom": { "min_zoom_level": 0, "max_zoom_level": 6, "initial_zoom_level": 2 },
    "interaction": { "move_throttle": 2 },
    "debug_layer": true
}"#;

/// Pretends to download tiles on a worker thread.
struct SimulatedFetcher {
    latency: Duration,
}

impl TileFetcher for SimulatedFetcher {
    fn fetch(&self, request: TileRequest, reply: Sender<TileResponse>) -> std::result::Result<(), FetchError> {
        let latency = self.latency;
        thread::spawn(move || {
            thread::sleep(latency);
            let reference = format!("{}/{}.jpg", request.selection.tile_base, request.key);
            let _ = reply.send(request.respond(Ok(TileData::new(reference, vec![0; 64]))));
        });
        Ok(())
    }
}

/// Active regions as a region catalogue would list them for late October 2003.
struct RegionCatalogue;

impl MarkerFeed for RegionCatalogue {
    fn markers_for(&self, _selection: &ImageSelection) -> Vec<MarkerRecord> {
        vec![
            MarkerRecord::new("10486", "S16E08").with_field("Class", "X17"),
            MarkerRecord::new("10488", "N08W02").with_field("Area", "1750"),
            MarkerRecord::new("10484", "N04W45"),
        ]
    }
}

fn load_config() -> anyhow::Result<ViewerConfig> {
    let json = match env::args().nth(1) {
        Some(path) => fs::read_to_string(&path).with_context(|| format!("reading {path}"))?,
        None => DEFAULT_CONFIG.to_string(),
    };
    ViewerConfig::from_json(&json).context("parsing viewer configuration")
}

fn pump_until_loaded(viewport: &mut Viewport<DisplayTile>, image: LayerId) -> usize {
    let mut arrived = 0;
    for _ in 0..200 {
        arrived += viewport.pump();
        let pending = viewport
            .layer_as::<ImageTileLayer<DisplayTile>>(image)
            .map_or(0, |layer| layer.pending_count());
        if pending == 0 {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    arrived
}

fn log_grid(viewport: &Viewport<DisplayTile>, image: LayerId) {
    info!(
        "zoom {} pan {:?} viewport {:?}",
        viewport.zoom_level(),
        viewport.pan_position(),
        viewport.dimensions()
    );
    for tile in viewport.grid().tiles() {
        let state = match tile.content(image).map(|content| &content.kind) {
            Some(DisplayKind::Image { reference, .. }) => reference.clone(),
            Some(DisplayKind::Loading) => "loading".to_string(),
            Some(DisplayKind::Unavailable(_)) => "unavailable".to_string(),
            _ => "-".to_string(),
        };
        info!(
            "  tile {:?} at ({:.0}, {:.0}): {}",
            tile.index, tile.position.x, tile.position.y, state
        );
    }
}

fn main() -> anyhow::Result<()> {
    heliotile::init_logging();

    let config = load_config()?;
    let mut viewport: Viewport<DisplayTile> = Viewport::new(config, Arc::new(DisplayFactory::default()))?;
    viewport.subscribe(|event| info!("event {}: {:?}", event.name(), event));

    let image = viewport.add_image_layer(
        &LayerOptions::named("EIT 195"),
        Box::new(SimulatedFetcher {
            latency: Duration::from_millis(10),
        }),
    )?;
    let regions = viewport.add_marker_layer(&LayerOptions::named("NOAA regions"), Box::new(RegionCatalogue))?;
    let labels = viewport.add_overlay_layer(&LayerOptions::named("labels"))?;
    viewport.add_overlays(labels, vec![Overlay::new("disk center", Point::new(0.5, 0.5))])?;

    let date = ImageDate::from_ymd_hms(2003, 10, 28, 11, 12, 0).context("invalid observation date")?;
    let selection = ImageSelection::new(date, "SOHO", "EIT", "EIT", "195")
        .with_tile_base("soho/eit/195/2003/10/28")
        .with_max_zoom_level(4);
    viewport.set_image_selection(Some(selection), None);

    let arrived = pump_until_loaded(&mut viewport, image);
    info!("{arrived} image tiles arrived");
    log_grid(&viewport, image);

    info!("dragging 300px to the left");
    viewport.handle_input(InputEvent::Press {
        position: Point::new(600.0, 400.0),
    });
    for step in 1..=6 {
        viewport.handle_input(InputEvent::Move {
            position: Point::new(600.0 - 50.0 * step as f64, 400.0),
        });
    }
    viewport.handle_input(InputEvent::Release {
        position: Point::new(300.0, 400.0),
    });

    viewport.handle_input(InputEvent::ZoomBy { levels: 1 });
    pump_until_loaded(&mut viewport, image);
    log_grid(&viewport, image);

    let first_region = viewport
        .layer_as::<MarkerLayer<DisplayTile>>(regions)
        .and_then(|layer| layer.overlay_layer().overlays().overlays().next().map(|(id, _)| id));
    if let Some(activation) = first_region.and_then(|id| viewport.activate_overlay(regions, id)) {
        info!("popup at {:?}:\n{}", activation.position, activation.info);
    }
    if let Some(layer) = viewport.layer_as::<MarkerLayer<DisplayTile>>(regions) {
        for (record, error) in layer.rejected() {
            info!("skipped marker {record}: {error}");
        }
    }

    info!(
        "final configuration: {}",
        serde_json::to_string(viewport.config()).context("serializing configuration")?
    );
    Ok(())
}
