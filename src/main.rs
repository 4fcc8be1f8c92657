//! Replay a scripted overlay session against the in-memory backend and print
//! the resulting GeoJSON.
//!
//! ```text
//! aerial-annotate-replay script.json
//! ```
//!
//! Script layout:
//!
//! ```json
//! {
//!   "image_id": 1,
//!   "image_size": [4000, 3000],
//!   "meters_per_pixel": { "1": 0.03 },
//!   "georef": { "center_lat": 55.7, "center_lon": 12.5, "width": 4000, "height": 3000 },
//!   "steps": [
//!     { "tool": "polygon" },
//!     { "click": [100, 100] },
//!     { "click": [300, 100] },
//!     { "click": [300, 300] },
//!     { "double_click": [300, 300] },
//!     { "key": "Esc" },
//!     { "switch_image": 2 }
//!   ]
//! }
//! ```
//!
//! Click coordinates are image pixels; the viewport shows the whole image at
//! its native size.

#[cfg(not(target_arch = "wasm32"))]
mod replay {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use aerial_annotate::export::GeoReference;
    use aerial_annotate::{
        AnnotationTool, Calibration, ImageId, KeyCode, MemoryBackend, OverlayConfig, OverlaySession,
        Point, PointerEvent, SyncError, Viewport,
    };
    use serde::Deserialize;

    #[derive(Debug, thiserror::Error)]
    pub enum ReplayError {
        #[error("Usage: aerial-annotate-replay <script.json>")]
        Usage,
        #[error("Failed to read {path:?}: {source}")]
        Io {
            path: PathBuf,
            source: std::io::Error,
        },
        #[error("Invalid script: {0}")]
        Script(#[from] serde_json::Error),
        #[error("Sync failed: {0}")]
        Sync(#[from] SyncError),
    }

    #[derive(Debug, Deserialize)]
    struct Script {
        image_id: ImageId,
        image_size: [f64; 2],
        #[serde(default)]
        meters_per_pixel: HashMap<ImageId, f64>,
        #[serde(default)]
        georef: Option<GeoReference>,
        steps: Vec<Step>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Step {
        Tool(AnnotationTool),
        Click([f64; 2]),
        DoubleClick([f64; 2]),
        Key(KeyCode),
        SwitchImage(ImageId),
        RetryFailed,
        DiscardFailed,
    }

    fn load_script(path: &Path) -> Result<Script, ReplayError> {
        let json = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn init_logging(config: &OverlayConfig) {
        env_logger::Builder::new()
            .filter_level(config.preferences.log_level.to_level_filter())
            .parse_default_env()
            .init();
    }

    pub async fn run(config: &OverlayConfig) -> Result<(), ReplayError> {
        let path = std::env::args().nth(1).ok_or(ReplayError::Usage)?;
        let script = load_script(Path::new(&path))?;

        let backend = Arc::new(MemoryBackend::new());
        for (&image_id, &mpp) in &script.meters_per_pixel {
            backend.set_calibration(image_id, Calibration::new(mpp));
        }

        let [width, height] = script.image_size;
        let viewport = Viewport::new(Point::new(0.0, 0.0), (width, height), (width, height));
        let mut session = OverlaySession::new(Arc::clone(&backend), config);
        session.switch_image(script.image_id).await?;

        for (index, step) in script.steps.into_iter().enumerate() {
            log::debug!("Step {}: {:?}", index, step);
            let request = match step {
                Step::Tool(tool) => {
                    session.set_tool(tool);
                    None
                }
                Step::Click([x, y]) => session.pointer(PointerEvent::click(x, y), &viewport),
                Step::DoubleClick([x, y]) => {
                    session.pointer(PointerEvent::double_click(x, y), &viewport)
                }
                Step::Key(key) => {
                    if session.handle_key(key).is_none() {
                        log::warn!("Step {}: key {} is not bound", index, key);
                    }
                    None
                }
                Step::SwitchImage(image_id) => {
                    session.switch_image(image_id).await?;
                    None
                }
                Step::RetryFailed => {
                    for (key, result) in session.retry_failed().await {
                        if let Err(e) = result {
                            log::warn!("Retry of {} failed: {}", key, e);
                        }
                    }
                    None
                }
                Step::DiscardFailed => {
                    session.discard_failed();
                    None
                }
            };

            // Backend failures leave the entry marked failed; keep replaying
            if let Some(request) = request {
                match session.run(request).await {
                    Ok(outcome) => log::debug!("Step {}: {:?}", index, outcome),
                    Err(e) => log::warn!("Step {}: {}", index, e),
                }
            }
        }

        if let Some(collection) = session.export_geojson(script.georef.as_ref()) {
            println!("{}", collection.to_json()?);
        }
        log::info!(
            "Replay finished: {} annotations on image {}",
            session.annotations().len(),
            session.image_id().unwrap_or(script.image_id)
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() {
    let config = aerial_annotate::OverlayConfig::load_from_default_path().unwrap_or_default();
    replay::init_logging(&config);

    // First run: leave an editable config behind
    let missing = aerial_annotate::OverlayConfig::default_path().is_some_and(|path| !path.exists());
    if missing && let Err(e) = config.save_to_default_path() {
        log::warn!("Could not write default configuration: {}", e);
    }

    if let Err(e) = replay::run(&config).await {
        log::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
