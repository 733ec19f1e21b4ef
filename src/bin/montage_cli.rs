//! Headless single-frame render: load a project document, composite the
//! frame at the requested time and write it out as PNG.

use std::sync::Arc;
use std::time::{Duration, Instant};

use montage::TimelineError;
use montage::cache::{AssetCache, AssetState};
use montage::model::project::Project;
use montage::renderer::compositor::{self, OverlayOptions};

const LOAD_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> Result<(), TimelineError> {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <project.json> <time-seconds> <out.png>", args[0]);
        std::process::exit(2);
    }
    let time: f64 = args[2]
        .parse()
        .map_err(|_| TimelineError::Project(format!("Invalid time '{}'", args[2])))?;

    let json = std::fs::read_to_string(&args[1])?;
    let project = Project::load(&json)?;
    let cache = Arc::new(AssetCache::with_default_loader());

    let sources: Vec<_> = project
        .tracks
        .iter()
        .flat_map(|t| t.clips.iter())
        .filter_map(|c| c.source.clone())
        .collect();
    for source in &sources {
        cache.request(source);
    }

    // Give background loads a bounded head start; anything still pending
    // renders as a placeholder, same as the live preview would.
    let deadline = Instant::now() + LOAD_TIMEOUT;
    while Instant::now() < deadline {
        cache.poll();
        let pending = sources
            .iter()
            .any(|s| matches!(cache.state(s), Some(AssetState::Loading)));
        if !pending {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    let frame = compositor::compose_frame(&project, time, &cache, &OverlayOptions::default());
    frame.save(&args[3])?;
    log::info!("Wrote {} at t={}s", args[3], time);
    Ok(())
}
