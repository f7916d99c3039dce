//! Segue: a view transition lifecycle engine.
//!
//! ```ignore
//! use std::rc::Rc;
//! use segue::{HeadlessScene, UpdateCallback};
//! use segue::transition::{Rect, Size};
//!
//! let scene = Rc::new(HeadlessScene::new(Size::new(800.0, 600.0)));
//! scene.add_node(Some("hero"), Rect::new(0.0, 0.0, 200.0, 100.0));
//!
//! let mut orchestrator = segue::orchestrator(scene.clone());
//! let transition = orchestrator.begin(Some(UpdateCallback::new(|| ())));
//! orchestrator.run_until_idle(120);
//! ```

use std::path::Path;
use std::rc::Rc;

pub use segue_config::{CaptureConfig, HeadlessConfig, SegueConfig, TransitionConfig};
pub use segue_scene::{
    Deferred, HeadlessScene, LifecycleEvent, Orchestrator, Phase, SceneHost, TransitionError,
    UpdateCallback, UpdateOutcome, ViewTransition, headless, transition,
};

/// An orchestrator configured from `segue.toml` and `SEGUE_*` environment
/// variables.
pub fn orchestrator(host: Rc<dyn SceneHost>) -> Orchestrator {
    Orchestrator::with_config(host, &SegueConfig::load())
}

/// Load configuration from `path`, applying environment overrides on top.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<SegueConfig> {
    let mut config = SegueConfig::load_from_file(path).map_err(anyhow::Error::msg)?;
    config.merge_with_env();
    Ok(config)
}
