#![warn(clippy::all)]

//! The clustered forward render scene core (spec.md, in full).
//!
//! Six cooperating components, wired together by [`pass::FrameScheduler`]:
//! the View Driver ([`view`]), Draw Compiler ([`draw`]), Light Packer
//! ([`light`] + [`shadow`] + [`shadow_atlas`]), Resource Manager
//! ([`resources`]), Pass Scheduler ([`pass`] + [`cluster`] +
//! [`depth_pyramid`] + [`push_constants`]), and Readback Service
//! ([`readback`]). Data flows top-to-bottom per frame; no component holds
//! state across frame boundaries except GPU resources owned by
//! [`resources::ResourceManager`].

pub mod cluster;
pub mod depth_pyramid;
pub mod draw;
pub mod error;
pub mod light;
pub mod pass;
pub mod push_constants;
pub mod readback;
pub mod resources;
pub mod shadow;
pub mod shadow_atlas;
pub mod view;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use draw::{compile_draws, CompiledDraws, DrawCommand, IndirectArgs, InstanceRecord};
pub use error::SceneError;
pub use light::{pack_lights, Light, LightVariant, PackedShadows, SceneLightData, ShadowSlot, MAX_LIGHTS};
pub use pass::{DebugOverlayFlags, FrameScheduler, FrameState};
pub use readback::ReadbackService;
pub use resources::ResourceManager;
pub use shadow::{CascadeSplitMode, NUM_CASCADES};
pub use shadow_atlas::ShadowAtlas;
pub use view::{build_scene_globals, CullData, CullFlags, SceneGlobals, ViewVolume};
