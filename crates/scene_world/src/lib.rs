#![warn(clippy::all)]

//! Trait contracts for the two read-only external collaborators the render
//! core depends on: the **World** (entity registry + component storage) and
//! the **Asset layer** (`Mesh`/`Material` surface data). Both are owned and
//! driven by code outside this workspace; the core only ever borrows them
//! for the duration of one `renderScene()` call.

pub mod asset;
pub mod world;

pub use asset::{Material, Mesh, Surface};
pub use scene_res::Handle;
pub use world::{
    DirectionalLightComponent, Entity, EnvironmentComponent, LineBatchComponent,
    LineVertex, PointLightComponent, SkeletalMeshComponent, SpotLightComponent,
    StaticMeshComponent, TransformComponent, World,
};
