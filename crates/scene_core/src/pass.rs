//! The Pass Scheduler (spec.md §4.5): the fixed, ordered sequence of passes
//! a frame runs through, plus the frame life-cycle state machine. Grounded
//! on the teacher's `Renderer::draw` (`src/renderer.rs`), which threads one
//! command encoder through each phase's `record` call in a fixed order;
//! generalized here from the teacher's five `wgpu` phases to this
//! workspace's RHI trait and the spec's 17-pass DAG.

use scene_math::prelude::*;
use scene_rhi::{
    BindingLayoutHandle, CompareOp, ComputePipelineDesc, CullMode, GraphicsPipelineDesc, LoadOp,
    PipelineHandle, PrimitiveTopology, RenderPassDesc, RenderTarget, ResourceState, Rhi,
};
use scene_world::World;

use crate::cluster::{build_cluster_aabbs, ClusterGridDims};
use crate::depth_pyramid::DepthPyramid;
use crate::draw::{compile_draws, CompiledDraws, InstanceRecord};
use crate::error::SceneError;
use crate::light::{pack_lights, PackedShadows, SceneLightData};
use crate::push_constants::{
    build_selection_push_constants, ClusterBuildPushConstants, DepthPyramidPushConstants,
    LightCullPushConstants, ShadowPassPushConstants, ToneMapPushConstants,
};
use crate::resources::ResourceManager;
use crate::shadow::CascadeSplitMode;
use crate::shadow_atlas::ShadowAtlas;
use crate::view::{build_scene_globals, CullFlags, ViewVolume};

/// Frame life-cycle, per spec.md §4.5: the renderer refuses to start a new
/// frame while shader compiles are pending, leaving the previous frame's
/// target on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Compiling,
    Recording,
    Submitted,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DebugOverlayFlags: u32 {
        const HI_Z          = 1 << 0;
        const CLUSTERS      = 1 << 1;
        const SHADOW_ATLAS  = 1 << 2;
    }
}

/// Every pipeline a pass may need, resolved once at construction and
/// re-resolved on demand. `None` means the owning shader failed to compile
/// or is still pending; the owning pass logs a warning and is skipped for
/// the frame, per spec.md §4.5's failure semantics.
#[derive(Default)]
struct Pipelines {
    cull: Option<PipelineHandle>,
    depth_prepass: Option<PipelineHandle>,
    depth_pyramid: Option<PipelineHandle>,
    cluster_build: Option<PipelineHandle>,
    light_cull: Option<PipelineHandle>,
    point_shadow: Option<PipelineHandle>,
    spot_shadow: Option<PipelineHandle>,
    csm: Option<PipelineHandle>,
    environment: Option<PipelineHandle>,
    base: Option<PipelineHandle>,
    lines: Option<PipelineHandle>,
    selection: Option<PipelineHandle>,
    tonemap: Option<PipelineHandle>,
    debug_overlay: Option<PipelineHandle>,
}

fn load_compute(rhi: &dyn Rhi, path: &str, layouts: Vec<BindingLayoutHandle>, push_constant_bytes: u32) -> Option<PipelineHandle> {
    match rhi.load_shader(path, &[]) {
        Ok(Some(shader)) => match rhi.create_compute_pipeline(&ComputePipelineDesc { shader, layouts, push_constant_bytes }) {
            Ok(pipeline) => Some(pipeline),
            Err(err) => {
                log::warn!("failed to create compute pipeline for {path}: {err}");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            log::warn!("shader {path} failed to compile: {err}");
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn load_graphics(
    rhi: &dyn Rhi,
    vertex_path: &str,
    fragment_path: Option<&str>,
    layouts: Vec<BindingLayoutHandle>,
    push_constant_bytes: u32,
    topology: PrimitiveTopology,
    cull_mode: CullMode,
    depth_compare: Option<CompareOp>,
    depth_write: bool,
    view_mask: u32,
) -> Option<PipelineHandle> {
    let vertex_shader = match rhi.load_shader(vertex_path, &[]) {
        Ok(Some(shader)) => shader,
        Ok(None) => return None,
        Err(err) => {
            log::warn!("shader {vertex_path} failed to compile: {err}");
            return None;
        }
    };

    let fragment_shader = match fragment_path {
        Some(path) => match rhi.load_shader(path, &[]) {
            Ok(shader) => shader,
            Err(err) => {
                log::warn!("shader {path} failed to compile: {err}");
                return None;
            }
        },
        None => None,
    };

    match rhi.create_graphics_pipeline(&GraphicsPipelineDesc {
        vertex_shader,
        fragment_shader,
        layouts,
        push_constant_bytes,
        topology,
        cull_mode,
        depth_compare,
        depth_write,
        depth_bias: Default::default(),
        wireframe: false,
        view_mask,
    }) {
        Ok(pipeline) => Some(pipeline),
        Err(err) => {
            log::warn!("failed to create graphics pipeline for {vertex_path}: {err}");
            None
        }
    }
}

/// Orchestrates the 17 ordered passes of spec.md §4.5 against a
/// [`ResourceManager`]'s buffers/images and a world snapshot. Owns no GPU
/// state of its own beyond cached pipeline handles and per-frame CPU
/// scratch collections.
pub struct FrameScheduler {
    state: FrameState,
    pipelines: Pipelines,
    debug_flags: DebugOverlayFlags,
    grid_dims: ClusterGridDims,
    cascade_mode: CascadeSplitMode,
    draws: CompiledDraws,
    lights: SceneLightData,
    packed_shadows: PackedShadows,
    shadow_atlas: ShadowAtlas,
}

impl FrameScheduler {
    pub fn new(rhi: &dyn Rhi, resources: &ResourceManager, shadow_atlas_tiles_per_row: u32) -> Self {
        let scene = vec![resources.scene_layout];
        let mut with_bindless = scene.clone();
        with_bindless.push(resources.bindless_layout);

        let pipelines = Pipelines {
            cull: load_compute(rhi, "shaders/cull.hlsl", scene.clone(), 0),
            depth_prepass: load_graphics(
                rhi,
                "shaders/depth_prepass.hlsl",
                None,
                with_bindless.clone(),
                0,
                PrimitiveTopology::TriangleList,
                CullMode::Back,
                Some(CompareOp::Greater),
                true,
                0,
            ),
            depth_pyramid: load_compute(rhi, "shaders/depth_pyramid.hlsl", scene.clone(), std::mem::size_of::<DepthPyramidPushConstants>() as u32),
            cluster_build: load_compute(rhi, "shaders/cluster_build.hlsl", scene.clone(), std::mem::size_of::<ClusterBuildPushConstants>() as u32),
            light_cull: load_compute(rhi, "shaders/light_cull.hlsl", scene.clone(), std::mem::size_of::<LightCullPushConstants>() as u32),
            point_shadow: load_graphics(
                rhi,
                "shaders/shadow_depth.hlsl",
                None,
                with_bindless.clone(),
                std::mem::size_of::<ShadowPassPushConstants>() as u32,
                PrimitiveTopology::TriangleList,
                CullMode::Front,
                Some(CompareOp::Greater),
                true,
                0b111111,
            ),
            spot_shadow: load_graphics(
                rhi,
                "shaders/shadow_depth.hlsl",
                None,
                with_bindless.clone(),
                std::mem::size_of::<ShadowPassPushConstants>() as u32,
                PrimitiveTopology::TriangleList,
                CullMode::Front,
                Some(CompareOp::Greater),
                true,
                0b1,
            ),
            csm: load_graphics(
                rhi,
                "shaders/shadow_depth.hlsl",
                None,
                with_bindless.clone(),
                std::mem::size_of::<ShadowPassPushConstants>() as u32,
                PrimitiveTopology::TriangleList,
                CullMode::Front,
                Some(CompareOp::Greater),
                true,
                (1 << crate::shadow::NUM_CASCADES) - 1,
            ),
            environment: load_graphics(
                rhi,
                "shaders/environment.hlsl",
                Some("shaders/environment.hlsl"),
                scene.clone(),
                0,
                PrimitiveTopology::TriangleList,
                CullMode::None,
                None,
                false,
                0,
            ),
            base: load_graphics(
                rhi,
                "shaders/base.hlsl",
                Some("shaders/base.hlsl"),
                with_bindless.clone(),
                0,
                PrimitiveTopology::TriangleList,
                CullMode::Back,
                Some(CompareOp::Equal),
                false,
                0,
            ),
            lines: load_graphics(
                rhi,
                "shaders/lines.hlsl",
                Some("shaders/lines.hlsl"),
                scene.clone(),
                0,
                PrimitiveTopology::LineList,
                CullMode::None,
                Some(CompareOp::Greater),
                false,
                0,
            ),
            selection: load_graphics(
                rhi,
                "shaders/selection.hlsl",
                Some("shaders/selection.hlsl"),
                scene.clone(),
                std::mem::size_of::<crate::push_constants::SelectionPushConstants>() as u32,
                PrimitiveTopology::TriangleList,
                CullMode::None,
                None,
                false,
                0,
            ),
            tonemap: load_graphics(
                rhi,
                "shaders/tonemap.hlsl",
                Some("shaders/tonemap.hlsl"),
                scene.clone(),
                std::mem::size_of::<ToneMapPushConstants>() as u32,
                PrimitiveTopology::TriangleList,
                CullMode::None,
                None,
                false,
                0,
            ),
            debug_overlay: load_graphics(
                rhi,
                "shaders/debug_overlay.hlsl",
                Some("shaders/debug_overlay.hlsl"),
                scene,
                0,
                PrimitiveTopology::TriangleList,
                CullMode::None,
                None,
                false,
                0,
            ),
        };

        Self {
            state: FrameState::Idle,
            pipelines,
            debug_flags: DebugOverlayFlags::empty(),
            grid_dims: ClusterGridDims::default(),
            cascade_mode: CascadeSplitMode::default(),
            draws: CompiledDraws::default(),
            lights: SceneLightData::default(),
            packed_shadows: PackedShadows::default(),
            shadow_atlas: ShadowAtlas::new(shadow_atlas_tiles_per_row),
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn set_debug_flags(&mut self, flags: DebugOverlayFlags) {
        self.debug_flags = flags;
    }

    /// Runs the full ordered pass sequence for one frame. Returns
    /// `Ok(false)` (and leaves `self.state` at [`FrameState::Compiling`])
    /// when shader compiles are still pending -- the caller should leave
    /// last frame's target on screen and retry next tick, per spec.md
    /// §4.5's cancellation contract.
    pub fn run_frame(
        &mut self,
        rhi: &dyn Rhi,
        world: &dyn World,
        view: &ViewVolume,
        resources: &mut ResourceManager,
        screen_size: (u32, u32),
        world_time: f32,
        delta_time: f32,
        cull_flags: CullFlags,
        ambient: Vec3,
    ) -> Result<bool, SceneError> {
        if rhi.has_pending_shader_compiles() {
            self.state = FrameState::Compiling;
            return Ok(false);
        }
        self.state = FrameState::Recording;

        // 1. Reset.
        self.draws.clear();
        self.shadow_atlas.free_all();

        compile_draws(world, &mut self.draws)?;
        pack_lights(
            world,
            view,
            self.cascade_mode,
            ambient,
            &mut self.shadow_atlas,
            &mut self.lights,
            &mut self.packed_shadows,
        )?;

        let scene_globals = build_scene_globals(
            view,
            Vec2::new(screen_size.0 as f32, screen_size.1 as f32),
            self.grid_dims.as_uvec4(),
            world_time,
            delta_time,
            (resources.images.depth_pyramid.width, resources.images.depth_pyramid.height),
            self.draws.instance_data.len() as u32,
            cull_flags,
        );

        let light_bytes = self.lights.upload_bytes();

        // Resize any CPU array's backing buffer before uploading, per
        // spec.md §4.4's resize contract. `ensure_capacity` itself decides
        // whether a reallocation is actually needed.
        resources.ensure_capacity(rhi, |b| &mut b.scene_globals, std::mem::size_of::<crate::view::SceneGlobals>() as u64)?;
        resources.ensure_capacity(
            rhi,
            |b| &mut b.instances,
            (self.draws.instance_data.len() * std::mem::size_of::<InstanceRecord>()) as u64,
        )?;
        resources.ensure_capacity(
            rhi,
            |b| &mut b.instance_mapping,
            (self.draws.instance_data.len() * std::mem::size_of::<u32>()) as u64,
        )?;
        resources.ensure_capacity(
            rhi,
            |b| &mut b.indirect,
            (self.draws.indirect_args.len() * std::mem::size_of::<crate::draw::IndirectArgs>()) as u64,
        )?;
        resources.ensure_capacity(
            rhi,
            |b| &mut b.bones,
            (self.draws.bones_data.len() * std::mem::size_of::<Mat4>()) as u64,
        )?;
        resources.ensure_capacity(rhi, |b| &mut b.light_data, light_bytes.len() as u64)?;
        resources.ensure_capacity(
            rhi,
            |b| &mut b.clusters,
            (self.grid_dims.cluster_count() as usize * std::mem::size_of::<crate::cluster::ClusterAabb>()) as u64,
        )?;

        resources.rebuild_bindings_if_dirty(rhi)?;

        let mut commands = rhi.command_list();
        commands.open();

        // 2. Write scene buffers: batched as one barrier set.
        commands.enable_automatic_barriers(false);
        commands.write_buffer(resources.buffers.scene_globals(), 0, bytemuck::bytes_of(&scene_globals));
        if !self.draws.instance_data.is_empty() {
            commands.write_buffer(resources.buffers.instances(), 0, bytemuck::cast_slice(&self.draws.instance_data));
        }
        if !self.draws.indirect_args.is_empty() {
            commands.write_buffer(resources.buffers.indirect(), 0, bytemuck::cast_slice(&self.draws.indirect_args));
        }
        if !self.draws.bones_data.is_empty() {
            commands.write_buffer(resources.buffers.bones(), 0, bytemuck::cast_slice(&self.draws.bones_data));
        }
        commands.write_buffer(resources.buffers.light_data(), 0, &light_bytes);
        commands.enable_automatic_barriers(true);
        commands.commit_barriers();

        let has_draws = !self.draws.draw_commands.is_empty();
        let has_lights = self.lights.num_lights > 0;

        // 3. Cull.
        if has_draws {
            if let Some(pipeline) = self.pipelines.cull {
                commands.set_compute_state(pipeline, &[resources.scene_binding_set]);
                let groups = (self.draws.instance_data.len() as u32).div_ceil(256).max(1);
                commands.dispatch(groups, 1, 1);
                commands.set_buffer_state(resources.buffers.indirect(), ResourceState::UnorderedAccess);
                commands.set_buffer_state(resources.buffers.instance_mapping(), ResourceState::UnorderedAccess);
            } else {
                log::warn!("cull shader missing, skipping cull pass");
            }
        }

        // 4. Depth pre-pass.
        if has_draws {
            if let Some(pipeline) = self.pipelines.depth_prepass {
                commands.set_buffer_state(resources.buffers.indirect(), ResourceState::IndirectArgument);
                commands.set_buffer_state(resources.buffers.instance_mapping(), ResourceState::ShaderResource);
                commands.commit_barriers();

                let pass = RenderPassDesc {
                    color_targets: vec![],
                    depth_target: Some(RenderTarget { image: resources.images.depth, load_op: LoadOp::Clear }),
                    view_mask: 0,
                    viewport: (0, 0, screen_size.0, screen_size.1),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.draw_indexed_indirect_count(
                    resources.buffers.indirect(),
                    0,
                    resources.buffers.indirect(),
                    0,
                    self.draws.draw_commands.len() as u32,
                    std::mem::size_of::<crate::draw::IndirectArgs>() as u32,
                );
                commands.end_render_pass();
                commands.set_image_state(resources.images.depth, ResourceState::DepthWrite);
            } else {
                log::warn!("depth pre-pass shader missing, skipping pass");
            }
        }

        // 5. Depth pyramid.
        if let Some(pipeline) = self.pipelines.depth_pyramid {
            commands.set_image_state(resources.images.depth, ResourceState::ShaderResource);
            commands.commit_barriers();
            commands.set_compute_state(pipeline, &[resources.scene_binding_set]);
            commands.set_enable_uav_barriers_for_image(resources.images.depth_pyramid.image, false);
            for level in 0..resources.images.depth_pyramid.mip_levels {
                let (mip_width, mip_height) = resources.images.depth_pyramid.mip_extent(level);
                commands.set_push_constants(bytemuck::bytes_of(&DepthPyramidPushConstants { mip_width, mip_height }));
                commands.dispatch(mip_width.div_ceil(32), mip_height.div_ceil(32), 1);
            }
            commands.set_enable_uav_barriers_for_image(resources.images.depth_pyramid.image, true);
        } else {
            log::warn!("depth pyramid shader missing, skipping pass");
        }

        // 6. Cluster build.
        if has_lights && has_draws {
            if let Some(pipeline) = self.pipelines.cluster_build {
                let inverse_proj = view.proj_matrix().inverse();
                let push_constants = ClusterBuildPushConstants {
                    inverse_proj_diag: Vec2::new(inverse_proj.x_axis.x, inverse_proj.y_axis.y),
                    near: view.near,
                    far: view.far,
                    grid: UVec3::new(self.grid_dims.x, self.grid_dims.y, self.grid_dims.z),
                    screen: Vec2::new(screen_size.0 as f32, screen_size.1 as f32),
                    _pad: [0; 7],
                };
                commands.set_compute_state(pipeline, &[resources.scene_binding_set]);
                commands.set_push_constants(bytemuck::bytes_of(&push_constants));
                let cluster_aabbs = build_cluster_aabbs(self.grid_dims, inverse_proj, view.near, view.far);
                commands.write_buffer(resources.buffers.clusters(), 0, bytemuck::cast_slice(&cluster_aabbs));
                commands.dispatch(self.grid_dims.x, self.grid_dims.y, self.grid_dims.z);
            } else {
                log::warn!("cluster build shader missing, skipping pass");
            }
        }

        // 7. Light cull.
        if has_lights {
            if let Some(pipeline) = self.pipelines.light_cull {
                commands.set_compute_state(pipeline, &[resources.scene_binding_set]);
                let push_constants = LightCullPushConstants { view: view.view_matrix() };
                commands.set_push_constants(bytemuck::bytes_of(&push_constants));
                commands.dispatch(self.grid_dims.x, self.grid_dims.y, self.grid_dims.z);
            } else {
                log::warn!("light cull shader missing, skipping pass");
            }
        }

        // 8. Point-light shadows.
        if let Some(pipeline) = self.pipelines.point_shadow {
            for slot in &self.packed_shadows.point {
                let pass = RenderPassDesc {
                    color_targets: vec![],
                    depth_target: Some(RenderTarget { image: resources.images.shadow_atlas, load_op: LoadOp::Clear }),
                    view_mask: 0b111111,
                    viewport: (0, 0, 0, 0),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.set_push_constants(bytemuck::bytes_of(&ShadowPassPushConstants { light_index: slot.owner_light_index }));
                commands.draw_indexed_indirect_count(
                    resources.buffers.indirect(),
                    0,
                    resources.buffers.indirect(),
                    0,
                    self.draws.draw_commands.len() as u32,
                    std::mem::size_of::<crate::draw::IndirectArgs>() as u32,
                );
                commands.end_render_pass();
            }
        } else if !self.packed_shadows.point.is_empty() {
            log::warn!("point shadow shader missing, skipping {} shadowed point lights", self.packed_shadows.point.len());
        }

        // 9. Spot-light shadows.
        if let Some(pipeline) = self.pipelines.spot_shadow {
            for slot in &self.packed_shadows.spot {
                let pass = RenderPassDesc {
                    color_targets: vec![],
                    depth_target: Some(RenderTarget { image: resources.images.shadow_atlas, load_op: LoadOp::Clear }),
                    view_mask: 0b1,
                    viewport: (0, 0, 0, 0),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.set_push_constants(bytemuck::bytes_of(&ShadowPassPushConstants { light_index: slot.owner_light_index }));
                commands.draw_indexed_indirect_count(
                    resources.buffers.indirect(),
                    0,
                    resources.buffers.indirect(),
                    0,
                    self.draws.draw_commands.len() as u32,
                    std::mem::size_of::<crate::draw::IndirectArgs>() as u32,
                );
                commands.end_render_pass();
            }
        } else if !self.packed_shadows.spot.is_empty() {
            log::warn!("spot shadow shader missing, skipping {} shadowed spot lights", self.packed_shadows.spot.len());
        }

        // 10. Cascaded shadow pass.
        if self.lights.has_sun {
            if let Some(pipeline) = self.pipelines.csm {
                let pass = RenderPassDesc {
                    color_targets: vec![],
                    depth_target: Some(RenderTarget { image: resources.images.csm, load_op: LoadOp::Clear }),
                    view_mask: (1 << crate::shadow::NUM_CASCADES) - 1,
                    viewport: (0, 0, 0, 0),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.draw_indexed_indirect_count(
                    resources.buffers.indirect(),
                    0,
                    resources.buffers.indirect(),
                    0,
                    self.draws.draw_commands.len() as u32,
                    std::mem::size_of::<crate::draw::IndirectArgs>() as u32,
                );
                commands.end_render_pass();
            } else {
                log::warn!("cascaded shadow shader missing, skipping pass");
            }
        }

        // 11. Environment.
        if let Some(environment) = world.environment() {
            if let Some(pipeline) = self.pipelines.environment {
                let pass = RenderPassDesc {
                    color_targets: vec![RenderTarget { image: resources.images.hdr, load_op: LoadOp::Clear }],
                    depth_target: None,
                    view_mask: 0,
                    viewport: (0, 0, screen_size.0, screen_size.1),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.set_push_constants(bytemuck::bytes_of(&environment.intensity));
                commands.draw(3, 1);
                commands.end_render_pass();
            } else {
                log::warn!("environment shader missing, skipping pass");
            }
        }

        // 12. Base pass.
        if has_draws {
            if let Some(pipeline) = self.pipelines.base {
                let pass = RenderPassDesc {
                    color_targets: vec![
                        RenderTarget { image: resources.images.hdr, load_op: LoadOp::Load },
                        RenderTarget { image: resources.images.picker, load_op: LoadOp::Clear },
                    ],
                    depth_target: Some(RenderTarget { image: resources.images.depth, load_op: LoadOp::Load }),
                    view_mask: 0,
                    viewport: (0, 0, screen_size.0, screen_size.1),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.draw_indexed_indirect_count(
                    resources.buffers.indirect(),
                    0,
                    resources.buffers.indirect(),
                    0,
                    self.draws.draw_commands.len() as u32,
                    std::mem::size_of::<crate::draw::IndirectArgs>() as u32,
                );
                commands.end_render_pass();
            } else {
                log::warn!("base pass shader missing, skipping pass");
            }
        }

        // 13. Transparent pass: reserved, currently a no-op.

        // 14. Batched lines.
        let line_vertex_count: usize = world.line_batches().map(|batch| batch.vertices.len()).sum();
        if line_vertex_count > 0 {
            if let Some(pipeline) = self.pipelines.lines {
                let pass = RenderPassDesc {
                    color_targets: vec![RenderTarget { image: resources.images.hdr, load_op: LoadOp::Load }],
                    depth_target: Some(RenderTarget { image: resources.images.depth, load_op: LoadOp::Load }),
                    view_mask: 0,
                    viewport: (0, 0, screen_size.0, screen_size.1),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                for batch in world.line_batches() {
                    commands.draw(batch.vertices.len() as u32, 1);
                }
                commands.end_render_pass();
            } else {
                log::warn!("line batch shader missing, skipping pass");
            }
        }

        // 15. Selection post-process.
        let selected = world.selected_entities();
        if !selected.is_empty() {
            if let Some(pipeline) = self.pipelines.selection {
                let push_constants = build_selection_push_constants([255, 191, 0, 255], 2.0, selected);
                let pass = RenderPassDesc {
                    color_targets: vec![RenderTarget { image: resources.images.hdr, load_op: LoadOp::Load }],
                    depth_target: None,
                    view_mask: 0,
                    viewport: (0, 0, screen_size.0, screen_size.1),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.set_push_constants(bytemuck::bytes_of(&push_constants));
                commands.draw(3, 1);
                commands.end_render_pass();
            } else {
                log::warn!("selection shader missing, skipping pass");
            }
        }

        // 16. Tone map: unconditional.
        if let Some(pipeline) = self.pipelines.tonemap {
            let pass = RenderPassDesc {
                color_targets: vec![RenderTarget { image: resources.images.hdr, load_op: LoadOp::Load }],
                depth_target: None,
                view_mask: 0,
                viewport: (0, 0, screen_size.0, screen_size.1),
            };
            commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
            commands.set_push_constants(bytemuck::bytes_of(&ToneMapPushConstants { exposure: 1.0, time: world_time }));
            commands.draw(3, 1);
            commands.end_render_pass();
        } else {
            log::warn!("tone map shader missing, skipping pass -- frame has no presentable output");
        }

        // 17. Debug overlay.
        if !self.debug_flags.is_empty() {
            if let Some(pipeline) = self.pipelines.debug_overlay {
                let pass = RenderPassDesc {
                    color_targets: vec![RenderTarget { image: resources.images.hdr, load_op: LoadOp::Load }],
                    depth_target: None,
                    view_mask: 0,
                    viewport: (0, 0, screen_size.0, screen_size.1),
                };
                commands.set_graphics_state(pipeline, &[resources.scene_binding_set], &pass);
                commands.draw(3, 1);
                commands.end_render_pass();
            } else {
                log::warn!("debug overlay shader missing, skipping pass");
            }
        }

        commands.close();
        self.state = FrameState::Submitted;
        rhi.submit_wait_idle(commands)?;
        self.state = FrameState::Idle;

        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resources::ResourceManager;
    use crate::test_support::FakeWorld;
    use scene_rhi::mock::MockRhi;

    fn test_view() -> ViewVolume {
        ViewVolume {
            position: Vec3::ZERO,
            right: Vec3::X,
            up: Vec3::Y,
            forward: Vec3::NEG_Z,
            fov_y_radians: 1.0,
            aspect: 16.0 / 9.0,
            near: 1000.0,
            far: 0.1,
        }
    }

    #[test]
    fn empty_world_runs_a_full_frame_without_error() {
        let rhi = MockRhi::new();
        let mut resources = ResourceManager::create(&rhi, 320, 180, 1024, 512, 3).unwrap();
        let mut scheduler = FrameScheduler::new(&rhi, &resources, 4);
        let world = FakeWorld::new();

        let submitted = scheduler
            .run_frame(&rhi, &world, &test_view(), &mut resources, (320, 180), 0.0, 1.0 / 60.0, CullFlags::FRUSTUM_CULL, Vec3::ZERO)
            .unwrap();

        assert!(submitted);
        assert_eq!(scheduler.state(), FrameState::Idle);
    }

    #[test]
    fn pending_shader_compiles_abort_the_frame() {
        let rhi = MockRhi::new();
        let resources = ResourceManager::create(&rhi, 320, 180, 1024, 512, 3).unwrap();
        let mut scheduler = FrameScheduler::new(&rhi, &resources, 4);
        rhi.pending_shaders.borrow_mut().push("anything".into());

        let mut resources = resources;
        let world = FakeWorld::new();
        let submitted = scheduler
            .run_frame(&rhi, &world, &test_view(), &mut resources, (320, 180), 0.0, 1.0 / 60.0, CullFlags::FRUSTUM_CULL, Vec3::ZERO)
            .unwrap();

        assert!(!submitted);
        assert_eq!(scheduler.state(), FrameState::Compiling);
    }

    #[test]
    fn frame_with_draws_and_sun_submits_through_shadow_passes() {
        let rhi = MockRhi::new();
        let mut resources = ResourceManager::create(&rhi, 320, 180, 1024, 512, 3).unwrap();
        let mut scheduler = FrameScheduler::new(&rhi, &resources, 4);

        let mut world = FakeWorld::new();
        let mesh = world.add_mesh_single_surface(36, 0);
        world.add_static_instance(mesh, Mat4::IDENTITY);
        world.add_directional_light(Vec3::new(0.0, -1.0, 0.0), true);

        let submitted = scheduler
            .run_frame(&rhi, &world, &test_view(), &mut resources, (320, 180), 0.0, 1.0 / 60.0, CullFlags::FRUSTUM_CULL, Vec3::ZERO)
            .unwrap();

        assert!(submitted);
    }

    #[test]
    fn depth_prepass_write_transitions_to_shader_resource_before_depth_pyramid() {
        let rhi = MockRhi::new();
        let mut resources = ResourceManager::create(&rhi, 320, 180, 1024, 512, 3).unwrap();
        let mut scheduler = FrameScheduler::new(&rhi, &resources, 4);

        let mut world = FakeWorld::new();
        let mesh = world.add_mesh_single_surface(36, 0);
        world.add_static_instance(mesh, Mat4::IDENTITY);

        let submitted = scheduler
            .run_frame(&rhi, &world, &test_view(), &mut resources, (320, 180), 0.0, 1.0 / 60.0, CullFlags::FRUSTUM_CULL, Vec3::ZERO)
            .unwrap();
        assert!(submitted);

        let depth = resources.images.depth;
        let barrier = rhi
            .last_image_barriers()
            .into_iter()
            .find(|barrier| barrier.image == depth)
            .expect("depth pre-pass must emit a barrier transitioning the depth image");

        assert_eq!(barrier.before, ResourceState::DepthWrite);
        assert_eq!(barrier.after, ResourceState::ShaderResource);
    }
}
