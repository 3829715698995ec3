/// Error kinds the core recognizes.
///
/// Propagation policy: anything salvageable by skipping a pass is logged
/// (via the `log` crate) and swallowed by the caller; anything that
/// corrupts the GPU-facing contract is a hard [`SceneError::InvariantViolation`];
/// allocation failures propagate as [`SceneError::OutOfDeviceMemory`].
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// Non-fatal: the frame is skipped, leaving the previous frame's back
    /// buffer on screen.
    #[error("shader compiles are still pending")]
    ShadersCompiling,

    /// The owning pass is skipped; logged once per shader name by the
    /// caller before this is constructed.
    #[error("shader missing: {0}")]
    ShaderMissing(String),

    /// Per-light soft failure; the light renders unshadowed for this frame.
    #[error("shadow atlas has no free tiles")]
    OutOfAtlasTiles,

    #[error("out of device memory reallocating a scene buffer")]
    OutOfDeviceMemory(#[from] scene_rhi::RhiError),

    /// Returned to the caller without querying GPU memory.
    #[error("readback coordinate ({0}, {1}) is out of range")]
    ReadbackOutOfRange(u32, u32),

    /// Indicates a caller contract breach (missing default material,
    /// negative instance count, ...). Debug builds should treat this as an
    /// abort; release builds propagate it.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
