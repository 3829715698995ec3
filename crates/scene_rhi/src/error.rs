#[derive(Debug, thiserror::Error)]
pub enum RhiError {
    #[error("out of device memory")]
    OutOfDeviceMemory,
    #[error("missing binding for slot {0}")]
    MissingBinding(u32),
    #[error("binding set references a destroyed resource")]
    StaleBinding,
    #[error("unsupported image view kind for {dimensions:?}")]
    InvalidImageView { dimensions: (u32, u32, u32) },
    #[error("shader compile failed: {0}")]
    ShaderCompile(String),
    #[error("backend failure: {0}")]
    Backend(String),
}
