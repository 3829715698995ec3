macro_rules! rhi_handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub u32);
    };
}

rhi_handle!(BufferHandle);
rhi_handle!(ImageHandle);
rhi_handle!(ShaderHandle);
rhi_handle!(PipelineHandle);
rhi_handle!(BindingLayoutHandle);
rhi_handle!(BindingSetHandle);
