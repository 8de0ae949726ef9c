//! GPU device acquisition

use crate::error::RenderError;

/// Device and queue used by every renderer component
pub struct GpuContext {
    /// Logical device
    pub device: wgpu::Device,
    /// Submission queue
    pub queue: wgpu::Queue,
    /// Information about the adapter backing the device
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Create a device without a surface, blocking until it is ready
    pub fn new_headless() -> Result<Self, RenderError> {
        pollster::block_on(Self::request(None))
    }

    /// Create a device able to present to `surface`
    pub async fn request(surface: Option<&wgpu::Surface<'_>>) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: surface,
            })
            .await
            .ok_or(RenderError::AdapterNotFound)?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            "Using adapter {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("PBR Viewer Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| RenderError::RequestDevice(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!("Uncaptured wgpu error: {}", error);
        }));

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Block until all submitted work has finished
    pub fn wait_idle(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

/// Headless context for GPU tests, `None` when the machine has no adapter
#[cfg(test)]
pub(crate) fn test_context() -> Option<GpuContext> {
    match GpuContext::new_headless() {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Skipping GPU test: {e}");
            None
        }
    }
}
