/// Boundary between the viewer core and a rendering device
use std::fmt::Debug;

use nalgebra::{Matrix4, Vector3};

use crate::geometry::GeometryBuffer;

/// Per-frame draw inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub model: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
    /// RGB in `[0, 1]`
    pub color: Vector3<f32>,
}

impl FrameUniforms {
    pub fn mvp(&self) -> Matrix4<f32> {
        self.projection * self.view * self.model
    }
}

/// A device that owns uploaded vertex/index buffers
pub trait RenderDevice {
    type Handle: Copy + Debug;

    fn upload(&mut self, geometry: &GeometryBuffer) -> Self::Handle;

    /// Free the buffers behind `handle`. Called exactly once per handle.
    fn release(&mut self, handle: Self::Handle);

    fn draw(&mut self, handle: Self::Handle, uniforms: &FrameUniforms);
}

/// Owner of the device buffers for the currently loaded geometry
#[derive(Debug)]
pub struct ModelSlot<H: Copy + Debug> {
    handle: Option<H>,
    index_count: usize,
}

impl<H: Copy + Debug> ModelSlot<H> {
    pub fn new() -> Self {
        Self {
            handle: None,
            index_count: 0,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Upload `geometry`, releasing any previous buffers first
    pub fn load<D>(&mut self, device: &mut D, geometry: &GeometryBuffer)
    where
        D: RenderDevice<Handle = H>,
    {
        self.unload(device);
        let handle = device.upload(geometry);
        log::debug!("uploaded geometry as {:?}", handle);
        self.handle = Some(handle);
        self.index_count = geometry.index_count();
    }

    pub fn unload<D>(&mut self, device: &mut D)
    where
        D: RenderDevice<Handle = H>,
    {
        if let Some(handle) = self.handle.take() {
            log::debug!("releasing {:?}", handle);
            device.release(handle);
            self.index_count = 0;
        }
    }

    pub fn draw<D>(&self, device: &mut D, uniforms: &FrameUniforms)
    where
        D: RenderDevice<Handle = H>,
    {
        if let Some(handle) = self.handle {
            device.draw(handle, uniforms);
        }
    }
}

impl<H: Copy + Debug> Default for ModelSlot<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Copy + Debug> Drop for ModelSlot<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("model slot dropped while {:?} is still on the device", handle);
        }
    }
}
