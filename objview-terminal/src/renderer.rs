/// ASCII rasterizer for terminal rendering
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Point3, Vector3};
use objview_core::geometry::face_normal;
use objview_core::{project_to_screen, FrameUniforms, GeometryBuffer, RenderDevice, ScreenPoint};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Handle to a mesh uploaded to an [`AsciiRenderer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshHandle(usize);

/// Device-side copy of an uploaded geometry buffer
struct UploadedMesh {
    positions: Vec<Point3<f32>>,
    indices: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    glyph: char,
    color: Color,
}

const EMPTY: Cell = Cell {
    glyph: ' ',
    color: Color::Reset,
};

/// Terminal render device: holds uploaded meshes and rasterizes them into a
/// character buffer with a depth test
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
    meshes: Vec<Option<UploadedMesh>>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![EMPTY; size],
            meshes: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.cells = vec![EMPTY; width * height];
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(EMPTY);
    }

    /// Number of meshes currently held on the device
    pub fn live_meshes(&self) -> usize {
        self.meshes.iter().filter(|m| m.is_some()).count()
    }

    pub fn glyph_at(&self, x: usize, y: usize) -> char {
        self.cells[y * self.width + x].glyph
    }

    fn render_triangle(&mut self, corners: [Point3<f32>; 3], uniforms: &FrameUniforms, shade: &Shading) {
        let mvp = uniforms.mvp();

        // Project vertices to screen space
        let mut screen = [ScreenPoint {
            x: 0.0,
            y: 0.0,
            depth: 0.0,
        }; 3];
        for (slot, corner) in screen.iter_mut().zip(&corners) {
            match project_to_screen(&mvp, corner, self.width as u32, self.height as u32) {
                Some(point) => *slot = point,
                None => return, // Triangle is clipped
            }
        }

        // Shade by how directly the face points at the camera
        let model_view = uniforms.view * uniforms.model;
        let [a, b, c] = corners.map(|p| model_view.transform_point(&p));
        let Some(normal) = face_normal(&a, &b, &c) else {
            return;
        };
        let brightness = normal.z.abs();
        let cell = shade.cell(brightness);

        self.rasterize_triangle(&screen, cell);
    }

    fn rasterize_triangle(&mut self, coords: &[ScreenPoint; 3], cell: Cell) {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                if let Some((w0, w1, w2)) =
                    barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;

                        let idx = y as usize * self.width + x as usize;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.cells[idx] = cell;
                        }
                    }
                }
            }
        }
    }

    /// Write the frame, one terminal row at a time
    pub fn present<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = None;
        for y in 0..self.height {
            writer.queue(cursor::MoveTo(0, y as u16))?;
            for cell in &self.cells[y * self.width..(y + 1) * self.width] {
                if current != Some(cell.color) {
                    writer.queue(SetForegroundColor(cell.color))?;
                    current = Some(cell.color);
                }
                writer.queue(Print(cell.glyph))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderDevice for AsciiRenderer {
    type Handle = MeshHandle;

    fn upload(&mut self, geometry: &GeometryBuffer) -> MeshHandle {
        let mesh = UploadedMesh {
            positions: geometry.positions().to_vec(),
            indices: geometry.indices().to_vec(),
        };
        match self.meshes.iter().position(Option::is_none) {
            Some(free) => {
                self.meshes[free] = Some(mesh);
                MeshHandle(free)
            }
            None => {
                self.meshes.push(Some(mesh));
                MeshHandle(self.meshes.len() - 1)
            }
        }
    }

    fn release(&mut self, handle: MeshHandle) {
        match self.meshes.get_mut(handle.0).and_then(Option::take) {
            Some(mesh) => log::debug!(
                "released {:?}: {} vertices, {} indices",
                handle,
                mesh.positions.len(),
                mesh.indices.len()
            ),
            None => log::warn!("release of unknown mesh {:?}", handle),
        }
    }

    fn draw(&mut self, handle: MeshHandle, uniforms: &FrameUniforms) {
        let Some(Some(mesh)) = self.meshes.get(handle.0) else {
            log::warn!("draw of unknown mesh {:?}", handle);
            return;
        };
        let triangles: Vec<[Point3<f32>; 3]> = mesh
            .indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]].map(|i| mesh.positions[i as usize]))
            .collect();

        let shade = Shading {
            color: uniforms.color,
        };
        for corners in triangles {
            self.render_triangle(corners, uniforms, &shade);
        }
    }
}

/// Maps a brightness in `[0, 1]` to a glyph and a tint of the uniform colour
struct Shading {
    color: Vector3<f32>,
}

impl Shading {
    fn cell(&self, brightness: f32) -> Cell {
        let brightness = brightness.clamp(0.0, 1.0);
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
        let char_index = char_index.min(LUMINOSITY_RAMP.len() - 1);

        // Keep faint faces visible
        let tint = self.color * (0.25 + 0.75 * brightness);
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
        Cell {
            glyph: LUMINOSITY_RAMP[char_index],
            color: Color::Rgb {
                r: channel(tint.x),
                g: channel(tint.y),
                b: channel(tint.z),
            },
        }
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;
    use objview_core::{Camera, GeometryBuilder, Projection};

    fn quad() -> GeometryBuffer {
        let text = "v -1 -1 0\nv 1 -1 0\nv 1 1 0\nv -1 1 0\nf 1 2 3\nf 1 3 4\n";
        GeometryBuilder::default()
            .build(&objview_core::wavefront::parse_str(text))
            .unwrap()
    }

    fn uniforms(width: u32, height: u32) -> FrameUniforms {
        let camera = Camera::default();
        FrameUniforms {
            model: Matrix4::identity(),
            view: camera.view_matrix(),
            projection: Projection::new(width, height, 0.1, 100.0).matrix(camera.zoom()),
            color: Vector3::new(0.0, 0.86, 0.12),
        }
    }

    #[test]
    fn test_draw_fills_center() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let handle = renderer.upload(&quad());
        renderer.clear();
        renderer.draw(handle, &uniforms(40, 20));
        // quad faces the camera head on
        assert_eq!(renderer.glyph_at(20, 10), '@');
        assert_eq!(renderer.glyph_at(0, 0), ' ');
    }

    #[test]
    fn test_clear_resets_cells() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let handle = renderer.upload(&quad());
        renderer.draw(handle, &uniforms(40, 20));
        renderer.clear();
        assert_eq!(renderer.glyph_at(20, 10), ' ');
    }

    #[test]
    fn test_release_frees_slot_for_reuse() {
        let mut renderer = AsciiRenderer::new(10, 10);
        let first = renderer.upload(&quad());
        let second = renderer.upload(&quad());
        assert_ne!(first, second);
        assert_eq!(renderer.live_meshes(), 2);

        renderer.release(first);
        assert_eq!(renderer.live_meshes(), 1);
        let third = renderer.upload(&quad());
        assert_eq!(third, first);
        assert_eq!(renderer.live_meshes(), 2);
    }

    #[test]
    fn test_draw_after_release_is_ignored() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let handle = renderer.upload(&quad());
        renderer.release(handle);
        renderer.draw(handle, &uniforms(40, 20));
        assert_eq!(renderer.glyph_at(20, 10), ' ');
    }

    #[test]
    fn test_present_writes_every_row() {
        let renderer = AsciiRenderer::new(4, 3);
        let mut out = Vec::new();
        renderer.present(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("    ").count(), 3);
    }

    #[test]
    fn test_resize() {
        let mut renderer = AsciiRenderer::new(4, 3);
        renderer.resize(8, 5);
        assert_eq!((renderer.width(), renderer.height()), (8, 5));
        assert_eq!(renderer.glyph_at(7, 4), ' ');
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-6);
    }
}
