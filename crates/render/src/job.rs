use crate::error::RenderError;
use crate::geometry::SceneGeometry;
use crate::sampling;
use crate::tracer::{RenderScene, RenderSettings};
use glam::Vec3;
use raystage_assets::MeshSource;
use raystage_kernel::{
    Channel, ChannelLayout, EntityData, FrameBuffer, FrameBufferHandle, RendererHandle, Scene,
    kind,
};
use raystage_shading::PathDepth;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Upper bound on the samples of one frame (4 GiB of `f32`).
pub const MAX_FRAME_SAMPLES: usize = 1 << 30;

/// Lifecycle of one render invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Unbuilt,
    AccelerationBuilt,
    InProgress,
    Complete,
    Failed,
}

/// Execution knobs that do not belong to the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Worker threads. `None` uses the available parallelism.
    pub threads: Option<usize>,
    /// Output rows handed to a worker at a time.
    pub band_rows: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            threads: None,
            band_rows: 8,
        }
    }
}

impl RenderOptions {
    pub fn worker_count(&self) -> usize {
        self.threads
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

/// Summary of a completed render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub renderer: String,
    pub width: u32,
    pub height: u32,
    pub camera_rays: u64,
    pub workers: usize,
    pub elapsed: Duration,
}

impl RenderReport {
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for RenderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}x{} ({} camera rays, {} workers) in {:.2?}",
            self.renderer, self.width, self.height, self.camera_rays, self.workers, self.elapsed
        )
    }
}

/// A finished frame that has not been committed to the scene yet.
pub struct RenderOutput {
    pub framebuffer: FrameBufferHandle,
    pub frame: FrameBuffer,
    pub report: RenderReport,
}

struct Prepared {
    scene: RenderScene,
    framebuffer: FrameBufferHandle,
    layout: ChannelLayout,
}

/// One render invocation over a borrowed, unchanging scene.
///
/// Drives `Unbuilt → AccelerationBuilt → InProgress → Complete`. Any error
/// moves the job to `Failed` and nothing is produced.
pub struct RenderJob<'s> {
    scene: &'s Scene,
    renderer: RendererHandle,
    state: RenderState,
    geometry: Option<SceneGeometry>,
    prepared: Option<Prepared>,
}

impl<'s> RenderJob<'s> {
    pub fn new(scene: &'s Scene, renderer: RendererHandle) -> Self {
        Self {
            scene,
            renderer,
            state: RenderState::Unbuilt,
            geometry: None,
            prepared: None,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    fn expect(&mut self, expected: RenderState) -> Result<(), RenderError> {
        if self.state != expected {
            let actual = self.state;
            self.state = RenderState::Failed;
            return Err(RenderError::InvalidState { expected, actual });
        }
        Ok(())
    }

    fn fail(&mut self, err: RenderError) -> RenderError {
        tracing::warn!(error = %err, "render failed");
        self.state = RenderState::Failed;
        self.geometry = None;
        self.prepared = None;
        err
    }

    /// Load referenced meshes and build the acceleration structures.
    pub fn build_acceleration(&mut self, source: &dyn MeshSource) -> Result<(), RenderError> {
        self.expect(RenderState::Unbuilt)?;
        let _span = tracing::info_span!("build_acceleration").entered();
        match SceneGeometry::build(self.scene, source) {
            Ok(geometry) => {
                self.geometry = Some(geometry);
                self.state = RenderState::AccelerationBuilt;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Check bindings, read the renderer settings and bind shaders.
    pub fn begin(&mut self) -> Result<(), RenderError> {
        self.expect(RenderState::AccelerationBuilt)?;
        let scene = self.scene;
        let renderer = scene.entity(self.renderer);
        let EntityData::Renderer {
            camera,
            framebuffer,
        } = renderer.data()
        else {
            return Err(self.fail(RenderError::InvalidState {
                expected: RenderState::AccelerationBuilt,
                actual: RenderState::Failed,
            }));
        };
        let not_bound = |missing| RenderError::RendererNotBound {
            renderer: renderer.name().to_string(),
            missing,
        };
        let camera = match camera {
            Some(camera) => *camera,
            None => return Err(self.fail(not_bound("camera"))),
        };
        let framebuffer = match framebuffer {
            Some(framebuffer) => *framebuffer,
            None => return Err(self.fail(not_bound("frame buffer"))),
        };
        let layout = match scene.entity(framebuffer).data() {
            EntityData::FrameBuffer(fb) => fb.layout().clone(),
            _ => return Err(self.fail(not_bound("frame buffer"))),
        };
        let settings = RenderSettings::from_properties(renderer.properties());
        let (width, height) = (settings.resolution.x, settings.resolution.y);
        let fits = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(layout.channels().len()))
            .is_some_and(|samples| samples <= MAX_FRAME_SAMPLES);
        if !fits {
            return Err(self.fail(RenderError::FrameTooLarge {
                renderer: renderer.name().to_string(),
                width,
                height,
            }));
        }
        let Some(geometry) = self.geometry.take() else {
            return Err(self.fail(RenderError::InvalidState {
                expected: RenderState::AccelerationBuilt,
                actual: self.state,
            }));
        };

        let camera_props = scene.entity(camera).properties();
        self.prepared = Some(Prepared {
            scene: RenderScene::new(scene, geometry, camera_props, settings),
            framebuffer,
            layout,
        });
        self.state = RenderState::InProgress;
        tracing::debug!(renderer = renderer.name(), width, height, "render begun");
        Ok(())
    }

    /// Trace every pixel across worker threads and produce the frame.
    pub fn execute(&mut self, options: &RenderOptions) -> Result<RenderOutput, RenderError> {
        self.expect(RenderState::InProgress)?;
        let Some(prepared) = self.prepared.take() else {
            return Err(self.fail(RenderError::InvalidState {
                expected: RenderState::InProgress,
                actual: self.state,
            }));
        };
        let _span = tracing::info_span!("execute").entered();
        let started = Instant::now();

        let settings = *prepared.scene.settings();
        let (width, height) = (settings.resolution.x, settings.resolution.y);
        let channels = prepared.layout.channels();
        let stride = width as usize * channels.len();
        let band_rows = options.band_rows.max(1) as usize;
        let bands = (height as usize).div_ceil(band_rows);
        let workers = options.worker_count().min(bands).max(1);

        let mut samples = Vec::new();
        if samples.try_reserve_exact(stride * height as usize).is_err() {
            return Err(self.fail(RenderError::FrameTooLarge {
                renderer: self.scene.entity(self.renderer).name().to_string(),
                width,
                height,
            }));
        }
        samples.resize(stride * height as usize, 0.0f32);
        let queue = Mutex::new(samples.chunks_mut(stride * band_rows).enumerate());
        let counted = std::thread::scope(|s| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                handles.push(s.spawn(|| {
                    let mut rays = 0;
                    loop {
                        let next = match queue.lock() {
                            Ok(mut pending) => pending.next(),
                            Err(_) => None,
                        };
                        let Some((band, pixels)) = next else { break };
                        rays += render_band(&prepared.scene, channels, band * band_rows, pixels);
                    }
                    rays
                }));
            }
            handles
                .into_iter()
                .map(|handle| handle.join())
                .try_fold(0u64, |total, rays| rays.map(|n| total + n))
        });
        drop(queue);
        let camera_rays = match counted {
            Ok(rays) => rays,
            Err(_) => return Err(self.fail(RenderError::WorkerPanicked)),
        };

        let frame = match FrameBuffer::from_parts(prepared.layout, width, height, samples) {
            Ok(frame) => frame,
            Err(_) => {
                return Err(self.fail(RenderError::InvalidState {
                    expected: RenderState::InProgress,
                    actual: RenderState::Failed,
                }));
            }
        };
        self.state = RenderState::Complete;
        Ok(RenderOutput {
            framebuffer: prepared.framebuffer,
            frame,
            report: RenderReport {
                renderer: self.scene.entity(self.renderer).name().to_string(),
                width,
                height,
                camera_rays,
                workers,
                elapsed: started.elapsed(),
            },
        })
    }
}

/// Shade every pixel of one band of rows starting at `first_row`.
/// Returns the number of camera rays traced.
fn render_band(scene: &RenderScene, channels: &[Channel], first_row: usize, pixels: &mut [f32]) -> u64 {
    let settings = scene.settings();
    let (width, height) = (
        settings.resolution.x as usize,
        settings.resolution.y as usize,
    );
    let (nx, ny) = (settings.pixel_samples.x, settings.pixel_samples.y);
    let mut rays = 0u64;

    for (offset, pixel) in pixels.chunks_mut(channels.len()).enumerate() {
        let x = offset % width;
        let y = first_row + offset / width;
        let index = (y * width + x) as u64;

        let mut color = Vec3::ZERO;
        let mut alpha = 0.0;
        let mut nearest: Option<f32> = None;
        let mut count = 0u32;
        for (sx, sy) in sampling::stratified(index, nx, ny, settings.sample_jitter) {
            let u = (x as f32 + sx) / width as f32 * 2.0 - 1.0;
            let v = 1.0 - (y as f32 + sy) / height as f32 * 2.0;
            let ray = scene.camera().ray(u, v);
            let (radiance, hit) = scene.trace(&ray, PathDepth::default());
            color += radiance.color;
            alpha += radiance.alpha;
            if let Some(t) = hit {
                nearest = Some(nearest.map_or(t, |n| n.min(t)));
            }
            count += 1;
        }
        rays += count as u64;

        let inv = 1.0 / count.max(1) as f32;
        for (value, channel) in pixel.iter_mut().zip(channels) {
            *value = match channel {
                Channel::Red => color.x * inv,
                Channel::Green => color.y * inv,
                Channel::Blue => color.z * inv,
                Channel::Alpha => alpha * inv,
                Channel::Depth => nearest.unwrap_or(0.0),
            };
        }
    }
    rays
}

/// Render through the named renderer and commit the frame into its bound
/// frame buffer. On error the scene is left unchanged.
pub fn render(
    scene: &mut Scene,
    renderer: &str,
    source: &dyn MeshSource,
    options: &RenderOptions,
) -> Result<RenderReport, RenderError> {
    let handle = scene.resolve_as::<kind::Renderer>(renderer)?;
    let _span = tracing::info_span!("render", renderer).entered();
    let output = {
        let mut job = RenderJob::new(scene, handle);
        job.build_acceleration(source)?;
        job.begin()?;
        job.execute(options)?
    };
    scene.commit_frame(output.framebuffer, output.frame);
    tracing::info!(report = %output.report, "render complete");
    Ok(output.report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raystage_assets::FileMeshSource;
    use raystage_common::PropertyValue;
    use raystage_kernel::schema::{PERSPECTIVE_CAMERA, POINT_LIGHT};
    use raystage_shading::PluginRegistry;

    fn bound_scene(width: f32, height: f32) -> Scene {
        let mut plugins = PluginRegistry::new();
        plugins.open("PlasticShader").unwrap();
        let mut scene = Scene::new();
        scene.create_camera("cam", PERSPECTIVE_CAMERA).unwrap();
        scene
            .set_property("cam", "translate", PropertyValue::vec3(0.0, 0.0, 5.0))
            .unwrap();
        scene.create_light("key", POINT_LIGHT).unwrap();
        scene
            .set_property("key", "position", PropertyValue::vec3(0.0, 0.0, 10.0))
            .unwrap();
        scene.create_shader(&plugins, "plastic", "PlasticShader").unwrap();
        scene.create_mesh("quad", "primitive:quad").unwrap();
        scene.create_instance("wall", "quad").unwrap();
        scene
            .set_property("wall", "scale", PropertyValue::vec3(10.0, 10.0, 1.0))
            .unwrap();
        scene.assign_shader("wall", "plastic").unwrap();
        scene.create_framebuffer("fb", "rgbaz").unwrap();
        scene.create_renderer("ren").unwrap();
        scene.assign_camera("ren", "cam").unwrap();
        scene.assign_framebuffer("ren", "fb").unwrap();
        scene
            .set_property("ren", "resolution", PropertyValue::vec2(width, height))
            .unwrap();
        scene
    }

    fn frame(scene: &Scene) -> &FrameBuffer {
        let fb = scene.resolve_as::<kind::FrameBuffer>("fb").unwrap();
        scene.framebuffer(fb).unwrap()
    }

    #[test]
    fn states_advance_in_order() {
        let scene = bound_scene(4.0, 3.0);
        let ren = scene.resolve_as::<kind::Renderer>("ren").unwrap();
        let mut job = RenderJob::new(&scene, ren);
        assert_eq!(job.state(), RenderState::Unbuilt);
        job.build_acceleration(&FileMeshSource::default()).unwrap();
        assert_eq!(job.state(), RenderState::AccelerationBuilt);
        job.begin().unwrap();
        assert_eq!(job.state(), RenderState::InProgress);
        let output = job.execute(&RenderOptions::default()).unwrap();
        assert_eq!(job.state(), RenderState::Complete);
        assert_eq!((output.frame.width(), output.frame.height()), (4, 3));
        assert_eq!(output.report.camera_rays, 4 * 3 * 9);
    }

    #[test]
    fn out_of_order_call_fails() {
        let scene = bound_scene(2.0, 2.0);
        let ren = scene.resolve_as::<kind::Renderer>("ren").unwrap();
        let mut job = RenderJob::new(&scene, ren);
        assert!(matches!(
            job.begin(),
            Err(RenderError::InvalidState {
                expected: RenderState::AccelerationBuilt,
                actual: RenderState::Unbuilt,
            })
        ));
        assert_eq!(job.state(), RenderState::Failed);
    }

    #[test]
    fn render_commits_exact_resolution() {
        let mut scene = bound_scene(5.0, 3.0);
        let report = render(
            &mut scene,
            "ren",
            &FileMeshSource::default(),
            &RenderOptions::default(),
        )
        .unwrap();
        assert_eq!(report.pixels(), 15);
        let fb = frame(&scene);
        assert_eq!((fb.width(), fb.height()), (5, 3));
        assert_eq!(fb.samples().len(), 5 * 3 * 5);
        // the wall fills the view: opaque, five units away
        let centre = fb.pixel(2, 1).unwrap();
        assert!((centre[3] - 1.0).abs() < 1e-6);
        assert!((centre[4] - 5.0).abs() < 1e-2);
    }

    #[test]
    fn oversized_resolution_is_an_error() {
        let mut scene = bound_scene(1e6, 1e6);
        let err = render(
            &mut scene,
            "ren",
            &FileMeshSource::default(),
            &RenderOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenderError::FrameTooLarge {
                width: 1_000_000,
                height: 1_000_000,
                ..
            }
        ));
        assert!(!frame(&scene).is_rendered());
    }

    #[test]
    fn unbound_renderer_leaves_frame_buffer_empty() {
        let mut scene = bound_scene(2.0, 2.0);
        scene.create_renderer("lonely").unwrap();
        scene.assign_framebuffer("lonely", "fb").unwrap();
        let err = render(
            &mut scene,
            "lonely",
            &FileMeshSource::default(),
            &RenderOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenderError::RendererNotBound {
                missing: "camera",
                ..
            }
        ));
        assert!(!frame(&scene).is_rendered());
    }

    #[test]
    fn geometry_error_leaves_frame_buffer_empty() {
        let mut scene = bound_scene(2.0, 2.0);
        scene.create_mesh("broken", "does/not/exist.mesh").unwrap();
        scene.create_instance("ghost", "broken").unwrap();
        let err = render(
            &mut scene,
            "ren",
            &FileMeshSource::default(),
            &RenderOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Geometry { .. }));
        assert!(!frame(&scene).is_rendered());
    }

    #[test]
    fn output_independent_of_worker_count() {
        let mut one = bound_scene(16.0, 12.0);
        let mut many = bound_scene(16.0, 12.0);
        let source = FileMeshSource::default();
        render(
            &mut one,
            "ren",
            &source,
            &RenderOptions {
                threads: Some(1),
                band_rows: 12,
            },
        )
        .unwrap();
        render(
            &mut many,
            "ren",
            &source,
            &RenderOptions {
                threads: Some(4),
                band_rows: 1,
            },
        )
        .unwrap();
        assert_eq!(frame(&one), frame(&many));
    }

    #[test]
    fn unknown_renderer_name() {
        let mut scene = bound_scene(2.0, 2.0);
        let err = render(
            &mut scene,
            "nope",
            &FileMeshSource::default(),
            &RenderOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Scene(_)));
    }

    /// Wall at z = 0 facing a camera at z = 5, lit from z = 10.
    fn lit_wall(plugins: &PluginRegistry, shader_type: &str) -> Scene {
        let mut scene = Scene::new();
        scene.create_camera("cam", PERSPECTIVE_CAMERA).unwrap();
        scene
            .set_property("cam", "translate", PropertyValue::vec3(0.0, 0.0, 5.0))
            .unwrap();
        scene.create_light("key", POINT_LIGHT).unwrap();
        scene
            .set_property("key", "position", PropertyValue::vec3(0.0, 0.0, 10.0))
            .unwrap();
        scene.create_shader(plugins, "surface", shader_type).unwrap();
        scene.create_mesh("quad", "primitive:quad").unwrap();
        scene.create_instance("wall", "quad").unwrap();
        scene
            .set_property("wall", "scale", PropertyValue::vec3(10.0, 10.0, 1.0))
            .unwrap();
        scene.assign_shader("wall", "surface").unwrap();
        scene.create_framebuffer("fb", "rgba").unwrap();
        scene.create_renderer("ren").unwrap();
        scene.assign_camera("ren", "cam").unwrap();
        scene.assign_framebuffer("ren", "fb").unwrap();
        scene
            .set_property("ren", "resolution", PropertyValue::vec2(4.0, 4.0))
            .unwrap();
        scene
    }

    fn add_quad(scene: &mut Scene, name: &str, z: f32) {
        scene.create_instance(name, "quad").unwrap();
        scene
            .set_property(name, "translate", PropertyValue::vec3(0.0, 0.0, z))
            .unwrap();
        scene
            .set_property(name, "scale", PropertyValue::vec3(10.0, 10.0, 1.0))
            .unwrap();
    }

    fn rendered(mut scene: Scene) -> FrameBuffer {
        render(
            &mut scene,
            "ren",
            &FileMeshSource::default(),
            &RenderOptions::default(),
        )
        .unwrap();
        frame(&scene).clone()
    }

    #[test]
    fn shadows_follow_cast_shadow() {
        let mut plugins = PluginRegistry::new();
        plugins.open("PlasticShader").unwrap();

        let open = rendered(lit_wall(&plugins, "PlasticShader"));

        // a blocker between the wall and the light, behind the camera
        let blocked = |cast_shadow: f32| {
            let mut scene = lit_wall(&plugins, "PlasticShader");
            add_quad(&mut scene, "blocker", 7.0);
            scene
                .set_property("ren", "cast_shadow", PropertyValue::scalar(cast_shadow))
                .unwrap();
            rendered(scene)
        };

        let unshadowed = blocked(0.0);
        assert_eq!(unshadowed, open);

        let shadowed = blocked(1.0);
        let lit = open.pixel(1, 1).unwrap()[0];
        let dark = shadowed.pixel(1, 1).unwrap()[0];
        assert!(lit > 0.1, "lit = {lit}");
        assert_eq!(dark, 0.0);
    }

    #[test]
    fn refract_depth_zero_never_samples_behind_glass() {
        let mut plugins = PluginRegistry::new();
        plugins.open("GlassShader").unwrap();
        plugins.open("ConstantShader").unwrap();

        let render_with = |max_refract_depth: f32, backdrop: bool| {
            let mut scene = lit_wall(&plugins, "GlassShader");
            scene
                .set_property(
                    "ren",
                    "max_refract_depth",
                    PropertyValue::scalar(max_refract_depth),
                )
                .unwrap();
            if backdrop {
                scene.create_shader(&plugins, "bright", "ConstantShader").unwrap();
                add_quad(&mut scene, "backdrop", -3.0);
                scene.assign_shader("backdrop", "bright").unwrap();
            }
            rendered(scene)
        };

        assert_eq!(render_with(0.0, true), render_with(0.0, false));
        assert_ne!(render_with(1.0, true), render_with(1.0, false));
    }
}
