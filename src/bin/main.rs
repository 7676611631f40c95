use std::{num::NonZeroU32, path::PathBuf, sync::Arc, time::Instant};

use clap::Parser;
use eframe::egui_wgpu::{self, wgpu};
use eframe::wgpu::include_wgsl;
use eframe::{egui, wgpu::util::DeviceExt};
use encase::{ShaderSize, ShaderType, UniformBuffer};
use particle_scenes::{
    Error, GpuParticles, SceneKind, SceneSettings,
    camera::{Camera, GpuCamera},
    capture::{CaptureJob, CaptureSchedule, CaptureSettings, CaptureStatus, CapturedFrame},
    config::Config,
    uniforms::{GpuUniforms, SceneUniforms},
};

const ROTATION_SPEED: f32 = 90.0;
const ZOOM_SPEED: f32 = 1.5;
/// Degrees of orbit per dragged point.
const DRAG_SENSITIVITY: f32 = 0.3;
/// Longest side of a captured GIF frame, in pixels.
const MAX_CAPTURE_EDGE: f32 = 800.0;

#[derive(Parser)]
#[command(about = "Real-time procedural particle scenes")]
struct Args {
    /// Scene shown at startup.
    #[arg(long, value_enum, default_value_t = SceneKind::Plane)]
    scene: SceneKind,
    /// Seed for point generation; overrides the configuration file.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file with per-scene overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory GIF captures are written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn to_bytes<T: ShaderType + encase::internal::WriteInto>(value: &T) -> Result<Vec<u8>, Error> {
    let mut buffer = UniformBuffer::new(Vec::new());
    buffer.write(value)?;
    Ok(buffer.into_inner())
}

fn to_color32(rgba: [f32; 4]) -> egui::Color32 {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

struct Renderer {
    camera_uniform_buffer: wgpu::Buffer,
    scene_uniform_buffer: wgpu::Buffer,
    uniforms_bind_group: wgpu::BindGroup,
    particles_storage_buffer: wgpu::Buffer,
    particles_storage_buffer_size: usize,
    particles_bind_group_layout: wgpu::BindGroupLayout,
    particles_bind_group: wgpu::BindGroup,
    particles_render_pipeline: wgpu::RenderPipeline,
    target_format: wgpu::TextureFormat,
}

impl Renderer {
    fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let particles_shader = device.create_shader_module(include_wgsl!("./particles.wgsl"));

        let uniforms_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniforms Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(<GpuCamera as ShaderSize>::SHADER_SIZE),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(<GpuUniforms as ShaderSize>::SHADER_SIZE),
                        },
                        count: None,
                    },
                ],
            });

        let particles_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particles Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: Some(<GpuParticles as ShaderType>::min_size()),
                    },
                    count: None,
                }],
            });

        let camera_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: &[0; <GpuCamera as ShaderSize>::SHADER_SIZE.get() as _],
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
        });

        let scene_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene Uniform Buffer"),
            contents: &[0; <GpuUniforms as ShaderSize>::SHADER_SIZE.get() as _],
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::UNIFORM,
        });

        const PARTICLES_STORAGE_BUFFER_SIZE: usize =
            <GpuParticles as ShaderType>::METADATA.min_size().get() as _;

        let particles_storage_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particles Storage Buffer"),
            contents: &[0; PARTICLES_STORAGE_BUFFER_SIZE],
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::STORAGE,
        });

        let uniforms_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniforms Bind Group"),
            layout: &uniforms_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scene_uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let particles_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particles Bind Group"),
            layout: &particles_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: particles_storage_buffer.as_entire_binding(),
            }],
        });

        let particles_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particles Pipeline Layout"),
            bind_group_layouts: &[&uniforms_bind_group_layout, &particles_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Additive, unsorted, no depth: overlapping sprites glow.
        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };

        let particles_render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particles Render Pipeline"),
            layout: Some(&particles_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &particles_shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &particles_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                polygon_mode: wgpu::PolygonMode::Fill,
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            camera_uniform_buffer,
            scene_uniform_buffer,
            uniforms_bind_group,
            particles_storage_buffer,
            particles_storage_buffer_size: PARTICLES_STORAGE_BUFFER_SIZE,
            particles_bind_group_layout,
            particles_bind_group,
            particles_render_pipeline,
            target_format,
        }
    }

    /// Reallocates the storage buffer only when the cloud outgrows it.
    fn upload_particles(&mut self, particles: &[u8], device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.particles_storage_buffer_size >= particles.len() {
            queue.write_buffer(&self.particles_storage_buffer, 0, particles);
            return;
        }

        self.particles_storage_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particles Storage Buffer"),
            contents: particles,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::STORAGE,
        });
        self.particles_storage_buffer_size = particles.len();

        self.particles_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particles Bind Group"),
            layout: &self.particles_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.particles_storage_buffer.as_entire_binding(),
            }],
        });
    }

    fn prepare(&self, camera: &[u8], uniforms: &[u8], queue: &wgpu::Queue) -> Vec<wgpu::CommandBuffer> {
        queue.write_buffer(&self.camera_uniform_buffer, 0, camera);
        queue.write_buffer(&self.scene_uniform_buffer, 0, uniforms);
        vec![]
    }

    fn paint<'a>(&'a self, particle_count: u32, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&self.particles_render_pipeline);
        render_pass.set_bind_group(0, &self.uniforms_bind_group, &[]);
        render_pass.set_bind_group(1, &self.particles_bind_group, &[]);
        render_pass.draw(0..4, 0..particle_count);
    }

    /// Renders one frame offscreen and reads it back.
    #[allow(clippy::too_many_arguments)]
    fn capture_frame(
        &self,
        camera: &[u8],
        uniforms: &[u8],
        particle_count: u32,
        size: (u32, u32),
        clear_color: [f32; 4],
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<CapturedFrame, Error> {
        let bgra = match self.target_format {
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => true,
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => false,
            other => return Err(Error::UnsupportedFormat(format!("{other:?}"))),
        };

        let (width, height) = size;
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Capture Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.target_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = (width * 4).div_ceil(align) * align;
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Readback Buffer"),
            size: u64::from(padded_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        self.prepare(camera, uniforms, queue);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Capture Encoder"),
        });
        {
            let [r, g, b, a] = clear_color.map(f64::from);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Capture Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.paint(particle_count, &mut render_pass);
        }
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: NonZeroU32::new(padded_row),
                    rows_per_image: None,
                },
            },
            extent,
        );
        queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| Error::BufferMapping(e.to_string()))?
            .map_err(|e| Error::BufferMapping(e.to_string()))?;

        let frame = {
            let data = slice.get_mapped_range();
            CapturedFrame::from_readback(width, height, padded_row as usize, &data, bgra)
        };
        readback.unmap();
        Ok(frame)
    }
}

/// Runs `f` against the renderer stored in egui's paint callback resources.
fn with_renderer<R>(
    render_state: &egui_wgpu::RenderState,
    f: impl FnOnce(&mut Renderer, &wgpu::Device, &wgpu::Queue) -> R,
) -> Option<R> {
    let mut egui_renderer = render_state.renderer.write();
    let renderer = egui_renderer.paint_callback_resources.get_mut::<Renderer>()?;
    Some(f(renderer, &render_state.device, &render_state.queue))
}

/// A capture in progress: one frame is rendered per UI update.
struct ActiveCapture {
    schedule: CaptureSchedule,
    settings: CaptureSettings,
    size: (u32, u32),
    frames: Vec<CapturedFrame>,
    path: PathBuf,
    /// Progress to restore once the last frame is rendered.
    progress: f32,
}

struct ParticleScenes {
    config: Config,
    settings: SceneSettings,
    uniforms: SceneUniforms,
    camera: Camera,
    seed: u64,
    particle_count: u32,
    start_time: Instant,
    last_frame_time: Instant,
    capture: CaptureJob,
    active_capture: Option<ActiveCapture>,
}

impl ParticleScenes {
    fn new(cc: &eframe::CreationContext, config: Config, scene: SceneKind) -> Self {
        let render_state = cc.wgpu_render_state.as_ref();
        match render_state {
            Some(render_state) => {
                let renderer = Renderer::new(&render_state.device, render_state.target_format);
                render_state
                    .renderer
                    .write()
                    .paint_callback_resources
                    .insert(renderer);
            }
            None => log::error!("The wgpu renderer is not available; nothing will be drawn"),
        }

        let settings = config.settings_for(scene);
        let mut app = Self {
            seed: config.seed,
            config,
            uniforms: SceneUniforms::new(&settings),
            camera: Camera::new(settings.camera_position),
            settings,
            particle_count: 0,
            start_time: Instant::now(),
            last_frame_time: Instant::now(),
            capture: CaptureJob::default(),
            active_capture: None,
        };
        app.regenerate(render_state);
        app
    }

    fn switch_scene(&mut self, kind: SceneKind, render_state: Option<&egui_wgpu::RenderState>) {
        if self.active_capture.is_some() {
            log::warn!("Finish the running capture before switching scenes");
            return;
        }
        log::info!("Switching to {} scene", kind.name());
        self.settings = self.config.settings_for(kind);
        self.uniforms = SceneUniforms::new(&self.settings);
        self.camera = Camera::new(self.settings.camera_position);
        self.start_time = Instant::now();
        self.regenerate(render_state);
    }

    fn regenerate(&mut self, render_state: Option<&egui_wgpu::RenderState>) {
        let started = Instant::now();
        let cloud = self.settings.generate(self.seed);
        let bytes = match cloud.to_storage_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("Failed to encode {} particles: {err}", cloud.len());
                return;
            }
        };

        let uploaded = render_state.and_then(|render_state| {
            with_renderer(render_state, |renderer, device, queue| {
                renderer.upload_particles(&bytes, device, queue);
            })
        });
        if uploaded.is_none() {
            log::warn!("No renderer to upload particles to");
            return;
        }

        self.particle_count = cloud.len() as u32;
        log::info!(
            "Generated {} {} particles (seed {}) in {:.1}ms",
            cloud.len(),
            self.settings.kind.name(),
            self.seed,
            started.elapsed().as_secs_f64() * 1000.0
        );
    }

    fn handle_camera_input(&mut self, ctx: &egui::Context, response: &egui::Response, ts: f32) {
        let drag = response.drag_delta();
        if drag != egui::Vec2::ZERO {
            self.camera.rotate(-drag.x * DRAG_SENSITIVITY, drag.y * DRAG_SENSITIVITY);
        }

        if response.hovered() {
            let scroll = ctx.input(|i| i.scroll_delta.y);
            if scroll != 0.0 {
                self.camera.zoom((-scroll * 0.002).exp());
            }
        }

        if !ctx.wants_keyboard_input() {
            ctx.input(|i| {
                if i.key_down(egui::Key::W) {
                    self.camera.zoom(1.0 / (1.0 + ZOOM_SPEED * ts));
                }
                if i.key_down(egui::Key::S) {
                    self.camera.zoom(1.0 + ZOOM_SPEED * ts);
                }
                if i.key_down(egui::Key::ArrowUp) {
                    self.camera.rotate(0.0, ROTATION_SPEED * ts);
                }
                if i.key_down(egui::Key::ArrowDown) {
                    self.camera.rotate(0.0, -ROTATION_SPEED * ts);
                }
                if i.key_down(egui::Key::ArrowLeft) {
                    self.camera.rotate(-ROTATION_SPEED * ts, 0.0);
                }
                if i.key_down(egui::Key::ArrowRight) {
                    self.camera.rotate(ROTATION_SPEED * ts, 0.0);
                }
            });
        }

        self.camera.update(ts);
    }

    fn start_capture(&mut self) {
        let settings = self.settings.capture;
        let schedule = settings.schedule();
        if self.active_capture.is_some() || !self.capture.begin(schedule.total()) {
            log::warn!("A capture is already running");
            return;
        }
        if schedule.total() == 0 {
            self.capture.fail(&Error::EmptyCapture);
            return;
        }

        let resolution = self.uniforms.resolution();
        let scale = (MAX_CAPTURE_EDGE / resolution.x.max(resolution.y)).min(1.0);
        let size = (
            ((resolution.x * scale).round() as u32).max(1),
            ((resolution.y * scale).round() as u32).max(1),
        );

        let path = self.config.output_dir.join(self.settings.kind.capture_file_name());
        log::info!(
            "Capturing {} frames at {}x{} to {}",
            schedule.total(),
            size.0,
            size.1,
            path.display()
        );
        self.active_capture = Some(ActiveCapture {
            frames: Vec::with_capacity(schedule.total() as usize),
            schedule,
            settings,
            size,
            path,
            progress: self.uniforms.progress(),
        });
    }

    /// Renders the next scheduled capture frame, and hands the finished set
    /// to the encoder after the last one.
    fn step_capture(&mut self, render_state: Option<&egui_wgpu::RenderState>) {
        let Some(active) = self.active_capture.as_mut() else {
            return;
        };

        let Some(timing) = active.schedule.next() else {
            if let Some(active) = self.active_capture.take() {
                self.uniforms.set_progress(active.progress);
                self.capture.encode(active.frames, active.settings, active.path);
            }
            return;
        };

        let mut uniforms = self.uniforms;
        uniforms.advance(timing.elapsed);
        uniforms.set_progress(timing.progress);
        uniforms.set_resolution(cgmath::vec2(active.size.0 as f32, active.size.1 as f32), 1.0);
        // The panel slider follows the captured progress.
        self.uniforms.set_progress(timing.progress);

        let aspect = active.size.0 as f32 / active.size.1 as f32;
        let frame = to_bytes(&self.camera.to_gpu(aspect)).and_then(|camera| {
            let uniforms = to_bytes(&uniforms.to_gpu())?;
            let (count, size, clear) = (self.particle_count, active.size, self.settings.clear_color);
            render_state
                .and_then(|render_state| {
                    with_renderer(render_state, |renderer, device, queue| {
                        renderer.capture_frame(&camera, &uniforms, count, size, clear, device, queue)
                    })
                })
                .unwrap_or_else(|| Err(Error::BufferMapping("no renderer available".to_owned())))
        });

        match frame {
            Ok(frame) => {
                active.frames.push(frame);
                self.capture.set_rendering(active.frames.len() as u32, active.schedule.total());
            }
            Err(err) => {
                self.capture.fail(&err);
                if let Some(active) = self.active_capture.take() {
                    self.uniforms.set_progress(active.progress);
                }
            }
        }
    }

    fn render_ui_panel(
        &mut self,
        ui: &mut egui::Ui,
        frame_time: f32,
        render_state: Option<&egui_wgpu::RenderState>,
    ) {
        ui.label(format!("FPS: {:.3}", 1.0 / frame_time.max(f32::EPSILON)));
        ui.label(format!("Frame Time: {:.3}ms", frame_time * 1000.0));
        ui.label(format!("Particles: {}", self.particle_count));
        ui.separator();

        let mut selected = self.settings.kind;
        egui::ComboBox::from_label("Scene")
            .selected_text(selected.name())
            .show_ui(ui, |ui| {
                for kind in SceneKind::ALL {
                    ui.selectable_value(&mut selected, kind, kind.name());
                }
            });
        if selected != self.settings.kind {
            self.switch_scene(selected, render_state);
        }

        let tweaks = self.settings.tweaks;
        if tweaks.progress {
            let mut progress = self.uniforms.progress();
            if ui
                .add(egui::Slider::new(&mut progress, 0.0..=1.0).step_by(0.001).text("Progress"))
                .changed()
            {
                self.uniforms.set_progress(progress);
            }
        }
        if tweaks.size {
            ui.add(egui::Slider::new(&mut self.uniforms.size, 0.0..=1.0).step_by(0.001).text("Particle Size"));
        }
        if tweaks.speed {
            ui.add(egui::Slider::new(&mut self.uniforms.speed, 0.0..=1.0).step_by(0.001).text("Speed"));
        }
        if tweaks.show_points {
            ui.checkbox(&mut self.uniforms.show_points, "Show Points");
        }
        if tweaks.count {
            let mut count = self.settings.count;
            let range = self.settings.count_range.clone();
            let response = ui.add(
                egui::Slider::new(&mut count, range)
                    .step_by(f64::from(self.settings.count_step))
                    .text("Particle Count"),
            );
            let committed = response.drag_released() || (response.changed() && !response.dragged());
            if committed && self.settings.set_count(count) {
                self.regenerate(render_state);
            }
        }

        ui.horizontal(|ui| {
            ui.label(format!("Seed: {}", self.seed));
            if ui.button("Reseed").clicked() {
                self.seed = self.seed.wrapping_add(1);
                self.regenerate(render_state);
            }
        });

        ui.separator();
        let status = self.capture.status();
        if ui
            .add_enabled(!status.is_busy(), egui::Button::new("Capture GIF"))
            .clicked()
        {
            self.start_capture();
        }
        match status {
            CaptureStatus::Idle => {}
            CaptureStatus::Rendering { done, total } => {
                ui.add(egui::ProgressBar::new(done as f32 / total.max(1) as f32).text(format!("Rendering {done}/{total}")));
            }
            CaptureStatus::Encoding { frames } => {
                ui.add(egui::Spinner::new());
                ui.label(format!("Encoding {frames} frames"));
            }
            CaptureStatus::Finished(path) => {
                ui.label(format!("Saved {}", path.display()));
            }
            CaptureStatus::Failed(message) => {
                ui.colored_label(ui.visuals().error_fg_color, message);
            }
        }
    }
}

impl eframe::App for ParticleScenes {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let current_time = Instant::now();
        let frame_time = current_time.duration_since(self.last_frame_time);
        self.last_frame_time = current_time;
        let ts = frame_time.as_secs_f32();

        let render_state = frame.wgpu_render_state().cloned();
        let render_state = render_state.as_ref();

        self.uniforms.advance(self.start_time.elapsed().as_secs_f32());
        self.step_capture(render_state);

        egui::SidePanel::left("Control Panel").show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_ui_panel(ui, ts, render_state);
                ui.allocate_space(ui.available_size());
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(to_color32(self.settings.clear_color)))
            .show(ctx, |ui| {
                let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
                self.uniforms.set_resolution(
                    cgmath::vec2(rect.width(), rect.height()),
                    ctx.pixels_per_point(),
                );
                self.handle_camera_input(ctx, &response, ts);

                let aspect = rect.width() / rect.height().max(1.0);
                let buffers = to_bytes(&self.camera.to_gpu(aspect))
                    .and_then(|camera| Ok((camera, to_bytes(&self.uniforms.to_gpu())?)));
                let (camera, uniforms) = match buffers {
                    Ok(buffers) => buffers,
                    Err(err) => {
                        log::error!("Failed to encode uniforms: {err}");
                        return;
                    }
                };
                let particle_count = self.particle_count;

                ui.painter().add(egui::PaintCallback {
                    rect,
                    callback: Arc::new(
                        egui_wgpu::CallbackFn::new()
                            .prepare(move |_device, queue, _encoder, paint_callback_resources| {
                                match paint_callback_resources.get::<Renderer>() {
                                    Some(renderer) => renderer.prepare(&camera, &uniforms, queue),
                                    None => vec![],
                                }
                            })
                            .paint(move |_info, render_pass, paint_callback_resources| {
                                if let Some(renderer) = paint_callback_resources.get::<Renderer>() {
                                    renderer.paint(particle_count, render_pass);
                                }
                            }),
                    ),
                });
            });

        ctx.request_repaint();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    let scene = args.scene;

    eframe::run_native(
        "Particle Scenes",
        eframe::NativeOptions {
            renderer: eframe::Renderer::Wgpu,
            wgpu_options: egui_wgpu::WgpuConfiguration {
                present_mode: wgpu::PresentMode::AutoVsync,
                depth_format: None,
                ..Default::default()
            },
            initial_window_size: Some(egui::vec2(1280.0, 800.0)),
            ..Default::default()
        },
        Box::new(move |cc| Box::new(ParticleScenes::new(cc, config, scene))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
