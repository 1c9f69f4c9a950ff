#![forbid(unsafe_code)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod config;
mod fonts;

use std::time::Instant;

use calculator_core::logging;
use egui::Context;
use egui_wgpu::{Renderer as EguiRenderer, ScreenDescriptor};
use egui_winit::State as EguiState;
use platform_winit::{create_window, ControlFlow, Event, Window, WindowEvent, WindowSpec};
use render_wgpu::RenderError;
use tracing::{error, info};

use app::CalculatorApp;
use config::CalculatorConfig;

const WINDOW_TITLE: &str = concat!("Material Calculator ", env!("CARGO_PKG_VERSION"));
const WINDOW_WIDTH: u32 = 1000;
const WINDOW_HEIGHT: u32 = 700;
const WINDOW_MIN_WIDTH: u32 = 640;
const WINDOW_MIN_HEIGHT: u32 = 420;

struct EguiLayer {
    ctx: Context,
    state: EguiState,
    renderer: EguiRenderer,
    frame_size: winit::dpi::PhysicalSize<u32>,
}

struct DrawData {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen_descriptor: ScreenDescriptor,
}

impl EguiLayer {
    fn new(
        ctx: Context,
        window: &Window,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Self {
        let state = EguiState::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );
        Self {
            ctx,
            state,
            renderer: EguiRenderer::new(device, format, None, 1),
            frame_size: window.inner_size(),
        }
    }

    fn on_window_event(&mut self, window: &Window, event: &WindowEvent) {
        let _ = self.state.on_window_event(window, event);
    }

    fn begin_frame(
        &mut self,
        window: &Window,
        time_seconds: f64,
        frame_size: winit::dpi::PhysicalSize<u32>,
    ) -> Context {
        let mut raw_input = self.state.take_egui_input(window);
        let pixels_per_point = egui_winit::pixels_per_point(&self.ctx, window);
        let screen_size = egui::vec2(
            frame_size.width as f32 / pixels_per_point,
            frame_size.height as f32 / pixels_per_point,
        );
        raw_input.screen_rect = Some(egui::Rect::from_min_size(egui::Pos2::ZERO, screen_size));
        if let Some(viewport) = raw_input.viewports.get_mut(&egui::ViewportId::ROOT) {
            viewport.native_pixels_per_point = Some(pixels_per_point);
            viewport.inner_rect = raw_input.screen_rect;
        }
        raw_input.time = Some(time_seconds);
        self.frame_size = frame_size;
        self.ctx.begin_frame(raw_input);
        self.ctx.clone()
    }

    fn end_frame(&mut self, window: &Window) -> DrawData {
        let output = self.ctx.end_frame();
        self.state
            .handle_platform_output(window, output.platform_output);
        let paint_jobs = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        DrawData {
            paint_jobs,
            textures_delta: output.textures_delta,
            screen_descriptor: ScreenDescriptor {
                size_in_pixels: [self.frame_size.width, self.frame_size.height],
                pixels_per_point: egui_winit::pixels_per_point(&self.ctx, window),
            },
        }
    }

    fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        draw: &DrawData,
    ) {
        for (id, delta) in &draw.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }
        self.renderer.update_buffers(
            device,
            queue,
            encoder,
            &draw.paint_jobs,
            &draw.screen_descriptor,
        );
        if !draw.paint_jobs.is_empty() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("calculator.egui.pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.renderer
                .render(&mut pass, &draw.paint_jobs, &draw.screen_descriptor);
        }
        for id in &draw.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn main() {
    logging::init(logging::DEFAULT_DIRECTIVES);
    let config = CalculatorConfig::load();

    let spec = WindowSpec::new(WINDOW_TITLE, WINDOW_WIDTH, WINDOW_HEIGHT)
        .with_min_size(WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT);
    let (event_loop, window) = create_window(&spec).unwrap_or_else(|err| {
        error!("window init failed: {}", err);
        std::process::exit(1);
    });
    let window: &'static Window = Box::leak(Box::new(window));
    let main_window_id = window.id();

    let mut renderer = render_wgpu::Renderer::new(window).unwrap_or_else(|err| {
        error!("renderer init failed: {}", err);
        std::process::exit(1);
    });

    let ctx = Context::default();
    ctx.set_visuals(egui::Visuals::light());
    fonts::install_fallback_font(&ctx, config.ui_font_path.as_deref());
    let mut layer = EguiLayer::new(ctx, window, renderer.device(), renderer.surface_format());
    let mut app = CalculatorApp::new(config);
    let start_time = Instant::now();

    window.set_visible(true);
    info!("window shown");

    if let Err(err) = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, window_id } if window_id == main_window_id => {
                layer.on_window_event(window, &event);
                match event {
                    WindowEvent::CloseRequested => {
                        app.save_config();
                        elwt.exit();
                    }
                    WindowEvent::Resized(size) => renderer.resize(size),
                    WindowEvent::ScaleFactorChanged { .. } => {
                        renderer.resize(renderer.window_inner_size());
                    }
                    WindowEvent::RedrawRequested => {
                        let size = window.inner_size();
                        if size.width == 0 || size.height == 0 {
                            return;
                        }
                        if size != renderer.size() {
                            renderer.resize(size);
                        }
                        let time_seconds = start_time.elapsed().as_secs_f64();
                        let ctx = layer.begin_frame(window, time_seconds, size);
                        app.ui(&ctx);
                        let draw = layer.end_frame(window);

                        let result =
                            renderer.render_with_overlay(|device, queue, encoder, view, _format| {
                                layer.paint(device, queue, encoder, view, &draw);
                            });
                        match result {
                            Ok(()) => {}
                            Err(RenderError::Lost | RenderError::Outdated) => {
                                renderer.resize(renderer.window_inner_size());
                            }
                            Err(RenderError::OutOfMemory) => {
                                error!("render error: out of memory");
                                app.save_config();
                                elwt.exit();
                            }
                            Err(RenderError::Timeout) => {}
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                app.save_config();
            }
            _ => {}
        }
    }) {
        error!("event loop exited with error: {}", err);
    }
}
