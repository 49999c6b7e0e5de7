mod audio;

use anyhow::{Context, Result};
use rack_audio::AudioConfig;
use rack_engine::core::{App, AppControl, FrameCtx};
use rack_engine::coords::Viewport;
use rack_engine::device::GpuInit;
use rack_engine::logging::{LoggingConfig, init_logging};
use rack_engine::render::{FrameRenderer, RendererConfig};
use rack_engine::text::{GlyphAtlas, GlyphAtlasConfig, load_system_font, push_text};
use rack_engine::window::{Runtime, RuntimeConfig};
use rack_proto::{Camera2D, FrameBuilder, Rgba8, TexturedVertex};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use audio::{AudioOut, SharedFrequency};

const MIN_HZ: f32 = 110.0;
const OCTAVES: f32 = 3.0;
const SCOPE_POINTS: usize = 256;

const PANEL: Rgba8 = Rgba8::new(24, 26, 32, 255);
const ACCENT: Rgba8 = Rgba8::new(90, 200, 160, 255);
const TEXT: Rgba8 = Rgba8::new(230, 230, 235, 255);

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let frequency = SharedFrequency::new(220.0);
    let audio = AudioOut::start(&AudioConfig::default(), frequency.clone()).context("starting audio")?;
    log::info!("audio running at {} Hz", audio.sample_rate());

    let glyphs = match load_system_font() {
        Some(bytes) => match GlyphAtlas::from_font_bytes(&bytes, GlyphAtlasConfig::default()) {
            Ok(glyphs) => Some(glyphs),
            Err(err) => {
                log::warn!("text disabled: {err}");
                None
            }
        },
        None => {
            log::warn!("text disabled: no system font found");
            None
        }
    };

    let studio = Studio {
        renderer: FrameRenderer::new(RendererConfig::default()),
        frame: FrameBuilder::new(),
        glyphs,
        atlas_uploaded: false,
        audio: Some(audio),
        frequency,
        surface_width: 0.0,
        elapsed: 0.0,
    };

    Runtime::run(
        RuntimeConfig {
            title: "rack studio".to_string(),
            ..Default::default()
        },
        GpuInit::default(),
        studio,
    )
}

struct Studio {
    renderer: FrameRenderer,
    frame: FrameBuilder<TexturedVertex>,
    glyphs: Option<GlyphAtlas>,
    atlas_uploaded: bool,
    audio: Option<AudioOut>,
    frequency: SharedFrequency,
    /// Physical width, cursor positions arrive in physical pixels.
    surface_width: f32,
    elapsed: f32,
}

impl Studio {
    fn build_scene(&mut self, viewport: Viewport, fps: f32) {
        let hz = self.frequency.get();
        let frame = &mut self.frame;
        frame.begin_frame();

        let (w, h) = (viewport.width, viewport.height);
        frame.push_rounded_rect([16.0, 16.0], [w - 32.0, h - 32.0], 0.05, PANEL);

        // scope: a few periods of the current tone, scrolled over time
        let mid = h * 0.5;
        let amp = h * 0.25;
        let cycles = hz / MIN_HZ * 2.0;
        let points: Vec<[f32; 2]> = (0..SCOPE_POINTS)
            .map(|i| {
                let t = i as f32 / (SCOPE_POINTS - 1) as f32;
                let phase = (t * cycles + self.elapsed) * std::f32::consts::TAU;
                [32.0 + t * (w - 64.0), mid - amp * phase.sin()]
            })
            .collect();
        frame.push_line_strip(&points, ACCENT);

        // pulsing marker, drawn through a camera zoomed around it
        let center = [w - 80.0, 80.0];
        let camera = Camera2D {
            offset: center,
            target: center,
            zoom: 1.0 + 0.2 * (self.elapsed * 4.0).sin(),
            ..Default::default()
        };
        frame.begin_camera(&camera);
        frame.push_circle(center, 24.0, ACCENT);
        frame.end_camera();

        if let Some(glyphs) = self.glyphs.as_ref() {
            push_text(frame, glyphs, [32.0, 28.0], 28.0, "rack studio", TEXT);
            let status = format!("{hz:.1} Hz   {fps:.0} fps\nmove the mouse to retune, esc quits");
            push_text(frame, glyphs, [32.0, h - 80.0], 18.0, &status, TEXT);
        }
    }
}

impl App for Studio {
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::Resized(size) => self.surface_width = size.width as f32,
            WindowEvent::CursorMoved { position, .. } if self.surface_width > 0.0 => {
                let x = (position.x as f32 / self.surface_width).clamp(0.0, 1.0);
                self.frequency.set(MIN_HZ * (x * OCTAVES).exp2());
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                return AppControl::Exit;
            }
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.elapsed += ctx.time.dt;
        self.build_scene(ctx.window.viewport(), ctx.time.fps);

        if ctx.time.frame_index % 120 == 0 {
            ctx.runtime.set_title(format!("rack studio - {:.0} fps", ctx.time.fps));
        }

        let Self {
            renderer,
            frame,
            glyphs,
            atlas_uploaded,
            ..
        } = self;
        let out = frame.finish();

        ctx.render(|rctx, target| {
            if !*atlas_uploaded {
                if let Some(glyphs) = glyphs.as_ref() {
                    if let Err(err) = renderer.set_atlas(rctx, glyphs.atlas()) {
                        log::error!("atlas upload failed: {err}");
                    }
                }
                *atlas_uploaded = true;
            }

            if let Err(err) = renderer.render_frame(rctx, &out, target) {
                log::error!("frame dropped: {err}");
            }
        })
    }

    fn on_exit(&mut self) {
        if let Some(mut audio) = self.audio.take() {
            audio.shutdown();
        }
    }
}
