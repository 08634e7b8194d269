//! Prism demo application.
//!
//! Opens a 1280x720 window and renders a colored, textured quad. The texture
//! is loaded from `texture.png` in the working directory, falling back to a
//! generated checkerboard when the file is missing.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use std::sync::Arc;

use raw_window_handle::HasDisplayHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use prism_render::{Renderer, TextureData};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const TEXTURE_PATH: &str = "texture.png";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Prism demo starting...");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp {
        state: None,
        init_failed: false,
        render_failed: false,
    };
    event_loop.run_app(&mut app)?;

    if app.init_failed {
        anyhow::bail!("renderer initialization failed");
    }
    if app.render_failed {
        anyhow::bail!("renderer stopped after an unrecoverable error");
    }
    Ok(())
}

struct DemoApp {
    state: Option<DemoState>,
    init_failed: bool,
    render_failed: bool,
}

struct DemoState {
    window: Arc<Window>,
    renderer: Renderer,
}

impl DemoApp {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<DemoState> {
        let window_attrs = Window::default_attributes()
            .with_title("Prism Demo")
            .with_inner_size(PhysicalSize::new(WIDTH, HEIGHT));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let display = window.display_handle()?;
        let required_extensions = ash_window::enumerate_required_extensions(display.as_raw())?;

        let texture = load_texture();

        let size = window.inner_size();
        let renderer = unsafe {
            Renderer::new(
                window.as_ref(),
                "Prism Demo",
                required_extensions,
                size.width,
                size.height,
                &texture,
            )?
        };

        Ok(DemoState { window, renderer })
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                info!("renderer ready");
                self.state = Some(state);
            }
            Err(e) => {
                eprintln!("fatal: {e:#}");
                self.init_failed = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested");
                if let Some(mut state) = self.state.take() {
                    unsafe { state.renderer.destroy() };
                }
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = &mut self.state else { return };
                match unsafe { state.renderer.draw_frame() } {
                    Ok(()) => state.window.request_redraw(),
                    // An unrecoverable error means dangling renderer state;
                    // stop drawing, tear down, and exit non-zero.
                    Err(e) if e.is_fatal() => {
                        error!("unrecoverable render error: {e}");
                        if let Some(mut state) = self.state.take() {
                            unsafe { state.renderer.destroy() };
                        }
                        self.render_failed = true;
                        event_loop.exit();
                    }
                    Err(e) => {
                        error!("render error: {e}");
                        state.window.request_redraw();
                    }
                }
            }
            WindowEvent::Resized(size) => {
                // Zero-sized surfaces (minimized window) are skipped; drawing
                // resumes at the next real size.
                if size.width > 0 && size.height > 0 {
                    if let Some(state) = &mut self.state {
                        state.renderer.note_resized(size.width, size.height);
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

fn load_texture() -> TextureData {
    match image::open(TEXTURE_PATH) {
        Ok(img) => {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            info!(path = TEXTURE_PATH, width, height, "texture loaded");
            TextureData {
                width,
                height,
                pixels: rgba.into_raw(),
            }
        }
        Err(e) => {
            warn!(path = TEXTURE_PATH, "texture not loaded ({e}), using checkerboard");
            TextureData::checkerboard(64)
        }
    }
}
