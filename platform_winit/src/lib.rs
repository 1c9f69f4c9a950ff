#![forbid(unsafe_code)]

use thiserror::Error;

pub use winit::dpi::PhysicalSize;
pub use winit::event::{Event, WindowEvent};
pub use winit::event_loop::{ControlFlow, EventLoop};
pub use winit::window::Window;

#[derive(Debug, Error)]
pub enum WindowInitError {
    #[error("event loop initialization failed: {0}")]
    EventLoop(String),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
}

/// Initial geometry of the main window, in physical pixels.
#[derive(Clone, Debug)]
pub struct WindowSpec {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
}

impl WindowSpec {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            min_width: width / 2,
            min_height: height / 2,
        }
    }

    pub fn with_min_size(mut self, min_width: u32, min_height: u32) -> Self {
        self.min_width = min_width.min(self.width);
        self.min_height = min_height.min(self.height);
        self
    }
}

/// The window starts hidden; callers show it once the first frame can be drawn.
pub fn create_window(spec: &WindowSpec) -> Result<(EventLoop<()>, Window), WindowInitError> {
    let event_loop = EventLoop::new().map_err(|err| WindowInitError::EventLoop(err.to_string()))?;
    let window = winit::window::WindowBuilder::new()
        .with_title(spec.title.as_str())
        .with_inner_size(PhysicalSize::new(spec.width, spec.height))
        .with_min_inner_size(PhysicalSize::new(spec.min_width, spec.min_height))
        .with_visible(false)
        .build(&event_loop)?;
    Ok((event_loop, window))
}
