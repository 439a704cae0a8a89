//! Window management using GLFW
//!
//! Drives the demo frame loop. The window has no client API; rendering
//! into it is left to the consumer.

use crate::config::WindowConfig;
use thiserror::Error;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// `glfw::init` failed
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created
    #[error("Window creation failed")]
    CreationFailed,
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper with proper resource management
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl Window {
    /// Open a window with the given title and size
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|_| WindowError::InitializationFailed)?;

        // Configure for Vulkan (no OpenGL context)
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(true));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);

        log::info!("Opened {}x{} window '{}'", width, height, title);

        Ok(Self {
            glfw,
            window,
            events,
        })
    }

    /// Open a window from settings
    pub fn from_config(config: &WindowConfig) -> WindowResult<Self> {
        Self::new(&config.title, config.width, config.height)
    }

    /// Whether a close was requested
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Pump the event queue
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Drain queued events
    pub fn flush_events(&self) -> glfw::FlushedMessages<'_, (f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Request or cancel closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Seconds since GLFW was initialized
    pub fn time(&self) -> f64 {
        self.glfw.get_time()
    }

    /// Poll events and close on Escape
    ///
    /// Returns `false` once the window should close.
    pub fn pump(&mut self) -> bool {
        self.poll_events();
        let mut close = false;
        for (_, event) in self.flush_events() {
            if let glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) = event {
                close = true;
            }
        }
        if close {
            self.set_should_close(true);
        }
        !self.should_close()
    }
}
