use winit::event::WindowEvent;

use super::ctx::FrameCtx;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Implemented by the application driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Every window event is forwarded here before the runtime handles
    /// resize and close itself.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called once when the event loop is about to exit.
    fn on_exit(&mut self) {}
}
