/// # Events
/// Notification sink for the two exceptional conditions the machine reports
/// instead of failing. Calls are fire-and-forget; the machine never reads
/// anything back.
pub trait Events {
    /// `00EE` was executed with an empty call stack
    fn on_stack_underflow(&mut self) {}

    /// An instruction tried to write below `PROGRAM_START`
    ///
    /// # Arguments
    /// * `addr` the rejected address
    fn on_out_of_range_write(&mut self, _addr: u16) {}
}

/// Sink that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl Events for NullEvents {}
