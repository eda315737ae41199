use padtree_core::{ButtonSet, Savestate};

/// The capabilities the agent needs from the emulated machine it is playing
/// on. One implementation is bound per agent; all calls are strictly
/// sequential because the underlying machine is stateful and non-reentrant.
///
/// Restores must be deterministic: after `load_state`, replaying the same
/// inputs must reproduce the same memory, frame for frame.
pub trait Environment {
    /// The current work RAM contents. The slice has a fixed, console-specific
    /// size for the lifetime of the environment.
    fn memory(&self) -> &[u8];

    /// Serialize the full machine state into an opaque blob.
    fn save_state(&mut self) -> Savestate;

    /// Restore a blob previously produced by `save_state` on this machine.
    fn load_state(&mut self, state: &Savestate);

    /// Hold `input` for exactly one frame and advance the machine by it.
    fn apply_input(&mut self, input: ButtonSet);
}

/// Optional collaborator that persists playback runs as a movie. Recording is
/// expected to rewind the machine to power-on when it starts, so a recorded
/// run replays the whole session from the beginning.
pub trait MovieRecorder {
    fn start_recording(&mut self);
    fn finish_recording(&mut self);
}
