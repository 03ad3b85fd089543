use crate::element::HostElement;
use crate::interceptor::ElementStream;

/// Page controls the lifecycle polls for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Control {
    Play,
    Start,
    Continue,
    Claim,
}

/// The page the clicker runs inside.
///
/// A missing control is a normal answer, not an error: the polling loops
/// simply ask again later.
pub trait Host {
    type Element: HostElement + 'static;

    /// Whether the root container mutation observation hangs off exists.
    fn has_root(&self) -> bool {
        true
    }

    /// True while the reward/result view is showing.
    fn round_over_visible(&self) -> bool;

    fn is_actionable(&self, control: Control) -> bool;

    /// Press `control`; false when it was not there to press.
    fn press(&mut self, control: Control) -> bool;

    /// Live collection the game appends spawned elements to.
    fn element_stream(&mut self) -> Option<&mut ElementStream<Self::Element>>;
}
