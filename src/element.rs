use std::fmt;
use std::time::Duration;

/// What a spawned object is, as far as the clicker cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ElementKind {
    Flower,
    Bomb,
    Ice,
    Other,
}

impl ElementKind {
    /// Map the host's raw type tag onto a kind. Unknown tags become `Other`.
    pub fn from_discriminant(raw: &str) -> Self {
        match raw {
            "CLOVER" | "FLOWER" => ElementKind::Flower,
            "BOMB" => ElementKind::Bomb,
            "FREEZE" | "ICE" => ElementKind::Ice,
            _ => ElementKind::Other,
        }
    }
}

/// A game object owned by the host page.
///
/// The clicker only reads the type tag, fires the click action and leaves
/// the consumed marker the host uses for its explosion animation.
pub trait HostElement {
    fn discriminant(&self) -> Option<&str>;
    fn has_action(&self) -> bool;
    fn trigger(&mut self);
    fn mark_consumed(&mut self, at: Duration);

    /// `None` when the element is missing its tag or its action.
    fn classify(&self) -> Option<ElementKind> {
        if !self.has_action() {
            return None;
        }
        self.discriminant().map(ElementKind::from_discriminant)
    }
}

pub type ClickAction = Box<dyn FnMut()>;

/// Plain element used by the simulated host and in tests
pub struct SpawnedElement {
    pub kind: Option<String>,
    on_click: Option<ClickAction>,
    pub consumed_at: Option<Duration>,
}

impl SpawnedElement {
    pub fn new(kind: impl Into<String>, on_click: impl FnMut() + 'static) -> Self {
        Self {
            kind: Some(kind.into()),
            on_click: Some(Box::new(on_click)),
            consumed_at: None,
        }
    }

    /// Tagged element without a click action.
    pub fn inert(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            on_click: None,
            consumed_at: None,
        }
    }

    /// Clickable element without a type tag.
    pub fn untagged(on_click: impl FnMut() + 'static) -> Self {
        Self {
            kind: None,
            on_click: Some(Box::new(on_click)),
            consumed_at: None,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

impl fmt::Debug for SpawnedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnedElement")
            .field("kind", &self.kind)
            .field("has_action", &self.on_click.is_some())
            .field("consumed_at", &self.consumed_at)
            .finish()
    }
}

impl HostElement for SpawnedElement {
    fn discriminant(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    fn has_action(&self) -> bool {
        self.on_click.is_some()
    }

    fn trigger(&mut self) {
        if let Some(action) = self.on_click.as_mut() {
            action();
        }
    }

    fn mark_consumed(&mut self, at: Duration) {
        self.consumed_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn host_tags_map_to_kinds() {
        assert_eq!(ElementKind::from_discriminant("CLOVER"), ElementKind::Flower);
        assert_eq!(ElementKind::from_discriminant("BOMB"), ElementKind::Bomb);
        assert_eq!(ElementKind::from_discriminant("FREEZE"), ElementKind::Ice);
        assert_eq!(ElementKind::from_discriminant("DOGS"), ElementKind::Other);
        assert_eq!(ElementKind::Ice.to_string(), "ICE");
    }

    #[test]
    fn malformed_elements_do_not_classify() {
        assert_eq!(SpawnedElement::inert("BOMB").classify(), None);
        assert_eq!(SpawnedElement::untagged(|| {}).classify(), None);
        assert_eq!(SpawnedElement::new("CLOVER", || {}).classify(), Some(ElementKind::Flower));
    }

    #[test]
    fn trigger_runs_action() {
        let clicks = Rc::new(Cell::new(0));
        let c = clicks.clone();
        let mut el = SpawnedElement::new("BOMB", move || c.set(c.get() + 1));
        el.trigger();
        el.trigger();
        assert_eq!(clicks.get(), 2);
        assert!(!el.is_consumed());
        el.mark_consumed(Duration::from_millis(40));
        assert_eq!(el.consumed_at, Some(Duration::from_millis(40)));
    }
}
