use vellum_content::MessageContent;

use super::View;
use super::error::ViewError;
use super::frame::{Frame, Handler};

/// Handlers of the committed render plus at most one staged render.
///
/// Staging bumps the generation; the staged table only replaces the
/// committed one once the frame reached the remote side. Ids minted by any
/// other generation are rejected.
pub struct HandlerArena<V: View> {
    generation: u64,
    handlers: Vec<Option<Handler<V>>>,
    staged: Option<(u64, Vec<Option<Handler<V>>>)>,
}

impl<V: View> Default for HandlerArena<V> {
    fn default() -> Self {
        Self::at(0)
    }
}

impl<V: View> HandlerArena<V> {
    pub fn at(generation: u64) -> Self {
        Self {
            generation,
            handlers: Vec::new(),
            staged: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Lower `frame` under the next generation and stage its handlers.
    pub fn stage(&mut self, frame: Frame<V>) -> MessageContent {
        let generation = self.generation + 1;
        let (content, handlers) = frame.lower(generation);
        self.staged = Some((generation, handlers));
        content
    }

    /// Promote the staged table. Returns `false` if nothing was staged.
    pub fn promote(&mut self) -> bool {
        match self.staged.take() {
            Some((generation, handlers)) => {
                self.generation = generation;
                self.handlers = handlers;
                true
            }
            None => false,
        }
    }

    /// Lower `frame` under the current generation and install it directly.
    ///
    /// Used after rehydration: the remote message still carries ids from the
    /// persisted generation, so they must keep resolving.
    pub fn arm(&mut self, frame: Frame<V>) -> MessageContent {
        let (content, handlers) = frame.lower(self.generation);
        self.handlers = handlers;
        self.staged = None;
        content
    }

    /// Find the handler for `control_id`. `Ok(None)` is a control rendered
    /// without a handler.
    pub fn lookup(&self, control_id: &str) -> Result<Option<Handler<V>>, ViewError> {
        let (generation, index) = parse_control_id(control_id)?;
        if generation != self.generation {
            return Err(ViewError::StaleControl {
                control_id: control_id.to_string(),
                found: generation,
                current: self.generation,
            });
        }
        match self.handlers.get(index) {
            Some(handler) => Ok(handler.clone()),
            None => Err(ViewError::UnknownControl {
                control_id: control_id.to_string(),
            }),
        }
    }
}

fn parse_control_id(control_id: &str) -> Result<(u64, usize), ViewError> {
    let invalid = || ViewError::InvalidControlId {
        control_id: control_id.to_string(),
    };
    let (generation, index) = control_id.split_once(':').ok_or_else(invalid)?;
    let generation = generation.parse().map_err(|_| invalid())?;
    let index = index.parse().map_err(|_| invalid())?;
    Ok((generation, index))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use vellum_content::Component;

    use super::*;
    use crate::view::{Button, HandlerOutcome, Row};

    #[derive(Serialize, Deserialize)]
    struct Probe;

    #[async_trait::async_trait]
    impl View for Probe {
        type State = ();
        const TYPE_ID: &'static str = "test.arena";

        fn initial_state(&self) -> Self::State {}

        async fn render(&self, _state: &()) -> Result<Frame<Self>, ViewError> {
            Ok(frame())
        }
    }

    fn frame() -> Frame<Probe> {
        Frame::new()
            .row(
                Row::new()
                    .button(Button::new("a").on_click(|_| async { Ok(HandlerOutcome::Unchanged) }))
                    .link("docs", "https://example.com")
                    .button(Button::new("b")),
            )
            .row(Row::new().button(Button::new("c").on_click(|_| async { Ok(HandlerOutcome::Unchanged) })))
    }

    #[test]
    fn ids_are_row_major_and_skip_links() {
        let mut arena = HandlerArena::<Probe>::default();
        let content = arena.stage(frame());
        let ids: Vec<_> = content
            .components_flat()
            .map(|component| component.custom_id().map(str::to_string))
            .collect();
        assert_eq!(
            ids,
            vec![Some("1:0".into()), None, Some("1:1".into()), Some("1:2".into())]
        );
        assert!(matches!(content.components[0].components[1], Component::Button { url: Some(_), .. }));
    }

    #[test]
    fn staged_ids_resolve_only_after_promotion() {
        let mut arena = HandlerArena::<Probe>::default();
        arena.stage(frame());
        assert!(matches!(
            arena.lookup("1:0"),
            Err(ViewError::StaleControl { found: 1, current: 0, .. })
        ));

        assert!(arena.promote());
        assert!(arena.lookup("1:0").unwrap().is_some());
        assert!(arena.lookup("1:1").unwrap().is_none());
        assert!(matches!(arena.lookup("1:9"), Err(ViewError::UnknownControl { .. })));
    }

    #[test]
    fn new_render_invalidates_old_ids() {
        let mut arena = HandlerArena::<Probe>::default();
        arena.stage(frame());
        arena.promote();
        arena.stage(frame());
        arena.promote();

        assert_eq!(arena.generation(), 2);
        assert!(matches!(arena.lookup("1:0"), Err(ViewError::StaleControl { .. })));
        assert!(arena.lookup("2:0").is_ok());
    }

    #[test]
    fn arm_keeps_generation() {
        let mut arena = HandlerArena::<Probe>::at(7);
        let content = arena.arm(frame());
        assert_eq!(content.components[0].components[0].custom_id(), Some("7:0"));
        assert!(arena.lookup("7:2").unwrap().is_some());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let arena = HandlerArena::<Probe>::default();
        for id in ["", "0", "x:1", "0:y", "0:1:2"] {
            assert!(
                matches!(arena.lookup(id), Err(ViewError::InvalidControlId { .. })),
                "{id} should be invalid"
            );
        }
    }
}
