//! Wiring between the UI surfaces and the coordinator.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::bus::Bus;
use crate::config::{EditorPreferences, LensConfig};
use crate::coordinator::{FilterCoordinator, FilterDispatch};
use crate::surface::{
    CursorPosition, EditorEvent, EditorSurface, FilterInputEvent, FilterInputSurface, InputOrigin,
};

pub const EDITOR_MODE: &str = "application/json";

/// Reacts to editor and filter-input notifications one at a time.
///
/// Receivers are taken at construction so notifications fired before
/// [`Workbench::run_until`] starts are still handled.
pub struct Workbench {
    editor: Arc<dyn EditorSurface>,
    coordinator: Arc<FilterCoordinator>,
    preferences: EditorPreferences,
    editor_events: broadcast::Receiver<EditorEvent>,
    filter_events: broadcast::Receiver<FilterInputEvent>,
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

impl Workbench {
    pub fn new(
        editor: Arc<dyn EditorSurface>,
        filter_input: Arc<dyn FilterInputSurface>,
        bus: Bus,
        config: &LensConfig,
    ) -> Self {
        let coordinator =
            FilterCoordinator::new(editor.clone(), filter_input.clone(), bus, config);
        Self::with_coordinator(
            editor,
            filter_input.as_ref(),
            Arc::new(coordinator),
            config.editor.clone(),
        )
    }

    pub fn with_coordinator(
        editor: Arc<dyn EditorSurface>,
        filter_input: &dyn FilterInputSurface,
        coordinator: Arc<FilterCoordinator>,
        preferences: EditorPreferences,
    ) -> Self {
        Self {
            editor_events: editor.subscribe(),
            filter_events: filter_input.subscribe(),
            editor,
            coordinator,
            preferences,
        }
    }

    pub fn coordinator(&self) -> &Arc<FilterCoordinator> {
        &self.coordinator
    }

    /// Configure the editor, seed it with the welcome text when it is empty,
    /// and validate whatever it holds.
    pub fn setup(&self) {
        self.editor.set_option("mode", json!(EDITOR_MODE));
        self.editor
            .set_option("theme", json!(self.preferences.theme));
        self.editor
            .set_option("lineNumbers", json!(self.preferences.line_numbers));
        self.editor
            .set_option("tabSize", json!(self.preferences.tab_size));
        self.editor
            .set_option("lineWrapping", json!(self.preferences.line_wrapping));

        if self.editor.get_value().is_empty() && !self.preferences.welcome_text.is_empty() {
            self.editor.set_value(&self.preferences.welcome_text);
            self.editor.set_cursor(CursorPosition::default());
        }
        self.coordinator.validate();
    }

    pub fn set_theme(&mut self, theme: &str) {
        self.preferences.theme = theme.to_string();
        self.editor.set_option("theme", json!(theme));
    }

    pub fn handle_editor_event(&self, event: &EditorEvent) {
        match event {
            EditorEvent::Change => {
                self.coordinator.validate();
            }
            EditorEvent::InputRead {
                origin: InputOrigin::Paste,
            } => {
                if self.coordinator.validate() {
                    self.coordinator.format_input();
                }
            }
            EditorEvent::InputRead { .. } => {}
        }
    }

    pub fn handle_filter_event(&self, event: FilterInputEvent) -> FilterDispatch {
        match event {
            FilterInputEvent::KeyUp => self.coordinator.run_filter(),
        }
    }

    /// Process notifications until `shutdown` resolves or both surfaces stop
    /// sending.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut editor_open = true;
        let mut filter_open = true;

        while editor_open || filter_open {
            tokio::select! {
                _ = &mut shutdown => break,
                event = self.editor_events.recv(), if editor_open => match event {
                    Ok(event) => self.handle_editor_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("editor events lagged by {skipped}, revalidating");
                        self.coordinator.validate();
                    }
                    Err(RecvError::Closed) => editor_open = false,
                },
                event = self.filter_events.recv(), if filter_open => match event {
                    Ok(event) => {
                        self.handle_filter_event(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("filter events lagged by {skipped}, rerunning filter");
                        self.coordinator.run_filter();
                    }
                    Err(RecvError::Closed) => filter_open = false,
                },
            }
        }
        tracing::debug!("workbench stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_WELCOME_TEXT;
    use crate::document::format_document;
    use crate::event::{EvaluatorKind, LensEvent};
    use crate::surface::{MemoryEditor, MemoryFilterInput};
    use tokio::time::{timeout, Duration};

    struct Fixture {
        editor: Arc<MemoryEditor>,
        filter: Arc<MemoryFilterInput>,
        events: broadcast::Receiver<LensEvent>,
        workbench: Workbench,
    }

    fn fixture() -> Fixture {
        let editor = Arc::new(MemoryEditor::new());
        let filter = Arc::new(MemoryFilterInput::new());
        let bus = Bus::new(64);
        let events = bus.subscribe();
        let workbench = Workbench::new(
            editor.clone(),
            filter.clone(),
            bus,
            &LensConfig::default(),
        );
        Fixture {
            editor,
            filter,
            events,
            workbench,
        }
    }

    fn drain(rx: &mut broadcast::Receiver<LensEvent>) -> Vec<LensEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn next_matching(
        rx: &mut broadcast::Receiver<LensEvent>,
        predicate: impl Fn(&LensEvent) -> bool,
    ) -> LensEvent {
        timeout(Duration::from_secs(2), async {
            loop {
                let event = rx.recv().await.expect("bus open");
                if predicate(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[test]
    fn setup_configures_editor_and_seeds_welcome_text() {
        let mut f = fixture();
        f.workbench.setup();

        assert_eq!(f.editor.option("mode"), Some(json!(EDITOR_MODE)));
        assert_eq!(f.editor.option("theme"), Some(json!("default")));
        assert_eq!(f.editor.option("lineNumbers"), Some(json!(true)));
        assert_eq!(f.editor.option("tabSize"), Some(json!(2)));
        assert_eq!(f.editor.option("lineWrapping"), Some(json!(false)));
        assert_eq!(f.editor.get_value(), DEFAULT_WELCOME_TEXT);
        assert_eq!(f.editor.cursor(), CursorPosition::default());

        assert_eq!(drain(&mut f.events), vec![LensEvent::InputValid]);
        let document = f.workbench.coordinator().document().expect("document");
        assert_eq!(document["greeting"], json!("hello"));
    }

    #[test]
    fn setup_keeps_existing_content() {
        let f = fixture();
        f.editor.set_value("[1]");
        f.workbench.setup();
        assert_eq!(f.editor.get_value(), "[1]");
        assert_eq!(f.workbench.coordinator().document(), Some(json!([1])));
    }

    #[test]
    fn set_theme_updates_editor_option() {
        let mut f = fixture();
        f.workbench.set_theme("monokai");
        assert_eq!(f.editor.option("theme"), Some(json!("monokai")));
    }

    #[test]
    fn change_revalidates() {
        let mut f = fixture();
        f.editor.set_value(r#"{"a": 1}"#);
        f.workbench.handle_editor_event(&EditorEvent::Change);
        assert_eq!(f.workbench.coordinator().document(), Some(json!({ "a": 1 })));

        f.editor.set_value(r#"{"a": "#);
        f.workbench.handle_editor_event(&EditorEvent::Change);
        assert_eq!(f.workbench.coordinator().document(), None);
        assert_eq!(drain(&mut f.events), vec![LensEvent::InputValid]);
    }

    #[test]
    fn paste_validates_then_formats_once() {
        let mut f = fixture();
        let pasted = "{b: 1, /* note */ a: [true,],}";
        f.editor.paste(pasted);
        let mut editor_events = f.editor.subscribe();

        f.workbench.handle_editor_event(&EditorEvent::InputRead {
            origin: InputOrigin::Paste,
        });

        let expected = format_document(&json!({ "b": 1, "a": [true] }), 2).expect("format");
        assert_eq!(f.editor.get_value(), expected);
        assert_eq!(drain(&mut f.events), vec![LensEvent::InputValid]);
        assert_eq!(editor_events.try_recv().expect("change"), EditorEvent::Change);
        assert!(editor_events.try_recv().is_err(), "exactly one rewrite");
    }

    #[test]
    fn invalid_paste_is_left_alone() {
        let mut f = fixture();
        f.editor.paste("{ half");
        f.workbench.handle_editor_event(&EditorEvent::InputRead {
            origin: InputOrigin::Paste,
        });
        assert_eq!(f.editor.get_value(), "{ half");
        assert!(drain(&mut f.events).is_empty());
    }

    #[test]
    fn typed_input_does_not_format() {
        let mut f = fixture();
        f.editor.set_value("{\"a\":1}");
        f.workbench.handle_editor_event(&EditorEvent::InputRead {
            origin: InputOrigin::Input,
        });
        assert_eq!(f.editor.get_value(), "{\"a\":1}");
        assert!(drain(&mut f.events).is_empty());
    }

    #[tokio::test]
    async fn key_up_runs_the_filter() {
        let mut f = fixture();
        f.editor.set_value(r#"{"a": {"b": [1, 2, 3]}}"#);
        f.workbench.handle_editor_event(&EditorEvent::Change);
        drain(&mut f.events);

        f.filter.set(".a.b[1]");
        f.workbench
            .handle_filter_event(FilterInputEvent::KeyUp)
            .finished()
            .await;

        let events = drain(&mut f.events);
        assert_eq!(events.len(), 1);
        match &events[0] {
            LensEvent::FilterValid { result, kind, .. } => {
                assert_eq!(result.as_f64(), Some(2.0));
                assert_eq!(*kind, EvaluatorKind::Expression);
            }
            other => panic!("expected FilterValid, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn event_loop_drives_the_pipeline() {
        let Fixture {
            editor,
            filter,
            mut events,
            workbench,
        } = fixture();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(workbench.run_until(async move {
            let _ = stopped.await;
        }));

        editor.paste(r#"{"items": [3, 4]}"#);
        next_matching(&mut events, |event| *event == LensEvent::InputValid).await;
        assert!(editor.get_value().contains("\n  \"items\": ["));

        filter.type_text(".items[1]");
        let outcome = next_matching(&mut events, LensEvent::is_filter_outcome).await;
        match outcome {
            LensEvent::FilterValid { result, .. } => assert_eq!(result.as_f64(), Some(4.0)),
            other => panic!("expected FilterValid, got {other:?}"),
        }

        filter.type_text("");
        let outcome = next_matching(&mut events, LensEvent::is_filter_outcome).await;
        assert!(matches!(outcome, LensEvent::FilterEmpty { .. }));

        let _ = stop.send(());
        timeout(Duration::from_secs(2), task)
            .await
            .expect("workbench stops")
            .expect("workbench task");
    }
}
