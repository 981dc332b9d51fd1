//! Playback notifications.
//!
//! A minimal named-callback registry. Handlers are fired synchronously from
//! inside the render tick, so they must return quickly: a blocking handler
//! stalls audio output.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Events raised by the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerEvent {
    /// The module finished playing.
    Ended,
    /// The decoder failed mid-stream.
    Error,
    /// Playback moved to a different pattern.
    PatternChange,
    /// Fired once per rendered tick with the current row.
    RowChange,
}

impl PlayerEvent {
    /// All events, in declaration order.
    pub const ALL: [PlayerEvent; 4] = [
        PlayerEvent::Ended,
        PlayerEvent::Error,
        PlayerEvent::PatternChange,
        PlayerEvent::RowChange,
    ];

    /// Handler name for this event.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Ended => "onEnded",
            PlayerEvent::Error => "onError",
            PlayerEvent::PatternChange => "onPatternChange",
            PlayerEvent::RowChange => "onRowChange",
        }
    }

    /// Look up an event by handler name.
    pub fn from_name(name: &str) -> Option<Self> {
        PlayerEvent::ALL.into_iter().find(|event| event.name() == name)
    }
}

impl FromStr for PlayerEvent {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        PlayerEvent::from_name(name).ok_or_else(|| format!("unknown event '{name}'"))
    }
}

impl fmt::Display for PlayerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload passed to handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventContext {
    /// Row index for `onRowChange`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i32>,
    /// Failure tag for `onError`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl EventContext {
    /// Payload carrying a row index.
    pub fn row(index: i32) -> Self {
        Self {
            index: Some(index),
            kind: None,
        }
    }

    /// Payload carrying a failure tag.
    pub fn error(kind: impl Into<String>) -> Self {
        Self {
            index: None,
            kind: Some(kind.into()),
        }
    }
}

/// Event handler callback.
pub type Handler = Box<dyn FnMut(Option<&EventContext>) + Send>;

/// Ordered, append-only list of named handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<(String, Handler)>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `name`.
    ///
    /// Duplicates are kept and all of them fire. Names that match no
    /// [`PlayerEvent`] are accepted and simply never fire.
    pub fn add_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(Option<&EventContext>) + Send + 'static,
    {
        self.handlers.push((name.into(), Box::new(handler)));
    }

    /// Invoke every handler registered under `name`, in registration order.
    /// Returns how many handlers ran.
    pub fn fire_event(&mut self, name: &str, context: Option<&EventContext>) -> usize {
        let mut fired = 0;
        for (handler_name, handler) in self.handlers.iter_mut() {
            if handler_name == name {
                handler(context);
                fired += 1;
            }
        }
        fired
    }

    /// Fire a typed event.
    pub fn fire(&mut self, event: PlayerEvent, context: Option<&EventContext>) -> usize {
        self.fire_event(event.name(), context)
    }

    /// Remove all handlers.
    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|(name, _)| name))
            .finish()
    }
}
