//! Tracing layer that writes events to the browser console.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;
use wasm_bindgen::JsValue;
use web_sys::console;

/// Routes events at or above `max_level` to `console.*`.
pub(crate) struct ConsoleLayer {
    max_level: Level,
}

impl ConsoleLayer {
    pub(crate) const fn new(max_level: Level) -> Self {
        Self { max_level }
    }
}

/// Message plus structured fields of one event.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

impl EventVisitor {
    fn render(&self, target: &str) -> String {
        let mut line = format!("[{target}] {}", self.message.as_deref().unwrap_or(""));
        for (name, value) in &self.fields {
            let _ = write!(line, " {name}={value}");
        }
        line
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // TRACE > DEBUG > INFO > WARN > ERROR in tracing's ordering
        if *metadata.level() > self.max_level {
            return;
        }
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let line = JsValue::from_str(&visitor.render(metadata.target()));
        match *metadata.level() {
            Level::ERROR => console::error_1(&line),
            Level::WARN => console::warn_1(&line),
            Level::INFO => console::info_1(&line),
            _ => console::debug_1(&line),
        }
    }
}

/// Install the console layer as the global subscriber, unless the page
/// already set one.
pub(crate) fn install(max_level: Level) {
    let subscriber = tracing_subscriber::registry().with(ConsoleLayer::new(max_level));
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        console::debug_1(&JsValue::from_str(
            "[wipe_reveal] global tracing subscriber already set",
        ));
    }
}
