#![allow(dead_code)]

use pgscope::{ConnectorResult, ParameterSet, Record, SqlExecutor, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// In-memory executor that records every statement and replays queued answers.
///
/// With no queued answer a statement returns no rows.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<(String, ParameterSet)>>,
    answers: Mutex<VecDeque<ConnectorResult<Vec<Record>>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the rows for the next statement.
    pub fn answer(self, rows: Vec<Record>) -> Self {
        self.answers.lock().unwrap().push_back(Ok(rows));
        self
    }

    /// Queue a failure for the next statement.
    pub fn fail(self, err: pgscope::ConnectorError) -> Self {
        self.answers.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> Vec<(String, ParameterSet)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(sql, _)| sql.clone())
    }
}

impl SqlExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str, params: &ParameterSet) -> ConnectorResult<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), params.clone()));
        let answer = self.answers.lock().unwrap().pop_front();
        answer.unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Record {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// One tracing event seen by [`CapturedEvents`], with every field rendered to text.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn message(&self) -> &str {
        self.field("message").unwrap_or_default()
    }
}

/// Layer that keeps every event it sees.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedEvents {
    pub fn all(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_target(&self, target: &str) -> Vec<CapturedEvent> {
        self.all().into_iter().filter(|e| e.target == target).collect()
    }
}

struct FieldText<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldText<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldText(&mut fields));
        self.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
        });
    }
}

/// Capture events on the current thread until the guard drops.
///
/// `#[tokio::test]` runs on a current-thread runtime, so events from the
/// connector under test land here.
pub fn capture_events() -> (CapturedEvents, tracing::subscriber::DefaultGuard) {
    let events = CapturedEvents::default();
    let subscriber = tracing_subscriber::registry().with(events.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (events, guard)
}
