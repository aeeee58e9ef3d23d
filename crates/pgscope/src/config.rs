//! Connector configuration.

use tracing::Level;

/// Debug logging settings for a [`Connector`](crate::Connector).
///
/// ```ignore
/// let config = ConnectorConfig::new().debug(true).level(Level::INFO).no_truncate();
/// let connector = Connector::with_config(executor, config);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Emit one timing event per dispatched statement.
    pub debug: bool,
    /// Tracing event level of the timing event.
    pub level: Level,
    /// Truncate logged SQL (in bytes, on a char boundary). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl ConnectorConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable per-statement timing events.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn display_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

fn truncate_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
