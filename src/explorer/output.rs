//! Per-server output channels.
//!
//! The UI supplies an [`OutputWindow`] that knows how to create sinks; the
//! [`OutputMultiplexer`] owns every sink it creates and is the only place
//! that creates or disposes them.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A text sink shown to the user, one per server.
pub trait OutputChannel: Send {
    /// Appends text verbatim.
    fn append(&mut self, text: &str);

    /// Appends text followed by a newline.
    fn append_line(&mut self, text: &str) {
        self.append(text);
        self.append("\n");
    }

    /// Drops everything written so far.
    fn clear(&mut self);

    /// Brings the channel to the foreground.
    fn show(&mut self);

    /// Releases the channel. No other method is called afterwards.
    fn dispose(&mut self);
}

/// Factory for output channels.
pub trait OutputWindow: Send + Sync {
    fn create_channel(&self, name: &str) -> Box<dyn OutputChannel>;
}

/// Name of the output channel of a managed server.
pub fn server_channel_name(server_id: &str) -> String {
    format!("Server: {}", server_id)
}

/// Routes server output text to lazily created per-server channels.
pub struct OutputMultiplexer {
    window: Arc<dyn OutputWindow>,
    channels: HashMap<String, Box<dyn OutputChannel>>,
    show_on_output: bool,
}

impl OutputMultiplexer {
    pub fn new(window: Arc<dyn OutputWindow>, show_on_output: bool) -> Self {
        Self {
            window,
            channels: HashMap::new(),
            show_on_output,
        }
    }

    /// Appends `text` to the channel of `server_id`, creating it if needed.
    ///
    /// Callers are responsible for only routing output of registered servers
    /// here.
    pub fn append(&mut self, server_id: &str, text: &str) {
        let window = &self.window;
        let channel = self
            .channels
            .entry(server_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(server_id = %server_id, "Creating output channel");
                window.create_channel(&server_channel_name(server_id))
            });
        channel.append(text);
        if self.show_on_output {
            channel.show();
        }
    }

    /// Shows the channel of `server_id` if there is one.
    pub fn show(&mut self, server_id: &str) -> bool {
        match self.channels.get_mut(server_id) {
            Some(channel) => {
                channel.show();
                true
            }
            None => false,
        }
    }

    /// Clears the channel of `server_id` if there is one.
    pub fn clear(&mut self, server_id: &str) -> bool {
        match self.channels.get_mut(server_id) {
            Some(channel) => {
                channel.clear();
                true
            }
            None => false,
        }
    }

    /// Clears and disposes the channel of `server_id`.
    pub fn dispose(&mut self, server_id: &str) -> bool {
        match self.channels.remove(server_id) {
            Some(mut channel) => {
                channel.clear();
                channel.dispose();
                true
            }
            None => false,
        }
    }

    /// Disposes every channel.
    pub fn dispose_all(&mut self) {
        for (server_id, mut channel) in self.channels.drain() {
            tracing::debug!(server_id = %server_id, "Disposing output channel");
            channel.dispose();
        }
    }

    pub fn has_channel(&self, server_id: &str) -> bool {
        self.channels.contains_key(server_id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Snapshot of a channel created by [`InMemoryOutputWindow`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRecord {
    pub content: String,
    pub show_count: usize,
    pub clear_count: usize,
    pub disposed: bool,
}

/// An [`OutputWindow`] that keeps everything in memory.
///
/// Useful for headless embedding and for tests. Channels are keyed by name;
/// a channel created again under the same name starts from a fresh record.
#[derive(Clone, Default)]
pub struct InMemoryOutputWindow {
    records: Arc<Mutex<HashMap<String, ChannelRecord>>>,
    created: Arc<Mutex<Vec<String>>>,
}

impl InMemoryOutputWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record of the channel called `name`.
    pub fn record(&self, name: &str) -> Option<ChannelRecord> {
        self.records.lock().ok()?.get(name).cloned()
    }

    /// Names of all channels ever created, in creation order.
    pub fn created(&self) -> Vec<String> {
        self.created
            .lock()
            .map(|created| created.clone())
            .unwrap_or_default()
    }
}

impl OutputWindow for InMemoryOutputWindow {
    fn create_channel(&self, name: &str) -> Box<dyn OutputChannel> {
        if let Ok(mut records) = self.records.lock() {
            records.insert(name.to_string(), ChannelRecord::default());
        }
        if let Ok(mut created) = self.created.lock() {
            created.push(name.to_string());
        }
        Box::new(InMemoryChannel {
            name: name.to_string(),
            records: Arc::clone(&self.records),
        })
    }
}

struct InMemoryChannel {
    name: String,
    records: Arc<Mutex<HashMap<String, ChannelRecord>>>,
}

impl InMemoryChannel {
    fn with_record(&self, f: impl FnOnce(&mut ChannelRecord)) {
        if let Ok(mut records) = self.records.lock() {
            if let Some(record) = records.get_mut(&self.name) {
                f(record);
            }
        }
    }
}

impl OutputChannel for InMemoryChannel {
    fn append(&mut self, text: &str) {
        self.with_record(|record| record.content.push_str(text));
    }

    fn clear(&mut self) {
        self.with_record(|record| {
            record.content.clear();
            record.clear_count += 1;
        });
    }

    fn show(&mut self) {
        self.with_record(|record| record.show_count += 1);
    }

    fn dispose(&mut self) {
        self.with_record(|record| record.disposed = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_created_lazily_and_shown() {
        let window = InMemoryOutputWindow::new();
        let mut outputs = OutputMultiplexer::new(Arc::new(window.clone()), true);

        assert!(!outputs.has_channel("eap"));
        outputs.append("eap", "booting\n");
        outputs.append("eap", "ready\n");

        let record = window.record("Server: eap").unwrap();
        assert_eq!(record.content, "booting\nready\n");
        assert_eq!(record.show_count, 2);
        assert_eq!(window.created(), vec!["Server: eap"]);
    }

    #[test]
    fn test_no_show_when_disabled() {
        let window = InMemoryOutputWindow::new();
        let mut outputs = OutputMultiplexer::new(Arc::new(window.clone()), false);

        outputs.append("eap", "line");
        assert_eq!(window.record("Server: eap").unwrap().show_count, 0);
    }

    #[test]
    fn test_show_without_channel_is_noop() {
        let window = InMemoryOutputWindow::new();
        let mut outputs = OutputMultiplexer::new(Arc::new(window.clone()), false);

        assert!(!outputs.show("missing"));
        assert!(window.created().is_empty());
    }

    #[test]
    fn test_dispose_clears_first() {
        let window = InMemoryOutputWindow::new();
        let mut outputs = OutputMultiplexer::new(Arc::new(window.clone()), false);

        outputs.append("eap", "text");
        assert!(outputs.dispose("eap"));
        assert!(!outputs.has_channel("eap"));

        let record = window.record("Server: eap").unwrap();
        assert!(record.content.is_empty());
        assert!(record.disposed);
        assert!(!outputs.dispose("eap"));
    }

    #[test]
    fn test_dispose_all() {
        let window = InMemoryOutputWindow::new();
        let mut outputs = OutputMultiplexer::new(Arc::new(window.clone()), false);

        outputs.append("a", "1");
        outputs.append("b", "2");
        outputs.dispose_all();

        assert_eq!(outputs.channel_count(), 0);
        assert!(window.record("Server: a").unwrap().disposed);
        assert!(window.record("Server: b").unwrap().disposed);
    }
}
