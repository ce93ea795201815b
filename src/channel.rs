//! Security-classed I/O channels
//!
//! A channel is named after the security class it carries. It starts
//! closed, is opened for reading or writing, and is backed by a
//! `ChannelStore` location.

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::ast::AccessMode;
use crate::error::{ErrorKind, Result, SecLangError};
use crate::security::SecurityLabel;
use crate::store::{ChannelStore, StoreHandle};

#[derive(Debug)]
pub struct Channel {
    name: String,
    class: SecurityLabel,
    location: PathBuf,
    mode: AccessMode,
    handle: Option<StoreHandle>,
    ever_opened: bool,
    queue: VecDeque<String>,
    loaded: bool,
}

impl Channel {
    /// A closed channel. `None` if the name is not a security class.
    pub fn new(name: &str, location: PathBuf) -> Option<Self> {
        let class = SecurityLabel::of_channel(name)?;
        Some(Self {
            name: name.to_string(),
            class,
            location,
            mode: AccessMode::Read,
            handle: None,
            ever_opened: false,
            queue: VecDeque::new(),
            loaded: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The class implied by the channel's name
    pub fn class(&self) -> SecurityLabel {
        self.class
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn location(&self) -> &PathBuf {
        &self.location
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Open in the given mode. Same mode again is a no-op; a different
    /// mode closes the current handle first.
    pub fn open(&mut self, mode: AccessMode, store: &mut dyn ChannelStore) -> Result<()> {
        if self.is_open() {
            if self.mode == mode {
                return Ok(());
            }
            self.release(store)?;
        }

        let handle = store.open(&self.location, mode).map_err(|err| self.store_error(err))?;
        self.handle = Some(handle);
        self.mode = mode;
        self.ever_opened = true;
        self.queue.clear();
        self.loaded = false;

        tracing::debug!(channel = %self.name, %mode, "channel opened");
        Ok(())
    }

    /// Close the channel. Closing an already closed channel does nothing;
    /// closing one that was never opened fails.
    pub fn close(&mut self, store: &mut dyn ChannelStore) -> Result<()> {
        if !self.ever_opened {
            return Err(SecLangError::new(
                ErrorKind::ChannelNeverOpened(self.name.clone()),
                None,
            ));
        }
        if self.is_open() {
            self.release(store)?;
            tracing::debug!(channel = %self.name, "channel closed");
        }
        Ok(())
    }

    /// Take the next queued line; an exhausted channel yields an empty line
    pub fn read(&mut self, store: &mut dyn ChannelStore) -> Result<String> {
        self.require(AccessMode::Read)?;

        if !self.loaded {
            let lines = store.read_lines(&self.location).map_err(|err| self.store_error(err))?;
            self.queue = lines.into();
            self.loaded = true;
        }

        let line = self.queue.pop_front().unwrap_or_default();
        tracing::debug!(channel = %self.name, remaining = self.queue.len(), "channel read");
        Ok(line)
    }

    /// Append one line. Store failures are reported as `false`, not as
    /// errors.
    pub fn write(&mut self, text: &str, store: &mut dyn ChannelStore) -> Result<bool> {
        self.require(AccessMode::Write)?;

        let Some(handle) = self.handle.as_mut() else {
            return Err(SecLangError::new(ErrorKind::ChannelNotOpen(self.name.clone()), None));
        };

        match store.append_line(handle, text) {
            Ok(()) => {
                tracing::debug!(channel = %self.name, "channel write");
                Ok(true)
            }
            Err(err) => {
                tracing::warn!(channel = %self.name, error = %err, "failed to append to channel");
                Ok(false)
            }
        }
    }

    fn require(&self, mode: AccessMode) -> Result<()> {
        if !self.is_open() {
            return Err(SecLangError::new(ErrorKind::ChannelNotOpen(self.name.clone()), None));
        }
        if self.mode != mode {
            return Err(SecLangError::new(
                ErrorKind::WrongChannelMode { channel: self.name.clone(), mode: self.mode },
                None,
            ));
        }
        Ok(())
    }

    fn release(&mut self, store: &mut dyn ChannelStore) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            store.close(handle).map_err(|err| self.store_error(err))?;
        }
        self.queue.clear();
        self.loaded = false;
        Ok(())
    }

    fn store_error(&self, err: std::io::Error) -> SecLangError {
        SecLangError::new(
            ErrorKind::ChannelStore(format!("channel '{}': {}", self.name, err)),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn channel(name: &str) -> Channel {
        Channel::new(name, PathBuf::from(name)).unwrap()
    }

    #[test]
    fn test_class_from_name() {
        assert_eq!(channel("TopSecret").class(), SecurityLabel::TopSecret);
        assert!(Channel::new("Public", PathBuf::from("Public")).is_none());
    }

    #[test]
    fn test_write_then_read() {
        let mut store = MemoryStore::new();
        let mut ch = channel("Unclassified");
        ch.open(AccessMode::Write, &mut store).unwrap();
        assert!(ch.write("test_data", &mut store).unwrap());
        ch.open(AccessMode::Read, &mut store).unwrap();
        assert_eq!(ch.read(&mut store).unwrap(), "test_data");
        assert_eq!(ch.read(&mut store).unwrap(), "");
        ch.close(&mut store).unwrap();
        assert!(!ch.is_open());
    }

    #[test]
    fn test_mode_is_enforced() {
        let mut store = MemoryStore::new();
        let mut ch = channel("Secret");
        ch.open(AccessMode::Read, &mut store).unwrap();
        let err = ch.write("x", &mut store).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::WrongChannelMode { .. }));

        ch.open(AccessMode::Write, &mut store).unwrap();
        assert!(ch.read(&mut store).is_err());
    }

    #[test]
    fn test_closed_channel_rejects_io() {
        let mut store = MemoryStore::new();
        let mut ch = channel("Secret");
        let err = ch.read(&mut store).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ChannelNotOpen("Secret".to_string()));
    }

    #[test]
    fn test_close_lifecycle() {
        let mut store = MemoryStore::new();
        let mut ch = channel("Confidential");
        assert!(matches!(
            ch.close(&mut store).unwrap_err().kind,
            ErrorKind::ChannelNeverOpened(_)
        ));
        ch.open(AccessMode::Read, &mut store).unwrap();
        ch.close(&mut store).unwrap();
        // Second close is a no-op
        ch.close(&mut store).unwrap();
    }

    #[test]
    fn test_reopen_reloads_queue() {
        let mut store = MemoryStore::new().with_channel("Secret", &["a", "b"]);
        let mut ch = channel("Secret");
        ch.open(AccessMode::Read, &mut store).unwrap();
        assert_eq!(ch.read(&mut store).unwrap(), "a");
        ch.close(&mut store).unwrap();
        ch.open(AccessMode::Read, &mut store).unwrap();
        assert_eq!(ch.read(&mut store).unwrap(), "a");
        assert_eq!(ch.read(&mut store).unwrap(), "b");
    }
}
