//! Backing stores for channels
//!
//! A store is line oriented: every write appends one line and reads hand
//! back the lines in the order they were written.

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::ast::AccessMode;
use crate::config::{ConfigError, RunMode, SecLangConfig};

/// An open backing location
#[derive(Debug)]
pub struct StoreHandle {
    location: PathBuf,
    mode: AccessMode,
    file: Option<File>,
}

impl StoreHandle {
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

/// The storage a channel reads from and appends to
pub trait ChannelStore: fmt::Debug + Send {
    /// Where the given channel lives for the given session
    fn locate(&self, channel: &str, session: Option<&str>) -> Result<PathBuf, ConfigError>;

    fn open(&mut self, location: &Path, mode: AccessMode) -> io::Result<StoreHandle>;

    /// Every line currently stored, oldest first
    fn read_lines(&mut self, location: &Path) -> io::Result<Vec<String>>;

    fn append_line(&mut self, handle: &mut StoreHandle, text: &str) -> io::Result<()>;

    fn close(&mut self, handle: StoreHandle) -> io::Result<()>;

    /// The raw stored text; empty if nothing was ever written
    fn contents(&self, location: &Path) -> io::Result<String>;
}

/// Channels backed by text files on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    mode: RunMode,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, mode: RunMode) -> Self {
        Self { root: root.into(), mode }
    }

    pub fn from_config(config: &SecLangConfig) -> Self {
        Self::new(config.channel_dir.clone(), config.mode)
    }
}

impl ChannelStore for FileStore {
    fn locate(&self, channel: &str, session: Option<&str>) -> Result<PathBuf, ConfigError> {
        match (self.mode, session) {
            (RunMode::Dev, None) => Ok(self.root.join(format!("{}.txt", channel))),
            (_, Some(session)) => Ok(self
                .root
                .join("temp")
                .join(format!("{}_{}.txt", channel, session))),
            (RunMode::Prod, None) => Err(ConfigError::MissingSession),
        }
    }

    fn open(&mut self, location: &Path, mode: AccessMode) -> io::Result<StoreHandle> {
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = match mode {
            // Reading a channel nobody wrote yet starts it empty
            AccessMode::Read => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(location)?,
            AccessMode::Write => OpenOptions::new().create(true).append(true).open(location)?,
        };

        Ok(StoreHandle {
            location: location.to_path_buf(),
            mode,
            file: Some(file),
        })
    }

    fn read_lines(&mut self, location: &Path) -> io::Result<Vec<String>> {
        let content = fs::read_to_string(location)?;
        Ok(content.lines().map(|line| line.trim().to_string()).collect())
    }

    fn append_line(&mut self, handle: &mut StoreHandle, text: &str) -> io::Result<()> {
        match handle.file.as_mut() {
            Some(file) => writeln!(file, "{}", text),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "store handle is closed")),
        }
    }

    fn close(&mut self, mut handle: StoreHandle) -> io::Result<()> {
        if let Some(mut file) = handle.file.take() {
            file.flush()?;
        }
        Ok(())
    }

    fn contents(&self, location: &Path) -> io::Result<String> {
        match fs::read_to_string(location) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err),
        }
    }
}

/// Channels kept in memory, for tests and the REPL
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lines: HashMap<PathBuf, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fill a session-less channel
    pub fn with_channel(mut self, channel: &str, lines: &[&str]) -> Self {
        self.lines.insert(
            PathBuf::from(channel),
            lines.iter().map(|line| line.to_string()).collect(),
        );
        self
    }
}

impl ChannelStore for MemoryStore {
    fn locate(&self, channel: &str, session: Option<&str>) -> Result<PathBuf, ConfigError> {
        Ok(match session {
            Some(session) => PathBuf::from(format!("{}_{}", channel, session)),
            None => PathBuf::from(channel),
        })
    }

    fn open(&mut self, location: &Path, mode: AccessMode) -> io::Result<StoreHandle> {
        self.lines.entry(location.to_path_buf()).or_default();
        Ok(StoreHandle {
            location: location.to_path_buf(),
            mode,
            file: None,
        })
    }

    fn read_lines(&mut self, location: &Path) -> io::Result<Vec<String>> {
        Ok(self.lines.get(location).cloned().unwrap_or_default())
    }

    fn append_line(&mut self, handle: &mut StoreHandle, text: &str) -> io::Result<()> {
        // One stored line per written value, as a file would split them
        let entry = self.lines.entry(handle.location.clone()).or_default();
        entry.extend(text.split('\n').map(str::to_string));
        Ok(())
    }

    fn close(&mut self, _handle: StoreHandle) -> io::Result<()> {
        Ok(())
    }

    fn contents(&self, location: &Path) -> io::Result<String> {
        Ok(self
            .lines
            .get(location)
            .map(|lines| lines.iter().map(|line| format!("{}\n", line)).collect())
            .unwrap_or_default())
    }
}
