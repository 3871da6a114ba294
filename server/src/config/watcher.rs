//! Live configuration reload over inotify.

use std::{
    ffi::{OsStr, OsString},
    fs, io,
    path::{Path, PathBuf},
};

use calloop::{generic::Generic, EventSource, Interest, Mode, Poll, PostAction, Readiness, Token, TokenFactory};
use nix::{
    errno::Errno,
    sys::inotify::{AddWatchFlags, InitFlags, Inotify},
};
use tracing::debug;

/// A change to the watched configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    /// The file appeared or was moved into place.
    Created,

    /// The file's contents changed.
    Modified,

    /// The file was deleted or moved away.
    Removed,
}

/// Event source reporting changes to one configuration file.
///
/// The parent directory is watched rather than the file itself, so the watcher survives
/// editors that replace the file on save and notices a file that does not exist yet.
#[derive(Debug)]
pub struct ConfigWatcher {
    source: Generic<Inotify>,
    path: PathBuf,
    file_name: OsString,
}

impl ConfigWatcher {
    /// Watch the configuration file at `path` for changes.
    ///
    /// The parent directory is created if it does not exist.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_owned();
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "configuration path has no file name"))?;
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_owned(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&directory)?;

        let inotify = Inotify::init(InitFlags::IN_CLOEXEC | InitFlags::IN_NONBLOCK)?;
        inotify.add_watch(
            &directory,
            AddWatchFlags::IN_CREATE
                | AddWatchFlags::IN_MODIFY
                | AddWatchFlags::IN_CLOSE_WRITE
                | AddWatchFlags::IN_DELETE
                | AddWatchFlags::IN_MOVED_TO
                | AddWatchFlags::IN_MOVED_FROM,
        )?;

        debug!(path = %path.display(), "watching configuration");

        Ok(Self {
            source: Generic::new(inotify, Interest::READ, Mode::Edge),
            path,
            file_name,
        })
    }

    /// The path of the watched configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for ConfigWatcher {
    type Event = ConfigEvent;

    /// The path of the watched configuration file.
    type Metadata = PathBuf;

    type Ret = ();

    type Error = io::Error;

    fn process_events<F>(&mut self, readiness: Readiness, token: Token, mut callback: F) -> io::Result<PostAction>
    where
        F: FnMut(Self::Event, &mut Self::Metadata) -> Self::Ret,
    {
        let path = self.path.clone();
        let file_name = self.file_name.clone();

        self.source.process_events(readiness, token, |_, inotify| {
            loop {
                match inotify.read_events() {
                    Ok(events) => {
                        for event in events {
                            let Some(name) = event.name else {
                                continue;
                            };
                            if name != file_name {
                                continue;
                            }

                            let kind = if event
                                .mask
                                .intersects(AddWatchFlags::IN_CREATE | AddWatchFlags::IN_MOVED_TO)
                            {
                                ConfigEvent::Created
                            } else if event
                                .mask
                                .intersects(AddWatchFlags::IN_DELETE | AddWatchFlags::IN_MOVED_FROM)
                            {
                                ConfigEvent::Removed
                            } else if event
                                .mask
                                .intersects(AddWatchFlags::IN_MODIFY | AddWatchFlags::IN_CLOSE_WRITE)
                            {
                                ConfigEvent::Modified
                            } else {
                                continue;
                            };

                            // Cloned so the callback can not change the watched path.
                            callback(kind, &mut path.clone());
                        }
                    }

                    // Queue drained.
                    Err(Errno::EAGAIN) => break,

                    Err(err) => return Err(err.into()),
                }
            }

            Ok(PostAction::Continue)
        })
    }

    fn register(&mut self, poll: &mut Poll, token_factory: &mut TokenFactory) -> calloop::Result<()> {
        self.source.register(poll, token_factory)
    }

    fn reregister(&mut self, poll: &mut Poll, token_factory: &mut TokenFactory) -> calloop::Result<()> {
        self.source.reregister(poll, token_factory)
    }

    fn unregister(&mut self, poll: &mut Poll) -> calloop::Result<()> {
        self.source.unregister(poll)
    }
}
