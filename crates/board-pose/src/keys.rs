//! Keyboard input for the frame loop.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Escape,
    Other(char),
}

impl Key {
    /// Decode a highgui-style key code; negative codes mean "no key".
    pub fn from_code(code: i32) -> Option<Key> {
        match code {
            c if c < 0 => None,
            32 => Some(Key::Space),
            27 => Some(Key::Escape),
            c => Some(Key::Other(
                char::from_u32((c & 0xff) as u32).unwrap_or('\u{fffd}'),
            )),
        }
    }

    /// Decode one line typed on a terminal.
    ///
    /// An empty line or a space toggles pause, `q` or `Esc` quits.
    pub fn from_line(line: &str) -> Key {
        let line = line.trim_end_matches(['\r', '\n']);
        match line.chars().next() {
            None | Some(' ') => Key::Space,
            Some('\u{1b}') | Some('q') | Some('Q') => Key::Escape,
            Some(c) => Key::Other(c),
        }
    }
}

/// Source of key presses.
pub trait KeyEvents {
    /// Pending key, if any, without blocking.
    fn poll(&mut self) -> Option<Key>;

    /// Block until a key arrives; `None` when input is closed for good.
    fn wait(&mut self) -> Option<Key>;
}

/// No keyboard at all; a pause can never be resumed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoKeys;

impl KeyEvents for NoKeys {
    fn poll(&mut self) -> Option<Key> {
        None
    }

    fn wait(&mut self) -> Option<Key> {
        None
    }
}

/// Keys delivered over a channel from another thread.
pub struct ChannelKeys {
    rx: Receiver<Key>,
}

impl ChannelKeys {
    pub fn new(rx: Receiver<Key>) -> Self {
        Self { rx }
    }

    /// A connected sender/receiver pair.
    pub fn channel() -> (Sender<Key>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }

    /// Read stdin lines on a background thread.
    ///
    /// The thread ends, and the channel closes, at end of input.
    pub fn stdin() -> Self {
        let (tx, keys) = Self::channel();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(Key::from_line(&line)).is_err() {
                    break;
                }
            }
        });
        keys
    }
}

impl KeyEvents for ChannelKeys {
    fn poll(&mut self) -> Option<Key> {
        match self.rx.try_recv() {
            Ok(key) => Some(key),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn wait(&mut self) -> Option<Key> {
        self.rx.recv().ok()
    }
}
