//! Write-only output surface for prompts, frames and command results
//!
//! The executor never branches on what it printed; tests swap in
//! [`MemoryScreen`] to assert on the output.

pub mod frame;

pub use frame::{render_frame, render_legend};

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Output capability used by the executor and the breakpoint engine
pub trait Screen: Send + Sync {
    fn print(&self, text: &str);
}

/// Screen writing to stdout
pub struct StdScreen;

impl StdScreen {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen for StdScreen {
    fn print(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

/// Screen that records everything printed
#[derive(Default)]
pub struct MemoryScreen {
    output: Mutex<String>,
}

impl MemoryScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lock().contains(needle)
    }
}

impl Screen for MemoryScreen {
    fn print(&self, text: &str) {
        self.lock().push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_screen_accumulates() {
        let screen = MemoryScreen::new();
        screen.print("hello ");
        screen.print("world\n");
        assert_eq!(screen.contents(), "hello world\n");
        assert!(screen.contains("world"));
    }
}
