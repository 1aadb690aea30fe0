/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Per-job console buffering.
//!
//! Jobs run concurrently, so their report lines are collected in a
//! [`JobOutput`] and written to the [`Console`] in one locked flush when the
//! job finishes. Diagnostics are mirrored to the log at debug level.

use log::debug;
use std::io::Write;
use std::sync::Mutex;

/// Lines produced by one check job.
#[derive(Debug)]
pub struct JobOutput {
    identity: String,
    instance: String,
    lines: Mutex<Vec<String>>,
}

impl JobOutput {
    pub fn new(identity: impl Into<String>, instance: impl Into<String>) -> Self {
        JobOutput {
            identity: identity.into(),
            instance: instance.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push(line);
    }

    /// Unindented line, e.g. the job header.
    pub fn line(&self, text: impl Into<String>) {
        self.push(text.into());
    }

    /// Indented detail line.
    pub fn detail(&self, text: impl AsRef<str>) {
        self.push(format!("  {}", text.as_ref()));
    }

    /// Diagnostic attributed to the record's instance.
    pub fn diagnostic(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!("[{}] {}", self.identity, message);
        self.push(format!("  {}: {}", self.instance, message));
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

enum Sink {
    Stdout,
    Captured(Vec<String>),
}

/// Shared console. Each flush holds the lock for the whole block of lines.
pub struct Console {
    sink: Mutex<Sink>,
}

impl Console {
    pub fn stdout() -> Self {
        Console {
            sink: Mutex::new(Sink::Stdout),
        }
    }

    /// Console that keeps everything in memory, for tests and embedding.
    pub fn captured() -> Self {
        Console {
            sink: Mutex::new(Sink::Captured(Vec::new())),
        }
    }

    pub fn flush_job(&self, output: &JobOutput) {
        self.write_block(output.take());
    }

    pub fn print(&self, line: impl Into<String>) {
        self.write_block(vec![line.into()]);
    }

    fn write_block(&self, block: Vec<String>) {
        if block.is_empty() {
            return;
        }
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *sink {
            Sink::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                for line in &block {
                    let _ = writeln!(handle, "{}", line);
                }
                let _ = handle.flush();
            }
            Sink::Captured(lines) => lines.extend(block),
        }
    }

    /// Everything written so far to a captured console.
    pub fn captured_lines(&self) -> Vec<String> {
        match &*self.sink.lock().unwrap_or_else(|e| e.into_inner()) {
            Sink::Stdout => Vec::new(),
            Sink::Captured(lines) => lines.clone(),
        }
    }
}
