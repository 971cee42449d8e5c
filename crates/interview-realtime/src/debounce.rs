//! Coalesces editor keystrokes into one `code_update` per quiet period.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::channel::RealtimeChannel;

#[derive(Debug, Clone, PartialEq)]
pub struct CodeEdit {
    pub code: String,
    pub language: String,
}

/// Emits only the latest edit once no new edit has arrived for `quiet`. A pending edit is
/// flushed when the debouncer is dropped.
pub struct CodeUpdateDebouncer {
    tx: mpsc::UnboundedSender<CodeEdit>,
}

impl CodeUpdateDebouncer {
    /// Debounce into the realtime channel's `code_update`.
    pub fn for_channel(channel: RealtimeChannel, quiet: Duration) -> Self {
        Self::spawn(quiet, move |edit: CodeEdit| {
            channel.emit_code_update(&edit.code, &edit.language);
        })
    }

    pub fn spawn<F>(quiet: Duration, sink: F) -> Self
    where
        F: Fn(CodeEdit) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<CodeEdit>();
        tokio::spawn(async move {
            while let Some(mut latest) = rx.recv().await {
                loop {
                    tokio::select! {
                        next = rx.recv() => match next {
                            Some(edit) => latest = edit,
                            None => {
                                sink(latest);
                                return;
                            }
                        },
                        _ = tokio::time::sleep(quiet) => {
                            sink(latest);
                            break;
                        }
                    }
                }
            }
        });
        Self { tx }
    }

    pub fn push(&self, code: impl Into<String>, language: impl Into<String>) {
        let _ = self.tx.send(CodeEdit {
            code: code.into(),
            language: language.into(),
        });
    }
}
