use std::sync::Mutex;

/// Message shown after a successful copy.
pub const COPY_CONFIRMATION: &str = "Copiado para a área de transferência!";

/// Host clipboard. Copies are best-effort.
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> anyhow::Result<()>;
}

/// Keeps the last copied value in memory, for hosts without a system clipboard.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    last: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn last(&self) -> Option<String> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, text: &str) -> anyhow::Result<()> {
        *self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text.to_string());
        Ok(())
    }
}
