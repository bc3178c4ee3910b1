use crate::corrector::Corrector;
use crate::terminal::Terminal;
use tokio::sync::mpsc;

/// Consumes completed commands from the pipeline, corrects each one with
/// recent terminal context, and types it into the terminal. Failures are
/// logged and skipped; the loop itself never dies on a bad command.
pub struct DispatchHost {
    command_rx: Option<mpsc::UnboundedReceiver<String>>,
    corrector: Option<Box<dyn Corrector>>,
    terminal: Option<Box<dyn Terminal>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl DispatchHost {
    pub fn new(
        command_rx: mpsc::UnboundedReceiver<String>,
        corrector: Box<dyn Corrector>,
        terminal: Box<dyn Terminal>,
    ) -> Self {
        Self {
            command_rx: Some(command_rx),
            corrector: Some(corrector),
            terminal: Some(terminal),
            task_handle: None,
        }
    }

    pub fn start(&mut self) {
        let mut rx = self
            .command_rx
            .take()
            .expect("start() called but receiver already taken");
        let corrector = self.corrector.take().expect("corrector already taken");
        let terminal = self.terminal.take().expect("terminal already taken");

        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                if command.is_empty() {
                    tracing::debug!("empty command, nothing to dispatch");
                    continue;
                }

                // Context fetch is best effort; correction still runs without it.
                let context = match terminal.get_text().await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("failed to read terminal context: {}", e);
                        String::new()
                    }
                };

                let corrected = match corrector.correct(&command, &context).await {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!("correction failed, using raw transcript: {}", e);
                        command.clone()
                    }
                };

                match terminal.send_command(&corrected).await {
                    Ok(()) => tracing::info!(command = %corrected, "command dispatched"),
                    Err(e) => tracing::error!("failed to send command to terminal: {}", e),
                }
            }
        });

        self.task_handle = Some(handle);
    }

    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}
