use std::io::Write;

use client_core::AppEvent;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::broadcast::{self, error::TryRecvError},
};
use tracing::warn;

use crate::render::{self, Style};

pub struct Console {
    events: broadcast::Receiver<AppEvent>,
    style: Style,
    input: Lines<BufReader<Stdin>>,
}

impl Console {
    pub fn new(events: broadcast::Receiver<AppEvent>, style: Style) -> Self {
        Self {
            events,
            style,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    pub fn flush(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    if let Some(text) = render::event(&event, self.style) {
                        println!("{text}");
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "console: dropped lab events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    pub fn discard(&mut self) {
        while !matches!(
            self.events.try_recv(),
            Err(TryRecvError::Empty | TryRecvError::Closed)
        ) {}
    }

    /// `None` at end of input.
    pub async fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        Ok(self.input.next_line().await?)
    }

    pub async fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        let answer = self.read_line(&format!("{question} [y/N] ")).await?;
        Ok(matches!(
            answer.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }
}
