use crossterm::event::{KeyEvent, KeyEventKind};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum Event {
    Key(KeyEvent),
    Tick,
    Refresh, // auto-refresh timer fired
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration, refresh_interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut reader = crossterm::event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);
            let mut refresh_interval = tokio::time::interval(refresh_interval);

            // The first tick fires immediately; the initial load is already running
            refresh_interval.tick().await;

            loop {
                tokio::select! {
                    maybe_event = reader.next() => {
                        match maybe_event {
                            // Press only, Windows also reports releases
                            Some(Ok(crossterm::event::Event::Key(key))) if key.kind == KeyEventKind::Press => {
                                if tx.send(Event::Key(key)).is_err() {
                                    break;
                                }
                            }
                            Some(Err(e)) => {
                                tracing::debug!("terminal event error: {}", e);
                            }
                            None => break,
                            _ => {}
                        }
                    }
                    _ = tick_interval.tick() => {
                        if tx.send(Event::Tick).is_err() {
                            break;
                        }
                    }
                    _ = refresh_interval.tick() => {
                        if tx.send(Event::Refresh).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        EventHandler { rx }
    }

    pub async fn next(&mut self) -> Event {
        self.rx.recv().await.unwrap_or(Event::Tick)
    }
}
