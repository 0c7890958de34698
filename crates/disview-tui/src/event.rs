use crossterm::event::{self, Event};
use miette::miette;
use std::{io, path::PathBuf, sync::mpsc, thread, time::Duration};

/// Everything the application loop reacts to.
#[derive(Debug)]
pub enum AppEvent {
    Input(Event),
    /// A background file load finished. Loads older than the latest request are dropped.
    FileLoaded {
        generation: u64,
        path: PathBuf,
        result: io::Result<String>,
    },
}

pub struct EventHandler {
    sender: mpsc::Sender<AppEvent>,
    receiver: mpsc::Receiver<AppEvent>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let input_sender = sender.clone();

        thread::spawn(move || {
            let mut last_tick = std::time::Instant::now();

            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));

                if matches!(event::poll(timeout), Ok(true)) {
                    if let Ok(event) = event::read() {
                        if input_sender.send(AppEvent::Input(event)).is_err() {
                            break;
                        }
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    last_tick = std::time::Instant::now();
                }
            }
        });

        Self { sender, receiver }
    }

    /// A handle for posting events from other threads.
    pub fn sender(&self) -> mpsc::Sender<AppEvent> {
        self.sender.clone()
    }
}

pub trait EventHandlerExt {
    fn next(&self) -> miette::Result<Option<AppEvent>>;
}

impl EventHandlerExt for EventHandler {
    fn next(&self) -> miette::Result<Option<AppEvent>> {
        match self.receiver.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(miette!("Event channel disconnected"))
            }
        }
    }
}

/// Reads `path` on a worker thread and posts the result as [`AppEvent::FileLoaded`].
pub fn spawn_file_load(sender: mpsc::Sender<AppEvent>, generation: u64, path: PathBuf) {
    thread::spawn(move || {
        let result = std::fs::read_to_string(&path);
        if sender
            .send(AppEvent::FileLoaded {
                generation,
                path,
                result,
            })
            .is_err()
        {
            log::debug!("Application exited before file load {} finished", generation);
        }
    });
}
