use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
};

use chrono::{format::DelayedFormat, DateTime, Local};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;

/// Directory every log file is written into.
const LOG_DIR: &str = "log";
/// Pending bytes that force a flush even when more messages are queued.
const FLUSH_THRESHOLD: usize = 4096;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("etl"));

/// File logger that hands lines to a background writer thread.
///
/// Callers never block on disk I/O: `send` only pushes onto an unbounded
/// channel, and the writer batches whatever is queued before flushing.
pub struct Logger {
    writer: Option<Sender<LogMessage>>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let log_path = match Self::get_log_path(log_name) {
            Some(path) => path,
            None => {
                error_console(format!(
                    "Failed to create log directory `{}`, file logging is disabled",
                    LOG_DIR
                ));
                return Logger { writer: None };
            }
        };

        let (tx, rx) = unbounded::<LogMessage>();

        // Disk writes happen on their own thread.
        thread::spawn(move || {
            let file = match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
            {
                Ok(file) => file,
                Err(why) => {
                    error_console(format!(
                        "Failed to open log file {:?} because {:?}",
                        log_path, why
                    ));
                    return;
                }
            };

            let mut writer = BufWriter::new(file);
            let mut line = String::with_capacity(FLUSH_THRESHOLD);

            for received in &rx {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    received.created_at.format("%F %X%.6f"),
                    received.level,
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= FLUSH_THRESHOLD {
                    if let Err(why) = writer.write_all(line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    if let Err(why) = writer.flush() {
                        error_console(format!("Failed to flush log file. because:{:#?}", why));
                    }

                    line.clear();
                }
            }
        });

        Logger { writer: Some(tx) }
    }

    pub fn info(&self, log: String) {
        self.send(log::Level::Info, log);
    }

    pub fn warn(&self, log: String) {
        self.send(log::Level::Warn, log);
    }

    pub fn error(&self, log: String) {
        self.send(log::Level::Error, log);
    }

    pub fn debug(&self, log: String) {
        self.send(log::Level::Debug, log);
    }

    fn send(&self, level: log::Level, msg: String) {
        let Some(writer) = &self.writer else {
            return;
        };

        if let Err(why) = writer.send(LogMessage::new(level, msg)) {
            error_console(why.to_string());
        }
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = Path::new(LOG_DIR);

        if !path.exists() {
            fs::create_dir_all(path).ok()?;
        }

        let mut log_path = PathBuf::from(path);
        log_path.push(format!("{}_{}.log", Local::now().format("%Y-%m-%d"), name));

        Some(log_path)
    }
}

struct LogMessage {
    level: log::Level,
    msg: String,
    created_at: DateTime<Local>,
}

impl LogMessage {
    fn new(level: log::Level, msg: String) -> Self {
        LogMessage {
            level,
            msg,
            created_at: Local::now(),
        }
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
