//! Process logging
use crate::util;
use std::fs;
use std::io::Write;
use std::os::unix::net::UnixDatagram;
use std::process;
use std::str::FromStr;

const SYSLOG_UNIX_PATH: &str = "/dev/log";

#[derive(Debug, Clone, PartialEq)]
pub enum LogFile {
    Stderr,
    Syslog,
    Filename(String),
}

impl From<&str> for LogFile {
    /// "syslog" and "stderr" are special values.  Anything else is
    /// treated as a file name.
    fn from(s: &str) -> LogFile {
        match s {
            "syslog" => LogFile::Syslog,
            "stderr" | "-" => LogFile::Stderr,
            _ => LogFile::Filename(s.to_string()),
        }
    }
}

/// Main logging structure
///
/// Writes directly to the syslog UNIX socket when logging to syslog.
pub struct Logger {
    logfile: LogFile,
    loglevel: log::LevelFilter,
    facility: syslog::Facility,
    writer: Option<UnixDatagram>,
    application: String,
}

impl Logger {
    pub fn new(logfile: LogFile, loglevel: log::LevelFilter) -> Self {
        Logger {
            logfile,
            loglevel,
            facility: syslog::Facility::LOG_LOCAL0,
            writer: None,
            application: Logger::find_app_name(),
        }
    }

    /// Parse a log level name, e.g. "debug".
    ///
    /// ```
    /// use sierra::logging::Logger;
    ///
    /// assert_eq!(Logger::parse_level("DEBUG").unwrap(), log::LevelFilter::Debug);
    /// assert!(Logger::parse_level("chatty").is_err());
    /// ```
    pub fn parse_level(level: &str) -> Result<log::LevelFilter, String> {
        log::LevelFilter::from_str(level).map_err(|e| format!("Invalid log level '{level}': {e}"))
    }

    fn find_app_name() -> String {
        if let Ok(p) = std::env::current_exe() {
            if let Some(f) = p.file_name() {
                if let Some(n) = f.to_str() {
                    return n.to_string();
                }
            }
        }

        "sierra".to_string()
    }

    /// Setup our global log handler.
    pub fn init(mut self) -> Result<(), String> {
        match self.logfile {
            LogFile::Syslog => {
                self.writer = Some(
                    Logger::writer().map_err(|e| format!("Cannot init Logger: {e}"))?,
                );
            }
            LogFile::Filename(ref name) => {
                fs::File::options()
                    .create(true)
                    .append(true)
                    .open(name)
                    .map_err(|e| format!("Cannot open file for writing: {name} {e}"))?;
            }
            LogFile::Stderr => {}
        }

        log::set_max_level(self.loglevel);

        log::set_boxed_logger(Box::new(self)).map_err(|e| format!("Cannot init Logger: {e}"))
    }

    fn encode_priority(&self, severity: syslog::Severity) -> syslog::Priority {
        self.facility as u8 | severity as u8
    }

    pub fn writer() -> Result<UnixDatagram, String> {
        let socket = UnixDatagram::unbound()
            .map_err(|e| format!("Cannot connect to unix socket: {e}"))?;

        socket
            .connect(SYSLOG_UNIX_PATH)
            .map_err(|e| format!("Cannot connect to unix socket: {e}"))?;

        Ok(socket)
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level().to_level_filter() <= self.loglevel
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let target = record.target();

        // reqwest and friends are chatty at debug level.
        if record.level() > log::Level::Warn
            && !target.starts_with("sierra")
            && !target.starts_with("nypl")
        {
            return;
        }

        let levelname = record.level().to_string();

        let prefix = match self.writer {
            Some(_) => {
                let severity = self.encode_priority(match record.level() {
                    log::Level::Debug | log::Level::Trace => syslog::Severity::LOG_DEBUG,
                    log::Level::Info => syslog::Severity::LOG_INFO,
                    log::Level::Warn => syslog::Severity::LOG_WARNING,
                    log::Level::Error => syslog::Severity::LOG_ERR,
                });
                format!("<{severity}>")
            }
            None => format!("{} ", util::timestamp_now()),
        };

        let message = format!(
            "{prefix}{} [{levelname}:{}:{target}:{}] {}",
            self.application,
            process::id(),
            record.line().unwrap_or(0),
            record.args()
        );

        match self.logfile {
            LogFile::Syslog => {
                if let Some(ref w) = self.writer {
                    if w.send(message.as_bytes()).is_ok() {
                        return;
                    }
                }
            }
            LogFile::Filename(ref name) => {
                if let Ok(mut file) = fs::File::options().create(true).append(true).open(name) {
                    if writeln!(file, "{message}").is_ok() {
                        return;
                    }
                }
            }
            LogFile::Stderr => {}
        }

        // If all else fails, print the log message.
        eprintln!("{message}");
    }

    fn flush(&self) {}
}
