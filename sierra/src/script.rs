//! Script utilities.
use crate::client::SierraClient;
use crate::conf::Credentials;
use crate::logging::{LogFile, Logger};
use crate::result::SierraResult;

const HELP_TEXT: &str = "
ScriptUtil Additions:

    --help
        Show help text

    --creds <file>
        Sierra API credentials JSON file.  Defaults to the SIERRA_CREDS
        environment variable, then ~/.sierra/creds.json, then
        ./creds.json.

    --log-file <file>
        Append log messages to this file.  Use 'syslog' to log to the
        local syslog socket.  Defaults to stderr.

    --log-level <level>
        error, warn, info, debug, or trace.  Defaults to info.

    --syslog
        Shortcut for --log-file syslog
";

const DEFAULT_LOG_LEVEL: &str = "info";

pub struct ScriptUtil {
    params: getopts::Matches,
}

impl ScriptUtil {
    /// Parse the command line parameters and start logging.
    ///
    /// Return None if a command line option results in early exit, e.g. --help.
    ///
    /// * `ops` - getopts in progress
    /// * `help_text` - Optional script-specific help text.  This text will
    ///    be augmented with ScriptUtil help text.
    pub fn init(
        ops: &mut getopts::Options,
        help_text: Option<&str>,
    ) -> SierraResult<Option<ScriptUtil>> {
        ops.optflag("h", "help", "");
        ops.optopt("", "creds", "", "");
        ops.optopt("", "log-file", "", "");
        ops.optopt("", "log-level", "", "");
        ops.optflag("", "syslog", "");

        let args: Vec<String> = std::env::args().collect();

        let params = ops
            .parse(&args[1..])
            .map_err(|e| format!("Error parsing options: {e}"))?;

        if params.opt_present("help") {
            println!(
                "{}\n{}",
                help_text.unwrap_or("No Application Help Text Provided"),
                HELP_TEXT
            );
            return Ok(None);
        }

        let logfile = if params.opt_present("syslog") {
            LogFile::Syslog
        } else {
            match params.opt_str("log-file") {
                Some(f) => LogFile::from(f.as_str()),
                None => LogFile::Stderr,
            }
        };

        let level = params
            .opt_str("log-level")
            .unwrap_or(DEFAULT_LOG_LEVEL.to_string());

        Logger::new(logfile, Logger::parse_level(&level)?).init()?;

        Ok(Some(ScriptUtil { params }))
    }

    pub fn params(&self) -> &getopts::Matches {
        &self.params
    }

    /// Load credentials per --creds and the default lookup locations.
    pub fn credentials(&self) -> SierraResult<Credentials> {
        let path = Credentials::locate(self.params.opt_str("creds").as_deref())?;

        log::debug!("Using credentials file {path:?}");

        Credentials::from_json_file(path)
    }

    /// Connect to the Sierra API.
    pub fn connect(&self) -> SierraResult<SierraClient> {
        SierraClient::connect(self.credentials()?)
    }
}
