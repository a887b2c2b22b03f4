use log::*;
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use termcolor::*;

static LOGGER: StandardLogger = StandardLogger {
    filter: OnceLock::new(),
};

///
/// A colourised logger writing to stderr.
///
/// The `RUST_LOG` environment variable controls the output, as a default
/// level optionally followed by per-target overrides, e.g.
/// `info,des_kernel::scheduler=debug`.
///
pub struct StandardLogger {
    filter: OnceLock<LogFilter>,
}

impl StandardLogger {
    ///
    /// Installs the logger as the global `log` backend.
    ///
    /// Fails if another logger was installed before.
    ///
    pub fn setup() -> Result<(), SetLoggerError> {
        let max_level = LOGGER.filter().max_level();
        set_logger(&LOGGER).map(|()| set_max_level(max_level))
    }

    fn filter(&self) -> &LogFilter {
        self.filter.get_or_init(|| match std::env::var("RUST_LOG") {
            Ok(env) => env.parse().unwrap_or_else(|e| {
                eprintln!("des::warning ** {e}");
                LogFilter::default()
            }),
            Err(_) => LogFilter::default(),
        })
    }

    fn get_level_color(level: Level) -> Color {
        match level {
            Level::Debug => Color::Cyan,
            Level::Trace => Color::Magenta,
            Level::Info => Color::Green,
            Level::Warn => Color::Yellow,
            Level::Error => Color::Red,
        }
    }

    fn write_record(&self, record: &Record) -> std::io::Result<()> {
        let mut stream = StandardStream::stderr(ColorChoice::Auto);
        let grey = Color::Rgb(0x7f, 0x8c, 0x8d);

        stream.set_color(ColorSpec::new().set_fg(Some(grey)))?;
        write!(&mut stream, "[ ")?;

        stream.set_color(
            ColorSpec::new().set_fg(Some(StandardLogger::get_level_color(record.level()))),
        )?;
        write!(&mut stream, "{:>5} {:>25}", record.level(), record.target())?;

        stream.set_color(ColorSpec::new().set_fg(Some(grey)))?;
        write!(&mut stream, " ] ")?;

        stream.reset()?;
        writeln!(&mut stream, "{}", record.args())
    }
}

impl Log for StandardLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter().level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // write errors are dropped
            let _ = self.write_record(record);
        }
    }

    fn flush(&self) {}
}

///
/// Per-target level filters parsed from `RUST_LOG`.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogFilter {
    default: LevelFilter,
    overrides: Vec<(String, LevelFilter)>,
}

impl LogFilter {
    ///
    /// The level of the longest override matching `target`, or the default.
    ///
    pub(crate) fn level_for(&self, target: &str) -> LevelFilter {
        self.overrides
            .iter()
            .filter(|(prefix, _)| matches(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default, |(_, level)| *level)
    }

    pub(crate) fn max_level(&self) -> LevelFilter {
        self.overrides
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, std::cmp::max)
    }
}

fn matches(target: &str, prefix: &str) -> bool {
    match target.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

impl FromStr for LogFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filter = LogFilter::default();
        for expr in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match expr.split_once('=') {
                Some((target, level)) => {
                    let level = level.trim().parse::<LevelFilter>().map_err(|e| {
                        format!("Could not parse enviroment var RUST_LOG: {e} in '{expr}'")
                    })?;
                    filter.overrides.push((target.trim().to_string(), level));
                }
                None => {
                    filter.default = expr.parse::<LevelFilter>().map_err(|e| {
                        format!("Could not parse enviroment var RUST_LOG: {e} in '{expr}'")
                    })?;
                }
            }
        }
        Ok(filter)
    }
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            default: LevelFilter::Info,
            overrides: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parsing() {
        let filter = "warn,des_kernel::scheduler=debug,des_kernel=info"
            .parse::<LogFilter>()
            .unwrap();

        assert_eq!(filter.level_for("app"), LevelFilter::Warn);
        assert_eq!(filter.level_for("des_kernel::runtime"), LevelFilter::Info);
        assert_eq!(
            filter.level_for("des_kernel::scheduler::calendar"),
            LevelFilter::Debug
        );
        assert_eq!(filter.level_for("des_kernel_extra"), LevelFilter::Warn);
        assert_eq!(filter.max_level(), LevelFilter::Debug);
    }

    #[test]
    fn filter_errors() {
        assert!("loud".parse::<LogFilter>().is_err());
        assert!("info,des_kernel=loud".parse::<LogFilter>().is_err());
        assert_eq!("".parse::<LogFilter>().unwrap(), LogFilter::default());
    }
}
