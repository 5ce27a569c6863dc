use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Error as IOError;
use std::num::ParseIntError;
use std::path::Path;
use std::str::FromStr;

use logger::{Level, Logger};
use skiplist::{Options, DEFAULT_MAX_LEVEL};

/// Settings read from a configuration file, one directive per line:
///
/// ```text
/// # comment
/// max-level 16
/// seed 42
/// logging yes
/// loglevel verbose
/// logfile /var/log/orderedset.log
/// include other.conf
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_level: usize,
    pub seed: Option<u64>,
    pub logging: bool,
    pub loglevel: Level,
    /// Empty means the standard output.
    pub logfile: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidFormat,
    InvalidParameter,
    UnknownDirective(String),
    IOError(IOError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::InvalidFormat => f.write_str("invalid configuration line"),
            ConfigError::InvalidParameter => f.write_str("invalid configuration value"),
            ConfigError::UnknownDirective(ref name) => write!(f, "unknown directive {:?}", name),
            ConfigError::IOError(ref e) => write!(f, "cannot read configuration: {}", e),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ConfigError::IOError(ref e) => Some(e),
            _ => None,
        }
    }
}

/// The argument of a directive, without surrounding double quotes.
fn read_string(arg: &str) -> Result<String, ConfigError> {
    let arg = arg.trim();
    if arg.len() >= 2 && arg.starts_with('"') && arg.ends_with('"') {
        return Ok(arg[1..arg.len() - 1].to_owned());
    }
    if arg.contains('"') || arg.split_whitespace().count() > 1 {
        return Err(ConfigError::InvalidFormat);
    }
    Ok(arg.to_owned())
}

fn read_parse<T>(arg: &str) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match read_string(arg)?.parse() {
        Ok(f) => Ok(f),
        Err(_) => Err(ConfigError::InvalidParameter),
    }
}

fn read_bool(arg: &str) -> Result<bool, ConfigError> {
    Ok(match &*read_string(arg)? {
        "yes" => true,
        "no" => false,
        _ => return Err(ConfigError::InvalidFormat),
    })
}

fn read_level(arg: &str) -> Result<Level, ConfigError> {
    Level::from_name(&read_string(arg)?).ok_or(ConfigError::InvalidParameter)
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

impl Config {
    pub fn new() -> Config {
        Config {
            max_level: DEFAULT_MAX_LEVEL,
            seed: None,
            logging: false,
            loglevel: Level::Notice,
            logfile: "".to_owned(),
        }
    }

    /// Reads `fname`, overriding the settings it names.  `include` reads another file in place.
    pub fn parsefile(&mut self, fname: &str) -> Result<(), ConfigError> {
        let path = Path::new(fname);
        let file = BufReader::new(File::open(&path)?);
        for line_iter in file.lines() {
            let lline = line_iter?;
            let line = lline.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (directive, arg) = match line.find(char::is_whitespace) {
                Some(at) => (&line[..at], &line[at..]),
                None => (line, ""),
            };
            match directive {
                "max-level" => self.max_level = read_parse(arg)?,
                "seed" => self.seed = Some(read_parse(arg)?),
                "logging" => self.logging = read_bool(arg)?,
                "loglevel" => self.loglevel = read_level(arg)?,
                "logfile" => self.logfile = read_string(arg)?,
                "include" => {
                    let included = read_string(arg)?;
                    if included.is_empty() {
                        return Err(ConfigError::InvalidFormat);
                    }
                    self.parsefile(&included)?;
                }
                _ => return Err(ConfigError::UnknownDirective(directive.to_owned())),
            };
        }

        Ok(())
    }

    /// Opens the configured logger, if logging is enabled.
    pub fn logger(&self) -> Result<Option<Logger>, ConfigError> {
        if !self.logging {
            return Ok(None);
        }
        Ok(Some(if self.logfile.is_empty() {
            Logger::new(self.loglevel)
        } else {
            Logger::file(self.loglevel, &self.logfile)?
        }))
    }

    /// Engine options for an `OrderedSet`.
    pub fn options(&self) -> Result<Options, ConfigError> {
        Ok(Options {
            max_level: self.max_level,
            seed: self.seed,
            logger: self.logger()?,
        })
    }
}

impl From<IOError> for ConfigError {
    fn from(e: IOError) -> ConfigError {
        ConfigError::IOError(e)
    }
}

impl From<ParseIntError> for ConfigError {
    fn from(_: ParseIntError) -> ConfigError {
        ConfigError::InvalidParameter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::random;
    use std::env::temp_dir;
    use std::fs::{remove_file, File};
    use std::io::Write;

    fn write_temp(content: &[u8]) -> String {
        let filepath = temp_dir().join(format!("{}.conf", random::<u64>()));
        let filepath = filepath.to_str().unwrap().to_owned();
        File::create(&filepath).unwrap().write_all(content).unwrap();
        filepath
    }

    fn parse(content: &[u8]) -> Result<Config, ConfigError> {
        let filepath = write_temp(content);
        let mut config = Config::new();
        let r = config.parsefile(&filepath);
        remove_file(&filepath).unwrap();
        r.map(|_| config)
    }

    macro_rules! config {
        ($str: expr) => {{
            parse($str).unwrap()
        }};
    }

    #[test]
    fn defaults() {
        let config = config!(b"# nothing but a comment\n\n");
        assert_eq!(config, Config::new());
        assert_eq!(config.max_level, 32);
        assert!(config.seed.is_none());
        assert!(!config.logging);
        assert!(config.logger().unwrap().is_none());
    }

    #[test]
    fn parse_max_level() {
        let config = config!(b"max-level 12");
        assert_eq!(config.max_level, 12);
        assert_eq!(config.options().unwrap().max_level, 12);
    }

    #[test]
    fn parse_seed() {
        let config = config!(b"seed 42");
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn parse_seed_quotes() {
        let config = config!(b"seed \"42\"");
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn parse_logging_yes() {
        let config = config!(b"logging yes");
        assert!(config.logging);
    }

    #[test]
    fn parse_logging_no() {
        let config = config!(b"logging yes\nlogging no");
        assert!(!config.logging);
    }

    #[test]
    fn parse_loglevel() {
        let config = config!(b"loglevel Verbose");
        assert_eq!(config.loglevel, Level::Verbose);
    }

    #[test]
    fn parse_logfile() {
        let config = config!(b"logfile /tmp/sets.log");
        assert_eq!(config.logfile, "/tmp/sets.log");
        let config = config!(b"logfile /tmp/sets.log\nlogfile \"\"");
        assert_eq!(config.logfile, "");
    }

    #[test]
    fn parse_include() {
        let included = write_temp(b"seed 7\nmax-level 4");
        let config = config!(format!("max-level 20\ninclude {}\n", included).as_bytes());
        remove_file(&included).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_level, 4);
    }

    #[test]
    fn unknown_directive() {
        match parse(b"port 6379") {
            Err(ConfigError::UnknownDirective(name)) => assert_eq!(name, "port"),
            r => panic!("Expected unknown directive, got {:?}", r),
        }
    }

    #[test]
    fn invalid_values() {
        match parse(b"max-level many") {
            Err(ConfigError::InvalidParameter) => (),
            r => panic!("Expected invalid parameter, got {:?}", r),
        }
        match parse(b"logging maybe") {
            Err(ConfigError::InvalidFormat) => (),
            r => panic!("Expected invalid format, got {:?}", r),
        }
        match parse(b"loglevel loud") {
            Err(ConfigError::InvalidParameter) => (),
            r => panic!("Expected invalid parameter, got {:?}", r),
        }
        match parse(b"seed 1 2") {
            Err(ConfigError::InvalidFormat) => (),
            r => panic!("Expected invalid format, got {:?}", r),
        }
    }

    #[test]
    fn missing_file() {
        let mut config = Config::new();
        match config.parsefile("/nonexistent/orderedset.conf") {
            Err(ConfigError::IOError(_)) => (),
            r => panic!("Expected io error, got {:?}", r),
        }
    }

    #[test]
    fn file_logger() {
        let logfile = temp_dir().join(format!("{}.log", random::<u64>()));
        let logfile = logfile.to_str().unwrap().to_owned();
        let config = config!(format!("logging yes\nlogfile {}\n", logfile).as_bytes());
        let options = config.options().unwrap();
        assert!(options.logger.is_some());
        assert!(Path::new(&logfile).exists());
        remove_file(&logfile).unwrap();
    }
}
