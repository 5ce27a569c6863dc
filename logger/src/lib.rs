use std::fmt::{Debug, Error, Formatter};
use std::fs::File;
use std::io;
use std::io::{stderr, stdout, Write};
use std::path::Path;
use std::sync::mpsc::{channel, Sender};
use std::thread;

/// Macro to log a message. Uses the `format!` syntax.
/// See `std::fmt` for more information.
///
/// # Examples
///
/// ```
/// # use logger::{log, Logger, Level};
/// let logger = Logger::new(Level::Warning);
/// log!(logger, Debug, "hello {}", "world");
/// ```
#[macro_export]
macro_rules! log {
    ($logger: expr, $level: ident, $($arg:tt)*) => ({
        $logger.log($crate::Level::$level, format!($($arg)*))
    })
}

enum Output {
    /// Sends logs to a channel
    Channel(Sender<Vec<u8>>),
    /// Writes to the standard output
    Stdout,
    /// Writes to the standard error
    Stderr,
    /// Writes to a `File` in `String` path
    File(File, String),
}

impl Debug for Output {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), Error> {
        match *self {
            Output::Channel(_) => fmt.write_str("Channel"),
            Output::Stderr => fmt.write_str("Stderr"),
            Output::Stdout => fmt.write_str("Stdout"),
            Output::File(_, ref filename) => fmt.write_fmt(format_args!("File: {}", filename)),
        }
    }
}

impl Write for Output {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match *self {
            Output::Channel(ref v) => match v.send(data.to_vec()) {
                Ok(()) => Ok(data.len()),
                Err(_) => Err(io::Error::new(io::ErrorKind::BrokenPipe, "log receiver is gone")),
            },
            Output::Stderr => stderr().write(data),
            Output::Stdout => stdout().write(data),
            Output::File(ref mut v, _) => v.write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Output::Channel(_) => Ok(()),
            Output::Stderr => stderr().flush(),
            Output::Stdout => stdout().flush(),
            Output::File(ref mut v, _) => v.flush(),
        }
    }
}

/// A level that identifies a log message.
/// A lower level includes all higher levels.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Level {
    Debug,
    Verbose,
    Notice,
    Warning,
}

impl Level {
    /// Whether the level is equal or lower than another level.
    /// For example, `Debug` includes all other levels, while `Warning` only
    /// includes itself.
    ///
    /// # Examples
    ///
    /// ```
    /// # use logger::Level;
    /// #
    /// assert!(Level::Debug.contains(&Level::Debug));
    /// assert!(!Level::Warning.contains(&Level::Debug));
    /// assert!(Level::Debug.contains(&Level::Warning));
    /// ```
    pub fn contains(&self, other: &Level) -> bool {
        match *self {
            Level::Debug => true,
            Level::Verbose => *other != Level::Debug,
            Level::Notice => *other == Level::Notice || *other == Level::Warning,
            Level::Warning => *other == Level::Warning,
        }
    }

    /// Parses a level name, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// # use logger::Level;
    /// #
    /// assert_eq!(Level::from_name("NOTICE"), Some(Level::Notice));
    /// assert_eq!(Level::from_name("loud"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Level> {
        match &*name.to_ascii_lowercase() {
            "debug" => Some(Level::Debug),
            "verbose" => Some(Level::Verbose),
            "notice" => Some(Level::Notice),
            "warning" => Some(Level::Warning),
            _ => None,
        }
    }
}

/// What travels from a `Logger` handle to its writer thread.
enum Message {
    Log(Level, String),
    SetLevel(Level),
    SetOutput(Output),
}

/// Handle on a background thread that filters messages by level and writes them out.  Clones
/// share the same thread; it stops once every handle is dropped.
#[derive(Clone)]
pub struct Logger {
    tx: Sender<Message>,
}

impl Debug for Logger {
    fn fmt(&self, fmt: &mut Formatter) -> Result<(), Error> {
        fmt.write_str("Logger")
    }
}

impl Logger {
    /// Creates a new `Logger` for a given `Output` and severity `Level`.
    fn create(level: Level, output: Output) -> Logger {
        let (tx, rx) = channel::<Message>();
        {
            let mut level = level;
            let mut output = output;
            thread::spawn(move || {
                while let Ok(message) = rx.recv() {
                    match message {
                        Message::Log(lvl, msg) => {
                            if !level.contains(&lvl) {
                                continue;
                            }
                            // One write per line: a channel output sends every write separately.
                            let line = format!("{}\n", msg);
                            if let Err(e) = output.write_all(line.as_bytes()) {
                                // failing to log a message... will write straight to stderr
                                // and give up if that fails too
                                let _ = writeln!(stderr(), "Failed to log {:?} {}", e, msg);
                            }
                        }
                        Message::SetLevel(lvl) => level = lvl,
                        Message::SetOutput(out) => output = out,
                    }
                }
            });
        }

        Logger { tx }
    }

    /// Creates a new logger that writes in the standard output.
    ///
    /// # Examples
    /// ```
    /// # use logger::{Logger, Level};
    /// #
    /// let logger = Logger::new(Level::Warning);
    /// logger.log(Level::Warning, "hello world".to_owned());
    /// ```
    pub fn new(level: Level) -> Self {
        Self::create(level, Output::Stdout)
    }

    /// Creates a new logger that writes in the standard error.
    pub fn new_err(level: Level) -> Self {
        Self::create(level, Output::Stderr)
    }

    /// Creates a new logger that sends log messages to `s`.
    ///
    /// # Examples
    /// ```
    /// # use logger::{Logger, Level};
    /// # use std::sync::mpsc::channel;
    /// #
    /// let (tx, rx) = channel();
    /// let logger = Logger::channel(Level::Debug, tx);
    /// logger.log(Level::Debug, "hello world".to_owned());
    /// assert_eq!(rx.recv().unwrap(), b"hello world\n".to_vec());
    /// ```
    pub fn channel(level: Level, s: Sender<Vec<u8>>) -> Self {
        Self::create(level, Output::Channel(s))
    }

    /// Creates a new logger that writes in a file.
    pub fn file(level: Level, path: &str) -> io::Result<Self> {
        let file = File::create(Path::new(path))?;
        Ok(Self::create(level, Output::File(file, path.to_owned())))
    }

    /// Changes the output to be a file in `path`.
    pub fn set_logfile(&self, path: &str) -> io::Result<()> {
        let file = Output::File(File::create(Path::new(path))?, path.to_owned());
        self.send(Message::SetOutput(file));
        Ok(())
    }

    /// Changes the log level.
    pub fn set_loglevel(&self, level: Level) {
        self.send(Message::SetLevel(level));
    }

    /// Logs a message with a log level.
    pub fn log(&self, level: Level, msg: String) {
        self.send(Message::Log(level, msg));
    }

    fn send(&self, message: Message) {
        // The writer thread only exits when every sender is gone, so this cannot fail while
        // `self` is alive; if it somehow did, there is nowhere left to report it.
        let _ = self.tx.send(message);
    }
}
