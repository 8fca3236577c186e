//! # UI Module
//!
//! Parsing of console command lines into [`Status`] values and the [`ScriptUI`] trait through
//! which a [`Session`](crate::session::Session) talks to its user.
//!
//! Command lines are split shell-style. Backslashes are kept as typed, so regular expressions
//! like `\[NSObject` reach the host unchanged. Only a backslash in front of a quote escapes it,
//! and text in single quotes is taken literally.

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use crate::addr::Addr;
use crate::breakafter::BreakAfterOptions;
use crate::errors::{Result, ScriptError};
use crate::feedback::Feedback;
use crate::lookup::LookupOptions;

#[cfg(feature = "cli")]
pub mod cli;

/// A parsed command, to be executed by the [`Session`](crate::session::Session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Symbolicate,
    StackLog { address: Addr, resymbolicate: bool },
    Lookup { query: String, options: LookupOptions },
    BreakAfter { query: String, options: BreakAfterOptions },
    EnableLogging,
    Help(String),
    Quit,
}

pub trait ScriptUI {
    /// Show `feedback` of the previous command and get the next one
    fn process(&mut self, feedback: Feedback) -> Result<Status>;

    /// Show `feedback` that did not come from a command, like a break-after report
    fn notify(&mut self, feedback: Feedback) -> Result<()>;
}

#[derive(Parser, Debug)]
#[command(name = "resym", no_binary_name = true, disable_version_flag = true)]
struct CommandLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Symbolicate the backtrace of the selected thread
    ///
    /// Recovers the names of stripped Objective-C methods through the runtime.
    Sbt,
    /// Print the stack of the most recent allocation or deallocation of an address
    ///
    /// Needs malloc stack logging, see `enable_logging`.
    Msl {
        /// Heap address, hex with 0x prefix or decimal
        address: Addr,
        /// Resymbolicate stripped Objective-C code
        #[arg(short, long)]
        resymbolicate: bool,
    },
    /// Find global functions matching a regular expression
    Lookup {
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// Show the load addresses for a particular hit
        #[arg(short = 'l', long = "load_address")]
        load_address: bool,
        /// Only show the amount of queries in the module
        #[arg(short = 's', long = "module_summary")]
        module_summary: bool,
        /// Only show hits in the module with this name
        #[arg(short, long)]
        module: Option<String>,
    },
    /// Break on functions and print the returned object after stepping out
    Bar {
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// Use a non-regex breakpoint instead
        #[arg(short = 'n', long = "non_regex")]
        non_regex: bool,
        /// Filter a breakpoint by only searching within a specified module
        #[arg(short, long)]
        module: Option<String>,
    },
    /// Turn on malloc stack logging in the debuggee
    #[command(name = "enable_logging")]
    EnableLogging,
    /// Leave the console
    #[command(visible_aliases = ["q", "exit"])]
    Quit,
}

impl From<Command> for Status {
    fn from(value: Command) -> Self {
        match value {
            Command::Sbt => Status::Symbolicate,
            Command::Msl {
                address,
                resymbolicate,
            } => Status::StackLog {
                address,
                resymbolicate,
            },
            Command::Lookup {
                query,
                load_address,
                module_summary,
                module,
            } => Status::Lookup {
                query,
                options: LookupOptions {
                    load_address,
                    module_summary,
                    module,
                },
            },
            Command::Bar {
                query,
                non_regex,
                module,
            } => Status::BreakAfter {
                query,
                options: BreakAfterOptions { non_regex, module },
            },
            Command::EnableLogging => Status::EnableLogging,
            Command::Quit => Status::Quit,
        }
    }
}

/// Parse one console line
///
/// # Errors
///
/// Fails with [`Usage`](ScriptError::Usage) if the line is empty, has unbalanced quotes or
/// does not name a known command with valid arguments.
pub fn parse_command(line: &str) -> Result<Status> {
    let escaped = keep_backslashes(line);
    let tokens = shlex::split(&escaped)
        .ok_or_else(|| ScriptError::Usage(format!("unbalanced quotes in {line:?}")))?;
    if tokens.is_empty() {
        return Err(ScriptError::Usage("no command given".to_string()));
    }

    match CommandLine::try_parse_from(tokens) {
        Ok(cl) => Ok(cl.command.into()),
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            Ok(Status::Help(e.render().to_string()))
        }
        Err(e) => Err(ScriptError::Usage(e.render().to_string())),
    }
}

/// Double every backslash that shell-style splitting would otherwise eat
///
/// A backslash in front of a quote stays an escape. Inside single quotes nothing is escaped, so
/// the text there is left alone.
fn keep_backslashes(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('\''), _) => (),
            (Some('"'), '"') => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (_, '\\') => match chars.peek() {
                Some('"') => {
                    out.push(c);
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                    continue;
                }
                Some('\'') if quote.is_none() => {
                    out.push(c);
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                    continue;
                }
                _ => out.push('\\'),
            },
            _ => (),
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_sbt_and_quit() {
        assert_eq!(parse_command("sbt").unwrap(), Status::Symbolicate);
        assert_eq!(parse_command("  quit ").unwrap(), Status::Quit);
        assert_eq!(parse_command("q").unwrap(), Status::Quit);
        assert_eq!(parse_command("enable_logging").unwrap(), Status::EnableLogging);
    }

    #[test]
    fn test_parse_msl() {
        assert_eq!(
            parse_command("msl 0x600000c04000 -r").unwrap(),
            Status::StackLog {
                address: Addr::from(0x600000c04000u64),
                resymbolicate: true
            }
        );
        assert_eq!(
            parse_command("msl 4096").unwrap(),
            Status::StackLog {
                address: Addr::from(4096u64),
                resymbolicate: false
            }
        );
        assert!(matches!(
            parse_command("msl nothex"),
            Err(ScriptError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_lookup() {
        assert_eq!(
            parse_command("lookup viewDidLoad -l --module_summary -m UIKitCore").unwrap(),
            Status::Lookup {
                query: "viewDidLoad".to_string(),
                options: LookupOptions {
                    load_address: true,
                    module_summary: true,
                    module: Some("UIKitCore".to_string()),
                }
            }
        );
    }

    #[test]
    fn test_parse_bar_keeps_backslashes() {
        assert_eq!(
            parse_command(r#"bar "\[NSObject init\]" -n --module Foundation"#).unwrap(),
            Status::BreakAfter {
                query: r"\[NSObject init\]".to_string(),
                options: BreakAfterOptions {
                    non_regex: true,
                    module: Some("Foundation".to_string()),
                }
            }
        );
        assert_eq!(
            parse_command(r"bar viewDid\w+").unwrap(),
            Status::BreakAfter {
                query: r"viewDid\w+".to_string(),
                options: BreakAfterOptions::default()
            }
        );
    }

    #[test]
    fn test_parse_quoting() {
        assert_eq!(
            parse_command(r"bar '\[NSObject init\]'").unwrap(),
            Status::BreakAfter {
                query: r"\[NSObject init\]".to_string(),
                options: BreakAfterOptions::default()
            }
        );
        assert_eq!(
            parse_command(r#"lookup "a\"b""#).unwrap(),
            Status::Lookup {
                query: r#"a"b"#.to_string(),
                options: LookupOptions::default()
            }
        );
        assert_eq!(
            parse_command(r#"lookup it\'s"#).unwrap(),
            Status::Lookup {
                query: "it's".to_string(),
                options: LookupOptions::default()
            }
        );
        assert_eq!(
            parse_command(r#"lookup "x\\d""#).unwrap(),
            Status::Lookup {
                query: r"x\\d".to_string(),
                options: LookupOptions::default()
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_command(""), Err(ScriptError::Usage(_))));
        assert!(matches!(parse_command("frobnicate"), Err(ScriptError::Usage(_))));
        assert!(matches!(parse_command("lookup"), Err(ScriptError::Usage(_))));
        assert!(matches!(
            parse_command("lookup \"unterminated"),
            Err(ScriptError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_help() {
        match parse_command("help").unwrap() {
            Status::Help(text) => assert!(text.contains("lookup")),
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(matches!(parse_command("msl --help").unwrap(), Status::Help(_)));
    }
}
