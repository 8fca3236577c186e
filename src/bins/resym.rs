use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use tracing::trace;

use resym::errors::ScriptError;
use resym::feedback::Feedback;
use resym::session::Session;
use resym::snapshot::{Module, Snapshot, StackLogRecord, SymbolRecord, ThreadFrame, ThreadState};
use resym::ui::cli::CliUi;
use resym::ui::parse_command;
use resym::Addr;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template = r#"{about-section}
{usage-heading} {usage}
{all-args}{tab}

{name}: v{version}
"#
)]
/// resym - symbolicate stripped Objective-C backtraces
///
/// Runs the debugger console commands (sbt, msl, lookup, bar) against a recorded snapshot of
/// a stopped debuggee.
struct Args {
    #[arg(short, long, required_unless_present = "example_snapshot")]
    /// JSON snapshot of the stopped debuggee
    snapshot: Option<PathBuf>,

    #[arg(short, long)]
    /// Run a single console command and exit instead of starting the console
    command: Option<String>,

    #[arg(short, long)]
    /// Also log debug messages
    verbose: bool,

    #[arg(long)]
    /// Print an example snapshot and exit
    example_snapshot: bool,
}

fn main() -> Result<(), ScriptError> {
    human_panic::setup_panic!();
    let args = Args::parse();
    setup_logger(args.verbose);

    if args.example_snapshot {
        println!("{}", example_snapshot().to_json()?);
        exit(0);
    }

    let path = args
        .snapshot
        .ok_or_else(|| ScriptError::Usage("a snapshot is required".to_string()))?;
    let host = Snapshot::load(&path)?;
    let mut session = Session::build(host, CliUi::build()?);

    match args.command {
        Some(line) => {
            let status = parse_command(&line)?;
            match session.execute(status)? {
                Feedback::Ok => (),
                Feedback::Text(t) => print!("{t}"),
                other => println!("{other}"),
            }
        }
        None => session.run()?,
    }

    Ok(())
}

fn example_snapshot() -> Snapshot {
    let addr = |raw: u64| Addr::from(raw);
    Snapshot {
        triple: "arm64-apple-ios".to_string(),
        stopped: true,
        modules: vec![Module {
            path: "/private/var/containers/Bundle/Application/Example.app/Example".to_string(),
            symbols: vec![
                SymbolRecord {
                    name: "main".to_string(),
                    start: addr(0x1_0000_4000),
                    size: 0x60,
                    synthetic: false,
                },
                SymbolRecord {
                    name: "___lldb_unnamed_symbol1".to_string(),
                    start: addr(0x1_0000_5000),
                    size: 0x80,
                    synthetic: true,
                },
            ],
        }],
        methods: Some(vec![resym::host::MethodImpl {
            address: addr(0x1_0000_5000),
            class_name: "ViewController".to_string(),
            selector: "viewDidLoad".to_string(),
            kind: resym::host::MethodKind::Instance,
        }]),
        threads: vec![ThreadState {
            frames: vec![
                ThreadFrame {
                    address: addr(0x1_0000_5010),
                    function: None,
                },
                ThreadFrame {
                    address: addr(0x1_0000_4020),
                    function: Some("main".to_string()),
                },
            ],
            values: Default::default(),
        }],
        selected_thread: Some(0),
        stack_logging: true,
        stack_logs: vec![StackLogRecord {
            address: addr(0x6000_00c0_4000),
            frames: vec![addr(0x1_0000_5010), addr(0x1_0000_4020)],
        }],
        breakpoints: Vec::new(),
    }
}

fn setup_logger(verbose: bool) {
    // construct a subscriber that prints formatted traces to stderr
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .without_time()
        .with_file(false)
        .with_target(false)
        .finish();
    // use that subscriber to process traces emitted after this point
    tracing::subscriber::set_global_default(subscriber).expect("could not setup logger");
    trace!("set up the logger");
}
