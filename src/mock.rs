//! Test double around [`Snapshot`] that counts runtime introspection queries and can make
//! them fail.

use std::cell::Cell;
use std::collections::HashMap;

use crate::addr::Addr;
use crate::errors::{Result, ScriptError};
use crate::host::{
    AddressResolutionService, BreakpointInfo, BreakpointRequest, BreakpointService,
    FunctionMatch, Host, MethodImpl, MethodKind, ResolvedAddress, RuntimeIntrospectionService,
    StackLoggingService, SymbolSearchService,
};
use crate::snapshot::{Module, Snapshot, StackLogRecord, SymbolRecord, ThreadFrame, ThreadState};

pub(crate) struct MockHost {
    pub(crate) snapshot: Snapshot,
    pub(crate) fail_introspection: bool,
    introspection_calls: Cell<usize>,
}

fn addr(raw: u64) -> Addr {
    Addr::from(raw)
}

fn symbol(name: &str, start: u64, size: u64, synthetic: bool) -> SymbolRecord {
    SymbolRecord {
        name: name.to_string(),
        start: addr(start),
        size,
        synthetic,
    }
}

fn method(address: u64, class_name: &str, selector: &str, kind: MethodKind) -> MethodImpl {
    MethodImpl {
        address: addr(address),
        class_name: class_name.to_string(),
        selector: selector.to_string(),
        kind,
    }
}

impl MockHost {
    /// A stopped arm64 app whose main executable is mostly stripped
    ///
    /// | range             | symbol                                 |
    /// |-------------------|----------------------------------------|
    /// | `0x1000..0x1040`  | `foo`                                  |
    /// | `0x1040..0x1080`  | synthetic, no method starts there      |
    /// | `0x1100..0x1140`  | `-[MainViewController viewDidLoad]`    |
    /// | `0x2000..0x2100`  | synthetic, `-[ViewController viewDidLoad]` |
    /// | `0x2100..0x2180`  | synthetic, `+[ViewController sharedInstance]` |
    pub(crate) fn stripped_app() -> Self {
        let example = Module {
            path: "/private/var/containers/Bundle/Application/Example.app/Example".to_string(),
            symbols: vec![
                symbol("foo", 0x1000, 0x40, false),
                symbol("___lldb_unnamed_symbol1", 0x1040, 0x40, true),
                symbol("-[MainViewController viewDidLoad]", 0x1100, 0x40, false),
                symbol("___lldb_unnamed_symbol2", 0x2000, 0x100, true),
                symbol("___lldb_unnamed_symbol3", 0x2100, 0x80, true),
            ],
        };
        let uikit = Module {
            path: "/System/Library/PrivateFrameworks/UIKitCore.framework/UIKitCore".to_string(),
            symbols: vec![
                symbol("-[UIViewController loadView]", 0x1_8000_0000, 0x200, false),
                symbol("-[UIViewController viewDidLoad]", 0x1_8000_0200, 0x20, false),
                symbol("-[UITableViewController viewDidLoad]", 0x1_8000_0400, 0x80, false),
            ],
        };

        let methods = vec![
            method(0x2000, "ViewController", "viewDidLoad", MethodKind::Instance),
            method(0x2100, "ViewController", "sharedInstance", MethodKind::Class),
            method(
                0x3000,
                "AppDelegate",
                "application:didFinishLaunchingWithOptions:",
                MethodKind::Instance,
            ),
        ];

        let frame = |address: u64, function: &str| ThreadFrame {
            address: addr(address),
            function: Some(function.to_string()),
        };
        let thread = ThreadState {
            frames: vec![
                frame(0x2004, "-[ViewController viewDidLoad]"),
                frame(0x2100, "+[ViewController sharedInstance]"),
                frame(0x1000, "foo"),
            ],
            values: HashMap::from([(
                "$x0".to_string(),
                "<ViewController: 0x600000c04000>\n".to_string(),
            )]),
        };

        MockHost {
            snapshot: Snapshot {
                triple: "arm64-apple-ios".to_string(),
                stopped: true,
                modules: vec![example, uikit],
                methods: Some(methods),
                threads: vec![thread],
                selected_thread: Some(0),
                stack_logging: true,
                stack_logs: vec![StackLogRecord {
                    address: addr(0x6000_0000_1230),
                    frames: vec![addr(0x2004), addr(0x1050), addr(0x1000)],
                }],
                breakpoints: Vec::new(),
            },
            fail_introspection: false,
            introspection_calls: Cell::new(0),
        }
    }

    pub(crate) fn list_methods_calls(&self) -> usize {
        self.introspection_calls.get()
    }
}

impl AddressResolutionService for MockHost {
    fn is_stopped(&self) -> bool {
        self.snapshot.is_stopped()
    }

    fn resolve_address(&self, addr: Addr) -> Result<ResolvedAddress> {
        self.snapshot.resolve_address(addr)
    }
}

impl RuntimeIntrospectionService for MockHost {
    fn list_methods(&self) -> Result<Vec<MethodImpl>> {
        self.introspection_calls.set(self.introspection_calls.get() + 1);
        if self.fail_introspection {
            return Err(ScriptError::ResolutionFailure(
                "expression evaluation failed".to_string(),
            ));
        }
        self.snapshot.list_methods()
    }
}

impl SymbolSearchService for MockHost {
    fn find_functions(&self, pattern: &str) -> Result<Vec<FunctionMatch>> {
        self.snapshot.find_functions(pattern)
    }
}

impl StackLoggingService for MockHost {
    fn enable_stack_logging(&mut self) -> Result<()> {
        self.snapshot.enable_stack_logging()
    }

    fn stack_log_frames(&self, addr: Addr, max_frames: usize) -> Result<Vec<Addr>> {
        self.snapshot.stack_log_frames(addr, max_frames)
    }
}

impl BreakpointService for MockHost {
    fn create_breakpoint(&mut self, request: &BreakpointRequest) -> Result<BreakpointInfo> {
        self.snapshot.create_breakpoint(request)
    }
}

impl Host for MockHost {
    type Thread = ThreadState;

    fn triple(&self) -> &str {
        self.snapshot.triple()
    }

    fn selected_thread(&self) -> Option<&Self::Thread> {
        self.snapshot.selected_thread()
    }

    fn selected_thread_mut(&mut self) -> Option<&mut Self::Thread> {
        self.snapshot.selected_thread_mut()
    }
}
