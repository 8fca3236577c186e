use crate::errors::{Result, ScriptError};

/// Instruction sets whose return register is known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    I386,
    Arm64,
}

impl Arch {
    /// Detect the architecture from a target triple like `arm64-apple-ios`
    ///
    /// # Errors
    ///
    /// Fails with [`UnsupportedArchitecture`](ScriptError::UnsupportedArchitecture) if the
    /// triple names none of the known architectures.
    pub fn from_triple(triple: &str) -> Result<Self> {
        if triple.contains("x86_64") {
            Ok(Arch::X86_64)
        } else if triple.contains("i386") {
            Ok(Arch::I386)
        } else if triple.contains("arm64") {
            Ok(Arch::Arm64)
        } else {
            Err(ScriptError::UnsupportedArchitecture(triple.to_string()))
        }
    }

    /// Register holding the return value right after a function returned, as the debugger
    /// expression parser spells it
    pub fn return_register(self) -> &'static str {
        match self {
            Arch::X86_64 => "$rax",
            Arch::I386 => "$eax",
            Arch::Arm64 => "$x0",
        }
    }
}

pub fn return_register(triple: &str) -> Result<&'static str> {
    Ok(Arch::from_triple(triple)?.return_register())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_known_triples() {
        assert_eq!(return_register("arm64-apple-ios").unwrap(), "$x0");
        assert_eq!(return_register("x86_64-apple-macosx14.0.0").unwrap(), "$rax");
        assert_eq!(return_register("i386-apple-ios-simulator").unwrap(), "$eax");
        assert_eq!(Arch::from_triple("arm64e-apple-ios").unwrap(), Arch::Arm64);
    }

    #[test]
    fn test_unknown_triple() {
        let err = return_register("unknown-triple").unwrap_err();
        assert!(matches!(err, ScriptError::UnsupportedArchitecture(ref t) if t == "unknown-triple"));
    }
}
