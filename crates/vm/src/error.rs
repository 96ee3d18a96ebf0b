//! Runtime diagnostics: a message plus the call-stack trace captured at
//! the moment the error was raised.

use std::fmt;

/// A runtime fault: the formatted message plus one trace line per live
/// call frame, top (innermost) first, matching `spec.md` §4.6/§7's
/// `[line L] in <fn-name | script>` shape. The trace is rendered while
/// the frames are still live, mirroring the reference VM's
/// `runtimeError` walking `vm->frames` before unwinding anything.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub trace: Vec<String>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        for (i, line) in self.trace.iter().enumerate() {
            if i + 1 == self.trace.len() {
                write!(f, "{}", line)?;
            } else {
                writeln!(f, "{}", line)?;
            }
        }
        Ok(())
    }
}
