//! Waveform recording for simulation output.
//!
//! The kernel reports bridge signals through the [`WaveformRecorder`] trait.
//! [`VcdRecorder`] writes IEEE 1364 Value Change Dump text that GTKWave or
//! Surfer can open. Every bridge signal is a two-state unsigned integer, so
//! there are no `x`/`z` values to encode.

use std::collections::HashMap;
use std::io::Write;

use crate::error::SimError;

/// Sink for signal declarations and value changes.
pub trait WaveformRecorder {
    /// Declares a signal of `width` bits, referred to later by `id`.
    fn register_signal(&mut self, id: u32, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a scope; signals registered until [`end_scope`](Self::end_scope) belong to it.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the innermost open scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records `value` for signal `id` at `time_fs` femtoseconds.
    fn record_change(&mut self, time_fs: u64, id: u32, value: u64) -> Result<(), SimError>;

    /// Completes the output and flushes it.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// A declared VCD variable.
#[derive(Debug, Clone)]
struct Var {
    code: String,
    width: u32,
}

/// Where the writer is in the VCD file structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Nothing written yet.
    Empty,
    /// Header written, declarations may follow.
    Declarations,
    /// `$enddefinitions` written, value changes follow.
    Changes,
}

/// VCD writer with a 1 fs timescale.
///
/// Identifier codes are drawn from the printable ASCII range `!`..=`~`.
pub struct VcdRecorder<W: Write> {
    writer: W,
    vars: HashMap<u32, Var>,
    section: Section,
    time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            vars: HashMap::new(),
            section: Section::Empty,
            time: None,
        }
    }

    /// Consumes the recorder and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn declarations(&mut self) -> Result<(), SimError> {
        if self.section == Section::Empty {
            writeln!(self.writer, "$version trxlink bridge simulator $end")?;
            writeln!(self.writer, "$timescale 1fs $end")?;
            self.section = Section::Declarations;
        }
        Ok(())
    }

    fn changes(&mut self) -> Result<(), SimError> {
        self.declarations()?;
        if self.section == Section::Declarations {
            writeln!(self.writer, "$enddefinitions $end")?;
            self.section = Section::Changes;
        }
        Ok(())
    }

    /// Identifier code for the `index`-th variable, in base 94.
    fn id_code(index: usize) -> String {
        let mut code = String::new();
        let mut rest = index;
        loop {
            code.push(char::from(b'!' + (rest % 94) as u8));
            rest /= 94;
            if rest == 0 {
                return code;
            }
            rest -= 1;
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: u32, name: &str, width: u32) -> Result<(), SimError> {
        self.declarations()?;
        let code = Self::id_code(self.vars.len());
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.vars.insert(id, Var { code, width });
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.declarations()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, time_fs: u64, id: u32, value: u64) -> Result<(), SimError> {
        let var = self.vars.get(&id).ok_or(SimError::UnknownSignal(id))?.clone();
        if self.section != Section::Changes {
            self.changes()?;
            writeln!(self.writer, "$dumpvars")?;
        }
        if self.time != Some(time_fs) {
            writeln!(self.writer, "#{time_fs}")?;
            self.time = Some(time_fs);
        }
        if var.width == 1 {
            writeln!(self.writer, "{}{}", value & 1, var.code)?;
        } else {
            writeln!(
                self.writer,
                "b{:0w$b} {}",
                value,
                var.code,
                w = var.width as usize
            )?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.changes()?;
        self.writer.flush()?;
        Ok(())
    }
}
