// ============================================================
// Layer 6 — Console Reporter
// ============================================================
// Prints the classic language-model training log:
//
//   | epoch   1 |   200/ 2983 batches | lr 2.00e1 | ms/batch 41.07 | loss  7.63 | ppl  2064.43
//   -----------------------------------------------------------------------------------------
//   | end of epoch   1 | time: 128.40s | valid loss  5.83 | valid ppl   341.10
//   -----------------------------------------------------------------------------------------
//   =========================================================================================
//   | End of training | test loss  5.75 | test ppl   314.89
//   =========================================================================================
//
// Generic over the writer so tests can capture the output.
//
// Reference: Rust Book §12 (Writing to Standard Output)

use anyhow::Result;
use std::io::{self, Stdout, Write};

use crate::domain::report::{EpochSummary, TestSummary, WindowReport};
use crate::domain::traits::ProgressReporter;

const RULE_WIDTH: usize = 89;

pub struct ConsoleReporter<W: Write = Stdout> {
    out: W,
}

impl ConsoleReporter<Stdout> {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for ConsoleReporter<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ConsoleReporter<W> {
    #[cfg(test)]
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn rule(&mut self, ch: char) -> Result<()> {
        writeln!(self.out, "{}", ch.to_string().repeat(RULE_WIDTH))?;
        Ok(())
    }
}

impl<W: Write> ProgressReporter for ConsoleReporter<W> {
    fn window_report(&mut self, r: &WindowReport) -> Result<()> {
        writeln!(
            self.out,
            "| epoch {:3} | {:5}/{:5} batches | lr {:.2e} | ms/batch {:5.2} | loss {:5.2} | ppl {:8.2}",
            r.epoch, r.window, r.windows_per_epoch, r.lr, r.ms_per_window, r.loss, r.ppl,
        )?;
        Ok(())
    }

    fn epoch_summary(&mut self, s: &EpochSummary) -> Result<()> {
        self.rule('-')?;
        writeln!(
            self.out,
            "| end of epoch {:3} | time: {:5.2}s | valid loss {:5.2} | valid ppl {:8.2}",
            s.epoch, s.elapsed_secs, s.val_loss, s.val_ppl,
        )?;
        self.rule('-')?;
        self.out.flush()?;
        Ok(())
    }

    fn test_summary(&mut self, s: &TestSummary) -> Result<()> {
        self.rule('=')?;
        writeln!(
            self.out,
            "| End of training | test loss {:5.2} | test ppl {:8.2}",
            s.test_loss, s.test_ppl,
        )?;
        self.rule('=')?;
        self.out.flush()?;
        Ok(())
    }
}
