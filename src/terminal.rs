//! OutputSink trait + bundled sinks.
//!
//! The compositor depends on this trait only. It never assumes how cells are
//! rendered, only that writes are applied in the order issued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::types::CellUpdate;

// ============================================================================
// OutputSink Trait
// ============================================================================

pub trait OutputSink: Send {
    /// Set one cell on the physical output.
    fn set_cell(&mut self, update: &CellUpdate) -> Result<()>;

    /// Reset the whole physical output to blank.
    fn clear(&mut self) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Apply a batch of writes in order.
    fn write_diff(&mut self, diff: &[CellUpdate]) -> Result<()> {
        for update in diff {
            self.set_cell(update)?;
        }
        Ok(())
    }
}

// ============================================================================
// HeadlessSink (for environments without an output device)
// ============================================================================

#[derive(Debug, Default)]
pub struct HeadlessSink;

impl OutputSink for HeadlessSink {
    fn set_cell(&mut self, _update: &CellUpdate) -> Result<()> {
        Ok(()) // Discard output
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// RecordingSink
// ============================================================================

/// What a [`RecordingSink`] observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOp {
    Set(CellUpdate),
    Clear,
    Flush,
}

/// Records every operation into a log shared with its clones.
///
/// Hand one clone to the compositor and keep another to inspect writes.
/// While failing, every operation is rejected with [`Error::Sink`] and
/// nothing is recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<SinkOp>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all operations so far.
    pub fn ops(&self) -> Vec<SinkOp> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Only the cell writes, in order.
    pub fn writes(&self) -> Vec<CellUpdate> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                SinkOp::Set(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<SinkOp> {
        self.log
            .lock()
            .map(|mut log| std::mem::take(&mut *log))
            .unwrap_or_default()
    }

    /// Cell writes recorded since the last `take`/`take_writes`, clearing the log.
    pub fn take_writes(&self) -> Vec<CellUpdate> {
        self.take()
            .into_iter()
            .filter_map(|op| match op {
                SinkOp::Set(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    /// Reject (or accept again) every following operation, on all clones.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn push(&self, op: SinkOp) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Sink(format!("recording sink rejected {op:?}")));
        }
        self.log
            .lock()
            .map_err(|_| Error::LockPoisoned("recording sink"))?
            .push(op);
        Ok(())
    }
}

impl OutputSink for RecordingSink {
    fn set_cell(&mut self, update: &CellUpdate) -> Result<()> {
        self.push(SinkOp::Set(*update))
    }

    fn clear(&mut self) -> Result<()> {
        self.push(SinkOp::Clear)
    }

    fn flush(&mut self) -> Result<()> {
        self.push(SinkOp::Flush)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn update(x: u16, ch: char) -> CellUpdate {
        CellUpdate {
            x,
            y: 0,
            cell: Cell::new(ch, None, None),
        }
    }

    #[test]
    fn test_recording_sink_shares_log_between_clones() {
        let recorder = RecordingSink::new();
        let mut sink = recorder.clone();

        sink.write_diff(&[update(0, 'a'), update(1, 'b')]).unwrap();
        sink.flush().unwrap();

        assert_eq!(recorder.writes(), vec![update(0, 'a'), update(1, 'b')]);
        assert_eq!(recorder.ops().last(), Some(&SinkOp::Flush));
    }

    #[test]
    fn test_take_writes_drains_log() {
        let recorder = RecordingSink::new();
        let mut sink = recorder.clone();
        sink.clear().unwrap();
        sink.set_cell(&update(2, 'z')).unwrap();

        assert_eq!(recorder.take_writes(), vec![update(2, 'z')]);
        assert!(recorder.ops().is_empty());
    }

    #[test]
    fn test_failing_sink_rejects_and_recovers() {
        let recorder = RecordingSink::new();
        let mut sink = recorder.clone();

        recorder.set_failing(true);
        let err = sink.write_diff(&[update(0, 'a'), update(1, 'b')]).unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
        assert!(sink.flush().is_err());
        assert!(recorder.ops().is_empty());

        recorder.set_failing(false);
        sink.set_cell(&update(0, 'a')).unwrap();
        assert_eq!(recorder.writes(), vec![update(0, 'a')]);
    }

    #[test]
    fn test_headless_sink_discards() {
        let mut sink = HeadlessSink;
        assert!(sink.write_diff(&[update(0, 'q')]).is_ok());
        assert!(sink.clear().is_ok());
    }
}
