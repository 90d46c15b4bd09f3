use crate::error::CResult;

/// Either half of the single-writer/multi-reader model: a snapshot-isolated
/// read transaction, or the one write transaction the environment allows at
/// a time. Dropping either without calling [`Txn::commit`] aborts it — this
/// is `heed`'s own `Drop` behaviour, so the wrapper adds nothing beyond the
/// enum indirection.
pub enum Txn<'env> {
    Read(heed::RoTxn<'env>),
    Write(heed::RwTxn<'env>),
}

impl<'env> Txn<'env> {
    pub fn is_write(&self) -> bool {
        matches!(self, Txn::Write(_))
    }

    pub fn commit(self) -> CResult<()> {
        match self {
            Txn::Read(txn) => {
                txn.commit()?;
                Ok(())
            }
            Txn::Write(txn) => {
                txn.commit()?;
                Ok(())
            }
        }
    }

    /// Reverses all in-memory intent without touching persistent state.
    /// Constant-time, matching §5's abort guarantee.
    pub fn abort(self) {
        drop(self)
    }

    pub(crate) fn as_ro(&self) -> &heed::RoTxn<'env> {
        use std::ops::Deref;
        match self {
            Txn::Read(txn) => txn,
            Txn::Write(txn) => txn.deref(),
        }
    }

    pub(crate) fn as_rw_mut(&mut self) -> CResult<&mut heed::RwTxn<'env>> {
        match self {
            Txn::Write(txn) => Ok(txn),
            Txn::Read(_) => Err(crate::error::Error::BadTxn),
        }
    }
}
