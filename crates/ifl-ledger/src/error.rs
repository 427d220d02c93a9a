use ifl_types::InvoiceId;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The referenced invoice is not in the store. The message is the
    /// wire-visible error string callers match on.
    #[error("Invoice not found")]
    InvoiceNotFound,

    /// The invoice has already been settled; payouts and investments on a
    /// closed invoice are rejected rather than re-run.
    #[error("invoice {0} is already closed")]
    InvoiceClosed(InvoiceId),

    #[error("ledger state lock poisoned")]
    LockPoisoned,
}
