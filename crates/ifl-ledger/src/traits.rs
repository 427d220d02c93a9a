use ifl_types::{AccountId, Invoice, InvoiceId, LedgerEvent, Milestone, TokenId};

use crate::error::LedgerError;
use crate::records::{Attestation, CreateInvoice, Investment, RegisterAttester, Settlement};

/// Write boundary for invoice lifecycle mutations.
///
/// Every operation validates against current state and the policy table,
/// mutates state, and appends one or more events to the audit log.
pub trait LifecycleWriter: Send + Sync {
    fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, LedgerError>;

    fn post_bond(&self, invoice_id: &InvoiceId, amount_hbar: f64) -> Result<Invoice, LedgerError>;

    fn invest(
        &self,
        invoice_id: &InvoiceId,
        amount_cents: i64,
        investor: AccountId,
        memo: &str,
    ) -> Result<Investment, LedgerError>;

    fn attester_sign(
        &self,
        attester: AccountId,
        invoice_id: &InvoiceId,
        milestone: Milestone,
    ) -> Result<Attestation, LedgerError>;

    fn buyer_ack(&self, invoice_id: &InvoiceId, by: AccountId) -> Result<Invoice, LedgerError>;

    fn payout(
        &self,
        invoice_id: &InvoiceId,
        amount_paid_usd: f64,
        buyer_payment_txn: &str,
    ) -> Result<Settlement, LedgerError>;

    fn register_attester(&self, input: RegisterAttester) -> Result<AccountId, LedgerError>;
}

/// Read boundary over ledger state. Readers never mutate.
pub trait LedgerReader: Send + Sync {
    /// All invoices, most recently listed first.
    fn invoices(&self) -> Result<Vec<Invoice>, LedgerError>;

    fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, LedgerError>;

    /// The full audit log in insertion order.
    fn events(&self) -> Result<Vec<LedgerEvent>, LedgerError>;

    /// The most recent `n` events, in insertion order.
    fn recent_events(&self, n: usize) -> Result<Vec<LedgerEvent>, LedgerError>;

    /// The posted bond of a registered attester, if any.
    fn attester_bond(&self, account: &AccountId) -> Result<Option<f64>, LedgerError>;

    /// Minor units of a fractional-claim token held in escrow.
    fn escrow_balance(&self, token: &TokenId) -> Result<i64, LedgerError>;
}
