use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;
use tracing::{debug, info};

use ifl_policy::PolicyTable;
use ifl_types::{
    cents_to_usd, round2, AccountId, AckSource, Contribution, EventPayload, FileId, Invoice,
    InvoiceId, InvoiceStatus, LedgerEvent, Milestone, PayoutEntry, TokenId, TopicId,
};

use crate::error::LedgerError;
use crate::log::EventLog;
use crate::records::{Attestation, CreateInvoice, Investment, RegisterAttester, Settlement};
use crate::traits::{LedgerReader, LifecycleWriter};

/// In-memory ledger for the simulated marketplace.
///
/// The explicit state container: all invoices, escrow balances, bonds, the
/// attester registry, and the audit log live behind one `RwLock`, and every
/// lifecycle operation runs its whole read-check-write sequence under a
/// single write guard. State is created empty at construction and torn
/// down with the process; persistence is out of scope.
pub struct InMemoryLedger {
    policy: PolicyTable,
    inner: RwLock<LedgerState>,
}

/// Monotonic entity-number counters for simulated file and token ids.
struct Counters {
    file: u64,
    token: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            file: 80_000,
            token: 120_000,
        }
    }
}

impl Counters {
    fn next_file(&mut self) -> FileId {
        self.file += 1;
        FileId::new(self.file)
    }

    fn next_token(&mut self) -> TokenId {
        self.token += 1;
        TokenId::new(self.token)
    }
}

/// Well-known system accounts.
struct SystemAccounts {
    escrow: AccountId,
}

impl Default for SystemAccounts {
    fn default() -> Self {
        Self {
            escrow: AccountId::new(99_999),
        }
    }
}

#[derive(Default)]
struct LedgerState {
    /// Most recently listed first.
    invoices: Vec<Invoice>,
    log: EventLog,
    counters: Counters,
    accounts: SystemAccounts,
    /// Per fractional-claim token, per holder, minor-unit balances.
    escrow_balances: HashMap<TokenId, HashMap<AccountId, i64>>,
    /// Posted exporter bonds keyed by invoice.
    bonds: HashMap<InvoiceId, f64>,
    /// Posted attester bonds, independent of invoice-specific signing.
    attester_bonds: HashMap<AccountId, f64>,
}

impl InMemoryLedger {
    pub fn new(policy: PolicyTable) -> Self {
        Self {
            policy,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// The full audit log newest-first, for "latest activity" displays.
    pub fn events_latest_first(&self) -> Result<Vec<LedgerEvent>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.log.latest_first().cloned().collect())
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(PolicyTable::default())
    }
}

fn find_invoice<'a>(
    invoices: &'a mut [Invoice],
    id: &InvoiceId,
) -> Result<&'a mut Invoice, LedgerError> {
    invoices
        .iter_mut()
        .find(|inv| inv.id == *id)
        .ok_or(LedgerError::InvoiceNotFound)
}

/// The single acknowledgment path. Both the buyer-initiated call and an
/// attester signing the `BUYER_ACK` milestone land here, distinguished by
/// the event's source tag.
fn acknowledge(invoice: &mut Invoice, log: &mut EventLog, source: AckSource) {
    invoice.status.advance_to(InvoiceStatus::Acked);
    log.publish(EventPayload::BuyerAck {
        invoice_id: invoice.id.clone(),
        source,
    });
}

impl LifecycleWriter for InMemoryLedger {
    fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, LedgerError> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        // Coerce rather than reject: malformed face values become zero.
        let amount_usd = if input.amount_usd.is_finite() {
            input.amount_usd.max(0.0)
        } else {
            0.0
        };

        let id = InvoiceId::generate();
        let file_ids: Vec<FileId> = input
            .file_names
            .iter()
            .map(|_| state.counters.next_file())
            .collect();
        let nft_id = state.counters.next_token();
        let ft_id = state.counters.next_token();
        state.escrow_balances.insert(ft_id, HashMap::new());

        let advance_rate = self.policy.advance_rate.evaluate(input.risk, &input.file_names);

        let invoice = Invoice {
            id: id.clone(),
            buyer: input.buyer,
            amount_usd,
            maturity: input.maturity,
            risk: input.risk,
            nft_id,
            ft_id,
            file_ids,
            topic_id: TopicId::GLOBAL,
            status: InvoiceStatus::Listed,
            funded_usd: 0.0,
            advance_rate,
            bond_hbar: None,
            investors: Vec::new(),
        };

        state.invoices.insert(0, invoice.clone());
        state.log.publish(EventPayload::Listed {
            invoice_id: id.clone(),
            risk: input.risk,
            bond_hbar: 0.0,
            topic_id: TopicId::GLOBAL,
        });

        info!(invoice = %id, rate = advance_rate, "invoice listed");
        Ok(invoice)
    }

    fn post_bond(&self, invoice_id: &InvoiceId, amount_hbar: f64) -> Result<Invoice, LedgerError> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        let invoice = find_invoice(&mut state.invoices, invoice_id)?;
        // Overwrite, not accumulate: re-posting replaces the prior bond.
        invoice.bond_hbar = Some(amount_hbar);
        state.bonds.insert(invoice.id.clone(), amount_hbar);
        state.log.publish(EventPayload::BondPosted {
            invoice_id: invoice.id.clone(),
            bond_hbar: amount_hbar,
        });

        debug!(invoice = %invoice.id, bond = amount_hbar, "bond posted");
        Ok(invoice.clone())
    }

    fn invest(
        &self,
        invoice_id: &InvoiceId,
        amount_cents: i64,
        investor: AccountId,
        memo: &str,
    ) -> Result<Investment, LedgerError> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        let invoice = find_invoice(&mut state.invoices, invoice_id)?;
        if invoice.is_closed() {
            return Err(LedgerError::InvoiceClosed(invoice.id.clone()));
        }

        // Fixed transfer fee, split across the system collectors. A
        // side-channel of the transfer; funding accounting is untouched.
        state.log.publish(EventPayload::FeeDeducted {
            token_id: invoice.ft_id,
            fee_hbar: self.policy.fees.hts_custom_fixed_fee_hbar,
            collectors: self.policy.fees.split_fee(),
            memo: memo.to_string(),
        });

        // Truncate to the advance cap. Accounting is integer cents so the
        // credited total, escrow balance, and funded progress agree exactly.
        let requested_cents = amount_cents.max(0);
        let cap_cents = invoice.advance_cap_usd() as i64 * 100;
        let prior_cents: i64 = invoice.investors.iter().map(|c| c.amount).sum();
        let credited_cents = requested_cents.min((cap_cents - prior_cents).max(0));
        let total_cents = prior_cents + credited_cents;

        let escrow = state.accounts.escrow;
        let balances = state.escrow_balances.entry(invoice.ft_id).or_default();
        *balances.entry(escrow).or_insert(0) += credited_cents;

        invoice.funded_usd = cents_to_usd(total_cents);
        let threshold_cents = invoice.funding_threshold_usd() as i64 * 100;
        if total_cents >= threshold_cents {
            invoice.status.advance_to(InvoiceStatus::Funded);
        }
        invoice.investors.push(Contribution {
            account: investor,
            amount: credited_cents,
        });

        let credited_usd = cents_to_usd(credited_cents);
        state.log.publish(EventPayload::Invested {
            invoice_id: invoice.id.clone(),
            investor,
            amount: credited_usd,
            funded_usd: invoice.funded_usd,
        });

        debug!(
            invoice = %invoice.id,
            investor = %investor,
            credited = credited_usd,
            funded = invoice.funded_usd,
            "investment credited"
        );
        Ok(Investment {
            invoice: invoice.clone(),
            credited_usd,
        })
    }

    fn attester_sign(
        &self,
        attester: AccountId,
        invoice_id: &InvoiceId,
        milestone: Milestone,
    ) -> Result<Attestation, LedgerError> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        let invoice = find_invoice(&mut state.invoices, invoice_id)?;

        // First signature from an unknown attester registers it at the
        // policy minimum; the caller is told this happened.
        let implicitly_registered = match state.attester_bonds.entry(attester) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(self.policy.attester.min_bond_hbar);
                true
            }
        };

        match milestone {
            Milestone::BuyerAck => {
                acknowledge(invoice, &mut state.log, AckSource::Attester { account: attester });
            }
            other => {
                state.log.publish(EventPayload::Milestone {
                    invoice_id: invoice.id.clone(),
                    attester,
                    milestone: other,
                });
            }
        }

        debug!(invoice = %invoice.id, attester = %attester, milestone = %milestone, "milestone signed");
        Ok(Attestation {
            invoice: invoice.clone(),
            implicitly_registered,
        })
    }

    fn buyer_ack(&self, invoice_id: &InvoiceId, by: AccountId) -> Result<Invoice, LedgerError> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        let invoice = find_invoice(&mut state.invoices, invoice_id)?;
        acknowledge(invoice, &mut state.log, AckSource::Buyer { by });

        debug!(invoice = %invoice.id, by = %by, "buyer acknowledged");
        Ok(invoice.clone())
    }

    fn payout(
        &self,
        invoice_id: &InvoiceId,
        amount_paid_usd: f64,
        buyer_payment_txn: &str,
    ) -> Result<Settlement, LedgerError> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        let invoice = find_invoice(&mut state.invoices, invoice_id)?;
        if invoice.is_closed() {
            return Err(LedgerError::InvoiceClosed(invoice.id.clone()));
        }

        let escrow = state.accounts.escrow;
        let balances = state.escrow_balances.entry(invoice.ft_id).or_default();
        let total_escrow = balances.get(&escrow).copied().unwrap_or(0);

        // Pro-rata split over credited contributions, grouped by account in
        // first-contribution order. Each payout rounds independently to
        // whole cents; the total may drift from the paid amount by a few
        // cents and that drift is accepted.
        let mut payouts: Vec<PayoutEntry> = Vec::new();
        if total_escrow > 0 {
            let mut order: Vec<AccountId> = Vec::new();
            let mut grouped: HashMap<AccountId, i64> = HashMap::new();
            for contribution in &invoice.investors {
                if contribution.amount == 0 {
                    continue;
                }
                match grouped.entry(contribution.account) {
                    Entry::Occupied(mut entry) => *entry.get_mut() += contribution.amount,
                    Entry::Vacant(entry) => {
                        entry.insert(contribution.amount);
                        order.push(contribution.account);
                    }
                }
            }
            for account in order {
                let share = grouped[&account] as f64 / total_escrow as f64;
                payouts.push(PayoutEntry {
                    account,
                    usd: round2(amount_paid_usd * share),
                });
            }
        }

        balances.insert(escrow, 0);
        invoice.status.advance_to(InvoiceStatus::Closed);
        let refund_hbar = state.bonds.remove(&invoice.id).unwrap_or(0.0);

        // Consumers rely on this order in the log.
        state.log.publish(EventPayload::Paid {
            invoice_id: invoice.id.clone(),
            buyer_payment_txn: buyer_payment_txn.to_string(),
            amount_paid_usd,
        });
        state.log.publish(EventPayload::Payout {
            invoice_id: invoice.id.clone(),
            payouts: payouts.clone(),
        });
        state.log.publish(EventPayload::BondRefund {
            invoice_id: invoice.id.clone(),
            refund_hbar,
        });
        state.log.publish(EventPayload::Closed {
            invoice_id: invoice.id.clone(),
        });

        info!(
            invoice = %invoice.id,
            paid = amount_paid_usd,
            investors = payouts.len(),
            refund = refund_hbar,
            "invoice settled"
        );
        Ok(Settlement {
            invoice: invoice.clone(),
            payouts,
            refund_hbar,
        })
    }

    fn register_attester(&self, input: RegisterAttester) -> Result<AccountId, LedgerError> {
        let mut guard = self.write_state()?;
        let state = &mut *guard;

        let mut rng = rand::thread_rng();
        let attester_id = loop {
            let candidate = AccountId::new(rng.gen_range(10_000..100_000));
            if !state.attester_bonds.contains_key(&candidate) {
                break candidate;
            }
        };

        let bond_hbar = if input.bond_hbar > 0.0 {
            input.bond_hbar
        } else {
            self.policy.attester.min_bond_hbar
        };
        state.attester_bonds.insert(attester_id, bond_hbar);
        state.log.publish(EventPayload::AttesterRegistered {
            attester_id,
            org_name: input.org_name,
            bond_hbar,
        });

        info!(attester = %attester_id, bond = bond_hbar, "attester registered");
        Ok(attester_id)
    }
}

impl LedgerReader for InMemoryLedger {
    fn invoices(&self) -> Result<Vec<Invoice>, LedgerError> {
        Ok(self.read_state()?.invoices.clone())
    }

    fn invoice(&self, id: &InvoiceId) -> Result<Option<Invoice>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.invoices.iter().find(|inv| inv.id == *id).cloned())
    }

    fn events(&self) -> Result<Vec<LedgerEvent>, LedgerError> {
        Ok(self.read_state()?.log.all().to_vec())
    }

    fn recent_events(&self, n: usize) -> Result<Vec<LedgerEvent>, LedgerError> {
        Ok(self.read_state()?.log.recent(n).to_vec())
    }

    fn attester_bond(&self, account: &AccountId) -> Result<Option<f64>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.attester_bonds.get(account).copied())
    }

    fn escrow_balance(&self, token: &TokenId) -> Result<i64, LedgerError> {
        let state = self.read_state()?;
        let escrow = state.accounts.escrow;
        Ok(state
            .escrow_balances
            .get(token)
            .and_then(|balances| balances.get(&escrow))
            .copied()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use ifl_types::{usd_to_cents, EventKind, RiskTier};

    use super::*;

    fn maturity() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()
    }

    fn listing(amount_usd: f64, risk: RiskTier, file_names: &[&str]) -> CreateInvoice {
        CreateInvoice {
            buyer: "PT Nusantara Textiles".into(),
            amount_usd,
            maturity: maturity(),
            risk,
            file_names: file_names.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn investor(num: u64) -> AccountId {
        AccountId::new(num)
    }

    fn kinds_for<'a>(
        events: &'a [LedgerEvent],
        invoice_id: &'a InvoiceId,
    ) -> Vec<EventKind> {
        events
            .iter()
            .filter(|e| e.invoice_id() == Some(invoice_id))
            .map(|e| e.kind())
            .collect()
    }

    #[test]
    fn create_assigns_fresh_ids_and_lists_event() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger
            .create_invoice(listing(10_000.0, RiskTier::Green, &["po.pdf", "invoice.pdf"]))
            .unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Listed);
        assert_eq!(invoice.funded_usd, 0.0);
        assert_eq!(invoice.file_ids.len(), 2);
        assert_eq!(invoice.file_ids[0], FileId::new(80_001));
        assert_eq!(invoice.nft_id, TokenId::new(120_001));
        assert_eq!(invoice.ft_id, TokenId::new(120_002));
        assert_eq!(invoice.topic_id, TopicId::GLOBAL);
        assert!(invoice.bond_hbar.is_none());

        let events = ledger.events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::Listed);
    }

    #[test]
    fn create_inserts_at_head_of_listing() {
        let ledger = InMemoryLedger::default();
        let first = ledger.create_invoice(listing(1_000.0, RiskTier::Green, &[])).unwrap();
        let second = ledger.create_invoice(listing(2_000.0, RiskTier::Red, &[])).unwrap();

        let listed = ledger.invoices().unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn create_coerces_malformed_amounts_to_zero() {
        let ledger = InMemoryLedger::default();
        let negative = ledger.create_invoice(listing(-500.0, RiskTier::Green, &[])).unwrap();
        assert_eq!(negative.amount_usd, 0.0);
        let nan = ledger.create_invoice(listing(f64::NAN, RiskTier::Green, &[])).unwrap();
        assert_eq!(nan.amount_usd, 0.0);
    }

    #[test]
    fn advance_rate_respects_risk_cap() {
        let ledger = InMemoryLedger::default();
        for risk in [RiskTier::Green, RiskTier::Yellow, RiskTier::Red] {
            let invoice = ledger
                .create_invoice(listing(10_000.0, risk, &["po.pdf", "bol.pdf"]))
                .unwrap();
            assert!(invoice.advance_rate <= ledger.policy().advance_rate.cap_for(risk));
        }
    }

    #[test]
    fn purchase_order_evidence_raises_yellow_to_its_cap() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger
            .create_invoice(listing(10_000.0, RiskTier::Yellow, &["po.pdf", "invoice.pdf"]))
            .unwrap();
        let policy = &ledger.policy().advance_rate;
        let expected = (policy.default + policy.by_evidence.has_po).min(policy.caps_by_risk.yellow);
        assert_eq!(invoice.advance_rate, expected);
    }

    #[test]
    fn post_bond_records_and_publishes_once() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(5_000.0, RiskTier::Green, &[])).unwrap();

        let updated = ledger.post_bond(&invoice.id, 600.0).unwrap();
        assert_eq!(updated.bond_hbar, Some(600.0));
        assert_eq!(updated.status, InvoiceStatus::Listed);

        let events = ledger.events().unwrap();
        let bonds: Vec<&LedgerEvent> = events
            .iter()
            .filter(|e| e.kind() == EventKind::BondPosted)
            .collect();
        assert_eq!(bonds.len(), 1);
        match &bonds[0].payload {
            EventPayload::BondPosted { bond_hbar, .. } => assert_eq!(*bond_hbar, 600.0),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn post_bond_overwrites_prior_bond() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(5_000.0, RiskTier::Green, &[])).unwrap();
        ledger.post_bond(&invoice.id, 600.0).unwrap();
        let updated = ledger.post_bond(&invoice.id, 250.0).unwrap();
        assert_eq!(updated.bond_hbar, Some(250.0));
    }

    #[test]
    fn unknown_invoice_is_the_wire_error() {
        let ledger = InMemoryLedger::default();
        let missing: InvoiceId = "INV-ZZZ9".parse().unwrap();
        let err = ledger.post_bond(&missing, 100.0).unwrap_err();
        assert_eq!(err, LedgerError::InvoiceNotFound);
        assert_eq!(err.to_string(), "Invoice not found");
        assert!(ledger.events().unwrap().is_empty());
    }

    #[test]
    fn invest_credits_escrow_and_funding() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();

        let result = ledger
            .invest(&invoice.id, 100_000, investor(22_222), "INV|TEST")
            .unwrap();
        assert_eq!(result.credited_usd, 1_000.0);
        assert_eq!(result.invoice.funded_usd, 1_000.0);
        assert_eq!(result.invoice.investors.len(), 1);
        assert_eq!(ledger.escrow_balance(&invoice.ft_id).unwrap(), 100_000);

        let kinds: Vec<EventKind> = ledger.events().unwrap().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Listed, EventKind::FeeDeducted, EventKind::Invested]
        );
    }

    #[test]
    fn invest_fee_splits_per_policy() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();
        ledger.invest(&invoice.id, 50_000, investor(22_222), "memo").unwrap();

        let events = ledger.events().unwrap();
        let fee = events.iter().find(|e| e.kind() == EventKind::FeeDeducted).unwrap();
        match &fee.payload {
            EventPayload::FeeDeducted { fee_hbar, collectors, .. } => {
                assert_eq!(*fee_hbar, 1.0);
                assert_eq!(collectors.treasury, 0.5);
                assert_eq!(collectors.insurance_pool, 0.3);
                assert_eq!(collectors.community, 0.2);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn invest_truncates_at_the_advance_cap() {
        let ledger = InMemoryLedger::default();
        // Yellow with a purchase order: advance rate 0.80, cap $8000.
        let invoice = ledger
            .create_invoice(listing(10_000.0, RiskTier::Yellow, &["po.pdf"]))
            .unwrap();
        assert_eq!(invoice.advance_cap_usd(), 8_000.0);

        ledger.invest(&invoice.id, 795_000, investor(22_222), "m1").unwrap();
        let result = ledger
            .invest(&invoice.id, 100_000, investor(33_333), "m2")
            .unwrap();

        // $1000 requested against $50 of headroom: credited $50, not $950 more.
        assert_eq!(result.invoice.funded_usd, 8_000.0);
        assert_eq!(result.credited_usd, 50.0);
        assert_eq!(result.invoice.investors[1].amount, 5_000);
        assert_eq!(ledger.escrow_balance(&invoice.ft_id).unwrap(), 800_000);
    }

    #[test]
    fn credited_contributions_always_reconcile_with_funding() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger
            .create_invoice(listing(10_000.0, RiskTier::Yellow, &["po.pdf"]))
            .unwrap();
        ledger.invest(&invoice.id, 795_000, investor(22_222), "m1").unwrap();
        ledger.invest(&invoice.id, 100_000, investor(33_333), "m2").unwrap();

        let invoice = ledger.invoice(&invoice.id).unwrap().unwrap();
        let total: i64 = invoice.investors.iter().map(|c| c.amount).sum();
        assert_eq!(usd_to_cents(invoice.funded_usd), total);
    }

    #[test]
    fn funding_threshold_flips_status_exactly_once() {
        let ledger = InMemoryLedger::default();
        // Threshold is 20% of face value: $2000.
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();

        let below = ledger.invest(&invoice.id, 100_000, investor(1_001), "m").unwrap();
        assert_eq!(below.invoice.status, InvoiceStatus::Listed);

        let at = ledger.invest(&invoice.id, 100_000, investor(1_002), "m").unwrap();
        assert_eq!(at.invoice.status, InvoiceStatus::Funded);

        let beyond = ledger.invest(&invoice.id, 100_000, investor(1_003), "m").unwrap();
        assert_eq!(beyond.invoice.status, InvoiceStatus::Funded);
    }

    #[test]
    fn later_investment_never_demotes_an_acknowledged_invoice() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();
        ledger.buyer_ack(&invoice.id, investor(77_777)).unwrap();

        let result = ledger.invest(&invoice.id, 300_000, investor(1_001), "m").unwrap();
        assert_eq!(result.invoice.status, InvoiceStatus::Acked);
    }

    #[test]
    fn buyer_ack_publishes_sourced_event() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();

        let acked = ledger.buyer_ack(&invoice.id, investor(77_777)).unwrap();
        assert_eq!(acked.status, InvoiceStatus::Acked);

        let events = ledger.events().unwrap();
        let ack = events.iter().find(|e| e.kind() == EventKind::BuyerAck).unwrap();
        match &ack.payload {
            EventPayload::BuyerAck { source, .. } => {
                assert_eq!(source, &AckSource::Buyer { by: investor(77_777) });
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn attester_buyer_ack_routes_through_the_same_path() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();

        let attester = investor(10_500);
        let result = ledger
            .attester_sign(attester, &invoice.id, Milestone::BuyerAck)
            .unwrap();
        assert_eq!(result.invoice.status, InvoiceStatus::Acked);

        let events = ledger.events().unwrap();
        let ack = events.iter().find(|e| e.kind() == EventKind::BuyerAck).unwrap();
        match &ack.payload {
            EventPayload::BuyerAck { source, .. } => {
                assert_eq!(source, &AckSource::Attester { account: attester });
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn non_ack_milestone_leaves_status_alone() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();

        let result = ledger
            .attester_sign(investor(10_500), &invoice.id, Milestone::Pickup)
            .unwrap();
        assert_eq!(result.invoice.status, InvoiceStatus::Listed);

        let events = ledger.events().unwrap();
        let milestone = events.iter().find(|e| e.kind() == EventKind::Milestone).unwrap();
        match &milestone.payload {
            EventPayload::Milestone { milestone, .. } => {
                assert_eq!(*milestone, Milestone::Pickup);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn first_signature_implicitly_registers_at_policy_minimum() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(10_000.0, RiskTier::Green, &[])).unwrap();
        let attester = investor(10_500);

        let first = ledger
            .attester_sign(attester, &invoice.id, Milestone::Pickup)
            .unwrap();
        assert!(first.implicitly_registered);
        assert_eq!(ledger.attester_bond(&attester).unwrap(), Some(500.0));

        let second = ledger
            .attester_sign(attester, &invoice.id, Milestone::Delivery)
            .unwrap();
        assert!(!second.implicitly_registered);
    }

    #[test]
    fn register_attester_falls_back_to_minimum_bond() {
        let ledger = InMemoryLedger::default();
        let id = ledger
            .register_attester(RegisterAttester {
                org_name: "SGS Jakarta".into(),
                contact: "ops@sgs.example".into(),
                bond_hbar: 0.0,
            })
            .unwrap();
        assert_eq!(ledger.attester_bond(&id).unwrap(), Some(500.0));

        let events = ledger.events().unwrap();
        assert_eq!(events[0].kind(), EventKind::AttesterRegistered);
        match &events[0].payload {
            EventPayload::AttesterRegistered { bond_hbar, org_name, .. } => {
                assert_eq!(*bond_hbar, 500.0);
                assert_eq!(org_name, "SGS Jakarta");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn reregistration_always_mints_a_new_identifier() {
        let ledger = InMemoryLedger::default();
        let input = RegisterAttester {
            org_name: "SGS Jakarta".into(),
            contact: "ops@sgs.example".into(),
            bond_hbar: 800.0,
        };
        let first = ledger.register_attester(input.clone()).unwrap();
        let second = ledger.register_attester(input).unwrap();
        assert_ne!(first, second);
        assert_eq!(ledger.attester_bond(&second).unwrap(), Some(800.0));
    }

    #[test]
    fn payout_splits_pro_rata_and_refunds_bond() {
        let ledger = InMemoryLedger::default();
        // Green with full evidence: advance rate 0.85, cap $1700.
        let invoice = ledger
            .create_invoice(listing(2_000.0, RiskTier::Green, &["po.pdf", "bol.pdf"]))
            .unwrap();
        ledger.post_bond(&invoice.id, 600.0).unwrap();
        ledger.invest(&invoice.id, 60_000, investor(22_222), "m1").unwrap();
        ledger.invest(&invoice.id, 40_000, investor(33_333), "m2").unwrap();

        let settlement = ledger.payout(&invoice.id, 1_000.0, "0xdeadbeef").unwrap();
        assert_eq!(settlement.invoice.status, InvoiceStatus::Closed);
        assert_eq!(settlement.refund_hbar, 600.0);
        assert_eq!(settlement.payouts.len(), 2);
        assert_eq!(settlement.payouts[0].account, investor(22_222));
        assert_eq!(settlement.payouts[0].usd, 600.0);
        assert_eq!(settlement.payouts[1].account, investor(33_333));
        assert_eq!(settlement.payouts[1].usd, 400.0);
        assert_eq!(ledger.escrow_balance(&invoice.ft_id).unwrap(), 0);
    }

    #[test]
    fn payout_groups_repeat_contributions_by_account() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger
            .create_invoice(listing(2_000.0, RiskTier::Green, &["po.pdf", "bol.pdf"]))
            .unwrap();
        ledger.invest(&invoice.id, 30_000, investor(22_222), "m1").unwrap();
        ledger.invest(&invoice.id, 40_000, investor(33_333), "m2").unwrap();
        ledger.invest(&invoice.id, 30_000, investor(22_222), "m3").unwrap();

        let settlement = ledger.payout(&invoice.id, 1_000.0, "0x1").unwrap();
        assert_eq!(settlement.payouts.len(), 2);
        assert_eq!(settlement.payouts[0].usd, 600.0);
        assert_eq!(settlement.payouts[1].usd, 400.0);
    }

    #[test]
    fn payout_rounds_each_account_independently() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger
            .create_invoice(listing(2_000.0, RiskTier::Green, &["po.pdf", "bol.pdf"]))
            .unwrap();
        for num in [1_001, 1_002, 1_003] {
            ledger.invest(&invoice.id, 10_000, investor(num), "m").unwrap();
        }

        let settlement = ledger.payout(&invoice.id, 100.0, "0x1").unwrap();
        // Three equal thirds round to 33.33 each; the cent of drift against
        // the paid amount is accepted.
        for entry in &settlement.payouts {
            assert_eq!(entry.usd, 33.33);
        }
        let total: f64 = settlement.payouts.iter().map(|p| p.usd).sum();
        assert!((total - 99.99).abs() < 1e-9);
    }

    #[test]
    fn payout_without_escrow_closes_with_no_payouts() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(2_000.0, RiskTier::Green, &[])).unwrap();

        let settlement = ledger.payout(&invoice.id, 500.0, "0x1").unwrap();
        assert!(settlement.payouts.is_empty());
        assert_eq!(settlement.refund_hbar, 0.0);
        assert_eq!(settlement.invoice.status, InvoiceStatus::Closed);
    }

    #[test]
    fn settlement_events_keep_their_order() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(2_000.0, RiskTier::Green, &[])).unwrap();
        ledger.invest(&invoice.id, 20_000, investor(22_222), "m").unwrap();
        ledger.payout(&invoice.id, 200.0, "0x1").unwrap();

        let events = ledger.events().unwrap();
        let kinds = kinds_for(&events, &invoice.id);
        let tail = &kinds[kinds.len() - 4..];
        assert_eq!(
            tail,
            &[
                EventKind::Paid,
                EventKind::Payout,
                EventKind::BondRefund,
                EventKind::Closed
            ]
        );
    }

    #[test]
    fn second_payout_is_rejected_and_appends_nothing() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(2_000.0, RiskTier::Green, &[])).unwrap();
        ledger.invest(&invoice.id, 20_000, investor(22_222), "m").unwrap();
        ledger.payout(&invoice.id, 200.0, "0x1").unwrap();

        let before = ledger.events().unwrap().len();
        let err = ledger.payout(&invoice.id, 200.0, "0x2").unwrap_err();
        assert_eq!(err, LedgerError::InvoiceClosed(invoice.id.clone()));
        assert_eq!(ledger.events().unwrap().len(), before);
    }

    #[test]
    fn invest_after_close_is_rejected() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(2_000.0, RiskTier::Green, &[])).unwrap();
        ledger.payout(&invoice.id, 0.0, "0x1").unwrap();

        let err = ledger
            .invest(&invoice.id, 10_000, investor(22_222), "m")
            .unwrap_err();
        assert_eq!(err, LedgerError::InvoiceClosed(invoice.id));
    }

    #[test]
    fn recent_events_windows_the_log() {
        let ledger = InMemoryLedger::default();
        let invoice = ledger.create_invoice(listing(2_000.0, RiskTier::Green, &[])).unwrap();
        ledger.invest(&invoice.id, 10_000, investor(22_222), "m").unwrap();

        let recent = ledger.recent_events(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].kind(), EventKind::Invested);

        let newest_first = ledger.events_latest_first().unwrap();
        assert_eq!(newest_first[0].kind(), EventKind::Invested);
        assert_eq!(newest_first.last().unwrap().kind(), EventKind::Listed);
    }

    proptest! {
        // Whatever sequence of investments arrives, funding never exceeds
        // the advance cap and always equals the credited contributions.
        #[test]
        fn funding_cap_holds_under_arbitrary_investment(
            amounts in proptest::collection::vec(0i64..30_000, 1..40)
        ) {
            let ledger = InMemoryLedger::default();
            let invoice = ledger
                .create_invoice(listing(500.0, RiskTier::Yellow, &[]))
                .unwrap();
            for (i, amount) in amounts.iter().enumerate() {
                ledger
                    .invest(&invoice.id, *amount, investor(1_000 + i as u64), "m")
                    .unwrap();
            }

            let invoice = ledger.invoice(&invoice.id).unwrap().unwrap();
            let cap_cents = invoice.advance_cap_usd() as i64 * 100;
            let total: i64 = invoice.investors.iter().map(|c| c.amount).sum();
            prop_assert!(total <= cap_cents);
            prop_assert_eq!(usd_to_cents(invoice.funded_usd), total);
            prop_assert_eq!(ledger.escrow_balance(&invoice.ft_id).unwrap(), total);
            prop_assert!(invoice.funded_usd <= invoice.advance_cap_usd());
        }
    }
}
