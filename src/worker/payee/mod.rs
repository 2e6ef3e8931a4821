//! The payee: the single writer of lending state. Polls the output stream
//! from a persistent checkpoint, decodes each memo into a member proposal
//! or a user action and applies it inside one store transaction together
//! with the output's archive marker.

mod borrow;
mod liquidate;
mod proposal;
mod redeem;
mod supply;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::codec::{self, MemoError, UserAction};
use crate::core::{ActionType, ErrorCode, Output, System, Transfer, TransferAction, User};
use crate::service::{AccountService, AllowListService, PriceService};
use crate::store::{Db, StoreError, StoreTx, OUTPUTS_CHECKPOINT};
use crate::worker::Job;

pub struct Payee {
    db: Db,
    system: System,
    account: AccountService,
    prices: PriceService,
    allowlist: AllowListService,
    batch_limit: usize,
}

impl Payee {
    pub fn new(
        db: Db,
        system: System,
        account: AccountService,
        prices: PriceService,
        allowlist: AllowListService,
        batch_limit: usize,
    ) -> Self {
        Self {
            db,
            system,
            account,
            prices,
            allowlist,
            batch_limit,
        }
    }

    /// One poll cycle: pull outputs past the checkpoint in id order and
    /// process each. A failing output aborts the cycle with the checkpoint
    /// unchanged, so the next tick retries from the same position.
    pub fn run_once(&self) -> Result<usize, StoreError> {
        let checkpoint = self.db.get_property(OUTPUTS_CHECKPOINT);
        let outputs = self
            .db
            .view(|s| s.list_outputs(checkpoint, self.batch_limit));

        let count = outputs.len();
        for output in outputs {
            self.process_output(&output)?;
            self.db.set_property(OUTPUTS_CHECKPOINT, output.id);
        }
        Ok(count)
    }

    /// Process a single output exactly once: the archive lookup, the state
    /// changes and the archive insert share one transaction.
    pub fn process_output(&self, output: &Output) -> Result<(), StoreError> {
        self.db.transaction(|tx| {
            if tx.find_archive(&output.trace_id).is_some() {
                return Ok(());
            }
            self.handle_output(tx, output)?;
            tx.save_archive(output);
            Ok(())
        })
    }

    fn handle_output(&self, tx: &mut StoreTx, output: &Output) -> Result<(), StoreError> {
        let raw = codec::decode_base64(&output.memo);

        // Member proposal actions are authenticated by their signature. A
        // memo a member signed but we cannot parse is dropped silently so a
        // malformed proposal never halts the loop.
        match codec::decode_member_action(&raw, &self.system.members) {
            Ok(action) => return self.handle_member_action(tx, output, action),
            Err(MemoError::Unauthenticated | MemoError::TooShort) => {}
            Err(err) => {
                warn!(trace = %output.trace_id, error = %err, "malformed member memo, dropping");
                return Ok(());
            }
        }

        // Anything else must open as a user action under the system key.
        match codec::decode_user_action(&self.system.private_key, &raw) {
            Ok(action) => self.handle_user_action(tx, output, action),
            Err(err) => {
                warn!(trace = %output.trace_id, error = %err, "undecodable memo");
                if output.sender.is_empty() {
                    // Nobody to refund; consume the output.
                    return Ok(());
                }
                self.refund(
                    tx,
                    output,
                    &output.sender,
                    Uuid::nil(),
                    ActionType::RefundTransfer,
                    ErrorCode::Unknown,
                    "",
                )
            }
        }
    }

    fn handle_user_action(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        action: UserAction,
    ) -> Result<(), StoreError> {
        let user_id = if output.sender.is_empty() {
            action.reserve_user_id.to_string()
        } else {
            output.sender.clone()
        };
        tx.upsert_user(User::new(&user_id, output.created_at));

        let follow = action.follow_id;
        info!(
            trace = %output.trace_id,
            user = %user_id,
            action = ?action.action,
            "handling user action"
        );

        match action.action {
            ActionType::Supply => self.handle_supply(tx, output, &user_id, follow),
            ActionType::Borrow => self.handle_borrow(tx, output, &user_id, follow, &action.body),
            ActionType::Redeem => self.handle_redeem(tx, output, &user_id, follow),
            ActionType::Repay => self.handle_repay(tx, output, &user_id, follow),
            ActionType::Pledge => self.handle_pledge(tx, output, &user_id, follow),
            ActionType::Unpledge => {
                self.handle_unpledge(tx, output, &user_id, follow, &action.body)
            }
            ActionType::Liquidate => {
                self.handle_liquidation(tx, output, &user_id, follow, &action.body)
            }
            _ => self.refund(
                tx,
                output,
                &user_id,
                follow,
                ActionType::RefundTransfer,
                ErrorCode::Unknown,
                "",
            ),
        }
    }

    /// Queue an outbound transfer with a trace derived from the output, so
    /// replays regenerate the same payment instead of a second one.
    fn transfer_out(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        follow_id: Uuid,
        asset_id: &str,
        amount: Decimal,
        source: ActionType,
    ) -> Result<(), StoreError> {
        let action = TransferAction::new(source, follow_id);
        let trace = codec::derive_trace_id(
            &output.trace_id,
            &format!("{}.{}", follow_id, source as u8),
        );
        tx.create_transfer(Transfer {
            trace_id: trace,
            asset_id: asset_id.to_string(),
            amount,
            opponents: vec![user_id.to_string()],
            threshold: 1,
            memo: action.format(),
            created_at: output.created_at,
        });
        Ok(())
    }

    /// Business rejection: return the output's full amount to its origin,
    /// tagged with the error. The output is consumed.
    #[allow(clippy::too_many_arguments)]
    fn refund(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        follow_id: Uuid,
        source: ActionType,
        code: ErrorCode,
        message: &str,
    ) -> Result<(), StoreError> {
        warn!(
            trace = %output.trace_id,
            user = %user_id,
            code = code.code(),
            "refunding output: {code}"
        );
        let action = TransferAction::with_error(source, follow_id, code, message);
        self.queue_refund(tx, output, user_id, output.amount, action);
        Ok(())
    }

    /// Non-error partial refund (repay overpays, liquidation remainder).
    fn refund_amount(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        follow_id: Uuid,
        source: ActionType,
        amount: Decimal,
    ) {
        self.queue_refund(tx, output, user_id, amount, TransferAction::new(source, follow_id));
    }

    /// All refunds for an output share one derived trace, so at most one
    /// refund transfer can ever exist per output, replay included.
    fn queue_refund(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        user_id: &str,
        amount: Decimal,
        action: TransferAction,
    ) {
        tx.create_transfer(Transfer {
            trace_id: codec::derive_trace_id(&output.trace_id, "refund"),
            asset_id: output.asset_id.clone(),
            amount,
            opponents: vec![user_id.to_string()],
            threshold: 1,
            memo: action.format(),
            created_at: output.created_at,
        });
    }

    fn has_active_borrows(&self, tx: &StoreTx, user_id: &str) -> bool {
        tx.borrows_by_user(user_id)
            .iter()
            .any(|b| b.principal > Decimal::ZERO)
    }
}

#[async_trait]
impl Job for Payee {
    fn name(&self) -> &'static str {
        "payee"
    }

    async fn on_tick(&self) -> Result<()> {
        self.run_once()?;
        Ok(())
    }
}
