use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::codec::{self, MemberAction, Scanner};
use crate::core::{
    ActionType, Market, Output, PriceTicker, Proposal, ProposalContent, Transfer, TransferAction,
};
use crate::service::{block, market as market_math};
use crate::store::{StoreError, StoreTx};
use crate::worker::payee::Payee;

impl Payee {
    /// Member actions never refund: a memo that fails to parse is dropped
    /// (archived with no effect) so one malformed proposal cannot halt the
    /// loop.
    pub(super) fn handle_member_action(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        action: MemberAction,
    ) -> Result<(), StoreError> {
        let trace_id = action.trace_id.to_string();
        info!(
            member = %action.member_id,
            trace = %trace_id,
            action = ?action.action,
            "handling member action"
        );
        match action.action {
            ActionType::ProposalVote => {
                self.handle_vote(tx, output, &action.member_id, &trace_id)
            }
            ActionType::ProposalProvidePrice => {
                self.handle_provide_price(tx, output, &action.member_id, &action.body)
            }
            ActionType::ProposalAddMarket
            | ActionType::ProposalUpdateMarket
            | ActionType::ProposalWithdrawReserves
            | ActionType::ProposalInjectCTokenForMint => {
                self.handle_create_proposal(tx, output, action, &trace_id)
            }
            other => {
                warn!(action = ?other, "member sent a non-proposal action, dropping");
                Ok(())
            }
        }
    }

    fn handle_create_proposal(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        action: MemberAction,
        trace_id: &str,
    ) -> Result<(), StoreError> {
        if tx.find_proposal(trace_id).is_some() {
            // Replayed creation, the first one won.
            return Ok(());
        }

        let content = match ProposalContent::scan(action.action, &mut Scanner::new(&action.body)) {
            Ok(content) => content,
            Err(err) => {
                warn!(trace = %trace_id, error = %err, "malformed proposal payload, dropping");
                return Ok(());
            }
        };

        let mut proposal = Proposal {
            trace_id: trace_id.to_string(),
            creator: action.member_id.clone(),
            action: action.action,
            content,
            votes: vec![action.member_id],
            passed_at: None,
            version: 0,
            created_at: output.created_at,
            updated_at: output.created_at,
        };
        tx.create_proposal(proposal.clone());

        if proposal.votes.len() >= self.system.threshold {
            self.pass_proposal(tx, output, &mut proposal)?;
        }
        Ok(())
    }

    fn handle_vote(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        member_id: &str,
        trace_id: &str,
    ) -> Result<(), StoreError> {
        let Some(mut proposal) = tx.find_proposal(trace_id) else {
            warn!(trace = %trace_id, "vote for unknown proposal, dropping");
            return Ok(());
        };
        if proposal.passed_at.is_some() || proposal.has_voted(member_id) {
            // Replayed or late vote; never re-applies.
            return Ok(());
        }

        proposal.votes.push(member_id.to_string());
        if proposal.votes.len() >= self.system.threshold {
            self.pass_proposal(tx, output, &mut proposal)
        } else {
            tx.update_proposal(&mut proposal)
        }
    }

    /// Threshold reached: mark passed and apply, in the same transaction as
    /// the vote that crossed the line.
    fn pass_proposal(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        proposal: &mut Proposal,
    ) -> Result<(), StoreError> {
        proposal.passed_at = Some(output.created_at);
        tx.update_proposal(proposal)?;
        info!(trace = %proposal.trace_id, action = ?proposal.action, "proposal passed");
        self.apply_proposal(tx, output, proposal)
    }

    fn apply_proposal(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        proposal: &Proposal,
    ) -> Result<(), StoreError> {
        match (&proposal.action, &proposal.content) {
            (
                ActionType::ProposalAddMarket | ActionType::ProposalUpdateMarket,
                ProposalContent::Market(params),
            ) => {
                match tx.find_market(&params.asset_id.to_string()) {
                    Some(mut market) => {
                        market.symbol = params.symbol.clone();
                        market.ctoken_asset_id = params.ctoken_asset_id.to_string();
                        market.init_exchange_rate = params.init_exchange_rate;
                        market.reserve_factor = params.reserve_factor;
                        market.collateral_factor = params.collateral_factor;
                        market.close_factor = params.close_factor;
                        market.liquidation_incentive = params.liquidation_incentive;
                        market.base_rate = params.base_rate;
                        market.multiplier = params.multiplier;
                        market.jump_multiplier = params.jump_multiplier;
                        market.kink = params.kink;
                        market.borrow_cap = params.borrow_cap;
                        market.status = params.status;
                        tx.update_market(&mut market)?;
                    }
                    None => {
                        tx.save_market(Market {
                            asset_id: params.asset_id.to_string(),
                            ctoken_asset_id: params.ctoken_asset_id.to_string(),
                            symbol: params.symbol.clone(),
                            total_cash: Decimal::ZERO,
                            total_borrows: Decimal::ZERO,
                            reserves: Decimal::ZERO,
                            ctokens: Decimal::ZERO,
                            borrow_index: Decimal::ONE,
                            init_exchange_rate: params.init_exchange_rate,
                            reserve_factor: params.reserve_factor,
                            collateral_factor: params.collateral_factor,
                            close_factor: params.close_factor,
                            liquidation_incentive: params.liquidation_incentive,
                            base_rate: params.base_rate,
                            multiplier: params.multiplier,
                            jump_multiplier: params.jump_multiplier,
                            kink: params.kink,
                            borrow_cap: params.borrow_cap,
                            block_number: block::block_of(output.created_at),
                            status: params.status,
                            version: 0,
                            created_at: output.created_at,
                            updated_at: output.created_at,
                        });
                    }
                }
                Ok(())
            }
            (ActionType::ProposalWithdrawReserves, ProposalContent::WithdrawReserves(params)) => {
                let asset_id = params.asset_id.to_string();
                let Some(mut market) = tx.find_market(&asset_id) else {
                    warn!(asset = %asset_id, "withdraw reserves for unknown market, dropping");
                    return Ok(());
                };
                market_math::accrue_interest(tx, &mut market, output.created_at)?;
                if params.amount <= Decimal::ZERO
                    || params.amount > market.reserves
                    || params.amount > market.total_cash
                {
                    warn!(
                        asset = %asset_id,
                        amount = %params.amount,
                        reserves = %market.reserves,
                        "withdraw amount exceeds withdrawable reserves, dropping"
                    );
                    return Ok(());
                }
                market.reserves = (market.reserves - params.amount).trunc_with_scale(16);
                market.total_cash = (market.total_cash - params.amount).trunc_with_scale(16);
                tx.update_market(&mut market)?;

                let follow = Uuid::parse_str(&proposal.trace_id).unwrap_or_else(|_| Uuid::nil());
                let action = TransferAction::new(ActionType::ProposalWithdrawReserves, follow);
                tx.create_transfer(Transfer {
                    trace_id: codec::derive_trace_id(&proposal.trace_id, "withdraw-reserves"),
                    asset_id,
                    amount: params.amount.trunc_with_scale(8),
                    opponents: vec![params.opponent.to_string()],
                    threshold: 1,
                    memo: action.format(),
                    created_at: output.created_at,
                });
                Ok(())
            }
            (ActionType::ProposalInjectCTokenForMint, ProposalContent::InjectCToken { asset_id, amount }) => {
                let asset_id = asset_id.to_string();
                let Some(mut market) = tx.find_market(&asset_id) else {
                    warn!(asset = %asset_id, "ctoken injection for unknown market, dropping");
                    return Ok(());
                };
                if *amount <= Decimal::ZERO {
                    return Ok(());
                }
                market.ctokens = (market.ctokens + *amount).trunc_with_scale(16);
                tx.update_market(&mut market)?;
                Ok(())
            }
            (action, _) => {
                warn!(action = ?action, "proposal content does not match its action, dropping");
                Ok(())
            }
        }
    }

    /// Price proposals bypass the vote machinery: each member submission is
    /// one ticker for the output's price block, and the effective price is
    /// the per-block median.
    fn handle_provide_price(
        &self,
        tx: &mut StoreTx,
        output: &Output,
        member_id: &str,
        body: &[u8],
    ) -> Result<(), StoreError> {
        let mut scanner = Scanner::new(body);
        let (symbol, price) = match (scanner.read_str(), scanner.read_decimal()) {
            (Ok(symbol), Ok(price)) => (symbol, price),
            _ => {
                warn!(member = member_id, "malformed price payload, dropping");
                return Ok(());
            }
        };
        if price <= Decimal::ZERO {
            warn!(member = member_id, symbol = %symbol, price = %price, "non-positive price, dropping");
            return Ok(());
        }
        let Some(market) = tx.find_market_by_symbol(&symbol) else {
            warn!(symbol = %symbol, "price for unknown market, dropping");
            return Ok(());
        };

        tx.save_ticker(PriceTicker {
            asset_id: market.asset_id.clone(),
            symbol,
            price_block: self.prices.price_block(output.created_at),
            provider: member_id.to_string(),
            price,
            created_at: output.created_at,
        });
        Ok(())
    }
}
