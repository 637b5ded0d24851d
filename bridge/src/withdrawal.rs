// Copyright (c) Tablechain, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Withdrawal ledger and signer: burn-and-authorize.
//!
//! Creating a request burns the balance immediately and allocates a replay
//! nonce; signing produces the portable authorization the L2 contract
//! verifies; completion is best-effort bookkeeping once the external claim is
//! observed. Requests move `pending → signed → completed` and never backward;
//! there is no cancel because the burn already happened.

use crate::crypto::{parse_withdrawal_nonce, WithdrawalSigner};
use crate::error::{BridgeError, BridgeResult};
use crate::events::BridgeEvent;
use crate::handler::BridgeModule;
use crate::store::{Bank, BlockCtx};
use crate::types::{
    host_address_bytes, validate_external_address, WithdrawalRequest, WithdrawalStatus,
};
use tracing::{info, warn};

impl<B: Bank> BridgeModule<B> {
    /// Burn `amount` from `owner` and create a pending withdrawal request.
    /// Returns the allocated nonce.
    pub fn initiate_withdrawal(
        &mut self,
        ctx: &mut BlockCtx,
        owner: &str,
        destination: &str,
        amount: u64,
    ) -> BridgeResult<String> {
        validate_external_address(destination)?;
        if amount == 0 {
            return Err(BridgeError::InvalidAmount);
        }
        // Owner must be a well-formed host account before any balance math
        host_address_bytes(owner)?;

        let have = self.bank().spendable_balance(owner);
        if have < amount {
            return Err(BridgeError::InsufficientFunds { have, need: amount });
        }

        let nonce = self.store_mut().next_withdrawal_nonce();
        self.bank_mut().burn(owner, amount)?;

        let request = WithdrawalRequest {
            nonce: nonce.clone(),
            owner: owner.to_string(),
            destination: destination.to_string(),
            amount,
            status: WithdrawalStatus::Pending,
            signature: None,
            created_at: ctx.time,
            completed_at: 0,
        };
        self.store_mut().put_withdrawal_request(request);

        ctx.emit(BridgeEvent::WithdrawalInitiated {
            owner: owner.to_string(),
            nonce: nonce.clone(),
            amount,
            destination: destination.to_string(),
        });
        self.metrics().withdrawals_initiated.inc();

        info!(
            owner = %owner,
            nonce = %nonce,
            amount,
            destination = %destination,
            "withdrawal initiated"
        );
        Ok(nonce)
    }

    /// Sign a pending withdrawal request with the given validator key.
    ///
    /// Idempotent: an already signed (or completed) request returns its
    /// stored signature unchanged, so operator retries and replayed
    /// transactions cannot re-sign.
    pub fn sign_withdrawal(
        &mut self,
        ctx: &mut BlockCtx,
        nonce: &str,
        signer_key_hex: &str,
    ) -> BridgeResult<Vec<u8>> {
        let request = self.store().withdrawal_request(nonce)?.clone();

        if request.status != WithdrawalStatus::Pending {
            return request.signature.clone().ok_or_else(|| {
                BridgeError::InternalError(format!(
                    "withdrawal {} is {} but has no signature",
                    nonce, request.status
                ))
            });
        }

        let signer = WithdrawalSigner::from_hex(signer_key_hex)?;
        let destination = validate_external_address(&request.destination)?;
        let nonce_bytes = parse_withdrawal_nonce(nonce)?;
        let signature = signer.sign_withdrawal(&destination, request.amount, &nonce_bytes)?;

        let mut signed = request;
        signed.status = WithdrawalStatus::Signed;
        signed.signature = Some(signature.clone());
        self.store_mut().put_withdrawal_request(signed);

        ctx.emit(BridgeEvent::WithdrawalSigned {
            nonce: nonce.to_string(),
        });
        self.metrics().withdrawals_signed.inc();

        info!(nonce = %nonce, "withdrawal signed");
        Ok(signature)
    }

    /// Record that the withdrawal was claimed on the external chain.
    ///
    /// Not security-critical — the L2 contract's replay nonce is the real
    /// enforcement point. Requires a signed request; completing twice is a
    /// no-op.
    pub fn mark_withdrawal_completed(
        &mut self,
        ctx: &mut BlockCtx,
        nonce: &str,
        external_tx_ref: &str,
    ) -> BridgeResult<()> {
        let request = self.store().withdrawal_request(nonce)?.clone();

        match request.status {
            WithdrawalStatus::Completed => return Ok(()),
            WithdrawalStatus::Pending => {
                return Err(BridgeError::WithdrawalNotSigned(request.status.to_string()))
            }
            WithdrawalStatus::Signed => {}
        }

        let amount = request.amount;
        let mut completed = request;
        completed.status = WithdrawalStatus::Completed;
        completed.completed_at = ctx.time;
        self.store_mut().put_withdrawal_request(completed);

        ctx.emit(BridgeEvent::WithdrawalCompleted {
            nonce: nonce.to_string(),
            external_tx_ref: external_tx_ref.to_string(),
            amount,
        });
        self.metrics().withdrawals_completed.inc();

        info!(nonce = %nonce, external_tx_ref = %external_tx_ref, "withdrawal completed");
        Ok(())
    }

    /// Sign every pending request with the configured validator key, if one
    /// is set. Invoked from the block-end hook; individual failures are
    /// logged and left pending for the next block.
    pub fn auto_sign_pending_withdrawals(&mut self, ctx: &mut BlockCtx) -> usize {
        let Some(key) = self.config().validator_signing_key.clone() else {
            return 0;
        };

        let pending: Vec<String> = self
            .store()
            .withdrawal_requests()
            .filter(|request| request.status == WithdrawalStatus::Pending)
            .map(|request| request.nonce.clone())
            .collect();

        let mut signed = 0;
        for nonce in pending {
            match self.sign_withdrawal(ctx, &nonce, &key) {
                Ok(_) => signed += 1,
                Err(e) => {
                    warn!(nonce = %nonce, error = %e, "auto-signing failed");
                }
            }
        }
        signed
    }
}
