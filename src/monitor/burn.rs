use alloy_primitives::{Address, TxHash, U256};
use tracing::{info, warn};

use crate::external::chain::TokenContract;
use crate::models::errors::BurnError;

/// How a token was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnMethod {
    /// The contract's own `burn(uint256)` call.
    Native,
    /// `transferFrom(wallet, 0x0, tokenId)` fallback for contracts without a
    /// native burn.
    TransferToNull,
}

impl BurnMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BurnMethod::Native => "native",
            BurnMethod::TransferToNull => "transfer_to_null",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BurnReceipt {
    pub tx_hash: TxHash,
    pub method: BurnMethod,
}

/// Destroy a token: try the native burn call, fall back to a transfer to the
/// null address if the native call is rejected. Both paths are irreversible;
/// the dedup gate's admit-once guarantee is what keeps this from ever running
/// twice for the same token.
pub async fn burn_token(
    chain: &dyn TokenContract,
    wallet: Address,
    contract: Address,
    token_id: U256,
) -> Result<BurnReceipt, BurnError> {
    if !chain.has_signer() {
        return Err(BurnError::NoCredential);
    }

    // Ordered attempt list: first success wins, the fallback runs only after
    // the native call fails.
    let native_err = match chain.burn(contract, token_id).await {
        Ok(tx_hash) => {
            info!("Burned token {contract}#{token_id} via native call: {tx_hash}");
            return Ok(BurnReceipt {
                tx_hash,
                method: BurnMethod::Native,
            });
        }
        Err(e) => e,
    };

    warn!(
        "Native burn rejected for {contract}#{token_id} ({native_err}), \
         falling back to null-address transfer"
    );

    match chain.transfer(contract, wallet, Address::ZERO, token_id).await {
        Ok(tx_hash) => {
            info!("Burned token {contract}#{token_id} via null-address transfer: {tx_hash}");
            Ok(BurnReceipt {
                tx_hash,
                method: BurnMethod::TransferToNull,
            })
        }
        Err(fallback_err) => Err(BurnError::Exhausted {
            native: native_err.to_string(),
            fallback: fallback_err.to_string(),
        }),
    }
}
