//! Signing of the buy transactions the FlipN API hands out.
//!
//! The API builds the transaction, this side only refreshes the blockhash,
//! makes the wallet the fee payer and signs. Legacy messages are recompiled
//! from their instructions; v0 messages cannot change payer without their
//! lookup tables, so they must already be paid by the wallet.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use core_logic::{DecodedKeypair, OperationError};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::transaction::VersionedTransaction;

fn signing_error(reason: impl Into<String>) -> OperationError {
    OperationError::Signing {
        reason: reason.into(),
    }
}

/// Decodes a base64 wire transaction, legacy or versioned.
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, OperationError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| signing_error(format!("transaction is not base64: {}", e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| signing_error(format!("malformed transaction: {}", e)))
}

pub fn to_signer(keypair: &DecodedKeypair) -> Result<Keypair, OperationError> {
    let bytes = keypair.keypair_bytes();
    Keypair::try_from(&bytes[..])
        .map_err(|e| OperationError::unexpected(format!("unusable keypair: {}", e)))
}

/// Returns the message with `blockhash` set and `payer` paying the fee.
pub fn prepare_message(
    message: VersionedMessage,
    payer: &Pubkey,
    blockhash: Hash,
) -> Result<VersionedMessage, OperationError> {
    match message {
        VersionedMessage::Legacy(legacy) => {
            let instructions = decompile(&legacy)?;
            Ok(VersionedMessage::Legacy(Message::new_with_blockhash(
                &instructions,
                Some(payer),
                &blockhash,
            )))
        }
        VersionedMessage::V0(mut v0) => {
            match v0.account_keys.first() {
                Some(current) if current == payer => {}
                current => {
                    return Err(signing_error(format!(
                        "versioned transaction is paid by {}, not the wallet {}",
                        current.map(ToString::to_string).unwrap_or_default(),
                        payer
                    )))
                }
            }
            v0.recent_blockhash = blockhash;
            Ok(VersionedMessage::V0(v0))
        }
    }
}

/// Signs with the wallet alone. Fails when the message needs other signers.
pub fn sign_message(
    message: VersionedMessage,
    signer: &Keypair,
) -> Result<VersionedTransaction, OperationError> {
    VersionedTransaction::try_new(message, &[signer])
        .map_err(|e| signing_error(format!("wallet cannot sign alone: {}", e)))
}

/// Rebuilds the instructions of a legacy message with their account roles.
fn decompile(message: &Message) -> Result<Vec<Instruction>, OperationError> {
    let keys = &message.account_keys;
    let signed = usize::from(message.header.num_required_signatures);
    let writable_signed =
        signed.saturating_sub(usize::from(message.header.num_readonly_signed_accounts));
    let writable_unsigned = keys
        .len()
        .saturating_sub(signed)
        .saturating_sub(usize::from(message.header.num_readonly_unsigned_accounts));

    let key_at = |index: u8| {
        keys.get(usize::from(index))
            .copied()
            .ok_or_else(|| signing_error(format!("account index {} out of range", index)))
    };
    let meta = |index: u8| -> Result<AccountMeta, OperationError> {
        let pubkey = key_at(index)?;
        let i = usize::from(index);
        let is_signer = i < signed;
        let is_writable = if is_signer {
            i < writable_signed
        } else {
            i - signed < writable_unsigned
        };
        Ok(AccountMeta {
            pubkey,
            is_signer,
            is_writable,
        })
    };

    message
        .instructions
        .iter()
        .map(|compiled| -> Result<Instruction, OperationError> {
            Ok(Instruction {
                program_id: key_at(compiled.program_id_index)?,
                accounts: compiled
                    .accounts
                    .iter()
                    .map(|&index| meta(index))
                    .collect::<Result<_, _>>()?,
                data: compiled.data.clone(),
            })
        })
        .collect()
}
