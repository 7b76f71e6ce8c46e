//! Facilitator writes that touch more than one table.
//!
//! Each function runs in a single transaction: either every row lands or
//! none does.

use agora_types::ConversationState;
use rusqlite::Connection;

use crate::{
    create_message, insert_claim, update_conversation_state, ClaimRecord, CreateClaimParams,
    CreateMessageParams, Message, ThreadError,
};

/// Writes a summary message and the merged conversation state together.
///
/// Returns `Ok(None)` with nothing written when the stored state revision no
/// longer equals `expected_revision`.
pub fn commit_summary(
    conn: &Connection,
    message: &CreateMessageParams,
    expected_revision: u64,
    state: &ConversationState,
    last_summary_at: &str,
) -> Result<Option<Message>, ThreadError> {
    let tx = conn.unchecked_transaction()?;
    let written = create_message(&tx, message)?;
    if !update_conversation_state(
        &tx,
        &message.thread_id,
        expected_revision,
        state,
        last_summary_at,
    )? {
        tx.rollback()?;
        return Ok(None);
    }
    tx.commit()?;
    Ok(Some(written))
}

/// Writes a fact-check message and its claim record together. The claim's
/// `verdict_message_id` is set to the new message.
pub fn commit_fact_check(
    conn: &Connection,
    message: &CreateMessageParams,
    claim: &CreateClaimParams,
) -> Result<(Message, ClaimRecord), ThreadError> {
    let tx = conn.unchecked_transaction()?;
    let written = create_message(&tx, message)?;
    let record = insert_claim(
        &tx,
        &CreateClaimParams {
            verdict_message_id: Some(written.message_id.clone()),
            ..claim.clone()
        },
    )?;
    tx.commit()?;
    Ok((written, record))
}
