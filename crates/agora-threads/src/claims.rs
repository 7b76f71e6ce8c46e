//! Claim records: one row per fact-checked claim.

use agora_types::{EvidenceItem, Verdict, VerdictStatus};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{conversion_error, ThreadError};

/// A stored fact-check verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimRecord {
    pub id: i64,
    pub thread_id: String,
    /// The facilitator message that announced the verdict.
    pub verdict_message_id: Option<String>,
    /// The user message the claim was taken from, if known.
    pub source_message_id: Option<String>,
    pub claim_text: String,
    pub status: VerdictStatus,
    pub confidence: f64,
    pub explanation: String,
    pub evidence: Vec<EvidenceItem>,
    pub created_at: String,
}

/// Parameters for recording a verdict.
#[derive(Debug, Clone)]
pub struct CreateClaimParams {
    pub thread_id: String,
    pub verdict_message_id: Option<String>,
    pub source_message_id: Option<String>,
    pub claim_text: String,
    pub verdict: Verdict,
}

const CLAIM_COLUMNS: &str = "id, thread_id, verdict_message_id, source_message_id, claim_text,
     status, confidence, explanation, evidence_json, created_at";

/// Records a verdict together with its evidence list.
pub fn insert_claim(
    conn: &Connection,
    params: &CreateClaimParams,
) -> Result<ClaimRecord, ThreadError> {
    let evidence_json = serde_json::to_string(&params.verdict.evidence)?;
    let record = conn.query_row(
        &format!(
            "INSERT INTO claims (
                thread_id, verdict_message_id, source_message_id, claim_text,
                status, confidence, explanation, evidence_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING {CLAIM_COLUMNS}"
        ),
        params![
            params.thread_id,
            params.verdict_message_id,
            params.source_message_id,
            params.claim_text,
            params.verdict.status.as_str(),
            params.verdict.confidence,
            params.verdict.explanation,
            evidence_json,
        ],
        map_row_to_claim,
    )?;
    Ok(record)
}

/// Lists a thread's claim records, newest first.
pub fn list_claims(conn: &Connection, thread_id: &str) -> Result<Vec<ClaimRecord>, ThreadError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CLAIM_COLUMNS} FROM claims
         WHERE thread_id = ?1
         ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([thread_id], map_row_to_claim)?;
    let mut claims = Vec::new();
    for row in rows {
        claims.push(row?);
    }
    Ok(claims)
}

fn map_row_to_claim(row: &Row) -> rusqlite::Result<ClaimRecord> {
    let status_str: String = row.get(5)?;
    let status: VerdictStatus = status_str.parse().map_err(|e| conversion_error(5, e))?;
    let evidence_json: String = row.get(8)?;
    let evidence: Vec<EvidenceItem> =
        serde_json::from_str(&evidence_json).map_err(|e| conversion_error(8, e))?;

    Ok(ClaimRecord {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        verdict_message_id: row.get(2)?,
        source_message_id: row.get(3)?,
        claim_text: row.get(4)?,
        status,
        confidence: row.get(6)?,
        explanation: row.get(7)?,
        evidence,
        created_at: row.get(9)?,
    })
}
