use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::PurchaseLedger;
use crate::error::LedgerError;
use crate::types::{PurchaseRecord, PurchaseStatus};

const INSERT_PURCHASE: &str = r#"
mutation CreatePurchase($object: purchases_insert_input!) {
  insert_purchases_one(object: $object) {
    id
  }
}
"#;

const PURCHASE_BY_TX_REF: &str = r#"
query PurchaseByTxRef($tx_ref: String!) {
  purchases(where: {chapa_tx_id: {_eq: $tx_ref}}, limit: 1) {
    id
    user_id
    recipe_id
    chapa_tx_id
    amount
    status
    created_at
  }
}
"#;

const TRANSITION_PURCHASE: &str = r#"
mutation TransitionPurchase($tx_ref: String!, $from: [String!]!, $to: String!) {
  update_purchases(
    where: {chapa_tx_id: {_eq: $tx_ref}, status: {_in: $from}}
    _set: {status: $to}
  ) {
    affected_rows
  }
}
"#;

/// Hasura code for unique/foreign key violations.
const CONSTRAINT_VIOLATION: &str = "constraint-violation";

/// Connection settings for the Hasura GraphQL engine.
#[derive(Clone)]
pub struct HasuraConfig {
    /// Full GraphQL endpoint, e.g. `https://hasura.example.com/v1/graphql`
    pub endpoint: String,
    pub admin_secret: String,
}

impl std::fmt::Debug for HasuraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HasuraConfig")
            .field("endpoint", &self.endpoint)
            .field("admin_secret", &"[REDACTED]")
            .finish()
    }
}

/// Purchase ledger backed by a Hasura `purchases` table.
pub struct HasuraLedger {
    client: reqwest::Client,
    config: HasuraConfig,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

#[derive(Deserialize)]
struct PurchaseRow {
    id: Uuid,
    user_id: String,
    recipe_id: String,
    chapa_tx_id: String,
    amount: Decimal,
    status: PurchaseStatus,
    created_at: DateTime<Utc>,
}

impl From<PurchaseRow> for PurchaseRecord {
    fn from(row: PurchaseRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            recipe_id: row.recipe_id,
            tx_ref: row.chapa_tx_id,
            amount: row.amount,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Deserialize)]
struct PurchasesData {
    purchases: Vec<PurchaseRow>,
}

#[derive(Deserialize)]
struct UpdateData {
    update_purchases: Option<AffectedRows>,
}

#[derive(Deserialize)]
struct AffectedRows {
    affected_rows: u64,
}

impl HasuraLedger {
    /// `client` is the process-wide HTTP client; its timeout bounds every call.
    pub fn new(client: reqwest::Client, config: HasuraConfig) -> Self {
        Self { client, config }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, LedgerError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-hasura-admin-secret", &self.config.admin_secret)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "hasura returned non-success status");
            return Err(LedgerError::Status {
                status: status.as_u16(),
            });
        }

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| LedgerError::Decode(e.to_string()))?;

        if let Some(first) = body.errors.first() {
            let code = first
                .extensions
                .as_ref()
                .and_then(|ext| ext.get("code"))
                .and_then(Value::as_str);
            if code == Some(CONSTRAINT_VIOLATION) {
                return Err(LedgerError::Duplicate(first.message.clone()));
            }
            let messages: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(LedgerError::Query(messages.join("; ")));
        }

        body.data
            .ok_or_else(|| LedgerError::Decode("response has neither data nor errors".to_string()))
    }
}

/// Integral amounts go out as JSON integers so integer columns accept them.
fn amount_json(amount: Decimal) -> Value {
    let normalized = amount.normalize().to_string();
    serde_json::from_str(&normalized).unwrap_or(Value::String(normalized))
}

#[async_trait]
impl PurchaseLedger for HasuraLedger {
    async fn create_purchase(&self, record: &PurchaseRecord) -> Result<(), LedgerError> {
        let variables = json!({
            "object": {
                "id": record.id,
                "user_id": record.user_id,
                "recipe_id": record.recipe_id,
                "chapa_tx_id": record.tx_ref,
                "amount": amount_json(record.amount),
                "status": record.status,
                "created_at": record.created_at.to_rfc3339(),
            }
        });
        let _: Value = self.execute(INSERT_PURCHASE, variables).await?;
        Ok(())
    }

    async fn find_by_tx_ref(&self, tx_ref: &str) -> Result<Option<PurchaseRecord>, LedgerError> {
        let data: PurchasesData = self
            .execute(PURCHASE_BY_TX_REF, json!({ "tx_ref": tx_ref }))
            .await?;
        Ok(data.purchases.into_iter().next().map(PurchaseRecord::from))
    }

    async fn transition(
        &self,
        tx_ref: &str,
        from: &[PurchaseStatus],
        to: PurchaseStatus,
    ) -> Result<u64, LedgerError> {
        let from: Vec<&str> = from.iter().map(PurchaseStatus::as_str).collect();
        let data: UpdateData = self
            .execute(
                TRANSITION_PURCHASE,
                json!({ "tx_ref": tx_ref, "from": from, "to": to.as_str() }),
            )
            .await?;
        Ok(data.update_purchases.map(|u| u.affected_rows).unwrap_or(0))
    }
}
