//! Wire contract of a federation member.
//!
//! Each method takes a JSON body and answers with an HTTP-style status and
//! a JSON body. Every failure is a `400` carrying an [`ErrorBody`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use twinpeg_federation::{FederationCoordinator, FederationError, SignatureProvider};
use twinpeg_ledger::{ErrorKind, MaturedBlocksProvider, TransferError};
use twinpeg_types::{BlockHash, ChainTip, MaturedBlockDeposits, PublicKey, Transaction};

pub const PUSH_MATURED_BLOCKS: &str = "push_matured_blocks";
pub const PUSH_CURRENT_BLOCK_TIP: &str = "push_current_block_tip";
pub const AUTHORIZE_WITHDRAWALS: &str = "authorize_withdrawals";
pub const GET_MATURED_BLOCK_DEPOSITS: &str = "get_matured_block_deposits";

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;

// ── Request / response types ───────────────────────────────────────────

/// A body holding either one item or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMaturedBlocksResponse {
    pub next_mature_height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTipRequest {
    pub hash: BlockHash,
    pub height: u64,
    pub confirmations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTipResponse {
    pub boss: PublicKey,
    pub is_boss: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaturedBlockDepositsRequest {
    pub start_height: u64,
    pub max_blocks: usize,
}

// ── Errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    pub details: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("{0} are not served by this member")]
    NotServed(&'static str),

    #[error("response encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Federation(#[from] FederationError),
}

impl ApiError {
    /// Machine-readable error class, carried in `details`.
    pub fn details(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => kind_label(ErrorKind::Validation),
            ApiError::UnknownMethod(_) | ApiError::NotServed(_) => kind_label(ErrorKind::NotFound),
            ApiError::Encoding(_) => "internal",
            ApiError::Transfer(e) => kind_label(e.kind()),
            ApiError::Federation(e) => kind_label(e.kind()),
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: STATUS_BAD_REQUEST,
            message: self.to_string(),
            details: self.details().to_string(),
        }
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Consistency => "consistency",
        ErrorKind::Storage => "storage",
        ErrorKind::Network => "network",
    }
}

/// Status and JSON body of one answered request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }

    pub fn error(error: &ApiError) -> Self {
        let body = error.to_body();
        Self {
            status: body.status,
            body: serde_json::json!({
                "status": body.status,
                "message": body.message,
                "details": body.details,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Decode the body as `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}

// ── Dispatcher ─────────────────────────────────────────────────────────

pub struct FederationApi {
    coordinator: Arc<FederationCoordinator>,
    provider: Arc<SignatureProvider>,
    matured: Option<Arc<MaturedBlocksProvider>>,
    max_matured_blocks: usize,
}

impl FederationApi {
    /// `matured` is only present on members that watch the source chain
    /// themselves. `max_matured_blocks` caps one `get_matured_block_deposits`
    /// answer.
    pub fn new(
        coordinator: Arc<FederationCoordinator>,
        provider: Arc<SignatureProvider>,
        matured: Option<Arc<MaturedBlocksProvider>>,
        max_matured_blocks: usize,
    ) -> Self {
        Self {
            coordinator,
            provider,
            matured,
            max_matured_blocks: max_matured_blocks.max(1),
        }
    }

    /// Answer one request.
    pub async fn handle(&self, method: &str, body: Value) -> ApiResponse {
        match self.dispatch(method, body).await {
            Ok(body) => ApiResponse::ok(body),
            Err(e) => {
                tracing::warn!(method, error = %e, details = e.details(), "request rejected");
                ApiResponse::error(&e)
            }
        }
    }

    async fn dispatch(&self, method: &str, body: Value) -> Result<Value, ApiError> {
        match method {
            PUSH_MATURED_BLOCKS => {
                let blocks: OneOrMany<MaturedBlockDeposits> = parse(body)?;
                respond(self.push_matured_blocks(blocks.into_vec()).await?)
            }
            PUSH_CURRENT_BLOCK_TIP => respond(self.push_current_block_tip(parse(body)?).await?),
            AUTHORIZE_WITHDRAWALS => {
                let candidates: OneOrMany<Transaction> = parse(body)?;
                respond(self.authorize_withdrawals(candidates.into_vec()).await?)
            }
            GET_MATURED_BLOCK_DEPOSITS => {
                respond(self.get_matured_block_deposits(parse(body)?).await?)
            }
            other => Err(ApiError::UnknownMethod(other.to_string())),
        }
    }

    /// Record matured source-chain blocks pushed by the source-side node.
    pub async fn push_matured_blocks(
        &self,
        blocks: Vec<MaturedBlockDeposits>,
    ) -> Result<PushMaturedBlocksResponse, ApiError> {
        let mut store = self.coordinator.store().lock().await;
        store.record_latest_mature_deposits(&blocks)?;
        Ok(PushMaturedBlocksResponse {
            next_mature_height: store.next_mature_deposit_height()?,
        })
    }

    /// Record the source-chain tip and report the boss it implies.
    pub async fn push_current_block_tip(
        &self,
        request: BlockTipRequest,
    ) -> Result<BlockTipResponse, ApiError> {
        if request.hash.is_zero() {
            return Err(ApiError::BadRequest("block hash must not be zero".into()));
        }
        tracing::debug!(
            height = request.height,
            confirmations = request.confirmations,
            "block tip pushed"
        );
        let boss = self
            .coordinator
            .push_current_block_tip(ChainTip::new(request.hash, request.height))
            .await;
        Ok(BlockTipResponse {
            is_boss: boss == *self.coordinator.local_member(),
            boss,
        })
    }

    /// Co-sign each candidate this member authorizes; `None` for the rest.
    pub async fn authorize_withdrawals(
        &self,
        candidates: Vec<Transaction>,
    ) -> Result<Vec<Option<Transaction>>, ApiError> {
        let mut signed = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match self.provider.sign(candidate).await {
                Ok(result) => signed.push(result),
                Err(e) if e.kind() == ErrorKind::Storage => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(txid = %candidate.txid(), error = %e, "could not co-sign");
                    signed.push(None);
                }
            }
        }
        Ok(signed)
    }

    /// Matured source-chain blocks with their deposits, from `start_height`.
    pub async fn get_matured_block_deposits(
        &self,
        request: MaturedBlockDepositsRequest,
    ) -> Result<Vec<MaturedBlockDeposits>, ApiError> {
        let provider = self
            .matured
            .as_ref()
            .ok_or(ApiError::NotServed("matured block deposits"))?;
        if request.max_blocks == 0 {
            return Err(ApiError::BadRequest("max_blocks must be positive".into()));
        }
        Ok(provider.get_matured_block_deposits(
            request.start_height,
            request.max_blocks.min(self.max_matured_blocks),
        ))
    }
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn respond<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use twinpeg_types::TxHash;

    #[test]
    fn error_body_is_400_with_message_and_details() {
        let error = ApiError::Transfer(TransferError::UnknownDeposit(TxHash::new([7; 32])));
        let response = ApiResponse::error(&error);
        assert_eq!(response.status, 400);
        assert!(!response.is_success());

        let body: ErrorBody = response.parse().unwrap();
        assert_eq!(body.status, 400);
        assert_eq!(body.details, "not_found");
        assert!(body.message.contains("unknown deposit"));
    }

    #[test]
    fn details_follow_error_kind() {
        assert_eq!(ApiError::BadRequest("x".into()).details(), "validation");
        assert_eq!(ApiError::UnknownMethod("x".into()).details(), "not_found");
        assert_eq!(
            ApiError::Transfer(TransferError::HeightMismatch {
                expected: 1,
                actual: 3
            })
            .details(),
            "validation"
        );
        assert_eq!(
            ApiError::Transfer(TransferError::TemplateMismatch(TxHash::ZERO)).details(),
            "consistency"
        );
        assert_eq!(
            ApiError::Federation(FederationError::CounterChain("down".into())).details(),
            "network"
        );
    }

    #[test]
    fn one_or_many_accepts_both_shapes() {
        let one: OneOrMany<u64> = serde_json::from_value(json!(5)).unwrap();
        let many: OneOrMany<u64> = serde_json::from_value(json!([5, 6])).unwrap();
        assert_eq!(one.into_vec(), vec![5]);
        assert_eq!(many.into_vec(), vec![5, 6]);
    }

    #[test]
    fn block_tip_request_requires_all_fields() {
        let hash = BlockHash::new([9; 32]);
        let parsed: BlockTipRequest = serde_json::from_value(json!({
            "hash": hash,
            "height": 12,
            "confirmations": 3,
        }))
        .unwrap();
        assert_eq!(parsed.hash, hash);
        assert_eq!(parsed.height, 12);

        let missing = parse::<BlockTipRequest>(json!({ "height": 12 }));
        assert!(matches!(missing, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn matured_request_field_names() {
        let parsed: MaturedBlockDepositsRequest =
            serde_json::from_value(json!({ "start_height": 4, "max_blocks": 2 })).unwrap();
        assert_eq!(
            parsed,
            MaturedBlockDepositsRequest {
                start_height: 4,
                max_blocks: 2
            }
        );
    }
}
