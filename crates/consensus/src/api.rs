use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use relay_monitor_types::serde_utils::quoted_u64;
use relay_monitor_types::{BlsPublicKey, Epoch, Gwei, Hash, Root, Slot, ValidatorIndex, H256};
use reqwest::{header::ACCEPT, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

use crate::sse::SseDecoder;
use crate::{ClientConfig, ConsensusError, Result};

/// Raw `data` payloads of a server-sent event subscription.
pub type EventStream = BoxStream<'static, Result<String>>;

/// The subset of the beacon node API the monitor consumes.
#[async_trait]
pub trait BeaconApi: Send + Sync {
    /// Proposer duties for every slot of `epoch`.
    async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerDuty>>;
    
    /// Signed block at `slot`, or `None` when the slot was skipped.
    async fn signed_block(&self, slot: Slot) -> Result<Option<SignedBeaconBlock>>;
    
    /// Validator set of the head state, or `None` when the node has no such state.
    async fn state_validators(&self) -> Result<Option<Vec<ValidatorRecord>>>;
    
    /// Subscribe to the node's event feed for `topic`.
    async fn subscribe_events(&self, topic: &str) -> Result<EventStream>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposerDuty {
    pub pubkey: BlsPublicKey,
    #[serde(with = "quoted_u64")]
    pub validator_index: ValidatorIndex,
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconBlock {
    #[serde(with = "quoted_u64")]
    pub slot: Slot,
    #[serde(with = "quoted_u64")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: Root,
    pub state_root: Root,
    pub body: BeaconBlockBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeaconBlockBody {
    /// Absent before the merge.
    #[serde(default)]
    pub execution_payload: Option<ExecutionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPayload {
    pub parent_hash: Hash,
    pub block_hash: Hash,
    #[serde(with = "quoted_u64")]
    pub block_number: u64,
}

impl SignedBeaconBlock {
    pub fn execution_block_hash(&self) -> Result<Hash> {
        self.message
            .body
            .execution_payload
            .as_ref()
            .map(|payload| payload.block_hash)
            .ok_or(ConsensusError::MissingExecutionPayload(self.message.slot))
    }
}

/// Entry of the head-state validator listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    #[serde(with = "quoted_u64")]
    pub index: ValidatorIndex,
    #[serde(with = "quoted_u64")]
    pub balance: Gwei,
    pub status: String,
    pub validator: Validator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub pubkey: BlsPublicKey,
    pub withdrawal_credentials: H256,
    #[serde(with = "quoted_u64")]
    pub effective_balance: Gwei,
    pub slashed: bool,
    #[serde(with = "quoted_u64")]
    pub activation_eligibility_epoch: Epoch,
    #[serde(with = "quoted_u64")]
    pub activation_epoch: Epoch,
    #[serde(with = "quoted_u64")]
    pub exit_epoch: Epoch,
    #[serde(with = "quoted_u64")]
    pub withdrawable_epoch: Epoch,
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// Beacon node API over HTTP.
pub struct HttpBeaconApi {
    client: Client,
    stream_client: Client,
    endpoint: String,
}

impl HttpBeaconApi {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .build()?;
        
        // Event subscriptions are long lived, so only the connect phase is bounded
        let stream_client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;
        
        Ok(Self {
            client,
            stream_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
    
    async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.endpoint, path);
        debug!(%url, "beacon api request");
        
        self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ConsensusError::Transport(e.to_string()))
    }
    
    async fn decode<R: DeserializeOwned>(response: Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            return Err(ConsensusError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        
        let body = response
            .bytes()
            .await
            .map_err(|e| ConsensusError::Transport(e.to_string()))?;
        
        serde_json::from_slice(&body).map_err(|e| ConsensusError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BeaconApi for HttpBeaconApi {
    async fn proposer_duties(&self, epoch: Epoch) -> Result<Vec<ProposerDuty>> {
        let path = format!("/eth/v1/validator/duties/proposer/{}", epoch);
        let response = self.get(&path).await?;
        
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return Err(ConsensusError::NodeSyncing { epoch });
        }
        
        let duties: DataResponse<Vec<ProposerDuty>> = Self::decode(response).await?;
        Ok(duties.data)
    }
    
    async fn signed_block(&self, slot: Slot) -> Result<Option<SignedBeaconBlock>> {
        let path = format!("/eth/v2/beacon/blocks/{}", slot);
        let response = self.get(&path).await?;
        
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        
        let block: DataResponse<SignedBeaconBlock> = Self::decode(response).await?;
        Ok(Some(block.data))
    }
    
    async fn state_validators(&self) -> Result<Option<Vec<ValidatorRecord>>> {
        let response = self.get("/eth/v1/beacon/states/head/validators").await?;
        
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        
        let validators: DataResponse<Vec<ValidatorRecord>> = Self::decode(response).await?;
        Ok(Some(validators.data))
    }
    
    async fn subscribe_events(&self, topic: &str) -> Result<EventStream> {
        let url = format!("{}/eth/v1/events?topics={}", self.endpoint, topic);
        
        let response = self
            .stream_client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ConsensusError::Transport(e.to_string()))?;
        
        let status = response.status();
        if !status.is_success() {
            return Err(ConsensusError::Status {
                status: status.as_u16(),
                url,
            });
        }
        
        let body = Box::pin(response.bytes_stream());
        let events = stream::unfold(
            (body, SseDecoder::new(), VecDeque::new()),
            |(mut body, mut decoder, mut pending)| async move {
                loop {
                    if let Some(event) = pending.pop_front() {
                        return Some((Ok(event), (body, decoder, pending)));
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => pending.extend(decoder.push(&chunk)),
                        Some(Err(e)) => {
                            let err = ConsensusError::Transport(e.to_string());
                            return Some((Err(err), (body, decoder, pending)));
                        }
                        None => return None,
                    }
                }
            },
        );
        
        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_decode_proposer_duty() {
        let json = format!(
            r#"{{"pubkey":"0x{}","validator_index":"7","slot":"100"}}"#,
            "aa".repeat(48)
        );
        let duty: ProposerDuty = serde_json::from_str(&json).unwrap();
        assert_eq!(duty.slot, 100);
        assert_eq!(duty.validator_index, 7);
        assert_eq!(duty.pubkey, BlsPublicKey::repeat_byte(0xaa));
    }
    
    #[test]
    fn test_block_without_payload() {
        let json = format!(
            r#"{{"message":{{"slot":"5","proposer_index":"1","parent_root":"0x{0}","state_root":"0x{0}","body":{{}}}}}}"#,
            "00".repeat(32)
        );
        let block: SignedBeaconBlock = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            block.execution_block_hash(),
            Err(ConsensusError::MissingExecutionPayload(5))
        ));
    }
}
