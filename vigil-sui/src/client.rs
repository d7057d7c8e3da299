//! Sui JSON-RPC client implementing [`Ledger`].

use crate::error::{map_signer_error, outcome_unknown};
use crate::rpc::RpcTransport;
use crate::wire::{
    self, OwnedCoin, SUI_COIN_TYPE, created_coin, dry_run_digest, parse_balance, parse_coins,
    parse_event_page, parse_object, pure_arg, split_target, tx_bytes,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use vigil_core::{
    Call, CallArg, DurationMs, EventFilter, EventId, EventPage, Ledger, LedgerError, ObjectId,
    ObjectSnapshot, Signer, SortOrder, TxResponse,
};

/// Default gas budget per transaction, in base units.
pub const DEFAULT_GAS_BUDGET: u64 = 100_000_000;

/// Default deadline for one RPC call.
pub const DEFAULT_CALL_TIMEOUT: DurationMs = DurationMs::from_secs(15);

/// Largest page requested when listing coins.
const COIN_PAGE_LIMIT: usize = 50;

/// A Sui full node reached over JSON-RPC.
///
/// # Example
///
/// ```no_run
/// use vigil_sui::SuiClient;
///
/// let client = SuiClient::new("https://fullnode.testnet.sui.io:443")
///     .gas_budget(50_000_000);
/// ```
pub struct SuiClient {
    rpc: RpcTransport,
    gas_budget: u64,
}

impl SuiClient {
    /// A client for the node at `url` with default budget and timeout.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new(), DEFAULT_CALL_TIMEOUT)
    }

    /// A client using a preconfigured HTTP client and a per-call deadline.
    #[must_use]
    pub fn with_client(url: impl Into<String>, client: reqwest::Client, timeout: DurationMs) -> Self {
        Self {
            rpc: RpcTransport::new(url.into(), client, timeout),
            gas_budget: DEFAULT_GAS_BUDGET,
        }
    }

    /// Override the gas budget.
    #[must_use]
    pub fn gas_budget(mut self, budget: u64) -> Self {
        self.gas_budget = budget;
        self
    }

    /// The node URL.
    pub fn url(&self) -> &str {
        self.rpc.url()
    }

    async fn coins(&self, owner: &str) -> Result<Vec<OwnedCoin>, LedgerError> {
        let result = self
            .rpc
            .call(
                "suix_getCoins",
                json!([owner, SUI_COIN_TYPE, Value::Null, COIN_PAGE_LIMIT]),
            )
            .await?;
        parse_coins(&result)
    }

    /// Sign and execute built transaction bytes.
    async fn execute(&self, signer: &dyn Signer, tx_bytes: String) -> Result<Value, LedgerError> {
        let signature = signer.sign(&tx_bytes).await.map_err(map_signer_error)?;
        self.send(tx_bytes, signature).await
    }

    /// Dry-run, sign and execute built transaction bytes.
    ///
    /// The dry run yields the digest before anything is sent, so a failure
    /// after sending comes back as [`LedgerError::Unconfirmed`] and the
    /// caller can look the transaction up instead of paying for it twice.
    async fn execute_tracked(
        &self,
        signer: &dyn Signer,
        tx_bytes: String,
    ) -> Result<Value, LedgerError> {
        let preview = self
            .rpc
            .call("sui_dryRunTransactionBlock", json!([tx_bytes]))
            .await?;
        let digest = dry_run_digest(&preview)?;
        let signature = signer.sign(&tx_bytes).await.map_err(map_signer_error)?;
        match self.send(tx_bytes, signature).await {
            Err(err) if outcome_unknown(&err) => {
                tracing::debug!(digest = %digest, error = %err, "transaction sent, outcome unknown");
                Err(LedgerError::Unconfirmed {
                    digest,
                    reason: err.to_string(),
                })
            }
            other => other,
        }
    }

    async fn send(&self, tx_bytes: String, signature: String) -> Result<Value, LedgerError> {
        self.rpc
            .call(
                "sui_executeTransactionBlock",
                json!([
                    tx_bytes,
                    [signature],
                    {
                        "showEffects": true,
                        "showEvents": true,
                        "showObjectChanges": true
                    },
                    "WaitForLocalExecution"
                ]),
            )
            .await
    }

    /// Build a `paySui` from all of the sender's coins.
    async fn pay_sui(
        &self,
        owner: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<String, LedgerError> {
        let coins = self.coins(owner).await?;
        let total: u128 = coins.iter().map(|c| u128::from(c.balance)).sum();
        if coins.is_empty() || total < u128::from(amount) + u128::from(self.gas_budget) {
            return Err(LedgerError::Rejected(format!(
                "insufficient balance: {total} available, {amount} plus gas needed"
            )));
        }
        let ids: Vec<&str> = coins.iter().map(|c| c.id.as_str()).collect();
        let result = self
            .rpc
            .call(
                "unsafe_paySui",
                json!([
                    owner,
                    ids,
                    [recipient],
                    [amount.to_string()],
                    self.gas_budget.to_string()
                ]),
            )
            .await?;
        tx_bytes(&result)
    }

    /// Carve a coin of exactly `amount` out of the sender's funds.
    async fn fresh_coin(&self, signer: &dyn Signer, amount: u64) -> Result<ObjectId, LedgerError> {
        let owner = signer.address();
        let bytes = self.pay_sui(owner, owner, amount).await?;
        let response = self.execute(signer, bytes).await?;
        let status = response
            .pointer("/effects/status/status")
            .and_then(Value::as_str);
        if status != Some("success") {
            let error = response
                .pointer("/effects/status/error")
                .and_then(Value::as_str)
                .unwrap_or("unknown failure");
            return Err(LedgerError::Rejected(format!("coin split failed: {error}")));
        }
        let coin = created_coin(&response, owner)
            .ok_or_else(|| LedgerError::Decode("coin split created no coin".into()))?;
        tracing::debug!(owner, amount, coin = %coin, "split coin for call");
        Ok(coin)
    }

    async fn move_call_params(
        &self,
        signer: &dyn Signer,
        target: &str,
        args: &[CallArg],
    ) -> Result<Value, LedgerError> {
        let (package, module, function) = split_target(target)?;
        let mut arguments = Vec::with_capacity(args.len());
        for arg in args {
            let rendered = match arg {
                CallArg::Object(id) => Value::String(id.as_str().to_owned()),
                CallArg::Pure(value) => pure_arg(value),
                CallArg::Coin(amount) => {
                    Value::String(self.fresh_coin(signer, *amount).await?.as_str().to_owned())
                }
                other => {
                    return Err(LedgerError::FatalConfig(format!(
                        "unsupported call argument {other:?}"
                    )));
                }
            };
            arguments.push(rendered);
        }
        Ok(json!({
            "moveCallRequestParams": {
                "packageObjectId": package,
                "module": module,
                "function": function,
                "typeArguments": [],
                "arguments": arguments
            }
        }))
    }
}

#[async_trait]
impl Ledger for SuiClient {
    async fn query_events(
        &self,
        filter: &EventFilter,
        after: Option<&EventId>,
        order: SortOrder,
        limit: usize,
    ) -> Result<EventPage, LedgerError> {
        let params = wire::query_events_params(filter, after, order, limit)?;
        let result = self.rpc.call("suix_queryEvents", params).await?;
        parse_event_page(&result)
    }

    async fn get_object(&self, id: &ObjectId) -> Result<Option<ObjectSnapshot>, LedgerError> {
        let result = self
            .rpc
            .call(
                "sui_getObject",
                json!([id.as_str(), {"showContent": true, "showType": true}]),
            )
            .await?;
        parse_object(&result)
    }

    async fn get_balance(&self, address: &str) -> Result<u128, LedgerError> {
        let result = self
            .rpc
            .call("suix_getBalance", json!([address, SUI_COIN_TYPE]))
            .await?;
        parse_balance(&result)
    }

    async fn submit_transaction(
        &self,
        signer: &dyn Signer,
        calls: &[Call],
    ) -> Result<TxResponse, LedgerError> {
        let bytes = match calls {
            [] => return Err(LedgerError::FatalConfig("empty transaction".into())),
            [Call::Transfer { recipient, amount }] => {
                self.pay_sui(signer.address(), recipient, *amount).await?
            }
            _ => {
                let mut steps = Vec::with_capacity(calls.len());
                for call in calls {
                    match call {
                        Call::Move { target, args } => {
                            steps.push(self.move_call_params(signer, target, args).await?);
                        }
                        Call::Transfer { .. } => {
                            return Err(LedgerError::FatalConfig(
                                "transfers cannot be batched with contract calls".into(),
                            ));
                        }
                        other => {
                            return Err(LedgerError::FatalConfig(format!(
                                "unsupported call {other:?}"
                            )));
                        }
                    }
                }
                let result = self
                    .rpc
                    .call(
                        "unsafe_batchTransaction",
                        json!([
                            signer.address(),
                            steps,
                            Value::Null,
                            self.gas_budget.to_string(),
                            Value::Null
                        ]),
                    )
                    .await?;
                tx_bytes(&result)?
            }
        };
        let response = self.execute_tracked(signer, bytes).await?;
        tracing::debug!(
            digest = response.get("digest").and_then(serde_json::Value::as_str).unwrap_or_default(),
            "transaction executed"
        );
        Ok(TxResponse::new(response))
    }

    async fn transaction_status(&self, digest: &str) -> Result<Option<TxResponse>, LedgerError> {
        let outcome = self
            .rpc
            .call_raw(
                "sui_getTransactionBlock",
                json!([digest, {"showEffects": true, "showEvents": true}]),
            )
            .await?;
        match outcome {
            Ok(Value::Null) => Ok(None),
            Ok(result) => Ok(Some(TxResponse::new(result))),
            Err(fault) if wire::is_unknown_transaction(&fault.message) => Ok(None),
            Err(fault) => Err(fault.into_ledger_error()),
        }
    }
}
