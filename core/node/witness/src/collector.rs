use std::{sync::Arc, time::Duration};

use anchor_cas::CasResolver;
use anchor_config::WitnessConfig;
use anchor_linkset::BuiltAnchor;
use anchor_policy::WitnessPolicyStore;
use anchor_store::{LogEntryStore, Outbox};
use anchor_types::{
    activity::{CREATE_TYPE, OFFER_TYPE},
    time::seconds_since_epoch,
    Activity, AnchorData, AnchorPayload, AnchorStatus, VerifiableCredential, WitnessProof,
    WitnessRole,
};
use chrono::Utc;
use rand::Rng;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    key_lock::KeyLock,
    metrics::METRICS,
    record::{AnchorWitnessRecord, WitnessRecordStore},
    vct::VctClient,
    WitnessError,
};

/// Cap of the exponential resolicitation backoff, as a multiple of the
/// base.
const BACKOFF_CAP_MULTIPLIER: u32 = 8;

/// Drives proposed anchors through witness solicitation, policy
/// evaluation and promotion to the published state.
#[derive(Debug)]
pub struct WitnessCollector {
    config: WitnessConfig,
    origin: String,
    policy_store: WitnessPolicyStore,
    records: WitnessRecordStore,
    outbox: Outbox,
    cas: CasResolver,
    vct: VctClient,
    log_entries: LogEntryStore,
    key_lock: KeyLock,
}

impl WitnessCollector {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: WitnessConfig,
        origin: String,
        policy_store: WitnessPolicyStore,
        records: WitnessRecordStore,
        outbox: Outbox,
        cas: CasResolver,
        vct: VctClient,
        log_entries: LogEntryStore,
    ) -> Self {
        Self {
            config,
            origin,
            policy_store,
            records,
            outbox,
            cas,
            vct,
            log_entries,
            key_lock: KeyLock::new(),
        }
    }

    /// Opens a witness collection record for a freshly built anchor and
    /// solicits every witness. Promotion happens immediately when the
    /// policy is already satisfied (e.g. no witnesses are required).
    pub async fn propose(
        &self,
        built: &BuiltAnchor,
        payload: &AnchorPayload,
        batch_witnesses: Vec<String>,
    ) -> Result<(), WitnessError> {
        let anchor_hashlink = built.hashlink.to_string();
        let _guard = self.key_lock.lock(&anchor_hashlink).await;

        let mut witnesses: Vec<WitnessProof> = Vec::new();
        for uri in batch_witnesses {
            if !witnesses.iter().any(|w| w.witness.uri == uri) {
                witnesses.push(WitnessProof::new(uri, WitnessRole::Batch));
            }
        }
        for uri in &self.config.system_witnesses {
            if !witnesses.iter().any(|w| &w.witness.uri == uri) {
                witnesses.push(WitnessProof::new(uri.clone(), WitnessRole::System));
            }
        }

        let mut record = AnchorWitnessRecord {
            anchor_hashlink: anchor_hashlink.clone(),
            status: AnchorStatus::Proposed,
            witnesses,
            event: built.event.clone(),
            linkset_bytes: built.linkset_bytes.clone(),
            core_index: payload.core_index.clone(),
            operation_count: payload.operation_count,
            created_at: Utc::now(),
            resolicits: 0,
            next_solicit_unix: seconds_since_epoch()
                + self.config.resolicit_backoff_secs,
            published_unix: None,
        };
        self.records.put(&record).await?;

        self.solicit(&mut record).await?;
        self.evaluate(&mut record).await?;
        Ok(())
    }

    /// Records a witness proof received via an `Accept` activity and
    /// re-evaluates the policy. Proofs are immutable once set; an
    /// unsolicited witness is rejected.
    pub async fn handle_accept(
        &self,
        anchor_hashlink: &str,
        witness_uri: &str,
        proof: serde_json::Value,
    ) -> Result<(), WitnessError> {
        let _guard = self.key_lock.lock(anchor_hashlink).await;

        let mut record = self.records.get(anchor_hashlink).await?;
        if record.status != AnchorStatus::Soliciting {
            tracing::debug!(
                "Ignoring proof from [{witness_uri}] for anchor [{anchor_hashlink}] in state {}",
                record.status
            );
            return Ok(());
        }

        let row = record
            .witnesses
            .iter_mut()
            .find(|w| w.witness.uri == witness_uri)
            .ok_or_else(|| WitnessError::UnknownWitness {
                witness: witness_uri.to_string(),
                anchor: anchor_hashlink.to_string(),
            })?;

        if row.proof.is_some() {
            tracing::warn!(
                "Witness [{witness_uri}] already proved anchor [{anchor_hashlink}]; keeping the original proof"
            );
            return Ok(());
        }

        row.proof = Some(proof);
        METRICS.proofs_received.inc();
        self.records.put(&record).await?;

        self.evaluate(&mut record).await
    }

    /// The resolicitation and archival loop.
    pub async fn run(
        self: Arc<Self>,
        mut stop_receiver: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut timer = tokio::time::interval(self.config.poll_interval());

        while !*stop_receiver.borrow_and_update() {
            tokio::select! {
                _ = timer.tick() => { /* continue iterations */ }
                _ = stop_receiver.changed() => break,
            }

            if let Err(err) = self.loop_iteration().await {
                tracing::error!("Failed to process witness collection records: {err}");
            }
        }

        tracing::info!("Stop signal received, witness collector is shutting down");
        Ok(())
    }

    pub(crate) async fn loop_iteration(&self) -> Result<(), WitnessError> {
        self.resolicit_due().await?;
        self.archive_published().await?;
        Ok(())
    }

    async fn resolicit_due(&self) -> Result<(), WitnessError> {
        let now = seconds_since_epoch();

        for stale in self.records.query_by_status(AnchorStatus::Soliciting).await? {
            let _guard = self.key_lock.lock(&stale.anchor_hashlink).await;

            // Re-read under the lock: an Accept may have raced us.
            let mut record = match self.records.get(&stale.anchor_hashlink).await {
                Ok(record) => record,
                Err(WitnessError::AnchorNotFound(_)) => continue,
                Err(err) => return Err(err),
            };
            if record.status != AnchorStatus::Soliciting || now < record.next_solicit_unix {
                continue;
            }

            let policy = self.policy_store.load().await?;
            if policy.evaluate(&record.witnesses) {
                self.promote(&mut record).await?;
                continue;
            }

            if record.resolicits >= self.config.max_resolicits {
                tracing::warn!(
                    "Rejecting anchor [{}]: policy unsatisfied after {} resolicitations",
                    record.anchor_hashlink,
                    record.resolicits
                );
                record.status = AnchorStatus::Rejected;
                self.records.put(&record).await?;
                METRICS.rejected_anchors.inc();
                continue;
            }

            record.resolicits += 1;
            record.next_solicit_unix = now + self.backoff_secs(record.resolicits);
            self.records.put(&record).await?;
            METRICS.resolicits.inc();
            self.solicit(&mut record).await?;
        }
        Ok(())
    }

    async fn archive_published(&self) -> Result<(), WitnessError> {
        let now = seconds_since_epoch();

        for published in self.records.query_by_status(AnchorStatus::Published).await? {
            let Some(published_unix) = published.published_unix else {
                continue;
            };
            if published_unix + self.config.retention_secs > now {
                continue;
            }

            let _guard = self.key_lock.lock(&published.anchor_hashlink).await;
            let mut record = match self.records.get(&published.anchor_hashlink).await {
                Ok(record) => record,
                Err(WitnessError::AnchorNotFound(_)) => continue,
                Err(err) => return Err(err),
            };
            if record.status == AnchorStatus::Published {
                record.status = AnchorStatus::Archived;
                self.records.put(&record).await?;
            }
        }
        Ok(())
    }

    /// Emits `Offer` activities to every witness still missing a proof
    /// and moves a proposed record to soliciting.
    async fn solicit(&self, record: &mut AnchorWitnessRecord) -> Result<(), WitnessError> {
        let event = serde_json::to_value(&record.event)
            .map_err(|e| WitnessError::Corrupted(e.to_string()))?;

        for row in record.witnesses.iter().filter(|w| w.proof.is_none()) {
            let offer = Activity {
                id: format!("{}/activities/{}", self.origin, Uuid::new_v4()),
                activity_type: OFFER_TYPE.to_string(),
                actor: self.origin.clone(),
                to: vec![row.witness.uri.clone()],
                object: event.clone(),
                published: Utc::now(),
            };
            self.outbox.publish(offer).await?;
            METRICS.solicitations.inc();
        }

        if record.status == AnchorStatus::Proposed {
            record.status = AnchorStatus::Soliciting;
            self.records.put(record).await?;
        }
        Ok(())
    }

    async fn evaluate(&self, record: &mut AnchorWitnessRecord) -> Result<(), WitnessError> {
        let policy = self.policy_store.load().await?;
        if policy.evaluate(&record.witnesses) {
            self.promote(record).await?;
        }
        Ok(())
    }

    /// `Soliciting -> Witnessed -> Published`: builds the witnessed
    /// credential, writes it to CAS, records the log entry and announces
    /// the anchor on the activity stream.
    async fn promote(&self, record: &mut AnchorWitnessRecord) -> Result<(), WitnessError> {
        record.status = AnchorStatus::Witnessed;
        self.records.put(record).await?;
        METRICS.witnessed_anchors.inc();

        let publish_latency = METRICS.publish_latency.start();

        let credential = self.build_credential(record);
        let credential_bytes = serde_json::to_vec(&credential)
            .map_err(|e| WitnessError::Corrupted(e.to_string()))?;

        let witnessed = self.vct.add_proof(&credential_bytes).await?;

        let witnessed_bytes = serde_json::to_vec(&witnessed)
            .map_err(|e| WitnessError::Corrupted(e.to_string()))?;
        self.cas.write(&witnessed_bytes).await?;

        let leaf = AnchorData {
            operation_count: record.operation_count,
            core_index_file_uri: record.core_index.clone(),
        };
        self.log_entries
            .append(&self.config.log_url, leaf.to_string().into_bytes())
            .await?;

        let mut event = record.event.clone();
        if let Some(attachment) = event.attachment.first_mut() {
            attachment.witness = Some(witnessed);
        }

        let create = Activity {
            id: format!("{}/activities/{}", self.origin, Uuid::new_v4()),
            activity_type: CREATE_TYPE.to_string(),
            actor: self.origin.clone(),
            to: Vec::new(),
            object: serde_json::to_value(&event)
                .map_err(|e| WitnessError::Corrupted(e.to_string()))?,
            published: Utc::now(),
        };
        self.outbox.publish(create).await?;

        record.event = event;
        record.status = AnchorStatus::Published;
        record.published_unix = Some(seconds_since_epoch());
        self.records.put(record).await?;

        publish_latency.observe();
        METRICS.published_anchors.inc();

        tracing::info!("Published anchor [{}]", record.anchor_hashlink);
        Ok(())
    }

    fn build_credential(&self, record: &AnchorWitnessRecord) -> VerifiableCredential {
        let proofs: Vec<serde_json::Value> = record
            .witnesses
            .iter()
            .filter_map(|w| w.proof.clone())
            .collect();

        VerifiableCredential {
            context: vec!["https://www.w3.org/2018/credentials/v1".to_string()],
            credential_type: vec!["VerifiableCredential".to_string()],
            issuer: self.origin.clone(),
            issuance_date: Utc::now(),
            credential_subject: serde_json::json!({ "id": record.anchor_hashlink }),
            proof: proofs,
        }
    }

    fn backoff_secs(&self, resolicits: u32) -> u64 {
        let multiplier = 2u64
            .saturating_pow(resolicits)
            .min(BACKOFF_CAP_MULTIPLIER as u64);
        let base = Duration::from_secs(self.config.resolicit_backoff_secs * multiplier);
        base.mul_f32(rand::thread_rng().gen_range(0.8..1.2)).as_secs()
    }
}
