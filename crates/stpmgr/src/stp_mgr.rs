//! StpMgr - spanning tree configuration mutator
//!
//! Every operation runs the same pipeline:
//!
//! 1. `Validating`: preconditions and field checks against the current rows.
//!    A failure moves to `Rejected` and returns without touching the store.
//! 2. `Compressing`: the validated intent becomes concrete row writes
//!    (VLAN sets are folded into range strings here).
//! 3. `Persisting`: writes are applied in order. A store failure aborts the
//!    operation and the daemon is not notified.
//! 4. `Notifying`: messages are rebuilt from the persisted rows and sent.
//!    Failure is reported in the outcome and logged, never rolled back.

use sonic_cfgmgr_common::{
    field_values, join_key, CfgMgrResult, ConfigStore, FieldValues, FieldValuesExt,
};
use std::collections::BTreeSet;
use tracing::{debug, error, info, instrument, warn};

use crate::channel::DaemonNotifier;
use crate::error::{StpError, StpResult};
use crate::ipc::{IpcMessage, Opcode};
use crate::notify::{self, Notify, DEFAULT_ROOTGUARD_TIMEOUT};
use crate::range;
use crate::state;
use crate::tables::{
    fields, keys, values, CFG_STP_PORT_TABLE_NAME, CFG_STP_TABLE_NAME, CFG_STP_VLAN_TABLE_NAME,
    CFG_XSTP_GLOBAL_TABLE_NAME, CFG_XSTP_INTERFACE_TABLE_NAME, CFG_XSTP_MST_GLOBAL_TABLE_NAME,
    CFG_XSTP_MST_INTERFACE_TABLE_NAME, CFG_XSTP_MST_TABLE_NAME, XSTP_TABLES,
};
use crate::types::{BridgeTimers, EdgeMode, LoopbackAction, StpMode};
use crate::validate::{self, to_u16, to_u32, Bound};

/// Maximum number of VLANs carried into the PVST tables.
pub const MAX_PVST_VLANS: usize = 255;

/// Loopback shutdown interval used when none is given, in seconds.
pub const DEFAULT_LBD_SHUTDOWN_INTERVAL: i64 = 60;

/// Stage of the mutation currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    Validating,
    Rejected,
    Compressing,
    Persisting,
    Notifying,
}

/// Result of the notify stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The change does not concern the daemon
    NotRequired,
    /// Every message was handed to the daemon
    Delivered { messages: Vec<IpcMessage> },
    /// Building or sending failed after the store was updated
    Failed { reason: String },
}

/// Outcome of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub notification: Notification,
}

impl MutationOutcome {
    /// Returns the warning to surface to the caller, if any.
    pub fn warning(&self) -> Option<&str> {
        match &self.notification {
            Notification::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Messages delivered to the daemon.
    pub fn messages(&self) -> &[IpcMessage] {
        match &self.notification {
            Notification::Delivered { messages } => messages,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoreWrite {
    /// Replace the row
    Set {
        table: &'static str,
        key: String,
        fields: FieldValues,
    },
    /// Merge into the row
    Modify {
        table: &'static str,
        key: String,
        fields: FieldValues,
    },
    /// Delete a row, or the table when `key` is `None`
    Delete {
        table: &'static str,
        key: Option<String>,
    },
}

impl StoreWrite {
    async fn apply(&self, store: &dyn ConfigStore) -> CfgMgrResult<()> {
        match self {
            StoreWrite::Set { table, key, fields } => store.set(table, key, fields.clone()).await,
            StoreWrite::Modify { table, key, fields } => {
                store.modify(table, key, fields.clone()).await
            }
            StoreWrite::Delete { table, key } => store.delete(table, key.as_deref()).await,
        }
    }
}

/// Validated change: the row writes plus what to tell the daemon.
#[derive(Debug)]
struct Mutation {
    writes: Vec<StoreWrite>,
    notify: Notify,
}

impl Mutation {
    fn new(notify: Notify) -> Self {
        Self {
            writes: Vec::new(),
            notify,
        }
    }

    fn set(&mut self, table: &'static str, key: impl Into<String>, fields: FieldValues) {
        self.writes.push(StoreWrite::Set {
            table,
            key: key.into(),
            fields,
        });
    }

    fn modify(&mut self, table: &'static str, key: impl Into<String>, fields: FieldValues) {
        self.writes.push(StoreWrite::Modify {
            table,
            key: key.into(),
            fields,
        });
    }

    fn delete(&mut self, table: &'static str, key: Option<String>) {
        self.writes.push(StoreWrite::Delete { table, key });
    }
}

/// Spanning tree configuration manager.
///
/// Holds no configuration of its own: every operation re-reads the store.
pub struct StpMgr<S, N> {
    store: S,
    notifier: N,
    phase: MutationPhase,
}

impl<S, N> StpMgr<S, N>
where
    S: ConfigStore,
    N: DaemonNotifier,
{
    /// Creates a manager over a store and a daemon notifier
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            phase: MutationPhase::Idle,
        }
    }

    /// Returns the backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the daemon notifier
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Returns the current mutation phase
    pub fn phase(&self) -> MutationPhase {
        self.phase
    }

    fn enter(&mut self, phase: MutationPhase) {
        debug!(from = ?self.phase, to = ?phase, "mutation phase");
        self.phase = phase;
    }

    fn begin(&mut self) {
        self.enter(MutationPhase::Validating);
    }

    async fn commit(&mut self, plan: StpResult<Mutation>) -> StpResult<MutationOutcome> {
        let mutation = match plan {
            Ok(mutation) => mutation,
            Err(e) => {
                self.enter(MutationPhase::Rejected);
                info!(error = %e, "mutation rejected");
                self.enter(MutationPhase::Idle);
                return Err(e);
            }
        };

        if self.phase != MutationPhase::Compressing {
            self.enter(MutationPhase::Compressing);
        }

        self.enter(MutationPhase::Persisting);
        for write in &mutation.writes {
            if let Err(e) = write.apply(&self.store).await {
                error!(?write, error = %e, "store write failed");
                self.enter(MutationPhase::Idle);
                return Err(e.into());
            }
        }

        self.enter(MutationPhase::Notifying);
        let notification = self.notify(&mutation.notify).await;
        self.enter(MutationPhase::Idle);

        Ok(MutationOutcome { notification })
    }

    async fn notify(&self, plan: &Notify) -> Notification {
        let messages = match notify::build(&self.store, plan).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "could not build daemon notification");
                return Notification::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if messages.is_empty() {
            return Notification::NotRequired;
        }

        for message in &messages {
            let result = match message.encode() {
                Ok(bytes) => self.notifier.deliver(&bytes).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = result {
                warn!(
                    message_type = ?message.message_type(),
                    error = %e,
                    "daemon notification failed, configuration is persisted"
                );
                return Notification::Failed {
                    reason: e.to_string(),
                };
            }
        }

        debug!(count = messages.len(), "daemon notified");
        Notification::Delivered { messages }
    }

    // ---- preconditions ----

    async fn require_global_enabled(&self) -> StpResult<()> {
        if !state::global_enabled(&self.store).await? {
            return Err(StpError::precondition("Global STP is not enabled."));
        }
        Ok(())
    }

    /// Interface eligibility, checked in order: global state, name, existence,
    /// routed address, LAG membership, VLAN membership, then (when
    /// `require_stp`) STP enabled on the interface.
    async fn check_interface(&self, if_name: &str, require_stp: bool) -> StpResult<()> {
        self.require_global_enabled().await?;
        validate::interface_name(if_name)?;

        if !state::interface_exists(&self.store, if_name).await? {
            return Err(StpError::precondition(format!(
                "Interface {} does not exist",
                if_name
            )));
        }
        if let Some(prefix) = state::routed_prefix(&self.store, if_name).await? {
            return Err(StpError::precondition(format!(
                "{} has ip address {} configured - It's not a L2 interface",
                if_name, prefix
            )));
        }
        if state::is_lag_member(&self.store, if_name).await? {
            return Err(StpError::precondition(format!(
                "{} is a portchannel member port - STP can't be configured",
                if_name
            )));
        }
        if state::interface_vlans(&self.store, if_name).await?.is_empty() {
            return Err(StpError::precondition(format!(
                "{} has no VLAN configured - It's not a L2 interface",
                if_name
            )));
        }
        if require_stp && !state::interface_stp_enabled(&self.store, if_name).await? {
            return Err(StpError::precondition(format!(
                "STP is not enabled for interface {}",
                if_name
            )));
        }
        Ok(())
    }

    async fn require_edge_port(&self, if_name: &str, feature: &str) -> StpResult<()> {
        let edge = state::interface_row(&self.store, if_name)
            .await?
            .and_then(|row| row.get_field(fields::EDGE_PORT).map(str::to_string));
        let allowed = match edge {
            Some(mode) => mode.parse::<EdgeMode>()?.allows_edge_features(),
            None => false,
        };
        if !allowed {
            return Err(StpError::precondition(format!(
                "Not allow to enable {} function since the edge-port status is disabled on {}.",
                feature, if_name
            )));
        }
        Ok(())
    }

    // ---- global ----

    /// Enables spanning tree in `mode`.
    #[instrument(skip(self))]
    pub async fn enable(&mut self, mode: StpMode) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = if mode == StpMode::Pvst {
            self.plan_enable_pvst().await
        } else {
            self.plan_enable(mode).await
        };
        self.commit(plan).await
    }

    async fn plan_enable(&self, mode: StpMode) -> StpResult<Mutation> {
        let enabled = state::global_enabled(&self.store).await?;
        if enabled && state::global_mode(&self.store).await? == Some(mode) {
            return Err(StpError::precondition(format!(
                "{} is already configured.",
                mode.as_str().to_uppercase()
            )));
        }

        let mut m = Mutation::new(Notify::Bridge {
            opcode: Opcode::Enable,
            mode,
        });
        if !enabled {
            m.set(
                CFG_XSTP_GLOBAL_TABLE_NAME,
                keys::GLOBAL,
                field_values! {fields::VALUE => values::ENABLED},
            );
        }
        m.set(
            CFG_XSTP_GLOBAL_TABLE_NAME,
            keys::MODE,
            field_values! {fields::VALUE => mode.as_str()},
        );

        let defaults = [
            (keys::FORWARD_TIME, BridgeTimers::DEFAULT_FORWARD_DELAY),
            (keys::HELLO_TIME, BridgeTimers::DEFAULT_HELLO_TIME),
            (keys::MAX_AGE, BridgeTimers::DEFAULT_MAX_AGE),
        ];
        for (key, default) in defaults {
            if state::global_value(&self.store, key).await?.is_none() {
                m.set(
                    CFG_XSTP_GLOBAL_TABLE_NAME,
                    key,
                    field_values! {fields::VALUE => default},
                );
            }
        }

        for if_name in state::vlan_member_interfaces(&self.store).await? {
            m.modify(
                CFG_XSTP_INTERFACE_TABLE_NAME,
                if_name,
                field_values! {fields::SPANNING_DISABLE => values::DISABLED},
            );
        }
        Ok(m)
    }

    async fn plan_enable_pvst(&self) -> StpResult<Mutation> {
        let mut m = Mutation::new(Notify::Bridge {
            opcode: Opcode::Enable,
            mode: StpMode::Pvst,
        });
        for table in XSTP_TABLES {
            m.delete(table, None);
        }

        let timers = BridgeTimers::default();
        m.set(
            CFG_STP_TABLE_NAME,
            keys::PVST_GLOBAL,
            field_values! {
                fields::MODE => StpMode::Pvst.as_str(),
                fields::ROOTGUARD_TIMEOUT => DEFAULT_ROOTGUARD_TIMEOUT,
                fields::FORWARD_DELAY => timers.forward_delay,
                fields::HELLO_TIME => timers.hello_time,
                fields::MAX_AGE => timers.max_age,
                fields::PRIORITY => timers.priority,
            },
        );

        for if_name in state::vlan_member_interfaces(&self.store).await? {
            if !state::interface_exists(&self.store, &if_name).await? {
                continue;
            }
            m.set(
                CFG_STP_PORT_TABLE_NAME,
                if_name,
                field_values! {
                    fields::ENABLED => values::TRUE,
                    fields::PVST_ROOT_GUARD => values::FALSE,
                    fields::PVST_BPDU_GUARD => values::FALSE,
                    fields::PVST_BPDU_GUARD_DO_DISABLE => values::FALSE,
                    fields::PORTFAST => values::FALSE,
                    fields::UPLINK_FAST => values::FALSE,
                },
            );
        }

        let vlans = state::vlans(&self.store).await?;
        if vlans.len() > MAX_PVST_VLANS {
            for vlan in &vlans[MAX_PVST_VLANS..] {
                warn!(vlan = %vlan.key(), "Exceeded maximum STP configurable VLAN instances");
            }
        }
        for vlan in vlans.iter().take(MAX_PVST_VLANS) {
            m.set(
                CFG_STP_VLAN_TABLE_NAME,
                vlan.key(),
                field_values! {
                    fields::ENABLED => values::TRUE,
                    fields::FORWARD_DELAY => timers.forward_delay,
                    fields::HELLO_TIME => timers.hello_time,
                    fields::MAX_AGE => timers.max_age,
                    fields::PRIORITY => timers.priority,
                },
            );
        }
        Ok(m)
    }

    /// Disables spanning tree. When `mode` is given it must match the running mode.
    #[instrument(skip(self))]
    pub async fn disable(&mut self, mode: Option<StpMode>) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_disable(mode).await;
        self.commit(plan).await
    }

    async fn plan_disable(&self, mode: Option<StpMode>) -> StpResult<Mutation> {
        if !state::global_enabled(&self.store).await? {
            debug!("spanning tree already disabled");
            return Ok(Mutation::new(Notify::Nothing));
        }

        let current = state::global_mode(&self.store).await?;
        if let Some(requested) = mode {
            if current != Some(requested) {
                return Err(StpError::precondition(format!(
                    "Current spanning-tree mode is {}, please specify correct mode.",
                    current.map(|m| m.as_str()).unwrap_or("none")
                )));
            }
        }

        let mut m = Mutation::new(Notify::Bridge {
            opcode: Opcode::Disable,
            mode: current.unwrap_or(StpMode::Rstp),
        });
        for table in XSTP_TABLES {
            m.delete(table, None);
        }
        m.set(
            CFG_XSTP_GLOBAL_TABLE_NAME,
            keys::GLOBAL,
            field_values! {fields::VALUE => values::DISABLED},
        );
        Ok(m)
    }

    /// Sets the bridge forward delay.
    #[instrument(skip(self))]
    pub async fn set_forward_delay(&mut self, value: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self
            .plan_timer(keys::FORWARD_TIME, validate::FORWARD_DELAY, value, |t, v| {
                t.forward_delay = v
            })
            .await;
        self.commit(plan).await
    }

    /// Sets the bridge hello time.
    #[instrument(skip(self))]
    pub async fn set_hello_time(&mut self, value: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self
            .plan_timer(keys::HELLO_TIME, validate::HELLO_TIME, value, |t, v| {
                t.hello_time = v
            })
            .await;
        self.commit(plan).await
    }

    /// Sets the bridge max age.
    #[instrument(skip(self))]
    pub async fn set_max_age(&mut self, value: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self
            .plan_timer(keys::MAX_AGE, validate::MAX_AGE, value, |t, v| t.max_age = v)
            .await;
        self.commit(plan).await
    }

    /// Validates one timer against the other two as currently stored.
    async fn plan_timer(
        &self,
        key: &'static str,
        bound: Bound,
        value: i64,
        assign: fn(&mut BridgeTimers, u32),
    ) -> StpResult<Mutation> {
        self.require_global_enabled().await?;
        let value = to_u32(bound.check(value)?);

        let mut timers = state::bridge_timers(&self.store).await?;
        assign(&mut timers, value);
        validate::bridge_timers(&timers)?;

        let mut m = Mutation::new(Notify::AllInstances);
        m.modify(
            CFG_XSTP_GLOBAL_TABLE_NAME,
            key,
            field_values! {fields::VALUE => value},
        );
        Ok(m)
    }

    /// Sets the bridge priority.
    #[instrument(skip(self))]
    pub async fn set_bridge_priority(&mut self, value: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_bridge_priority(value).await;
        self.commit(plan).await
    }

    async fn plan_bridge_priority(&self, value: i64) -> StpResult<Mutation> {
        self.require_global_enabled().await?;
        let value = validate::bridge_priority(value)?;

        let mut m = Mutation::new(Notify::AllInstances);
        m.modify(
            CFG_XSTP_GLOBAL_TABLE_NAME,
            keys::PRIORITY,
            field_values! {fields::VALUE => value},
        );
        Ok(m)
    }

    /// Tells the daemon the configuration push is complete.
    #[instrument(skip(self))]
    pub async fn announce_init_done(&mut self, max_instances: u16) -> StpResult<MutationOutcome> {
        self.begin();
        self.commit(Ok(Mutation::new(Notify::InitDone { max_instances })))
            .await
    }

    // ---- MST ----

    /// Sets the MST region max hops.
    #[instrument(skip(self))]
    pub async fn set_mst_max_hops(&mut self, value: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self
            .plan_mst_global(keys::MAX_HOPS, validate::MST_MAX_HOPS, value)
            .await;
        self.commit(plan).await
    }

    /// Sets the MST region revision.
    #[instrument(skip(self))]
    pub async fn set_mst_revision(&mut self, value: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self
            .plan_mst_global(keys::REVISION, validate::MST_REVISION, value)
            .await;
        self.commit(plan).await
    }

    async fn plan_mst_global(
        &self,
        key: &'static str,
        bound: Bound,
        value: i64,
    ) -> StpResult<Mutation> {
        self.require_global_enabled().await?;
        let value = bound.check(value)?;

        let mut m = Mutation::new(Notify::Nothing);
        m.modify(
            CFG_XSTP_MST_GLOBAL_TABLE_NAME,
            key,
            field_values! {fields::VALUE => value},
        );
        Ok(m)
    }

    /// Sets the MST region name.
    #[instrument(skip(self))]
    pub async fn set_mst_name(&mut self, name: &str) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_mst_name(name).await;
        self.commit(plan).await
    }

    async fn plan_mst_name(&self, name: &str) -> StpResult<Mutation> {
        self.require_global_enabled().await?;
        validate::mst_name(name)?;

        let mut m = Mutation::new(Notify::Nothing);
        m.modify(
            CFG_XSTP_MST_GLOBAL_TABLE_NAME,
            keys::NAME,
            field_values! {fields::VALUE => name},
        );
        Ok(m)
    }

    /// Sets the bridge priority of one MST instance.
    #[instrument(skip(self))]
    pub async fn set_mst_instance_priority(
        &mut self,
        inst: i64,
        priority: i64,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_mst_instance_priority(inst, priority).await;
        self.commit(plan).await
    }

    async fn plan_mst_instance_priority(&self, inst: i64, priority: i64) -> StpResult<Mutation> {
        self.require_global_enabled().await?;
        let inst = to_u16(validate::MST_INSTANCE_ID.check(inst)?);
        let priority = validate::mst_instance_priority(priority)?;

        let mut m = Mutation::new(Notify::Instance { inst });
        m.modify(
            CFG_XSTP_MST_TABLE_NAME,
            inst.to_string(),
            field_values! {fields::PRIORITY => priority},
        );
        Ok(m)
    }

    /// Maps a VLAN to an MST instance.
    #[instrument(skip(self))]
    pub async fn add_mst_vlan(&mut self, inst: i64, vlan: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_add_mst_vlan(inst, vlan).await;
        self.commit(plan).await
    }

    async fn plan_add_mst_vlan(&mut self, inst: i64, vlan: i64) -> StpResult<Mutation> {
        self.require_global_enabled().await?;
        let inst = to_u16(validate::MST_INSTANCE_ID.check(inst)?);
        let vlan = to_u16(validate::MST_INSTANCE_VLAN.check(vlan)?);

        let mappings = state::mst_mappings(&self.store).await?;
        if state::mapping_count(&mappings) >= validate::MAX_MST_VLAN_MAPPINGS {
            return Err(StpError::conflict(
                "Exceeded the maximum limit of MSTI-VLAN mappings.",
            ));
        }
        match state::instance_of(&mappings, vlan) {
            Some(owner) if owner != inst => {
                return Err(StpError::conflict(format!(
                    "VLAN {} is already mapped to MST instance {}",
                    vlan, owner
                )));
            }
            Some(_) => {
                debug!(inst, vlan, "VLAN already mapped to this instance");
                return Ok(Mutation::new(Notify::Nothing));
            }
            None => {}
        }

        let new_instance = !mappings.contains_key(&inst);
        let current = mappings.get(&inst).cloned().unwrap_or_default();

        self.enter(MutationPhase::Compressing);
        let mut vlans = current;
        vlans.insert(vlan);
        let vlan_str = range::compress(vlans);

        let mut m = Mutation::new(Notify::VlanMapping {
            opcode: Opcode::Enable,
            inst,
            vlan,
            new_instance,
        });
        m.modify(
            CFG_XSTP_MST_TABLE_NAME,
            inst.to_string(),
            field_values! {fields::VLAN_STR => vlan_str},
        );
        Ok(m)
    }

    /// Removes a VLAN from an MST instance. Removing the last VLAN deletes the
    /// instance together with its per-interface overrides.
    #[instrument(skip(self))]
    pub async fn remove_mst_vlan(&mut self, inst: i64, vlan: i64) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_remove_mst_vlan(inst, vlan).await;
        self.commit(plan).await
    }

    async fn plan_remove_mst_vlan(&mut self, inst: i64, vlan: i64) -> StpResult<Mutation> {
        self.require_global_enabled().await?;
        let inst = to_u16(validate::MST_INSTANCE_ID.check(inst)?);
        let vlan = to_u16(validate::MST_INSTANCE_VLAN.check(vlan)?);

        let mut vlans = match state::mst_instance_vlans(&self.store, inst).await? {
            Some(vlans) if !vlans.is_empty() => vlans,
            _ => return Err(StpError::conflict("mst id is not exist")),
        };
        if !vlans.remove(&vlan) {
            return Err(StpError::conflict("mst id and vlan is not mapped"));
        }

        let existing: BTreeSet<String> = state::mst_interface_keys(&self.store, inst)
            .await?
            .into_iter()
            .collect();

        self.enter(MutationPhase::Compressing);
        let mut m = Mutation::new(Notify::VlanMapping {
            opcode: Opcode::Disable,
            inst,
            vlan,
            new_instance: false,
        });

        let stale: BTreeSet<String> = if vlans.is_empty() {
            m.delete(CFG_XSTP_MST_TABLE_NAME, Some(inst.to_string()));
            existing
        } else {
            m.modify(
                CFG_XSTP_MST_TABLE_NAME,
                inst.to_string(),
                field_values! {fields::VLAN_STR => range::compress(vlans)},
            );
            state::members_of_vlan(&self.store, vlan)
                .await?
                .into_iter()
                .map(|member| join_key([inst.to_string(), member.if_name]))
                .filter(|key| existing.contains(key))
                .collect()
        };

        for key in stale {
            m.delete(CFG_XSTP_MST_INTERFACE_TABLE_NAME, Some(key));
        }
        Ok(m)
    }

    // ---- interface ----

    /// Enables STP on an interface.
    #[instrument(skip(self))]
    pub async fn enable_interface(&mut self, if_name: &str) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_interface_enable(if_name, true).await;
        self.commit(plan).await
    }

    /// Disables STP on an interface.
    #[instrument(skip(self))]
    pub async fn disable_interface(&mut self, if_name: &str) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_interface_enable(if_name, false).await;
        self.commit(plan).await
    }

    async fn plan_interface_enable(&self, if_name: &str, enable: bool) -> StpResult<Mutation> {
        self.check_interface(if_name, false).await?;
        if enable && state::interface_stp_enabled(&self.store, if_name).await? {
            return Err(StpError::precondition(format!(
                "STP is already enabled for {}",
                if_name
            )));
        }

        // spanning-disable is the inverse of the requested state
        let mut m = Mutation::new(Notify::Port {
            if_name: if_name.to_string(),
        });
        m.set(
            CFG_XSTP_INTERFACE_TABLE_NAME,
            if_name,
            field_values! {fields::SPANNING_DISABLE => values::toggle(!enable)},
        );
        Ok(m)
    }

    /// Merges fields into an STP-enabled interface's row.
    async fn plan_interface_fields(
        &self,
        if_name: &str,
        fields: StpResult<FieldValues>,
    ) -> StpResult<Mutation> {
        self.check_interface(if_name, true).await?;
        Ok(port_mutation(if_name, fields?))
    }

    /// Sets the port priority of an interface.
    #[instrument(skip(self))]
    pub async fn set_interface_priority(
        &mut self,
        if_name: &str,
        priority: i64,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let fields = validate::INTERFACE_PRIORITY
            .check(priority)
            .map(|p| field_values! {fields::PORT_PRIORITY => p});
        let plan = self.plan_interface_fields(if_name, fields).await;
        self.commit(plan).await
    }

    /// Sets the path cost of an interface.
    #[instrument(skip(self))]
    pub async fn set_interface_cost(
        &mut self,
        if_name: &str,
        cost: i64,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let fields = validate::INTERFACE_COST
            .check(cost)
            .map(|c| field_values! {fields::COST => c});
        let plan = self.plan_interface_fields(if_name, fields).await;
        self.commit(plan).await
    }

    /// Enables or disables root guard.
    #[instrument(skip(self))]
    pub async fn set_root_guard(
        &mut self,
        if_name: &str,
        enabled: bool,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let fields = Ok(field_values! {fields::ROOT_GUARD => values::toggle(enabled)});
        let plan = self.plan_interface_fields(if_name, fields).await;
        self.commit(plan).await
    }

    /// Enables or disables loopback detection.
    #[instrument(skip(self))]
    pub async fn set_loopback_detection(
        &mut self,
        if_name: &str,
        enabled: bool,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let fields = Ok(field_values! {fields::LOOPBACK_DETECTION => values::toggle(enabled)});
        let plan = self.plan_interface_fields(if_name, fields).await;
        self.commit(plan).await
    }

    /// Sets the loopback detection action. A shutdown without an interval
    /// uses [`DEFAULT_LBD_SHUTDOWN_INTERVAL`].
    #[instrument(skip(self))]
    pub async fn set_loopback_action(
        &mut self,
        if_name: &str,
        action: LoopbackAction,
        shutdown_interval: Option<i64>,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let interval = match (action, shutdown_interval) {
            (LoopbackAction::Shutdown, None) => Some(DEFAULT_LBD_SHUTDOWN_INTERVAL),
            (_, interval) => interval,
        };

        let fields = loopback_action_fields(action, interval);
        let plan = self.plan_interface_fields(if_name, fields).await;
        self.commit(plan).await
    }

    /// Enables or disables BPDU filter. Enabling requires an edge port.
    #[instrument(skip(self))]
    pub async fn set_bpdu_filter(
        &mut self,
        if_name: &str,
        enabled: bool,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_bpdu_filter(if_name, enabled).await;
        self.commit(plan).await
    }

    async fn plan_bpdu_filter(&self, if_name: &str, enabled: bool) -> StpResult<Mutation> {
        self.check_interface(if_name, true).await?;
        if enabled {
            self.require_edge_port(if_name, "bpdu-filter").await?;
        }
        Ok(port_mutation(
            if_name,
            field_values! {fields::BPDU_FILTER => values::toggle(enabled)},
        ))
    }

    /// Enables BPDU guard, optionally with automatic recovery after
    /// `auto_recovery` seconds. Requires an edge port.
    #[instrument(skip(self))]
    pub async fn enable_bpdu_guard(
        &mut self,
        if_name: &str,
        auto_recovery: Option<i64>,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_enable_bpdu_guard(if_name, auto_recovery).await;
        self.commit(plan).await
    }

    async fn plan_enable_bpdu_guard(
        &self,
        if_name: &str,
        auto_recovery: Option<i64>,
    ) -> StpResult<Mutation> {
        self.check_interface(if_name, true).await?;
        self.require_edge_port(if_name, "bpdu-guard").await?;

        let mut fvs = field_values! {
            fields::BPDU_GUARD => values::ENABLED,
            fields::AUTO_RECOVERY => values::DISABLED,
        };
        if let Some(interval) = auto_recovery {
            let interval = validate::AUTO_RECOVERY_INTERVAL.check(interval)?;
            fvs.set_field(fields::AUTO_RECOVERY, values::ENABLED);
            fvs.set_field(fields::AUTO_RECOVERY_INTERVAL, interval.to_string());
        }
        Ok(port_mutation(if_name, fvs))
    }

    /// Disables BPDU guard and clears its auto-recovery settings.
    #[instrument(skip(self))]
    pub async fn disable_bpdu_guard(&mut self, if_name: &str) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self.plan_rewrite_row(if_name, without_bpdu_guard).await;
        self.commit(plan).await
    }

    /// Sets the admin edge port mode. `false` also turns off BPDU filter and
    /// BPDU guard.
    #[instrument(skip(self))]
    pub async fn set_edge_port(
        &mut self,
        if_name: &str,
        mode: EdgeMode,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = match mode {
            EdgeMode::False => self.plan_rewrite_row(if_name, without_edge_features).await,
            _ => {
                let fields = Ok(field_values! {fields::EDGE_PORT => mode.as_str()});
                self.plan_interface_fields(if_name, fields).await
            }
        };
        self.commit(plan).await
    }

    /// Replaces an STP-enabled interface's row with `rewrite(row)`.
    async fn plan_rewrite_row(
        &self,
        if_name: &str,
        rewrite: fn(FieldValues) -> FieldValues,
    ) -> StpResult<Mutation> {
        self.check_interface(if_name, true).await?;
        let row = state::interface_row(&self.store, if_name)
            .await?
            .unwrap_or_default();

        let mut m = Mutation::new(Notify::Port {
            if_name: if_name.to_string(),
        });
        m.set(CFG_XSTP_INTERFACE_TABLE_NAME, if_name, rewrite(row));
        Ok(m)
    }

    /// Sets the port priority of an interface within one MST instance.
    #[instrument(skip(self))]
    pub async fn set_interface_mst_priority(
        &mut self,
        if_name: &str,
        inst: i64,
        priority: i64,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self
            .plan_interface_mst(
                if_name,
                inst,
                validate::INTERFACE_MST_PRIORITY,
                fields::PORT_PRIORITY,
                priority,
            )
            .await;
        self.commit(plan).await
    }

    /// Sets the path cost of an interface within one MST instance.
    #[instrument(skip(self))]
    pub async fn set_interface_mst_cost(
        &mut self,
        if_name: &str,
        inst: i64,
        cost: i64,
    ) -> StpResult<MutationOutcome> {
        self.begin();
        let plan = self
            .plan_interface_mst(if_name, inst, validate::INTERFACE_MST_COST, fields::COST, cost)
            .await;
        self.commit(plan).await
    }

    async fn plan_interface_mst(
        &self,
        if_name: &str,
        inst: i64,
        bound: Bound,
        field: &'static str,
        value: i64,
    ) -> StpResult<Mutation> {
        self.check_interface(if_name, true).await?;
        let inst = to_u16(validate::MST_INSTANCE_ID.check(inst)?);
        let value = bound.check(value)?;

        let mut m = Mutation::new(Notify::PortInstance {
            if_name: if_name.to_string(),
            inst,
        });
        m.modify(
            CFG_XSTP_MST_INTERFACE_TABLE_NAME,
            join_key([inst.to_string().as_str(), if_name]),
            field_values! {field => value},
        );
        Ok(m)
    }
}

fn port_mutation(if_name: &str, fields: FieldValues) -> Mutation {
    let mut m = Mutation::new(Notify::Port {
        if_name: if_name.to_string(),
    });
    m.modify(CFG_XSTP_INTERFACE_TABLE_NAME, if_name, fields);
    m
}

fn loopback_action_fields(
    action: LoopbackAction,
    shutdown_interval: Option<i64>,
) -> StpResult<FieldValues> {
    let mut fvs = field_values! {fields::LBD_ACTION => action.as_str()};
    if let Some(interval) = shutdown_interval {
        let interval = validate::LBD_SHUTDOWN_INTERVAL.check(interval)?;
        fvs.set_field(fields::LBD_SHUTDOWN_INTERVAL, interval.to_string());
    }
    Ok(fvs)
}

fn without_bpdu_guard(mut row: FieldValues) -> FieldValues {
    row.remove_field(fields::AUTO_RECOVERY);
    row.remove_field(fields::AUTO_RECOVERY_INTERVAL);
    row.set_field(fields::BPDU_GUARD, values::DISABLED);
    row
}

fn without_edge_features(mut row: FieldValues) -> FieldValues {
    row.set_field(fields::EDGE_PORT, EdgeMode::False.as_str());
    row.set_field(fields::BPDU_FILTER, values::DISABLED);
    without_bpdu_guard(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use sonic_cfgmgr_common::MemoryStore;
    use sonic_cfgmgr_test::{apply_all, stp_fixtures, switch_topology};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl DaemonNotifier for Recorder {
        async fn deliver(&self, datagram: &[u8]) -> StpResult<()> {
            self.sent.lock().unwrap().push(datagram.to_vec());
            Ok(())
        }
    }

    async fn manager(mode: Option<&str>) -> StpMgr<MemoryStore, Recorder> {
        let store = MemoryStore::new();
        apply_all(&store, &switch_topology()).await.unwrap();
        if let Some(mode) = mode {
            apply_all(&store, &stp_fixtures::global_enabled(mode))
                .await
                .unwrap();
        }
        StpMgr::new(store, Recorder::default())
    }

    #[tokio::test]
    async fn test_rejected_mutation_returns_to_idle() {
        let mut mgr = manager(None).await;
        let err = mgr.set_forward_delay(15).await.unwrap_err();
        assert_eq!(err.to_string(), "Global STP is not enabled.");
        assert_eq!(mgr.phase(), MutationPhase::Idle);
        assert!(mgr.notifier().sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enable_rstp_notifies_bridge() {
        let mut mgr = manager(None).await;
        let outcome = mgr.enable(StpMode::Rstp).await.unwrap();

        assert_eq!(outcome.messages().len(), 1);
        assert_eq!(mgr.notifier().sent.lock().unwrap().len(), 1);
        assert_eq!(mgr.phase(), MutationPhase::Idle);
        assert!(state::global_enabled(mgr.store()).await.unwrap());
        assert!(state::interface_stp_enabled(mgr.store(), "Ethernet0")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_enable_same_mode_twice() {
        let mut mgr = manager(Some("mstp")).await;
        let err = mgr.enable(StpMode::Mstp).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.to_string(), "MSTP is already configured.");
    }

    #[test]
    fn test_without_edge_features() {
        let row = field_values! {
            fields::SPANNING_DISABLE => values::DISABLED,
            fields::EDGE_PORT => "true",
            fields::BPDU_GUARD => values::ENABLED,
            fields::AUTO_RECOVERY => values::ENABLED,
            fields::AUTO_RECOVERY_INTERVAL => 300,
        };
        let row = without_edge_features(row);
        assert_eq!(
            row,
            field_values! {
                fields::SPANNING_DISABLE => values::DISABLED,
                fields::EDGE_PORT => "false",
                fields::BPDU_GUARD => values::DISABLED,
                fields::BPDU_FILTER => values::DISABLED,
            }
        );
    }
}
