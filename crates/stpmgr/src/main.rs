//! stpcfg - spanning tree configuration command
//!
//! Applies one configuration change to CONFIG_DB and notifies stpd.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sonic_cfgmgr_common::RedisStore;
use sonic_stpmgr::{
    DaemonChannel, EdgeMode, LoopbackAction, MutationOutcome, StpCfgSettings, StpMgr, StpMode,
};

type Mgr = StpMgr<RedisStore, DaemonChannel>;

/// Spanning tree configuration
#[derive(Parser, Debug)]
#[command(name = "stpcfg")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// stpd IPC socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Daemon send/reply timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Wait for stpd to answer every message
    #[arg(long)]
    await_reply: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enable spanning tree
    Enable {
        #[arg(value_enum)]
        mode: StpMode,
    },
    /// Disable spanning tree
    Disable {
        #[arg(value_enum)]
        mode: Option<StpMode>,
    },
    /// Bridge forward delay in seconds [4-30]
    ForwardDelay {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },
    /// Bridge hello time in seconds [1-10]
    Hello {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },
    /// Bridge max age in seconds [6-40]
    MaxAge {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },
    /// Bridge priority [0-61440], multiple of 4096
    Priority {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Signal stpd that the initial configuration is complete
    InitDone {
        #[arg(long, default_value = "64")]
        max_instances: u16,
    },
    /// MST region and instances
    #[command(subcommand)]
    Mst(MstCommand),
    /// Per-interface settings
    #[command(subcommand)]
    Interface(InterfaceCommand),
}

#[derive(Subcommand, Debug)]
enum MstCommand {
    /// Region max hops [1-40]
    MaxHops {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Region name
    Name { name: String },
    /// Region revision [0-65535]
    Revision {
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Instance bridge priority [0-61440], multiple of 4096
    Priority {
        #[arg(allow_hyphen_values = true)]
        instance: i64,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Instance VLAN mapping
    Vlan {
        #[arg(value_enum)]
        action: MappingAction,
        #[arg(allow_hyphen_values = true)]
        instance: i64,
        #[arg(allow_hyphen_values = true)]
        vlan: i64,
    },
}

#[derive(Subcommand, Debug)]
enum InterfaceCommand {
    /// Enable STP on the interface
    Enable { interface: String },
    /// Disable STP on the interface
    Disable { interface: String },
    /// Port priority [0-240]
    Priority {
        interface: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Path cost [1-200000000]
    Cost {
        interface: String,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// BPDU filter
    BpduFilter {
        interface: String,
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Root guard
    RootGuard {
        interface: String,
        #[arg(value_enum)]
        state: Toggle,
    },
    /// BPDU guard
    BpduGuard {
        interface: String,
        #[arg(value_enum)]
        state: Toggle,
        /// Auto-recovery interval in seconds [30-86400]
        #[arg(long, allow_hyphen_values = true)]
        auto_recovery: Option<i64>,
    },
    /// Admin edge port
    EdgePort {
        interface: String,
        #[arg(value_enum)]
        mode: EdgeMode,
    },
    /// Port priority within an MST instance [0-240]
    MstPriority {
        interface: String,
        #[arg(allow_hyphen_values = true)]
        instance: i64,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Path cost within an MST instance [1-200000000]
    MstCost {
        interface: String,
        #[arg(allow_hyphen_values = true)]
        instance: i64,
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },
    /// Loopback detection
    LoopbackDetection {
        interface: String,
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Loopback detection action
    LoopbackAction {
        interface: String,
        #[arg(value_enum)]
        action: LoopbackAction,
        /// Shutdown interval in seconds [60-86400]
        #[arg(long, allow_hyphen_values = true)]
        interval: Option<i64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MappingAction {
    Add,
    Del,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Toggle {
    Enable,
    Disable,
}

impl Toggle {
    fn enabled(self) -> bool {
        matches!(self, Toggle::Enable)
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("stpcfg: failed to set tracing subscriber: {}", e);
    }
}

fn load_settings(args: &Args) -> anyhow::Result<StpCfgSettings> {
    let mut settings = match &args.config {
        Some(path) => StpCfgSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => StpCfgSettings::default(),
    };

    if let Some(socket) = &args.socket {
        settings.daemon.socket_path = socket.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        settings.daemon.timeout_ms = timeout_ms;
    }
    if args.await_reply {
        settings.daemon.await_reply = true;
    }

    settings.validate().context("invalid settings")?;
    Ok(settings)
}

async fn run(mgr: &mut Mgr, command: Command) -> anyhow::Result<MutationOutcome> {
    let outcome = match command {
        Command::Enable { mode } => mgr.enable(mode).await?,
        Command::Disable { mode } => mgr.disable(mode).await?,
        Command::ForwardDelay { seconds } => mgr.set_forward_delay(seconds).await?,
        Command::Hello { seconds } => mgr.set_hello_time(seconds).await?,
        Command::MaxAge { seconds } => mgr.set_max_age(seconds).await?,
        Command::Priority { value } => mgr.set_bridge_priority(value).await?,
        Command::InitDone { max_instances } => mgr.announce_init_done(max_instances).await?,
        Command::Mst(command) => run_mst(mgr, command).await?,
        Command::Interface(command) => run_interface(mgr, command).await?,
    };
    Ok(outcome)
}

async fn run_mst(mgr: &mut Mgr, command: MstCommand) -> anyhow::Result<MutationOutcome> {
    let outcome = match command {
        MstCommand::MaxHops { value } => mgr.set_mst_max_hops(value).await?,
        MstCommand::Name { name } => mgr.set_mst_name(&name).await?,
        MstCommand::Revision { value } => mgr.set_mst_revision(value).await?,
        MstCommand::Priority { instance, value } => {
            mgr.set_mst_instance_priority(instance, value).await?
        }
        MstCommand::Vlan {
            action: MappingAction::Add,
            instance,
            vlan,
        } => mgr.add_mst_vlan(instance, vlan).await?,
        MstCommand::Vlan {
            action: MappingAction::Del,
            instance,
            vlan,
        } => mgr.remove_mst_vlan(instance, vlan).await?,
    };
    Ok(outcome)
}

async fn run_interface(
    mgr: &mut Mgr,
    command: InterfaceCommand,
) -> anyhow::Result<MutationOutcome> {
    let outcome = match command {
        InterfaceCommand::Enable { interface } => mgr.enable_interface(&interface).await?,
        InterfaceCommand::Disable { interface } => mgr.disable_interface(&interface).await?,
        InterfaceCommand::Priority { interface, value } => {
            mgr.set_interface_priority(&interface, value).await?
        }
        InterfaceCommand::Cost { interface, value } => {
            mgr.set_interface_cost(&interface, value).await?
        }
        InterfaceCommand::BpduFilter { interface, state } => {
            mgr.set_bpdu_filter(&interface, state.enabled()).await?
        }
        InterfaceCommand::RootGuard { interface, state } => {
            mgr.set_root_guard(&interface, state.enabled()).await?
        }
        InterfaceCommand::BpduGuard {
            interface,
            state: Toggle::Enable,
            auto_recovery,
        } => mgr.enable_bpdu_guard(&interface, auto_recovery).await?,
        InterfaceCommand::BpduGuard {
            interface,
            state: Toggle::Disable,
            ..
        } => mgr.disable_bpdu_guard(&interface).await?,
        InterfaceCommand::EdgePort { interface, mode } => {
            mgr.set_edge_port(&interface, mode).await?
        }
        InterfaceCommand::MstPriority {
            interface,
            instance,
            value,
        } => {
            mgr.set_interface_mst_priority(&interface, instance, value)
                .await?
        }
        InterfaceCommand::MstCost {
            interface,
            instance,
            value,
        } => mgr.set_interface_mst_cost(&interface, instance, value).await?,
        InterfaceCommand::LoopbackDetection { interface, state } => {
            mgr.set_loopback_detection(&interface, state.enabled())
                .await?
        }
        InterfaceCommand::LoopbackAction {
            interface,
            action,
            interval,
        } => mgr.set_loopback_action(&interface, action, interval).await?,
    };
    Ok(outcome)
}

async fn execute(args: Args) -> anyhow::Result<MutationOutcome> {
    let settings = load_settings(&args)?;

    let store = RedisStore::connect(settings.store_config())
        .await
        .context("connecting to CONFIG_DB")?;
    let channel = DaemonChannel::new(settings.channel_config());
    let mut mgr = StpMgr::new(store, channel);

    run(&mut mgr, args.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    debug!(?args, "stpcfg starting");

    match execute(args).await {
        Ok(outcome) => {
            if let Some(reason) = outcome.warning() {
                warn!(reason, "configuration saved but stpd was not updated");
                eprintln!("Warning: configuration saved, stpd not notified: {}", reason);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
