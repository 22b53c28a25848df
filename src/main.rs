use adb_devctl::adb::orchestrator::DEFAULT_TCPIP_PORT;
use adb_devctl::adb::{
    AdbResult, ConnectionOrchestrator, DeviceStatusProbe, SystemAdb, resolve_target,
};
use adb_devctl::args::{self, Args, Command};
use adb_devctl::config::ConfigStore;
use adb_devctl::menu::{MenuPresenter, print_devices};

fn main() {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        args::print_help();
        return;
    }
    if argv.iter().any(|a| a == "--version" || a == "-v") {
        println!("adb-devctl v{}", env!("CARGO_PKG_VERSION"));
        return;
    }
    let args = match Args::parse_from(&argv) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("❌ {msg}");
            args::print_help();
            std::process::exit(1);
        }
    };

    let rt = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    if let Err(e) = rt.block_on(run(args)) {
        eprintln!("❌ {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(args: Args) -> AdbResult<()> {
    let store = ConfigStore::new(ConfigStore::default_path());
    let mut registry = store.load_registry()?;
    let probe = DeviceStatusProbe::new(SystemAdb);
    let orchestrator = ConnectionOrchestrator::new(SystemAdb);

    match args.command {
        Command::Menu => {
            MenuPresenter::new(&probe, &orchestrator, &mut registry, &store)
                .run()
                .await
        }
        Command::Devices { json } => {
            registry.refresh(probe.list_devices().await?);
            if json {
                let payload = serde_json::json!({
                    "active": registry.active(),
                    "devices": registry.records().collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
            } else {
                print_devices(&registry);
            }
            store.save_registry(&registry)
        }
        Command::SwitchDevice => {
            MenuPresenter::new(&probe, &orchestrator, &mut registry, &store)
                .switch_device()
                .await
        }
        Command::Pair { address, code } => {
            let session = adb_devctl::adb::PairingSession::new(&address, &code);
            let output = orchestrator.pair(&mut registry, &session).await?;
            store.save_registry(&registry)?;
            println!("✅ {output}");
            Ok(())
        }
        Command::Connect { identifier } => {
            let output = orchestrator.connect(&mut registry, &identifier).await?;
            store.save_registry(&registry)?;
            println!("✅ {output}");
            Ok(())
        }
        Command::Reconnect { identifier } => {
            let id = resolve_target(identifier, &args.device_override, &probe, &mut registry).await?;
            let output = orchestrator.quick_reconnect(&mut registry, &id).await?;
            store.save_registry(&registry)?;
            println!("✅ {output}");
            Ok(())
        }
        Command::ConnectWifi { identifier } => {
            let id = resolve_target(identifier, &args.device_override, &probe, &mut registry).await?;
            let output = orchestrator
                .connect_wifi(&mut registry, &id, DEFAULT_TCPIP_PORT)
                .await?;
            store.save_registry(&registry)?;
            println!("✅ {output}");
            Ok(())
        }
        Command::Disconnect { identifier } => {
            let id = resolve_target(identifier, &args.device_override, &probe, &mut registry).await?;
            orchestrator.disconnect(&mut registry, &id).await?;
            store.save_registry(&registry)?;
            println!("✅ disconnected {id}");
            Ok(())
        }
        Command::Forget { identifier } => {
            registry.forget(&identifier)?;
            store.save_registry(&registry)?;
            println!("✅ forgot {identifier}");
            Ok(())
        }
        Command::RestartServer => {
            let output = orchestrator.restart_server().await?;
            println!("✅ adb server restarted\n{output}");
            Ok(())
        }
        Command::Doctor => {
            let version = orchestrator.adb_version().await?;
            println!("✅ adb available:\n{version}");
            println!("🗂  config: {:?}", store.path());
            registry.refresh(probe.list_devices().await?);
            println!("📇 {} device(s) in the registry", registry.records().count());
            match registry.resolve_active() {
                Ok(id) => println!("📱 commands will target: {id}"),
                Err(e) => println!("⚠️  {e}"),
            }
            store.save_registry(&registry)
        }
    }
}
