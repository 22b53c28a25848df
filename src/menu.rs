use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::adb::orchestrator::DEFAULT_TCPIP_PORT;
use crate::adb::{
    AdbResult, AdbRunner, ConnectionOrchestrator, DeviceRegistry, DeviceStatusProbe,
    PairingSession,
};
use crate::config::ConfigStore;

/// Interactive text menu over stdin/stdout. Only ever calls the documented
/// registry/orchestrator operations, so the core stays testable without a
/// terminal.
pub struct MenuPresenter<'a, R: AdbRunner> {
    probe: &'a DeviceStatusProbe<R>,
    orchestrator: &'a ConnectionOrchestrator<R>,
    registry: &'a mut DeviceRegistry,
    store: &'a ConfigStore,
    input: Lines<BufReader<Stdin>>,
}

impl<'a, R: AdbRunner> MenuPresenter<'a, R> {
    pub fn new(
        probe: &'a DeviceStatusProbe<R>,
        orchestrator: &'a ConnectionOrchestrator<R>,
        registry: &'a mut DeviceRegistry,
        store: &'a ConfigStore,
    ) -> Self {
        MenuPresenter {
            probe,
            orchestrator,
            registry,
            store,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    pub async fn run(&mut self) -> AdbResult<()> {
        println!("📱 adb-devctl — wireless ADB device manager");
        loop {
            println!();
            println!("  1) List devices");
            println!("  2) Pair new device");
            println!("  3) Connect");
            println!("  4) Quick reconnect");
            println!("  5) Switch active device");
            println!("  6) Disconnect");
            println!("  7) Forget device");
            println!("  8) Restart adb server");
            println!("  9) Switch USB device to Wi-Fi");
            println!("  q) Quit");
            let Some(choice) = self.prompt("> ").await else {
                break;
            };
            let choice = choice.trim().to_string();
            if choice == "q" || choice == "quit" || choice == "0" {
                break;
            }
            // Errors are recoverable here: report and return to the prompt.
            if let Err(e) = self.dispatch(&choice).await {
                println!("❌ {e}");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, choice: &str) -> AdbResult<()> {
        match choice {
            "1" => {
                self.registry.refresh(self.probe.list_devices().await?);
                print_devices(self.registry);
                self.store.save_registry(self.registry)
            }
            "2" => self.pair_wizard().await,
            "3" => {
                if let Some(id) = self.ask_identifier("Address or serial: ").await? {
                    let output = self.orchestrator.connect(self.registry, &id).await?;
                    println!("✅ {output}");
                    self.store.save_registry(self.registry)?;
                }
                Ok(())
            }
            "4" => {
                if let Some(id) = self.ask_identifier("Identifier (empty = active): ").await? {
                    let output = self.orchestrator.quick_reconnect(self.registry, &id).await?;
                    println!("✅ {output}");
                    self.store.save_registry(self.registry)?;
                }
                Ok(())
            }
            "5" => self.switch_device().await,
            "6" => {
                if let Some(id) = self.ask_identifier("Identifier (empty = active): ").await? {
                    self.orchestrator.disconnect(self.registry, &id).await?;
                    println!("✅ disconnected {id}");
                    self.store.save_registry(self.registry)?;
                }
                Ok(())
            }
            "7" => {
                if let Some(id) = self.ask_identifier("Identifier to forget: ").await? {
                    self.registry.forget(&id)?;
                    println!("✅ forgot {id}");
                    self.store.save_registry(self.registry)?;
                }
                Ok(())
            }
            "8" => {
                let output = self.orchestrator.restart_server().await?;
                println!("✅ adb server restarted\n{output}");
                Ok(())
            }
            "9" => {
                if let Some(id) = self.ask_identifier("USB serial (empty = active): ").await? {
                    let output = self
                        .orchestrator
                        .connect_wifi(self.registry, &id, DEFAULT_TCPIP_PORT)
                        .await?;
                    println!("✅ {output}");
                    self.store.save_registry(self.registry)?;
                }
                Ok(())
            }
            other => {
                println!("❓ unknown choice '{other}'");
                Ok(())
            }
        }
    }

    /// First-time pairing: endpoint and code as shown under Android's
    /// "Wireless debugging → Pair device with pairing code" dialog. The
    /// session itself is ephemeral and never persisted.
    async fn pair_wizard(&mut self) -> AdbResult<()> {
        let Some(address) = self.prompt("Pairing address (IP:PORT from the phone): ").await
        else {
            return Ok(());
        };
        if address.trim().is_empty() {
            return Ok(());
        }
        let Some(code) = self.prompt("Pairing code: ").await else {
            return Ok(());
        };
        let session = PairingSession::new(&address, &code);
        let output = self.orchestrator.pair(self.registry, &session).await?;
        println!("✅ {output}");
        self.store.save_registry(self.registry)?;

        // The connect port usually differs from the pairing port.
        if let Some(connect_addr) = self
            .prompt("Connect address (IP:PORT, usually port 5555; empty to skip): ")
            .await
        {
            let connect_addr = connect_addr.trim();
            if !connect_addr.is_empty() {
                let output = self.orchestrator.connect(self.registry, connect_addr).await?;
                println!("✅ {output}");
                self.store.save_registry(self.registry)?;
            }
        }
        Ok(())
    }

    /// Numbered pick from the refreshed registry; persists the selection.
    pub async fn switch_device(&mut self) -> AdbResult<()> {
        self.registry.refresh(self.probe.list_devices().await?);
        let identifiers: Vec<String> = self
            .registry
            .records()
            .map(|r| r.identifier.clone())
            .collect();
        if identifiers.is_empty() {
            println!("❓ no devices known — pair or connect one first");
            return Ok(());
        }
        print_devices(self.registry);
        for (index, identifier) in identifiers.iter().enumerate() {
            println!("  {}) {identifier}", index + 1);
        }
        let Some(choice) = self.prompt("Select device number: ").await else {
            return Ok(());
        };
        let Some(index) = parse_selection(&choice, identifiers.len()) else {
            println!("❓ invalid selection '{}'", choice.trim());
            return Ok(());
        };
        self.registry.set_active(&identifiers[index])?;
        self.store.save_registry(self.registry)?;
        println!("✅ active device: {}", identifiers[index]);
        Ok(())
    }

    /// Prompt for an identifier; empty input falls back to active-device
    /// resolution. `Ok(None)` means the user backed out (EOF).
    async fn ask_identifier(&mut self, label: &str) -> AdbResult<Option<String>> {
        let Some(line) = self.prompt(label).await else {
            return Ok(None);
        };
        let line = line.trim();
        if line.is_empty() {
            // Auto-detection needs live states, not what the last run saved.
            self.registry.refresh(self.probe.list_devices().await?);
            return self.registry.resolve_active().map(Some);
        }
        Ok(Some(line.to_string()))
    }

    async fn prompt(&mut self, label: &str) -> Option<String> {
        print!("{label}");
        let _ = std::io::stdout().flush();
        match self.input.next_line().await {
            Ok(line) => line,
            Err(_) => None,
        }
    }
}

/// One row per record: identifier, live state, link state, model, last seen.
/// The active device is marked with `*`.
pub fn print_devices(registry: &DeviceRegistry) {
    if registry.is_empty() {
        println!("(no devices known — pair or connect one first)");
        return;
    }
    println!(
        "  {:<24} {:<13} {:<13} {:<16} {}",
        "IDENTIFIER", "STATE", "LINK", "MODEL", "LAST SEEN"
    );
    for record in registry.records() {
        let marker = if registry.active() == Some(record.identifier.as_str()) {
            "*"
        } else {
            " "
        };
        let last_seen = record
            .last_seen
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{marker} {:<24} {:<13} {:<13} {:<16} {last_seen}",
            record.identifier,
            record.state.label(),
            record.link.label(),
            record.model.as_deref().unwrap_or("-"),
        );
    }
}

fn parse_selection(input: &str, count: usize) -> Option<usize> {
    let number: usize = input.trim().parse().ok()?;
    (1..=count).contains(&number).then(|| number - 1)
}
