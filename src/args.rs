#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive menu (default when no command flag is given).
    Menu,
    Devices { json: bool },
    SwitchDevice,
    Disconnect { identifier: Option<String> },
    Pair { address: String, code: String },
    Connect { identifier: String },
    Reconnect { identifier: Option<String> },
    ConnectWifi { identifier: Option<String> },
    Forget { identifier: String },
    RestartServer,
    Doctor,
}

#[derive(Debug, PartialEq)]
pub struct Args {
    pub command: Command,
    /// `--device-id`: overrides active-device resolution for this invocation
    /// only. Persisted state is not touched.
    pub device_override: Option<String>,
}

impl Args {
    pub fn parse_from(argv: &[String]) -> Result<Self, String> {
        let mut command: Option<Command> = None;
        let mut device_override: Option<String> = None;
        let mut json = false;

        let set = |current: &mut Option<Command>, new: Command| -> Result<(), String> {
            if current.is_some() {
                return Err("only one command per invocation".to_string());
            }
            *current = Some(new);
            Ok(())
        };

        let mut i = 0;
        while i < argv.len() {
            match argv[i].as_str() {
                "--devices" => set(&mut command, Command::Devices { json: false })?,
                "--json" => json = true,
                "--switch-device" => set(&mut command, Command::SwitchDevice)?,
                "--disconnect" => {
                    let identifier = take_optional(argv, &mut i);
                    set(&mut command, Command::Disconnect { identifier })?;
                }
                "--reconnect" => {
                    let identifier = take_optional(argv, &mut i);
                    set(&mut command, Command::Reconnect { identifier })?;
                }
                "--connect-wifi" => {
                    let identifier = take_optional(argv, &mut i);
                    set(&mut command, Command::ConnectWifi { identifier })?;
                }
                "--pair" => {
                    let address = take_required(argv, &mut i, "--pair (IP:PORT)")?;
                    let code = take_required(argv, &mut i, "--pair (pairing code)")?;
                    set(&mut command, Command::Pair { address, code })?;
                }
                "--connect" => {
                    let identifier = take_required(argv, &mut i, "--connect")?;
                    set(&mut command, Command::Connect { identifier })?;
                }
                "--forget" => {
                    let identifier = take_required(argv, &mut i, "--forget")?;
                    set(&mut command, Command::Forget { identifier })?;
                }
                "--device-id" => {
                    device_override = Some(take_required(argv, &mut i, "--device-id")?);
                }
                "--restart-server" => set(&mut command, Command::RestartServer)?,
                "--doctor" => set(&mut command, Command::Doctor)?,
                "--menu" => set(&mut command, Command::Menu)?,
                other => return Err(format!("unknown argument: {other}")),
            }
            i += 1;
        }

        let command = match command {
            Some(Command::Devices { .. }) => Command::Devices { json },
            Some(command) => {
                if json {
                    return Err("--json only applies to --devices".to_string());
                }
                command
            }
            None => {
                if json {
                    return Err("--json only applies to --devices".to_string());
                }
                Command::Menu
            }
        };
        Ok(Args {
            command,
            device_override,
        })
    }
}

/// Consume the next argument as a value if it is not another flag.
fn take_optional(argv: &[String], i: &mut usize) -> Option<String> {
    let next = argv.get(*i + 1)?;
    if next.starts_with("--") {
        return None;
    }
    *i += 1;
    Some(next.clone())
}

fn take_required(argv: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
    take_optional(argv, i).ok_or_else(|| format!("{flag} requires a value"))
}

pub fn print_help() {
    println!("📱 adb-devctl — wireless ADB device manager");
    println!();
    println!("USAGE:");
    println!("    adb-devctl [--device-id ID] [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    (no command)        Interactive menu");
    println!("    --devices [--json]  List known devices and their live state");
    println!("    --switch-device     Pick the active device interactively");
    println!("    --pair IP:PORT CODE Pair over wireless debugging");
    println!("    --connect ID        Connect to a device (ip:port or serial)");
    println!("    --reconnect [ID]    Reconnect a previously used device");
    println!("    --connect-wifi [ID] Switch a USB device to Wi-Fi and connect (port 5555)");
    println!("    --disconnect [ID]   Disconnect ID, or the active device");
    println!("    --forget ID         Drop a device from the registry");
    println!("    --restart-server    Restart the adb daemon");
    println!("    --doctor            Check adb availability and device selection");
    println!("    --device-id ID      Target ID for this invocation only");
    println!("    --help, -h          Show this help message");
    println!("    --version, -v       Show version information");
    println!();
    println!("EXIT CODES:");
    println!("    0 ok | 1 usage/internal | 2 no device selected | 3 unknown device");
    println!("    4 pairing failed | 5 connect refused | 124 timeout | 127 adb missing");
    println!();
    println!("EXAMPLES:");
    println!("    adb-devctl --pair 192.168.1.50:37099 123456");
    println!("    adb-devctl --connect 192.168.1.50:5555");
    println!("    adb-devctl --device-id emulator-5554 --disconnect");
}
