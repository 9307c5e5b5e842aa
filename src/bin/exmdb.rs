use clap::{Parser, Subcommand};
use std::{error::Error, time::Duration};

use exmdb::{
    ClientConfig, ExmdbClient,
    queries::{DEFAULT_FOLDER_PROPS, FolderMemberList, Queries},
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server host name or address
    #[arg(long, default_value = "localhost")]
    host: String,

    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Store home directory
    homedir: String,

    /// Prefix served by the server. Defaults to the home directory.
    #[arg(long)]
    prefix: Option<String>,

    /// Connect to a public (domain) store
    #[arg(long)]
    public: bool,

    /// Reconnect after dispatch errors
    #[arg(long)]
    auto_reconnect: bool,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 3000)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List public folders
    Folders,
    /// List the members of a folder
    Members { folder_id: u64 },
    /// Print store properties, given as hexadecimal tags
    StoreProps {
        #[arg(required = true, value_parser = parse_tag)]
        tags: Vec<u32>,
    },
    /// Print the sync state of every device
    SyncData {
        #[arg(default_value = "GS-SyncState")]
        folder_name: String,
    },
}

fn parse_tag(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid tag '{s}': {e}"))
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; verbosity follows RUST_LOG
    env_logger::init();

    let cli = Cli::parse();
    let prefix = cli.prefix.clone().unwrap_or_else(|| cli.homedir.clone());
    let config = ClientConfig::new(&cli.host, cli.port, prefix)
        .with_private(!cli.public)
        .with_auto_reconnect(cli.auto_reconnect)
        .with_connect_timeout(Duration::from_millis(cli.timeout));

    let mut client = ExmdbClient::connect(config)?;
    let mut queries = Queries::new(&mut client);
    let homedir = cli.homedir.as_str();

    match cli.command {
        Command::Folders => {
            for row in queries.folder_list(homedir, &DEFAULT_FOLDER_PROPS)? {
                let line: Vec<String> = row.iter().map(|tp| tp.print_value()).collect();
                println!("{}", line.join("\t"));
            }
        }
        Command::Members { folder_id } => {
            let table = queries.folder_member_list(homedir, folder_id)?;
            for member in FolderMemberList::from(&table[..]).members {
                println!("{}\t{}\t{:#x}", member.id, member.name, member.rights);
            }
        }
        Command::StoreProps { tags } => {
            for tp in queries.store_properties(homedir, 0, &tags)? {
                println!("{:#010x}\t{}\t{}", tp.tag(), tp.type_name(), tp.print_value());
            }
        }
        Command::SyncData { folder_name } => {
            let mut devices: Vec<_> = queries.sync_data(homedir, &folder_name)?.into_iter().collect();
            devices.sort();
            for (device, state) in devices {
                println!("{device}\t{state}");
            }
        }
    }

    Ok(())
}
