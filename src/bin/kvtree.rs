use clap::{Parser, Subcommand};
use kvtree::serialization::serializer::UIntSerializer;
use kvtree::{Tree, TreeResult};

/// Command-line front end for a single-file B+ tree key/value store.
#[derive(Parser)]
#[command(name = "kvtree", about = "Open a key/value store and run one command against it")]
struct Cli {
    /// Path to the store's main data file.
    #[arg(long, default_value = "data.kv")]
    db: String,

    #[arg(long, default_value_t = 4096)]
    page_size: usize,

    #[arg(long, default_value_t = 64)]
    order: usize,

    #[arg(long, default_value_t = 8)]
    value_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert or replace a key with a value (hex-encoded bytes).
    Set { key: u64, value_hex: String },
    /// Look up a key.
    Get { key: u64 },
    /// List every entry in ascending key order.
    Items,
    /// Print the number of entries in the store.
    Len,
}

fn main() -> TreeResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut tree = Tree::open(
        &cli.db,
        cli.page_size,
        cli.order,
        8,
        cli.value_size,
        UIntSerializer,
    )?;

    match cli.command {
        Command::Set { key, value_hex } => {
            let value = decode_hex(&value_hex, cli.value_size)?;
            tree.insert(&key, &value)?;
            println!("ok");
        }
        Command::Get { key } => match tree.get_record(&key)? {
            Some(value) => println!("{}", encode_hex(&value)),
            None => println!("(not found)"),
        },
        Command::Items => {
            for (key, value) in tree.items()? {
                println!("{key}\t{}", encode_hex(&value));
            }
        }
        Command::Len => println!("{}", tree.len()?),
    }

    tree.close()
}

fn decode_hex(input: &str, expected_len: usize) -> TreeResult<Vec<u8>> {
    if input.len() != expected_len * 2 || !input.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(kvtree::TreeError::invalid_argument(format!(
            "value must be {expected_len} bytes of hex"
        )));
    }
    (0..input.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&input[i..i + 2], 16)
                .map_err(|_| kvtree::TreeError::invalid_argument("invalid hex digit"))
        })
        .collect()
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
