//! Command handlers for the OCS CLI.
//!
//! The `write`/`read`/`decrypt` commands operate against a file-backed
//! chain state (see [`output::ChainFile`]): the committee keypairs live in
//! the state file and the ledger is rebuilt by replaying the persisted
//! block payloads, which reproduces the same block ids across invocations.

use std::path::{Path, PathBuf};

use rand::thread_rng;
use tracing::info;

use crate::keys::{self, Committee, Keypair};
use crate::ledger::{BlockId, Ledger};
use crate::protocol::{self, Trustee, DEFAULT_TIMEOUT};
use crate::sdk::OcsClient;
use crate::transactions::BlockData;
use crate::wire::Wire;

use super::commands::{Cli, Commands};
use super::output;

/// The file-backed deployment the lifecycle commands run against.
struct Deployment {
    trustees: Vec<Trustee>,
    committee: Committee,
    ledger: Ledger,
    chain: output::ChainFile,
}

/// Loads the chain state, creating it with `default_n` fresh trustees when
/// the file does not exist yet.
fn load_deployment(state: &Path, default_n: usize) -> Result<Deployment, Box<dyn std::error::Error>> {
    let mut rng = thread_rng();
    let chain = if state.exists() {
        output::read_chain(state)?
    } else {
        let fresh = output::ChainFile {
            trustees: (0..default_n)
                .map(|_| output::KeypairFile::from(&Keypair::generate(&mut rng)))
                .collect(),
            blocks: Vec::new(),
        };
        output::write_chain(state, &fresh)?;
        info!(trustees = default_n, path = %state.display(), "chain state created");
        fresh
    };

    let trustee_keys: Vec<Keypair> = chain
        .trustees
        .iter()
        .cloned()
        .map(|kf| kf.into_keypair())
        .collect::<Result<_, _>>()?;
    let committee = Committee::new(trustee_keys.iter().map(|k| k.pk).collect())?;
    let trustees = trustee_keys
        .iter()
        .enumerate()
        .map(|(i, kp)| Trustee::new(i, kp.clone()))
        .collect();
    let ledger = Ledger::new(&trustee_keys, trustee_keys.len())?;
    for block in &chain.blocks {
        let data = BlockData::unmarshal(&hex::decode(block)?)?;
        ledger.append_with_retry(&data, &mut rng)?;
    }

    Ok(Deployment {
        trustees,
        committee,
        ledger,
        chain,
    })
}

/// Records the payload of a freshly appended block in the state file.
fn persist_block(
    dep: &mut Deployment,
    state: &Path,
    id: &BlockId,
) -> Result<(), Box<dyn std::error::Error>> {
    let block = dep.ledger.get(id)?;
    dep.chain.blocks.push(hex::encode(&block.fix.data));
    output::write_chain(state, &dep.chain)
}

fn block_id(hex_id: &str) -> Result<BlockId, Box<dyn std::error::Error>> {
    let bytes = hex::decode(hex_id.trim())?;
    let id: BlockId = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("block id must be 32 bytes, got {}", bytes.len()))?;
    Ok(id)
}

fn committee_size(
    roster: &Option<PathBuf>,
    default_n: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    match roster {
        Some(path) => Ok(output::read_roster(path)?.len()),
        None => Ok(default_n),
    }
}

/// Execute a CLI command.
pub fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Keygen { output } => {
            let kp = Keypair::generate(&mut thread_rng());
            match output {
                Some(path) => {
                    output::write_keypair(&path, &kp)?;
                    info!(path = %path.display(), "keypair written");
                }
                None => {
                    let json = serde_json::to_string_pretty(&output::KeypairFile::from(&kp))?;
                    println!("{json}");
                }
            }
            Ok(())
        }

        Commands::Roster { output } => {
            let pubkeys = cli
                .pubkeys
                .ok_or("roster assembly requires a public-key file (-p)")?;
            let keys = output::read_pubkeys(&pubkeys)?;
            if keys.is_empty() {
                return Err(format!("empty or invalid key file: {}", pubkeys.display()).into());
            }
            output::write_roster(&output, &keys)?;
            info!(trustees = keys.len(), path = %output.display(), "roster written");
            Ok(())
        }

        Commands::Write {
            file,
            reader_pk,
            writer,
            state,
            output: ciphertext_out,
        } => {
            let n = committee_size(&cli.roster, cli.trustees)?;
            let mut dep = load_deployment(&state, n)?;
            let writer_kp = output::read_keypair(&writer)?;
            let reader_pk = keys::point_from_bytes(&hex::decode(reader_pk.trim())?)?;
            let msg = std::fs::read(&file)?;

            let mut rng = thread_rng();
            let client = OcsClient::new(dep.committee.clone());
            let (write_id, ciphertext) =
                client
                    .writer()
                    .write(&dep.ledger, &msg, &reader_pk, &writer_kp, &mut rng)?;
            persist_block(&mut dep, &state, &write_id)?;
            std::fs::write(&ciphertext_out, &ciphertext)?;
            info!(path = %ciphertext_out.display(), "ciphertext written");

            println!("{}", hex::encode(write_id));
            Ok(())
        }

        Commands::Read {
            write_id,
            reader,
            state,
        } => {
            let n = committee_size(&cli.roster, cli.trustees)?;
            let mut dep = load_deployment(&state, n)?;
            let reader_kp = output::read_keypair(&reader)?;
            let write_id = block_id(&write_id)?;

            let mut rng = thread_rng();
            let client = OcsClient::new(dep.committee.clone());
            let read_id = client
                .reader()
                .create_read_txn(&dep.ledger, write_id, &reader_kp, &mut rng)?;
            persist_block(&mut dep, &state, &read_id)?;

            println!("{}", hex::encode(read_id));
            Ok(())
        }

        Commands::Decrypt {
            write_id,
            read_id,
            ciphertext,
            reader,
            root_index,
            state,
        } => {
            let n = committee_size(&cli.roster, cli.trustees)?;
            let dep = load_deployment(&state, n)?;
            let reader_kp = output::read_keypair(&reader)?;
            let write_id = block_id(&write_id)?;
            let read_id = block_id(&read_id)?;
            let ct = std::fs::read(&ciphertext)?;

            let mut rng = thread_rng();
            let client = OcsClient::new(dep.committee.clone());
            let request = client
                .reader()
                .build_request(&dep.ledger, &write_id, &read_id)?;
            let announce = client
                .reader()
                .build_announce(request, &reader_kp, root_index, &mut rng);
            let replies = protocol::run_decrypt(&dep.trustees, &announce, DEFAULT_TIMEOUT)?;
            info!(
                shares = replies.iter().filter(|r| r.is_some()).count(),
                "committee replied"
            );

            let write_txn = dep.ledger.get_write_txn(&write_id)?;
            let plaintext =
                client
                    .reader()
                    .recover_plaintext(&write_txn.data, &replies, &reader_kp, &ct)?;

            println!("{}", String::from_utf8_lossy(&plaintext));
            Ok(())
        }

        Commands::Demo {
            message,
            root_index,
        } => {
            let n = committee_size(&cli.roster, cli.trustees)?;
            demo(n, &message, root_index)
        }
    }
}

/// Full write/read/decrypt round trip with an in-process committee.
fn demo(n: usize, message: &str, root_index: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = thread_rng();

    let trustee_keys: Vec<Keypair> = (0..n).map(|_| Keypair::generate(&mut rng)).collect();
    let committee = Committee::new(trustee_keys.iter().map(|k| k.pk).collect())?;
    let trustees: Vec<Trustee> = trustee_keys
        .iter()
        .enumerate()
        .map(|(i, kp)| Trustee::new(i, kp.clone()))
        .collect();
    let ledger = Ledger::new(&trustee_keys, n)?;

    let writer = Keypair::generate(&mut rng);
    let reader = Keypair::generate(&mut rng);
    let client = OcsClient::new(committee);

    let (write_id, ciphertext) =
        client
            .writer()
            .write(&ledger, message.as_bytes(), &reader.pk, &writer, &mut rng)?;
    info!(id = %hex::encode(write_id), "write transaction appended");

    let read_id = client
        .reader()
        .create_read_txn(&ledger, write_id, &reader, &mut rng)?;
    info!(id = %hex::encode(read_id), "read transaction appended");

    let request = client.reader().build_request(&ledger, &write_id, &read_id)?;
    let announce = client
        .reader()
        .build_announce(request, &reader, root_index, &mut rng);
    let replies = protocol::run_decrypt(&trustees, &announce, DEFAULT_TIMEOUT)?;
    info!(
        shares = replies.iter().filter(|r| r.is_some()).count(),
        "committee replied"
    );

    let write_txn = ledger.get_write_txn(&write_id)?;
    let plaintext =
        client
            .reader()
            .recover_plaintext(&write_txn.data, &replies, &reader, &ciphertext)?;

    println!("{}", String::from_utf8_lossy(&plaintext));
    Ok(())
}
