//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ocs")]
#[command(about = "OCS - one-time on-chain secrets CLI", long_about = None)]
pub struct Cli {
    /// Number of trustees for generated committees
    #[arg(short = 't', long, default_value = "5")]
    pub trustees: usize,

    /// Roster file (TOML) listing trustee public keys
    #[arg(short = 'g', long)]
    pub roster: Option<PathBuf>,

    /// Public-key file, one hex-encoded key per line
    #[arg(short = 'p', long)]
    pub pubkeys: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a suite keypair (trustee, writer or reader)
    Keygen {
        /// Output file (JSON); prints to stdout when omitted
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Assemble a roster file from a public-key list (requires -p)
    Roster {
        /// Output file (TOML)
        #[arg(long, short = 'o', default_value = "roster.toml")]
        output: PathBuf,
    },

    /// Encrypt a file and append a write transaction
    Write {
        /// File to encrypt and share
        #[arg(long)]
        file: PathBuf,

        /// Authorized reader's public key (hex)
        #[arg(long)]
        reader_pk: String,

        /// Writer keypair file (JSON)
        #[arg(long)]
        writer: PathBuf,

        /// Chain state file; created with fresh trustees when missing
        #[arg(long, default_value = "chain.json")]
        state: PathBuf,

        /// Output ciphertext file
        #[arg(long, short = 'o', default_value = "payload.enc")]
        output: PathBuf,
    },

    /// Append a read transaction for a write block
    Read {
        /// Write block id (hex)
        #[arg(long)]
        write_id: String,

        /// Reader keypair file (JSON)
        #[arg(long)]
        reader: PathBuf,

        /// Chain state file
        #[arg(long, default_value = "chain.json")]
        state: PathBuf,
    },

    /// Run the committee protocol and print the recovered plaintext
    Decrypt {
        /// Write block id (hex)
        #[arg(long)]
        write_id: String,

        /// Read block id (hex)
        #[arg(long)]
        read_id: String,

        /// Ciphertext file produced by the write step
        #[arg(long)]
        ciphertext: PathBuf,

        /// Reader keypair file (JSON)
        #[arg(long)]
        reader: PathBuf,

        /// Committee position of the protocol root
        #[arg(long, default_value = "0")]
        root_index: u32,

        /// Chain state file
        #[arg(long, default_value = "chain.json")]
        state: PathBuf,
    },

    /// Run the full write/read/decrypt flow in-process
    Demo {
        /// Payload to share
        #[arg(long, default_value = "hello world")]
        message: String,

        /// Committee position of the protocol root
        #[arg(long, default_value = "0")]
        root_index: u32,
    },
}
