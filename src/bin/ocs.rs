//! OCS CLI - one-time on-chain secrets command-line interface.
//!
//! This is the main entry point for the `ocs` tool.
//! All command logic is implemented in the `ocs::cli` module.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ocs::cli::run()
}
