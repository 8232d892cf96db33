//! `chainsync enough`: does one value cover another?

use anyhow::{Context, Result};
use chainsync_core::codec::json;
use chainsync_core::{algebra, Shortfall, Value};

pub fn run(have: &str, want: &str) -> Result<()> {
    match evaluate(have, want)? {
        Ok(()) => println!("enough"),
        Err(shortfall) => {
            println!("{shortfall}");
            println!("  missing: {}", shortfall.missing());
            std::process::exit(1);
        }
    }
    Ok(())
}

fn evaluate(have: &str, want: &str) -> Result<Result<(), Shortfall>> {
    let have: Value = json::decode(have.as_bytes()).context("invalid --have value")?;
    let want: Value = json::decode(want.as_bytes()).context("invalid --want value")?;
    Ok(algebra::enough(&have, &want))
}
