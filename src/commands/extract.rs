use anyhow::Result;

use crate::cli::{Cli, ExtractArgs};
use crate::dictionary::Dictionaries;
use crate::etl;

pub fn run(cli: &Cli, args: &ExtractArgs) -> Result<()> {
    let mut dicts = Dictionaries::default();
    let written = etl::extract(&args.inputs, &args.out, &mut dicts, args.force, cli.verbose)?;

    println!(
        "Extracted {} region file(s) into {}",
        written.len(),
        args.out.display()
    );
    Ok(())
}
