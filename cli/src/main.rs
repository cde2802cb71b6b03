use std::fs;

use anyhow::{Context, ensure};
use dol::{Dol, ENTRY_SYMBOL, Header};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, USAGE};

mod args;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Args {
        input,
        addr,
        headers,
        sections,
        check,
        help,
    } = Args::parse()?;

    if help {
        print!("{USAGE}");
        return Ok(());
    }

    let input = input.context("no input file given (-i <file.dol>)")?;
    let bytes = fs::read(&input).context("failed to read input file")?;
    debug!(path = %input.display(), len = bytes.len(), "read input");

    let mut did_anything = false;

    if check {
        check_layout(&bytes)?;
        did_anything = true;
    }

    if headers || sections || addr.is_some() {
        let dol = Dol::new(bytes).context("dol validation failed")?;
        info!(
            text = dol.header().text_sections().len(),
            data = dol.header().data_sections().len(),
            bss = dol.header().bss_sections().len(),
            "loaded dol"
        );

        if headers {
            print_headers(dol.header())?;
        }

        if sections {
            print_sections(&dol)?;
        }

        if let Some(addr) = addr {
            print_address(&dol, addr)?;
        }

        did_anything = true;
    }

    if !did_anything {
        eprintln!("No action specified!");
    }

    Ok(())
}

fn check_layout(bytes: &[u8]) -> anyhow::Result<()> {
    let header = Header::decode(bytes)?;
    let violations = dol::violations(&header, bytes.len() as u64);

    for violation in &violations {
        println!("{violation}");
    }

    ensure!(
        violations.is_empty(),
        "found {} layout problem(s)",
        violations.len()
    );
    println!("Layout OK");

    Ok(())
}

fn print_headers(header: &Header) -> anyhow::Result<()> {
    println!("BSS address: {:#x}", header.bss_address());
    println!("BSS size: {:#x}", header.bss_size());
    println!("Entrypoint: {:#x}\n", header.entrypoint());

    Ok(())
}

fn print_sections(dol: &Dol) -> anyhow::Result<()> {
    for section in dol.header().load_sections() {
        let address = section.address_range();
        let backing = match section.file_range() {
            Some(file) => format!("file {:#x}..{:#x}", file.start, file.end),
            None => String::from("zero-filled"),
        };
        println!(
            "{:<8} {} {:#010x}..{:#010x} {}",
            section.name(),
            section.permissions(),
            address.start,
            address.end,
            backing
        );
    }

    println!("{ENTRY_SYMBOL} at {:#010x}", dol.entrypoint());

    Ok(())
}

fn print_address(dol: &Dol, addr: u32) -> anyhow::Result<()> {
    let section = dol
        .section_of_load_addr(addr)
        .with_context(|| format!("{addr:#x} is not in any section"))?;

    match dol.file_offset_of_addr(addr) {
        Some(offset) => println!("{addr:#x}: {section}, file offset {offset:#x}"),
        None => println!("{addr:#x}: {section}, zero-filled"),
    }

    Ok(())
}
