//! User-space formatter: lays a fresh assoofs image onto a device.

use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::process;

use assoofs::fs::mkfs;
use assoofs::sys::inode::Timestamp;
use assoofs::sys::superblock::MAX_OBJECTS;

fn main() {
    let mut args = env::args().skip(1);
    let device = match args.next() {
        Some(device) => device,
        None => usage(),
    };
    let welcome = match args.next().as_deref() {
        None => true,
        Some("--bare") => false,
        Some(_) => usage(),
    };
    if args.next().is_some() {
        usage();
    }

    let image = mkfs::build_image(welcome, now());
    let written = OpenOptions::new()
        .write(true)
        .open(&device)
        .and_then(|mut file| file.write_all(&image));

    match written {
        Ok(()) => {
            println!(
                "{}: assoofs image written ({} blocks{})",
                device,
                MAX_OBJECTS,
                if welcome { ", welcome file" } else { "" },
            );
        }
        Err(err) => {
            eprintln!("mkassoofs: {}: {}", device, err);
            process::exit(1);
        }
    }
}

fn usage() -> ! {
    eprintln!("usage: mkassoofs <device> [--bare]");
    process::exit(1);
}

fn now() -> Timestamp {
    use std::time::{SystemTime, UNIX_EPOCH};
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Timestamp {
        secs: since_epoch.as_secs(),
        nsecs: since_epoch.subsec_nanos() as u64,
    }
}
