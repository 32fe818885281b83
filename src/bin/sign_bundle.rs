//! Signing utility for Enrollwise model bundles.
//!
//! # Usage
//!
//! ```bash
//! sign_bundle keygen --out-seed <path> [--out-pub <path>] [--force]
//! sign_bundle sign <bundle_dir>
//! ```
//!
//! `keygen` writes a fresh base64 Ed25519 seed (0600 on Unix) and optionally
//! the base64 public key. `sign` hashes the four bundle artifacts into
//! `manifest.json` and writes the raw signature to `bundle.sig`.
//!
//! The seed for `sign` is read from the file named by
//! `ENROLLWISE_SIGNING_KEY_B64_FILE`; debug builds also accept it inline in
//! `ENROLLWISE_SIGNING_KEY_B64`. Seed bytes are zeroized after use.

use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use enrollwise::adapters::bundle::integrity::{MANIFEST_FILE, SIGNATURE_FILE};
use enrollwise::adapters::bundle::ARTIFACT_FILES;
use enrollwise::adapters::BundleManifest;

const KEY_FILE_ENV: &str = "ENROLLWISE_SIGNING_KEY_B64_FILE";
const KEY_ENV_DEV: &str = "ENROLLWISE_SIGNING_KEY_B64";

const USAGE: &str = "Usage:
  sign_bundle keygen --out-seed <path> [--out-pub <path>] [--force]
  sign_bundle sign <bundle_dir>";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn main() {
    if let Err(err) = run(std::env::args().skip(1).collect()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: Vec<String>) -> Result<()> {
    match args.first().map(String::as_str) {
        Some("keygen") => keygen(&args[1..]),
        Some("sign") => match &args[1..] {
            [dir] => sign(Path::new(dir)),
            _ => bail!("sign takes exactly one bundle directory\n{USAGE}"),
        },
        Some("-h" | "--help") => {
            println!("{USAGE}");
            Ok(())
        }
        _ => bail!("{USAGE}"),
    }
}

struct KeygenArgs {
    out_seed: PathBuf,
    out_pub: Option<PathBuf>,
    force: bool,
}

fn parse_keygen_args(args: &[String]) -> Result<KeygenArgs> {
    let mut out_seed = None;
    let mut out_pub = None;
    let mut force = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out-seed" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--out-seed needs a path"))?;
                out_seed = Some(PathBuf::from(path));
            }
            "--out-pub" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--out-pub needs a path"))?;
                out_pub = Some(PathBuf::from(path));
            }
            "--force" => force = true,
            other => bail!("Unknown arg: {other}\n{USAGE}"),
        }
    }

    Ok(KeygenArgs {
        out_seed: out_seed.ok_or_else(|| anyhow!("--out-seed is required\n{USAGE}"))?,
        out_pub,
        force,
    })
}

fn write_new_file(path: &Path, contents: &[u8], mode: u32, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Refusing to overwrite existing file {path:?}. Use --force.");
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {parent:?}"))?;
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts.open(path).with_context(|| format!("opening {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn keygen(args: &[String]) -> Result<()> {
    let args = parse_keygen_args(args)?;

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    if let Some(pub_path) = &args.out_pub {
        if pub_path.exists() && !args.force {
            bail!("Refusing to overwrite existing file {pub_path:?}. Use --force.");
        }
    }

    write_new_file(&args.out_seed, seed_b64.as_bytes(), 0o600, args.force)?;
    println!("Wrote signing seed (base64) to {:?}", args.out_seed);

    if let Some(pub_path) = &args.out_pub {
        // Public key is not secret.
        write_new_file(pub_path, pub_b64.as_bytes(), 0o644, args.force)?;
        println!("Wrote public key (base64) to {pub_path:?}");
    }

    // Only non-secret material goes to stdout.
    println!("ENROLLWISE_BUNDLE_PUBKEY_B64={pub_b64}");
    Ok(())
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = if let Ok(path) = std::env::var(KEY_FILE_ENV) {
        Zeroizing::new(
            fs::read_to_string(path.trim()).context("reading signing key file")?,
        )
    } else if cfg!(debug_assertions) {
        Zeroizing::new(std::env::var(KEY_ENV_DEV).map_err(|_| {
            anyhow!("Missing signing key: set {KEY_FILE_ENV} (or {KEY_ENV_DEV} in debug builds)")
        })?)
    } else {
        bail!("Missing signing key: set {KEY_FILE_ENV}");
    };

    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("invalid base64 in signing key")?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn sign(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("{dir:?} is not a directory");
    }

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let manifest = BundleManifest::from_artifacts(dir, &ARTIFACT_FILES)?;
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
    let signature = signing_key.sign(&manifest_bytes);

    fs::write(dir.join(MANIFEST_FILE), &manifest_bytes)
        .with_context(|| format!("writing {MANIFEST_FILE}"))?;
    fs::write(dir.join(SIGNATURE_FILE), signature.to_bytes())
        .with_context(|| format!("writing {SIGNATURE_FILE}"))?;

    println!(
        "Signed {} artifacts in {dir:?} with public key {}",
        manifest.files.len(),
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}
