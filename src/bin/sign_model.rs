//! Signing utility for VisionCare model artifacts.
//!
//! Writes `manifest.json` (SHA-256 of the model file) and `model.sig`
//! (Ed25519 signature over the manifest bytes) into a model directory, or
//! generates a fresh signing keypair.
//!
//! # Usage
//!
//! ```bash
//! sign_model <model_dir> [--serial <n>]
//! sign_model --generate-key --out-seed <path> [--out-pub <path>] [--force]
//! ```
//!
//! The signing seed (base64, 32 bytes) is read from the file named by
//! `VISIONCARE_MODEL_SIGNING_KEY_B64_FILE`. Debug builds also accept it
//! directly in `VISIONCARE_MODEL_SIGNING_KEY_B64`.

use std::collections::BTreeMap;
use std::env;
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

use visioncare::adapters::forest::{
    sha256_hex, ModelManifest, MANIFEST_FILE_NAME, MODEL_FILE_NAME, SIGNATURE_FILE_NAME,
};

const USAGE: &str = "Usage:\n  sign_model <model_dir> [--serial <u64>]\n  sign_model --generate-key --out-seed <path> [--out-pub <path>] [--force]";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

enum Command {
    Sign {
        model_dir: PathBuf,
        serial: Option<u64>,
    },
    GenerateKey {
        out_seed: PathBuf,
        out_pub: Option<PathBuf>,
        force: bool,
    },
}

fn parse_args() -> Result<Command> {
    let mut args = env::args().skip(1);
    let mut generate = false;
    let mut model_dir = None;
    let mut serial = None;
    let mut out_seed = None;
    let mut out_pub = None;
    let mut force = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--generate-key" => generate = true,
            "--serial" => {
                let v = args.next().ok_or_else(|| anyhow!(USAGE))?;
                serial = Some(v.trim().parse::<u64>().context("--serial must be a u64")?);
            }
            "--out-seed" => out_seed = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?)),
            "--out-pub" => out_pub = Some(PathBuf::from(args.next().ok_or_else(|| anyhow!(USAGE))?)),
            "--force" => force = true,
            "-h" | "--help" => bail!(USAGE),
            _ if model_dir.is_none() && !arg.starts_with('-') => model_dir = Some(PathBuf::from(arg)),
            _ => bail!("Unexpected argument {arg:?}\n{USAGE}"),
        }
    }

    if generate {
        Ok(Command::GenerateKey {
            out_seed: out_seed.ok_or_else(|| anyhow!(USAGE))?,
            out_pub,
            force,
        })
    } else {
        Ok(Command::Sign {
            model_dir: model_dir.ok_or_else(|| anyhow!(USAGE))?,
            serial,
        })
    }
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = if let Ok(path) = env::var("VISIONCARE_MODEL_SIGNING_KEY_B64_FILE") {
        Zeroizing::new(
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?,
        )
    } else if cfg!(debug_assertions) {
        Zeroizing::new(env::var("VISIONCARE_MODEL_SIGNING_KEY_B64").map_err(|_| {
            anyhow!("Missing signing key: set VISIONCARE_MODEL_SIGNING_KEY_B64_FILE")
        })?)
    } else {
        bail!("Missing signing key: set VISIONCARE_MODEL_SIGNING_KEY_B64_FILE");
    };

    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.trim())
            .context("Signing key is not valid base64")?,
    );
    let bytes: [u8; 32] = raw
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Signing seed must be 32 bytes (got {})", raw.len()))?;
    Ok(Seed(bytes))
}

fn write_new_file(path: &Path, contents: &[u8], mode: u32, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Refusing to overwrite existing file {path:?}. Use --force.");
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {parent:?}"))?;
    }

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(mode);
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = opts
        .open(path)
        .with_context(|| format!("Failed to open {path:?}"))?;
    file.write_all(contents)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn generate_key(out_seed: &Path, out_pub: Option<&Path>, force: bool) -> Result<()> {
    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let verifying_key = SigningKey::from_bytes(&seed.0).verifying_key();

    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    let pub_b64 = general_purpose::STANDARD.encode(verifying_key.as_bytes());

    write_new_file(out_seed, seed_b64.as_bytes(), 0o600, force)?;
    println!("Wrote signing seed (base64) to {out_seed:?}");

    if let Some(out_pub) = out_pub {
        write_new_file(out_pub, pub_b64.as_bytes(), 0o644, force)?;
        println!("Wrote verifying key (base64) to {out_pub:?}");
    }
    println!("VERIFYING_KEY_B64={pub_b64}");
    Ok(())
}

fn sign(model_dir: &Path, serial: Option<u64>) -> Result<()> {
    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| anyhow!("Model path has no parent directory"))?
    } else {
        model_dir
    };

    let model_path = model_dir.join(MODEL_FILE_NAME);
    let model_bytes =
        fs::read(&model_path).with_context(|| format!("Failed to read {model_path:?}"))?;

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);

    let created_at = chrono::Utc::now().timestamp();
    let manifest = ModelManifest {
        version: 1,
        serial: Some(serial.unwrap_or_else(|| u64::try_from(created_at).unwrap_or(1))),
        created_at: Some(created_at),
        files: BTreeMap::from([(MODEL_FILE_NAME.to_string(), sha256_hex(&model_bytes))]),
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = model_dir.join(MANIFEST_FILE_NAME);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig_path = model_dir.join(SIGNATURE_FILE_NAME);
    fs::write(&sig_path, signing_key.sign(&manifest_bytes).to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "VERIFYING_KEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn main() -> Result<()> {
    match parse_args()? {
        Command::Sign { model_dir, serial } => sign(&model_dir, serial),
        Command::GenerateKey {
            out_seed,
            out_pub,
            force,
        } => generate_key(&out_seed, out_pub.as_deref(), force),
    }
}
