//! Mirrors `assets/` into `OUT_DIR`, so a packaged build carries the meshes,
//! textures and skybox faces the demos load.

use std::{env, path::PathBuf};

use anyhow::Result;
use fs_extra::dir::{self, CopyOptions};

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets = manifest_dir.join("assets");
    // Demo assets are provided separately; a checkout without them still builds.
    if !assets.is_dir() {
        return Ok(());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let options = CopyOptions {
        overwrite: true,
        ..CopyOptions::new()
    };
    dir::copy(&assets, &out_dir, &options)?;
    Ok(())
}
