#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

use anyhow::Context as _;

use crate::data_structures::texture;

/// Environment variable that overrides the native asset directory (`./assets`).
pub const ASSETS_ENV: &str = "MIRROR_NGIN_ASSETS";

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("No window available")?;
    let location = window.location();
    let origin = location
        .origin()
        .map_err(|_| anyhow::anyhow!("Page origin is not readable"))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn asset_path(root: Option<&str>, file_name: &str) -> PathBuf {
    match root {
        Some(root) if !root.is_empty() => PathBuf::from(root).join(file_name),
        _ => std::path::Path::new("./").join("assets").join(file_name),
    }
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .text()
            .await
            .with_context(|| format!("Could not fetch {file_name}"))?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = {
        let path = asset_path(std::env::var(ASSETS_ENV).ok().as_deref(), file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?
    };

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await
            .with_context(|| format!("Could not fetch {file_name}"))?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = asset_path(std::env::var(ASSETS_ENV).ok().as_deref(), file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?
    };

    Ok(data)
}

pub async fn load_image(file_name: &str) -> anyhow::Result<image::DynamicImage> {
    let data = load_binary(file_name).await?;
    image::load_from_memory(&data).with_context(|| format!("Could not decode {file_name}"))
}

pub async fn load_texture(
    file_name: &str,
    linear: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format, linear)
}

/// File names of the six faces of a cubemap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CubemapFaces {
    pub pos_x: String,
    pub neg_x: String,
    pub pos_y: String,
    pub neg_y: String,
    pub pos_z: String,
    pub neg_z: String,
}

impl CubemapFaces {
    /// The faces in array-layer order, see [`texture::CUBE_FACE_ORDER`].
    pub fn in_layer_order(&self) -> [&str; 6] {
        [
            &self.pos_x,
            &self.neg_x,
            &self.pos_y,
            &self.neg_y,
            &self.pos_z,
            &self.neg_z,
        ]
    }
}

pub async fn load_cubemap(
    faces: &CubemapFaces,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<texture::Texture> {
    let [px, nx, py, ny, pz, nz] = faces.in_layer_order();
    let images = futures::future::try_join_all([
        load_image(px),
        load_image(nx),
        load_image(py),
        load_image(ny),
        load_image(pz),
        load_image(nz),
    ])
    .await?;
    let images: [image::DynamicImage; 6] = images
        .try_into()
        .map_err(|_| anyhow::anyhow!("Expected exactly six cubemap faces"))?;
    texture::Texture::cubemap(device, queue, &images, &format!("cubemap {px}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_come_out_in_layer_order() {
        let faces = CubemapFaces {
            pos_x: "front.jpg".into(),
            neg_x: "back.jpg".into(),
            pos_y: "top.jpg".into(),
            neg_y: "bottom.jpg".into(),
            pos_z: "right.jpg".into(),
            neg_z: "left.jpg".into(),
        };
        assert_eq!(
            faces.in_layer_order(),
            ["front.jpg", "back.jpg", "top.jpg", "bottom.jpg", "right.jpg", "left.jpg"]
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn asset_root_can_be_overridden() {
        assert_eq!(
            asset_path(Some("/srv/demo"), "monkey.obj"),
            PathBuf::from("/srv/demo/monkey.obj")
        );
        assert_eq!(
            asset_path(None, "monkey.obj"),
            PathBuf::from("./assets/monkey.obj")
        );
        assert_eq!(
            asset_path(Some(""), "monkey.obj"),
            PathBuf::from("./assets/monkey.obj")
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn missing_asset_names_the_path() {
        let err = load_binary("definitely-not-here.png").await.unwrap_err();
        assert!(format!("{err:#}").contains("definitely-not-here.png"));
    }
}
