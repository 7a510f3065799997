use std::collections::HashMap;

use bevy::prelude::*;

use crate::spec::{Asset, AssetType};

/// Declared assets of the running spec, keyed by asset key.
#[derive(Resource, Default, Debug, Clone)]
pub struct AssetManifest {
    entries: HashMap<String, (AssetType, String)>,
}

impl AssetManifest {
    pub fn from_assets(assets: &[Asset]) -> Self {
        let entries = assets
            .iter()
            .map(|a| (a.key.clone(), (a.asset_type, a.url.clone())))
            .collect();
        Self { entries }
    }

    /// URL of an image-like asset. Audio keys never resolve to a texture.
    pub fn texture_url(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some((AssetType::Sprite | AssetType::Image, url)) => Some(url.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_image_assets_resolve_as_textures() {
        let manifest = AssetManifest::from_assets(&[
            Asset {
                key: "hero".into(),
                asset_type: AssetType::Sprite,
                url: "sprites/hero.png".into(),
            },
            Asset {
                key: "jump".into(),
                asset_type: AssetType::Audio,
                url: "sfx/jump.ogg".into(),
            },
        ]);
        assert_eq!(manifest.texture_url("hero"), Some("sprites/hero.png"));
        assert_eq!(manifest.texture_url("jump"), None);
        assert_eq!(manifest.texture_url("missing"), None);
        assert_eq!(manifest.len(), 2);
    }
}
