use std::{convert::TryFrom, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8")]
#[serde(into = "u8")]
pub enum ItemType {
    Playlist,
    Artist,
    Album,
    Track,
}

impl ItemType {
    pub fn all() -> &'static [Self] {
        &[Self::Playlist, Self::Artist, Self::Album, Self::Track]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Playlist => "playlist",
            ItemType::Artist => "artist",
            ItemType::Album => "album",
            ItemType::Track => "track",
        }
    }

    /// The type shown when an item of this type is expanded.
    pub fn child(&self) -> Option<Self> {
        match self {
            ItemType::Artist => Some(ItemType::Album),
            ItemType::Album => Some(ItemType::Track),
            ItemType::Playlist | ItemType::Track => None,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for ItemType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Playlist),
            1 => Ok(Self::Artist),
            2 => Ok(Self::Album),
            3 => Ok(Self::Track),
            _ => Err(Error::InvalidValue(format!("item type {value}"))),
        }
    }
}

impl From<ItemType> for u8 {
    fn from(item_type: ItemType) -> Self {
        match item_type {
            ItemType::Playlist => 0,
            ItemType::Artist => 1,
            ItemType::Album => 2,
            ItemType::Track => 3,
        }
    }
}

impl std::str::FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidValue(format!("item type {s:?}")))
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8")]
#[serde(into = "u8")]
pub enum InclusionStatus {
    #[default]
    Unset,
    Included,
    Excluded,
    ProxyIncluded,
    ProxyExcluded,
}

impl InclusionStatus {
    /// Explicit decisions are never overwritten by propagation.
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Included | Self::Excluded)
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::ProxyIncluded | Self::ProxyExcluded)
    }

    pub fn explicit(include: bool) -> Self {
        if include {
            Self::Included
        } else {
            Self::Excluded
        }
    }

    pub fn proxy(include: bool) -> Self {
        if include {
            Self::ProxyIncluded
        } else {
            Self::ProxyExcluded
        }
    }
}

impl TryFrom<u8> for InclusionStatus {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unset),
            1 => Ok(Self::Included),
            2 => Ok(Self::Excluded),
            3 => Ok(Self::ProxyIncluded),
            4 => Ok(Self::ProxyExcluded),
            _ => Err(Error::InvalidValue(format!("inclusion status {value}"))),
        }
    }
}

impl From<InclusionStatus> for u8 {
    fn from(status: InclusionStatus) -> Self {
        match status {
            InclusionStatus::Unset => 0,
            InclusionStatus::Included => 1,
            InclusionStatus::Excluded => 2,
            InclusionStatus::ProxyIncluded => 3,
            InclusionStatus::ProxyExcluded => 4,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CatalogItem {
    pub id: Arc<str>,
    pub item_type: ItemType,
    pub name: Arc<str>,
    pub sort_hint: Option<Arc<str>>,
    pub icon_url: Option<Arc<str>>,
    pub status: InclusionStatus,
}

impl CatalogItem {
    pub fn new(id: impl Into<Arc<str>>, item_type: ItemType, name: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            item_type,
            name: name.into(),
            sort_hint: None,
            icon_url: None,
            status: InclusionStatus::Unset,
        }
    }

    pub fn with_status(mut self, status: InclusionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is(&self, id: &str, item_type: ItemType) -> bool {
        self.item_type == item_type && &*self.id == id
    }
}

impl From<Item> for CatalogItem {
    fn from(item: Item) -> Self {
        Self {
            icon_url: item.icon.first().map(|image| image.url.clone()),
            id: item.spotify_id,
            item_type: item.item_type,
            name: item.name,
            sort_hint: item.sort_data,
            status: item.included,
        }
    }
}

impl From<Playlist> for CatalogItem {
    fn from(playlist: Playlist) -> Self {
        Self::new(playlist.spotify_id, ItemType::Playlist, playlist.name)
    }
}

/// Catalog entry as the ledger sends it.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Item {
    #[serde(rename = "spotifyID", alias = "spotifyId")]
    pub spotify_id: Arc<str>,
    #[serde(rename = "itemType")]
    pub item_type: ItemType,
    #[serde(default = "default_str")]
    pub name: Arc<str>,
    #[serde(default, rename = "sortData", alias = "sortdata")]
    pub sort_data: Option<Arc<str>>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub icon: Vec<Image>,
    #[serde(default)]
    pub included: InclusionStatus,
    /// Accepted for wire compatibility and otherwise ignored.  `included`
    /// already says whether the status is inherited.
    #[serde(default, rename = "inclusionByProxy")]
    pub inclusion_by_proxy: Option<bool>,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Image {
    pub url: Arc<str>,
    pub width: Option<usize>,
    pub height: Option<usize>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Playlist {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(rename = "spotifyID", alias = "spotifyId")]
    pub spotify_id: Arc<str>,
    #[serde(default = "default_str")]
    pub name: Arc<str>,
}

pub fn default_str() -> Arc<str> {
    "".into()
}

fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let opt = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
