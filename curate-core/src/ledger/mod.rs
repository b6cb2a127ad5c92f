//! Request/response contract of the inclusion ledger.
//!
//! The ledger is the server-side record of per-playlist decisions.  The
//! engine only ever talks to it through [`Ledger::execute`], which makes the
//! HTTP client and in-memory fakes interchangeable.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::{
    error::Error,
    item::{Item, ItemType, Playlist},
};

pub trait Ledger {
    fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, Error>;
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, Error> {
        (**self).execute(request)
    }
}

impl<L: Ledger + ?Sized> Ledger for &L {
    fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, Error> {
        (**self).execute(request)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LedgerRequest {
    Playlists,
    CreatePlaylist { name: Arc<str> },
    RenamePlaylist { id: Arc<str>, name: Arc<str> },
    DeletePlaylist { id: Arc<str> },
    Publish { spotify_id: Arc<str> },
    PublishAll,
    Inclusions { playlist_id: Arc<str> },
    Search(SearchRequest),
    ArtistAlbums(ChildrenRequest),
    AlbumTracks(ChildrenRequest),
    SetItem(ItemRequest),
    UndoItem(ItemRequest),
    IncludePlaylist(NestRequest),
    UndoPlaylist(NestRequest),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub playlist_id: Arc<str>,
    pub query: Arc<str>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenRequest {
    pub parent_id: Arc<str>,
    pub playlist_id: Arc<str>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub include: bool,
    pub playlist_id: Arc<str>,
    pub spot_id: Arc<str>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NestRequest {
    pub parent_spot_id: Arc<str>,
    pub child_spot_id: Arc<str>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LedgerResponse {
    Playlists(Vec<Playlist>),
    Playlist(Playlist),
    Items(Vec<Item>),
    Ack(Ack),
}

impl LedgerResponse {
    pub fn into_items(self) -> Result<Vec<Item>, Error> {
        match self {
            Self::Items(items) => Ok(items),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    pub fn into_playlists(self) -> Result<Vec<Playlist>, Error> {
        match self {
            Self::Playlists(playlists) => Ok(playlists),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    pub fn into_playlist(self) -> Result<Playlist, Error> {
        match self {
            Self::Playlist(playlist) => Ok(playlist),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    pub fn into_ack(self) -> Result<Ack, Error> {
        match self {
            Self::Ack(ack) => Ok(ack),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// An acknowledgement with a usable payload.  Empty or falsy payloads
    /// count as a failure, the same as a transport error.
    pub fn into_confirmed(self) -> Result<Ack, Error> {
        let ack = self.into_ack()?;
        if ack.is_confirmed() {
            Ok(ack)
        } else {
            Err(Error::EmptyResponse)
        }
    }
}

/// Body of an acknowledging response, `Value::Null` when there was none.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ack(pub Value);

impl Ack {
    pub fn is_confirmed(&self) -> bool {
        match &self.0 {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn falsy_payloads_are_not_confirmations() {
        for value in [json!(null), json!(false), json!(0), json!("")] {
            let response = LedgerResponse::Ack(Ack(value));
            assert_eq!(response.into_confirmed(), Err(Error::EmptyResponse));
        }
        for value in [json!({}), json!([]), json!({"included": 1}), json!(true)] {
            assert!(Ack(value).is_confirmed());
        }
    }

    #[test]
    fn mismatched_response_kind_is_unexpected() {
        let response = LedgerResponse::Items(Vec::new());
        assert_eq!(response.into_ack(), Err(Error::UnexpectedResponse));
    }

    #[test]
    fn request_bodies_use_ledger_field_names() {
        let body = serde_json::to_value(ItemRequest {
            include: true,
            playlist_id: "p1".into(),
            spot_id: "s1".into(),
            item_type: ItemType::Album,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"include": true, "playlistId": "p1", "spotId": "s1", "type": 2})
        );
        let body = serde_json::to_value(NestRequest {
            parent_spot_id: "p".into(),
            child_spot_id: "c".into(),
        })
        .unwrap();
        assert_eq!(body, json!({"parentSpotId": "p", "childSpotId": "c"}));
    }
}
