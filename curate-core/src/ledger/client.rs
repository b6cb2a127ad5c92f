use std::{fmt::Display, thread, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use ureq::{
    http::{Response, StatusCode},
    Agent, Body,
};
use url::Url;

use super::{
    Ack, ChildrenRequest, ItemRequest, Ledger, LedgerRequest, LedgerResponse, NestRequest,
    SearchRequest,
};
use crate::{
    config::Config,
    error::Error,
    item::{Item, Playlist},
};

/// Blocking HTTP client for the ledger service.
pub struct LedgerClient {
    agent: Agent,
    base: Url,
}

impl LedgerClient {
    pub fn new(base_url: &str, proxy_url: Option<&str>, timeout: Duration) -> Result<Self, Error> {
        // The proxy comes from config only, never from ureq's own env lookup.
        let proxy = proxy_url.and_then(|url| ureq::Proxy::new(url).ok());
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .proxy(proxy);
        Ok(Self {
            agent: agent.build().into(),
            base: parse_base(base_url)?,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(
            &config.ledger_url,
            Config::proxy().as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn request(&self, request: &RequestBuilder) -> Result<Response<Body>, Error> {
        let url = request.build(&self.base)?;
        log::debug!("{:?} {}", request.method, url);
        let response = match request.method {
            Method::Get => self.agent.get(&url).call()?,
            Method::Delete => self.agent.delete(&url).call()?,
            Method::Post => self.agent.post(&url).send_json(request.get_body())?,
            Method::Put => self.agent.put(&url).send_json(request.get_body())?,
        };
        Ok(response)
    }

    fn with_retry(f: impl Fn() -> Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
        loop {
            let response = f()?;
            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|secs| secs.to_str().ok());
                    let secs = retry_after_secs.unwrap_or("2").parse::<u64>().unwrap_or(2);
                    log::warn!("ledger is rate limiting, retrying in {}s", secs);
                    thread::sleep(Duration::from_secs(secs));
                }
                status if !status.is_success() => {
                    break Err(Error::Transport(format!("HTTP {}", status)));
                }
                _ => {
                    break Ok(response);
                }
            }
        }
    }

    /// Send a request and return the deserialized JSON body.
    fn load<T: DeserializeOwned>(&self, request: &RequestBuilder) -> Result<T, Error> {
        let mut response = Self::with_retry(|| self.request(request))?;
        response
            .body_mut()
            .read_json()
            .map_err(|err| Error::Transport(err.to_string()))
    }

    /// Send a request and keep whatever the body said, if anything.
    fn acknowledge(&self, request: &RequestBuilder) -> Result<Ack, Error> {
        let mut response = Self::with_retry(|| self.request(request))?;
        let body = response.body_mut().read_to_string()?;
        if body.trim().is_empty() {
            return Ok(Ack(Value::Null));
        }
        Ok(Ack(
            serde_json::from_str(&body).unwrap_or(Value::String(body)),
        ))
    }
}

/// Playlist endpoints.
impl LedgerClient {
    pub fn get_playlists(&self) -> Result<Vec<Playlist>, Error> {
        self.load(&RequestBuilder::new("playlists", Method::Get, None))
    }

    pub fn create_playlist(&self, name: &str) -> Result<Playlist, Error> {
        let request = &RequestBuilder::new("playlists", Method::Post, None)
            .set_body(Some(json!({ "name": name })));
        self.load(request)
    }

    pub fn rename_playlist(&self, id: &str, name: &str) -> Result<Playlist, Error> {
        let request = &RequestBuilder::new(format!("playlists/{}/rename", id), Method::Put, None)
            .set_body(Some(json!({ "name": name })));
        self.load(request)
    }

    pub fn delete_playlist(&self, id: &str) -> Result<Ack, Error> {
        let request = &RequestBuilder::new(format!("playlists/{}", id), Method::Delete, None);
        self.acknowledge(request)
    }

    pub fn publish(&self, spotify_id: &str) -> Result<Ack, Error> {
        let request = &RequestBuilder::new("playlists/publish", Method::Post, None)
            .set_body(Some(json!({ "spotifyID": spotify_id })));
        self.acknowledge(request)
    }

    pub fn publish_all(&self) -> Result<Ack, Error> {
        let request = &RequestBuilder::new("playlists/publishall", Method::Post, None)
            .set_body(Some(json!({})));
        self.acknowledge(request)
    }

    pub fn get_inclusions(&self, playlist_id: &str) -> Result<Vec<Item>, Error> {
        let request = &RequestBuilder::new(
            format!("playlists/{}/inclusions", playlist_id),
            Method::Get,
            None,
        );
        self.load(request)
    }
}

/// Catalog endpoints.
impl LedgerClient {
    pub fn search(&self, req: &SearchRequest) -> Result<Vec<Item>, Error> {
        self.load(&RequestBuilder::post("search", req)?)
    }

    pub fn get_artist_albums(&self, req: &ChildrenRequest) -> Result<Vec<Item>, Error> {
        self.load(&RequestBuilder::post("spotify/artist/albums", req)?)
    }

    pub fn get_album_tracks(&self, req: &ChildrenRequest) -> Result<Vec<Item>, Error> {
        self.load(&RequestBuilder::post("spotify/album/tracks", req)?)
    }
}

/// Inclusion endpoints.
impl LedgerClient {
    pub fn set_item(&self, req: &ItemRequest) -> Result<Ack, Error> {
        self.acknowledge(&RequestBuilder::post("playlist/item", req)?)
    }

    pub fn undo_item(&self, req: &ItemRequest) -> Result<Ack, Error> {
        self.acknowledge(&RequestBuilder::post("playlist/item/undo", req)?)
    }

    pub fn include_playlist(&self, req: &NestRequest) -> Result<Ack, Error> {
        self.acknowledge(&RequestBuilder::post("playlist/include", req)?)
    }

    pub fn undo_include_playlist(&self, req: &NestRequest) -> Result<Ack, Error> {
        self.acknowledge(&RequestBuilder::post("playlist/include/undo", req)?)
    }
}

impl Ledger for LedgerClient {
    fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, Error> {
        use LedgerResponse as R;

        Ok(match request {
            LedgerRequest::Playlists => R::Playlists(self.get_playlists()?),
            LedgerRequest::CreatePlaylist { name } => R::Playlist(self.create_playlist(name)?),
            LedgerRequest::RenamePlaylist { id, name } => {
                R::Playlist(self.rename_playlist(id, name)?)
            }
            LedgerRequest::DeletePlaylist { id } => R::Ack(self.delete_playlist(id)?),
            LedgerRequest::Publish { spotify_id } => R::Ack(self.publish(spotify_id)?),
            LedgerRequest::PublishAll => R::Ack(self.publish_all()?),
            LedgerRequest::Inclusions { playlist_id } => {
                R::Items(self.get_inclusions(playlist_id)?)
            }
            LedgerRequest::Search(req) => R::Items(self.search(req)?),
            LedgerRequest::ArtistAlbums(req) => R::Items(self.get_artist_albums(req)?),
            LedgerRequest::AlbumTracks(req) => R::Items(self.get_album_tracks(req)?),
            LedgerRequest::SetItem(req) => R::Ack(self.set_item(req)?),
            LedgerRequest::UndoItem(req) => R::Ack(self.undo_item(req)?),
            LedgerRequest::IncludePlaylist(req) => R::Ack(self.include_playlist(req)?),
            LedgerRequest::UndoPlaylist(req) => R::Ack(self.undo_include_playlist(req)?),
        })
    }
}

fn parse_base(base_url: &str) -> Result<Url, Error> {
    // Without the trailing slash `join` would replace the last path segment.
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{}/", base_url))?)
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Post,
    Put,
    Delete,
    Get,
}

#[derive(Debug, Clone)]
struct RequestBuilder {
    path: String,
    method: Method,
    body: Option<Value>,
}

impl RequestBuilder {
    fn new(path: impl Display, method: Method, body: Option<Value>) -> Self {
        Self {
            path: path.to_string(),
            method,
            body,
        }
    }

    fn post(path: impl Display, body: &impl Serialize) -> Result<Self, Error> {
        Ok(Self::new(path, Method::Post, Some(serde_json::to_value(body)?)))
    }

    fn get_body(&self) -> &Value {
        self.body.as_ref().unwrap_or(&Value::Null)
    }

    fn set_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }

    fn build(&self, base: &Url) -> Result<String, Error> {
        Ok(base.join(&self.path)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        thread::JoinHandle,
    };

    use super::*;

    /// Answer one request with `body` and hand back what was received.
    fn serve_once(body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut received = String::new();
            let mut length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        length = value.trim().parse().unwrap();
                    }
                }
                received.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }
            let mut payload = vec![0; length];
            reader.read_exact(&mut payload).unwrap();
            received.push_str(&String::from_utf8(payload).unwrap());
            write!(
                reader.get_mut(),
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .unwrap();
            received
        });
        (base, server)
    }

    #[test]
    fn rename_sends_put_with_json_body() {
        let (base, server) = serve_once(r#"{"id": 7, "spotifyID": "p1", "name": "Drive"}"#);
        let client = LedgerClient::new(&base, None, Duration::from_secs(5)).unwrap();

        let playlist = client.rename_playlist("p1", "Drive").unwrap();
        assert_eq!(&*playlist.name, "Drive");
        assert_eq!(playlist.id, Some(7));

        let received = server.join().unwrap();
        assert!(received.starts_with("PUT /api/playlists/p1/rename "));
        assert!(received.ends_with(r#"{"name":"Drive"}"#));
        assert!(!received.to_ascii_lowercase().contains("authorization:"));
    }

    #[test]
    fn empty_delete_response_is_a_null_ack() {
        let (base, server) = serve_once("");
        let client = LedgerClient::new(&base, None, Duration::from_secs(5)).unwrap();

        assert_eq!(client.delete_playlist("p1").unwrap(), Ack(Value::Null));
        assert!(server
            .join()
            .unwrap()
            .starts_with("DELETE /api/playlists/p1 "));
    }

    #[test]
    fn paths_join_below_the_base_path() {
        let base = parse_base("http://localhost:8080/api/v1").unwrap();
        let request = RequestBuilder::new("playlists/abc/inclusions", Method::Get, None);
        assert_eq!(
            request.build(&base).unwrap(),
            "http://localhost:8080/api/v1/playlists/abc/inclusions"
        );
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        assert!(matches!(
            LedgerClient::new("not a url", None, Duration::from_secs(1)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn post_body_serializes_request() {
        let request = RequestBuilder::post(
            "search",
            &SearchRequest {
                playlist_id: "p".into(),
                query: "wembley".into(),
                item_type: crate::item::ItemType::Album,
            },
        )
        .unwrap();
        assert_eq!(
            request.get_body(),
            &json!({"playlistId": "p", "query": "wembley", "type": 2})
        );
    }
}
