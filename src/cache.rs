// Token persistence
//
// Two credential kinds are cached independently: the delegated OAuth1 token
// and the bearer access token. A missing entry is `CacheMiss`, distinct from
// i/o and decode failures, so a cold cache falls through to a fresh login
// instead of failing it.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{AccessToken, OAuth1Token};
use crate::error::Error;

const ACCESS_TOKEN_FILE: &str = "access_token.json";
const OAUTH1_TOKEN_FILE: &str = "oauth1_token.json";

pub trait TokenCacher: Send + Sync {
    fn save_access_token(&self, token: &AccessToken) -> Result<(), Error>;
    fn get_access_token(&self) -> Result<AccessToken, Error>;
    fn del_access_token(&self) -> Result<(), Error>;
    fn save_oauth1_token(&self, token: &OAuth1Token) -> Result<(), Error>;
    fn get_oauth1_token(&self) -> Result<OAuth1Token, Error>;
    fn del_oauth1_token(&self) -> Result<(), Error>;
}

/// True when the cacher holds a readable access token.
pub fn cache_ok(cacher: &dyn TokenCacher) -> bool {
    cacher.get_access_token().is_ok()
}

/// Process-local holder with no durable backing.
#[derive(Default)]
pub struct InMemoryCacher {
    access: Mutex<Option<AccessToken>>,
    oauth1: Mutex<Option<OAuth1Token>>,
}

impl InMemoryCacher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCacher for InMemoryCacher {
    fn save_access_token(&self, token: &AccessToken) -> Result<(), Error> {
        *self.access.lock().unwrap() = Some(token.clone());
        Ok(())
    }

    fn get_access_token(&self) -> Result<AccessToken, Error> {
        self.access.lock().unwrap().clone().ok_or(Error::CacheMiss)
    }

    fn del_access_token(&self) -> Result<(), Error> {
        *self.access.lock().unwrap() = None;
        Ok(())
    }

    fn save_oauth1_token(&self, token: &OAuth1Token) -> Result<(), Error> {
        *self.oauth1.lock().unwrap() = Some(token.clone());
        Ok(())
    }

    fn get_oauth1_token(&self) -> Result<OAuth1Token, Error> {
        self.oauth1.lock().unwrap().clone().ok_or(Error::CacheMiss)
    }

    fn del_oauth1_token(&self) -> Result<(), Error> {
        *self.oauth1.lock().unwrap() = None;
        Ok(())
    }
}

/// Durable cacher: one JSON document per credential kind under `dir`, with an
/// in-memory read-through layer. Writes go to disk first, then memory.
pub struct FileCacher {
    dir: PathBuf,
    prefix: String,
    mem: InMemoryCacher,
}

impl FileCacher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: String::new(),
            mem: InMemoryCacher::new(),
        }
    }

    /// Prefix for the document names, for keeping several accounts in one
    /// directory.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Cacher rooted at the platform cache directory, or `None` when the
    /// platform does not define one.
    pub fn default_location() -> Option<Self> {
        dirs::cache_dir().map(|dir| Self::new(dir.join("garmin-connect")))
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.prefix, name))
    }

    fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(Error::CacheIo)?;
        let body = serde_json::to_vec(value).map_err(Error::CacheDecode)?;
        fs::write(self.path(name), body).map_err(Error::CacheIo)
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        let bytes = match fs::read(self.path(name)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(Error::CacheMiss),
            Err(e) => return Err(Error::CacheIo(e)),
        };
        serde_json::from_slice(&bytes).map_err(Error::CacheDecode)
    }

    fn remove(&self, name: &str) -> Result<(), Error> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::CacheIo(e)),
        }
    }
}

impl TokenCacher for FileCacher {
    fn save_access_token(&self, token: &AccessToken) -> Result<(), Error> {
        self.save(ACCESS_TOKEN_FILE, token)?;
        self.mem.save_access_token(token)
    }

    fn get_access_token(&self) -> Result<AccessToken, Error> {
        if let Ok(token) = self.mem.get_access_token() {
            return Ok(token);
        }
        let token: AccessToken = self.load(ACCESS_TOKEN_FILE)?;
        self.mem.save_access_token(&token)?;
        Ok(token)
    }

    fn del_access_token(&self) -> Result<(), Error> {
        self.mem.del_access_token()?;
        self.remove(ACCESS_TOKEN_FILE)
    }

    fn save_oauth1_token(&self, token: &OAuth1Token) -> Result<(), Error> {
        self.save(OAUTH1_TOKEN_FILE, token)?;
        self.mem.save_oauth1_token(token)
    }

    fn get_oauth1_token(&self) -> Result<OAuth1Token, Error> {
        if let Ok(token) = self.mem.get_oauth1_token() {
            return Ok(token);
        }
        let token: OAuth1Token = self.load(OAUTH1_TOKEN_FILE)?;
        self.mem.save_oauth1_token(&token)?;
        Ok(token)
    }

    fn del_oauth1_token(&self) -> Result<(), Error> {
        self.mem.del_oauth1_token()?;
        self.remove(OAUTH1_TOKEN_FILE)
    }
}
