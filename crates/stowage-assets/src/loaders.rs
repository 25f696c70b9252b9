//! Per-kind loaders.
//!
//! Each loader resolves its locator against the current [`AssetPaths`](crate::AssetPaths),
//! asks the platform for the resource, and on success writes the value into the
//! resource table before fulfilling. Failures reject with
//! [`AssetError::LoadFailed`] carrying the kind, URL and name.

use std::rc::Rc;

use stowage_promise::Value;

use crate::bundle::AssetSpec;
use crate::error::AssetError;
use crate::io::{Completion, IoFailure};
use crate::kind::{AssetKind, asset_name};
use crate::manager::{AssetManager, AssetPromise};
use crate::resource::{Audio, DataValue, Image, Resource};

/// How a data document is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataFormat {
    /// Parse as JSON, keeping the raw payload if that fails. Valid UTF-8 is
    /// kept as text, anything else as the fetched bytes.
    #[default]
    Auto,
    /// Parse as JSON; a parse error fails the load.
    Json,
}

impl DataFormat {
    fn decode(self, bytes: &[u8]) -> Result<DataValue, String> {
        match serde_json::from_slice::<serde_json::Value>(bytes) {
            Ok(value) => Ok(DataValue::Json(Rc::new(value))),
            Err(error) => match self {
                DataFormat::Auto => Ok(match std::str::from_utf8(bytes) {
                    Ok(text) => DataValue::Raw(text.into()),
                    Err(_) => DataValue::Binary(bytes.into()),
                }),
                DataFormat::Json => Err(format!("invalid JSON: {}", error)),
            },
        }
    }
}

/// What a completed request turns into.
struct Converted<T> {
    value: T,
    entry: Option<Resource>,
}

impl AssetManager {
    /// Build a completion that settles the returned promise.
    ///
    /// `convert` maps the platform output to the fulfilled value and the
    /// table entry, if any. Conversion errors count as load failures.
    fn completion<R, T>(
        &self,
        kind: AssetKind,
        url: &str,
        name: Option<&str>,
        convert: impl FnOnce(&str, R) -> Result<Converted<T>, String> + 'static,
    ) -> (AssetPromise<T>, Completion<R>)
    where
        R: 'static,
        T: Value,
    {
        let deferred = self.inner.scheduler.defer::<T, AssetError>();
        let settle = deferred.clone();
        let resources = self.inner.resources.clone();
        let url = url.to_string();
        let name = name.map(str::to_string);

        let done: Completion<R> = Box::new(move |result: Result<R, IoFailure>| {
            let converted = result
                .map_err(|failure| failure.to_string())
                .and_then(|raw| convert(&url, raw));
            match converted {
                Ok(Converted { value, entry }) => {
                    if let Some(entry) = entry {
                        resources.insert(&url, name.as_deref(), entry);
                    }
                    tracing::trace!(%kind, url = url.as_str(), "asset loaded");
                    settle.resolve(value);
                }
                Err(cause) => {
                    tracing::warn!(%kind, url = url.as_str(), cause = cause.as_str(), "asset failed to load");
                    settle.reject(AssetError::load_failed(kind, url, name.as_deref(), cause));
                }
            }
        });
        (deferred.promise(), done)
    }

    /// Decode an image and store it.
    pub fn load_image(&self, locator: &str, name: Option<&str>) -> AssetPromise<Image> {
        let url = self.resolve_url(AssetKind::Image, locator);
        let (promise, done) = self.completion(AssetKind::Image, &url, name, |url, bytes: Vec<u8>| {
            let image = Image::new(url, bytes);
            Ok(Converted {
                value: image.clone(),
                entry: Some(Resource::Image(image)),
            })
        });
        self.inner.io.decode_image(&url, done);
        promise
    }

    /// Load the first playable candidate of an audio clip and store it.
    ///
    /// Rejects with [`AssetError::UnsupportedAudioFormat`] without touching the
    /// platform if no candidate is playable. When audio is deferred until
    /// interaction the clip fulfils at once with an unbuffered handle; the
    /// table entry is upgraded if buffering later succeeds.
    pub fn load_audio(&self, spec: impl Into<AssetSpec>, name: Option<&str>) -> AssetPromise<Audio> {
        let candidates = spec.into().into_locators();
        let chosen = self
            .inner
            .capabilities
            .negotiate(candidates.as_slice())
            .map(str::to_string);
        let Some(chosen) = chosen else {
            let asset = match name {
                Some(name) => name.to_string(),
                None => candidates
                    .first()
                    .map(|c| asset_name(c).to_string())
                    .unwrap_or_default(),
            };
            tracing::warn!(name = asset.as_str(), ?candidates, "no playable audio format");
            return self
                .inner
                .scheduler
                .rejected(AssetError::UnsupportedAudioFormat { name: asset, candidates });
        };
        let url = self.resolve_url(AssetKind::Audio, &chosen);

        if self.inner.policy.defer_audio_until_interaction {
            let audio = Audio::deferred(url.as_str());
            self.inner
                .resources
                .insert(&url, name, Resource::Audio(audio.clone()));

            let resources = self.inner.resources.clone();
            let name = name.map(str::to_string);
            let target = url.clone();
            self.inner.io.buffer_audio(
                &url,
                Box::new(move |result: Result<Vec<u8>, IoFailure>| match result {
                    Ok(bytes) => {
                        let audio = Audio::buffered(target.as_str(), bytes);
                        resources.insert(&target, name.as_deref(), Resource::Audio(audio));
                    }
                    Err(failure) => {
                        tracing::warn!(url = target.as_str(), %failure, "deferred audio failed to buffer");
                    }
                }),
            );
            return self.inner.scheduler.resolved(audio);
        }

        let (promise, done) = self.completion(AssetKind::Audio, &url, name, |url, bytes: Vec<u8>| {
            let audio = Audio::buffered(url, bytes);
            Ok(Converted {
                value: audio.clone(),
                entry: Some(Resource::Audio(audio)),
            })
        });
        self.inner.io.buffer_audio(&url, done);
        promise
    }

    /// Inject a script. Nothing is stored.
    pub fn load_script(&self, locator: &str, name: Option<&str>) -> AssetPromise<()> {
        let url = self.resolve_url(AssetKind::Script, locator);
        let (promise, done) = self.completion(AssetKind::Script, &url, name, |_, ()| {
            Ok(Converted {
                value: (),
                entry: None,
            })
        });
        self.inner.io.inject_script(&url, done);
        promise
    }

    /// Inject a stylesheet. Nothing is stored.
    pub fn load_stylesheet(&self, locator: &str, name: Option<&str>) -> AssetPromise<()> {
        let url = self.resolve_url(AssetKind::Stylesheet, locator);
        let (promise, done) = self.completion(AssetKind::Stylesheet, &url, name, |_, ()| {
            Ok(Converted {
                value: (),
                entry: None,
            })
        });
        self.inner.io.inject_stylesheet(&url, done);
        promise
    }

    /// Fetch a data document and store it.
    pub fn load_data(
        &self,
        locator: &str,
        name: Option<&str>,
        format: DataFormat,
    ) -> AssetPromise<DataValue> {
        let url = self.resolve_url(AssetKind::Data, locator);
        let (promise, done) = self.completion(AssetKind::Data, &url, name, move |_, bytes: Vec<u8>| {
            let data = format.decode(&bytes)?;
            Ok(Converted {
                value: data.clone(),
                entry: Some(Resource::Data(data)),
            })
        });
        self.inner.io.fetch(&url, done);
        promise
    }
}
