//! The Bundler: create, sign, bundle and verify data items with one signer.

use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use databundle_core::{
    decode_bundle, decode_bundle_stream, new_item, new_item_stream, read_item_count, sign_item,
    verify_item, write_bundle_stream, Bundle, BundleItem, CoreError, DataSource, ItemSigner,
    Payload, Tag,
};

use crate::config::BundlerConfig;
use crate::error::{BundlerError, Result};

/// Tag naming the container format of a bundle.
pub const BUNDLE_FORMAT_TAG: &str = "Bundle-Format";

/// Tag naming the container version of a bundle.
pub const BUNDLE_VERSION_TAG: &str = "Bundle-Version";

/// Value of [`BUNDLE_FORMAT_TAG`].
pub const BUNDLE_FORMAT: &str = "binary";

/// Value of [`BUNDLE_VERSION_TAG`].
pub const BUNDLE_VERSION: &str = "2.0.0";

/// Creates and signs items with a single signing capability.
pub struct Bundler<S: ItemSigner> {
    signer: S,
    config: BundlerConfig,
}

impl<S: ItemSigner> Bundler<S> {
    /// Create a bundler with default configuration.
    pub fn new(signer: S) -> Self {
        Self::with_config(signer, BundlerConfig::default())
    }

    pub fn with_config(signer: S, config: BundlerConfig) -> Self {
        Self { signer, config }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }

    /// The signer's owner key in wire form.
    pub fn owner(&self) -> Vec<u8> {
        self.signer.owner()
    }

    /// The signer's address under its scheme.
    pub fn signer_address(&self) -> Result<String> {
        Ok(self.signer.address()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Item Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create and sign an item with an in-memory payload.
    pub fn create_and_sign_item(
        &self,
        data: impl Into<Bytes>,
        target: Option<[u8; 32]>,
        anchor: Option<[u8; 32]>,
        tags: Vec<Tag>,
    ) -> Result<BundleItem> {
        let mut item = new_item(
            self.signer.owner(),
            self.signer.signature_type(),
            target,
            anchor,
            data,
            tags,
        )?;
        sign_item(&mut item, &self.signer)?;
        Ok(item)
    }

    /// Create and sign an item whose payload stays behind `source`.
    ///
    /// The source is read once for hashing and left rewound.
    pub fn create_and_sign_item_stream(
        &self,
        source: DataSource,
        target: Option<[u8; 32]>,
        anchor: Option<[u8; 32]>,
        tags: Vec<Tag>,
    ) -> Result<BundleItem> {
        let mut item = new_item_stream(
            self.signer.owner(),
            self.signer.signature_type(),
            target,
            anchor,
            source,
            tags,
        )?;
        sign_item(&mut item, &self.signer)?;
        Ok(item)
    }

    /// Create and sign an item whose payload is a bundle of `items`.
    ///
    /// Caller tags may not use the reserved bundle tag names. The reserved
    /// tags are appended after the caller's.
    pub fn create_and_sign_nested_item(
        &self,
        target: Option<[u8; 32]>,
        anchor: Option<[u8; 32]>,
        mut tags: Vec<Tag>,
        items: Vec<BundleItem>,
    ) -> Result<BundleItem> {
        check_reserved_tags(&tags)?;
        tags.extend(reserved_tags());

        let binary = match Bundle::new(items)?.into_binary() {
            Payload::Bytes(b) => b,
            Payload::Source(mut s) => Bytes::from(s.read_all().map_err(CoreError::from)?),
        };
        self.create_and_sign_item(binary, target, anchor, tags)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bundle Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Assemble signed items into an in-memory bundle.
    pub fn bundle(&self, items: Vec<BundleItem>) -> Result<Bundle> {
        Ok(Bundle::new(items)?)
    }

    /// Decode a bundle from a buffer, verifying items if configured.
    pub fn decode_bundle(&self, binary: impl Into<Bytes>) -> Result<Bundle> {
        decode_bundle_with(binary, &self.config)
    }

    /// Decode a bundle from an external source, verifying items if configured.
    pub fn decode_bundle_stream(&self, source: DataSource) -> Result<Bundle> {
        decode_bundle_stream_with(source, &self.config)
    }

    /// Verify every item of a bundle.
    pub fn verify_bundle(&self, bundle: &mut Bundle) -> Result<()> {
        verify_bundle(bundle)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // File Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Decode a bundle file without loading it into memory.
    ///
    /// Item payloads land in temporary files under the configured directory.
    pub async fn decode_bundle_file(&self, path: impl AsRef<Path>) -> Result<Bundle> {
        let path = path.as_ref().to_path_buf();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || -> Result<Bundle> {
            let file = File::open(&path)?;
            decode_bundle_stream_with(DataSource::File(file), &config)
        })
        .await
        .map_err(|e| BundlerError::Task(format!("spawn_blocking failed: {}", e)))?
    }

    /// Encode `items` into a bundle file at `path`.
    ///
    /// Returns the bundle backed by the written file, rewound.
    pub async fn encode_bundle_file(
        &self,
        items: Vec<BundleItem>,
        path: impl AsRef<Path>,
    ) -> Result<Bundle> {
        let path = path.as_ref().to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<Bundle> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;

            let mut items = items;
            let mut writer = BufWriter::new(file);
            let written = write_bundle_stream(&mut items, &mut writer)?;
            let mut file = writer.into_inner().map_err(|e| e.into_error())?;
            file.flush()?;
            file.rewind()?;

            tracing::debug!(
                "wrote bundle of {} items to {} ({} bytes)",
                items.len(),
                path.display(),
                written
            );
            Ok(Bundle {
                items,
                binary: Payload::Source(DataSource::File(file)),
            })
        })
        .await
        .map_err(|e| BundlerError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

/// The reserved tags marking an item or transaction as a bundle.
pub fn reserved_tags() -> [Tag; 2] {
    [
        Tag::new(BUNDLE_FORMAT_TAG, BUNDLE_FORMAT),
        Tag::new(BUNDLE_VERSION_TAG, BUNDLE_VERSION),
    ]
}

/// Reject caller tags that reuse a reserved bundle tag name.
pub fn check_reserved_tags(tags: &[Tag]) -> Result<()> {
    match tags
        .iter()
        .find(|t| t.name == BUNDLE_FORMAT_TAG || t.name == BUNDLE_VERSION_TAG)
    {
        Some(tag) => Err(BundlerError::ReservedTagCollision(tag.name.clone())),
        None => Ok(()),
    }
}

/// Tags for submitting a bundle as a top-level transaction: the reserved
/// tags first, then the caller's.
pub fn bundle_tags(user_tags: Vec<Tag>) -> Result<Vec<Tag>> {
    check_reserved_tags(&user_tags)?;
    let mut tags = reserved_tags().to_vec();
    tags.extend(user_tags);
    Ok(tags)
}

/// Verify every item of a bundle, stopping at the first failure.
pub fn verify_bundle(bundle: &mut Bundle) -> Result<()> {
    for (index, item) in bundle.items.iter_mut().enumerate() {
        if let Err(e) = verify_item(item) {
            let id = item.id.map(|id| id.to_b64()).unwrap_or_default();
            tracing::warn!("bundle item {} ({}) failed verification: {}", index, id, e);
            return Err(e.into());
        }
    }
    tracing::debug!("verified {} bundle items", bundle.len());
    Ok(())
}

/// Decode a buffered bundle under `config`.
pub fn decode_bundle_with(binary: impl Into<Bytes>, config: &BundlerConfig) -> Result<Bundle> {
    let binary = binary.into();
    check_item_count(read_item_count(binary.as_ref())?, config)?;

    let mut bundle = decode_bundle(binary)?;
    if config.verify_on_decode {
        verify_bundle(&mut bundle)?;
    }
    Ok(bundle)
}

/// Decode a streamed bundle under `config`.
pub fn decode_bundle_stream_with(mut source: DataSource, config: &BundlerConfig) -> Result<Bundle> {
    source.rewind().map_err(CoreError::from)?;
    check_item_count(read_item_count(&mut source)?, config)?;

    let mut bundle = decode_bundle_stream(source, &config.temp_dir)?;
    if config.verify_on_decode {
        verify_bundle(&mut bundle)?;
    }
    Ok(bundle)
}

fn check_item_count(count: u64, config: &BundlerConfig) -> Result<()> {
    if count > config.max_item_count {
        tracing::warn!("rejecting bundle declaring {} items (limit {})", count, config.max_item_count);
        return Err(CoreError::MalformedField(format!(
            "bundle declares {} items, limit is {}",
            count, config.max_item_count
        ))
        .into());
    }
    Ok(())
}
