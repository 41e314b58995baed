//! Owner of the blob, the arena and the dedup caches.

use std::fmt;

use tracing::{debug, trace};

use crate::{
    blob::{BYTECODE_SEGMENT, BlobLocator, ConstantsBlob, InMemoryBlob},
    cache::{CacheKind, CacheStats, ConstCaches},
    config::RuntimeConfig,
    decode::{Decoder, Singletons},
    error::{BlobError, BlobResult},
    heap::Heap,
    object::ConstObject,
    reader::BlobReader,
    value::{BlobSpan, Value},
};

/// Decodes constants segments on demand and keeps every decoded constant
/// alive for its own lifetime.
///
/// The blob is located and checksummed on the first request and kept from
/// then on; a failed attempt leaves the runtime uninitialised. The dedup
/// caches are created on the first request for a segment that uses them and
/// persist across segments, so equal constants in different segments share
/// one object.
pub struct ConstantsRuntime {
    config: RuntimeConfig,
    locator: Box<dyn BlobLocator + Send>,
    blob: Option<ConstantsBlob>,
    heap: Heap,
    caches: Option<ConstCaches>,
    singletons: Singletons,
}

impl fmt::Debug for ConstantsRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantsRuntime")
            .field("config", &self.config)
            .field("locator", &self.locator.describe())
            .field("blob", &self.blob)
            .field("heap_len", &self.heap.len())
            .finish_non_exhaustive()
    }
}

impl ConstantsRuntime {
    pub fn new(locator: impl BlobLocator + Send + 'static, config: RuntimeConfig) -> Self {
        Self {
            config,
            locator: Box::new(locator),
            blob: None,
            heap: Heap::new(),
            caches: None,
            singletons: Singletons::default(),
        }
    }

    /// Runtime over a blob already held in memory.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>, config: RuntimeConfig) -> Self {
        Self::new(InMemoryBlob(bytes), config)
    }

    #[must_use]
    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    /// Whether the blob has been located and verified.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.blob.is_some()
    }

    /// Locates and verifies the blob if that has not happened yet.
    pub fn ensure_ready(&mut self) -> BlobResult<&ConstantsBlob> {
        let blob = match self.blob.take() {
            Some(blob) => blob,
            None => self.locate()?,
        };
        Ok(self.blob.insert(blob))
    }

    fn locate(&self) -> BlobResult<ConstantsBlob> {
        let version = self.config.host_version;
        if !version.is_supported() {
            return Err(BlobError::UnsupportedVersion(version));
        }
        let blob = ConstantsBlob::verify(self.locator.locate()?)?;
        debug!(
            source = %self.locator.describe(),
            payload_len = blob.payload().len(),
            checksum = blob.checksum(),
            host_version = %version,
            "constants blob verified"
        );
        Ok(blob)
    }

    /// Decodes the named segment and returns its constants in order.
    ///
    /// Decoding the same segment twice yields the same objects for every
    /// deduplicated kind.
    pub fn load_segment(&mut self, name: &str) -> BlobResult<Vec<Value>> {
        let blob = match self.blob.take() {
            Some(blob) => blob,
            None => self.locate()?,
        };
        let blob = &*self.blob.insert(blob);
        let segment = blob.find_segment(name)?;

        let dedup = name != BYTECODE_SEGMENT;
        let caches = if dedup {
            let (heap, singletons) = (&self.heap, &self.singletons);
            Some(self.caches.get_or_insert_with(|| seeded_caches(heap, singletons)))
        } else {
            self.caches.as_mut()
        };
        let mut decoder = Decoder::new(
            BlobReader::with_base(segment.data, segment.offset),
            &mut self.heap,
            caches,
            dedup,
            &mut self.singletons,
            self.config,
        );
        let values = decoder.decode_segment()?;
        let remaining = decoder.remaining();
        if remaining != 0 {
            return Err(BlobError::TrailingBytes {
                name: name.to_owned(),
                remaining,
            });
        }
        trace!(segment = name, count = values.len(), heap_len = self.heap.len(), "decoded constants segment");
        Ok(values)
    }

    /// Decodes the named segment into `output`, whose length must match the
    /// segment's constant count.
    pub fn load_constants_blob(&mut self, name: &str, output: &mut [Value]) -> BlobResult<()> {
        let values = self.load_segment(name)?;
        if values.len() != output.len() {
            return Err(BlobError::CountMismatch {
                name: name.to_owned(),
                expected: output.len(),
                found: values.len(),
            });
        }
        output.copy_from_slice(&values);
        Ok(())
    }

    /// Names of every segment in the blob, in payload order.
    pub fn segment_names(&mut self) -> BlobResult<Vec<String>> {
        self.ensure_ready()?
            .segments()
            .map(|segment| segment.map(|s| s.name.to_owned()))
            .collect()
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The verified blob, once located.
    #[must_use]
    pub fn blob(&self) -> Option<&ConstantsBlob> {
        self.blob.as_ref()
    }

    /// Bytes referenced by a raw-data constant.
    #[must_use]
    pub fn raw_data(&self, span: BlobSpan) -> Option<&[u8]> {
        self.blob.as_ref()?.raw(span)
    }

    #[must_use]
    pub fn to_object(&self, value: Value) -> ConstObject {
        self.heap.to_object(value)
    }

    /// Entry and hit counts for every cache kind; all zero before the first
    /// deduplicated segment is decoded.
    #[must_use]
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        match &self.caches {
            Some(caches) => caches.stats(),
            None => ConstCaches::new().stats(),
        }
    }
}

/// Fresh caches that already know the singletons created while no caches
/// existed, so later constants with the same content resolve to them.
fn seeded_caches(heap: &Heap, singletons: &Singletons) -> ConstCaches {
    let mut caches = ConstCaches::new();
    for id in singletons.special_floats.iter().flatten() {
        caches.adopt(heap, CacheKind::Float, *id);
    }
    if let Some(id) = singletons.version_info {
        // the release level string first, so tuple identity lines up
        let release = heap.tuple_items(Value::Ref(id)).unwrap_or_default().iter();
        for text in release.filter_map(|item| item.ref_id()) {
            caches.adopt(heap, CacheKind::Unicode, text);
        }
        caches.adopt(heap, CacheKind::Tuple, id);
    }
    caches
}
