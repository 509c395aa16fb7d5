//! bannerkit composes promotional banners onto a fixed 1350x1350 logical canvas.
//!
//! The pipeline is:
//!
//! - Describe a banner with a [`BannerDescriptor`] (or [`BannerBuilder`])
//! - Fetch and decode its images concurrently with an [`AssetLoader`]
//! - Compose a layered [`BannerPlan`] with a [`Composer`]
//! - Preview it at any [`Viewport`] scale, or export it at a fixed size with an [`Exporter`]
//!
//! Per-entity stickers and backgrounds live in a [`SlotBank`] and are edited through
//! [`GestureSession`]s. [`BannerSession`] ties all of it together.
#![forbid(unsafe_code)]

mod assets;
mod compile;
mod composition;
mod config;
mod foundation;
mod render;
mod session;
mod slots;
mod viewport;

pub use crate::foundation::core::{
    Affine, BezPath, Canvas, LOGICAL_CANVAS_SIZE, Point, Rect, Rgba8, Vec2, mirror_x_within,
    percent_to_logical, rotate_scale_about,
};
pub use crate::foundation::error::{BannerError, BannerResult};

pub use crate::assets::PreparedImage;
pub use crate::assets::decode::{MAX_IMAGE_DIM, decode_image, rasterize_svg};
#[cfg(feature = "http")]
pub use crate::assets::source::HttpAssetSource;
pub use crate::assets::source::{
    AssetSource, FsAssetSource, RoutedAssetSource, normalize_rel_path,
};
pub use crate::assets::loader::{
    AssetFailure, AssetLoader, AssetLoaderOpts, BatchToken, DEFAULT_LOADER_THREADS, DiagnosticFn,
    LoadEvent, LoadHandle, LoadOutcome, LoadProgress, LoadedAssets, ResolvedAsset, UriSet,
};

pub use crate::composition::dsl::{BannerBuilder, sticker_at};
pub use crate::composition::model::{
    BannerCategory, BannerDescriptor, CategoryTag, ImageRefs, MAX_UPLINES, StickerPlacement,
    TextFields, Upline,
};

pub use crate::compile::category::{CategoryStyle, Icon, format_amount, style_for};
pub use crate::compile::layout::{
    BandLayout, BlockLayout, DEFAULT_STICKER_POSITION_X, DEFAULT_STICKER_POSITION_Y,
    DEFAULT_STICKER_ROTATION_DEG, DEFAULT_STICKER_SCALE, LayoutConfig, LogoSlot, NameRule,
    Palette, PhotoSlot, STICKER_BASE_SIZE, StickerDefaults, UplineRow,
};
pub use crate::compile::plan::{
    BannerPlan, Composer, DrawOp, FontWeight, Layer, Shape, SlotLayers, TextAlign, compose,
};

pub use crate::slots::gesture::GestureSession;
pub use crate::slots::persistence::{
    InMemorySlotPersistence, JsonFileSlotPersistence, SlotPersistence, SlotRecord,
};
pub use crate::slots::store::{
    GroupKey, SLOT_CAPACITY, Slot, SlotBank, SlotKey, SlotKind, SlotTransform,
    SlotTransformStore, TransformPatch,
};

pub use crate::viewport::scaler::{RenderTarget, Viewport, compute_scale};

pub use crate::render::cpu::CpuBackend;
pub use crate::render::export::{
    CAPTURE_EXPORT_SIZE, DEFAULT_JPEG_QUALITY, ExportFormat, ExportProfile, Exporter,
    RasterBuffer,
};
pub use crate::render::{FrameRGBA, RenderBackend, RenderSettings, create_backend};

pub use crate::config::{DEFAULT_HTTP_TIMEOUT_SECS, EngineConfig};
pub use crate::session::banner::BannerSession;
