use std::{path::Path, sync::Arc};

use crate::{
    assets::loader::{AssetLoader, LoadEvent, LoadOutcome, LoadedAssets, UriSet},
    compile::plan::{BannerPlan, Composer, SlotLayers},
    composition::model::BannerDescriptor,
    config::EngineConfig,
    foundation::core::Canvas,
    foundation::error::BannerResult,
    render::{
        FrameRGBA, RenderBackend, create_backend,
        export::{ExportProfile, Exporter, RasterBuffer},
    },
    slots::{
        persistence::SlotPersistence,
        store::{GroupKey, SlotBank},
    },
    viewport::scaler::Viewport,
};

/// One banner being edited: its descriptor, loaded assets, slot bank, preview viewport and
/// exporter.
///
/// Preview and export both compose from the same descriptor, assets and slots, so what the
/// preview shows at any scale is what the export rasterizes.
pub struct BannerSession {
    descriptor: BannerDescriptor,
    group: Option<GroupKey>,
    loader: AssetLoader,
    slots: SlotBank,
    composer: Composer,
    viewport: Viewport,
    preview: Box<dyn RenderBackend>,
    exporter: Exporter,
    assets: Arc<LoadedAssets>,
}

impl BannerSession {
    pub fn new(
        descriptor: BannerDescriptor,
        loader: AssetLoader,
        slots: SlotBank,
        config: &EngineConfig,
    ) -> BannerResult<Self> {
        warn_if_invalid(&descriptor);
        let settings = config.render_settings()?;
        Ok(Self {
            descriptor,
            group: None,
            loader,
            slots,
            composer: Composer::new(config.layout.clone()),
            viewport: Viewport::new(0.0),
            preview: create_backend(&settings),
            exporter: Exporter::new(&settings, config.background_rgba)
                .with_jpeg_quality(config.jpeg_quality),
            assets: Arc::new(LoadedAssets::empty()),
        })
    }

    /// Build the loader and slot bank from `config`.
    pub fn from_config(
        descriptor: BannerDescriptor,
        config: &EngineConfig,
        persistence: Arc<dyn SlotPersistence>,
    ) -> BannerResult<Self> {
        let loader = config.loader(None)?;
        Self::new(descriptor, loader, SlotBank::new(persistence), config)
    }

    /// Pull sticker and background slots of `group` into the composition.
    pub fn with_slot_group(mut self, group: GroupKey) -> Self {
        self.group = Some(group);
        self
    }

    pub fn descriptor(&self) -> &BannerDescriptor {
        &self.descriptor
    }

    /// Swap the descriptor. The next [`BannerSession::load`] fetches whatever it needs.
    pub fn set_descriptor(&mut self, descriptor: BannerDescriptor) {
        warn_if_invalid(&descriptor);
        self.descriptor = descriptor;
    }

    pub fn slot_group(&self) -> Option<&GroupKey> {
        self.group.as_ref()
    }

    pub fn slots_mut(&mut self) -> &mut SlotBank {
        &mut self.slots
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    /// Assets of the last committed load.
    pub fn assets(&self) -> &Arc<LoadedAssets> {
        &self.assets
    }

    fn slot_layers(&mut self) -> BannerResult<SlotLayers> {
        match &self.group {
            Some(group) => self.slots.layers(group),
            None => Ok(SlotLayers::default()),
        }
    }

    /// Every URI the current descriptor and active slots reference.
    pub fn uri_set(&mut self) -> BannerResult<UriSet> {
        let layers = self.slot_layers()?;
        let mut uris = self.descriptor.referenced_uris();
        uris.extend(layers.background);
        uris.extend(layers.stickers.into_iter().map(|s| s.image_uri));
        Ok(UriSet::new(uris))
    }

    /// Load assets for the current descriptor and slots. Only `Cached` and `Committed`
    /// outcomes replace the session's assets.
    pub fn load(&mut self, on_event: impl FnMut(LoadEvent)) -> BannerResult<LoadOutcome> {
        let uris = self.uri_set()?;
        let outcome = self.loader.load(&uris, on_event);
        if let Some(assets) = outcome.assets() {
            self.assets = assets.clone();
        }
        Ok(outcome)
    }

    pub fn compose(&mut self) -> BannerResult<BannerPlan> {
        let layers = self.slot_layers()?;
        Ok(self
            .composer
            .compose(&self.descriptor, &self.assets, &layers))
    }

    /// Render the live preview for a container `container_width` pixels wide. Returns `None`
    /// while the container has no usable width.
    pub fn preview(&mut self, container_width: f64) -> BannerResult<Option<FrameRGBA>> {
        self.viewport.resize(container_width);
        let Some(side) = self.viewport.backing_pixels() else {
            return Ok(None);
        };
        let plan = self.compose()?;
        let frame = self
            .preview
            .render_plan(&plan, &self.assets, Canvas::square(side)?)?;
        Ok(Some(frame))
    }

    /// Rasterize at `profile` from logical coordinates. The preview's scale plays no part.
    pub fn export(&mut self, profile: ExportProfile) -> BannerResult<RasterBuffer> {
        let plan = self.compose()?;
        self.exporter.export_profile(&plan, &self.assets, profile)
    }

    pub fn export_to_path(
        &mut self,
        profile: ExportProfile,
        path: &Path,
    ) -> BannerResult<RasterBuffer> {
        let plan = self.compose()?;
        self.exporter
            .export_to_path(&plan, &self.assets, profile, path)
    }

    /// Stop the loader; late batches are dropped instead of committed.
    pub fn teardown(&self) {
        self.loader.teardown();
    }
}

// Invalid descriptors still compose; the offending parts degrade.
fn warn_if_invalid(descriptor: &BannerDescriptor) {
    if let Err(e) = descriptor.validate() {
        tracing::warn!(error = %e, "descriptor has invalid parts");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/banner.rs"]
mod tests;
