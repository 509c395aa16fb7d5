use crate::{
    composition::model::{
        BannerDescriptor, CategoryTag, ImageRefs, StickerPlacement, TextFields, Upline,
    },
    foundation::error::{BannerError, BannerResult},
};

/// Fluent builder for [`BannerDescriptor`].
///
/// `build` runs [`BannerDescriptor::validate`], so a built descriptor always carries a recognised
/// category and at most five uplines.
pub struct BannerBuilder {
    category: CategoryTag,
    text: TextFields,
    images: ImageRefs,
    uplines: Vec<Upline>,
    stickers: Vec<StickerPlacement>,
    flip_achiever: bool,
    flip_mentor: bool,
}

impl BannerBuilder {
    pub fn new(category: impl Into<CategoryTag>) -> Self {
        Self {
            category: category.into(),
            text: TextFields::default(),
            images: ImageRefs::default(),
            uplines: Vec::new(),
            stickers: Vec::new(),
            flip_achiever: false,
            flip_mentor: false,
        }
    }

    pub fn user_name(mut self, v: impl Into<String>) -> Self {
        self.text.user_name = Some(v.into());
        self
    }

    pub fn team_city(mut self, v: impl Into<String>) -> Self {
        self.text.team_city = Some(v.into());
        self
    }

    pub fn cheque_amount(mut self, v: impl Into<String>) -> Self {
        self.text.cheque_amount = Some(v.into());
        self
    }

    pub fn mobile(mut self, v: impl Into<String>) -> Self {
        self.text.mobile = Some(v.into());
        self
    }

    pub fn profile(mut self, name: impl Into<String>, rank: impl Into<String>) -> Self {
        self.text.profile_name = Some(name.into());
        self.text.profile_rank = Some(rank.into());
        self
    }

    pub fn trip_name(mut self, v: impl Into<String>) -> Self {
        self.text.trip_name = Some(v.into());
        self
    }

    pub fn message(mut self, v: impl Into<String>) -> Self {
        self.text.message = Some(v.into());
        self
    }

    pub fn quote(mut self, v: impl Into<String>) -> Self {
        self.text.quote = Some(v.into());
        self
    }

    pub fn event(
        mut self,
        title: impl Into<String>,
        date: impl Into<String>,
        venue: impl Into<String>,
    ) -> Self {
        self.text.event_title = Some(title.into());
        self.text.event_date = Some(date.into());
        self.text.event_venue = Some(venue.into());
        self
    }

    pub fn achiever(mut self, uri: impl Into<String>) -> Self {
        self.images.achiever = Some(uri.into());
        self
    }

    pub fn background(mut self, uri: impl Into<String>) -> Self {
        self.images.background = Some(uri.into());
        self
    }

    pub fn mentor(mut self, uri: impl Into<String>) -> Self {
        self.images.mentor = Some(uri.into());
        self
    }

    pub fn logos(mut self, left: Option<String>, right: Option<String>) -> Self {
        self.images.logo_left = left;
        self.images.logo_right = right;
        self
    }

    pub fn congrats_image(mut self, uri: impl Into<String>) -> Self {
        self.images.congrats_image = Some(uri.into());
        self
    }

    pub fn upline(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        avatar_uri: Option<String>,
    ) -> Self {
        self.uplines.push(Upline {
            id: id.into(),
            name: name.into(),
            avatar_uri,
        });
        self
    }

    pub fn sticker(mut self, sticker: StickerPlacement) -> BannerResult<Self> {
        if self.stickers.iter().any(|s| s.id == sticker.id) {
            return Err(BannerError::validation(format!(
                "duplicate sticker id '{}'",
                sticker.id
            )));
        }
        self.stickers.push(sticker);
        Ok(self)
    }

    pub fn flip_achiever(mut self, flip: bool) -> Self {
        self.flip_achiever = flip;
        self
    }

    pub fn flip_mentor(mut self, flip: bool) -> Self {
        self.flip_mentor = flip;
        self
    }

    pub fn build(self) -> BannerResult<BannerDescriptor> {
        let d = BannerDescriptor {
            category: self.category,
            text_fields: self.text,
            image_refs: self.images,
            uplines: self.uplines,
            stickers: self.stickers,
            flip_achiever: self.flip_achiever,
            flip_mentor: self.flip_mentor,
        };
        d.validate()?;
        Ok(d)
    }
}

/// Sticker at an explicit placement.
pub fn sticker_at(
    id: impl Into<String>,
    image_uri: impl Into<String>,
    position_x: f64,
    position_y: f64,
    scale: f64,
    rotation_deg: f64,
) -> StickerPlacement {
    StickerPlacement {
        id: id.into(),
        image_uri: image_uri.into(),
        position_x: Some(position_x),
        position_y: Some(position_y),
        scale: Some(scale),
        rotation_deg: Some(rotation_deg),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/dsl.rs"]
mod tests;
